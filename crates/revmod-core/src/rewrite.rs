//! Rewrites module specifiers in program source through an import table.
//!
//! The source is parsed with `oxc`; every specifier-bearing token is located
//! by its byte span and replaced in the original text, so everything that is
//! not a rewritten specifier stays byte-identical.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ExportAllDeclaration, ExportNamedDeclaration, Expression, ImportDeclaration, ImportExpression,
    Program, StringLiteral, TemplateLiteral,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use oxc_syntax::operator::BinaryOperator;
use revmod_domain::{resolve_specifier, ImportTable};
use tracing::trace;

const JSX_IMPORT_SOURCE: &str = "@jsxImportSource";

/// File extensions whose contents are rewritten before serving.
pub const SOURCE_EXTENSIONS: [&str; 8] = ["js", "jsx", "ts", "tsx", "mjs", "cjs", "mts", "cts"];

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("{path} is not a recognized source file type")]
    UnsupportedSourceType { path: String },
    #[error("{path} is not valid UTF-8")]
    NotUtf8 { path: String },
}

/// Whether `path` names program source that should be rewritten.
pub fn is_program_source(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Rewrites every module specifier in `source`.
pub fn rewrite(source: &str, path: &str, table: &ImportTable) -> Result<String, RewriteError> {
    let source_type =
        SourceType::from_path(path).map_err(|_| RewriteError::UnsupportedSourceType {
            path: path.to_string(),
        })?;
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, source_type).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        let message = parsed
            .errors
            .first()
            .map_or_else(|| "unrecoverable syntax error".to_string(), ToString::to_string);
        return Err(RewriteError::Parse {
            path: path.to_string(),
            message,
        });
    }

    let mut collector = SpecifierCollector {
        table,
        source,
        edits: Vec::new(),
    };
    collector.visit_program(&parsed.program);
    collector.jsx_import_source(&parsed.program);

    let mut edits = collector.edits;
    trace!(path, edits = edits.len(), "rewriting specifiers");
    if edits.is_empty() {
        return Ok(source.to_string());
    }
    edits.sort_by_key(|edit| edit.start);
    Ok(apply_edits(source, &edits))
}

#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

fn apply_edits(source: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
    }
    out.push_str(&source[cursor..]);
    out
}

struct SpecifierCollector<'t> {
    table: &'t ImportTable,
    source: &'t str,
    edits: Vec<Edit>,
}

impl<'t> SpecifierCollector<'t> {
    fn text(&self, span: Span) -> &'t str {
        &self.source[span.start as usize..span.end as usize]
    }

    fn string_literal(&mut self, literal: &StringLiteral<'_>) {
        let value = literal.value.as_str();
        let resolved = resolve_specifier(self.table, value);
        if resolved == value {
            return;
        }
        let quote = match self.text(literal.span).chars().next() {
            Some('\'') => '\'',
            _ => '"',
        };
        self.edits.push(Edit {
            start: literal.span.start as usize,
            end: literal.span.end as usize,
            replacement: quote_string(&resolved, quote),
        });
    }

    fn template_literal(&mut self, template: &TemplateLiteral<'_>) {
        if !template.expressions.is_empty() {
            return;
        }
        if template.quasis.len() != 1 {
            return;
        }
        let quasi = &template.quasis[0];
        let value = quasi
            .value
            .cooked
            .as_ref()
            .map_or(quasi.value.raw.as_str(), |cooked| cooked.as_str());
        let resolved = resolve_specifier(self.table, value);
        if resolved == value {
            return;
        }
        self.edits.push(Edit {
            start: template.span.start as usize,
            end: template.span.end as usize,
            replacement: quote_template(&resolved),
        });
    }

    /// The argument of `import(...)`. Only literal pieces can be resolved
    /// statically; identifiers and calls are left alone.
    fn dynamic_specifier(&mut self, expression: &Expression<'_>) {
        match expression {
            Expression::StringLiteral(literal) => self.string_literal(literal),
            Expression::TemplateLiteral(template) => self.template_literal(template),
            Expression::BinaryExpression(binary)
                if binary.operator == BinaryOperator::Addition =>
            {
                self.dynamic_specifier(&binary.left);
                self.dynamic_specifier(&binary.right);
            }
            Expression::ParenthesizedExpression(inner) => {
                self.dynamic_specifier(&inner.expression);
            }
            _ => {}
        }
    }

    /// `@jsxImportSource <specifier>` pragmas in the comments leading the
    /// first statement, or in any comment of a file without statements.
    fn jsx_import_source(&mut self, program: &Program<'_>) {
        let first_statement = program
            .directives
            .first()
            .map(|directive| directive.span.start)
            .into_iter()
            .chain(program.body.first().map(|statement| statement.span().start))
            .min();
        let spans = program
            .comments
            .iter()
            .map(|comment| comment.span)
            .filter(|span| first_statement.is_none_or(|start| span.end <= start))
            .collect::<Vec<_>>();
        for span in spans {
            self.pragma_in_comment(span);
        }
    }

    fn pragma_in_comment(&mut self, span: Span) {
        let base = span.start as usize;
        let text = self.text(span);
        for (at, _) in text.match_indices(JSX_IMPORT_SOURCE) {
            let after = at + JSX_IMPORT_SOURCE.len();
            let rest = &text[after..];
            // `@jsxImportSourceTypes` and friends are different pragmas.
            if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_' || c == '$') {
                continue;
            }
            let leading = rest.len() - rest.trim_start().len();
            if leading == 0 {
                continue;
            }
            let token_start = after + leading;
            let token = &text[token_start..];
            let token_len = token
                .char_indices()
                .find(|(idx, c)| c.is_whitespace() || token[*idx..].starts_with("*/"))
                .map_or(token.len(), |(idx, _)| idx);
            if token_len == 0 {
                continue;
            }
            let specifier = &token[..token_len];
            let resolved = resolve_specifier(self.table, specifier);
            if resolved == specifier {
                continue;
            }
            self.edits.push(Edit {
                start: base + token_start,
                end: base + token_start + token_len,
                replacement: resolved.into_owned(),
            });
        }
    }
}

impl<'a> Visit<'a> for SpecifierCollector<'_> {
    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        self.string_literal(&it.source);
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &it.source {
            self.string_literal(source);
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        self.string_literal(&it.source);
    }

    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        self.dynamic_specifier(&it.source);
        walk::walk_import_expression(self, it);
    }
}

fn quote_string(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn quote_template(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('`');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out.push('`');
    out
}
