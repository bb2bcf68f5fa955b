use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

pub const REVMOD_AFTER_HELP: &str = concat!(
    "Environment:\n",
    "  REVMOD_ROOT    directory holding one git repository per app\n",
    "  REVMOD_ADDR    listen address (default 127.0.0.1:8000)\n",
    "  REVMOD_GIT     git executable (default git)\n",
    "  RUST_LOG       overrides the log filter\n\n",
    "Requests:\n",
    "  GET /{app}[@ref]           redirect to the root export\n",
    "  GET /{app}[@ref]/{path}    fetch a file; program source is rewritten\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "revmod",
    author,
    version,
    about = "Serve git revisions as importable modules",
    after_help = REVMOD_AFTER_HELP
)]
pub struct RevmodCli {
    #[arg(long, value_name = "DIR", help = "Directory holding one git repository per app")]
    pub root: Option<PathBuf>,
    #[arg(long, value_name = "HOST:PORT", help = "Address to listen on")]
    pub addr: Option<SocketAddr>,
    #[arg(long, value_name = "PATH", help = "git executable used to read repositories")]
    pub git: Option<String>,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v")]
    pub trace: bool,
}

impl RevmodCli {
    pub fn overrides(&self) -> revmod_core::Overrides {
        revmod_core::Overrides {
            root: self.root.clone(),
            addr: self.addr,
            git: self.git.clone(),
        }
    }
}
