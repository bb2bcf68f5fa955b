use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::tempdir;

fn stderr_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).to_string()
}

#[test]
fn help_lists_flags_and_environment() {
    let assert = cargo_bin_cmd!("revmod").arg("--help").assert().success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 help");
    for needle in ["--root", "--addr", "--git", "REVMOD_ROOT", "GET /{app}[@ref]"] {
        assert!(output.contains(needle), "help missing {needle}: {output}");
    }
}

#[test]
fn missing_root_is_reported() {
    let assert = cargo_bin_cmd!("revmod")
        .env_remove("REVMOD_ROOT")
        .env_remove("REVMOD_ADDR")
        .assert()
        .failure();
    let stderr = stderr_of(&assert);
    assert!(stderr.contains("REVMOD_ROOT"), "unexpected stderr: {stderr}");
}

#[test]
fn root_must_exist() {
    let temp = tempdir().expect("tempdir");
    let missing = temp.path().join("nowhere");
    let assert = cargo_bin_cmd!("revmod")
        .arg("--root")
        .arg(&missing)
        .assert()
        .failure();
    let stderr = stderr_of(&assert);
    assert!(stderr.contains("not a directory"), "unexpected stderr: {stderr}");
}

#[test]
fn invalid_address_from_environment_is_reported() {
    let temp = tempdir().expect("tempdir");
    let assert = cargo_bin_cmd!("revmod")
        .env("REVMOD_ROOT", temp.path())
        .env("REVMOD_ADDR", "not-an-address")
        .assert()
        .failure();
    let stderr = stderr_of(&assert);
    assert!(stderr.contains("REVMOD_ADDR"), "unexpected stderr: {stderr}");
}
