//! CLI e2e tests: drive the built `slatec` binary directly, the way
//! `faxc-drv`'s `tests/e2e/cli_tests.rs` drives `faxc`.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn slatec() -> Command {
    Command::cargo_bin("slatec").unwrap()
}

#[test]
fn help_flag_prints_usage() {
    slatec().arg("--help").assert().success().stdout(predicate::str::contains("Slate compiler"));
}

#[test]
fn version_flag_prints_the_crate_version() {
    slatec().arg("--version").assert().success().stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn compiling_a_source_file_writes_assembly_to_the_output_path() {
    let mut source = tempfile::Builder::new().suffix(".sl").tempfile().unwrap();
    source.write_all(b"func main() : int { return 0; }").unwrap();
    let output = tempfile::NamedTempFile::new().unwrap();

    slatec().arg(source.path()).arg("-o").arg(output.path()).assert().success();

    let asm = std::fs::read_to_string(output.path()).unwrap();
    assert!(asm.contains("main:"));
}

#[test]
fn a_missing_input_file_fails_with_a_nonzero_exit_code() {
    slatec().arg("/no/such/file.sl").assert().failure();
}
