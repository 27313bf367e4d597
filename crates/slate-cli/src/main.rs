//! `slatec` - the Slate compiler's command-line front end.
//!
//! A thin `clap`-derive binary over [`slate_drv::Session`]: parses
//! arguments, builds a [`slate_drv::Config`], runs the pipeline, and writes
//! the resulting assembly to `--output` or stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use slate_drv::{init_logging, Config, Session};

/// Compile a Slate source file to x86-64 assembly.
#[derive(Parser, Debug)]
#[command(name = "slatec")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Slate compiler front end", long_about = None)]
struct Cli {
    /// Source file to compile.
    input: PathBuf,

    /// Write the generated assembly here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source file extension `import` appends to a resolved module path.
    #[arg(long, default_value = ".sl")]
    ext: String,

    /// Enable verbose pipeline logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::new(cli.input);
    config.output_file = cli.output;
    config.ext = cli.ext;
    config.verbose = cli.verbose;

    let session = Session::new(config);
    match session.compile().and_then(|asm| session.emit(&asm)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
