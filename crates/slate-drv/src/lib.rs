//! Compiler driver: the entry point and orchestrator for the whole
//! compilation pipeline.
//!
//! ```text
//! source text
//!   -> [slate-lex]  token stream
//!   -> [slate-pp]   expanded token stream (#define/#macro/@fragment)
//!   -> [slate-par]  typed AST (Program)
//!   -> [slate-gen]  x86-64 assembly text
//! ```
//!
//! Every phase reports failure through [`slate_util::CompileError`] (or, for
//! code generation, [`slate_gen::CodeGenError`]); this crate only adds the
//! orchestration (`Session::compile`) and the filesystem-backed
//! [`SourceLoader`](slate_par::SourceLoader) `import` needs, wrapping both
//! error types in `anyhow` at this boundary the way a CLI caller expects.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

/// Compiler configuration for a single invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// The entry source file to compile.
    pub input_file: PathBuf,

    /// Output path; `None` means write the rendered assembly to stdout.
    pub output_file: Option<PathBuf>,

    /// Source file extension `import` appends to the last path segment
    /// (§6), including the leading dot (e.g. `.sl`).
    pub ext: String,

    /// Mirror every pipeline phase transition to the tracing subscriber.
    pub verbose: bool,
}

impl Config {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Config { input_file: input_file.into(), output_file: None, ext: ".sl".to_string(), verbose: false }
    }
}

/// Resolves `import` paths (§6) relative to the entry file's directory:
/// `a::b::c` with `ext = ".sl"` becomes `<base>/a/b/c.sl`, read whole.
struct FsLoader {
    base_dir: PathBuf,
}

impl slate_par::SourceLoader for FsLoader {
    fn read_all(&self, path: &str) -> slate_util::CompileResult<String> {
        let relative = path.replace('\\', std::path::MAIN_SEPARATOR_STR);
        let full = self.base_dir.join(relative);
        fs::read_to_string(&full).map_err(|e| {
            slate_util::processor::ErrorKind::FileError.at(0, full.display().to_string(), e.to_string())
        })
    }
}

/// One compiler invocation's state. Thin by design — every phase's real
/// state (token tables, arenas, name tables) lives inside that phase's own
/// crate and is handed off, not duplicated here.
pub struct Session {
    pub config: Config,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Session { config }
    }

    /// Runs the full pipeline and returns the rendered assembly text.
    #[instrument(skip(self), fields(input = %self.config.input_file.display()))]
    pub fn compile(&self) -> Result<String> {
        let source = fs::read_to_string(&self.config.input_file)
            .with_context(|| format!("reading {}", self.config.input_file.display()))?;

        info!("lexing");
        let tokens = slate_lex::Lexer::new(&source).tokenize().context("lexing failed")?;
        debug!(count = tokens.len(), "lexed tokens");

        info!("preprocessing");
        let preprocessor = slate_pp::Preprocessor::new(tokens);
        let expanded = preprocessor.preprocess().context("preprocessing failed")?;
        debug!(count = expanded.len(), "expanded tokens");

        info!("parsing");
        let base_dir = self
            .config
            .input_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let loader = Box::new(FsLoader { base_dir });
        let parser = slate_par::Parser::new(expanded, loader, self.config.ext.clone());
        let program = parser.parse().context("parsing failed")?;
        debug!(statements = program.statements.len(), "built program");

        info!("generating assembly");
        let (unit, handler) = slate_gen::generate(&program).context("code generation failed")?;
        for diagnostic in handler.diagnostics() {
            tracing::warn!("{diagnostic}");
        }

        Ok(unit.render())
    }

    /// Writes the compiled assembly to `config.output_file`, or stdout when
    /// no output path was configured.
    pub fn emit(&self, assembly: &str) -> Result<()> {
        match &self.config.output_file {
            Some(path) => fs::write(path, assembly).with_context(|| format!("writing {}", path.display())),
            None => {
                println!("{assembly}");
                Ok(())
            }
        }
    }
}

/// Installs a `tracing-subscriber` formatter honoring `RUST_LOG`, falling
/// back to `info` (or `debug` under `--verbose`) when unset.
pub fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".sl").tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn compiles_a_trivial_function_to_assembly() {
        let file = write_temp("func main() : int { return 0; }");
        let mut config = Config::new(file.path());
        config.ext = ".sl".to_string();
        let session = Session::new(config);
        let asm = session.compile().unwrap();
        assert!(asm.contains("global main"));
        assert!(asm.contains("main:"));
    }

    #[test]
    fn missing_source_file_is_an_error() {
        let config = Config::new("/nonexistent/path/does/not/exist.sl");
        let session = Session::new(config);
        assert!(session.compile().is_err());
    }

    #[test]
    fn syntax_error_is_reported_through_anyhow() {
        let file = write_temp("func main() : int {");
        let config = Config::new(file.path());
        let session = Session::new(config);
        assert!(session.compile().is_err());
    }
}
