//! Jack Compiler Library
//!
//! Compiles Jack source to stack-machine VM code (or, in debug mode, to an
//! XML parse-tree dump). Input is a single `.jack` file or a directory of
//! them; each source file produces a sibling artifact with the same stem.
//!
//! ```rust,ignore
//! use jackc::{CompilerConfig, compile_path};
//!
//! let config = CompilerConfig::new();
//! let outputs = compile_path(Path::new("game/"), &config)?;
//! ```

pub mod config;
pub mod engine;
pub mod symbols;
pub mod tokenizer;
pub mod vm_writer;

pub use config::{CompilerConfig, FileConfig};
pub use engine::{CompilationEngine, CompileError, VmEngine, XmlEngine};
pub use symbols::{Kind, SymbolContext, SymbolTable};
pub use tokenizer::Tokenizer;
pub use vm_writer::VmWriter;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The engine a configuration selects, over a freshly lexed source.
fn make_engine(
    source: &str,
    config: &CompilerConfig,
) -> Result<Box<dyn CompilationEngine>, String> {
    let toks = Tokenizer::new(source)?;
    if config.xml {
        Ok(Box::new(XmlEngine::new(toks)))
    } else {
        Ok(Box::new(VmEngine::new(toks)))
    }
}

/// Compile one source text to its artifact text. Exposed for testing and
/// embedding; file handling lives in [`compile_file`].
pub fn compile_source(source: &str, config: &CompilerConfig) -> Result<String, String> {
    let mut engine = make_engine(source, config)?;
    engine.compile_class().map_err(|e| e.to_string())?;
    Ok(engine.finish())
}

/// Compile one `.jack` file, writing the artifact next to it.
/// Returns the output path.
pub fn compile_file(input: &Path, config: &CompilerConfig) -> Result<PathBuf, String> {
    if input.extension().is_none_or(|e| e != "jack") {
        return Err(format!("{}: not a .jack file", input.display()));
    }
    let source = fs::read_to_string(input)
        .map_err(|e| format!("failed to read {}: {}", input.display(), e))?;

    let mut engine =
        make_engine(&source, config).map_err(|e| format!("{}: {}", input.display(), e))?;
    let output = input.with_extension(engine.output_extension());
    debug!(input = %input.display(), output = %output.display(), "compiling");

    engine
        .compile_class()
        .map_err(|e| format!("{}: {}", input.display(), e))?;
    let artifact = engine.finish();

    if config.tee {
        print!("{}", artifact);
    }
    fs::write(&output, artifact)
        .map_err(|e| format!("failed to write {}: {}", output.display(), e))?;
    Ok(output)
}

/// Compile a `.jack` file or every `.jack` file in a directory
/// (non-recursive, sorted order). Stops at the first failing file.
/// Returns `(source, artifact)` path pairs.
pub fn compile_path(
    input: &Path,
    config: &CompilerConfig,
) -> Result<Vec<(PathBuf, PathBuf)>, String> {
    let sources = if input.is_dir() {
        let found = jack_files_in(input)?;
        if found.is_empty() {
            return Err(format!("no .jack files found in {}", input.display()));
        }
        found
    } else {
        vec![input.to_path_buf()]
    };

    debug!(count = sources.len(), "compilation pass");
    let mut outputs = Vec::with_capacity(sources.len());
    for source in sources {
        let artifact = compile_file(&source, config)?;
        outputs.push((source, artifact));
    }
    Ok(outputs)
}

fn jack_files_in(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries =
        fs::read_dir(dir).map_err(|e| format!("failed to read {}: {}", dir.display(), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("failed to read {}: {}", dir.display(), e))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "jack") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
