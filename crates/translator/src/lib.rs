//! VM Translator Library
//!
//! Lowers stack-machine VM code to Hack assembly. Input is a single `.vm`
//! file or a directory of them; a directory becomes one assembly program,
//! bootstrap first, with per-file static namespacing.

pub mod codewriter;
pub mod parser;

pub use codewriter::{CodeWriter, CodeWriterError};
pub use parser::VmParser;

use hack_core::vm::{CommandKind, VmCommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Translator configuration.
#[derive(Debug, Clone, Default)]
pub struct TranslatorConfig {
    /// Emit the bootstrap sequence. `None` decides from the input shape:
    /// directories get it, single files do not.
    pub bootstrap: Option<bool>,
}

impl TranslatorConfig {
    pub fn new() -> Self {
        TranslatorConfig::default()
    }

    pub fn with_bootstrap(mut self, on: bool) -> Self {
        self.bootstrap = Some(on);
        self
    }
}

/// Translate a `.vm` file or a directory of `.vm` files into one assembly
/// program. Returns the output path.
///
/// Defaults: a file's output is its sibling `<stem>.asm`; a directory's is
/// `<dir>/<dirname>.asm` over every `.vm` file within (non-recursive,
/// sorted order).
pub fn translate_path(
    input: &Path,
    output: Option<&Path>,
    config: &TranslatorConfig,
) -> Result<PathBuf, String> {
    let is_file = input.is_file();
    let sources = if is_file {
        if input.extension().is_none_or(|e| e != "vm") {
            return Err(format!("{}: not a .vm file", input.display()));
        }
        vec![input.to_path_buf()]
    } else {
        let found = vm_files_in(input)?;
        if found.is_empty() {
            return Err(format!("no .vm files found in {}", input.display()));
        }
        found
    };

    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None if is_file => input.with_extension("asm"),
        None => default_dir_output(input)?,
    };

    let mut writer = CodeWriter::new();
    if config.bootstrap.unwrap_or(!is_file) {
        debug!("emitting bootstrap");
        writer
            .write_init()
            .map_err(|e| format!("bootstrap: {}", e))?;
    }

    debug!(count = sources.len(), output = %out_path.display(), "translation pass");
    for source in &sources {
        translate_file(source, &mut writer)?;
    }

    fs::write(&out_path, writer.finish())
        .map_err(|e| format!("failed to write {}: {}", out_path.display(), e))?;
    Ok(out_path)
}

/// Translate one VM file into the shared writer.
fn translate_file(source: &Path, writer: &mut CodeWriter) -> Result<(), String> {
    let text = fs::read_to_string(source)
        .map_err(|e| format!("failed to read {}: {}", source.display(), e))?;
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| format!("{}: cannot determine file stem", source.display()))?;
    writer.set_file_name(stem);
    debug!(file = %source.display(), "translating");

    let mut parser = VmParser::new(&text);
    while parser.has_more() {
        parser
            .advance()
            .map_err(|e| format!("{}: {}", source.display(), e))?;
        let Some(command) = parser.command() else {
            return Err(format!(
                "{}: translator bug: no current command after advance",
                source.display()
            ));
        };
        let line = parser.line_number().unwrap_or(0);
        let at_line =
            move |e: CodeWriterError| format!("{}: line {}: {}", source.display(), line, e);
        match command {
            VmCommand::Push { segment, index } => writer
                .write_push_pop(CommandKind::Push, *segment, *index)
                .map_err(at_line)?,
            VmCommand::Pop { segment, index } => writer
                .write_push_pop(CommandKind::Pop, *segment, *index)
                .map_err(at_line)?,
            VmCommand::Arithmetic(op) => writer.write_arithmetic(*op).map_err(at_line)?,
            VmCommand::Label(label) => writer.write_label(label).map_err(at_line)?,
            VmCommand::Goto(label) => writer.write_goto(label).map_err(at_line)?,
            VmCommand::If(label) => writer.write_if(label).map_err(at_line)?,
            VmCommand::Function { name, locals } => {
                writer.write_function(name, *locals).map_err(at_line)?
            }
            VmCommand::Call { name, args } => {
                writer.write_call(name, *args).map_err(at_line)?
            }
            VmCommand::Return => writer.write_return().map_err(at_line)?,
        }
    }
    Ok(())
}

fn vm_files_in(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries =
        fs::read_dir(dir).map_err(|e| format!("failed to read {}: {}", dir.display(), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("failed to read {}: {}", dir.display(), e))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "vm") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// `<dir>/<dirname>.asm`, resolving `.` and friends to a real name.
fn default_dir_output(dir: &Path) -> Result<PathBuf, String> {
    let resolved = dir
        .canonicalize()
        .map_err(|e| format!("failed to resolve {}: {}", dir.display(), e))?;
    let name = resolved
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("{}: cannot determine directory name", dir.display()))?;
    Ok(dir.join(format!("{}.asm", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_auto() {
        assert_eq!(TranslatorConfig::new().bootstrap, None);
        assert_eq!(TranslatorConfig::new().with_bootstrap(false).bootstrap, Some(false));
    }
}
