//! Jack Compiler CLI
//!
//! Compiles a `.jack` file, or every `.jack` file in a directory, into
//! sibling `.vm` files (or `.xml` parse-tree dumps with `--xml`).

use clap::{CommandFactory, Parser as ClapParser};
use clap_complete::{Shell, generate};
use jackc::{CompilerConfig, FileConfig};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "jack-compiler")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile Jack source to VM code", long_about = None)]
struct Cli {
    /// A .jack file or a directory of .jack files
    input: Option<PathBuf>,

    /// Emit the XML parse-tree dump instead of VM code
    #[arg(long)]
    xml: bool,

    /// Echo each produced artifact to standard output
    #[arg(long)]
    tee: bool,

    /// Path to a TOML config file with default options
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Generate a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "jack-compiler", &mut io::stdout());
        return;
    }

    let Some(input) = cli.input else {
        eprintln!("Error: missing input path (a .jack file or a directory)");
        process::exit(2);
    };

    let mut config = CompilerConfig::new();
    if let Some(path) = &cli.config {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error reading config {}: {}", path.display(), e);
                process::exit(1);
            }
        };
        match FileConfig::from_toml(&content) {
            Ok(file) => config.merge(file),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }
    // flags override the config file
    if cli.xml {
        config.xml = true;
    }
    if cli.tee {
        config.tee = true;
    }

    match jackc::compile_path(&input, &config) {
        Ok(outputs) => {
            for (source, artifact) in outputs {
                println!("Compiled {} -> {}", source.display(), artifact.display());
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
