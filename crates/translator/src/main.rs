//! VM Translator CLI
//!
//! Translates a `.vm` file, or a directory of `.vm` files, into one Hack
//! assembly program.

use clap::{ArgAction, CommandFactory, Parser as ClapParser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use std::process;
use vmt::TranslatorConfig;

#[derive(ClapParser)]
#[command(name = "vm-translator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Translate VM code to Hack assembly", long_about = None)]
struct Cli {
    /// A .vm file or a directory of .vm files
    input: Option<PathBuf>,

    /// Where to write the assembly program
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Force the bootstrap sequence on (default: on for directories only)
    #[arg(long, action = ArgAction::SetTrue, overrides_with = "no_bootstrap")]
    bootstrap: bool,

    /// Force the bootstrap sequence off
    #[arg(long, action = ArgAction::SetTrue, overrides_with = "bootstrap")]
    no_bootstrap: bool,

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
        generate(shell, &mut cmd, "vm-translator", &mut io::stdout());
        return;
    }

    let Some(input) = cli.input else {
        eprintln!("Error: missing input path (a .vm file or a directory)");
        process::exit(2);
    };

    let mut config = TranslatorConfig::new();
    if cli.bootstrap {
        config.bootstrap = Some(true);
    } else if cli.no_bootstrap {
        config.bootstrap = Some(false);
    }

    match vmt::translate_path(&input, cli.output.as_deref(), &config) {
        Ok(output) => {
            println!("Translated {} -> {}", input.display(), output.display());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
