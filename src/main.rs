//! Percolate CLI
//!
//! Reads a syntax tree in JSON form and prints the JavaScript it lowers to.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use percolate::{compile_fragments, fragment::fragments_to_text, parse_json, CompileOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "percolate")]
#[command(author, version, about = "Lower a CoffeeScript-style syntax tree into JavaScript", long_about = None)]
struct Cli {
    /// AST JSON file to compile (reads stdin when omitted)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Compile without the top-level function wrapper
    #[arg(short, long)]
    bare: bool,

    /// Prefix the output with a "Generated by" comment
    #[arg(long)]
    header: bool,

    /// Read compile options from a JSON config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the fragment list as JSON instead of JavaScript
    #[arg(long)]
    fragments: bool,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_options(cli: &Cli) -> anyhow::Result<CompileOptions> {
    let mut options = match &cli.config {
        Some(path) => CompileOptions::load(path)?,
        None => CompileOptions::default(),
    };
    options.bare |= cli.bare;
    options.header |= cli.header;
    Ok(options)
}

fn read_input(file: Option<&Path>) -> anyhow::Result<(String, String)> {
    match file {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Error reading '{}'", path.display()))?;
            Ok((path.display().to_string(), source))
        }
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("Error reading stdin")?;
            Ok(("<stdin>".to_string(), source))
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let options = load_options(cli)?;
    let (name, source) = read_input(cli.file.as_deref())?;
    tracing::info!(input = %name, bare = options.bare, "compiling");

    let compiled = parse_json(&source).and_then(|program| compile_fragments(program, &options));
    let fragments = match compiled {
        Ok(fragments) => fragments,
        Err(err) => anyhow::bail!(err.report(&name)),
    };

    let output = if cli.fragments {
        serde_json::to_string_pretty(&fragments)?
    } else {
        fragments_to_text(&fragments)
    };
    match &cli.output {
        Some(path) => fs::write(path, output)
            .with_context(|| format!("Error writing '{}'", path.display()))?,
        None => print!("{}", output),
    }
    Ok(())
}
