//! Immo Extract - fill real-estate document templates with an LLM.

use clap::Parser;
use immo_cli::commands;
use immo_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

fn main() {
    // Provider keys may live in a local .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,immo_extractor={level},immo_llm={level},immo_cli={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn run(cli: Cli) -> immo_cli::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    let templates_dir = cli
        .templates_dir
        .clone()
        .unwrap_or_else(|| config.templates_dir.clone());

    match cli.command {
        Command::Extract(args) => {
            commands::execute_extract(args, &config, &templates_dir, &formatter)
        }
        Command::Fields(args) => commands::execute_fields(args, &templates_dir, &formatter),
    }
}
