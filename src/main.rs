use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use patchguard::{
    collect_files, load_from_path, Engine, EngineConfig, Journal, Notifier, Silent, StdinSource,
    TerminalBell, ValidatorRegistry,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "patchguard")]
#[command(about = "Guarded block replacement with syntax validation and rollback", long_about = None)]
#[command(version)]
struct Cli {
    /// Root directory to scan (defaults to the current directory)
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Optional TOML config (extensions, ignore dirs, check command, ...)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Append a JSON-lines record of every cycle outcome to this file
    #[arg(short, long)]
    journal: Option<PathBuf>,

    /// Disable the terminal-bell notifications
    #[arg(long)]
    silent: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => EngineConfig::default(),
    };

    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("cannot resolve scan root {}", cli.root.display()))?;

    let files = collect_files(&root, &config);
    let validators = ValidatorRegistry::defaults(&config);

    println!("{}", "patchguard - guarded block replace".bold());
    println!("scanning folder: {}", root.display());
    println!("files found: {}", files.len());
    println!(
        "{}",
        "type exit / quit / e as the whole block to leave".dimmed()
    );
    if files.is_empty() {
        println!(
            "{}",
            format!(
                "note: no files with recognized extensions ({}) under the root",
                config.extensions.join(", ")
            )
            .yellow()
        );
    }

    let notifier: Box<dyn Notifier> = if cli.silent {
        Box::new(Silent)
    } else {
        Box::new(TerminalBell)
    };

    let mut engine = Engine::new(config, files, validators, StdinSource::new(), notifier);
    if let Some(path) = cli.journal {
        engine = engine.with_journal(Journal::new(path));
    }

    engine.run().context("input stream failed")?;
    Ok(())
}
