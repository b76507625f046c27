use clap::{CommandFactory, Parser};
use colored::*;
use env_logger::{Builder, Env, Target};
use httpgrep::cli::{Cli, Commands, PatternAction};
use httpgrep::error::{GrepError, Result};
use httpgrep::output_formats::{OutputFormat, OutputFormatter};
use httpgrep::progress::ProgressReporter;
use httpgrep::search::build_filter;
use httpgrep::{Config, GrepService, MemoryStore, Metrics, PatternStore, SearchEngine};
use log::{debug, info, warn};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = setup_logging(&cli) {
        eprintln!("{}", format!("Failed to set up logging: {e}").red());
    }

    let start_time = Instant::now();
    info!("Application started with command: {:?}", cli.command);

    if let Err(e) = run(cli).await {
        eprintln!("{}", format!("Error: {e}").red());
        std::process::exit(1);
    }

    info!(
        "Application finished. Total elapsed time: {:.2?}",
        start_time.elapsed()
    );
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    debug!("Using config: {config:?}");

    match &cli.command {
        Commands::Search {
            pattern,
            options,
            output,
            out,
            copy,
            metrics,
        } => {
            let options = options.to_options()?;
            options.validate(pattern)?;
            let store = MemoryStore::load(&traffic_path(&cli)?)?;
            let engine = SearchEngine::with_metrics(
                Arc::new(store),
                config.clone(),
                Arc::new(Metrics::new()),
            );
            let service = GrepService::new(engine.clone(), open_patterns(&config)?);

            let (tx, mut rx) = mpsc::unbounded_channel();
            let reporter = Arc::new(ProgressReporter::new());
            let consumer = {
                let reporter = Arc::clone(&reporter);
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        reporter.handle(&event);
                    }
                })
            };

            let (interrupt_tx, mut interrupt_rx) = mpsc::unbounded_channel();
            if let Err(e) = ctrlc::set_handler(move || {
                let _ = interrupt_tx.send(());
            }) {
                warn!("Could not install Ctrl-C handler: {e}");
            }
            let stopper = {
                let engine = engine.clone();
                tokio::spawn(async move {
                    if interrupt_rx.recv().await.is_some() {
                        let outcome = engine.stop().await;
                        info!("{}", outcome.message);
                    }
                })
            };

            let events = engine.emitter(tx);
            let outcome = engine.search(pattern, &options, &events).await;
            drop(events);
            let _ = consumer.await;
            stopper.abort();

            match outcome {
                Ok(summary) => {
                    reporter.finish("Done");
                    info!("Search summary: {summary:?}");
                }
                Err(GrepError::Stopped) => {
                    reporter.abandon("Stopped");
                    eprintln!("{}", "Scan stopped, showing partial results".yellow());
                }
                Err(e) => {
                    reporter.abandon("Failed");
                    return Err(e);
                }
            }

            let results = match service.download_results().into_result() {
                Ok(results) => results,
                Err(_) => {
                    eprintln!("{}", "No matches found".yellow());
                    Vec::new()
                }
            };

            if !results.is_empty() {
                let formatter = OutputFormatter::new(*output).with_color(out.is_none());
                let rendered = formatter.format_results(&results, pattern);
                match out {
                    Some(path) => {
                        fs::write(path, &rendered)?;
                        eprintln!(
                            "{}",
                            format!("Wrote {} matches to {}", results.len(), path.display())
                                .green()
                        );
                    }
                    None => print!("{rendered}"),
                }

                if *copy {
                    let values = OutputFormatter::new(OutputFormat::Values)
                        .format_results(&results, pattern);
                    let mut clipboard = arboard::Clipboard::new()?;
                    clipboard.set_text(values)?;
                    eprintln!("{}", "Results copied to clipboard!".green());
                }
            }

            if *metrics {
                eprint!("{}", engine.metrics().gather());
            }
        }

        Commands::Filter { pattern, options } => {
            let options = options.to_options()?;
            options.validate(pattern)?;
            println!("{}", build_filter(pattern, &options));
        }

        Commands::Patterns { action } => {
            let patterns = open_patterns(&config)?;
            match action {
                PatternAction::List => {
                    let saved = patterns.list();
                    if saved.is_empty() {
                        println!("{}", "No saved patterns".yellow());
                    }
                    for p in saved {
                        println!(
                            "{} {} {}",
                            p.id.cyan().bold(),
                            p.pattern,
                            p.updated_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
                        );
                    }
                }
                PatternAction::Upsert { id, pattern } => {
                    let saved = patterns.upsert(id, pattern)?;
                    println!("{} {}", "Saved".green(), saved.id);
                }
                PatternAction::Delete { id } => {
                    if !patterns.delete(id)? {
                        return Err(GrepError::PatternNotFound(id.clone()));
                    }
                    println!("{} {id}", "Deleted".green());
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "httpgrep", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn traffic_path(cli: &Cli) -> Result<PathBuf> {
    cli.traffic
        .clone()
        .ok_or_else(|| GrepError::Validation("--traffic <dump.json> is required".into()))
}

fn open_patterns(config: &Config) -> Result<PatternStore> {
    match config.storage.patterns_path() {
        Some(path) => PatternStore::open(path),
        None => {
            warn!("No config directory available, saved patterns will not persist");
            Ok(PatternStore::in_memory())
        }
    }
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(level));

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    if let Some(log_path) = &cli.log {
        if let Some(parent_dir) = log_path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                fs::create_dir_all(parent_dir)?;
            }
        }
        let log_file = fs::File::create(log_path)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| GrepError::Other(e.to_string()))?;
    Ok(())
}
