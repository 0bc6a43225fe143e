pub mod audio;
pub mod chunking;
pub mod difficulty;
pub mod error;
pub mod input;
pub mod models;
pub mod performance;
pub mod presenter;
pub mod sentinel;
pub mod session;
pub mod settings;
pub mod store;
mod utils;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

pub use chunking::{chunk_text, ChunkConfig, ChunkPolicy, TextUnit};
pub use error::ReaderError;
pub use presenter::{PresentationScheduler, PresenterEvent, PresenterSnapshot, PresenterStatus};
pub use session::{CloseIntent, ExitOutcome, SessionLifecycle, SessionStores};
pub use settings::{EngineConfig, SettingsStore};
pub use store::MemoryStore;

use chunking::split_at_orp;

const INTERLUDE_PAUSE: Duration = Duration::from_secs(3);

#[derive(Parser)]
#[command(name = "readpace")]
#[command(about = "Read a text file one unit at a time in the terminal", long_about = None)]
struct Cli {
    /// Text file to read
    file: PathBuf,

    /// Fixed pace in words per minute
    #[arg(short, long)]
    wpm: Option<u32>,

    /// Words per unit: 1, 2, 3 or auto
    #[arg(short, long)]
    chunk: Option<ChunkPolicy>,

    /// JSON settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Seed for auto chunking
    #[arg(long)]
    seed: Option<u64>,
}

pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(read_file(cli))
}

async fn read_file(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.settings {
        Some(path) => SettingsStore::new(path.clone())?.config(),
        None => EngineConfig::default(),
    };
    if let Some(wpm) = cli.wpm {
        config.pace_override = Some(wpm);
    }
    if let Some(policy) = cli.chunk {
        config.chunk_policy = policy;
    }

    let text = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;
    let content_id = cli.file.display().to_string();

    let store = Arc::new(MemoryStore::new());
    store.insert_text(content_id.clone(), text).await;

    let mut lifecycle = SessionLifecycle::new(config, SessionStores::from_memory(store));
    if let Some(seed) = cli.seed {
        lifecycle = lifecycle.with_seed(seed);
    }
    let mut events = lifecycle.scheduler().subscribe();

    let snapshot = lifecycle.start(&content_id).await?;
    if snapshot.total_units == 0 {
        println!("nothing to read in {content_id}");
        return Ok(());
    }
    print_unit(snapshot.current.as_ref());
    lifecycle.play().await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(PresenterEvent::UnitShown { .. }) => {
                    print_unit(lifecycle.snapshot().await.current.as_ref());
                }
                Ok(PresenterEvent::StateChanged(snapshot))
                    if snapshot.status == PresenterStatus::Interlude =>
                {
                    println!("\n-- short break --\n");
                    tokio::time::sleep(INTERLUDE_PAUSE).await;
                    lifecycle.finish_interlude().await?;
                    lifecycle.play().await?;
                }
                Ok(PresenterEvent::Completed { .. }) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    match lifecycle.request_exit(CloseIntent::CancelKey).await? {
        ExitOutcome::Closed { words_read, .. } => {
            println!("\nclosed after {words_read} words; too short to count");
        }
        ExitOutcome::SummaryPending(summary) => {
            println!(
                "\n{} words in {:.0}s ({:.0} wpm)",
                summary.words_read, summary.elapsed_secs, summary.pace_wpm
            );
            for indicator in &summary.indicators {
                println!("note: {:?} ({:?})", indicator.kind, indicator.severity);
            }
            lifecycle.confirm_summary().await?;
            let goal = lifecycle.daily_goal().await;
            if goal.completed {
                println!("daily goal of {} words reached", goal.target_words);
            } else {
                println!("{} words left for today's goal", goal.remaining_words());
            }
        }
    }
    Ok(())
}

fn print_unit(unit: Option<&TextUnit>) {
    if let Some(unit) = unit {
        let (before, pivot, after) = split_at_orp(&unit.text, unit.orp_index);
        println!("{before}\x1b[31m{pivot}\x1b[0m{after}");
    }
}
