//! codio CLI
//!
//! Inspect, slice, verify and replay recorded editor timelines.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod surface;

use clap::{Parser, Subcommand};
use codio_core::{RelativeMs, SystemClock};
use codio_log::{EventKind, PersistedTimeline, decode_events, encode_events, is_ordered};
use codio_replay::{
    FrameBuilder, FrameDiff, MemorySurface, PlaybackSession, Player, PlayerConfig,
};
use color_eyre::Result;
use color_eyre::eyre::{bail, eyre};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use surface::LoggingSurface;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codio")]
#[command(about = "codio - record and replay editor sessions", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a recording
    Inspect {
        /// Path to codio.json
        timeline: PathBuf,
    },
    /// Print the documents at an offset
    Frame {
        /// Path to codio.json
        timeline: PathBuf,
        /// Offset in milliseconds; negative offsets show the start
        #[arg(long, allow_negative_numbers = true)]
        at: i64,
        /// Workspace root relative paths resolve against
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print the events from an offset, re-based to start at zero
    Slice {
        /// Path to codio.json
        timeline: PathBuf,
        /// Offset in milliseconds
        #[arg(long, default_value_t = 0)]
        from: u64,
    },
    /// Check that seeking is deterministic at every event boundary
    Verify {
        /// Path to codio.json
        timeline: PathBuf,
    },
    /// Replay in real time onto an in-memory surface
    Play {
        /// Path to codio.json
        timeline: PathBuf,
        /// Offset in milliseconds to start from
        #[arg(long, default_value_t = 0)]
        from: u64,
        /// Workspace root relative paths resolve against
        #[arg(long)]
        root: Option<PathBuf>,
        /// Keep the selection when playback pauses
        #[arg(long)]
        keep_selection: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Inspect { timeline } => inspect(&timeline),
        Commands::Frame { timeline, at, root } => frame(&timeline, at, root.as_deref()),
        Commands::Slice { timeline, from } => slice(&timeline, RelativeMs(from)),
        Commands::Verify { timeline } => verify(&timeline),
        Commands::Play {
            timeline,
            from,
            root,
            keep_selection,
        } => {
            let config = PlayerConfig {
                clear_selection_on_pause: !keep_selection,
            };
            tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?
                .block_on(play(&timeline, RelativeMs(from), root.as_deref(), config))
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("codio=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_timeline(path: &Path) -> Result<PersistedTimeline> {
    PersistedTimeline::read_from(path).map_err(|err| eyre!("cannot read {}: {err}", path.display()))
}

fn load_player(
    path: &Path,
    root: Option<&Path>,
    config: PlayerConfig,
) -> Result<Player<LoggingSurface>> {
    let timeline = read_timeline(path)?;
    let surface = Arc::new(Mutex::new(LoggingSurface::new(MemorySurface::new())));
    let mut player = Player::new(surface, Arc::new(SystemClock::new())).with_config(config);
    if !player.load(root, &timeline) {
        bail!("{} holds nothing to replay", path.display());
    }
    Ok(player)
}

fn inspect(path: &Path) -> Result<()> {
    let timeline = read_timeline(path)?;
    let events = decode_events(&timeline.events, None)?;

    let mut counts: IndexMap<EventKind, usize> = EventKind::ALL.into_iter().map(|k| (k, 0)).collect();
    for event in &events {
        *counts.entry(event.kind()).or_default() += 1;
    }

    println!("length:    {}", timeline.codio_length);
    println!("events:    {}", events.len());
    let skipped = timeline.events.len() - events.len();
    if skipped > 0 {
        println!("skipped:   {skipped} (unsupported kinds)");
    }
    println!("ordered:   {}", is_ordered(&events));
    for (kind, count) in &counts {
        println!("  {:<14} {count}", kind.as_str());
    }
    println!("initial frame:");
    for file in &timeline.initial_frame {
        println!("  {} (column {}, {} bytes)", file.path, file.column, file.text.len());
    }
    if !timeline.codio_editors.is_empty() {
        println!("documents:");
        for document in &timeline.codio_editors {
            println!("  {document}");
        }
    }
    Ok(())
}

fn frame(path: &Path, at: i64, root: Option<&Path>) -> Result<()> {
    let mut player = load_player(path, root, PlayerConfig::default())?;
    let outcome = player.move_to_offset(at);

    println!("at {} (digest {})", outcome.at, outcome.frame.digest());
    for (id, entry) in outcome.frame.apply_order() {
        println!(
            "== {id} (column {}, last action {}) ==",
            entry.view_column, entry.last_action_index
        );
        println!("{}", entry.text());
    }
    for failure in &outcome.failures {
        println!("!! {failure}");
    }
    if outcome.stats.failed_edits > 0 || outcome.stats.skipped_unknown > 0 {
        println!(
            "!! {} edits failed, {} events named unknown documents",
            outcome.stats.failed_edits, outcome.stats.skipped_unknown
        );
    }
    Ok(())
}

fn slice(path: &Path, from: RelativeMs) -> Result<()> {
    let mut player = load_player(path, None, PlayerConfig::default())?;
    let remaining = player.get_timeline(from);
    let encoded = encode_events(&remaining, None)?;
    println!("{}", serde_json::to_string_pretty(&encoded)?);
    player.destroy();
    Ok(())
}

fn verify(path: &Path) -> Result<()> {
    let mut player = load_player(path, None, PlayerConfig::default())?;
    let length = player.duration();

    let mut boundaries: Vec<RelativeMs> = player.events().iter().map(|e| e.time.clamp_to(length)).collect();
    boundaries.push(RelativeMs::zero());
    boundaries.push(length);
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut problems = Vec::new();
    let mut incremental = FrameBuilder::new(player.initial_frame());
    let events = player.events().to_vec();
    let mut applied = 0;

    for &t in &boundaries {
        let (direct, _) = player.frame_at(t);

        let (again, _) = player.frame_at(t);
        if direct != again {
            problems.push(format!("{t}: seeking twice gave different frames"));
        }

        player.move_to_frame(length);
        let detour = player.move_to_frame(t).frame;
        let diff = FrameDiff::compute(&direct, &detour);
        if diff.has_changes() {
            problems.push(format!("{t}: frame depends on previous seek ({diff:?})"));
        }

        if t > RelativeMs::zero() {
            while applied < events.len() && events[applied].time <= t {
                incremental.apply(&events[applied]);
                applied += 1;
            }
            if incremental.frame().digest() != direct.digest() {
                problems.push(format!("{t}: incremental fold diverged"));
            }
        }
    }

    if problems.is_empty() {
        println!("ok: {} boundaries verified", boundaries.len());
        Ok(())
    } else {
        for problem in &problems {
            println!("!! {problem}");
        }
        bail!("{} of {} boundaries failed", problems.len(), boundaries.len())
    }
}

async fn play(path: &Path, from: RelativeMs, root: Option<&Path>, config: PlayerConfig) -> Result<()> {
    let player = load_player(path, root, config)?;
    let mut session = PlaybackSession::new(player)?;
    session.on_progress(|current, total| info!(current, total, "progress"));

    if from == RelativeMs::zero() {
        session.start()?;
    } else {
        session.play_from(from)?;
    }
    session.finished().await;
    session.stop();

    let surface = session.player().surface().lock();
    for (id, document) in surface.inner().documents() {
        println!("== {id} ==");
        println!("{}", document.buffer.text());
    }
    Ok(())
}
