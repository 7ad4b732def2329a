//! Headless command-line driver for the simulation core.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use shardfall::command::{CommandSource, NoInput};
use shardfall::config::SimConfig;
use shardfall::init_logging;
use shardfall::input::ScriptedInput;
use shardfall::presentation::DisplayManager;
use shardfall::runner::GameRunner;
use shardfall::snapshot::WorldSnapshot;

/// Headless driver for the shardfall simulation core
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON configuration file; omitted fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to run
    #[arg(short, long, default_value_t = 250)]
    frames: u32,

    /// Wall-clock duration of each frame in milliseconds
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f32,

    /// JSON script of frame-stamped commands to replay
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Print the final world snapshot as JSON
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimConfig::default(),
    };
    let mut source: Box<dyn CommandSource> = match &args.script {
        Some(path) => Box::new(
            ScriptedInput::load(path)
                .with_context(|| format!("loading script from {}", path.display()))?,
        ),
        None => Box::new(NoInput),
    };

    let mut runner = GameRunner::new(config).context("starting simulation")?;
    let mut display = DisplayManager::new();
    let frame_seconds = args.frame_ms / 1000.0;

    let mut dropped = 0;
    let mut spikes = 0;
    for _ in 0..args.frames {
        let report = runner
            .update(frame_seconds, source.as_mut(), &mut display)
            .context("simulation step failed")?;
        dropped += report.step.command_errors.len();
        spikes += usize::from(report.spike.is_some());
    }

    let state = runner.state();
    info!(
        "ran {} frames: {} ticks, {} tiles, {} drawables, {} dropped commands, {} spikes",
        args.frames,
        state.frame(),
        state.ground_tiles().len(),
        display.len(),
        dropped,
        spikes
    );

    if args.dump {
        let json = WorldSnapshot::capture(state)
            .to_json_pretty()
            .context("serialising snapshot")?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{json}").context("writing snapshot")?;
    }
    Ok(())
}
