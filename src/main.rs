//! Kinesia CLI
//!
//! Drives the motion analysis engine from recorded sample files and prints
//! the resulting feature frames for downstream consumers to pipe away.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kinesia_core::{config::NOMINAL_SAMPLE_RATE, Engine, EngineConfig, Sample, VERSION};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kinesia")]
#[command(version = VERSION)]
#[command(about = "Streaming motion analysis for gesture-driven sound and visuals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded sample file through the engine
    Replay {
        /// JSON-lines file of recorded samples
        file: PathBuf,

        /// Tick rate in Hz
        #[arg(long, default_value_t = NOMINAL_SAMPLE_RATE)]
        rate: f64,

        /// Print every tick's feature frame, not just onset ticks
        #[arg(long)]
        all: bool,
    },

    /// Show the engine configuration
    Config,
}

/// One line of a recorded sample file.
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    /// Record time in seconds from the start of the recording.
    time: f64,
    /// Sensor id, conventionally the bone name it is strapped to.
    sensor: String,
    #[serde(default)]
    device: u32,
    #[serde(default)]
    accel: Option<[f64; 3]>,
    #[serde(default)]
    bone: Option<[f64; 3]>,
    #[serde(default)]
    relative: Option<[f64; 3]>,
}

impl ReplayRecord {
    fn to_sample(&self) -> Sample {
        let mut sample = Sample::new(self.time, self.device);
        if let Some([x, y, z]) = self.accel {
            sample.set_accel(x, y, z);
        }
        if let Some([tilt, rotate, lateral]) = self.bone {
            sample.set_bone_angles(tilt, rotate, lateral);
        }
        if let Some([tilt, rotate, lateral]) = self.relative {
            sample.set_relative_angles(tilt, rotate, lateral);
        }
        sample
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { file, rate, all } => cmd_replay(&file, rate, all),
        Commands::Config => cmd_config(),
    }
}

fn cmd_replay(path: &PathBuf, rate: f64, all: bool) -> Result<()> {
    anyhow::ensure!(rate > 0.0, "tick rate must be positive");

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ReplayRecord = serde_json::from_str(&line)
            .with_context(|| format!("parsing line {}", number + 1))?;
        records.push(record);
    }
    records.sort_by(|a, b| a.time.total_cmp(&b.time));

    let config = EngineConfig::load().context("loading configuration")?;
    let mut engine = Engine::new(config);

    let end = records.last().map(|r| r.time).unwrap_or(0.0);
    let step = 1.0 / rate;
    let mut pending = records.into_iter().peekable();
    let mut now = 0.0;

    while now <= end + step {
        while let Some(record) = pending.next_if(|r| r.time <= now) {
            engine.append_sample(&record.sensor, record.to_sample());
        }

        engine.update(now);

        let frame = engine.feature_frame();
        if all || frame.has_onset() {
            println!("{}", serde_json::to_string(&frame)?);
        }

        now += step;
    }

    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = EngineConfig::load().context("loading configuration")?;
    println!("Config path: {}", EngineConfig::config_path().display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
