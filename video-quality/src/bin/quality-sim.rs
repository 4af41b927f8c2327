//! Quality Simulator - replays recorded bitrate ceilings against the controller
//!
//! Trace format: one `<seconds> <bits/s>` pair per line, `#` starts a comment.
//! The controller is ticked at a fixed cadence between ceilings so probe
//! timing can be checked against a real feedback capture.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use video_quality::{
    reference_configurations, ApplyError, BestFit, ConfigurationSelector, ControllerConfig,
    QualityChange, QualityController, VideoConfiguration, VideoSize, VideoStream,
};

#[derive(Parser)]
#[command(name = "quality-sim")]
#[command(about = "Replay a bitrate ceiling trace through the video quality controller")]
struct Cli {
    /// Trace file with `<seconds> <bits/s>` lines
    trace: PathBuf,

    /// Controller policy (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration table (TOML, `[[configurations]]` entries)
    #[arg(short, long)]
    table: Option<PathBuf>,

    /// Cores available to the simulated encoder
    #[arg(long, default_value_t = 1)]
    cpus: u32,

    /// Interval between controller ticks in milliseconds
    #[arg(long, default_value_t = 500)]
    tick_ms: u64,

    /// Bitrate the encoder is configured for before the first ceiling
    #[arg(long, default_value_t = 1_000_000)]
    start_bitrate: u32,
}

#[derive(Deserialize)]
struct TableFile {
    configurations: Vec<VideoConfiguration>,
}

/// Encoder that adopts everything the controller asks for
struct SimulatedStream {
    list: Vec<VideoConfiguration>,
    current: VideoConfiguration,
    cpu_count: u32,
    output_size: VideoSize,
    forced_fps: f32,
}

impl SimulatedStream {
    fn new(list: Vec<VideoConfiguration>, cpu_count: u32, start_bitrate: u32) -> Result<Self> {
        let mut current = BestFit
            .best_for_bitrate(&list, start_bitrate, cpu_count)
            .context("configuration table is empty")?;
        current.required_bitrate = start_bitrate.min(current.bitrate_limit);

        Ok(Self {
            output_size: current.size,
            forced_fps: current.fps,
            list,
            current,
            cpu_count,
        })
    }
}

impl VideoStream for SimulatedStream {
    fn configuration_list(&self) -> Option<&[VideoConfiguration]> {
        Some(&self.list)
    }

    fn current_configuration(&self) -> VideoConfiguration {
        self.current
    }

    fn set_configuration(&mut self, configuration: &VideoConfiguration) -> Result<(), ApplyError> {
        self.current = *configuration;
        Ok(())
    }

    fn set_source_fps(&mut self, fps: f32) -> Result<(), ApplyError> {
        self.current.fps = fps;
        Ok(())
    }

    fn set_configured_fps(&mut self, _fps: f32) {}

    fn set_output_size(&mut self, size: VideoSize) {
        self.output_size = size;
    }

    fn set_preview_size(&mut self, _size: VideoSize) {}

    fn set_forced_fps(&mut self, fps: f32) {
        self.forced_fps = fps;
    }

    fn restart_capture(&mut self) -> Result<(), ApplyError> {
        self.current.size = self.output_size;
        self.current.fps = self.forced_fps;
        Ok(())
    }

    fn cpu_count(&self) -> u32 {
        self.cpu_count
    }

    fn encoder_name(&self) -> &str {
        "simulated"
    }
}

fn parse_trace(content: &str) -> Result<Vec<(Duration, u32)>> {
    let mut events = Vec::new();
    let mut last = Duration::ZERO;

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(at), Some(ceiling), None) = (fields.next(), fields.next(), fields.next()) else {
            bail!("line {}: expected `<seconds> <bits/s>`", line_no);
        };

        let at: f64 = at
            .parse()
            .with_context(|| format!("line {}: invalid time {:?}", line_no, at))?;
        let at = Duration::try_from_secs_f64(at)
            .with_context(|| format!("line {}: time out of range", line_no))?;
        let ceiling: u32 = ceiling
            .parse()
            .with_context(|| format!("line {}: invalid bitrate {:?}", line_no, ceiling))?;

        if at < last {
            bail!("line {}: timestamps must not go backwards", line_no);
        }
        last = at;
        events.push((at, ceiling));
    }

    Ok(events)
}

fn load_table(path: Option<&Path>) -> Result<Vec<VideoConfiguration>> {
    let Some(path) = path else {
        return Ok(reference_configurations());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let table: TableFile =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(table.configurations)
}

fn describe(change: &QualityChange) -> String {
    match change {
        QualityChange::Definition { size, fps } => format!("definition -> {} @ {} fps", size, fps),
        QualityChange::Bitrate {
            bitrate_limit,
            fps: Some(fps),
        } => format!("bitrate -> {} bit/s, fps -> {}", bitrate_limit, fps),
        QualityChange::Bitrate {
            bitrate_limit,
            fps: None,
        } => format!("bitrate -> {} bit/s", bitrate_limit),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if cli.tick_ms == 0 {
        bail!("--tick-ms must be greater than zero");
    }

    let config = match &cli.config {
        Some(path) => ControllerConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ControllerConfig::default(),
    };
    let content = std::fs::read_to_string(&cli.trace)
        .with_context(|| format!("reading {}", cli.trace.display()))?;
    let events = parse_trace(&content)?;
    if events.is_empty() {
        warn!("Trace {} has no ceilings", cli.trace.display());
        return Ok(());
    }

    let list = load_table(cli.table.as_deref())?;
    let mut stream = SimulatedStream::new(list, cli.cpus, cli.start_bitrate)?;
    let mut controller = QualityController::new(config)?;

    info!(
        "Starting at {} @ {} fps, {} bit/s",
        stream.current.size, stream.current.fps, stream.current.required_bitrate
    );

    let tick = Duration::from_millis(cli.tick_ms);
    let end = events[events.len() - 1].0 + controller.config().probe_delay() + tick;
    let base = Instant::now();
    let mut pending = events.into_iter().peekable();
    let mut elapsed = Duration::ZERO;

    while elapsed <= end {
        let now = base + elapsed;

        while let Some((at, ceiling)) = pending.next_if(|(at, _)| *at <= elapsed) {
            if let Some(change) = controller.on_ceiling_update_at(&mut stream, ceiling, base + at) {
                println!("{:>8.2}s  ceiling {:>9}  {}", at.as_secs_f64(), ceiling, describe(&change));
            }
        }

        if let Some(change) = controller.on_tick(&mut stream, now) {
            println!("{:>8.2}s  probe             {}", elapsed.as_secs_f64(), describe(&change));
        }

        elapsed += tick;
    }

    let current = stream.current_configuration();
    println!(
        "final: {} @ {} fps, {} bit/s",
        current.size, current.fps, current.required_bitrate
    );
    Ok(())
}
