mod channel;
mod config;
mod script;
mod simulation;
mod timestep;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use netmotion::SplineType;

use config::SimConfig;
use simulation::Simulation;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SplineArg {
    Linear,
    Hermite,
    MonotoneYHermite,
    FullMonotonicHermite,
    Bezier,
    VelocityBlending,
    PositionBlending,
}

impl From<SplineArg> for SplineType {
    fn from(arg: SplineArg) -> Self {
        match arg {
            SplineArg::Linear => SplineType::Linear,
            SplineArg::Hermite => SplineType::Hermite,
            SplineArg::MonotoneYHermite => SplineType::MonotoneYHermite,
            SplineArg::FullMonotonicHermite => SplineType::FullMonotonicHermite,
            SplineArg::Bezier => SplineType::Bezier,
            SplineArg::VelocityBlending => SplineType::VelocityBlending,
            SplineArg::PositionBlending => SplineType::PositionBlending,
        }
    }
}

#[derive(Parser)]
#[command(name = "netmotion-sim")]
#[command(about = "Plays a scripted avatar through a simulated network link")]
struct Args {
    #[arg(short, long, help = "TOML file with simulation and movement settings")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Simulated seconds")]
    duration: Option<f32>,

    #[arg(short, long)]
    tick_rate: Option<u32>,

    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(long, value_enum, help = "Interpolation spline")]
    spline: Option<SplineArg>,

    #[arg(long, help = "Freeze remote avatars instead of extrapolating")]
    no_extrapolation: bool,

    #[arg(long, help = "Packet loss percentage (0-100)")]
    loss_percent: Option<f32>,

    #[arg(long, help = "Minimum latency in ms")]
    min_latency: Option<u32>,

    #[arg(long, help = "Maximum latency in ms")]
    max_latency: Option<u32>,

    #[arg(long, help = "Jitter in ms")]
    jitter: Option<u32>,

    #[arg(long, help = "Print the effective configuration and exit")]
    dump_config: bool,
}

impl Args {
    fn apply(&self, config: &mut SimConfig) {
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(tick_rate) = self.tick_rate {
            config.tick_rate = tick_rate;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(spline) = self.spline {
            config.movement.interpolation.interpolation_type = spline.into();
        }
        if self.no_extrapolation {
            config.movement.receiver.use_extrapolation = false;
        }

        let network = &mut config.network;
        if let Some(loss_percent) = self.loss_percent {
            network.enabled = true;
            network.loss_percent = loss_percent;
        }
        if let Some(min_latency) = self.min_latency {
            network.enabled = true;
            network.min_latency_ms = min_latency;
        }
        if let Some(max_latency) = self.max_latency {
            network.enabled = true;
            network.max_latency_ms = max_latency;
        }
        if let Some(jitter) = self.jitter {
            network.enabled = true;
            network.jitter_ms = jitter;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    args.apply(&mut config);
    config
        .movement
        .validate()
        .context("invalid movement settings")?;

    if args.dump_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    if config.network.enabled {
        log::info!(
            "network: {:.1}% loss, {}-{}ms latency, {}ms jitter",
            config.network.loss_percent,
            config.network.min_latency_ms,
            config.network.max_latency_ms,
            config.network.jitter_ms
        );
    }

    let report = Simulation::new(config)?.run()?;
    report.log();

    Ok(())
}
