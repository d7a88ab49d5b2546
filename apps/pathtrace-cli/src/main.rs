mod script;
mod simulate;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use pathtrace_common::TracerConfig;
use script::ScriptEvent;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pathtrace-cli", about = "Headless tooling for the path tracer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run the frame loop against a device-free backend
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "120")]
        frames: u64,
        /// YAML tracer configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Scripted input, `<frame>:<action>` (drag=dx,dy | resize=WxH | key=K | stop)
        #[arg(short, long = "event")]
        events: Vec<ScriptEvent>,
        /// Override the configured samples per frame
        #[arg(long)]
        samples_per_frame: Option<u32>,
        /// Override the configured exposure
        #[arg(long)]
        exposure: Option<f32>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the default configuration, or validate and normalise a file
    Config {
        path: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TracerConfig> {
    let config = match path {
        Some(path) => TracerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TracerConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            println!("pathtrace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", pathtrace_common::crate_info());
            println!("input: {}", pathtrace_input::crate_info());
            println!("render: {}", pathtrace_render::crate_info());
        }
        Commands::Simulate {
            frames,
            config,
            events,
            samples_per_frame,
            exposure,
            json,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(spf) = samples_per_frame {
                config.samples_per_frame = spf;
            }
            if let Some(exposure) = exposure {
                config.exposure = exposure;
            }
            config.validate()?;
            let report = simulate::run(&config, frames, &events)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "frames={} presented={} suspended={} stopped={}",
                    report.frames, report.presented, report.suspended, report.stopped
                );
                println!(
                    "uploads={} resets={} resizes={} (failed {}) dispatches={}",
                    report.stats.uploads,
                    report.stats.accumulation_resets,
                    report.stats.resizes,
                    report.stats.failed_resizes,
                    report.stats.dispatches
                );
                println!("samples={} resolution={}", report.samples, report.resolution);
                println!(
                    "backend calls: upload={} reset={} resize={} dispatch={} wait_idle={}",
                    report.calls.uploads,
                    report.calls.resets,
                    report.calls.resizes,
                    report.calls.dispatches,
                    report.calls.wait_idle
                );
                for err in &report.errors {
                    println!("error: {err}");
                }
            }
        }
        Commands::Config { path } => {
            let config = load_config(path.as_deref())?;
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}
