use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for the path tracer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests and the headless smoke run
    Check,
    Fmt,
    Clippy,
    Test,
    /// Build rustdoc for the workspace
    Doc,
    Build,
    /// Drive the frame loop headlessly through drags, key presses,
    /// a minimise and a resize
    Smoke {
        #[arg(long, default_value = "240")]
        frames: u64,
    },
}

const SMOKE_EVENTS: &[&str] = &[
    "10:drag=40,-12",
    "20:key=w",
    "30:key==",
    "40:resize=0x0",
    "45:resize=960x540",
    "60:key=]",
    "80:drag=-15,5",
];

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            cargo(&["fmt", "--all", "--", "--check"])?;
            cargo(&[
                "clippy",
                "--workspace",
                "--all-targets",
                "--",
                "-D",
                "warnings",
            ])?;
            cargo(&["test", "--workspace"])?;
            smoke(240)?;
        }
        Commands::Fmt => cargo(&["fmt", "--all", "--", "--check"])?,
        Commands::Clippy => cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])?,
        Commands::Test => cargo(&["test", "--workspace"])?,
        Commands::Doc => cargo(&["doc", "--workspace", "--no-deps"])?,
        Commands::Build => cargo(&["build", "--workspace"])?,
        Commands::Smoke { frames } => smoke(frames)?,
    }

    Ok(())
}

fn smoke(frames: u64) -> Result<()> {
    let frames = frames.to_string();
    let mut args = vec![
        "run",
        "-q",
        "-p",
        "pathtrace-cli",
        "--",
        "simulate",
        "--frames",
        frames.as_str(),
    ];
    for event in SMOKE_EVENTS {
        args.extend(["--event", *event]);
    }
    cargo(&args)
}

fn cargo(args: &[&str]) -> Result<()> {
    println!("==> cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {} failed", args.first().copied().unwrap_or_default());
    }
    Ok(())
}
