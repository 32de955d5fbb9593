//! Replsync command line client
//!
//! Counts brackets and dumps tokens for source files, and talks to a REPL
//! program run on a pseudo-terminal: prompt sync and expression evaluation.

mod pty_channel;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use replsync_core::{
    count_brackets, fix_broken_code, version_to_float, ByteChannel, Device, ProtocolConfig,
    TokenStream,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::pty_channel::{echo_listener, PtyChannel, PtyConfig};

/// Replsync - talk to a device REPL over a byte channel
#[derive(Parser, Debug)]
#[command(name = "replsync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sync a REPL prompt, evaluate expressions, count brackets", long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the net bracket depth of a source file (0 = closed)
    Brackets {
        /// Source file, `-` for stdin
        file: PathBuf,
    },

    /// Print the tokens of a source file
    Tokens {
        /// Source file, `-` for stdin
        file: PathBuf,

        /// One JSON object per token
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Evaluate an expression on the REPL and print its JSON value
    Eval {
        /// Expression to evaluate
        #[arg(short, long)]
        expr: String,

        #[command(flatten)]
        repl: ReplArgs,
    },

    /// Bring the REPL to its prompt and report whether Ctrl-C was needed
    Prompt {
        #[command(flatten)]
        repl: ReplArgs,
    },

    /// Print the firmware version reported by the REPL
    Version {
        #[command(flatten)]
        repl: ReplArgs,
    },
}

#[derive(clap::Args, Debug)]
struct ReplArgs {
    /// Milliseconds to wait for a prompt before sending Ctrl-C
    #[arg(long, default_value_t = 500)]
    prompt_timeout_ms: u64,

    /// Evaluation poll period in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_ms: u64,

    /// Milliseconds to let the program print its banner first
    #[arg(long, default_value_t = 1000)]
    startup_ms: u64,

    /// REPL program and its arguments, after `--`
    #[arg(required = true, last = true)]
    program: Vec<String>,
}

impl ReplArgs {
    fn protocol_config(&self) -> ProtocolConfig {
        ProtocolConfig::default()
            .with_prompt_timeout(Duration::from_millis(self.prompt_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_ms))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level)?;

    match args.command {
        Command::Brackets { file } => {
            let source = read_source(&file)?;
            println!("{}", count_brackets(&source));
        }
        Command::Tokens { file, json } => {
            let source = read_source(&file)?;
            for token in TokenStream::new(&source) {
                if json {
                    println!("{}", serde_json::to_string(&token)?);
                } else {
                    println!(
                        "{}:{}-{}\t{:?}\t{}",
                        token.line, token.start, token.end, token.kind, token.raw
                    );
                }
            }
        }
        Command::Eval { expr, repl } => {
            let device = open_device(&repl).await?;
            match device.evaluate(&fix_broken_code(&expr)).await? {
                Some(raw) => println!("{}", raw.trim()),
                None => bail!("No result from {}", repl.program[0]),
            }
        }
        Command::Prompt { repl } => {
            let device = open_device(&repl).await?;
            let outcome = device.sync_prompt().await?;
            println!("{}", if outcome.interrupted() { "interrupted" } else { "ready" });
        }
        Command::Version { repl } => {
            let device = open_device(&repl).await?;
            let version: String = device
                .evaluate_json("process.env.VERSION")
                .await?
                .context("Device did not report a version")?;
            match version_to_float(&version) {
                Some(number) => println!("{} ({})", version, number),
                None => println!("{}", version),
            }
        }
    }

    Ok(())
}

/// Spawn the REPL and wrap it as a device
async fn open_device(repl: &ReplArgs) -> Result<Device<PtyChannel>> {
    let (program, program_args) = repl
        .program
        .split_first()
        .context("No REPL program given")?;

    let channel = PtyChannel::spawn(&PtyConfig::new(program.clone(), program_args.to_vec()))?;
    channel.subscribe(Some(echo_listener()));

    tokio::time::sleep(Duration::from_millis(repl.startup_ms)).await;
    if !channel.is_connected() {
        bail!("{} exited during startup", program);
    }
    info!("{} is up, last line {:?}", program, channel.last_displayed_line());

    Ok(Device::new(channel).with_config(repl.protocol_config()))
}

fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Setup logging with tracing-subscriber
fn setup_logging(level: &str) -> Result<()> {
    let log_level = level.parse::<Level>().unwrap_or(Level::INFO);

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    // stdout carries results; logs and device echo go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
