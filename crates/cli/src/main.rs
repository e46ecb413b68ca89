//! sh3 - interactive object-storage shell
//!
//! Reads commands from stdin or a script file and runs them against an
//! S3-compatible service.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{ArgAction, Parser};
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sh3::Shell;
use sh3::exit_code::ExitCode;
use sh3::output::{Formatter, OutputConfig};
use sh3_core::ConfigManager;
use sh3_s3::{S3Connector, S3Options};

/// Interactive shell for S3-compatible object storage
#[derive(Parser, Debug)]
#[command(name = "sh3", version, about, long_about = None, disable_help_flag = true)]
struct Args {
    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Storage host
    #[arg(short = 'h', long, env = "SH3_HOST")]
    host: Option<String>,

    /// Access key
    #[arg(short = 'u', long = "user", env = "SH3_ACCESS_KEY")]
    access_key: Option<String>,

    /// Secret key
    #[arg(short = 'p', long = "pass", env = "SH3_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Initial bucket
    #[arg(short = 'b', long, env = "SH3_BUCKET")]
    bucket: Option<String>,

    /// Read commands from this file instead of stdin
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Write responses to this file; needs --input
    #[arg(short = 'o', long = "output", requires = "input")]
    output: Option<PathBuf>,

    /// Prompt written before each read
    #[arg(long)]
    prompt: Option<String>,

    /// Log debug output to stderr
    #[arg(long)]
    debug: bool,

    /// Disable progress indicators
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let code = match run(args).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            eprintln!("sh3: {e:#}");
            ExitCode::for_error(&e)
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(args: Args) -> anyhow::Result<()> {
    let manager = ConfigManager::new()?;
    let config = manager.load()?;
    tracing::debug!(path = %manager.config_path().display(), "Loaded configuration");

    let mut session = config.seed_session()?;
    if let Some(host) = args.host {
        session.host = Some(host);
    }
    if let Some(access_key) = args.access_key {
        session.access_key = Some(access_key);
    }
    if let Some(secret_key) = args.secret_key {
        session.secret_key = Some(secret_key);
    }
    if let Some(bucket) = args.bucket {
        session.bucket = Some(bucket);
    }
    if let Some(prompt) = args.prompt {
        session.prompt = prompt;
    }

    let out = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot write output file '{}'", path.display()))?;
            Formatter::new(Box::new(BufWriter::new(file)))
        }
        None => Formatter::stdout(),
    };

    let connector = S3Connector::new(S3Options {
        region: config.defaults.region.clone(),
        secure: config.defaults.secure,
    });
    let mut shell = Shell::new(session, Box::new(connector), out)
        .with_output(OutputConfig::detect(args.no_progress, args.input.is_some()))
        .with_page_size(config.defaults.page_size);

    match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("cannot read input file '{}'", path.display()))?;
            shell.run(BufReader::new(file)).await?;
        }
        None => shell.run(BufReader::new(tokio::io::stdin())).await?,
    }
    Ok(())
}
