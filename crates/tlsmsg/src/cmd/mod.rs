use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use tlsmsg_io::ReadConfig;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one message, optionally waiting for a complete reply.
    Send(SendArgs),
    /// Accept connections and print each complete message received.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Knobs for the complete-message read loop.
#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    /// Pause between read retries (e.g. 10ms, 1s).
    #[arg(long, default_value = "10ms")]
    pub backoff: String,
    /// Socket idle time after which a raw read reports "want read".
    #[arg(long, default_value = "20ms")]
    pub record_timeout: String,
    /// Retries tolerated before the first byte arrives.
    #[arg(long, default_value_t = tlsmsg_io::MAX_ATTEMPTS_TO_START_READING)]
    pub first_attempts: u32,
    /// Consecutive idle retries that end a message.
    #[arg(long, default_value_t = tlsmsg_io::MAX_ATTEMPTS_TO_STOP_READING)]
    pub end_attempts: u32,
    /// Bytes requested per raw read.
    #[arg(long, default_value_t = tlsmsg_io::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Largest accepted message in bytes.
    #[arg(long, default_value_t = tlsmsg_io::DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_size: usize,
}

impl ReadArgs {
    pub fn read_config(&self) -> CliResult<ReadConfig> {
        let config = ReadConfig {
            backoff: parse_duration(&self.backoff)?,
            first_message_attempts: self.first_attempts,
            end_of_message_attempts: self.end_attempts,
            chunk_size: self.chunk_size,
            max_message_size: self.max_size,
            ..ReadConfig::default()
        };
        config
            .validate()
            .map_err(|err| CliError::new(USAGE, err.to_string()))?;
        Ok(config)
    }

    pub fn record_timeout(&self) -> CliResult<Duration> {
        parse_duration(&self.record_timeout)
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Address to connect to (host:port).
    pub addr: String,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Wait for one complete reply and print it.
    #[arg(long)]
    pub wait: bool,
    #[command(flatten)]
    pub read: ReadArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind (host:port).
    pub addr: String,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Write every received message back to its sender.
    #[arg(long)]
    pub echo: bool,
    #[command(flatten)]
    pub read: ReadArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
