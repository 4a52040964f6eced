use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// PCM datagrams from a remote microphone
    Network,
    /// Local input device (requires the `capture` feature)
    Mic,
}

#[derive(Parser, Debug)]
#[command(name = "lanscope", about = "Live oscilloscope and spectrum for LAN audio streams")]
pub struct Cli {
    /// Where frames come from
    #[arg(long, value_enum, default_value_t = Source::Network)]
    pub source: Source,

    /// Address to bind the UDP socket to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// UDP port to listen on
    #[arg(short, long, default_value_t = 8200)]
    pub port: u16,

    /// Seconds to wait for the first datagram
    #[arg(long, default_value_t = 120)]
    pub startup_timeout: u64,

    /// Seconds without datagrams before the stream is closed
    #[arg(long, default_value_t = 120)]
    pub idle_timeout: u64,

    /// Display and analysis window in milliseconds (1-500)
    #[arg(short, long, default_value_t = 200)]
    pub window: u32,

    /// Analysis tick interval in milliseconds
    #[arg(short, long, default_value_t = 10)]
    pub interval: u64,

    /// Frames buffered between ingress and analysis before the oldest is dropped
    #[arg(long, default_value_t = 256)]
    pub queue_capacity: usize,

    /// Log a level/peak summary every N ticks
    #[arg(long, default_value_t = 100)]
    pub report_every: u64,

    /// Input device name for --source mic
    #[arg(long)]
    pub device: Option<String>,

    /// Input channel for --source mic (1-based)
    #[arg(long, default_value_t = 1)]
    pub channel: usize,

    /// Keep every n-th captured sample for --source mic
    #[arg(long, default_value_t = 1)]
    pub downsample: usize,

    /// Config file (defaults to ./lanscope.toml or ~/.config/lanscope/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
