mod audio;
mod cli;
mod config;
mod error;
mod handoff;
mod net;
mod render;
mod session;
mod stage;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::ToSocketAddrs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cli::{Cli, Source};
use net::ingress::{IngressConfig, Listener};
use render::{LevelMeter, Render};
use stage::{AnalysisStage, TickStatus};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Config values apply only where the CLI is still at its default
    if let Some(path) = config::find_config(cli.config.as_deref()) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            if cli.host == config::default_host() { cli.host = cfg.network.host; }
            if cli.port == config::default_port() { cli.port = cfg.network.port; }
            if cli.startup_timeout == config::default_timeout_secs() {
                cli.startup_timeout = cfg.network.startup_timeout_secs;
            }
            if cli.idle_timeout == config::default_timeout_secs() {
                cli.idle_timeout = cfg.network.idle_timeout_secs;
            }
            if cli.queue_capacity == config::default_queue_capacity() {
                cli.queue_capacity = cfg.network.queue_capacity;
            }
            if cli.window == config::default_window_ms() { cli.window = cfg.analysis.window_ms; }
            if cli.interval == config::default_interval_ms() {
                cli.interval = cfg.analysis.interval_ms;
            }
            if cli.report_every == config::default_report_every() {
                cli.report_every = cfg.analysis.report_every;
            }
            if cli.device.is_none() { cli.device = cfg.capture.device; }
            if cli.channel == config::default_channel() { cli.channel = cfg.capture.channel; }
            if cli.downsample == config::default_downsample() {
                cli.downsample = cfg.capture.downsample;
            }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    config::validate(
        cli.window,
        cli.interval,
        cli.queue_capacity,
        cli.idle_timeout,
        cli.channel,
        cli.downsample,
    )?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            cancel.store(true, Ordering::SeqCst);
        })
        .context("install ctrl-c handler")?;
    }

    match cli.source {
        Source::Network => run_network(&cli, cancel),
        Source::Mic => run_mic(&cli, cancel),
    }
}

fn run_network(cli: &Cli, cancel: Arc<AtomicBool>) -> Result<()> {
    let addr = (cli.host.as_str(), cli.port)
        .to_socket_addrs()
        .with_context(|| format!("Invalid bind address {}:{}", cli.host, cli.port))?
        .next()
        .with_context(|| format!("{} did not resolve to an address", cli.host))?;

    let listener = Listener::bind(
        IngressConfig {
            addr,
            startup_timeout: Duration::from_secs(cli.startup_timeout),
            idle_timeout: Duration::from_secs(cli.idle_timeout),
            window_ms: cli.window,
        },
        Arc::clone(&cancel),
    )?;
    let (session, stream) = listener.negotiate().context("Stream negotiation failed")?;

    let (tx, rx) = handoff::channel(cli.queue_capacity);
    let ingress = std::thread::Builder::new()
        .name("ingress".into())
        .spawn(move || stream.run(tx))
        .context("Failed to spawn ingress thread")?;

    let mut stage = AnalysisStage::new(session, rx);
    let mut meter = LevelMeter::new(cli.report_every);
    analysis_loop(&mut stage, &mut meter, Duration::from_millis(cli.interval), || {});

    let report = ingress
        .join()
        .map_err(|_| anyhow::anyhow!("Ingress thread panicked"))?
        .context("Ingress failed")?;
    log::info!(
        "Session closed ({:?}): {} frames, {} malformed, {} dropped",
        report.reason,
        report.frames,
        report.malformed,
        report.dropped
    );
    Ok(())
}

#[cfg(feature = "capture")]
fn run_mic(cli: &Cli, cancel: Arc<AtomicBool>) -> Result<()> {
    use audio::capture::{CaptureConfig, LocalCapture};

    let (tx, rx) = handoff::channel(cli.queue_capacity);
    let capture = LocalCapture::open(
        &CaptureConfig {
            device: cli.device.clone(),
            channel: cli.channel,
            downsample: cli.downsample,
        },
        tx,
    )?;
    let session = session::Session::for_rate(capture.sample_rate(), cli.window)?;

    let mut stage = AnalysisStage::new(session, rx);
    let mut meter = LevelMeter::new(cli.report_every);

    // Dropping the stream drops its sender, which finishes the stage.
    let mut capture = Some(capture);
    analysis_loop(&mut stage, &mut meter, Duration::from_millis(cli.interval), || {
        if cancel.load(Ordering::SeqCst) && capture.take().is_some() {
            log::info!("Stopping capture");
        }
    });
    Ok(())
}

#[cfg(not(feature = "capture"))]
fn run_mic(_cli: &Cli, _cancel: Arc<AtomicBool>) -> Result<()> {
    anyhow::bail!(
        "Local capture requires the 'capture' feature. \
         Rebuild with: cargo build --features capture"
    );
}

/// Timer-driven analysis: drain, analyze and render once per tick until the
/// producer signals shutdown.
fn analysis_loop(
    stage: &mut AnalysisStage,
    renderer: &mut dyn Render,
    interval: Duration,
    mut before_tick: impl FnMut(),
) {
    let session = *stage.session();
    log::info!(
        "Analysing {} Hz: {}-sample window, {} bins, tick every {:?}",
        session.sample_rate,
        session.chunk_size,
        session.chunk_size / 2,
        interval
    );

    let ticker = crossbeam_channel::tick(interval);
    for _ in ticker.iter() {
        before_tick();
        let status = stage.tick();
        renderer.render(&stage.snapshot());
        if status == TickStatus::Finished {
            break;
        }
    }
    log::info!("Analysis stopped");
}
