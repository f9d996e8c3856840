//! Barcode Capture CLI
//!
//! Drives a capture session from the terminal: each line on stdin is a
//! host command (`open`, `capture`, `retry`, `accept`, `cancel`,
//! `dismiss`, `quit`).

use barcode_capture::{
    capture::{Camera, FileConfig, MockCamera},
    decode::{BarcodeDecoder, DecodeAdapter, MockDecoder, MultiFormatDecoder, QrDecoder},
    metrics::MetricsRegistry,
    session::{CaptureMachine, HostEvent, TracingHost},
    stream::StreamManager,
};
use clap::{Parser, ValueEnum};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DecoderKind {
    /// rxing decoder for the configured symbology.
    Barcode,
    /// Scripted decoder answering with --mock-code.
    Mock,
    /// rqrr QR decoder.
    Qr,
}

#[derive(Debug, Parser)]
#[command(name = "barcode-capture", version, about = "Camera capture with barcode recognition")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Barcode decoder to use.
    #[arg(long, value_enum, default_value_t = DecoderKind::Barcode)]
    decoder: DecoderKind,

    /// Code returned by the mock decoder; omit to never recognize anything.
    #[arg(long)]
    mock_code: Option<String>,

    /// Use synthetic frames even when a hardware camera is available.
    #[arg(long)]
    mock_camera: bool,

    /// Metrics server port, overriding the config file (0 to disable).
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Barcode Capture v{}", barcode_capture::VERSION);

    let config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };

    let camera = select_camera(args.mock_camera);
    let decoder: Arc<dyn BarcodeDecoder> = match args.decoder {
        DecoderKind::Barcode => Arc::new(MultiFormatDecoder::new()),
        DecoderKind::Qr => Arc::new(QrDecoder::new()),
        DecoderKind::Mock => match &args.mock_code {
            Some(code) => Arc::new(MockDecoder::found(code.clone())),
            None => Arc::new(MockDecoder::not_found()),
        },
    };
    info!(
        decoder = ?args.decoder,
        symbology = %config.decode.symbology,
        "Decoder configured"
    );

    let registry = match MetricsRegistry::new() {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };
    let metrics_port = args.metrics_port.unwrap_or(config.output.metrics_port);
    serve_metrics(metrics_port, Arc::clone(&registry));

    let streams = StreamManager::new(camera, config.capture.clone());
    let adapter = DecodeAdapter::new(decoder, config.decode.clone());
    let mut machine =
        CaptureMachine::new(streams, adapter, TracingHost::new()).with_metrics(registry);

    let (tx, rx) = mpsc::unbounded_channel();

    // Ctrl-C closes the dialog like any other dismissal, then stops.
    let signal_tx = tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = signal_tx.send(HostEvent::Dismissed);
        let _ = signal_tx.send(HostEvent::Shutdown);
    }) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<HostEvent>() {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{}", e),
            }
        }
        let _ = tx.send(HostEvent::Shutdown);
    });

    info!("Ready. Commands: open, capture, retry, accept, cancel, dismiss, quit");
    machine.run(rx).await;

    let stats = machine.stats();
    info!(
        "Done. {} sessions, {} captures, {} codes recognized, {} committed",
        stats.sessions_opened, stats.captures, stats.decodes_found, stats.commits
    );
}

#[cfg(feature = "camera")]
fn select_camera(mock: bool) -> Box<dyn Camera> {
    if mock {
        Box::new(MockCamera::new())
    } else {
        Box::new(barcode_capture::capture::NativeCamera::new())
    }
}

#[cfg(not(feature = "camera"))]
fn select_camera(mock: bool) -> Box<dyn Camera> {
    if !mock {
        info!("Built without the `camera` feature; using synthetic frames");
    }
    Box::new(MockCamera::new())
}

#[cfg(feature = "metrics")]
fn serve_metrics(port: u16, registry: Arc<MetricsRegistry>) {
    use barcode_capture::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return;
    }
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            warn!("Metrics server stopped: {}", e);
        }
    });
}

#[cfg(not(feature = "metrics"))]
fn serve_metrics(port: u16, _registry: Arc<MetricsRegistry>) {
    if port != 0 {
        warn!("Built without the `metrics` feature; not serving metrics on port {}", port);
    }
}
