mod aggregation;
mod config;
mod lock;
mod models;
mod output;
mod pipeline;
mod serial;
mod telegram;
mod utils;

use log::{error, info};
use std::future::Future;
use time::OffsetDateTime;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::oneshot;

use aggregation::AggregationWindow;
use config::{SinkKind, StationConfig, PROGRAM};
use lock::DeviceLock;
use output::{Emitter, Severity, SnapshotWriter, SummarySink, Syslog};
use pipeline::Pipeline;
use serial::FrameReader;

/// Signals that end the program
struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
    hangup: Signal,
    quit: Signal,
}

impl ShutdownSignals {
    fn register() -> std::io::Result<Self> {
        Ok(ShutdownSignals {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }
}

async fn main_loop<R: AsyncRead + Unpin>(
    mut reader: FrameReader<R>,
    pipeline: &mut Pipeline,
    mut shutdown: oneshot::Receiver<&'static str>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Waiting for multisensor telegrams");

    loop {
        // Shutdown is only honoured while waiting for input, so a frame is
        // always processed to completion
        let frame = tokio::select! {
            frame = reader.read_frame() => frame?,
            name = &mut shutdown => {
                info!("Received {}", name.unwrap_or("shutdown request"));
                if let Err(e) = pipeline.emitter().notice(Severity::Info, "caught signal, exiting").await {
                    error!("Failed to report shutdown: {}", e);
                }
                break;
            }
        };

        let Some(frame) = frame else {
            info!("Input stream closed");
            break;
        };

        pipeline.process(&frame, OffsetDateTime::now_utc()).await;
    }

    if pipeline.pending_samples() > 0 {
        info!(
            "Discarding {} readings of the unfinished window",
            pipeline.pending_samples()
        );
    }

    Ok(())
}

/// Run `future` on a single-threaded runtime and tear it down without
/// waiting for blocking-pool work
///
/// Reads from `tokio::fs::File` run on the blocking pool and only return
/// once the device sends data, so a normal runtime drop would hang on a
/// silent sensor.
fn block_on_detached<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration while the process is still single-threaded
    let config = match StationConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    block_on_detached(run(config))?
}

async fn run(config: StationConfig) -> Result<(), Box<dyn std::error::Error>> {
    let _lock = match DeviceLock::acquire(&config.lock_dir, &config.tty) {
        Ok(lock) => lock,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let (summary, target) = match config.sink {
        SinkKind::File => (
            SummarySink::log_file(&config.log_file).await,
            config.log_file.display().to_string(),
        ),
        SinkKind::Syslog => (
            Syslog::connect(PROGRAM, config.local_offset).map(SummarySink::Syslog),
            "syslog".to_string(),
        ),
    };
    let summary = match summary {
        Ok(summary) => summary,
        Err(e) => {
            error!("Cannot open {} for logging: {}", target, e);
            return Err(e.into());
        }
    };

    let emitter = Emitter::new(
        SnapshotWriter::new(&config.snapshot_file),
        summary,
        config.local_offset,
    );

    let device = match File::open(&config.device).await {
        Ok(device) => device,
        Err(e) => {
            let message = format!("cannot open {}: {}", config.device.display(), e);
            if let Err(e) = emitter.notice(Severity::Err, &message).await {
                error!("Failed to report startup failure: {}", e);
            }
            return Err(e.into());
        }
    };

    emitter
        .notice(
            Severity::Info,
            &format!(
                "startup, logging from {} into {} every {}s",
                config.device.display(),
                target,
                config.interval_secs
            ),
        )
        .await?;

    // Handle shutdown signals gracefully
    let mut signals = ShutdownSignals::register()?;
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let name = signals.recv().await;
        let _ = tx.send(name);
    });

    let reader = FrameReader::new(BufReader::new(device));
    let mut pipeline = Pipeline::new(AggregationWindow::new(config.interval_secs), emitter);

    match main_loop(reader, &mut pipeline, rx).await {
        Ok(_) => {
            info!("Program completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Fatal error: {}", e);
            Err(e)
        }
    }
}
