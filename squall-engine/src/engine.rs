use std::{
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use parking_lot::Mutex;
use squall_capture::{
    CaptureError, LogCode, LogLevel, PacketCapture, PacketLogEntry, PacketLogger, PacketMetadata,
    TracingLogger,
};
use squall_rules::{RulePipeline, Ruleset, ShapedCapture};
use tracing::{debug, error, info, warn};

use crate::{
    config::EngineConfig,
    telemetry::{EngineStats, EngineTelemetry, WorkerTally},
};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;
const FAULTED: u8 = 3;
const DISPOSED: u8 = 4;

/// Why [`CaptureEngine::start`] refused.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("engine is already running")]
    AlreadyRunning,
    #[error("engine has been disposed")]
    Disposed,
    #[error("engine is faulted and must be disposed")]
    Faulted,
    #[error("capture filter is empty")]
    InvalidFilter,
    #[error("failed to open capture handle: {0}")]
    Open(#[from] CaptureError),
}

/// How a worker loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Cancellation or handle shutdown.
    Stopped,
    /// The consecutive-error threshold was exceeded.
    TooManyErrors,
}

/// State shared between the engine facade and its workers.
#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    cancel: AtomicBool,
    telemetry: Arc<EngineTelemetry>,
}

/// Multi-threaded capture session driving packets through the rule pipeline.
///
/// `start` opens one capture handle per worker and spawns one OS thread per
/// handle; load balancing across handles is the capture provider's job, so
/// workers never share a handle or contend on receive. `stop` cancels the
/// workers, shuts every handle down to unblock pending receives and joins
/// with a bounded timeout.
///
/// Lifecycle: idle, running, stopping and back to idle, with faulted as an
/// absorbing state when a worker exhausts the error budget, and disposed as
/// the terminal state.
pub struct CaptureEngine<C: PacketCapture + 'static> {
    factory: Box<dyn Fn() -> Arc<C> + Send + Sync>,
    config: EngineConfig,
    pipeline: Arc<RulePipeline>,
    logger: Arc<dyn PacketLogger>,
    shared: Arc<Shared>,
    captures: Mutex<Vec<Arc<C>>>,
    workers: Mutex<Vec<JoinHandle<WorkerExit>>>,
}

impl<C: PacketCapture + 'static> std::fmt::Debug for CaptureEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureEngine")
            .field("config", &self.config)
            .field("state", &self.shared.state.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<C: PacketCapture + 'static> CaptureEngine<C> {
    /// An engine with default configuration. `factory` produces one capture
    /// handle per worker at start time.
    pub fn new(factory: impl Fn() -> Arc<C> + Send + Sync + 'static) -> Self {
        Self::with_config(factory, EngineConfig::default())
    }

    pub fn with_config(
        factory: impl Fn() -> Arc<C> + Send + Sync + 'static,
        config: EngineConfig,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            config,
            pipeline: Arc::new(RulePipeline::new()),
            logger: Arc::new(TracingLogger),
            shared: Arc::new(Shared {
                state: AtomicU8::new(IDLE),
                cancel: AtomicBool::new(false),
                telemetry: Arc::new(EngineTelemetry::default()),
            }),
            captures: Mutex::new(Vec::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the default `tracing`-backed packet logger.
    pub fn with_logger(mut self, logger: Arc<dyn PacketLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// The shared rule pipeline; swap rulesets on it at any time.
    pub fn pipeline(&self) -> &Arc<RulePipeline> {
        &self.pipeline
    }

    /// Shorthand for swapping the active ruleset.
    pub fn swap(&self, ruleset: Ruleset) {
        self.pipeline.swap(ruleset);
    }

    /// Observer handle over the session counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats::new(Arc::clone(&self.shared.telemetry))
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.load(Ordering::SeqCst) == RUNNING
    }

    /// Opens the capture handles and spawns the worker threads.
    pub fn start(&self, filter: &str) -> Result<(), StartError> {
        if filter.trim().is_empty() {
            return Err(StartError::InvalidFilter);
        }
        match self.shared.state.compare_exchange(
            IDLE,
            RUNNING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {}
            Err(DISPOSED) => return Err(StartError::Disposed),
            Err(FAULTED) => return Err(StartError::Faulted),
            Err(_) => return Err(StartError::AlreadyRunning),
        }

        let mut captures: Vec<Arc<C>> = Vec::with_capacity(self.config.workers);
        for _ in 0..self.config.workers {
            let capture = (self.factory)();
            if let Err(err) = capture.open(filter) {
                // Roll back to idle; nothing was spawned yet.
                for opened in &captures {
                    opened.shutdown();
                }
                self.shared.state.store(IDLE, Ordering::SeqCst);
                return Err(StartError::Open(err));
            }
            captures.push(capture);
        }
        *self.captures.lock() = captures.clone();

        self.shared.telemetry.reset();
        self.shared.cancel.store(false, Ordering::SeqCst);

        let mut workers = self.workers.lock();
        for (index, capture) in captures.iter().enumerate() {
            let shared = Arc::clone(&self.shared);
            let capture = Arc::clone(capture);
            let handle = self.pipeline.handle();
            let logger = Arc::clone(&self.logger);
            let config = self.config.clone();
            let worker = thread::Builder::new()
                .name(format!("squall-worker-{index}"))
                .spawn(move || worker_loop(shared, capture, handle, logger, config))
                .map_err(|_| StartError::Open(CaptureError::Unknown));
            match worker {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    drop(workers);
                    self.stop();
                    return Err(err);
                }
            }
        }
        drop(workers);

        info!(workers = self.config.workers, filter, "capture engine started");
        self.logger.log(PacketLogEntry::now(
            LogLevel::Info,
            LogCode::EngineStarted,
            self.config.workers as i64,
        ));
        Ok(())
    }

    /// Cancels the workers and joins them. Idempotent; a no-op before the
    /// first `start`.
    pub fn stop(&self) {
        match self.shared.state.load(Ordering::SeqCst) {
            RUNNING => self.shared.state.store(STOPPING, Ordering::SeqCst),
            FAULTED => {}
            _ => return,
        }

        self.shared.cancel.store(true, Ordering::SeqCst);
        for capture in self.captures.lock().iter() {
            capture.shutdown();
        }

        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        let deadline = Instant::now() + self.config.join_timeout;
        for worker in workers {
            while !worker.is_finished() && Instant::now() < deadline {
                thread::sleep(std::time::Duration::from_millis(1));
            }
            if !worker.is_finished() {
                warn!("worker did not exit within the join timeout");
                continue;
            }
            match worker.join() {
                Ok(exit) => debug!(?exit, "worker exited"),
                Err(_) => error!("worker panicked"),
            }
        }
        self.captures.lock().clear();

        if self.shared.state.load(Ordering::SeqCst) == STOPPING {
            self.shared.state.store(IDLE, Ordering::SeqCst);
        }
        info!("capture engine stopped");
        self.logger.log(PacketLogEntry::now(
            LogLevel::Info,
            LogCode::EngineStopped,
            self.shared.telemetry.packets_processed() as i64,
        ));
    }

    /// Stops the engine if needed and releases every capture handle.
    /// Terminal: the engine cannot be started again. Safe to call twice.
    pub fn dispose(&self) {
        if self.shared.state.load(Ordering::SeqCst) == DISPOSED {
            return;
        }
        self.stop();
        self.shared.state.store(DISPOSED, Ordering::SeqCst);
        self.captures.lock().clear();
        self.workers.lock().clear();
    }
}

impl<C: PacketCapture + 'static> Drop for CaptureEngine<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn worker_loop<C: PacketCapture>(
    shared: Arc<Shared>,
    capture: Arc<C>,
    pipeline: squall_rules::PipelineHandle,
    logger: Arc<dyn PacketLogger>,
    config: EngineConfig,
) -> WorkerExit {
    let mut shaped = ShapedCapture::new(Arc::clone(&capture), pipeline);
    let mut buffer = vec![0u8; config.buffer_size];
    let mut metadata = vec![PacketMetadata::default(); config.batch_size];
    let mut tally = WorkerTally::default();

    let exit = loop {
        if shared.cancel.load(Ordering::SeqCst) {
            break WorkerExit::Stopped;
        }

        match capture.receive_batch(&mut buffer, &mut metadata) {
            Ok(batch) => {
                shared.telemetry.record_success();
                process_batch(
                    &mut shaped,
                    &mut buffer,
                    &mut metadata[..batch.packets],
                    batch.total_bytes,
                    &logger,
                    &mut tally,
                );
                if tally.since_flush >= config.flush_interval {
                    shared.telemetry.flush(&mut tally);
                }
            }
            Err(CaptureError::OperationAborted | CaptureError::InvalidHandle) => {
                break WorkerExit::Stopped;
            }
            Err(err) => {
                tally.receive_errors += 1;
                logger.log(PacketLogEntry::now(LogLevel::Error, LogCode::RecvFailed, 0));
                debug!(%err, "batch receive failed");
                if shared.telemetry.record_error() > config.max_consecutive_errors {
                    error!("receive error budget exhausted, worker faulting");
                    let _ = shared.state.compare_exchange(
                        RUNNING,
                        FAULTED,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    );
                    break WorkerExit::TooManyErrors;
                }
            }
        }

        // Dispatch due delayed packets and queued injections between batches.
        shaped.tick();
        tally.send_errors += shaped.take_send_errors();
    };

    shaped.tick();
    tally.send_errors += shaped.take_send_errors();
    shared.telemetry.flush(&mut tally);
    exit
}

/// Walks the tightly packed batch, validating each length against the
/// remaining bytes. A length overflowing the batch abandons the rest; a
/// zero length skips just that packet.
fn process_batch<C: PacketCapture>(
    shaped: &mut ShapedCapture<C>,
    buffer: &mut [u8],
    metadata: &mut [PacketMetadata],
    total_bytes: usize,
    logger: &Arc<dyn PacketLogger>,
    tally: &mut WorkerTally,
) {
    let mut offset = 0;
    for meta in metadata {
        let len = meta.batch_length as usize;
        if len == 0 {
            tally.invalid_packets += 1;
            logger.log(PacketLogEntry::now(LogLevel::Warning, LogCode::InvalidPacket, 0));
            continue;
        }
        if offset + len > total_bytes {
            tally.invalid_packets += 1;
            logger.log(PacketLogEntry::now(
                LogLevel::Warning,
                LogCode::InvalidPacket,
                len as i64,
            ));
            warn!(len, offset, total_bytes, "batch length overflow, abandoning batch");
            break;
        }

        let packet = &mut buffer[offset..offset + len];
        offset += len;
        shaped.inner().calculate_checksums(packet, meta);
        match shaped.send(packet, meta) {
            Ok(()) => {
                tally.packets_processed += 1;
                tally.since_flush += 1;
            }
            Err(err) => {
                tally.send_errors += 1;
                logger.log(PacketLogEntry::now(LogLevel::Error, LogCode::SendFailed, len as i64));
                debug!(%err, "send failed");
            }
        }
    }
}
