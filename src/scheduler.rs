//! Background refresh loop.
//!
//! One scheduler per process, the only writer into the snapshot cache. Each
//! tick runs a full cycle (locate, capture, decode, annotate, encode,
//! publish). A failed stage aborts the cycle, leaves the cache untouched and
//! waits for the next tick like any other cycle. Cycles never overlap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use metrics::{counter, histogram};
use tokio::sync::watch;
use tokio::task;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::Snapshot;
use crate::capture::{CaptureDevice, CaptureParams, DeviceLocator, FrameGrabber};
use crate::error::{CycleError, SchedulerError, Stage};
use crate::pipeline::format_label;
use crate::service::SnapshotService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Capturing,
    Decoding,
    Annotating,
    Encoding,
    Publishing,
    /// A stage failed and the cycle was abandoned. Held until the next tick.
    Backoff,
}

/// Outcome counters, shared with whoever wants to observe the loop.
#[derive(Debug, Default)]
pub struct RefreshStats {
    published: AtomicU64,
    failed: AtomicU64,
}

impl RefreshStats {
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

pub struct RefreshScheduler<G> {
    service: Arc<SnapshotService>,
    locator: Arc<DeviceLocator>,
    grabber: G,
    params: CaptureParams,
    interval: Duration,
    state: watch::Sender<RefreshState>,
    stats: Arc<RefreshStats>,
}

impl<G: FrameGrabber> RefreshScheduler<G> {
    pub fn new(
        service: Arc<SnapshotService>,
        locator: DeviceLocator,
        grabber: G,
        params: CaptureParams,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(RefreshState::Idle);
        Self {
            service,
            locator: Arc::new(locator),
            grabber,
            params,
            interval,
            state,
            stats: Arc::new(RefreshStats::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> Arc<RefreshStats> {
        Arc::clone(&self.stats)
    }

    /// Run a cycle immediately, then one per interval, until `shutdown` is
    /// cancelled. A running cycle is finished before the loop exits.
    ///
    /// Returns an error only when the overlay font stops rendering, since
    /// every later cycle would fail the same way.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), SchedulerError> {
        info!(
            "Refresh scheduler started: every {:?}, candidates {:?}",
            self.interval,
            self.locator.candidates()
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.transition(RefreshState::Idle);

            if let Err(CycleError::Annotate { source, .. }) = self.run_cycle().await {
                return Err(SchedulerError::Font(source));
            }
        }

        info!("Refresh scheduler stopped");
        Ok(())
    }

    /// Execute one refresh cycle, publishing on success. A failed cycle
    /// leaves the state at `Backoff` until the next tick.
    pub async fn run_cycle(&self) -> Result<Arc<Snapshot>, CycleError> {
        let started = Instant::now();
        let result = self.cycle().await;

        match &result {
            Ok(snapshot) => {
                self.stats.published.fetch_add(1, Ordering::Relaxed);
                counter!("river_cycles_total", "outcome" => "published").increment(1);
                info!(
                    "Published snapshot #{} ({} bytes) in {:?}",
                    snapshot.sequence(),
                    snapshot.bytes().len(),
                    started.elapsed()
                );
            }
            Err(err) => {
                self.transition(RefreshState::Backoff);
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                counter!("river_cycles_total", "outcome" => "failed").increment(1);
                let (stage, device) = (err.stage(), err.device());
                if err.stage() == Stage::Annotate {
                    error!(%stage, %device, "Refresh cycle aborted: {}", err);
                } else {
                    warn!(%stage, %device, "Refresh cycle aborted: {}", err);
                }
            }
        }

        histogram!("river_cycle_seconds").record(started.elapsed().as_secs_f64());
        if result.is_ok() {
            self.transition(RefreshState::Idle);
        }
        result
    }

    #[instrument(name = "refresh_cycle", skip(self))]
    async fn cycle(&self) -> Result<Arc<Snapshot>, CycleError> {
        let captured_at = Local::now();
        let device = self.locate().await;

        self.transition(RefreshState::Capturing);
        debug!("Capturing from {}", device);
        let raw = self
            .grabber
            .grab(&device, &self.params)
            .await
            .map_err(|source| CycleError::Capture {
                device: device.clone(),
                source,
            })?;

        self.transition(RefreshState::Decoding);
        let service = Arc::clone(&self.service);
        let image = offload(&device, Stage::Decode, move || service.pipeline().decode(&raw))
            .await?
            .map_err(|source| CycleError::Decode {
                device: device.clone(),
                source,
            })?;

        self.transition(RefreshState::Annotating);
        let label = format_label(&captured_at);
        let service = Arc::clone(&self.service);
        let annotated = offload(&device, Stage::Annotate, move || {
            service.pipeline().annotate(&image, &label)
        })
        .await?
        .map_err(|source| CycleError::Annotate {
            device: device.clone(),
            source,
        })?;

        self.transition(RefreshState::Encoding);
        let service = Arc::clone(&self.service);
        let bytes = offload(&device, Stage::Encode, move || {
            service.pipeline().encode(&annotated.image)
        })
        .await?
        .map_err(|source| CycleError::Encode {
            device: device.clone(),
            source,
        })?;

        self.transition(RefreshState::Publishing);
        let snapshot = Snapshot::new(
            bytes,
            captured_at,
            self.service.pipeline().output_format(),
            self.stats.published() + 1,
        );
        Ok(self.service.cache().publish(snapshot))
    }

    /// Device checks open nodes and issue ioctls, so they run on the blocking pool.
    async fn locate(&self) -> CaptureDevice {
        let locator = Arc::clone(&self.locator);
        match task::spawn_blocking(move || locator.locate().clone()).await {
            Ok(device) => device,
            Err(err) => {
                debug!("Device lookup did not complete: {}", err);
                self.locator.fallback().clone()
            }
        }
    }

    fn transition(&self, next: RefreshState) {
        let previous = self.state.send_replace(next);
        debug!("{:?} -> {:?}", previous, next);
    }
}

/// Run CPU-bound stage work off the async workers.
async fn offload<T, F>(device: &CaptureDevice, stage: Stage, work: F) -> Result<T, CycleError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(|err| CycleError::Worker {
            device: device.clone(),
            stage,
            reason: err.to_string(),
        })
}
