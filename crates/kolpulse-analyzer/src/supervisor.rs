//! Keeps long-running analyzer units alive and stops them together.
//!
//! Each unit runs in its own task. When a unit fails, panics, or returns
//! while the supervisor is still running, it is restarted after a jittered
//! exponential backoff. Other units are unaffected.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use kolpulse_core::AppConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::AnalyzerError;

/// A long-running analyzer activity.
///
/// `run` should return promptly once `cancel` fires, after finishing any
/// in-flight work.
#[async_trait]
pub trait Unit: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn run(&self, cancel: CancellationToken) -> Result<(), AnalyzerError>;
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// How long units get to stop before they are aborted.
    pub shutdown_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl SupervisorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            backoff_base: Duration::from_millis(config.supervisor_backoff_base_ms),
            backoff_max: Duration::from_millis(config.supervisor_backoff_max_ms),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
        }
    }
}

/// Which units stopped on their own and which had to be aborted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub stopped: Vec<&'static str>,
    pub aborted: Vec<&'static str>,
}

struct SupervisedUnit {
    name: &'static str,
    handle: JoinHandle<()>,
    restarts: Arc<AtomicU32>,
}

pub struct Supervisor {
    cancel: CancellationToken,
    units: Vec<SupervisedUnit>,
    grace: Duration,
}

impl Supervisor {
    /// Spawn every unit under supervision. Must be called inside a Tokio
    /// runtime.
    #[must_use]
    pub fn start(units: Vec<Arc<dyn Unit>>, config: &SupervisorConfig) -> Self {
        let cancel = CancellationToken::new();
        let units = units
            .into_iter()
            .map(|unit| {
                let name = unit.name();
                let restarts = Arc::new(AtomicU32::new(0));
                let handle = tokio::spawn(supervise(
                    unit,
                    cancel.clone(),
                    config.clone(),
                    Arc::clone(&restarts),
                ));
                tracing::info!(unit = name, "unit started");
                SupervisedUnit {
                    name,
                    handle,
                    restarts,
                }
            })
            .collect();

        Self {
            cancel,
            units,
            grace: config.shutdown_grace,
        }
    }

    /// Token cancelled when shutdown begins.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of times the named unit has been restarted.
    #[must_use]
    pub fn restarts(&self, name: &str) -> Option<u32> {
        self.units
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.restarts.load(Ordering::SeqCst))
    }

    /// Signal every unit to stop, wait up to the grace period, then abort
    /// whatever is still running.
    pub async fn shutdown(self) -> ShutdownReport {
        self.cancel.cancel();
        let deadline = tokio::time::Instant::now() + self.grace;
        let mut report = ShutdownReport::default();

        for mut unit in self.units {
            match tokio::time::timeout_at(deadline, &mut unit.handle).await {
                Ok(Ok(())) => report.stopped.push(unit.name),
                Ok(Err(e)) => {
                    tracing::error!(unit = unit.name, error = %e, "supervisor task failed");
                    report.stopped.push(unit.name);
                }
                Err(_) => {
                    tracing::warn!(unit = unit.name, "unit did not stop within grace period; aborting");
                    unit.handle.abort();
                    report.aborted.push(unit.name);
                }
            }
        }

        tracing::info!(
            stopped = report.stopped.len(),
            aborted = report.aborted.len(),
            "supervisor shut down"
        );
        report
    }
}

/// Aborts the wrapped task when dropped, so aborting a supervisor task also
/// stops the unit it is waiting on.
struct AbortOnDrop(JoinHandle<Result<(), AnalyzerError>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn supervise(
    unit: Arc<dyn Unit>,
    cancel: CancellationToken,
    config: SupervisorConfig,
    restarts: Arc<AtomicU32>,
) {
    let name = unit.name();
    let mut attempt = 0_u32;

    loop {
        let started = Instant::now();
        let mut task = AbortOnDrop(tokio::spawn({
            let unit = Arc::clone(&unit);
            let cancel = cancel.clone();
            async move { unit.run(cancel).await }
        }));
        let outcome = (&mut task.0).await;

        if cancel.is_cancelled() {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(unit = name, error = %e, "unit failed while stopping"),
                Err(e) => tracing::error!(unit = name, error = %e, "unit panicked while stopping"),
            }
            tracing::info!(unit = name, "unit stopped");
            return;
        }

        match outcome {
            Ok(Ok(())) => tracing::warn!(unit = name, "unit exited unexpectedly"),
            Ok(Err(e)) => tracing::error!(unit = name, error = %e, "unit failed"),
            Err(e) => tracing::error!(unit = name, error = %e, "unit panicked"),
        }

        if started.elapsed() >= config.backoff_max {
            attempt = 0;
        }
        attempt = attempt.saturating_add(1);
        let delay = backoff_delay(attempt, config.backoff_base, config.backoff_max);
        restarts.fetch_add(1, Ordering::SeqCst);
        tracing::warn!(
            unit = name,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "restarting unit after back-off"
        );

        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(unit = name, "unit stopped");
                return;
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
}

/// `base × 2^(attempt-1)`, capped at `max`, with ±25% jitter.
fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let capped = base.saturating_mul(1_u32 << exponent).min(max);
    capped.mul_f64(rand::random::<f64>() * 0.5 + 0.75)
}
