//! # Reconnection Supervisor
//!
//! Owns the device handle and keeps trying to acquire one.
//!
//! ## State Machine
//!
//! ```text
//!   Idle ──acquire──► Acquiring ──ok──► Bound ──error──► Idle (retry pending)
//!    ▲                    │                                   │
//!    │                    └──────error──────► Idle ◄──────────┘
//!    └──────────────── retry timer fires ───────────────────┘
//! ```
//!
//! - Only one acquisition attempt runs at a time: `acquire` takes `&mut self`
//!   and is never started while `Bound`.
//! - At most one retry is pending. When it fires the state is re-checked, so a
//!   stale retry never disturbs a bound device.
//! - The handle lives in an `Option` and is released with `take()`, so it is
//!   closed at most once on every path (error, replacement, shutdown).

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::controller::InputEngine;
use crate::error::RcBridgeError;

use super::source_trait::{DeviceConnector, InputSource};

/// Default delay between acquisition attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Connection state of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No handle; a retry may be pending.
    Idle,
    /// An acquisition attempt is in flight.
    Acquiring,
    /// A handle is open and events are being forwarded.
    Bound,
}

/// Drives an [`InputEngine`] from a reconnecting device.
pub struct ReconnectSupervisor<C: DeviceConnector> {
    connector: C,
    engine: InputEngine,
    state: SupervisorState,
    source: Option<C::Source>,
    retry_delay: Duration,
    retry_at: Option<Instant>,
    attempts: u64,
}

impl<C: DeviceConnector> ReconnectSupervisor<C> {
    pub fn new(connector: C, engine: InputEngine, retry_delay: Duration) -> Self {
        Self {
            connector,
            engine,
            state: SupervisorState::Idle,
            source: None,
            retry_delay,
            retry_at: None,
            attempts: 0,
        }
    }

    /// Runs until `shutdown` resolves, then releases the handle.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use rc_car_bridge::controller::InputEngine;
    /// use rc_car_bridge::device::{EvdevConnector, ReconnectSupervisor};
    ///
    /// # async fn example() {
    /// let mut supervisor = ReconnectSupervisor::new(
    ///     EvdevConnector::new("/dev/input/event0"),
    ///     InputEngine::default(),
    ///     Duration::from_millis(1000),
    /// );
    /// supervisor.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
    /// # }
    /// ```
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.step() => {}
            }
        }

        self.shutdown();
    }

    /// Performs one unit of work: forwards one event while bound, otherwise
    /// waits out the pending retry (if any) and attempts acquisition.
    pub async fn step(&mut self) {
        if let Some(source) = self.source.as_mut() {
            let next = source.next_event().await;
            match next {
                Ok(event) => self.engine.on_event(&event),
                Err(e) => self.fail(e),
            }
            return;
        }

        match self.retry_at {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.on_retry().await;
            }
            None => self.acquire().await,
        }
    }

    /// Attempts to open the device. No-op while bound.
    pub async fn acquire(&mut self) {
        if self.state == SupervisorState::Bound {
            debug!("Already bound, skipping acquisition");
            return;
        }

        self.state = SupervisorState::Acquiring;
        self.attempts += 1;
        debug!(attempt = self.attempts, "Acquiring input device");

        match self.connector.connect().await {
            Ok(source) => self.bind(source),
            Err(e) => self.fail(e),
        }
    }

    /// Retry timer callback. Clears the pending retry and acquires only if
    /// not already bound.
    pub async fn on_retry(&mut self) {
        self.retry_at = None;

        if self.state == SupervisorState::Bound {
            debug!("Retry superseded by an existing connection");
            return;
        }
        self.acquire().await;
    }

    /// Releases the handle exactly once, whatever the current state.
    pub fn shutdown(&mut self) {
        self.retry_at = None;
        if self.release() {
            info!("Input device released on shutdown");
        }
        self.state = SupervisorState::Idle;
    }

    fn bind(&mut self, source: C::Source) {
        // Replacing a handle releases the old one first
        if self.release() {
            debug!("Released previous input device");
        }

        self.retry_at = None;
        self.state = SupervisorState::Bound;
        info!(
            device = %source.capabilities().name,
            path = %source.capabilities().path,
            "Input device bound"
        );

        self.engine.on_ready(source.capabilities());
        self.source = Some(source);
    }

    fn fail(&mut self, error: RcBridgeError) {
        warn!(error = %error, retry_in_ms = self.retry_delay.as_millis() as u64, "Input device unavailable");
        self.engine.on_error(&error);

        if self.release() {
            info!("Input device released after error");
        }
        self.engine.on_disconnect();
        self.state = SupervisorState::Idle;

        if self.retry_at.is_none() {
            self.retry_at = Some(Instant::now() + self.retry_delay);
        }
    }

    /// Closes the current handle. Returns `true` if one was open.
    fn release(&mut self) -> bool {
        match self.source.take() {
            Some(mut source) => {
                source.close();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    #[must_use]
    pub fn retry_pending(&self) -> bool {
        self.retry_at.is_some()
    }

    /// Number of acquisition attempts started so far.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    #[must_use]
    pub fn engine(&self) -> &InputEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut InputEngine {
        &mut self.engine
    }
}

impl<C: DeviceConnector> Drop for ReconnectSupervisor<C> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<C: DeviceConnector> std::fmt::Debug for ReconnectSupervisor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectSupervisor")
            .field("state", &self.state)
            .field("retry_pending", &self.retry_at.is_some())
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}
