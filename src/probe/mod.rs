//! Device capability probing
//!
//! [`CapabilityProbe`] reads the host through an [`EnvironmentPort`] and
//! publishes a [`ProbeState`]: the latest [`CapabilitySnapshot`], an
//! `is_checking` flag and an error slot.
//!
//! - The immersive-AR query is bounded by `xr_query_timeout`; rejection and
//!   timeout both resolve to "unsupported" and never fill the error slot.
//! - XR answers are reused until `min_xr_reprobe_interval` has passed.
//! - Overlapping `detect` calls are coalesced: the second returns `None`.
//! - Resizes are debounced; only the last resize in a burst re-probes.
//! - After [`CapabilityProbe::dispose`] nothing is written to the state,
//!   including results of a probe that was already pending.

pub mod metrics;

use crate::capability::{classify_device, classify_screen, Breakpoints, CapabilitySnapshot};
use crate::environment::{EnvironmentError, EnvironmentPort, PermissionState};
use crate::runtime::{with_timeout, AsyncRuntime, Bounded, JoinHandle};
use metrics::ProbeMetricsHandle;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

pub use metrics::ProbeMetrics;

/// Probe configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Upper bound on the immersive-AR and camera permission queries
    pub xr_query_timeout: Duration,
    /// Minimum time between two immersive-AR queries
    pub min_xr_reprobe_interval: Duration,
    /// Quiet period after the last resize before re-probing
    pub resize_debounce: Duration,
    pub breakpoints: Breakpoints,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            xr_query_timeout: Duration::from_secs(5),
            min_xr_reprobe_interval: Duration::from_secs(10),
            resize_debounce: Duration::from_millis(250),
            breakpoints: Breakpoints::default(),
        }
    }
}

impl ProbeConfig {
    pub fn with_xr_query_timeout(mut self, timeout: Duration) -> Self {
        self.xr_query_timeout = timeout;
        self
    }

    pub fn with_min_xr_reprobe_interval(mut self, interval: Duration) -> Self {
        self.min_xr_reprobe_interval = interval;
        self
    }

    pub fn with_resize_debounce(mut self, debounce: Duration) -> Self {
        self.resize_debounce = debounce;
        self
    }

    pub fn with_breakpoints(mut self, breakpoints: Breakpoints) -> Self {
        self.breakpoints = breakpoints;
        self
    }
}

/// Published probe state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeState {
    /// Latest settled snapshot; kept across failed re-probes
    pub snapshot: Option<CapabilitySnapshot>,
    pub is_checking: bool,
    pub error: Option<String>,
}

impl ProbeState {
    /// Whether a probe has settled at least once
    pub fn is_settled(&self) -> bool {
        !self.is_checking && (self.snapshot.is_some() || self.error.is_some())
    }
}

type Listener = Arc<dyn Fn(&ProbeState) + Send + Sync>;
type ListenerTable = Mutex<Vec<(u64, Listener)>>;

/// Token returned by [`CapabilityProbe::subscribe`]; dropping it removes the listener
#[must_use = "dropping the subscription removes the listener"]
pub struct ProbeSubscription {
    id: u64,
    listeners: Weak<ListenerTable>,
}

impl ProbeSubscription {
    /// Remove the listener now
    pub fn dispose(self) {}
}

impl Drop for ProbeSubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct XrAnswer {
    at: Instant,
    supported: bool,
}

struct ProbeInner<E, R> {
    env: Arc<E>,
    runtime: R,
    config: ProbeConfig,
    state: RwLock<ProbeState>,
    in_flight: AtomicBool,
    disposed: AtomicBool,
    resize_generation: AtomicU64,
    xr_answer: Mutex<Option<XrAnswer>>,
    listeners: Arc<ListenerTable>,
    next_listener: AtomicU64,
    metrics: ProbeMetricsHandle,
}

/// Clears the in-flight flag when a probe finishes or its future is dropped.
/// A probe dropped before settling also publishes `is_checking = false`.
struct InFlight<'a, E, R>
where
    E: EnvironmentPort + 'static,
    R: AsyncRuntime,
{
    probe: &'a CapabilityProbe<E, R>,
    settled: bool,
}

impl<E, R> Drop for InFlight<'_, E, R>
where
    E: EnvironmentPort + 'static,
    R: AsyncRuntime,
{
    fn drop(&mut self) {
        if !self.settled {
            log::debug!("Capability probe cancelled before settling");
            self.probe.commit(|state| state.is_checking = false);
        }
        self.probe.inner.in_flight.store(false, Ordering::SeqCst);
    }
}

/// Asynchronous device capability probe
///
/// Cloning is cheap; clones share state.
pub struct CapabilityProbe<E, R> {
    inner: Arc<ProbeInner<E, R>>,
}

impl<E, R> Clone for CapabilityProbe<E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E, R> CapabilityProbe<E, R>
where
    E: EnvironmentPort + 'static,
    R: AsyncRuntime,
{
    /// Creates a probe over `env`; nothing is queried until [`detect`](Self::detect)
    pub fn new(env: E, runtime: R, config: ProbeConfig) -> Self {
        Self::from_shared(Arc::new(env), runtime, config)
    }

    /// Creates a probe over an environment shared with other components
    pub fn from_shared(env: Arc<E>, runtime: R, config: ProbeConfig) -> Self {
        Self {
            inner: Arc::new(ProbeInner {
                env,
                runtime,
                config,
                state: RwLock::new(ProbeState::default()),
                in_flight: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                resize_generation: AtomicU64::new(0),
                xr_answer: Mutex::new(None),
                listeners: Arc::new(Mutex::new(Vec::new())),
                next_listener: AtomicU64::new(1),
                metrics: ProbeMetricsHandle::new(),
            }),
        }
    }

    pub fn environment(&self) -> &E {
        &self.inner.env
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &ProbeMetricsHandle {
        &self.inner.metrics
    }

    /// Current published state
    pub fn state(&self) -> ProbeState {
        self.inner.state.read().clone()
    }

    /// Latest settled snapshot
    pub fn snapshot(&self) -> Option<CapabilitySnapshot> {
        self.inner.state.read().snapshot.clone()
    }

    pub fn is_checking(&self) -> bool {
        self.inner.state.read().is_checking
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Register a callback invoked after every committed state change
    pub fn subscribe<F>(&self, listener: F) -> ProbeSubscription
    where
        F: Fn(&ProbeState) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        if !self.is_disposed() {
            self.inner.listeners.lock().push((id, Arc::new(listener)));
        }
        ProbeSubscription {
            id,
            listeners: Arc::downgrade(&self.inner.listeners),
        }
    }

    /// Run one probe.
    ///
    /// Returns `None` when the call was coalesced into a probe already in
    /// flight, when the environment could not be read, or when the probe
    /// was disposed before the result arrived.
    pub async fn detect(&self) -> Option<CapabilitySnapshot> {
        let inner = &self.inner;
        if self.is_disposed() {
            return None;
        }
        if inner.in_flight.swap(true, Ordering::SeqCst) {
            inner.metrics.record_coalesced();
            log::debug!("Capability probe already in flight, ignoring request");
            return None;
        }
        let mut in_flight = InFlight {
            probe: self,
            settled: false,
        };

        self.commit(|state| state.is_checking = true);
        let started = inner.runtime.now();
        let outcome = self.run_probe().await;
        in_flight.settled = true;

        if self.is_disposed() {
            inner.metrics.record_discarded();
            log::debug!("Probe settled after dispose, discarding result");
            return None;
        }
        inner
            .metrics
            .record_probe(inner.runtime.now().saturating_duration_since(started));

        match outcome {
            Ok(snapshot) => {
                log::debug!(
                    "Capability snapshot: {:?}/{:?}, immersive-ar: {}",
                    snapshot.device_class,
                    snapshot.screen_size_class,
                    snapshot.supports_immersive_ar
                );
                let published = snapshot.clone();
                self.commit(move |state| {
                    state.snapshot = Some(published);
                    state.is_checking = false;
                    state.error = None;
                });
                Some(snapshot)
            }
            Err(err) => {
                log::warn!("Capability probe failed: {err}");
                self.commit(move |state| {
                    state.is_checking = false;
                    state.error = Some(err.to_string());
                });
                None
            }
        }
    }

    /// Debounced re-probe for a viewport resize.
    ///
    /// Waits `resize_debounce`; if another resize arrived meanwhile this call
    /// returns `None` and leaves the probing to the later one.
    pub async fn resized(&self) -> Option<CapabilitySnapshot> {
        if self.is_disposed() {
            return None;
        }
        let generation = self.inner.resize_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .runtime
            .sleep(self.inner.config.resize_debounce)
            .await;

        if self.is_disposed() || self.inner.resize_generation.load(Ordering::SeqCst) != generation
        {
            return None;
        }
        self.detect().await
    }

    /// Fire-and-forget variant of [`resized`](Self::resized) for event handlers
    pub fn on_resize(&self) -> JoinHandle {
        let probe = self.clone();
        self.inner.runtime.spawn(async move {
            let _ = probe.resized().await;
        })
    }

    /// Stop publishing. Pending debounce tasks exit when they wake and a
    /// probe already in flight has its result discarded.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.resize_generation.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.lock().clear();
        log::debug!("Capability probe disposed");
    }

    async fn run_probe(&self) -> Result<CapabilitySnapshot, EnvironmentError> {
        let env = &*self.inner.env;
        let config = &self.inner.config;

        let viewport = env.viewport()?;
        let user_agent = env.user_agent();
        let is_touch_capable = env.is_touch_capable();
        let supports_orientation_events = env.supports_orientation_events();
        let supports_vibration = env.supports_vibration();

        let supports_immersive_ar = self.immersive_ar_supported().await;
        let camera_permission = match with_timeout(
            &self.inner.runtime,
            config.xr_query_timeout,
            env.camera_permission(),
        )
        .await
        {
            Bounded::Completed(Ok(state)) => state,
            Bounded::Completed(Err(err)) => {
                log::debug!("Camera permission query failed: {err}");
                PermissionState::Unknown
            }
            Bounded::TimedOut => PermissionState::Unknown,
        };

        Ok(CapabilitySnapshot {
            is_touch_capable,
            device_class: classify_device(
                &user_agent,
                is_touch_capable,
                viewport,
                &config.breakpoints,
            ),
            screen_size_class: classify_screen(viewport.width, &config.breakpoints),
            supports_immersive_ar,
            supports_orientation_events,
            supports_vibration,
            camera_permission,
            viewport,
        })
    }

    async fn immersive_ar_supported(&self) -> bool {
        let inner = &self.inner;
        let now = inner.runtime.now();
        let cached = *inner.xr_answer.lock();
        if let Some(answer) = cached {
            if now.saturating_duration_since(answer.at) < inner.config.min_xr_reprobe_interval {
                inner.metrics.record_xr_cache_hit();
                return answer.supported;
            }
        }

        let supported = match with_timeout(
            &inner.runtime,
            inner.config.xr_query_timeout,
            inner.env.is_immersive_ar_supported(),
        )
        .await
        {
            Bounded::Completed(Ok(supported)) => supported,
            Bounded::Completed(Err(err)) => {
                inner.metrics.record_xr_rejection();
                log::debug!("Immersive AR query rejected: {err}");
                false
            }
            Bounded::TimedOut => {
                inner.metrics.record_xr_timeout();
                log::debug!(
                    "Immersive AR query timed out after {:?}",
                    inner.config.xr_query_timeout
                );
                false
            }
        };

        *inner.xr_answer.lock() = Some(XrAnswer {
            at: inner.runtime.now(),
            supported,
        });
        supported
    }

    fn commit<F>(&self, update: F)
    where
        F: FnOnce(&mut ProbeState),
    {
        if self.is_disposed() {
            return;
        }
        let published = {
            let mut state = self.inner.state.write();
            update(&mut state);
            state.clone()
        };
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&published);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::DeviceClass;
    use crate::environment::{MockEnvironment, XrBehavior};
    use crate::runtime::MockRuntime;

    fn block_on<T>(f: impl std::future::Future<Output = T>) -> T {
        futures::executor::block_on(f)
    }

    #[test]
    fn test_initial_state() {
        let probe = CapabilityProbe::new(
            MockEnvironment::phone(),
            MockRuntime::new(),
            ProbeConfig::default(),
        );
        let state = probe.state();
        assert!(state.snapshot.is_none());
        assert!(!state.is_checking);
        assert!(!state.is_settled());
    }

    #[test]
    fn test_detect_phone() {
        let probe = CapabilityProbe::new(
            MockEnvironment::phone(),
            MockRuntime::new(),
            ProbeConfig::default(),
        );
        let snapshot = block_on(probe.detect()).unwrap();
        assert_eq!(snapshot.device_class, DeviceClass::Mobile);
        assert!(snapshot.is_touch_capable);
        assert!(snapshot.supports_vibration);
        assert!(!snapshot.supports_immersive_ar);
        assert!(probe.state().is_settled());
    }

    #[test]
    fn test_rejection_is_not_an_error() {
        let env = MockEnvironment::phone().with_xr(XrBehavior::Reject);
        let probe = CapabilityProbe::new(env, MockRuntime::new(), ProbeConfig::default());
        let snapshot = block_on(probe.detect()).unwrap();
        assert!(!snapshot.supports_immersive_ar);
        assert_eq!(probe.state().error, None);
        assert_eq!(probe.metrics().xr_rejections(), 1);
    }

    #[test]
    fn test_hanging_query_times_out() {
        // the mock timer fires immediately
        let env = MockEnvironment::ar_phone().with_xr(XrBehavior::Hang);
        let probe = CapabilityProbe::new(env, MockRuntime::new(), ProbeConfig::default());
        let snapshot = block_on(probe.detect()).unwrap();
        assert!(!snapshot.supports_immersive_ar);
        assert_eq!(probe.metrics().xr_timeouts(), 1);
        assert!(!probe.is_checking());
    }

    #[test]
    fn test_headless_fills_error_slot() {
        let probe = CapabilityProbe::new(
            MockEnvironment::headless(),
            MockRuntime::new(),
            ProbeConfig::default(),
        );
        assert!(block_on(probe.detect()).is_none());
        let state = probe.state();
        assert!(state.error.unwrap().contains("No window"));
        assert!(!state.is_checking);
        assert!(state.snapshot.is_none());
    }

    #[test]
    fn test_xr_reprobe_interval() {
        let env = MockEnvironment::ar_phone();
        let runtime = MockRuntime::new();
        let probe = CapabilityProbe::new(env.clone(), runtime.clone(), ProbeConfig::default());

        block_on(probe.detect());
        block_on(probe.detect());
        assert_eq!(env.xr_queries(), 1);
        assert_eq!(probe.metrics().xr_cache_hits(), 1);

        runtime.advance(Duration::from_secs(11));
        env.set_xr(XrBehavior::Unsupported);
        let snapshot = block_on(probe.detect()).unwrap();
        assert_eq!(env.xr_queries(), 2);
        assert!(!snapshot.supports_immersive_ar);
    }

    #[test]
    fn test_snapshot_replaced_on_resize() {
        let env = MockEnvironment::phone();
        let probe =
            CapabilityProbe::new(env.clone(), MockRuntime::blocking(), ProbeConfig::default());
        block_on(probe.detect());
        assert_eq!(probe.snapshot().unwrap().device_class, DeviceClass::Mobile);

        env.resize(900, 600);
        let _ = probe.on_resize();
        assert_eq!(probe.snapshot().unwrap().device_class, DeviceClass::Tablet);
    }

    #[test]
    fn test_failed_reprobe_keeps_previous_snapshot() {
        let env = MockEnvironment::phone();
        let probe = CapabilityProbe::new(env.clone(), MockRuntime::new(), ProbeConfig::default());
        let first = block_on(probe.detect()).unwrap();

        env.close_window();
        assert!(block_on(probe.detect()).is_none());

        let state = probe.state();
        assert_eq!(state.snapshot, Some(first));
        assert!(state.error.is_some());
        assert!(!state.is_checking);
    }

    #[test]
    fn test_subscription_receives_changes_until_dropped() {
        use std::sync::atomic::AtomicUsize;

        let probe = CapabilityProbe::new(
            MockEnvironment::desktop(),
            MockRuntime::new(),
            ProbeConfig::default(),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let subscription = probe.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        block_on(probe.detect());
        // checking + settled
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        drop(subscription);
        block_on(probe.detect());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disposed_probe_does_nothing() {
        let env = MockEnvironment::phone();
        let probe =
            CapabilityProbe::new(env.clone(), MockRuntime::blocking(), ProbeConfig::default());
        probe.dispose();
        assert!(block_on(probe.detect()).is_none());
        let _ = probe.on_resize();
        assert_eq!(probe.state(), ProbeState::default());
        assert_eq!(env.xr_queries(), 0);
    }
}
