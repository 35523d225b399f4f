//! Timing behavior of the capability probe on a paused Tokio clock

#![cfg(feature = "runtime-tokio")]

use ar_experience::{
    CapabilityProbe, DeviceClass, EnvironmentError, MockEnvironment, ProbeConfig, TokioRuntime,
    XrBehavior,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn probe_over(env: MockEnvironment) -> CapabilityProbe<MockEnvironment, TokioRuntime> {
    let runtime = TokioRuntime::new();
    CapabilityProbe::new(env.with_timer(runtime), runtime, ProbeConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_xr_rejection_resolves_to_unsupported() {
    let probe = probe_over(MockEnvironment::ar_phone().with_xr(XrBehavior::Delayed {
        after: Duration::from_secs(3),
        outcome: Err(EnvironmentError::Rejected("SecurityError".into())),
    }));

    let start = Instant::now();
    let snapshot = probe.detect().await.expect("probe settles");

    assert_eq!(start.elapsed(), Duration::from_secs(3));
    assert!(!snapshot.supports_immersive_ar);
    let state = probe.state();
    assert!(!state.is_checking);
    assert!(state.error.is_none());
    assert_eq!(probe.metrics().xr_rejections(), 1);
    assert_eq!(probe.metrics().xr_timeouts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_xr_query_times_out() {
    let probe = probe_over(MockEnvironment::ar_phone().with_xr(XrBehavior::Hang));

    let start = Instant::now();
    let snapshot = probe.detect().await.expect("probe settles");

    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert!(!snapshot.supports_immersive_ar);
    assert_eq!(snapshot.device_class, DeviceClass::Mobile);
    assert!(probe.state().error.is_none());
    assert_eq!(probe.metrics().xr_timeouts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_detect_settles_checking_flag() {
    let probe = probe_over(MockEnvironment::ar_phone().with_xr(XrBehavior::Hang));

    let cancelled = tokio::time::timeout(Duration::from_secs(1), probe.detect()).await;
    assert!(cancelled.is_err());

    let state = probe.state();
    assert!(!state.is_checking);
    assert!(state.snapshot.is_none());
    assert!(state.error.is_none());

    // the next probe is not treated as overlapping
    probe.environment().set_xr(XrBehavior::Supported);
    let snapshot = probe.detect().await.expect("probe settles");
    assert!(snapshot.supports_immersive_ar);
    assert_eq!(probe.metrics().probes_coalesced(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_aborted_resize_task_settles_checking_flag() {
    let probe = probe_over(MockEnvironment::ar_phone().with_xr(XrBehavior::Hang));

    let task = probe
        .on_resize()
        .downcast::<tokio::task::JoinHandle<()>>()
        .expect("tokio handle");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(probe.is_checking());

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert!(!probe.is_checking());
}

#[tokio::test(start_paused = true)]
async fn test_slow_xr_answer_within_timeout_is_kept() {
    let probe = probe_over(MockEnvironment::ar_phone().with_xr(XrBehavior::Delayed {
        after: Duration::from_millis(4900),
        outcome: Ok(true),
    }));

    let snapshot = probe.detect().await.expect("probe settles");
    assert!(snapshot.supports_immersive_ar);
    assert_eq!(probe.metrics().xr_timeouts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_while_pending_discards_result() {
    let probe = probe_over(MockEnvironment::ar_phone().with_xr(XrBehavior::Delayed {
        after: Duration::from_secs(3),
        outcome: Ok(true),
    }));
    let notified = Arc::new(AtomicUsize::new(0));
    let _subscription = probe.subscribe({
        let notified = Arc::clone(&notified);
        move |_| {
            notified.fetch_add(1, Ordering::SeqCst);
        }
    });

    let pending = tokio::spawn({
        let probe = probe.clone();
        async move { probe.detect().await }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(probe.is_checking());

    probe.dispose();
    let result = pending.await.unwrap();

    assert!(result.is_none());
    assert!(probe.snapshot().is_none());
    // only the "checking" notification went out
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(probe.metrics().results_discarded(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_detect_is_coalesced() {
    let env = MockEnvironment::ar_phone().with_xr(XrBehavior::Delayed {
        after: Duration::from_secs(2),
        outcome: Ok(true),
    });
    let probe = probe_over(env.clone());

    let first = tokio::spawn({
        let probe = probe.clone();
        async move { probe.detect().await }
    });
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(probe.detect().await.is_none());
    assert!(first.await.unwrap().is_some());
    assert_eq!(env.xr_queries(), 1);
    assert_eq!(probe.metrics().probes_coalesced(), 1);
    assert_eq!(probe.metrics().probes_run(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resize_burst_probes_once() {
    let env = MockEnvironment::phone();
    let probe = probe_over(env.clone());

    for width in [400, 500, 600] {
        env.resize(width, 900);
        let _ = probe.on_resize();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(probe.metrics().probes_run(), 1);
    let snapshot = probe.snapshot().expect("debounced probe ran");
    assert_eq!(snapshot.viewport.width, 600);
}

#[tokio::test(start_paused = true)]
async fn test_separated_resizes_each_probe() {
    let env = MockEnvironment::phone();
    let probe = probe_over(env.clone());

    env.resize(500, 900);
    let _ = probe.on_resize();
    tokio::time::sleep(Duration::from_secs(1)).await;
    env.resize(900, 1200);
    let _ = probe.on_resize();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(probe.metrics().probes_run(), 2);
    assert_eq!(probe.snapshot().unwrap().viewport.width, 900);
}

#[tokio::test(start_paused = true)]
async fn test_xr_answer_reused_within_interval() {
    let env = MockEnvironment::ar_phone();
    let probe = probe_over(env.clone());

    probe.detect().await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    probe.detect().await;
    assert_eq!(env.xr_queries(), 1);
    assert_eq!(probe.metrics().xr_cache_hits(), 1);

    tokio::time::sleep(Duration::from_secs(8)).await;
    env.set_xr(XrBehavior::Unsupported);
    let snapshot = probe.detect().await.unwrap();
    assert_eq!(env.xr_queries(), 2);
    assert!(!snapshot.supports_immersive_ar);
}

#[tokio::test(start_paused = true)]
async fn test_resize_after_dispose_does_nothing() {
    let env = MockEnvironment::phone();
    let probe = probe_over(env.clone());

    let _ = probe.on_resize();
    probe.dispose();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(probe.metrics().probes_run(), 0);
    assert!(probe.snapshot().is_none());
}
