//! Experience viewing session
//!
//! Ties one [`Experience`] to a probe and a router, and drives them in the
//! order the view needs: detection settles before the first mount decision,
//! resizes re-probe in the background and re-route on the next
//! [`refresh`](ExperienceSession::refresh), and unmounting disposes of the
//! probe before the viewer is released.

use crate::asset::{normalize_all, Experience};
use crate::environment::EnvironmentPort;
use crate::error::{ExperienceError, Result};
use crate::mode::RenderMode;
use crate::probe::{CapabilityProbe, ProbeConfig, ProbeSubscription};
use crate::runtime::{AsyncRuntime, JoinHandle};
use crate::viewer::{
    RouteChange, RouterCommand, UserAction, ViewerEvent, ViewerFactory, ViewerRouter, ViewerSlot,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Session configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub probe: ProbeConfig,
}

impl SessionConfig {
    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One open experience view
pub struct ExperienceSession<E, R, F>
where
    E: EnvironmentPort + 'static,
    R: AsyncRuntime,
    F: ViewerFactory,
{
    experience_id: String,
    name: String,
    dropped_assets: usize,
    probe: CapabilityProbe<E, R>,
    router: ViewerRouter<F>,
    stale: Arc<AtomicBool>,
    _watch: ProbeSubscription,
}

impl<E, R, F> ExperienceSession<E, R, F>
where
    E: EnvironmentPort + 'static,
    R: AsyncRuntime,
    F: ViewerFactory,
{
    /// Open an experience; assets are normalized against the page origin
    pub fn open(
        experience: &Experience,
        env: E,
        runtime: R,
        factory: F,
        config: SessionConfig,
    ) -> Self {
        let origin = env.origin();
        let assets = normalize_all(&experience.assets, &origin);
        let dropped_assets = experience.assets.len() - assets.len();
        if dropped_assets > 0 {
            log::debug!(
                "Experience {}: {dropped_assets} of {} assets not renderable",
                experience.id,
                experience.assets.len()
            );
        }

        let probe = CapabilityProbe::new(env, runtime, config.probe);
        let stale = Arc::new(AtomicBool::new(false));
        let watch = probe.subscribe({
            let stale = Arc::clone(&stale);
            move |state| {
                if !state.is_checking {
                    stale.store(true, Ordering::SeqCst);
                }
            }
        });

        Self {
            experience_id: experience.id.clone(),
            name: experience.name.clone(),
            dropped_assets,
            probe,
            router: ViewerRouter::new(factory, assets),
            stale,
            _watch: watch,
        }
    }

    /// Open an experience from a backend JSON payload
    pub fn open_json(
        payload: &str,
        env: E,
        runtime: R,
        factory: F,
        config: SessionConfig,
    ) -> Result<Self> {
        let experience: Experience = serde_json::from_str(payload)?;
        if experience.id.trim().is_empty() {
            return Err(ExperienceError::InvalidData(
                "experience payload has an empty id".to_string(),
            ));
        }
        Ok(Self::open(&experience, env, runtime, factory, config))
    }

    pub fn experience_id(&self) -> &str {
        &self.experience_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of backend assets dropped during normalization
    pub fn dropped_assets(&self) -> usize {
        self.dropped_assets
    }

    pub fn probe(&self) -> &CapabilityProbe<E, R> {
        &self.probe
    }

    pub fn router(&self) -> &ViewerRouter<F> {
        &self.router
    }

    pub fn slot(&self) -> &ViewerSlot {
        self.router.slot()
    }

    pub fn active_mode(&self) -> Option<RenderMode> {
        self.router.active_mode()
    }

    /// Run the first probe, then route
    ///
    /// While detection is pending the host renders from
    /// [`CapabilityProbe::state`]; no viewer is mounted before it settles.
    pub async fn mount(&mut self) -> RouteChange {
        self.probe.detect().await;
        self.refresh()
    }

    /// Re-sync the router with the probe's current state
    pub fn refresh(&mut self) -> RouteChange {
        self.stale.store(false, Ordering::SeqCst);
        self.router.sync(&self.probe.state())
    }

    /// Whether a probe settled since the last [`refresh`](Self::refresh)
    pub fn needs_refresh(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Schedule a debounced re-probe for a viewport resize and return
    ///
    /// A burst of calls results in one probe. Once it settles,
    /// [`needs_refresh`](Self::needs_refresh) turns true and the host calls
    /// [`refresh`](Self::refresh) to re-route. Returns `None` without
    /// scheduling anything while the view is blocked, exited or waiting for
    /// a retry after a failed probe.
    pub fn on_resize(&self) -> Option<JoinHandle> {
        if self.router.is_terminal() || matches!(self.router.slot(), ViewerSlot::ProbeFailed { .. })
        {
            log::debug!("Ignoring resize in {:?}", self.router.slot());
            return None;
        }
        Some(self.probe.on_resize())
    }

    /// Apply a user action; re-probes when the router asks for it
    pub async fn handle(&mut self, action: UserAction) -> RouterCommand {
        let command = self.router.handle(action);
        match command {
            RouterCommand::Reprobe => {
                self.probe.detect().await;
                self.refresh();
            }
            RouterCommand::Exit => self.probe.dispose(),
            RouterCommand::None => {}
        }
        command
    }

    /// Forward a callback from the mounted viewer
    pub fn viewer_event(&mut self, event: ViewerEvent) -> RouteChange {
        self.router.viewer_event(event)
    }

    /// Tear the view down: stop the probe, then release the viewer
    pub fn unmount(&mut self) {
        self.probe.dispose();
        self.router.shutdown();
    }
}

impl<E, R, F> Drop for ExperienceSession<E, R, F>
where
    E: EnvironmentPort + 'static,
    R: AsyncRuntime,
    F: ViewerFactory,
{
    fn drop(&mut self) {
        self.probe.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetRecord;
    use crate::environment::MockEnvironment;
    use crate::runtime::MockRuntime;
    use crate::viewer::MockViewerFactory;
    use std::time::Duration;

    fn experience() -> Experience {
        Experience {
            id: "exp-1".to_string(),
            name: "Lobby".to_string(),
            description: None,
            assets: vec![
                AssetRecord {
                    name: "Statue".to_string(),
                    kind: "model3d".to_string(),
                    url: Some("/statue.glb".to_string()),
                    ..Default::default()
                },
                AssetRecord {
                    name: "Broken".to_string(),
                    kind: "video".to_string(),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_open_normalizes_assets() {
        let session = ExperienceSession::open(
            &experience(),
            MockEnvironment::desktop(),
            MockRuntime::new(),
            MockViewerFactory::new(),
            SessionConfig::default(),
        );
        assert_eq!(session.dropped_assets(), 1);
        assert_eq!(session.router().assets().len(), 1);
        assert_eq!(
            session.router().assets()[0].content.url(),
            Some("https://ar.example.test/statue.glb")
        );
        assert!(matches!(session.slot(), ViewerSlot::Empty));
    }

    #[test]
    fn test_mount_desktop() {
        let factory = MockViewerFactory::new();
        let journal = factory.journal();
        let mut session = ExperienceSession::open(
            &experience(),
            MockEnvironment::desktop(),
            MockRuntime::new(),
            factory,
            SessionConfig::default(),
        );
        let change = futures::executor::block_on(session.mount());
        assert_eq!(
            change,
            RouteChange::Mounted {
                from: None,
                to: RenderMode::Desktop3d
            }
        );
        assert_eq!(journal.mounts(), 1);

        session.unmount();
        assert_eq!(journal.resident(), 0);
        assert!(session.probe().is_disposed());
    }

    #[test]
    fn test_resize_marks_session_stale() {
        let env = MockEnvironment::phone();
        let mut session = ExperienceSession::open(
            &experience(),
            env.clone(),
            MockRuntime::blocking(),
            MockViewerFactory::new(),
            SessionConfig::default(),
        );
        futures::executor::block_on(session.mount());
        assert!(!session.needs_refresh());

        env.resize(900, 1200);
        assert!(session.on_resize().is_some());
        assert!(session.needs_refresh());
        assert_eq!(
            session.refresh(),
            RouteChange::Mounted {
                from: Some(RenderMode::FallbackViewer),
                to: RenderMode::Desktop3d
            }
        );
        assert!(!session.needs_refresh());
    }

    #[test]
    fn test_config_from_json() {
        let config = SessionConfig::from_json(
            r#"{"probe": {"xr_query_timeout": {"secs": 2, "nanos": 0}}}"#,
        )
        .unwrap();
        assert_eq!(config.probe.xr_query_timeout, Duration::from_secs(2));
        assert_eq!(config.probe.resize_debounce, Duration::from_millis(250));

        assert!(SessionConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_open_json_rejects_empty_id() {
        let result = ExperienceSession::open_json(
            r#"{"id": " ", "name": "x"}"#,
            MockEnvironment::desktop(),
            MockRuntime::new(),
            MockViewerFactory::new(),
            SessionConfig::default(),
        );
        assert!(matches!(result, Err(ExperienceError::InvalidData(_))));
    }
}
