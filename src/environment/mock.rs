//! Mock environment for testing
//!
//! Holds every capability in memory and lets tests change them between
//! probes (resize the viewport, flip XR support, deny the camera).

use super::{EnvironmentError, EnvironmentPort, EnvironmentResult, PermissionState, Viewport};
use crate::runtime::{AsyncRuntime, BoxFuture};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
pub const ANDROID_PHONE_UA: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
pub const ANDROID_TABLET_UA: &str = "Mozilla/5.0 (Linux; Android 13; SM-X700) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const IPADOS_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";
pub const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// How the mock answers the immersive-AR session query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XrBehavior {
    Supported,
    Unsupported,
    /// The promise rejects
    Reject,
    /// The promise never settles
    Hang,
    /// Settle with `outcome` after `after` (needs a timer, see [`MockEnvironment::with_timer`])
    Delayed {
        after: Duration,
        outcome: Result<bool, EnvironmentError>,
    },
}

type Sleeper = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone)]
struct MockState {
    user_agent: String,
    touch: bool,
    viewport: Option<Viewport>,
    orientation: bool,
    vibration: bool,
    xr: XrBehavior,
    camera: Result<PermissionState, EnvironmentError>,
}

/// Mock host environment
#[derive(Clone)]
pub struct MockEnvironment {
    state: Arc<RwLock<MockState>>,
    origin: Url,
    xr_queries: Arc<AtomicUsize>,
    sleeper: Option<Sleeper>,
}

impl fmt::Debug for MockEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockEnvironment")
            .field("state", &*self.state.read())
            .field("origin", &self.origin.as_str())
            .field("xr_queries", &self.xr_queries())
            .finish()
    }
}

impl Default for MockEnvironment {
    fn default() -> Self {
        Self::desktop()
    }
}

impl MockEnvironment {
    fn from_state(state: MockState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            origin: Url::parse("https://ar.example.test").expect("static origin parses"),
            xr_queries: Arc::new(AtomicUsize::new(0)),
            sleeper: None,
        }
    }

    /// Desktop browser, no touch, wide viewport, no XR
    pub fn desktop() -> Self {
        Self::from_state(MockState {
            user_agent: DESKTOP_UA.to_string(),
            touch: false,
            viewport: Some(Viewport::new(1920, 1080)),
            orientation: false,
            vibration: false,
            xr: XrBehavior::Unsupported,
            camera: Ok(PermissionState::Prompt),
        })
    }

    /// Phone with orientation and vibration but no immersive AR
    pub fn phone() -> Self {
        Self::from_state(MockState {
            user_agent: IPHONE_UA.to_string(),
            touch: true,
            viewport: Some(Viewport::new(390, 844)),
            orientation: true,
            vibration: true,
            xr: XrBehavior::Unsupported,
            camera: Ok(PermissionState::Prompt),
        })
    }

    /// Android phone with WebXR immersive-ar
    pub fn ar_phone() -> Self {
        Self::phone()
            .with_user_agent(ANDROID_PHONE_UA)
            .with_xr(XrBehavior::Supported)
            .with_camera(Ok(PermissionState::Granted))
    }

    /// Android tablet
    pub fn tablet() -> Self {
        Self::from_state(MockState {
            user_agent: ANDROID_TABLET_UA.to_string(),
            touch: true,
            viewport: Some(Viewport::new(800, 1280)),
            orientation: true,
            vibration: false,
            xr: XrBehavior::Unsupported,
            camera: Ok(PermissionState::Prompt),
        })
    }

    /// No window at all (server-side or headless host)
    pub fn headless() -> Self {
        let env = Self::desktop();
        env.close_window();
        env
    }

    pub fn with_user_agent(self, ua: impl Into<String>) -> Self {
        self.state.write().user_agent = ua.into();
        self
    }

    pub fn with_touch(self, touch: bool) -> Self {
        self.state.write().touch = touch;
        self
    }

    pub fn with_viewport(self, width: u32, height: u32) -> Self {
        self.state.write().viewport = Some(Viewport::new(width, height));
        self
    }

    pub fn with_xr(self, xr: XrBehavior) -> Self {
        self.state.write().xr = xr;
        self
    }

    pub fn with_camera(self, camera: Result<PermissionState, EnvironmentError>) -> Self {
        self.state.write().camera = camera;
        self
    }

    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = origin;
        self
    }

    /// Use `runtime`'s timer for [`XrBehavior::Delayed`]
    pub fn with_timer<R: AsyncRuntime>(mut self, runtime: R) -> Self {
        self.sleeper = Some(Arc::new(move |d| runtime.sleep(d)));
        self
    }

    /// Simulate a window resize
    pub fn resize(&self, width: u32, height: u32) {
        self.state.write().viewport = Some(Viewport::new(width, height));
    }

    /// Simulate losing the window (navigated away, host torn down)
    pub fn close_window(&self) {
        self.state.write().viewport = None;
    }

    /// Change the XR answer for subsequent queries
    pub fn set_xr(&self, xr: XrBehavior) {
        self.state.write().xr = xr;
    }

    pub fn set_camera(&self, camera: Result<PermissionState, EnvironmentError>) {
        self.state.write().camera = camera;
    }

    /// Number of immersive-AR queries made so far
    pub fn xr_queries(&self) -> usize {
        self.xr_queries.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EnvironmentPort for MockEnvironment {
    fn user_agent(&self) -> String {
        self.state.read().user_agent.clone()
    }

    fn is_touch_capable(&self) -> bool {
        self.state.read().touch
    }

    fn viewport(&self) -> EnvironmentResult<Viewport> {
        self.state
            .read()
            .viewport
            .ok_or_else(|| EnvironmentError::NoWindow("mock environment is headless".into()))
    }

    fn supports_orientation_events(&self) -> bool {
        self.state.read().orientation
    }

    fn supports_vibration(&self) -> bool {
        self.state.read().vibration
    }

    async fn is_immersive_ar_supported(&self) -> EnvironmentResult<bool> {
        self.xr_queries.fetch_add(1, Ordering::SeqCst);
        let xr = self.state.read().xr.clone();
        match xr {
            XrBehavior::Supported => Ok(true),
            XrBehavior::Unsupported => Ok(false),
            XrBehavior::Reject => Err(EnvironmentError::Rejected(
                "isSessionSupported rejected".into(),
            )),
            XrBehavior::Hang => futures::future::pending().await,
            XrBehavior::Delayed { after, outcome } => {
                if let Some(sleep) = &self.sleeper {
                    sleep(after).await;
                }
                outcome
            }
        }
    }

    async fn camera_permission(&self) -> EnvironmentResult<PermissionState> {
        self.state.read().camera.clone()
    }

    fn origin(&self) -> Url {
        self.origin.clone()
    }
}
