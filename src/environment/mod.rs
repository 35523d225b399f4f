//! Host environment abstraction
//!
//! Browser globals (`navigator`, `window`) are ambient state. Everything the
//! probe reads from the host goes through [`EnvironmentPort`], so probing and
//! mode selection run the same against a real browser binding or the
//! in-memory [`MockEnvironment`].

pub mod mock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Error type for host environment queries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("No window available: {0}")]
    NoWindow(String),

    #[error("Query rejected: {0}")]
    Rejected(String),

    #[error("API not available: {0}")]
    Unavailable(String),
}

/// Result type for environment queries
pub type EnvironmentResult<T> = Result<T, EnvironmentError>;

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

/// State of the camera (media-device) permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
    #[default]
    Unknown,
}

/// Query surface over the host browser
///
/// The synchronous methods read feature flags that browsers expose
/// directly. The two async methods wrap promise-based browser APIs, which
/// may reject or never settle; callers must bound them.
///
/// # Example
/// ```ignore
/// let env = MockEnvironment::phone();
/// let supported = env.is_immersive_ar_supported().await.unwrap_or(false);
/// ```
#[async_trait::async_trait]
pub trait EnvironmentPort: Send + Sync {
    /// Raw user-agent string
    fn user_agent(&self) -> String;

    /// Whether the device reports touch input (touch events or touch points)
    fn is_touch_capable(&self) -> bool;

    /// Current viewport size
    ///
    /// Fails when there is no window to measure (headless or server-side host).
    fn viewport(&self) -> EnvironmentResult<Viewport>;

    /// Whether `deviceorientation` events are available
    fn supports_orientation_events(&self) -> bool;

    /// Whether the vibration API is available
    fn supports_vibration(&self) -> bool;

    /// Ask the host whether an `immersive-ar` session can be created
    async fn is_immersive_ar_supported(&self) -> EnvironmentResult<bool>;

    /// Query the camera permission state
    async fn camera_permission(&self) -> EnvironmentResult<PermissionState>;

    /// Origin of the current page, used to resolve relative asset URLs
    fn origin(&self) -> Url;
}

pub use mock::{MockEnvironment, XrBehavior};
