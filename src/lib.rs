//! ar_experience - Capability-aware viewing of AR experiences
//!
//! # Features
//! - Device capability probing behind an environment port
//! - Bounded, cached immersive-AR detection with resize debouncing
//! - Pure render-mode selection (immersive AR, fallback viewer, desktop 3D)
//! - Single-slot viewer routing with permission and failure degradation
//! - Backend asset normalization against the page origin
//! - Async runtime abstraction (Tokio, mock)
//!
//! # Quick Start
//!
//! ```ignore
//! use ar_experience::{ExperienceSession, MockEnvironment, MockViewerFactory, SessionConfig, TokioRuntime};
//!
//! let mut session = ExperienceSession::open_json(
//!     payload,
//!     MockEnvironment::ar_phone(),
//!     TokioRuntime::new(),
//!     MockViewerFactory::new(),
//!     SessionConfig::default(),
//! )?;
//! session.mount().await;
//! ```
//!
//! # Feature Flags
//!
//! - `runtime-tokio`: Enable Tokio async runtime (default)

// Core modules
pub mod capability;
pub mod environment;
pub mod mode;
pub mod probe;
pub mod runtime;
pub mod viewer;

// Support modules
pub mod asset;
pub mod session;

// Error types
mod error;
pub use error::{ExperienceError, Result};

// Re-export environment types
pub use environment::{
    EnvironmentError, EnvironmentPort, EnvironmentResult, MockEnvironment, PermissionState,
    Viewport, XrBehavior,
};

// Re-export capability types
pub use capability::{
    classify_device, classify_screen, Breakpoints, CapabilitySnapshot, DeviceClass,
    ScreenSizeClass,
};

// Re-export probe types
pub use probe::metrics::ProbeMetricsHandle;
pub use probe::{CapabilityProbe, ProbeConfig, ProbeMetrics, ProbeState, ProbeSubscription};

// Re-export mode types
pub use mode::{select_mode, ParseRenderModeError, RenderMode, ViewerKind};

// Re-export viewer types
pub use viewer::{
    MockViewerFactory, Notice, RouteChange, RouterCommand, UserAction, Viewer, ViewerError,
    ViewerEvent, ViewerFactory, ViewerJournal, ViewerRouter, ViewerSlot,
};

// Re-export asset types
pub use asset::{
    normalize, normalize_all, normalize_url, AssetContent, AssetError, AssetKind, AssetRecord,
    Experience, NormalizedAsset,
};

// Re-export runtime types
pub use runtime::mock::MockRuntime;
#[cfg(feature = "runtime-tokio")]
pub use runtime::tokio_impl::TokioRuntime;
pub use runtime::{AsyncRuntime, JoinHandle};

pub use session::{ExperienceSession, SessionConfig};

// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
