//! Render mode selection

use crate::capability::{CapabilitySnapshot, DeviceClass};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How an experience should be presented on this device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Camera-overlaid AR through a WebXR session
    ImmersiveAr,
    /// Interactive 3D without the camera, tuned for phones
    FallbackViewer,
    /// Mouse-driven 3D viewer
    #[serde(rename = "desktop-3d")]
    Desktop3d,
}

/// Which viewer implementation a mode is rendered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerKind {
    MobileAr,
    Desktop3d,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown render mode: {0}")]
pub struct ParseRenderModeError(String);

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [
        RenderMode::ImmersiveAr,
        RenderMode::FallbackViewer,
        RenderMode::Desktop3d,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::ImmersiveAr => "immersive-ar",
            RenderMode::FallbackViewer => "fallback-viewer",
            RenderMode::Desktop3d => "desktop-3d",
        }
    }

    pub fn viewer_kind(&self) -> ViewerKind {
        match self {
            RenderMode::ImmersiveAr | RenderMode::FallbackViewer => ViewerKind::MobileAr,
            RenderMode::Desktop3d => ViewerKind::Desktop3d,
        }
    }

    /// Whether this mode claims the camera
    pub fn uses_camera(&self) -> bool {
        matches!(self, RenderMode::ImmersiveAr)
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = ParseRenderModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RenderMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ParseRenderModeError(s.to_string()))
    }
}

/// Pick the render mode for a snapshot. First match wins:
/// immersive AR support, then a mobile device, then desktop.
pub fn select_mode(snapshot: &CapabilitySnapshot) -> RenderMode {
    if snapshot.supports_immersive_ar {
        RenderMode::ImmersiveAr
    } else if snapshot.device_class == DeviceClass::Mobile {
        RenderMode::FallbackViewer
    } else {
        RenderMode::Desktop3d
    }
}
