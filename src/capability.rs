//! Capability snapshots and device classification

use crate::environment::{PermissionState, Viewport};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tablet user agents. Checked before [`MOBILE_UA`]; an Android UA without
/// the `Mobile` token is a tablet.
static TABLET_UA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ipad|tablet|playbook|silk").expect("valid tablet regex"));

static MOBILE_UA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)mobi|iphone|ipod|android|blackberry|opera mini|iemobile|windows phone")
        .expect("valid mobile regex")
});

/// Broad device category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

/// Viewport size bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenSizeClass {
    Small,
    Medium,
    Large,
}

/// Width breakpoints used for classification, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoints {
    /// Narrowest width treated as a tablet
    pub tablet_min_width: u32,
    /// Narrowest width treated as a desktop
    pub desktop_min_width: u32,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            tablet_min_width: 768,
            desktop_min_width: 1024,
        }
    }
}

/// Point-in-time record of what the device and browser can do
///
/// Produced whole by the probe and superseded whole by the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySnapshot {
    pub is_touch_capable: bool,
    pub device_class: DeviceClass,
    pub screen_size_class: ScreenSizeClass,
    pub supports_immersive_ar: bool,
    pub supports_orientation_events: bool,
    pub supports_vibration: bool,
    pub camera_permission: PermissionState,
    pub viewport: Viewport,
}

impl CapabilitySnapshot {
    pub fn is_mobile(&self) -> bool {
        self.device_class == DeviceClass::Mobile
    }

    /// Whether the camera can be used without the user having refused it
    pub fn camera_usable(&self) -> bool {
        self.camera_permission != PermissionState::Denied
    }
}

fn ua_class(user_agent: &str) -> Option<DeviceClass> {
    let lower = user_agent.to_ascii_lowercase();
    if TABLET_UA.is_match(&lower) || (lower.contains("android") && !lower.contains("mobile")) {
        Some(DeviceClass::Tablet)
    } else if MOBILE_UA.is_match(&lower) {
        Some(DeviceClass::Mobile)
    } else {
        None
    }
}

/// Classify the device from the UA, touch support and viewport width.
///
/// The UA match alone is not trusted: a touch device with a wide viewport
/// is never reported as mobile, and a mobile UA without touch on a desktop
/// width is reported as desktop.
pub fn classify_device(
    user_agent: &str,
    is_touch_capable: bool,
    viewport: Viewport,
    breakpoints: &Breakpoints,
) -> DeviceClass {
    let width = viewport.width;
    match ua_class(user_agent) {
        Some(DeviceClass::Tablet) => {
            if is_touch_capable || width < breakpoints.desktop_min_width {
                DeviceClass::Tablet
            } else {
                DeviceClass::Desktop
            }
        }
        Some(DeviceClass::Mobile) => {
            if width < breakpoints.tablet_min_width {
                DeviceClass::Mobile
            } else if is_touch_capable || width < breakpoints.desktop_min_width {
                DeviceClass::Tablet
            } else {
                DeviceClass::Desktop
            }
        }
        _ if is_touch_capable => {
            if width < breakpoints.tablet_min_width {
                DeviceClass::Mobile
            } else if width < breakpoints.desktop_min_width {
                DeviceClass::Tablet
            } else {
                DeviceClass::Desktop
            }
        }
        _ => DeviceClass::Desktop,
    }
}

/// Bucket a viewport width
pub fn classify_screen(width: u32, breakpoints: &Breakpoints) -> ScreenSizeClass {
    if width < breakpoints.tablet_min_width {
        ScreenSizeClass::Small
    } else if width < breakpoints.desktop_min_width {
        ScreenSizeClass::Medium
    } else {
        ScreenSizeClass::Large
    }
}
