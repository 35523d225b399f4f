//! Viewer routing
//!
//! [`ViewerRouter`] owns a single [`ViewerSlot`]. At most one viewer lives
//! in it, and the previous viewer is always unmounted before the next one is
//! mounted, so two implementations never hold the camera or an XR session
//! at the same time.

pub mod mock;

use crate::asset::NormalizedAsset;
use crate::capability::CapabilitySnapshot;
use crate::environment::PermissionState;
use crate::mode::{select_mode, RenderMode, ViewerKind};
use crate::probe::ProbeState;
use std::fmt::{self, Debug};
use thiserror::Error;

/// Error type for viewer mounting and runtime failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    #[error("Camera or AR session permission denied: {0}")]
    PermissionDenied(String),

    #[error("Viewer component failed to load: {0}")]
    EnvironmentFailure(String),

    #[error("Asset '{name}' failed to load: {reason}")]
    AssetFailed { name: String, reason: String },
}

/// Callback from a mounted viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    Loaded,
    Error(ViewerError),
}

/// An embedded 3D/AR viewer
///
/// Implementations wrap the rendering widget. `unmount` must release every
/// camera and XR handle the viewer holds.
pub trait Viewer: Send + Debug {
    /// Attach the viewer and hand it the assets to show
    fn mount(&mut self, mode: RenderMode, assets: &[NormalizedAsset]) -> Result<(), ViewerError>;

    /// Detach and release resources; called exactly once per successful mount
    fn unmount(&mut self);

    /// Get the name of this viewer (for debugging)
    fn name(&self) -> &'static str;
}

/// Builds the viewer for a [`ViewerKind`]
pub trait ViewerFactory: Send {
    fn create(&self, kind: ViewerKind) -> Box<dyn Viewer>;
}

/// Dismissible message shown on top of a running viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Camera, sensor or AR session access refused. In immersive AR the
    /// fallback viewer is shown instead; other viewers stay mounted.
    PermissionDenied(String),
}

/// Explicit user input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserAction {
    Retry,
    DismissNotice,
    GoBack,
    Reload,
}

/// What the host must do after [`ViewerRouter::handle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterCommand {
    None,
    /// Run the capability probe again, then sync
    Reprobe,
    /// Leave the experience view
    Exit,
}

/// Result of a routing step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChange {
    Unchanged,
    Mounted {
        from: Option<RenderMode>,
        to: RenderMode,
    },
    /// The slot moved to a state without a viewer
    Cleared,
}

/// The mounted viewer and the mode it was mounted for
pub struct ActiveViewer {
    mode: RenderMode,
    viewer: Box<dyn Viewer>,
}

impl ActiveViewer {
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn viewer_name(&self) -> &'static str {
        self.viewer.name()
    }
}

impl Debug for ActiveViewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveViewer")
            .field("mode", &self.mode)
            .field("viewer", &self.viewer.name())
            .finish()
    }
}

/// Contents of the router's single slot
#[derive(Debug, Default)]
pub enum ViewerSlot {
    /// Nothing probed yet
    #[default]
    Empty,
    /// First probe in progress
    Loading,
    /// Probe could not read the environment; offers retry and go back
    ProbeFailed { message: String },
    /// Unrecoverable for this view; offers reload and go back
    Blocked { message: String },
    /// User left the view
    Exited,
    Active(ActiveViewer),
}

impl ViewerSlot {
    pub fn is_active(&self) -> bool {
        matches!(self, ViewerSlot::Active(_))
    }

    pub fn mode(&self) -> Option<RenderMode> {
        match self {
            ViewerSlot::Active(active) => Some(active.mode),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ViewerSlot::Blocked { .. } | ViewerSlot::Exited)
    }
}

/// Single-slot switch between viewer implementations
pub struct ViewerRouter<F: ViewerFactory> {
    factory: F,
    assets: Vec<NormalizedAsset>,
    slot: ViewerSlot,
    notice: Option<Notice>,
    /// Immersive AR suppressed after a permission denial, until Retry or Reload
    ar_suppressed: bool,
}

impl<F: ViewerFactory> ViewerRouter<F> {
    /// Creates a router for an already normalized asset list
    pub fn new(factory: F, assets: Vec<NormalizedAsset>) -> Self {
        Self {
            factory,
            assets,
            slot: ViewerSlot::Empty,
            notice: None,
            ar_suppressed: false,
        }
    }

    pub fn slot(&self) -> &ViewerSlot {
        &self.slot
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn active_mode(&self) -> Option<RenderMode> {
        self.slot.mode()
    }

    pub fn assets(&self) -> &[NormalizedAsset] {
        &self.assets
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Whether the current slot blocks further automatic routing
    pub fn is_terminal(&self) -> bool {
        self.slot.is_terminal()
    }

    /// Actions the UI should offer for the current state
    pub fn available_actions(&self) -> Vec<UserAction> {
        match &self.slot {
            ViewerSlot::ProbeFailed { .. } => vec![UserAction::Retry, UserAction::GoBack],
            ViewerSlot::Blocked { .. } => vec![UserAction::Reload, UserAction::GoBack],
            ViewerSlot::Active(_) if self.notice.is_some() => {
                vec![UserAction::DismissNotice, UserAction::Retry, UserAction::GoBack]
            }
            ViewerSlot::Active(_) => vec![UserAction::GoBack],
            ViewerSlot::Empty | ViewerSlot::Loading | ViewerSlot::Exited => Vec::new(),
        }
    }

    /// Bring the slot in line with the probe state.
    ///
    /// No mount decision is made while a probe is checking. A viewer that is
    /// already mounted stays mounted through re-probes.
    pub fn sync(&mut self, probe: &ProbeState) -> RouteChange {
        if self.slot.is_terminal() {
            return RouteChange::Unchanged;
        }
        if probe.is_checking {
            if self.slot.is_active() || matches!(self.slot, ViewerSlot::Loading) {
                return RouteChange::Unchanged;
            }
            return self.clear(ViewerSlot::Loading);
        }

        match (&probe.snapshot, &probe.error) {
            (Some(snapshot), _) => {
                let (mode, notice) = self.effective_mode(snapshot);
                if notice.is_some() && self.notice.is_none() && !self.ar_suppressed {
                    self.notice = notice;
                    self.ar_suppressed = true;
                }
                self.route(mode)
            }
            (None, Some(message)) => {
                if let ViewerSlot::ProbeFailed { message: current } = &self.slot {
                    if current == message {
                        return RouteChange::Unchanged;
                    }
                }
                log::warn!("Capability detection failed: {message}");
                self.clear(ViewerSlot::ProbeFailed {
                    message: message.clone(),
                })
            }
            (None, None) => RouteChange::Unchanged,
        }
    }

    /// Mount the viewer for `mode`; re-selecting the current mode is a no-op
    pub fn route(&mut self, mode: RenderMode) -> RouteChange {
        if self.slot.is_terminal() {
            return RouteChange::Unchanged;
        }
        let from = self.slot.mode();
        if from == Some(mode) {
            return RouteChange::Unchanged;
        }

        self.unmount_current();

        let mut viewer = self.factory.create(mode.viewer_kind());
        log::debug!("Mounting {} for {mode}", viewer.name());
        match viewer.mount(mode, &self.assets) {
            Ok(()) => {}
            Err(ViewerError::AssetFailed { name, reason }) => {
                log::warn!("Asset '{name}' failed while mounting {mode} viewer: {reason}");
            }
            Err(ViewerError::PermissionDenied(reason)) if !mode.uses_camera() => {
                log::warn!("Permission denied while mounting {mode} viewer: {reason}");
                self.notice = Some(Notice::PermissionDenied(reason));
            }
            Err(err) => {
                log::warn!("{} failed to mount: {err}", viewer.name());
                drop(viewer);
                return match self.fail(mode, err) {
                    RouteChange::Mounted { to, .. } => RouteChange::Mounted { from, to },
                    other => other,
                };
            }
        }
        self.slot = ViewerSlot::Active(ActiveViewer { mode, viewer });
        RouteChange::Mounted { from, to: mode }
    }

    /// Feed a callback from the mounted viewer
    pub fn viewer_event(&mut self, event: ViewerEvent) -> RouteChange {
        let Some(mode) = self.slot.mode() else {
            log::debug!("Viewer event {event:?} with no viewer mounted, ignoring");
            return RouteChange::Unchanged;
        };
        match event {
            ViewerEvent::Loaded => {
                log::debug!("Viewer for {mode} loaded");
                RouteChange::Unchanged
            }
            ViewerEvent::Error(err) => {
                let change = self.fail(mode, err);
                match change {
                    RouteChange::Mounted { to, .. } => RouteChange::Mounted {
                        from: Some(mode),
                        to,
                    },
                    other => other,
                }
            }
        }
    }

    /// Apply an explicit user action
    pub fn handle(&mut self, action: UserAction) -> RouterCommand {
        match action {
            UserAction::Retry => match &self.slot {
                ViewerSlot::ProbeFailed { .. } => {
                    self.slot = ViewerSlot::Empty;
                    RouterCommand::Reprobe
                }
                ViewerSlot::Active(_) if self.ar_suppressed || self.notice.is_some() => {
                    self.ar_suppressed = false;
                    self.notice = None;
                    RouterCommand::Reprobe
                }
                _ => RouterCommand::None,
            },
            UserAction::DismissNotice => {
                self.notice = None;
                RouterCommand::None
            }
            UserAction::GoBack => {
                self.clear(ViewerSlot::Exited);
                self.notice = None;
                RouterCommand::Exit
            }
            UserAction::Reload => {
                self.clear(ViewerSlot::Empty);
                self.notice = None;
                self.ar_suppressed = false;
                RouterCommand::Reprobe
            }
        }
    }

    /// Unmount whatever is mounted and leave the slot empty
    pub fn shutdown(&mut self) {
        self.clear(ViewerSlot::Empty);
    }

    fn effective_mode(&self, snapshot: &CapabilitySnapshot) -> (RenderMode, Option<Notice>) {
        let mode = select_mode(snapshot);
        if mode != RenderMode::ImmersiveAr {
            return (mode, None);
        }
        if self.ar_suppressed {
            return (RenderMode::FallbackViewer, None);
        }
        if snapshot.camera_permission == PermissionState::Denied {
            return (
                RenderMode::FallbackViewer,
                Some(Notice::PermissionDenied("Camera access was denied".to_string())),
            );
        }
        (mode, None)
    }

    fn fail(&mut self, mode: RenderMode, err: ViewerError) -> RouteChange {
        match err {
            ViewerError::PermissionDenied(reason) if mode.uses_camera() => {
                log::warn!("AR permission denied, falling back: {reason}");
                self.ar_suppressed = true;
                self.notice = Some(Notice::PermissionDenied(reason));
                self.unmount_current();
                self.route(RenderMode::FallbackViewer)
            }
            ViewerError::PermissionDenied(reason) => {
                log::warn!("Permission denied in {mode} viewer: {reason}");
                self.notice = Some(Notice::PermissionDenied(reason));
                RouteChange::Unchanged
            }
            ViewerError::AssetFailed { name, reason } => {
                log::warn!("Asset '{name}' failed in {mode} viewer: {reason}");
                RouteChange::Unchanged
            }
            other => {
                log::error!("Viewer for {mode} failed: {other}");
                self.clear(ViewerSlot::Blocked {
                    message: other.to_string(),
                })
            }
        }
    }

    fn clear(&mut self, next: ViewerSlot) -> RouteChange {
        debug_assert!(!next.is_active());
        self.unmount_current();
        self.slot = next;
        RouteChange::Cleared
    }

    fn unmount_current(&mut self) {
        if !self.slot.is_active() {
            return;
        }
        if let ViewerSlot::Active(mut active) = std::mem::take(&mut self.slot) {
            log::debug!("Unmounting {} ({})", active.viewer.name(), active.mode);
            active.viewer.unmount();
        }
    }
}

impl<F: ViewerFactory> Drop for ViewerRouter<F> {
    fn drop(&mut self) {
        self.unmount_current();
    }
}

pub use mock::{MockViewerFactory, ViewerJournal};
