//! Mock viewers for testing
//!
//! Every mount and unmount is written to a shared [`ViewerJournal`], which
//! also tracks how many viewers were resident at once.

use super::{Viewer, ViewerError, ViewerFactory};
use crate::asset::NormalizedAsset;
use crate::mode::{RenderMode, ViewerKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter for generating unique viewer IDs
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Mounted {
        id: u64,
        kind: ViewerKind,
        mode: RenderMode,
        asset_count: usize,
    },
    Unmounted {
        id: u64,
    },
}

#[derive(Debug, Default)]
struct JournalState {
    entries: Vec<JournalEntry>,
    resident: usize,
    max_resident: usize,
}

/// Shared log of viewer lifecycle events
#[derive(Debug, Clone, Default)]
pub struct ViewerJournal {
    state: Arc<Mutex<JournalState>>,
}

impl ViewerJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, entry: JournalEntry) {
        let mut state = self.state.lock();
        match entry {
            JournalEntry::Mounted { .. } => {
                state.resident += 1;
                state.max_resident = state.max_resident.max(state.resident);
            }
            JournalEntry::Unmounted { .. } => {
                state.resident = state.resident.saturating_sub(1);
            }
        }
        state.entries.push(entry);
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.state.lock().entries.clone()
    }

    pub fn mounts(&self) -> usize {
        self.count(|e| matches!(e, JournalEntry::Mounted { .. }))
    }

    pub fn unmounts(&self) -> usize {
        self.count(|e| matches!(e, JournalEntry::Unmounted { .. }))
    }

    /// Viewers currently mounted
    pub fn resident(&self) -> usize {
        self.state.lock().resident
    }

    /// Highest number of viewers ever mounted at the same time
    pub fn max_resident(&self) -> usize {
        self.state.lock().max_resident
    }

    /// Mode of the most recent mount
    pub fn last_mounted_mode(&self) -> Option<RenderMode> {
        self.state
            .lock()
            .entries
            .iter()
            .rev()
            .find_map(|entry| match entry {
                JournalEntry::Mounted { mode, .. } => Some(*mode),
                JournalEntry::Unmounted { .. } => None,
            })
    }

    fn count(&self, predicate: impl Fn(&JournalEntry) -> bool) -> usize {
        self.state.lock().entries.iter().filter(|e| predicate(*e)).count()
    }
}

/// Mock viewer that records its lifecycle
#[derive(Debug)]
pub struct MockViewer {
    id: u64,
    kind: ViewerKind,
    mounted: bool,
    journal: ViewerJournal,
    failures: FailureTable,
}

impl MockViewer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

impl Viewer for MockViewer {
    fn mount(&mut self, mode: RenderMode, assets: &[NormalizedAsset]) -> Result<(), ViewerError> {
        if let Some(err) = self.failures.lock().get(&mode).cloned() {
            return Err(err);
        }
        self.mounted = true;
        self.journal.record(JournalEntry::Mounted {
            id: self.id,
            kind: self.kind,
            mode,
            asset_count: assets.len(),
        });
        Ok(())
    }

    fn unmount(&mut self) {
        if self.mounted {
            self.mounted = false;
            self.journal.record(JournalEntry::Unmounted { id: self.id });
        }
    }

    fn name(&self) -> &'static str {
        match self.kind {
            ViewerKind::MobileAr => "MockMobileArViewer",
            ViewerKind::Desktop3d => "MockDesktop3dViewer",
        }
    }
}

type FailureTable = Arc<Mutex<HashMap<RenderMode, ViewerError>>>;

/// Factory for [`MockViewer`]s sharing one journal
#[derive(Debug, Clone, Default)]
pub struct MockViewerFactory {
    journal: ViewerJournal,
    failures: FailureTable,
}

impl MockViewerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> ViewerJournal {
        self.journal.clone()
    }

    /// Make every mount for `mode` fail with `err`
    pub fn fail_mounts(&self, mode: RenderMode, err: ViewerError) {
        self.failures.lock().insert(mode, err);
    }

    /// Let mounts for `mode` succeed again
    pub fn clear_failure(&self, mode: RenderMode) {
        self.failures.lock().remove(&mode);
    }
}

impl ViewerFactory for MockViewerFactory {
    fn create(&self, kind: ViewerKind) -> Box<dyn Viewer> {
        Box::new(MockViewer {
            id: next_id(),
            kind,
            mounted: false,
            journal: self.journal.clone(),
            failures: Arc::clone(&self.failures),
        })
    }
}
