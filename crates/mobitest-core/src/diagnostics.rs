//! Failure snapshots: screenshot plus page source at the point of failure.
//!
//! The interaction layer captures a [`Snapshot`] before propagating an
//! interaction failure or reporting a checkout timeout. Capture is best
//! effort: if the session cannot produce a screenshot or page source (it may
//! be the thing that failed), the gap is logged and the snapshot is kept with
//! what was available.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::session::DeviceSession;

/// State of the device at one moment.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub id: Uuid,
    /// What was happening, e.g. `click_failed_continue`.
    pub label: String,
    pub taken_at: DateTime<Utc>,
    /// Raw PNG bytes.
    #[serde(skip)]
    pub screenshot: Option<Arc<Vec<u8>>>,
    /// Page source at the time of the failure.
    pub page_source: Option<String>,
    /// Files written for this snapshot, if a snapshot directory is configured.
    pub files: Vec<PathBuf>,
}

impl Snapshot {
    /// The screenshot as base64 text, for attaching to logs and reports.
    pub fn screenshot_base64(&self) -> Option<String> {
        self.screenshot
            .as_ref()
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes.as_slice()))
    }

    fn file_stem(&self) -> String {
        let label: String = self
            .label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{}_{}", label, self.taken_at.timestamp_millis())
    }
}

/// Captures snapshots and keeps the most recent ones.
#[derive(Debug)]
pub struct DiagnosticRecorder {
    dir: Option<PathBuf>,
    history: usize,
    snapshots: Mutex<VecDeque<Snapshot>>,
}

impl DiagnosticRecorder {
    /// `dir`: where snapshot files go, `None` for memory only.
    /// `history`: how many snapshots to keep in memory.
    pub fn new(dir: Option<PathBuf>, history: usize) -> Self {
        Self {
            dir,
            history: history.max(1),
            snapshots: Mutex::new(VecDeque::new()),
        }
    }

    /// Captures the current screen and page source.
    pub async fn capture(&self, session: &dyn DeviceSession, label: &str) -> Snapshot {
        let screenshot = match session.screenshot().await {
            Ok(bytes) => Some(Arc::new(bytes)),
            Err(e) => {
                warn!(label, error = %e, "snapshot: screenshot unavailable");
                None
            }
        };
        let page_source = match session.page_source().await {
            Ok(source) => Some(source),
            Err(e) => {
                warn!(label, error = %e, "snapshot: page source unavailable");
                None
            }
        };

        let mut snapshot = Snapshot {
            id: Uuid::new_v4(),
            label: label.to_string(),
            taken_at: Utc::now(),
            screenshot,
            page_source,
            files: Vec::new(),
        };

        if let Some(dir) = &self.dir {
            match write_files(dir, &snapshot) {
                Ok(files) => snapshot.files = files,
                Err(e) => warn!(label, dir = %dir.display(), error = %e, "snapshot: write failed"),
            }
        }
        info!(label, id = %snapshot.id, files = snapshot.files.len(), "snapshot captured");

        if let Ok(mut snapshots) = self.snapshots.lock() {
            if snapshots.len() == self.history {
                snapshots.pop_front();
            }
            snapshots.push_back(snapshot.clone());
        }
        snapshot
    }

    /// Snapshots captured so far, oldest first.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots
            .lock()
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The most recent snapshot.
    pub fn last(&self) -> Option<Snapshot> {
        self.snapshots.lock().ok().and_then(|s| s.back().cloned())
    }
}

fn write_files(dir: &Path, snapshot: &Snapshot) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let stem = snapshot.file_stem();
    let mut files = Vec::new();
    if let Some(png) = &snapshot.screenshot {
        let path = dir.join(format!("{}.png", stem));
        std::fs::write(&path, png.as_slice())?;
        files.push(path);
    }
    if let Some(source) = &snapshot.page_source {
        let path = dir.join(format!("{}.xml", stem));
        std::fs::write(&path, source)?;
        files.push(path);
    }
    Ok(files)
}
