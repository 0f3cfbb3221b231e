//! Append-only, line-delimited ledger stores.
//!
//! Stages own the ledger and append to it; this side only reads. A store that
//! does not exist yet reads as empty.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{HolonError, Result};
use crate::model::Plan;

/// File name of the plans store inside a ledger directory.
pub const PLANS_FILE: &str = "plans.jsonl";

/// Directory holding the ledger stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    root: PathBuf,
}

impl Ledger {
    /// Ledger rooted at `root`. Nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ledger directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the plans store.
    pub fn plans_path(&self) -> PathBuf {
        self.root.join(PLANS_FILE)
    }

    /// Create the ledger directory if it is missing.
    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            HolonError::io("failed to create ledger directory", Some(self.root.clone()), e)
        })
    }

    /// Read every plan record in file order.
    pub fn read_plans(&self) -> Result<Vec<Plan>> {
        read_records(&self.plans_path())
    }
}

/// Read a line-delimited JSON store.
///
/// Records come back in file order. A missing file yields an empty vector and
/// blank lines are skipped; any other line that does not parse as `T` fails
/// the whole read.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            debug!(path = %path.display(), "ledger store not found, treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(HolonError::io(
                "failed to read ledger store",
                Some(path.to_path_buf()),
                e,
            ))
        }
    };

    let mut records = Vec::new();
    for (index, line) in content.split(|&b| b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let record = serde_json::from_slice(line).map_err(|e| HolonError::MalformedLedgerRecord {
            path: path.to_path_buf(),
            line: index + 1,
            message: e.to_string(),
        })?;
        records.push(record);
    }

    debug!(path = %path.display(), records = records.len(), "read ledger store");
    Ok(records)
}
