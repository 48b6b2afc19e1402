//! # File-Backed Collaborators
//!
//! [`FileRelay`] is a relay that lives in one JSON-lines file, one signed
//! event per line. [`FileStatusCache`] persists the last known status of
//! each order as a JSON object. Both are meant for a single machine; the
//! in-process mutex serializes writers within one `bazaar` invocation.

use std::collections::{BTreeMap, HashSet};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use bazaar_core::OrderId;
use bazaar_state::{OrderStatus, ReconcileError, StatusCache};
use bazaar_transport::{EventFilter, SignedEvent, Transport, TransportError};

// ─── Relay ──────────────────────────────────────────────────────────

/// JSON-lines relay file.
#[derive(Debug)]
pub struct FileRelay {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileRelay {
    /// Relay stored at `path`. The file is created on first publish.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the relay file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every well-formed event in the file, in publish order. Lines that do
    /// not parse are skipped with a warning.
    fn load(&self) -> Result<Vec<SignedEvent>, TransportError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.path, e)),
        };
        let mut events = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| io_error(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SignedEvent>(&line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(line = n + 1, error = %e, "skipping unreadable relay line"),
            }
        }
        Ok(events)
    }
}

impl Transport for FileRelay {
    fn publish(&self, event: &SignedEvent) -> Result<(), TransportError> {
        event.verify().map_err(|e| TransportError::Rejected {
            id: event.id.to_string(),
            reason: e.to_string(),
        })?;

        let _guard = self.lock.lock();
        let known: HashSet<_> = self.load()?.into_iter().map(|e| e.id).collect();
        if known.contains(&event.id) {
            debug!(id = %event.id, "relay already holds event");
            return Ok(());
        }
        let line = serde_json::to_string(event)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_error(&self.path, e))?;
        writeln!(file, "{line}").map_err(|e| io_error(&self.path, e))?;
        Ok(())
    }

    fn fetch(&self, filter: &EventFilter) -> Result<Vec<SignedEvent>, TransportError> {
        let _guard = self.lock.lock();
        Ok(self
            .load()?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect())
    }
}

fn io_error(path: &Path, e: std::io::Error) -> TransportError {
    TransportError::Relay(format!("{}: {e}", path.display()))
}

// ─── Status cache ───────────────────────────────────────────────────

/// Order status cache persisted as `{ "<order id>": "<status>" }`.
#[derive(Debug)]
pub struct FileStatusCache {
    path: PathBuf,
    statuses: Mutex<BTreeMap<String, OrderStatus>>,
}

impl FileStatusCache {
    /// Open the cache at `path`, starting empty when the file is absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ReconcileError> {
        let path = path.into();
        let statuses = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| ReconcileError::Cache(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(ReconcileError::Cache(format!("{}: {e}", path.display()))),
        };
        Ok(Self {
            path,
            statuses: Mutex::new(statuses),
        })
    }

    fn persist(&self, statuses: &BTreeMap<String, OrderStatus>) -> Result<(), ReconcileError> {
        let json = serde_json::to_string_pretty(statuses)
            .map_err(|e| ReconcileError::Cache(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| ReconcileError::Cache(format!("{}: {e}", self.path.display())))
    }
}

impl StatusCache for FileStatusCache {
    fn get_cached_status(&self, order_id: &OrderId) -> Result<Option<OrderStatus>, ReconcileError> {
        Ok(self.statuses.lock().get(order_id.as_str()).copied())
    }

    fn set_cached_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), ReconcileError> {
        let mut statuses = self.statuses.lock();
        let mut next = statuses.clone();
        next.insert(order_id.as_str().to_string(), status);
        self.persist(&next)?;
        *statuses = next;
        Ok(())
    }
}
