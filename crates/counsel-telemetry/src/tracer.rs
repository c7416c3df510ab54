//! Tracer implementations.
//!
//! - [`LogTracer`] emits each event through `tracing`
//! - [`JsonlTracer`] appends one JSON object per line to a file
//! - [`MetricsTracer`] feeds [`Metrics`]
//! - [`MemoryTracer`] keeps a bounded buffer for inspection
//! - [`CompositeTracer`] fans out to several tracers
//!
//! Recording never fails toward the caller. Sink errors are logged.

use crate::metrics::Metrics;
use counsel_core::{TraceEvent, TraceWarning, Tracer};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Tracer that writes events to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn record(&self, event: TraceEvent) {
        let agents = event
            .agents
            .iter()
            .map(|a| a.as_str())
            .collect::<Vec<_>>()
            .join(",");
        info!(
            session_id = %event.session_id,
            sequence_no = event.sequence_no,
            outcome = %event.outcome,
            agents = %agents,
            latency_ms = event.latency_ms,
            "Query processed"
        );
    }

    fn warn(&self, warning: TraceWarning) {
        warn!(
            session_id = warning.session_id.as_ref().map(|s| s.as_str()),
            component = %warning.component,
            message = %warning.message,
            "Degraded operation"
        );
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum JsonlRecord<'a> {
    Warning(&'a TraceWarning),
}

/// Tracer that appends JSON lines to a file
///
/// Events are written as bare objects. Warnings carry `"kind": "warning"`.
#[derive(Debug)]
pub struct JsonlTracer {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlTracer {
    /// Open (or create) the file in append mode
    ///
    /// # Errors
    /// Returns error if the file cannot be opened
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Target file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line<T: Serialize>(&self, value: &T) {
        let line = match serde_json::to_string(value) {
            Ok(line) => line,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to encode trace record");
                return;
            }
        };

        let mut writer = self.writer.lock();
        let result = writeln!(writer, "{line}").and_then(|()| writer.flush());
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to write trace record");
        }
    }
}

impl Tracer for JsonlTracer {
    fn record(&self, event: TraceEvent) {
        self.write_line(&event);
    }

    fn warn(&self, warning: TraceWarning) {
        self.write_line(&JsonlRecord::Warning(&warning));
    }
}

/// Tracer that updates Prometheus metrics
#[derive(Debug, Clone)]
pub struct MetricsTracer {
    metrics: Metrics,
}

impl MetricsTracer {
    /// Wrap a metrics set
    #[must_use]
    pub const fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }

    /// Underlying metrics
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl Tracer for MetricsTracer {
    fn record(&self, event: TraceEvent) {
        self.metrics.record_event(&event);
    }

    fn warn(&self, warning: TraceWarning) {
        self.metrics.record_warning(&warning);
    }
}

/// Bounded in-memory tracer
#[derive(Debug)]
pub struct MemoryTracer {
    capacity: usize,
    events: RwLock<VecDeque<TraceEvent>>,
    warnings: RwLock<VecDeque<TraceWarning>>,
}

impl Default for MemoryTracer {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl MemoryTracer {
    /// Keep at most `capacity` events and `capacity` warnings
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: RwLock::new(VecDeque::new()),
            warnings: RwLock::new(VecDeque::new()),
        }
    }

    /// Recorded events, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.read().iter().cloned().collect()
    }

    /// Recorded warnings, oldest first
    #[must_use]
    pub fn warnings(&self) -> Vec<TraceWarning> {
        self.warnings.read().iter().cloned().collect()
    }

    /// Drop everything recorded so far
    pub fn clear(&self) {
        self.events.write().clear();
        self.warnings.write().clear();
    }

    fn push<T>(buffer: &RwLock<VecDeque<T>>, capacity: usize, item: T) {
        let mut buffer = buffer.write();
        if buffer.len() == capacity {
            buffer.pop_front();
        }
        buffer.push_back(item);
    }
}

impl Tracer for MemoryTracer {
    fn record(&self, event: TraceEvent) {
        Self::push(&self.events, self.capacity, event);
    }

    fn warn(&self, warning: TraceWarning) {
        Self::push(&self.warnings, self.capacity, warning);
    }
}

/// Tracer that forwards to every inner tracer in order
#[derive(Default, Clone)]
pub struct CompositeTracer {
    tracers: Vec<Arc<dyn Tracer>>,
}

impl std::fmt::Debug for CompositeTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeTracer")
            .field("tracers", &self.tracers.len())
            .finish()
    }
}

impl CompositeTracer {
    /// Create an empty composite
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tracer
    #[must_use]
    pub fn with(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracers.push(tracer);
        self
    }

    /// Number of inner tracers
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracers.len()
    }

    /// Whether no tracer is attached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracers.is_empty()
    }
}

impl Tracer for CompositeTracer {
    fn record(&self, event: TraceEvent) {
        if let Some((last, rest)) = self.tracers.split_last() {
            for tracer in rest {
                tracer.record(event.clone());
            }
            last.record(event);
        }
    }

    fn warn(&self, warning: TraceWarning) {
        if let Some((last, rest)) = self.tracers.split_last() {
            for tracer in rest {
                tracer.warn(warning.clone());
            }
            last.warn(warning);
        }
    }
}
