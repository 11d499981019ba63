use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// JSONL sink for resolver events and summaries. Clones share one file.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<BufWriter<File>>>,
}

/// Counters owned by a single run, written out with [`DebugLogger::emit_summary`].
#[derive(Debug, Default)]
pub(crate) struct DebugCounters {
    counts: BTreeMap<&'static str, u64>,
}

impl DebugCounters {
    pub fn increment(&mut self, key: &'static str, amount: u64) {
        if amount == 0 {
            return;
        }
        let entry = self.counts.entry(key).or_insert(0);
        *entry = entry.saturating_add(amount);
    }
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn log_event(&self, event: Value) {
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writeln!(writer, "{event}");
        }
    }

    pub fn emit_summary(&self, context: &str, counters: &DebugCounters) {
        let counts: Map<String, Value> = counters
            .counts
            .iter()
            .map(|(key, value)| (key.to_string(), Value::from(*value)))
            .collect();
        self.log_event(json!({
            "type": "debug.summary",
            "context": context,
            "counts": counts,
        }));
    }

    pub fn flush(&self) {
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writer.flush();
        }
    }
}
