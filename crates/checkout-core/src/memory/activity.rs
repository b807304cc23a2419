use std::sync::Mutex;

use crate::ports::{ActivityEntry, ActivityLog};

/// Activity log that keeps entries in memory
#[derive(Default)]
pub struct MemoryActivityLog {
    entries: Mutex<Vec<ActivityEntry>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Messages containing `needle`
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.message.contains(needle))
            .map(|e| e.message)
            .collect()
    }
}

impl ActivityLog for MemoryActivityLog {
    fn record(&self, entry: ActivityEntry) {
        // Fire-and-forget: a poisoned log loses the line
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}
