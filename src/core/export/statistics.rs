//! Chunk statistics
//!
//! What one export strategy call produced. The orchestrator folds these into
//! job progress and the merged error log rows.

/// Outcome of exporting one chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Records written to the output
    pub exported: u64,
    /// Records found but not mapped
    pub failed: u64,
    /// Identifiers with more than one source record
    pub duplicated: u64,
    /// The duplicated identifiers
    pub duplicated_ids: Vec<String>,
    /// Identifiers with no source record
    pub not_found_ids: Vec<String>,
    /// Identifiers that are not UUIDs
    pub invalid_ids: Vec<String>,
}

impl Statistics {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one identifier that resolved to several records
    pub fn add_duplicate(&mut self, id: impl Into<String>) {
        self.duplicated += 1;
        self.duplicated_ids.push(id.into());
    }

    /// Add the mapping result of `attempted` records of which `mapped` succeeded
    pub fn add_mapped(&mut self, attempted: usize, mapped: usize) {
        self.exported += mapped as u64;
        self.failed += attempted.saturating_sub(mapped) as u64;
    }

    /// Failures counted against job progress: unmapped, not found and invalid
    pub fn failed_total(&self) -> u64 {
        self.failed + self.not_found_ids.len() as u64 + self.invalid_ids.len() as u64
    }

    /// Fold another chunk's statistics into these
    pub fn merge(&mut self, other: Statistics) {
        self.exported += other.exported;
        self.failed += other.failed;
        self.duplicated += other.duplicated;
        self.duplicated_ids.extend(other.duplicated_ids);
        self.not_found_ids.extend(other.not_found_ids);
        self.invalid_ids.extend(other.invalid_ids);
    }

    /// Success rate as a percentage of identifiers seen
    pub fn success_rate(&self) -> f64 {
        let seen = self.exported + self.failed_total();
        if seen == 0 {
            return 100.0;
        }
        (self.exported as f64 / seen as f64) * 100.0
    }
}
