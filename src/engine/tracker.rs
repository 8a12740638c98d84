use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one request entry (one name or key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryOutcome {
    pub label: String,
    /// Lines rewritten for this entry: directive lines for a toggle, value
    /// lines for a set, parameter lines written for a block replacement.
    pub lines: usize,
    pub matched: bool,
}

/// Records whether each request entry took effect; gates the final write.
#[derive(Debug, Default)]
pub struct ApplyTracker {
    entries: Vec<EntryOutcome>,
}

impl ApplyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry that matched `lines` lines (zero means failure).
    pub fn record(&mut self, label: String, lines: usize) {
        self.push(label, lines, lines > 0);
    }

    /// Record an entry whose match count differs from the lines it wrote,
    /// such as a block replacement.
    pub fn record_lines(&mut self, label: String, matched: usize, lines: usize) {
        self.push(label, lines, matched > 0);
    }

    /// Record an entry that was refused even though lines matched.
    pub fn reject(&mut self, label: String, lines: usize) {
        self.push(label, lines, false);
    }

    fn push(&mut self, label: String, lines: usize, matched: bool) {
        if matched {
            tracing::debug!(%label, lines, "request matched");
        } else {
            tracing::debug!(%label, lines, "request failed");
        }
        self.entries.push(EntryOutcome {
            label,
            lines,
            matched,
        });
    }

    pub fn all_matched(&self) -> bool {
        self.entries.iter().all(|e| e.matched)
    }

    /// Labels of every failed entry, in request order.
    pub fn failures(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.matched)
            .map(|e| e.label.clone())
            .collect()
    }

    pub fn entries(&self) -> &[EntryOutcome] {
        &self.entries
    }

    pub fn into_report(self, output: PathBuf, written: bool) -> ApplyReport {
        ApplyReport {
            output,
            written,
            entries: self.entries,
        }
    }
}

/// What a successful batch did.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub output: PathBuf,
    /// False for dry runs.
    pub written: bool,
    pub entries: Vec<EntryOutcome>,
}

impl ApplyReport {
    /// Total number of rewritten lines.
    pub fn lines_changed(&self) -> usize {
        self.entries.iter().map(|e| e.lines).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptied_block_still_counts_as_matched() {
        let mut tracker = ApplyTracker::new();
        tracker.record_lines("STARTTIME".into(), 1, 0);
        tracker.record("END".into(), 0);

        assert_eq!(tracker.failures(), vec!["END"]);
        assert!(tracker.entries()[0].matched);
        assert_eq!(tracker.entries()[0].lines, 0);
    }
}
