//! Types to track what happened to the candidates of a run
use counter::Counter;
use log::info;
use std::io;

use crate::store::UpsertOutcome;

/// General information collected while tallying
///
/// Usage: mutably borrowed by `pipeline::Tally`
#[derive(Default, Debug)]
pub struct RunningStats {
    pub files: u32,
    pub total_records: u64,
    pub candidates: u64,
    pub created: u64,
    pub accumulated: u64,
    pub near_duplicates: u64,
    pub discarded: u64,
    /// Candidates per marker pair label
    pub per_marker: Counter<String>,
}

impl RunningStats {
    pub fn record_outcome(&mut self, label: &str, outcome: &UpsertOutcome) {
        self.candidates += 1;
        *self.per_marker.entry(label.to_string()).or_insert(0) += 1;
        match outcome {
            UpsertOutcome::Created { .. } => self.created += 1,
            UpsertOutcome::Accumulated { near_duplicate, .. } => {
                self.accumulated += 1;
                if *near_duplicate {
                    self.near_duplicates += 1;
                }
            }
            UpsertOutcome::Discarded { .. } => self.discarded += 1,
        }
    }

    /// Write the stats as `# key: value` header lines
    pub fn write_to_buf<T: io::Write>(&self, buf: &mut T) -> io::Result<()> {
        write!(
            buf,
            "# files: {files}\n\
             # total_records: {records}\n\
             # candidates: {candidates}\n\
             # created: {created}\n\
             # accumulated: {accumulated}\n\
             # near_duplicates_merged: {near}\n\
             # near_duplicates_discarded: {discarded}\n",
            files = self.files,
            records = self.total_records,
            candidates = self.candidates,
            created = self.created,
            accumulated = self.accumulated,
            near = self.near_duplicates,
            discarded = self.discarded,
        )?;
        for (label, n) in self.per_marker.most_common_ordered() {
            writeln!(buf, "# marker {}: {}", label, n)?;
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        info!(
            "{} records, {} candidates: {} new, {} accumulated ({} near-duplicate), {} discarded",
            self.total_records,
            self.candidates,
            self.created,
            self.accumulated,
            self.near_duplicates,
            self.discarded
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_outcomes_tallied() {
        let mut stats = RunningStats::default();
        stats.record_outcome("A~~~B", &UpsertOutcome::Created { id: 1 });
        stats.record_outcome(
            "A~~~B",
            &UpsertOutcome::Accumulated {
                id: 1,
                near_duplicate: true,
            },
        );
        stats.record_outcome("GG~~~CC", &UpsertOutcome::Discarded { near: 1 });
        assert_eq!(stats.candidates, 3);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.near_duplicates, 1);
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.per_marker.get("A~~~B"), Some(&2));

        let mut buf = Vec::new();
        stats.write_to_buf(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("# candidates: 3\n"));
        assert!(text.contains("# marker A~~~B: 2\n"));
    }
}
