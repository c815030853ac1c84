//! Extraction of the content between flank markers
use memchr::memmem;

use crate::markers::{MarkerPair, MarkerTable};

/// Owned sub-sequence found in one record for one marker pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionCandidate {
    /// Content between the markers, markers excluded
    pub sequence: String,
    /// `start~~~end` label of the marker pair that produced the match
    pub fixed_sequence: String,
    /// Occurrences of `sequence` within the same record (not a global count)
    pub occurrences: u64,
}

impl ExtractionCandidate {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Number of non-overlapping occurrences of `needle` in `haystack`.
///
/// An empty needle occurs at every boundary, `haystack.len() + 1` times.
pub fn count_occurrences(haystack: &[u8], needle: &[u8]) -> u64 {
    if needle.is_empty() {
        return haystack.len() as u64 + 1;
    }
    memmem::find_iter(haystack, needle).count() as u64
}

/// Locate the content bounded by one marker pair.
///
/// Only the first `start` is considered; `end` is searched from the end of that match on.
/// Match boundaries of a UTF-8 needle in UTF-8 text are always char boundaries.
pub fn find_between<'a>(seq: &'a str, pair: &MarkerPair) -> Option<&'a str> {
    let bytes = seq.as_bytes();
    let content_begin = memmem::find(bytes, pair.start.as_bytes())? + pair.start.len();
    let content_len = memmem::find(&bytes[content_begin..], pair.end.as_bytes())?;
    Some(&seq[content_begin..content_begin + content_len])
}

/// Lazy scan of one record against every marker pair, in table order.
///
/// Yields at most one candidate per marker pair. Pairs are independent,
/// each is matched against the full original record.
pub struct Extractor<'a> {
    seq: &'a str,
    pairs: std::slice::Iter<'a, MarkerPair>,
}

impl<'a> Extractor<'a> {
    pub fn new(seq: &'a str, markers: &'a MarkerTable) -> Self {
        Extractor {
            seq,
            pairs: markers.pairs().iter(),
        }
    }
}

impl<'a> Iterator for Extractor<'a> {
    type Item = ExtractionCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let pair = self.pairs.next()?;
            if let Some(content) = find_between(self.seq, pair) {
                break Some(ExtractionCandidate {
                    sequence: content.to_string(),
                    fixed_sequence: pair.label(),
                    occurrences: count_occurrences(self.seq.as_bytes(), content.as_bytes()),
                });
            } // Else try the next pair
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.pairs.len()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn single(start: &str, end: &str) -> MarkerTable {
        MarkerTable::new(vec![MarkerPair::new(start, end)])
    }

    #[test]
    fn test_markers_excluded() {
        let table = single("ACGCT", "ACCGC");
        let found: Vec<_> = Extractor::new("XXACGCTmiddleACCGCYYY", &table).collect();
        assert_eq!(
            found,
            vec![ExtractionCandidate {
                sequence: "middle".to_string(),
                fixed_sequence: "ACGCT~~~ACCGC".to_string(),
                occurrences: 1,
            }]
        );
    }

    #[test]
    fn test_occurrences_counted_in_full_record() {
        let table = single("ACGCT", "ACCGC");
        let found: Vec<_> = Extractor::new("TTAGACGCTTTAGACCGCTTAG", &table).collect();
        assert_eq!(found[0].sequence, "TTAG");
        assert_eq!(found[0].occurrences, 3);
    }

    #[test]
    fn test_non_overlapping_count() {
        assert_eq!(count_occurrences(b"AAAA", b"AA"), 2);
        assert_eq!(count_occurrences(b"ACGT", b"GA"), 0);
        assert_eq!(count_occurrences(b"ACG", b""), 4);
    }

    #[test]
    fn test_missing_end_skips_only_that_pair() {
        let table = MarkerTable::new(vec![
            MarkerPair::new("ACGCT", "TTTTTT"),
            MarkerPair::new("GG", "CTCGAA"),
        ]);
        let found: Vec<_> = Extractor::new("ACGCTAAGGAAACTCGAA", &table).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].sequence, "AAA");
        assert_eq!(found[0].fixed_sequence, "GG~~~CTCGAA");
    }

    #[test]
    fn test_end_before_start_not_matched() {
        let table = single("ACGCT", "ACCGC");
        assert_eq!(Extractor::new("ACCGCTTTACGCTGG", &table).count(), 0);
    }

    #[test]
    fn test_end_searched_after_start_match() {
        // "GGG" must not let the end marker "GG" reuse characters of the start marker
        let table = single("GG", "GG");
        let found: Vec<_> = Extractor::new("AGGGTA", &table).collect();
        assert!(found.is_empty());
        let found: Vec<_> = Extractor::new("AGGTGGA", &table).collect();
        assert_eq!(found[0].sequence, "T");
    }

    #[test]
    fn test_overlapping_pairs_evaluated_independently() {
        let table = MarkerTable::default();
        let found: Vec<_> = Extractor::new("XXACGCTmiddleACCGCYYY", &table).collect();
        let labels: Vec<_> = found.iter().map(|c| c.fixed_sequence.as_str()).collect();
        assert_eq!(labels, vec!["ACGCT~~~ACCGC", "ACG~~~ACCGC"]);
        assert_eq!(found[0].sequence, "middle");
        assert_eq!(found[1].sequence, "CTmiddle");
    }

    #[test]
    fn test_adjacent_markers_give_empty_candidate() {
        let table = single("ACGCT", "ACCGC");
        let found: Vec<_> = Extractor::new("ACGCTACCGC", &table).collect();
        assert!(found[0].is_empty());
        assert_eq!(found[0].occurrences, 11);
    }

    #[test]
    fn test_multibyte_text_kept_verbatim() {
        let table = single("ACGCT", "ACCGC");
        let found: Vec<_> = Extractor::new("ACGCTAéAACCGC", &table).collect();
        assert_eq!(found[0].sequence, "AéA");
        assert_eq!(found[0].len(), 4);
    }

    #[test]
    fn test_case_is_literal() {
        let table = single("ACGCT", "ACCGC");
        assert_eq!(Extractor::new("acgctAAAACCGC", &table).count(), 0);
    }
}
