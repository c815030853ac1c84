//! Decide whether a candidate is a known sequence, a near-duplicate of one, or new
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Mismatch rate at or below which two sequences count as near-duplicates
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Which matching policy the store applies on upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverMode {
    /// Only identical sequence text is folded together
    ExactOnly,
    /// Identical text is folded, then near-duplicates within tolerance
    NearDuplicateAware,
}

impl FromStr for ResolverMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" | "exact_only" => Ok(ResolverMode::ExactOnly),
            "near" | "near_duplicate_aware" => Ok(ResolverMode::NearDuplicateAware),
            other => Err(format!("Unknown resolver mode: {}", other)),
        }
    }
}

impl fmt::Display for ResolverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverMode::ExactOnly => write!(f, "exact_only"),
            ResolverMode::NearDuplicateAware => write!(f, "near_duplicate_aware"),
        }
    }
}

/// Minimal view of a stored entity needed to resolve a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownSequence {
    pub id: i64,
    pub sequence: String,
    pub count: u64,
}

/// Outcome of resolving one candidate against the known sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Add the candidate's occurrences to the entity with this id
    Accumulate { id: i64, near_duplicate: bool },
    /// Near-duplicate of a more frequent entity, drop the candidate
    Discard { id: i64 },
    /// No match, insert as a new entity
    Create,
}

/// Positional mismatches over the common prefix, divided by the longer length.
///
/// The unmatched tail of the longer sequence is never compared but still
/// weighs in through the denominator.
pub fn mismatch_rate(a: &[u8], b: &[u8]) -> f64 {
    let longer = a.len().max(b.len());
    if longer == 0 {
        return 0.0;
    }
    let mismatches = a.iter().zip(b.iter()).filter(|(x, y)| x != y).count();
    mismatches as f64 / longer as f64
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    pub mode: ResolverMode,
    pub tolerance: f64,
}

impl Resolver {
    pub fn new(mode: ResolverMode, tolerance: f64) -> Self {
        Resolver { mode, tolerance }
    }

    pub fn is_near_duplicate(&self, a: &str, b: &str) -> bool {
        mismatch_rate(a.as_bytes(), b.as_bytes()) <= self.tolerance
    }

    /// Resolve `sequence` seen `occurrences` times against `known`.
    ///
    /// `known` must be in storage order. An exact match always wins.
    /// Otherwise every near-duplicate is visited: the first one seen more
    /// often than the candidate discards it. When none does, the first
    /// near-duplicate absorbs the candidate.
    pub fn resolve(&self, sequence: &str, occurrences: u64, known: &[KnownSequence]) -> Resolution {
        if let Some(hit) = known.iter().find(|k| k.sequence == sequence) {
            return Resolution::Accumulate {
                id: hit.id,
                near_duplicate: false,
            };
        }
        if self.mode == ResolverMode::ExactOnly {
            return Resolution::Create;
        }
        let mut absorber = None;
        for k in known.iter().filter(|k| self.is_near_duplicate(sequence, &k.sequence)) {
            if occurrences < k.count {
                return Resolution::Discard { id: k.id };
            }
            absorber.get_or_insert(k.id);
        }
        match absorber {
            Some(id) => Resolution::Accumulate {
                id,
                near_duplicate: true,
            },
            None => Resolution::Create,
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(ResolverMode::NearDuplicateAware, DEFAULT_TOLERANCE)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn known(id: i64, sequence: &str, count: u64) -> KnownSequence {
        KnownSequence {
            id,
            sequence: sequence.to_string(),
            count,
        }
    }

    /// 100 bases, and the same with one substitution at `pos`
    fn pair_with_substitution(pos: usize) -> (String, String) {
        let a = "ACGT".repeat(25);
        let mut b = a.clone().into_bytes();
        b[pos] = if b[pos] == b'A' { b'T' } else { b'A' };
        (a, String::from_utf8(b).unwrap())
    }

    #[test]
    fn test_mismatch_rate_normalized_by_longer() {
        assert_eq!(mismatch_rate(b"ACGT", b"ACGT"), 0.0);
        assert_eq!(mismatch_rate(b"ACGT", b"ACGA"), 0.25);
        // Tail is not compared, only counted in the denominator
        assert_eq!(mismatch_rate(b"ACGT", b"ACGTACGT"), 0.0);
        assert_eq!(mismatch_rate(b"AAAA", b"TTAAAAAA"), 0.25);
        assert_eq!(mismatch_rate(b"", b""), 0.0);
        assert_eq!(mismatch_rate(b"", b"A"), 0.0);
    }

    #[test]
    fn test_exact_match_wins() {
        let resolver = Resolver::default();
        let store = vec![known(1, "ACGT", 10), known(2, "TTTT", 1)];
        assert_eq!(
            resolver.resolve("TTTT", 1, &store),
            Resolution::Accumulate {
                id: 2,
                near_duplicate: false
            }
        );
    }

    #[test]
    fn test_near_duplicate_with_lower_count_discarded() {
        let (a, b) = pair_with_substitution(10);
        let store = vec![known(1, &a, 5)];
        assert_eq!(Resolver::default().resolve(&b, 4, &store), Resolution::Discard { id: 1 });
    }

    #[test]
    fn test_near_duplicate_with_higher_count_absorbed() {
        let (a, b) = pair_with_substitution(10);
        let store = vec![known(1, &a, 5)];
        assert_eq!(
            Resolver::default().resolve(&b, 5, &store),
            Resolution::Accumulate {
                id: 1,
                near_duplicate: true
            }
        );
    }

    #[test]
    fn test_beyond_tolerance_creates() {
        let a = "ACGT".repeat(25);
        let mut b = a.clone().into_bytes();
        b[0] = b'T';
        b[50] = b'T';
        let b = String::from_utf8(b).unwrap();
        let store = vec![known(1, &a, 5)];
        assert_eq!(Resolver::default().resolve(&b, 1, &store), Resolution::Create);
    }

    #[test]
    fn test_first_near_duplicate_decides() {
        let (a, b) = pair_with_substitution(10);
        let (_, c) = pair_with_substitution(20);
        let store = vec![known(1, &b, 100), known(2, &c, 1)];
        assert_eq!(Resolver::default().resolve(&a, 2, &store), Resolution::Discard { id: 1 });
    }

    #[test]
    fn test_later_frequent_near_duplicate_discards() {
        let (a, b) = pair_with_substitution(10);
        let (_, c) = pair_with_substitution(20);
        let store = vec![known(1, &b, 1), known(2, &c, 100)];
        assert_eq!(Resolver::default().resolve(&a, 5, &store), Resolution::Discard { id: 2 });
    }

    #[test]
    fn test_first_rare_near_duplicate_absorbs() {
        let (a, b) = pair_with_substitution(10);
        let (_, c) = pair_with_substitution(20);
        let store = vec![known(1, &b, 1), known(2, &c, 3)];
        assert_eq!(
            Resolver::default().resolve(&a, 5, &store),
            Resolution::Accumulate {
                id: 1,
                near_duplicate: true
            }
        );
    }

    #[test]
    fn test_empty_candidate_is_near_duplicate_of_anything() {
        // Nothing is compared, only the longer length counts
        let store = vec![known(1, "GATTACA", 1)];
        assert!(Resolver::default().is_near_duplicate("", "GATTACA"));
        assert_eq!(
            Resolver::default().resolve("", 11, &store),
            Resolution::Accumulate {
                id: 1,
                near_duplicate: true
            }
        );
        assert_eq!(Resolver::default().resolve("", 0, &store), Resolution::Discard { id: 1 });
    }

    #[test]
    fn test_exact_only_ignores_near_duplicates() {
        let (a, b) = pair_with_substitution(10);
        let store = vec![known(1, &a, 5)];
        let resolver = Resolver::new(ResolverMode::ExactOnly, DEFAULT_TOLERANCE);
        assert_eq!(resolver.resolve(&b, 1, &store), Resolution::Create);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("exact".parse::<ResolverMode>(), Ok(ResolverMode::ExactOnly));
        assert_eq!(
            "near_duplicate_aware".parse::<ResolverMode>(),
            Ok(ResolverMode::NearDuplicateAware)
        );
        assert!("fuzzy".parse::<ResolverMode>().is_err());
        let mode: ResolverMode = serde_json::from_str(r#""exact_only""#).unwrap();
        assert_eq!(mode, ResolverMode::ExactOnly);
    }
}
