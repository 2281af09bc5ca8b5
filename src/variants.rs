// src/variants.rs
//
// Candidate generation for the screening runs. Each strategy is a plain
// function producing either parameter pairs or derived sequences: the
// alpha/tau grid, exhaustive window substitution (optionally with a
// complementary second window), priority-partitioned substitution,
// single-position deletions, and explicit clamped point mutations.

use itertools::Itertools;
use log::warn;
use serde::Serialize;

use crate::error::{Result, ScreenError};
use crate::fasta::complement;

pub const NUCLEOTIDES: [char; 4] = ['A', 'T', 'G', 'C'];

/// A contiguous half-open index range of a sequence.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Fail fast when the window does not fit the sequence.
    pub fn validate(&self, seq_len: usize) -> Result<()> {
        if self.start >= self.end || self.end > seq_len {
            return Err(ScreenError::Config(format!(
                "window {}..{} does not fit a sequence of length {}",
                self.start, self.end, seq_len
            )));
        }
        Ok(())
    }
}

// ============ Parameter sweep ============

/// Inclusive linearly spaced points, numpy linspace semantics.
pub fn linspace(lo: f64, hi: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![lo],
        _ => (0..steps)
            .map(|i| lo + (hi - lo) * i as f64 / (steps - 1) as f64)
            .collect(),
    }
}

/// Cartesian grid over alpha in [0,1] and tau in [0,1000], tau-major order.
pub fn param_grid(alpha_steps: usize, tau_steps: usize) -> Vec<(f64, f64)> {
    let alphas = linspace(0.0, 1.0, alpha_steps);
    linspace(0.0, 1000.0, tau_steps)
        .into_iter()
        .flat_map(|tau| alphas.iter().map(move |&alpha| (alpha, tau)))
        .collect()
}

// ============ Window substitution ============

/// Every ordered nucleotide tuple of the given window length, in
/// lexicographic enumeration order. Exactly 4^window_len fragments.
pub fn window_substitutions(window_len: usize) -> Vec<String> {
    (0..window_len)
        .map(|_| NUCLEOTIDES.iter().copied())
        .multi_cartesian_product()
        .map(|combo| combo.into_iter().collect())
        .collect()
}

/// Replace `seq[window]` with `fragment` and return the new sequence.
pub fn apply_fragment(seq: &str, window: Window, fragment: &str) -> String {
    let mut chars: Vec<char> = seq.chars().collect();
    chars.splice(window.start..window.end, fragment.chars());
    chars.into_iter().collect()
}

/// Write the reverse complement of `seq[source]` over the window starting at
/// `target_start`. The target window length equals the source length, so the
/// sequence length is preserved; the tail is clipped at the sequence end.
pub fn apply_complement(seq: &str, source: Window, target_start: usize) -> String {
    let mut chars: Vec<char> = seq.chars().collect();
    let rc: Vec<char> = chars[source.start..source.end]
        .iter()
        .rev()
        .map(|&c| complement(c))
        .collect();
    let end = (target_start + rc.len()).min(chars.len());
    if target_start < end {
        chars.splice(target_start..end, rc[..end - target_start].iter().copied());
    }
    chars.into_iter().collect()
}

// ============ Priority-partitioned substitution ============

/// One candidate symbol for a window position (1-based within the window).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub symbol: char,
    pub position: usize,
}

pub type PriorityGroup = Vec<Candidate>;

fn group(pairs: [(char, usize); 6]) -> PriorityGroup {
    pairs
        .into_iter()
        .map(|(symbol, position)| Candidate { symbol, position })
        .collect()
}

/// The four curated candidate groups for the six-base target window,
/// in precedence order.
pub fn default_priority_groups() -> [PriorityGroup; 4] {
    [
        group([('G', 1), ('A', 2), ('A', 3), ('C', 4), ('G', 5), ('C', 6)]),
        group([('C', 1), ('C', 2), ('C', 3), ('G', 4), ('A', 5), ('G', 6)]),
        group([('T', 1), ('G', 2), ('G', 3), ('T', 4), ('C', 5), ('T', 6)]),
        group([('A', 1), ('T', 2), ('T', 3), ('A', 4), ('T', 5), ('A', 6)]),
    ]
}

/// A window fragment produced by the priority enumeration, together with the
/// (p1, p2, p3) proportion that generated it.
#[derive(Debug, Clone)]
pub struct PriorityFragment {
    pub fragment: String,
    pub proportion: (usize, usize, usize),
}

/// Enumerate all ways to draw p1 candidates from group 1, p2 from group 2
/// and p3 from group 3 (p1+p2+p3 bounded by `max_upper_subs`), filling the
/// remaining window positions from group 4. A position claimed by a higher
/// priority group is never offered to a lower one.
pub fn priority_substitutions(
    groups: &[PriorityGroup; 4],
    window_len: usize,
    max_upper_subs: usize,
) -> Vec<PriorityFragment> {
    let mut out = Vec::new();
    let bound = max_upper_subs.min(window_len);

    for p1 in 0..=bound {
        for p2 in 0..=bound {
            for p3 in 0..=bound {
                if p1 + p2 + p3 > bound {
                    continue;
                }
                let remainder = window_len - p1 - p2 - p3;

                for g1 in groups[0].iter().copied().combinations(p1) {
                    let taken1: Vec<usize> = g1.iter().map(|c| c.position).collect();
                    let avail2: Vec<Candidate> = groups[1]
                        .iter()
                        .copied()
                        .filter(|c| !taken1.contains(&c.position))
                        .collect();

                    for g2 in avail2.into_iter().combinations(p2) {
                        let mut taken2 = taken1.clone();
                        taken2.extend(g2.iter().map(|c| c.position));
                        let avail3: Vec<Candidate> = groups[2]
                            .iter()
                            .copied()
                            .filter(|c| !taken2.contains(&c.position))
                            .collect();

                        for g3 in avail3.into_iter().combinations(p3) {
                            let mut taken3 = taken2.clone();
                            taken3.extend(g3.iter().map(|c| c.position));
                            let avail4: Vec<Candidate> = groups[3]
                                .iter()
                                .copied()
                                .filter(|c| !taken3.contains(&c.position))
                                .collect();

                            for g4 in avail4.into_iter().combinations(remainder) {
                                let mut chosen: Vec<Candidate> =
                                    Vec::with_capacity(window_len);
                                chosen.extend(&g1);
                                chosen.extend(&g2);
                                chosen.extend(&g3);
                                chosen.extend(&g4);
                                chosen.sort_by_key(|c| c.position);
                                out.push(PriorityFragment {
                                    fragment: chosen.iter().map(|c| c.symbol).collect(),
                                    proportion: (p1, p2, p3),
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    out
}

// ============ Deletion scan ============

/// Delete the base at `idx` and, when `comp_offset` is given, also the
/// pairing partner `idx - comp_offset` positions upstream.
pub fn apply_deletion(seq: &str, idx: usize, comp_offset: Option<usize>) -> String {
    let mut chars: Vec<char> = seq.chars().collect();
    if idx < chars.len() {
        chars.remove(idx);
    }
    if let Some(offset) = comp_offset {
        if let Some(partner) = idx.checked_sub(offset) {
            if partner < chars.len() {
                chars.remove(partner);
            }
        }
    }
    chars.into_iter().collect()
}

// ============ Explicit mutations ============

/// A caller-supplied edit: replace the region starting at `index` with
/// `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointMutation {
    pub index: usize,
    pub replacement: String,
}

/// What actually happened to one requested edit after clamping.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedMutation {
    pub index: usize,
    pub replacement: String,
    /// Characters actually written; 0 when the edit was skipped entirely.
    pub applied_len: usize,
    /// Positions that differ from the original region.
    pub differing: usize,
}

/// Parse a `index1:replacement1_index2:replacement2...` mutation spec.
pub fn parse_mutations(spec: &str) -> Result<Vec<PointMutation>> {
    spec.split('_')
        .map(|part| {
            let (index, replacement) = part.split_once(':').ok_or_else(|| {
                ScreenError::Config(format!(
                    "malformed mutation `{}` (expected index:replacement)",
                    part
                ))
            })?;
            let index = index.parse::<usize>().map_err(|_| {
                ScreenError::Config(format!("malformed mutation index `{}`", index))
            })?;
            Ok(PointMutation {
                index,
                replacement: replacement.to_string(),
            })
        })
        .collect()
}

/// Best-effort merge with bounds clamping. Edits starting past the sequence
/// end are skipped, edits running past the end are truncated to fit; both
/// cases are logged and reported back to the caller.
pub fn apply_mutations(seq: &str, mutations: &[PointMutation]) -> (String, Vec<AppliedMutation>) {
    let mut chars: Vec<char> = seq.chars().collect();
    let mut report = Vec::with_capacity(mutations.len());

    for mutation in mutations {
        if mutation.index > chars.len() {
            warn!(
                "mutation {}:{} starts past the sequence end ({}), skipped",
                mutation.index,
                mutation.replacement,
                chars.len()
            );
            report.push(AppliedMutation {
                index: mutation.index,
                replacement: mutation.replacement.clone(),
                applied_len: 0,
                differing: 0,
            });
            continue;
        }

        let replacement: Vec<char> = mutation.replacement.chars().collect();
        let end = (mutation.index + replacement.len()).min(chars.len());
        let applied = &replacement[..end - mutation.index];
        if applied.len() < replacement.len() {
            warn!(
                "mutation {}:{} truncated to {} characters at the sequence boundary",
                mutation.index,
                mutation.replacement,
                applied.len()
            );
        }
        let differing = chars[mutation.index..end]
            .iter()
            .zip(applied.iter())
            .filter(|(a, b)| a != b)
            .count();
        let applied_len = applied.len();
        let patch: Vec<char> = applied.to_vec();
        chars.splice(mutation.index..end, patch);

        report.push(AppliedMutation {
            index: mutation.index,
            replacement: mutation.replacement.clone(),
            applied_len,
            differing,
        });
    }

    (chars.into_iter().collect(), report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn grid_covers_the_parameter_plane() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        let grid = param_grid(2, 3);
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[0], (0.0, 0.0));
        assert_eq!(grid[grid.len() - 1], (1.0, 1000.0));
    }

    #[test]
    fn window_substitution_is_exhaustive_and_distinct() {
        let fragments = window_substitutions(2);
        assert_eq!(fragments.len(), 16);
        let unique: HashSet<_> = fragments.iter().collect();
        assert_eq!(unique.len(), 16);
        assert!(fragments.iter().all(|f| f.len() == 2));
    }

    #[test]
    fn fragment_application_only_touches_the_window() {
        let out = apply_fragment("AAAAAA", Window::new(2, 4), "GC");
        assert_eq!(out, "AAGCAA");
    }

    #[test]
    fn complementary_substitution_preserves_length() {
        // source AC at 0..2, reverse complement GT written at 4
        let out = apply_complement("ACAAAA", Window::new(0, 2), 4);
        assert_eq!(out, "ACAAGT");
        assert_eq!(out.len(), 6);
        // target clipped at the sequence end
        let clipped = apply_complement("ACAAAA", Window::new(0, 2), 5);
        assert_eq!(clipped, "ACAAAG");
    }

    #[test]
    fn priority_enumeration_counts() {
        let groups = default_priority_groups();
        let fragments = priority_substitutions(&groups, 6, 1);
        // 1 all-group-4 fragment plus 6 single choices from each upper group
        assert_eq!(fragments.len(), 19);
        assert!(fragments.iter().all(|f| f.fragment.len() == 6));
        assert_eq!(fragments[0].fragment, "ATTATA");
        assert_eq!(fragments[0].proportion, (0, 0, 0));
    }

    #[test]
    fn priority_groups_never_share_a_position() {
        let groups = [
            group([('G', 1), ('C', 2), ('G', 3), ('T', 4), ('T', 5), ('C', 6)]),
            group([('C', 1), ('T', 2), ('C', 3), ('G', 4), ('G', 5), ('G', 6)]),
            group([('A', 1), ('G', 2), ('A', 3), ('C', 4), ('C', 5), ('A', 6)]),
            group([('T', 1), ('A', 2), ('T', 3), ('A', 4), ('A', 5), ('T', 6)]),
        ];
        for frag in priority_substitutions(&groups, 6, 3) {
            // a reused position would leave the fragment short or long
            assert_eq!(frag.fragment.len(), 6);
        }
    }

    #[test]
    fn deletion_removes_one_or_two_positions() {
        assert_eq!(apply_deletion("ABCDEF", 3, None), "ABCEF");
        assert_eq!(apply_deletion("ABCDEF", 3, Some(2)), "ACEF");
        // out-of-range index is a no-op
        assert_eq!(apply_deletion("ABC", 7, None), "ABC");
    }

    #[test]
    fn mutation_spec_round_trip() {
        let muts = parse_mutations("10:AC_2:G").unwrap();
        assert_eq!(
            muts,
            vec![
                PointMutation {
                    index: 10,
                    replacement: "AC".into()
                },
                PointMutation {
                    index: 2,
                    replacement: "G".into()
                },
            ]
        );
        assert!(parse_mutations("notaspec").is_err());
        assert!(parse_mutations("x:AC").is_err());
    }

    #[test]
    fn mutations_apply_with_clamping() {
        let (seq, report) = apply_mutations(
            "ATGC",
            &[PointMutation {
                index: 1,
                replacement: "TT".into(),
            }],
        );
        assert_eq!(seq, "ATTC");
        assert_eq!(report[0].applied_len, 2);
        assert_eq!(report[0].differing, 1);
    }

    #[test]
    fn out_of_range_mutation_is_a_reported_noop() {
        let (seq, report) = apply_mutations(
            "ATGC",
            &[PointMutation {
                index: 10,
                replacement: "AC".into(),
            }],
        );
        assert_eq!(seq, "ATGC");
        assert_eq!(report[0].applied_len, 0);
    }

    #[test]
    fn overlong_mutation_is_truncated_at_the_boundary() {
        let (seq, report) = apply_mutations(
            "ATGC",
            &[PointMutation {
                index: 2,
                replacement: "GGG".into(),
            }],
        );
        assert_eq!(seq, "ATGG");
        assert_eq!(report[0].applied_len, 2);
        assert_eq!(report[0].differing, 1);
    }
}
