//! Ordered subsequence alignment of a pattern against a document's terms.
//!
//! The document side is the sequence of pattern terms occurring in a field,
//! ordered by position. Terms absent from the pattern never appear in it, but
//! the relative order of the remaining ones is preserved.
//!
//! For a pattern of length `n` the aligner computes:
//!
//! - `best`: the longest common subsequence length of pattern and document,
//! - `quality = best / n`,
//! - `frequency`: the number of alignments of length `best` found by one
//!   greedy left-to-right scan, where each alignment starts strictly after
//!   the last event used by the previous one.
//!
//! Both passes keep a single DP row of `n + 1` counters.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Outcome of aligning a pattern against one document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentResult {
    /// Number of disjoint best alignments found by the greedy scan.
    pub frequency: u64,
    /// Best alignment length divided by pattern length, in `[0, 1]`.
    pub quality: f32,
}

impl AlignmentResult {
    pub const NO_MATCH: AlignmentResult = AlignmentResult {
        frequency: 0,
        quality: 0.0,
    };

    /// Whether the alignment reaches `threshold` (inclusive).
    pub fn is_match(&self, threshold: f32) -> bool {
        self.quality >= threshold
    }
}

/// Smallest alignment length whose quality reaches `threshold` for a
/// pattern of `pattern_len` terms.
pub fn min_match_length(pattern_len: usize, threshold: f32) -> usize {
    (1..=pattern_len)
        .find(|&len| quality(len, pattern_len) >= threshold)
        .unwrap_or(pattern_len)
}

fn quality(best: usize, pattern_len: usize) -> f32 {
    best as f32 / pattern_len as f32
}

/// Aligns documents against a fixed pattern, reusing its DP row.
///
/// Pattern and events are term ids; equal ids denote equal terms.
#[derive(Debug, Clone)]
pub struct SequenceAligner {
    pattern: Vec<usize>,
    row: Vec<usize>,
}

impl SequenceAligner {
    pub fn new(pattern: Vec<usize>) -> Self {
        let row = vec![0; pattern.len() + 1];
        SequenceAligner { pattern, row }
    }

    pub fn pattern(&self) -> &[usize] {
        &self.pattern
    }

    /// Align the pattern against `events`, the document's term ids in
    /// position order.
    pub fn align(&mut self, events: &[usize]) -> AlignmentResult {
        let n = self.pattern.len();
        if n == 0 {
            // An empty pattern is fully matched by anything.
            return AlignmentResult {
                frequency: 1,
                quality: 1.0,
            };
        }

        let best = self.best_length(events);
        if best == 0 {
            return AlignmentResult::NO_MATCH;
        }

        AlignmentResult {
            frequency: self.count_greedy(events, best),
            quality: quality(best, n),
        }
    }

    /// Longest common subsequence length of the pattern and `events`.
    pub fn best_length(&mut self, events: &[usize]) -> usize {
        let n = self.pattern.len();
        self.row.fill(0);

        for &term in events {
            self.step(term);
            if self.row[n] == n {
                break;
            }
        }
        self.row[n]
    }

    fn count_greedy(&mut self, events: &[usize], best: usize) -> u64 {
        let n = self.pattern.len();
        let mut frequency = 0;
        self.row.fill(0);

        for &term in events {
            self.step(term);
            if self.row[n] == best {
                frequency += 1;
                self.row.fill(0);
            }
        }
        frequency
    }

    /// Extend the DP row by one document event.
    fn step(&mut self, term: usize) {
        let mut diag = 0;
        for i in 1..=self.pattern.len() {
            let above = self.row[i];
            self.row[i] = if self.pattern[i - 1] == term {
                diag + 1
            } else {
                above.max(self.row[i - 1])
            };
            diag = above;
        }
    }
}

/// Align `pattern` against `events` with a one-off aligner.
pub fn align(pattern: &[usize], events: &[usize]) -> AlignmentResult {
    SequenceAligner::new(pattern.to_vec()).align(events)
}

/// Merge per-term ascending position lists into a single term-id sequence
/// ordered by position.
///
/// `lists` holds `(term_id, positions)` pairs. Equal positions are ordered by
/// term id. `events` is cleared first.
pub fn merge_positions(lists: &[(usize, Vec<u64>)], events: &mut Vec<usize>) {
    events.clear();
    events.reserve(lists.iter().map(|(_, positions)| positions.len()).sum());

    let mut heap: BinaryHeap<Reverse<(u64, usize, usize)>> = lists
        .iter()
        .enumerate()
        .filter_map(|(list, (term, positions))| {
            positions.first().map(|&pos| Reverse((pos, *term, list)))
        })
        .collect();
    let mut cursors = vec![0usize; lists.len()];

    while let Some(Reverse((_, term, list))) = heap.pop() {
        events.push(term);

        cursors[list] += 1;
        if let Some(&pos) = lists[list].1.get(cursors[list]) {
            heap.push(Reverse((pos, term, list)));
        }
    }
}
