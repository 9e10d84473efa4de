//! Label similarity strategies used by the aligner.
//!
//! Metrics are stateless and pure: swapping one for another never touches the
//! aligner's control flow. Scores are in [0, 1]; identical strings score 1.0.

use crate::config::MetricKind;

/// Lowercase and collapse whitespace runs to a single space
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Content key used for span comparison: lowercase, all whitespace removed
pub fn content_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

pub trait SimilarityMetric: Send + Sync {
    fn name(&self) -> &str;

    /// Similarity of two already-normalized strings
    fn score_normalized(&self, a: &str, b: &str) -> f64;

    /// Similarity of two raw labels. Exact string equality is always 1.0.
    fn similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        let (a, b) = (normalize_label(a), normalize_label(b));
        if a == b {
            return 1.0;
        }
        self.score_normalized(&a, &b).clamp(0.0, 1.0)
    }
}

/// 2·LCS / (|a| + |b|): the indel-distance ratio
#[derive(Debug, Clone, Copy, Default)]
pub struct IndelRatio;

impl SimilarityMetric for IndelRatio {
    fn name(&self) -> &str {
        "indel_ratio"
    }

    fn score_normalized(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 1.0;
        }
        (2 * lcs_len(&a, &b)) as f64 / total as f64
    }
}

/// 1 − levenshtein / max(|a|, |b|)
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLevenshtein;

impl SimilarityMetric for NormalizedLevenshtein {
    fn name(&self) -> &str {
        "normalized_levenshtein"
    }

    fn score_normalized(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let max_len = a.len().max(b.len());
        if max_len == 0 {
            return 1.0;
        }
        1.0 - levenshtein(&a, &b) as f64 / max_len as f64
    }
}

pub fn metric_for(kind: MetricKind) -> Box<dyn SimilarityMetric> {
    match kind {
        MetricKind::IndelRatio => Box::new(IndelRatio),
        MetricKind::NormalizedLevenshtein => Box::new(NormalizedLevenshtein),
    }
}

/// Longest common subsequence length, two-row DP
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
