//! Section alignment: pairs source sections with target sections by label.
//!
//! Fuzzy mode first pairs identical labels (after whitespace and case
//! normalization), whatever the threshold. Each remaining source section,
//! in order, then takes the best-scoring target section that is still free;
//! ties go to the candidate closest in ordinal position, then to the lowest
//! index. The result is injective on the target side and deterministic for
//! a fixed threshold.

use crate::config::{AlignmentConfig, AlignmentMode};
use crate::similarity::{metric_for, normalize_label, IndelRatio, SimilarityMetric};
use crate::types::*;
use std::cmp::Ordering;

pub struct SectionAligner {
    mode: AlignmentMode,
    threshold: f64,
    metric: Box<dyn SimilarityMetric>,
}

impl Default for SectionAligner {
    fn default() -> Self {
        Self::from_config(&AlignmentConfig::default())
    }
}

impl SectionAligner {
    pub fn new(threshold: f64) -> Self {
        Self {
            mode: AlignmentMode::Fuzzy,
            threshold,
            metric: Box::new(IndelRatio),
        }
    }

    pub fn from_config(config: &AlignmentConfig) -> Self {
        Self {
            mode: config.mode,
            threshold: config.similarity_threshold,
            metric: metric_for(config.metric),
        }
    }

    pub fn with_metric(mut self, metric: Box<dyn SimilarityMetric>) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_mode(mut self, mode: AlignmentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn align(&self, source: &[Section], target: &[Section]) -> AlignmentResult {
        log::info!(
            "Aligning {} source / {} target sections ({:?}, metric {}, threshold {:.2})",
            source.len(),
            target.len(),
            self.mode,
            self.metric.name(),
            self.threshold
        );

        let alignments = match self.mode {
            AlignmentMode::Fuzzy => self.align_fuzzy(source, target),
            AlignmentMode::Ordinal => self.align_ordinal(source, target),
        };
        self.finish(alignments, source, target)
    }

    fn score(&self, a: &Section, b: &Section) -> f64 {
        self.metric.similarity(&a.label, &b.label)
    }

    fn align_fuzzy(&self, source: &[Section], target: &[Section]) -> Vec<Alignment> {
        let mut taken = vec![false; target.len()];
        let reserved = Self::reserve_identical(source, target, &mut taken);
        let mut alignments = Vec::with_capacity(source.len());

        for (i, s) in source.iter().enumerate() {
            if let Some(j) = reserved[i] {
                log::debug!("'{}' -> '{}' (identical)", s.label, target[j].label);
                alignments.push(Alignment {
                    source: i,
                    target: Some(j),
                    score: 1.0,
                });
                continue;
            }

            let best = target
                .iter()
                .enumerate()
                .filter(|(j, _)| !taken[*j])
                .map(|(j, t)| (j, self.score(s, t)))
                .min_by(|&(ja, sa), &(jb, sb)| {
                    // Highest score, then nearest ordinal, then lowest index
                    sb.partial_cmp(&sa)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| ja.abs_diff(i).cmp(&jb.abs_diff(i)))
                        .then_with(|| ja.cmp(&jb))
                });

            let alignment = match best {
                Some((j, score)) if score >= self.threshold => {
                    taken[j] = true;
                    log::debug!("'{}' -> '{}' ({score:.3})", s.label, target[j].label);
                    Alignment {
                        source: i,
                        target: Some(j),
                        score,
                    }
                }
                Some((_, score)) => Alignment {
                    source: i,
                    target: None,
                    score,
                },
                None => Alignment {
                    source: i,
                    target: None,
                    score: 0.0,
                },
            };
            alignments.push(alignment);
        }

        alignments
    }

    /// Pair sections whose normalized labels are identical before any fuzzy
    /// scoring, in source order, nearest ordinal first.
    fn reserve_identical(source: &[Section], target: &[Section], taken: &mut [bool]) -> Vec<Option<usize>> {
        let target_keys: Vec<String> = target.iter().map(|t| normalize_label(&t.label)).collect();

        source
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let key = normalize_label(&s.label);
                let j = target_keys
                    .iter()
                    .enumerate()
                    .filter(|(j, k)| !taken[*j] && **k == key)
                    .min_by_key(|(j, _)| (j.abs_diff(i), *j))
                    .map(|(j, _)| j)?;
                taken[j] = true;
                Some(j)
            })
            .collect()
    }

    /// Pair by position; surplus sections on the longer side stay unmatched
    fn align_ordinal(&self, source: &[Section], target: &[Section]) -> Vec<Alignment> {
        source
            .iter()
            .enumerate()
            .map(|(i, s)| match target.get(i) {
                Some(t) => Alignment {
                    source: i,
                    target: Some(i),
                    score: self.score(s, t),
                },
                None => Alignment {
                    source: i,
                    target: None,
                    score: 0.0,
                },
            })
            .collect()
    }

    fn finish(&self, alignments: Vec<Alignment>, source: &[Section], target: &[Section]) -> AlignmentResult {
        let mut taken = vec![false; target.len()];
        for j in alignments.iter().filter_map(|a| a.target) {
            taken[j] = true;
        }

        let mut warnings = Vec::new();
        let unmatched_source: Vec<usize> = alignments
            .iter()
            .filter(|a| a.target.is_none())
            .map(|a| {
                warnings.push(AlignmentWarning {
                    language: Language::Source,
                    section: a.source,
                    label: source[a.source].label.clone(),
                    best_score: a.score,
                });
                a.source
            })
            .collect();

        let unmatched_target: Vec<usize> = (0..target.len()).filter(|&j| !taken[j]).collect();
        for &j in &unmatched_target {
            let best_score = source
                .iter()
                .map(|s| self.score(s, &target[j]))
                .fold(0.0, f64::max);
            warnings.push(AlignmentWarning {
                language: Language::Target,
                section: j,
                label: target[j].label.clone(),
                best_score,
            });
        }

        for warning in &warnings {
            log::warn!("{warning}");
        }

        AlignmentResult {
            alignments,
            unmatched_source,
            unmatched_target,
            warnings,
        }
    }
}
