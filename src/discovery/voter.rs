//! Date consensus voting.
//!
//! An item usually carries several date hints of varying quality. Each hint
//! votes for its (normalized) calendar date with the weight of its source,
//! and every additional hint agreeing on the same date adds a bonus of one:
//!
//! ```text
//! score(date) = Σ weight(source) + (|group| - 1)
//! ```
//!
//! The highest score wins. Ties go to the earliest date, so the result does
//! not depend on the order hints were extracted in.

use crate::config::SourceWeights;
use crate::models::{ArticleCandidate, DateCandidate, DateSource, ResolvedArticle};
use crate::utils::parse_date;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::trace;

/// The winning date for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub publication_date: NaiveDate,
    pub date_score: u32,
    pub date_source: DateSource,
}

/// Resolve one date from `candidates`, or `None` when nothing reaches `threshold`.
pub fn vote(candidates: &[DateCandidate], weights: &SourceWeights, threshold: u32) -> Option<Vote> {
    let mut groups: BTreeMap<NaiveDate, Vec<DateSource>> = BTreeMap::new();
    for candidate in candidates {
        match parse_date(&candidate.date) {
            Some(date) => groups.entry(date).or_default().push(candidate.source),
            None => trace!(raw = %candidate.date, source = %candidate.source, "Ignoring unparseable date"),
        }
    }

    let mut best: Option<Vote> = None;
    // BTreeMap iterates oldest first and only a strictly higher score replaces
    // the leader, so the earliest date keeps a tie.
    for (date, sources) in &groups {
        let weight_sum: u32 = sources.iter().map(|s| weights.weight(*s)).sum();
        let score = weight_sum + (sources.len() as u32 - 1);

        if best.is_some_and(|b| score <= b.date_score) {
            continue;
        }
        let Some(date_source) = strongest_source(sources, weights) else {
            continue;
        };
        best = Some(Vote {
            publication_date: *date,
            date_score: score,
            date_source,
        });
    }

    best.filter(|b| b.date_score >= threshold)
}

/// Highest-weighted source in a group; equal weights fall back to declaration order.
fn strongest_source(sources: &[DateSource], weights: &SourceWeights) -> Option<DateSource> {
    sources
        .iter()
        .copied()
        .max_by(|a, b| {
            weights
                .weight(*a)
                .cmp(&weights.weight(*b))
                .then_with(|| b.cmp(a))
        })
}

/// Apply [`vote`] to a raw candidate.
pub fn resolve(candidate: ArticleCandidate, weights: &SourceWeights, threshold: u32) -> ResolvedArticle {
    let outcome = vote(&candidate.date_candidates, weights, threshold);
    let mut article = ResolvedArticle::unresolved(candidate);
    if let Some(v) = outcome {
        article.publication_date = Some(v.publication_date);
        article.date_score = Some(v.date_score);
        article.date_source = Some(v.date_source);
    }
    article
}

#[cfg(test)]
mod tests {
    use super::*;
    use DateSource::*;

    fn c(date: &str, source: DateSource) -> DateCandidate {
        DateCandidate::new(date, source)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn test_empty_candidates_are_absent() {
        assert_eq!(vote(&[], &SourceWeights::default(), 0), None);
    }

    #[test]
    fn test_single_strong_source_wins() {
        let v = vote(&[c("2025-01-20", ExplicitAttribute)], &SourceWeights::default(), 3).unwrap();
        assert_eq!(v.publication_date, day(20));
        assert_eq!(v.date_score, 5);
        assert_eq!(v.date_source, ExplicitAttribute);
    }

    #[test]
    fn test_below_threshold_is_absent() {
        let v = vote(&[c("2025-01-20", GenericMetadata)], &SourceWeights::default(), 3);
        assert_eq!(v, None);
    }

    #[test]
    fn test_consensus_bonus_counts_agreement() {
        // near-title (2) + generic (1) + bonus (1) = 4 beats url-path (3)
        let candidates = [
            c("2025-01-18", UrlPath),
            c("January 20, 2025", NearTitleText),
            c("2025-01-20T10:00:00Z", GenericMetadata),
        ];
        let v = vote(&candidates, &SourceWeights::default(), 3).unwrap();
        assert_eq!(v.publication_date, day(20));
        assert_eq!(v.date_score, 4);
        assert_eq!(v.date_source, NearTitleText);
    }

    #[test]
    fn test_date_source_is_strongest_not_first() {
        let candidates = [
            c("2025-01-20", GenericMetadata),
            c("2025-01-20", StructuredMetadata),
            c("2025-01-20", NearTitleText),
        ];
        let v = vote(&candidates, &SourceWeights::default(), 0).unwrap();
        assert_eq!(v.date_source, StructuredMetadata);
        assert_eq!(v.date_score, 1 + 4 + 2 + 2);
    }

    #[test]
    fn test_tie_goes_to_earliest_date() {
        let candidates = [c("2025-01-20", UrlPath), c("2025-01-17", UrlPath)];
        let v = vote(&candidates, &SourceWeights::default(), 0).unwrap();
        assert_eq!(v.publication_date, day(17));
    }

    #[test]
    fn test_order_independent() {
        let candidates = vec![
            c("2025-01-20", UrlPath),
            c("2025-01-17", NearTitleText),
            c("2025-01-17", GenericMetadata),
            c("2025-01-19", StructuredMetadata),
            c("garbage", ExplicitAttribute),
        ];
        let weights = SourceWeights::default();
        let expected = vote(&candidates, &weights, 0);
        let mut reversed = candidates.clone();
        reversed.reverse();
        assert_eq!(vote(&reversed, &weights, 0), expected);
        let mut rotated = candidates.clone();
        rotated.rotate_left(2);
        assert_eq!(vote(&rotated, &weights, 0), expected);
    }

    #[test]
    fn test_agreeing_candidate_never_lowers_score() {
        let weights = SourceWeights::default();
        let mut candidates = vec![c("2025-01-20", NearTitleText), c("2025-01-19", GenericMetadata)];
        let before = vote(&candidates, &weights, 0).unwrap();
        for source in [GenericMetadata, UrlPath, ExplicitAttribute] {
            candidates.push(c("2025-01-20", source));
            let after = vote(&candidates, &weights, 0).unwrap();
            assert_eq!(after.publication_date, before.publication_date);
            assert!(after.date_score > before.date_score);
        }
    }

    #[test]
    fn test_equal_weights_prefer_declaration_order() {
        let weights = SourceWeights {
            url_path: 4,
            ..SourceWeights::default()
        };
        let candidates = [c("2025-01-20", UrlPath), c("2025-01-20", StructuredMetadata)];
        let v = vote(&candidates, &weights, 0).unwrap();
        assert_eq!(v.date_source, StructuredMetadata);
    }

    #[test]
    fn test_resolve_fills_fields() {
        let candidate = ArticleCandidate {
            title: "Story".to_string(),
            url: "https://example.com/story".to_string(),
            date_candidates: vec![c("2025-01-20", ExplicitAttribute)],
        };
        let resolved = resolve(candidate, &SourceWeights::default(), 3);
        assert_eq!(resolved.publication_date, Some(day(20)));
        assert_eq!(resolved.date_score, Some(5));
        assert_eq!(resolved.date_source, Some(ExplicitAttribute));
    }
}
