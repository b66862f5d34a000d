//! Statistical rejection of implausible dates within one extracted batch.
//!
//! A listing page shows items from a fairly narrow date range; a date far
//! outside the batch's bulk (a copyright year, a birth date in a teaser) is
//! almost always a misparse. The plausible range is the low/high percentile
//! of the batch's dates widened by a margin, with the upper end never past
//! today.

use crate::models::ResolvedArticle;
use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

/// Bounds of the plausible-date range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierBounds {
    pub low_percentile: f64,
    pub high_percentile: f64,
    pub margin_days: i64,
}

impl Default for OutlierBounds {
    fn default() -> Self {
        Self {
            low_percentile: 5.0,
            high_percentile: 95.0,
            margin_days: 5,
        }
    }
}

/// Split `articles` into `(inliers, outliers)`.
///
/// Items without a date are always inliers. When no item has a date there is
/// nothing to compare against and the whole batch is returned as inliers.
pub fn filter_outliers(
    articles: Vec<ResolvedArticle>,
    bounds: &OutlierBounds,
    today: NaiveDate,
) -> (Vec<ResolvedArticle>, Vec<ResolvedArticle>) {
    let Some((low, high)) = plausible_range(&articles, bounds, today) else {
        return (articles, Vec::new());
    };

    let (inliers, outliers): (Vec<_>, Vec<_>) = articles.into_iter().partition(|a| match a.publication_date {
        Some(date) => date >= low && date <= high,
        None => true,
    });

    for outlier in &outliers {
        debug!(
            url = %outlier.url,
            date = ?outlier.publication_date,
            %low,
            %high,
            "Rejected date outlier"
        );
    }
    (inliers, outliers)
}

/// The inclusive `[low, high]` range for a batch, or `None` without dated items.
pub fn plausible_range(
    articles: &[ResolvedArticle],
    bounds: &OutlierBounds,
    today: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    let mut days: Vec<i32> = articles
        .iter()
        .filter_map(|a| a.publication_date)
        .map(|d| d.num_days_from_ce())
        .collect();
    if days.is_empty() {
        return None;
    }
    days.sort_unstable();

    let low = percentile(&days, bounds.low_percentile).floor() as i32;
    let high = percentile(&days, bounds.high_percentile).ceil() as i32;
    let low = NaiveDate::from_num_days_from_ce_opt(low)?;
    let high = NaiveDate::from_num_days_from_ce_opt(high)?.min(today);

    let margin = Duration::try_days(bounds.margin_days);
    Some((
        margin.and_then(|m| low.checked_sub_signed(m)).unwrap_or(NaiveDate::MIN),
        margin.and_then(|m| high.checked_add_signed(m)).unwrap_or(NaiveDate::MAX),
    ))
}

/// Linear-interpolated percentile of sorted values.
fn percentile(sorted: &[i32], p: f64) -> f64 {
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
}
