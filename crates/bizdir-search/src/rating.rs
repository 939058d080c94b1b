//! Average rating per business, computed from eagerly loaded rating events.

use bizdir_core::{BusinessRecord, ModerationStatus, RatingEvent};
use serde::Serialize;

const MIN_RATING: i16 = 1;
const MAX_RATING: i16 = 5;

/// Which rating events count toward the average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatingPolicy {
    /// Approved events, plus events that predate moderation.
    #[default]
    ApprovedOnly,
    /// Every event regardless of moderation status.
    CountAll,
}

impl RatingPolicy {
    #[must_use]
    pub fn from_approved_only(approved_only: bool) -> Self {
        if approved_only {
            RatingPolicy::ApprovedOnly
        } else {
            RatingPolicy::CountAll
        }
    }

    fn admits(self, event: &RatingEvent) -> bool {
        if !(MIN_RATING..=MAX_RATING).contains(&event.rating) {
            return false;
        }
        match self {
            RatingPolicy::CountAll => true,
            RatingPolicy::ApprovedOnly => matches!(
                event.moderation,
                None | Some(ModerationStatus::Approved)
            ),
        }
    }
}

/// Serializes as `{ "average", "rounded", "count" }` so API clients get the
/// one-decimal display value without recomputing it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(into = "RatingView")]
pub struct RatingSummary {
    /// Full-precision mean in `[0, 5]`; 0 when `count` is 0.
    pub average: f64,
    pub count: u32,
}

#[derive(Serialize)]
struct RatingView {
    average: f64,
    rounded: f64,
    count: u32,
}

impl From<RatingSummary> for RatingView {
    fn from(summary: RatingSummary) -> Self {
        Self {
            average: summary.average,
            rounded: summary.rounded_average(),
            count: summary.count,
        }
    }
}

impl RatingSummary {
    /// Mean rounded to one decimal place for display.
    #[must_use]
    pub fn rounded_average(&self) -> f64 {
        (self.average * 10.0).round() / 10.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RatingAggregator {
    policy: RatingPolicy,
}

impl RatingAggregator {
    #[must_use]
    pub fn new(policy: RatingPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> RatingPolicy {
        self.policy
    }

    #[must_use]
    pub fn summarize(&self, business: &BusinessRecord) -> RatingSummary {
        self.summarize_events(&business.ratings)
    }

    #[must_use]
    pub fn summarize_events(&self, events: &[RatingEvent]) -> RatingSummary {
        let (sum, count) = events
            .iter()
            .filter(|event| self.policy.admits(event))
            .fold((0_i64, 0_u32), |(sum, count), event| {
                (sum + i64::from(event.rating), count + 1)
            });

        if count == 0 {
            return RatingSummary::default();
        }

        #[allow(clippy::cast_precision_loss)]
        let average = sum as f64 / f64::from(count);
        RatingSummary { average, count }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn event(rating: i16, moderation: Option<ModerationStatus>) -> RatingEvent {
        RatingEvent {
            rating,
            content: None,
            moderation,
            created_at: Utc::now(),
        }
    }

    fn approved(ratings: &[i16]) -> Vec<RatingEvent> {
        ratings
            .iter()
            .map(|r| event(*r, Some(ModerationStatus::Approved)))
            .collect()
    }

    #[test]
    fn no_events_is_zero() {
        let summary = RatingAggregator::default().summarize_events(&[]);
        assert_eq!(summary.count, 0);
        assert!(summary.average.abs() < f64::EPSILON);
    }

    #[test]
    fn mean_of_five_four_three() {
        let summary = RatingAggregator::default().summarize_events(&approved(&[5, 4, 3]));
        assert_eq!(summary.count, 3);
        assert!((summary.average - 4.0).abs() < 1e-9);
    }

    #[test]
    fn rounding_is_display_only() {
        let summary = RatingAggregator::default().summarize_events(&approved(&[5, 4, 4]));
        assert!((summary.average - 13.0 / 3.0).abs() < 1e-12);
        assert!((summary.rounded_average() - 4.3).abs() < 1e-9);
    }

    #[test]
    fn serializes_rounded_alongside_full_average() {
        let summary = RatingAggregator::default().summarize_events(&approved(&[5, 4, 4]));
        let json = serde_json::to_value(summary).unwrap();

        assert_eq!(json["rounded"].as_f64(), Some(4.3));
        assert_eq!(json["count"].as_u64(), Some(3));
        assert!((json["average"].as_f64().unwrap() - 13.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_summary_serializes_zero_rounded() {
        let json = serde_json::to_value(RatingSummary::default()).unwrap();
        assert_eq!(json["rounded"].as_f64(), Some(0.0));
        assert_eq!(json["count"].as_u64(), Some(0));
    }

    #[test]
    fn approved_only_skips_pending_and_rejected() {
        let events = vec![
            event(5, Some(ModerationStatus::Approved)),
            event(1, Some(ModerationStatus::Rejected)),
            event(1, Some(ModerationStatus::Pending)),
            event(3, None),
        ];
        let summary = RatingAggregator::new(RatingPolicy::ApprovedOnly).summarize_events(&events);
        assert_eq!(summary.count, 2);
        assert!((summary.average - 4.0).abs() < 1e-9);
    }

    #[test]
    fn count_all_includes_every_event() {
        let events = vec![
            event(5, Some(ModerationStatus::Approved)),
            event(1, Some(ModerationStatus::Rejected)),
        ];
        let summary = RatingAggregator::new(RatingPolicy::CountAll).summarize_events(&events);
        assert_eq!(summary.count, 2);
        assert!((summary.average - 3.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_ratings_are_ignored() {
        let events = approved(&[0, 6, -2, 4]);
        let summary = RatingAggregator::new(RatingPolicy::CountAll).summarize_events(&events);
        assert_eq!(summary.count, 1);
        assert!((summary.average - 4.0).abs() < 1e-9);
    }

    #[test]
    fn policy_flag_maps_to_variant() {
        assert_eq!(RatingPolicy::from_approved_only(true), RatingPolicy::ApprovedOnly);
        assert_eq!(RatingPolicy::from_approved_only(false), RatingPolicy::CountAll);
    }
}
