//! Credibility rules computed from a report's vote counters.
//!
//! Every rule here is its own business rule with its own thresholds and is
//! used only where it is documented to be used. They disagree with each
//! other on purpose; do not fold them into one score.

use serde::Serialize;

pub const NO_VOTES: &str = "No votes yet";
pub const HIGHLY_SUSPICIOUS: &str = "Highly Suspicious";
pub const SUSPICIOUS: &str = "Suspicious";
pub const MIXED: &str = "Mixed";
pub const LIKELY_SAFE: &str = "Likely Safe";

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Credibility {
    pub ratio: f64,
    pub label: &'static str,
}

/// Four-tier label shown on every report card. First matching tier wins.
pub fn classify(upvotes: i32, downvotes: i32) -> Credibility {
    let total = upvotes + downvotes;
    if total == 0 {
        return Credibility {
            ratio: 0.0,
            label: NO_VOTES,
        };
    }

    let ratio = f64::from(upvotes) / f64::from(total);
    let label = if ratio >= 0.8 {
        HIGHLY_SUSPICIOUS
    } else if ratio >= 0.6 {
        SUSPICIOUS
    } else if ratio >= 0.4 {
        MIXED
    } else {
        LIKELY_SAFE
    };
    Credibility { ratio, label }
}

/// Admin badge: the community clearly disagrees with the report.
pub fn is_flagged(upvotes: i32, downvotes: i32) -> bool {
    downvotes > upvotes + 5
}

/// Overview and search statistics.
pub fn is_suspicious(upvotes: i32, downvotes: i32) -> bool {
    upvotes > downvotes
}

/// Detailed statistics only.
pub fn is_corroborated_suspicious(upvotes: i32, downvotes: i32) -> bool {
    upvotes > downvotes && upvotes > 2
}

/// Detailed statistics only. High-confidence report.
pub fn is_verified(upvotes: i32, downvotes: i32) -> bool {
    upvotes >= 5 && f64::from(upvotes) / f64::from(downvotes.max(1)) >= 3.0
}

/// Detailed statistics only.
pub fn is_false_report(upvotes: i32, downvotes: i32) -> bool {
    downvotes > upvotes && downvotes > 2
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredibilityTier {
    High,
    Medium,
    Low,
}

impl CredibilityTier {
    /// Analytics bucket. Returns `None` for reports that meet none of the
    /// three rules, e.g. 6 up / 4 down.
    pub fn of(upvotes: i32, downvotes: i32) -> Option<CredibilityTier> {
        if upvotes >= 5 && upvotes > downvotes * 2 {
            Some(CredibilityTier::High)
        } else if upvotes > downvotes && upvotes < 5 {
            Some(CredibilityTier::Medium)
        } else if upvotes <= downvotes {
            Some(CredibilityTier::Low)
        } else {
            None
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            CredibilityTier::High => "High Credibility",
            CredibilityTier::Medium => "Medium Credibility",
            CredibilityTier::Low => "Low Credibility",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_votes() {
        let c = classify(0, 0);
        assert_eq!(c.ratio, 0.0);
        assert_eq!(c.label, NO_VOTES);
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(classify(4, 1).label, HIGHLY_SUSPICIOUS);
        assert_eq!(classify(3, 2).label, SUSPICIOUS);
        assert_eq!(classify(2, 3).label, MIXED);
        assert_eq!(classify(1, 4).label, LIKELY_SAFE);
        assert_eq!(classify(1, 0).label, HIGHLY_SUSPICIOUS);
        assert_eq!(classify(0, 2).label, LIKELY_SAFE);
    }

    #[test]
    fn just_below_a_boundary_drops_a_tier() {
        // 79999 / 100000 = 0.79999
        let c = classify(79_999, 20_001);
        assert!(c.ratio < 0.8);
        assert_eq!(c.label, SUSPICIOUS);
        assert_eq!(classify(5_999, 4_001).label, MIXED);
        assert_eq!(classify(3_999, 6_001).label, LIKELY_SAFE);
    }

    #[test]
    fn flagged_needs_a_margin_of_six() {
        assert!(!is_flagged(0, 5));
        assert!(is_flagged(0, 6));
        assert!(!is_flagged(4, 9));
        assert!(is_flagged(4, 10));
    }

    #[test]
    fn suspicious_rules_differ() {
        assert!(is_suspicious(1, 0));
        assert!(!is_suspicious(1, 1));
        assert!(!is_corroborated_suspicious(2, 0));
        assert!(is_corroborated_suspicious(3, 0));
    }

    #[test]
    fn verified_uses_ratio_against_at_least_one() {
        assert!(is_verified(5, 0));
        assert!(is_verified(6, 2));
        assert!(!is_verified(6, 3));
        assert!(!is_verified(4, 0));
    }

    #[test]
    fn false_report() {
        assert!(!is_false_report(0, 2));
        assert!(is_false_report(0, 3));
        assert!(!is_false_report(3, 3));
    }

    #[test]
    fn flagged_and_four_tier_label_can_disagree() {
        // 3 up / 8 down is not "flagged" yet is labelled Likely Safe.
        assert!(!is_flagged(3, 8));
        assert_eq!(classify(3, 8).label, LIKELY_SAFE);
    }

    #[test]
    fn analytics_tiers() {
        assert_eq!(CredibilityTier::of(5, 2), Some(CredibilityTier::High));
        assert_eq!(CredibilityTier::of(4, 1), Some(CredibilityTier::Medium));
        assert_eq!(CredibilityTier::of(2, 2), Some(CredibilityTier::Low));
        assert_eq!(CredibilityTier::of(0, 0), Some(CredibilityTier::Low));
        assert_eq!(CredibilityTier::of(6, 4), None);
    }
}
