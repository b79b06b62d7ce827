//! Weekly league tiers
//!
//! The league table itself is maintained outside the submission path; the
//! core only reads it and knows how a percentile maps to a tier.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LeagueTier {
    Bronze,
    Silver,
    Gold,
    Diamond,
    Apex,
}

impl LeagueTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeagueTier::Bronze => "Bronze",
            LeagueTier::Silver => "Silver",
            LeagueTier::Gold => "Gold",
            LeagueTier::Diamond => "Diamond",
            LeagueTier::Apex => "Apex",
        }
    }
}

pub fn tier_for_percentile(percentile: f64) -> LeagueTier {
    if percentile >= 99.0 {
        LeagueTier::Apex
    } else if percentile >= 95.0 {
        LeagueTier::Diamond
    } else if percentile >= 80.0 {
        LeagueTier::Gold
    } else if percentile >= 60.0 {
        LeagueTier::Silver
    } else {
        LeagueTier::Bronze
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds() {
        assert_eq!(tier_for_percentile(99.0), LeagueTier::Apex);
        assert_eq!(tier_for_percentile(97.5), LeagueTier::Diamond);
        assert_eq!(tier_for_percentile(80.0), LeagueTier::Gold);
        assert_eq!(tier_for_percentile(60.0), LeagueTier::Silver);
        assert_eq!(tier_for_percentile(59.9), LeagueTier::Bronze);
        assert_eq!(tier_for_percentile(0.0), LeagueTier::Bronze);
    }
}
