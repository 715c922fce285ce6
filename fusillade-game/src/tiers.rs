//! Derived-tier ladders for morale, health and fatigue pools.
//!
//! Each ladder is a total, pure function of a pool ratio: every ratio in
//! `[0, 1]` maps to exactly one tier, with boundaries closed on the upper
//! tier (a ratio of exactly 0.75 is still `Steady`). The tier enums order
//! best-first, so derived `Ord` compares favorability.
//!
//! Nothing here is reactive. Mutators own the responsibility of re-invoking
//! these functions after changing the underlying pool.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    FATIGUE_FATIGUED_RATIO, FATIGUE_FRESH_RATIO, FATIGUE_WINDED_RATIO, HEALTH_BRUISED_RATIO,
    HEALTH_UNHURT_RATIO, HEALTH_WOUNDED_RATIO, MORALE_SHAKEN_RATIO, MORALE_STEADY_RATIO,
    MORALE_WAVERING_RATIO,
};
use crate::numbers::pool_ratio;

/// Discrete morale classification derived from a morale pool ratio.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum MoraleThreshold {
    #[default]
    Steady,
    Shaken,
    Wavering,
    Breaking,
}

impl MoraleThreshold {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Steady => "steady",
            Self::Shaken => "shaken",
            Self::Wavering => "wavering",
            Self::Breaking => "breaking",
        }
    }
}

impl fmt::Display for MoraleThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete wound classification derived from a health pool ratio.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    #[default]
    Unhurt,
    Bruised,
    Wounded,
    Critical,
}

impl HealthState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unhurt => "unhurt",
            Self::Bruised => "bruised",
            Self::Wounded => "wounded",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete exhaustion classification derived from a stamina pool ratio.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum FatigueTier {
    #[default]
    Fresh,
    Winded,
    Fatigued,
    Exhausted,
}

impl FatigueTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Winded => "winded",
            Self::Fatigued => "fatigued",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for FatigueTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Morale tier from a raw ratio. Boundaries closed on the upper tier.
#[must_use]
pub fn morale_threshold_from_ratio(ratio: f64) -> MoraleThreshold {
    if ratio >= MORALE_STEADY_RATIO {
        MoraleThreshold::Steady
    } else if ratio >= MORALE_SHAKEN_RATIO {
        MoraleThreshold::Shaken
    } else if ratio >= MORALE_WAVERING_RATIO {
        MoraleThreshold::Wavering
    } else {
        MoraleThreshold::Breaking
    }
}

/// Health tier from a raw ratio. Boundaries closed on the upper tier.
#[must_use]
pub fn health_state_from_ratio(ratio: f64) -> HealthState {
    if ratio >= HEALTH_UNHURT_RATIO {
        HealthState::Unhurt
    } else if ratio >= HEALTH_BRUISED_RATIO {
        HealthState::Bruised
    } else if ratio >= HEALTH_WOUNDED_RATIO {
        HealthState::Wounded
    } else {
        HealthState::Critical
    }
}

/// Fatigue tier from a raw stamina ratio. High stamina means `Fresh`.
#[must_use]
pub fn fatigue_tier_from_ratio(ratio: f64) -> FatigueTier {
    if ratio >= FATIGUE_FRESH_RATIO {
        FatigueTier::Fresh
    } else if ratio >= FATIGUE_WINDED_RATIO {
        FatigueTier::Winded
    } else if ratio >= FATIGUE_FATIGUED_RATIO {
        FatigueTier::Fatigued
    } else {
        FatigueTier::Exhausted
    }
}

/// Morale tier for a `(value, max)` pool.
#[must_use]
pub fn morale_threshold(value: i32, max: i32) -> MoraleThreshold {
    morale_threshold_from_ratio(pool_ratio(value, max))
}

/// Health tier for a `(value, max)` pool.
#[must_use]
pub fn health_state(value: i32, max: i32) -> HealthState {
    health_state_from_ratio(pool_ratio(value, max))
}

/// Fatigue tier for a `(value, max)` stamina pool.
#[must_use]
pub fn fatigue_tier(value: i32, max: i32) -> FatigueTier {
    fatigue_tier_from_ratio(pool_ratio(value, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morale_boundaries_closed_on_upper_tier() {
        assert_eq!(morale_threshold_from_ratio(1.0), MoraleThreshold::Steady);
        assert_eq!(morale_threshold_from_ratio(0.75), MoraleThreshold::Steady);
        assert_eq!(
            morale_threshold_from_ratio(0.749_999),
            MoraleThreshold::Shaken
        );
        assert_eq!(morale_threshold_from_ratio(0.40), MoraleThreshold::Shaken);
        assert_eq!(
            morale_threshold_from_ratio(0.399_999),
            MoraleThreshold::Wavering
        );
        assert_eq!(morale_threshold_from_ratio(0.15), MoraleThreshold::Wavering);
        assert_eq!(
            morale_threshold_from_ratio(0.149_999),
            MoraleThreshold::Breaking
        );
        assert_eq!(morale_threshold_from_ratio(0.0), MoraleThreshold::Breaking);
    }

    #[test]
    fn ladders_are_total_and_monotone() {
        let mut steps = 0;
        let mut previous_morale = morale_threshold_from_ratio(1.0);
        let mut previous_health = health_state_from_ratio(1.0);
        let mut previous_fatigue = fatigue_tier_from_ratio(1.0);
        for i in (0..=10_000).rev() {
            let ratio = f64::from(i) / 10_000.0;
            let morale = morale_threshold_from_ratio(ratio);
            let health = health_state_from_ratio(ratio);
            let fatigue = fatigue_tier_from_ratio(ratio);
            assert!(morale >= previous_morale, "morale regressed at {ratio}");
            assert!(health >= previous_health, "health regressed at {ratio}");
            assert!(fatigue >= previous_fatigue, "fatigue regressed at {ratio}");
            previous_morale = morale;
            previous_health = health;
            previous_fatigue = fatigue;
            steps += 1;
        }
        assert_eq!(steps, 10_001);
    }

    #[test]
    fn tier_functions_are_idempotent() {
        for (value, max) in [(75, 100), (30, 100), (0, 100), (95, 95)] {
            assert_eq!(morale_threshold(value, max), morale_threshold(value, max));
            assert_eq!(health_state(value, max), health_state(value, max));
            assert_eq!(fatigue_tier(value, max), fatigue_tier(value, max));
        }
    }

    #[test]
    fn pool_wrappers_match_ratio_functions() {
        assert_eq!(morale_threshold(75, 100), MoraleThreshold::Steady);
        assert_eq!(morale_threshold(74, 100), MoraleThreshold::Shaken);
        assert_eq!(health_state(90, 100), HealthState::Unhurt);
        assert_eq!(health_state(89, 100), HealthState::Bruised);
        assert_eq!(fatigue_tier(70, 100), FatigueTier::Fresh);
        assert_eq!(fatigue_tier(0, 100), FatigueTier::Exhausted);
    }

    #[test]
    fn zero_capacity_maps_to_worst_tier() {
        assert_eq!(morale_threshold(10, 0), MoraleThreshold::Breaking);
        assert_eq!(health_state(10, 0), HealthState::Critical);
        assert_eq!(fatigue_tier(10, 0), FatigueTier::Exhausted);
    }
}
