use crate::models::Levels;
use serde::Serialize;

/// Visual bucket of a grid cell, ordered from no activity to saturation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Empty,
    Low,
    Medium,
    High,
    Max,
}

impl Tier {
    pub fn css_class(self) -> &'static str {
        match self {
            Tier::Empty => "bg-empty",
            Tier::Low => "bg-green-900",
            Tier::Medium => "bg-green-700",
            Tier::High => "bg-green-500",
            Tier::Max => "bg-green-300",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Intensity {
    pub tier: Tier,
    /// Continuous shade in `[0, 1]` for gradient rendering.
    pub level: f64,
}

impl Intensity {
    pub const EMPTY: Intensity = Intensity {
        tier: Tier::Empty,
        level: 0.0,
    };
}

pub fn classify(value: u64, levels: &Levels) -> Intensity {
    if value == 0 {
        return Intensity::EMPTY;
    }
    let (tier, level) = if value <= levels.low {
        (Tier::Low, band(value, 0, levels.low, 0.0))
    } else if value <= levels.medium {
        (Tier::Medium, band(value, levels.low, levels.medium, 0.25))
    } else if value <= levels.high {
        (Tier::High, band(value, levels.medium, levels.high, 0.5))
    } else {
        let overshoot = if levels.high == 0 {
            1.0
        } else {
            ((value - levels.high) as f64 / levels.high as f64).min(1.0)
        };
        (Tier::Max, 0.75 + overshoot * 0.25)
    };
    Intensity { tier, level }
}

/// Future days are drawn empty whatever was logged for them.
pub fn classify_cell(value: u64, is_future: bool, levels: &Levels) -> Intensity {
    if is_future {
        Intensity::EMPTY
    } else {
        classify(value, levels)
    }
}

/// Position of `value` inside `(from, to]`, mapped onto a quarter-wide band
/// starting at `base`. A zero-width band saturates to its top.
fn band(value: u64, from: u64, to: u64, base: f64) -> f64 {
    if to <= from {
        return base + 0.25;
    }
    let fraction = value.saturating_sub(from) as f64 / (to - from) as f64;
    base + fraction.clamp(0.0, 1.0) * 0.25
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: Levels = Levels {
        low: 30,
        medium: 60,
        high: 120,
    };

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn medium_value_interpolates_inside_band() {
        let result = classify(45, &LEVELS);
        assert_eq!(result.tier, Tier::Medium);
        assert!(approx(result.level, 0.375), "got {}", result.level);
    }

    #[test]
    fn band_edges_are_inclusive_on_top() {
        assert_eq!(classify(0, &LEVELS), Intensity::EMPTY);
        assert_eq!(classify(30, &LEVELS).tier, Tier::Low);
        assert!(approx(classify(30, &LEVELS).level, 0.25));
        assert_eq!(classify(31, &LEVELS).tier, Tier::Medium);
        assert!(approx(classify(60, &LEVELS).level, 0.5));
        assert_eq!(classify(120, &LEVELS).tier, Tier::High);
        assert!(approx(classify(120, &LEVELS).level, 0.75));
        assert_eq!(classify(121, &LEVELS).tier, Tier::Max);
    }

    #[test]
    fn max_tier_saturates_at_one() {
        assert!(approx(classify(180, &LEVELS).level, 0.875));
        assert!(approx(classify(240, &LEVELS).level, 1.0));
        assert!(approx(classify(10_000, &LEVELS).level, 1.0));
    }

    #[test]
    fn tiers_never_decrease_with_value() {
        let cases = [
            LEVELS,
            Levels { low: 1, medium: 2, high: 3 },
            Levels { low: 0, medium: 0, high: 0 },
            Levels { low: 10, medium: 10, high: 5 },
        ];
        for levels in cases {
            let mut previous = Intensity::EMPTY;
            for value in 0..400 {
                let current = classify(value, &levels);
                assert!(current.tier >= previous.tier, "{levels:?} at {value}");
                assert!((0.0..=1.0).contains(&current.level));
                previous = current;
            }
        }
    }

    #[test]
    fn degenerate_levels_do_not_divide_by_zero() {
        let zero = Levels { low: 0, medium: 0, high: 0 };
        let result = classify(5, &zero);
        assert_eq!(result.tier, Tier::Max);
        assert!(approx(result.level, 1.0));
    }

    #[test]
    fn future_cells_render_empty() {
        assert_eq!(classify_cell(90, true, &LEVELS), Intensity::EMPTY);
        assert_eq!(classify_cell(90, false, &LEVELS).tier, Tier::High);
    }
}
