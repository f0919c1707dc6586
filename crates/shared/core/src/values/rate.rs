use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock pacing ratio ("drag")
///
/// The factor is the wall-clock time spent per unit of simulated time:
/// - `1.0` runs in real time
/// - `(0, 1)` runs faster than real time
/// - `> 1.0` runs slower than real time
/// - anything else (zero, negative, NaN, infinite) means unconstrained,
///   i.e. simulated time jumps as fast as events allow
///
/// Construction never fails; illegal input normalizes to unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Rate(f64);

impl Rate {
    pub const UNCONSTRAINED: Rate = Rate(0.0);
    pub const REAL_TIME: Rate = Rate(1.0);

    pub fn new(factor: f64) -> Self {
        if factor.is_finite() && factor > 0.0 {
            Self(factor)
        } else {
            Self::UNCONSTRAINED
        }
    }

    pub fn factor(&self) -> f64 {
        self.0
    }

    pub fn is_unconstrained(&self) -> bool {
        self.0 <= 0.0
    }

    /// Pacing factor of an optional rate, `None` when unconstrained
    pub fn effective(rate: Option<Rate>) -> Option<f64> {
        rate.filter(|r| !r.is_unconstrained()).map(|r| r.0)
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self::UNCONSTRAINED
    }
}

impl From<f64> for Rate {
    fn from(factor: f64) -> Self {
        Self::new(factor)
    }
}

impl From<Rate> for f64 {
    fn from(rate: Rate) -> Self {
        rate.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unconstrained() {
            write!(f, "unconstrained")
        } else {
            write!(f, "x{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_input_is_unconstrained() {
        assert!(Rate::new(f64::NAN).is_unconstrained());
        assert!(Rate::new(-2.0).is_unconstrained());
        assert!(Rate::new(0.0).is_unconstrained());
        assert!(Rate::new(f64::INFINITY).is_unconstrained());
        assert_eq!(Rate::new(f64::NAN), Rate::UNCONSTRAINED);
    }

    #[test]
    fn test_effective_factor() {
        assert_eq!(Rate::effective(None), None);
        assert_eq!(Rate::effective(Some(Rate::new(-1.0))), None);
        assert_eq!(Rate::effective(Some(Rate::REAL_TIME)), Some(1.0));
        assert_eq!(Rate::effective(Some(Rate::new(0.25))), Some(0.25));
    }

    #[test]
    fn test_serde_normalizes() {
        let rate: Rate = serde_json::from_str("-3.5").unwrap();
        assert!(rate.is_unconstrained());
        let json = serde_json::to_string(&Rate::new(2.0)).unwrap();
        assert_eq!(json, "2.0");
    }
}
