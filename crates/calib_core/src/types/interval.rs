//! Closed intervals used as calibration domain and range.
//!
//! An [`Interval`] can only be built through the domain/range guard, so a
//! value of this type is always finite and strictly ascending.

use super::error::CalibrationError;
use std::fmt;

/// Default domain of a calibration function (raw channel units).
pub const DEFAULT_DOMAIN: (f64, f64) = (0.0, 1e5);

/// Default range of a calibration function (physical units).
pub const DEFAULT_RANGE: (f64, f64) = (0.0, 1e5);

/// Which interval a guard failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalKind {
    /// Valid input interval of a function.
    Domain,
    /// Output interval of a function.
    Range,
    /// Interval with no calibration role (e.g. a deserialised value).
    Bounds,
}

impl fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalKind::Domain => write!(f, "Domain"),
            IntervalKind::Range => write!(f, "Range"),
            IntervalKind::Bounds => write!(f, "Interval"),
        }
    }
}

/// Finite, strictly ascending closed interval `[lo, hi]`.
///
/// # Example
///
/// ```
/// use calib_core::types::Interval;
///
/// let domain = Interval::domain(0.0, 10.0).unwrap();
/// assert!(domain.contains(10.0));
/// assert_eq!(domain.clamp(12.0), 10.0);
///
/// assert!(Interval::domain(1.0, 1.0).is_err());
/// assert!(Interval::range(0.0, f64::INFINITY).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "[f64; 2]", into = "[f64; 2]")
)]
pub struct Interval {
    lo: f64,
    hi: f64,
}

impl Interval {
    /// Validate `(lo, hi)` as the named interval.
    pub fn new(which: IntervalKind, lo: f64, hi: f64) -> Result<Self, CalibrationError> {
        if !lo.is_finite() || !hi.is_finite() {
            return Err(CalibrationError::IntervalNotFinite { which, lo, hi });
        }
        if hi <= lo {
            return Err(CalibrationError::IntervalNotAscending { which, lo, hi });
        }
        Ok(Self { lo, hi })
    }

    /// Validate `(lo, hi)` as a domain.
    pub fn domain(lo: f64, hi: f64) -> Result<Self, CalibrationError> {
        Self::new(IntervalKind::Domain, lo, hi)
    }

    /// Validate `(lo, hi)` as a range.
    pub fn range(lo: f64, hi: f64) -> Result<Self, CalibrationError> {
        Self::new(IntervalKind::Range, lo, hi)
    }

    /// Validate an arbitrary-length slice; it must hold exactly two values.
    pub fn from_slice(which: IntervalKind, values: &[f64]) -> Result<Self, CalibrationError> {
        match values {
            [lo, hi] => Self::new(which, *lo, *hi),
            _ => Err(CalibrationError::IntervalShape {
                which,
                len: values.len(),
            }),
        }
    }

    /// The default calibration domain `(0, 1e5)`.
    pub fn default_domain() -> Self {
        Self {
            lo: DEFAULT_DOMAIN.0,
            hi: DEFAULT_DOMAIN.1,
        }
    }

    /// The default calibration range `(0, 1e5)`.
    pub fn default_range() -> Self {
        Self {
            lo: DEFAULT_RANGE.0,
            hi: DEFAULT_RANGE.1,
        }
    }

    /// Lower bound.
    #[inline]
    pub fn lo(&self) -> f64 {
        self.lo
    }

    /// Upper bound.
    #[inline]
    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// Both bounds as a pair.
    #[inline]
    pub fn bounds(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    /// Whether `x` lies in the closed interval. NaN is never contained.
    #[inline]
    pub fn contains(&self, x: f64) -> bool {
        self.lo <= x && x <= self.hi
    }

    /// Clamp `x` into the interval. Infinite values clamp to the bounds.
    #[inline]
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.lo, self.hi)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lo, self.hi)
    }
}

impl TryFrom<[f64; 2]> for Interval {
    type Error = CalibrationError;

    fn try_from(value: [f64; 2]) -> Result<Self, Self::Error> {
        Interval::new(IntervalKind::Bounds, value[0], value[1])
    }
}

impl From<Interval> for [f64; 2] {
    fn from(value: Interval) -> Self {
        [value.lo, value.hi]
    }
}

/// Domain/range guard.
///
/// Validates two candidate intervals given as raw slices. Each must hold
/// exactly two finite values in strictly ascending order. The domain is
/// checked first; the error names the interval and the failed check.
///
/// # Example
///
/// ```
/// use calib_core::types::validate_domain_range;
///
/// let (domain, range) = validate_domain_range(&[0.0, 100.0], &[0.0, 3000.0]).unwrap();
/// assert_eq!(domain.hi(), 100.0);
/// assert_eq!(range.hi(), 3000.0);
///
/// let err = validate_domain_range(&[0.0, 1.0, 2.0], &[0.0, 1.0]).unwrap_err();
/// assert!(err.to_string().contains("Domain"));
/// ```
pub fn validate_domain_range(
    domain: &[f64],
    range: &[f64],
) -> Result<(Interval, Interval), CalibrationError> {
    let domain = Interval::from_slice(IntervalKind::Domain, domain)?;
    let range = Interval::from_slice(IntervalKind::Range, range)?;
    Ok((domain, range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_interval() {
        let i = Interval::domain(-1.0, 2.0).unwrap();
        assert_eq!(i.bounds(), (-1.0, 2.0));
        assert!(i.contains(-1.0));
        assert!(i.contains(2.0));
        assert!(!i.contains(2.0000001));
        assert!(!i.contains(f64::NAN));
    }

    #[test]
    fn test_non_finite_rejected() {
        for (lo, hi) in [(f64::NAN, 1.0), (0.0, f64::INFINITY), (f64::NEG_INFINITY, 0.0)] {
            let err = Interval::range(lo, hi).unwrap_err();
            assert!(matches!(
                err,
                CalibrationError::IntervalNotFinite {
                    which: IntervalKind::Range,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_not_ascending_rejected() {
        let err = Interval::domain(3.0, 3.0).unwrap_err();
        assert!(matches!(err, CalibrationError::IntervalNotAscending { .. }));
        let err = Interval::domain(3.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("ascending"));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = Interval::from_slice(IntervalKind::Domain, &[1.0]).unwrap_err();
        assert_eq!(
            err,
            CalibrationError::IntervalShape {
                which: IntervalKind::Domain,
                len: 1
            }
        );
        assert!(Interval::from_slice(IntervalKind::Range, &[]).is_err());
    }

    #[test]
    fn test_guard_checks_both() {
        let err = validate_domain_range(&[0.0, 1.0], &[2.0, 1.0]).unwrap_err();
        assert!(err.to_string().starts_with("Range"));
        assert!(validate_domain_range(&[0.0, 1.0], &[0.0, 1.0]).is_ok());
    }

    #[test]
    fn test_clamp() {
        let i = Interval::range(0.0, 10.0).unwrap();
        assert_eq!(i.clamp(-3.0), 0.0);
        assert_eq!(i.clamp(f64::INFINITY), 10.0);
        assert_eq!(i.clamp(4.5), 4.5);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Interval::default_domain().bounds(), DEFAULT_DOMAIN);
        assert_eq!(Interval::default_range().bounds(), DEFAULT_RANGE);
    }

    #[test]
    fn test_array_conversion() {
        let i = Interval::try_from([1.0, 2.0]).unwrap();
        let arr: [f64; 2] = i.into();
        assert_eq!(arr, [1.0, 2.0]);
        assert!(Interval::try_from([2.0, 1.0]).is_err());
    }
}
