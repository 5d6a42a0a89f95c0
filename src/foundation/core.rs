use std::ops::{Add, Sub};

pub use kurbo::{Point, Vec2};

/// Milliseconds on the scheduler's virtual clock.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Millis(pub u64);

impl Millis {
    pub const ZERO: Self = Self(0);

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }

    /// `self - other`, or zero when `other` is later.
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Add for Millis {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl Sub for Millis {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl std::fmt::Display for Millis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Shorthand constructor used throughout choreography definitions.
pub const fn ms(v: u64) -> Millis {
    Millis(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtraction_saturates_at_zero() {
        assert_eq!(ms(5) - ms(9), Millis::ZERO);
        assert_eq!(ms(9) - ms(5), ms(4));
    }

    #[test]
    fn serializes_as_bare_number() {
        assert_eq!(serde_json::to_string(&ms(1800)).unwrap(), "1800");
        let back: Millis = serde_json::from_str("400").unwrap();
        assert_eq!(back, ms(400));
    }
}
