//! Scalar values with an attached uncertainty.
//!
//! `PhysicalValue { value, error }` propagates errors assuming independent
//! operands: absolute errors add in quadrature for `+`/`-`, relative errors add
//! in quadrature for `*`/`/`. Scaling by a plain `f64` scales the error linearly.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A value with its (one standard deviation) uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhysicalValue {
    /// Central value.
    pub value: f64,
    /// Absolute uncertainty (non-negative).
    pub error: f64,
}

impl PhysicalValue {
    /// Zero with zero error.
    pub const ZERO: PhysicalValue = PhysicalValue { value: 0.0, error: 0.0 };

    /// Create a value with an explicit error.
    #[inline]
    pub fn new(value: f64, error: f64) -> Self {
        Self { value, error: error.abs() }
    }

    /// Create a value known exactly (zero error).
    #[inline]
    pub fn exact(value: f64) -> Self {
        Self { value, error: 0.0 }
    }

    /// Relative uncertainty `error / |value|`; infinite for a zero value with non-zero error.
    #[inline]
    pub fn relative_error(&self) -> f64 {
        if self.value == 0.0 {
            if self.error == 0.0 { 0.0 } else { f64::INFINITY }
        } else {
            self.error / self.value.abs()
        }
    }

    /// Scale value and error by a constant.
    #[inline]
    pub fn scale(self, k: f64) -> Self {
        Self { value: self.value * k, error: self.error * k.abs() }
    }

    /// Division that refuses a zero-valued denominator.
    #[inline]
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.value == 0.0 { None } else { Some(self / rhs) }
    }

    /// Whether both value and error are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.error.is_finite()
    }
}

// --- Arithmetic: PhysicalValue op PhysicalValue ---

impl Add for PhysicalValue {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self { value: self.value + rhs.value, error: self.error.hypot(rhs.error) }
    }
}

impl Sub for PhysicalValue {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self { value: self.value - rhs.value, error: self.error.hypot(rhs.error) }
    }
}

impl Mul for PhysicalValue {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        // sigma(ab)^2 = (b sigma_a)^2 + (a sigma_b)^2; stays finite when either value is 0.
        let error = (rhs.value * self.error).hypot(self.value * rhs.error);
        Self { value: self.value * rhs.value, error }
    }
}

impl Div for PhysicalValue {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let value = self.value / rhs.value;
        let error = (self.error / rhs.value).hypot(value * rhs.error / rhs.value);
        Self { value, error: error.abs() }
    }
}

impl Neg for PhysicalValue {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self { value: -self.value, error: self.error }
    }
}

// --- Arithmetic: PhysicalValue op f64 ---

impl Mul<f64> for PhysicalValue {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        self.scale(rhs)
    }
}

impl Div<f64> for PhysicalValue {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f64) -> Self {
        self.scale(1.0 / rhs)
    }
}

// --- Sum ---

impl Sum for PhysicalValue {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(PhysicalValue::ZERO, |acc, x| acc + x)
    }
}

impl From<f64> for PhysicalValue {
    fn from(value: f64) -> Self {
        Self::exact(value)
    }
}

// --- PartialOrd (by value, ties broken by error to agree with PartialEq) ---

impl PartialOrd for PhysicalValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match self.value.partial_cmp(&other.value)? {
            std::cmp::Ordering::Equal => self.error.partial_cmp(&other.error),
            ord => Some(ord),
        }
    }
}

impl fmt::Display for PhysicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.*} ± {:.*}", p, self.value, p, self.error),
            None => write!(f, "{} ± {}", self.value, self.error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_add_errors_in_quadrature() {
        let a = PhysicalValue::new(10.0, 3.0);
        let b = PhysicalValue::new(5.0, 4.0);
        let c = a + b;
        assert_relative_eq!(c.value, 15.0, epsilon = 1e-12);
        assert_relative_eq!(c.error, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sub_errors_in_quadrature() {
        let c = PhysicalValue::new(10.0, 3.0) - PhysicalValue::new(5.0, 4.0);
        assert_relative_eq!(c.value, 5.0, epsilon = 1e-12);
        assert_relative_eq!(c.error, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mul_relative_errors_in_quadrature() {
        let a = PhysicalValue::new(10.0, 1.0);
        let b = PhysicalValue::new(4.0, 0.4);
        let c = a * b;
        assert_relative_eq!(c.value, 40.0, epsilon = 1e-12);
        assert_relative_eq!(c.relative_error(), (0.1f64.powi(2) * 2.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_div_relative_errors_in_quadrature() {
        let a = PhysicalValue::new(50.0, 7.0);
        let b = PhysicalValue::new(40.0, 6.0);
        let c = a / b;
        assert_relative_eq!(c.value, 1.25, epsilon = 1e-12);
        let rel = ((7.0f64 / 50.0).powi(2) + (6.0f64 / 40.0).powi(2)).sqrt();
        assert_relative_eq!(c.error, 1.25 * rel, epsilon = 1e-12);
    }

    #[test]
    fn test_add_then_sub_recovers_value() {
        let a = PhysicalValue::new(3.7, 0.2);
        let b = PhysicalValue::new(-12.5, 1.1);
        assert_relative_eq!(((a + b) - b).value, a.value, epsilon = 1e-12);
    }

    #[test]
    fn test_mul_then_div_recovers_value() {
        let a = PhysicalValue::new(3.7, 0.2);
        let b = PhysicalValue::new(-12.5, 1.1);
        assert_relative_eq!(((a * b) / b).value, a.value, epsilon = 1e-12);
    }

    #[test]
    fn test_scale_is_linear_in_error() {
        let a = PhysicalValue::new(2.0, 0.5).scale(-3.0);
        assert_relative_eq!(a.value, -6.0, epsilon = 1e-12);
        assert_relative_eq!(a.error, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_mul_by_exact_zero_keeps_finite_error() {
        let c = PhysicalValue::new(0.0, 2.0) * PhysicalValue::new(3.0, 1.0);
        assert_eq!(c.value, 0.0);
        assert_relative_eq!(c.error, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_checked_div_rejects_zero() {
        assert!(PhysicalValue::exact(1.0).checked_div(PhysicalValue::new(0.0, 1.0)).is_none());
        assert!(PhysicalValue::exact(1.0).checked_div(PhysicalValue::exact(2.0)).is_some());
    }

    #[test]
    fn test_sum_and_ordering() {
        let total: PhysicalValue =
            [PhysicalValue::new(1.0, 3.0), PhysicalValue::new(2.0, 4.0)].into_iter().sum();
        assert_relative_eq!(total.value, 3.0, epsilon = 1e-12);
        assert_relative_eq!(total.error, 5.0, epsilon = 1e-12);
        assert!(PhysicalValue::new(1.0, 100.0) < PhysicalValue::new(2.0, 0.0));
    }

    #[test]
    fn test_ordering_agrees_with_equality() {
        use std::cmp::Ordering;
        let a = PhysicalValue::new(5.0, 1.0);
        let b = PhysicalValue::new(5.0, 2.0);
        assert_ne!(a, b);
        assert_ne!(a.partial_cmp(&b), Some(Ordering::Equal));
        assert!(a < b);
        assert_eq!(a.partial_cmp(&a), Some(Ordering::Equal));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{:.2}", PhysicalValue::new(1.25, 0.256)), "1.25 ± 0.26");
    }
}
