use crate::PnError;

/// Floating point type used for supply levels, demands and capacities.
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, PnError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(PnError::NonFinite { what, value: v })
    }
}

/// Finite and strictly positive, e.g. a source's nominal level.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, PnError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(PnError::InvalidArg { what })
    }
}

/// Finite and not negative, e.g. a breaker rating or a load demand.
pub fn ensure_non_negative(v: Real, what: &'static str) -> Result<Real, PnError> {
    let v = ensure_finite(v, what)?;
    if v >= 0.0 {
        Ok(v)
    } else {
        Err(PnError::InvalidArg { what })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn positive_and_non_negative() {
        assert!(ensure_positive(28.0, "level").is_ok());
        assert!(ensure_positive(0.0, "level").is_err());
        assert!(ensure_non_negative(0.0, "demand").is_ok());
        assert!(ensure_non_negative(-1.0, "demand").is_err());
        assert!(ensure_non_negative(Real::INFINITY, "demand").is_err());
    }
}
