//! Binds each supported element type to its fixed-point magnitude width, per
//! spec's "Fixed-point type selection": 64-bit magnitude for `f64`, 32-bit for
//! `f32`. Also provides the `frexp`-style mantissa/exponent split used to turn
//! a level's error bound into its scalar exponent `E`.

/// Sealed trait: the only supported element types are `f32` and `f64`.
pub trait FloatWord: Copy + PartialOrd + Send + Sync + 'static {
    /// Number of bits available to the fixed-point magnitude (32 for `f32`,
    /// 64 for `f64`). `num_bitplanes` must not exceed this.
    const FIXED_WIDTH: u32;

    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
    fn abs(self) -> Self;
    fn is_sign_negative(self) -> bool;
    fn zero() -> Self;
}

impl FloatWord for f32 {
    const FIXED_WIDTH: u32 = 32;

    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as f32
    }
    fn abs(self) -> Self {
        f32::abs(self)
    }
    fn is_sign_negative(self) -> bool {
        f32::is_sign_negative(self)
    }
    fn zero() -> Self {
        0.0
    }
}

impl FloatWord for f64 {
    const FIXED_WIDTH: u32 = 64;

    fn to_f64(self) -> f64 {
        self
    }
    fn from_f64(v: f64) -> Self {
        v
    }
    fn abs(self) -> Self {
        f64::abs(self)
    }
    fn is_sign_negative(self) -> bool {
        f64::is_sign_negative(self)
    }
    fn zero() -> Self {
        0.0
    }
}

/// `frexp`-style exponent: the integer `e` such that `x == m * 2^e` with
/// `m` in `[0.5, 1)`, matching C's `frexp`. Returns `0` for `x == 0`.
///
/// Implemented via bit manipulation rather than `libm` so the crate stays on
/// pure std + the teacher's dependency stack.
pub fn frexp_exp(x: f64) -> i32 {
    if x == 0.0 || !x.is_finite() {
        return 0;
    }
    let bits = x.to_bits();
    let biased_exp = ((bits >> 52) & 0x7ff) as i32;
    if biased_exp == 0 {
        // Subnormal: normalize by counting leading zeros of the mantissa.
        let mantissa = bits & 0x000f_ffff_ffff_ffff;
        let shift = mantissa.leading_zeros() - 12; // 64 - 52 offset to mantissa field
        (biased_exp - 1022) - shift as i32
    } else {
        biased_exp - 1022
    }
}

/// `E_ℓ = ⌊log₂ B_ℓ⌋ + 1`, computed as the `frexp` exponent of `B_ℓ` (the two
/// definitions coincide for `B_ℓ > 0`; spec §3).
pub fn level_exponent(max_abs: f64) -> i32 {
    frexp_exp(max_abs)
}

/// `ldexp(x, exp) = x * 2^exp`, used for both the forward shift into
/// fixed-point and the inverse shift back into floating-point.
pub fn ldexp(x: f64, exp: i32) -> f64 {
    x * 2f64.powi(exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frexp_matches_known_values() {
        assert_eq!(frexp_exp(0.0), 0);
        assert_eq!(frexp_exp(1.0), 1); // 1.0 == 0.5 * 2^1
        assert_eq!(frexp_exp(1.5), 1);
        assert_eq!(frexp_exp(0.5), 0); // 0.5 == 0.5 * 2^0
        assert_eq!(frexp_exp(4.0), 3); // 4.0 == 0.5 * 2^3
        assert_eq!(frexp_exp(-4.0), 3);
    }

    #[test]
    fn ldexp_is_exact_for_power_of_two_shifts() {
        assert_eq!(ldexp(3.0, 4), 48.0);
        assert_eq!(ldexp(48.0, -4), 3.0);
    }

    #[test]
    fn frexp_handles_subnormals() {
        assert_eq!(frexp_exp(f64::from_bits(1)), -1073); // smallest subnormal, 2^-1074 = 0.5 * 2^-1073
        assert_eq!(frexp_exp(f64::from_bits(2)), -1072); // 2^-1073 = 0.5 * 2^-1072
    }
}
