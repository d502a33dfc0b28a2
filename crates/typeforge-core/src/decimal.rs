//! Fixed-point decimal carried as four 32-bit words.
//!
//! The layout is a 96-bit unsigned mantissa split over `lo`, `mid` and `hi`,
//! plus a `flags` word holding the scale (bits 16..24, 0..=28) and the sign
//! (bit 31). The emitter loads decimals from exactly these four words.

use std::fmt;

const SCALE_SHIFT: u32 = 16;
const SCALE_MASK: u32 = 0x00FF_0000;
const SIGN_MASK: u32 = 0x8000_0000;
const MAX_MANTISSA: u128 = (1u128 << 96) - 1;

/// Largest supported scale (number of fractional digits).
pub const MAX_SCALE: u8 = 28;

/// A decimal number in four-word form.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Decimal {
    lo: u32,
    mid: u32,
    hi: u32,
    flags: u32,
}

impl Decimal {
    /// Zero with scale 0.
    pub const ZERO: Decimal = Decimal {
        lo: 0,
        mid: 0,
        hi: 0,
        flags: 0,
    };

    /// Build a decimal from a signed mantissa and a scale.
    ///
    /// Returns `None` when the mantissa does not fit in 96 bits or the scale
    /// exceeds [`MAX_SCALE`].
    pub fn new(mantissa: i128, scale: u8) -> Option<Self> {
        if scale > MAX_SCALE {
            return None;
        }
        let magnitude = mantissa.unsigned_abs();
        if magnitude > MAX_MANTISSA {
            return None;
        }
        let mut flags = (scale as u32) << SCALE_SHIFT;
        if mantissa < 0 {
            flags |= SIGN_MASK;
        }
        Some(Self {
            lo: magnitude as u32,
            mid: (magnitude >> 32) as u32,
            hi: (magnitude >> 64) as u32,
            flags,
        })
    }

    /// Integral decimal.
    pub fn from_i64(value: i64) -> Self {
        // An i64 magnitude always fits in 96 bits.
        let magnitude = value.unsigned_abs() as u128;
        let flags = if value < 0 { SIGN_MASK } else { 0 };
        Self {
            lo: magnitude as u32,
            mid: (magnitude >> 32) as u32,
            hi: 0,
            flags,
        }
    }

    /// Rebuild from the raw `[lo, mid, hi, flags]` words.
    ///
    /// Returns `None` if `flags` carries bits outside scale and sign, or the
    /// scale is out of range.
    pub fn from_parts(parts: [u32; 4]) -> Option<Self> {
        let [lo, mid, hi, flags] = parts;
        if flags & !(SCALE_MASK | SIGN_MASK) != 0 {
            return None;
        }
        if ((flags & SCALE_MASK) >> SCALE_SHIFT) > MAX_SCALE as u32 {
            return None;
        }
        Some(Self { lo, mid, hi, flags })
    }

    /// The raw `[lo, mid, hi, flags]` words.
    pub fn parts(&self) -> [u32; 4] {
        [self.lo, self.mid, self.hi, self.flags]
    }

    /// Number of fractional digits.
    pub fn scale(&self) -> u8 {
        ((self.flags & SCALE_MASK) >> SCALE_SHIFT) as u8
    }

    /// True for negative values (a negative zero is reported as negative).
    pub fn is_negative(&self) -> bool {
        self.flags & SIGN_MASK != 0
    }

    /// Signed mantissa.
    pub fn mantissa(&self) -> i128 {
        let magnitude =
            (self.lo as i128) | ((self.mid as i128) << 32) | ((self.hi as i128) << 64);
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Lossy conversion for display and comparisons with floats.
    pub fn to_f64(&self) -> f64 {
        self.mantissa() as f64 / 10f64.powi(self.scale() as i32)
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({self})")
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = self.scale() as usize;
        let digits = self.mantissa().unsigned_abs().to_string();
        let sign = if self.is_negative() { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_round_trip_through_words() {
        let d = Decimal::new(-123_456_789_012_345, 4).unwrap();
        let back = Decimal::from_parts(d.parts()).unwrap();
        assert_eq!(d, back);
        assert_eq!(back.mantissa(), -123_456_789_012_345);
        assert_eq!(back.scale(), 4);
    }

    #[test]
    fn display_places_the_point() {
        assert_eq!(Decimal::new(12345, 2).unwrap().to_string(), "123.45");
        assert_eq!(Decimal::new(-5, 3).unwrap().to_string(), "-0.005");
        assert_eq!(Decimal::from_i64(42).to_string(), "42");
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Decimal::new(1, MAX_SCALE + 1).is_none());
        assert!(Decimal::new(1i128 << 100, 0).is_none());
        assert!(Decimal::from_parts([0, 0, 0, 0x0000_0001]).is_none());
    }

    #[test]
    fn wide_mantissa_uses_high_word() {
        let d = Decimal::new(1i128 << 70, 0).unwrap();
        let [lo, mid, hi, _] = d.parts();
        assert_eq!((lo, mid, hi), (0, 0, 1 << 6));
    }

    #[test]
    fn to_f64_applies_scale() {
        let d = Decimal::new(250, 2).unwrap();
        assert!((d.to_f64() - 2.5).abs() < 1e-12);
    }
}
