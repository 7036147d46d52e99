// ---------------------------------------------------------------------------
// UQ15 fixed-point helpers.
//
// Weights and linear samples use 15 fractional bits. Byte kernels carry an
// extra 7 bits through the intermediate row (unfix8 after the horizontal
// pass, unfix22 after the vertical pass).
// ---------------------------------------------------------------------------

const ISHIFT: u32 = 15;
const ISCALE: i32 = 1 << ISHIFT;
const IMAX: i32 = (1 << (ISHIFT + 1)) - 1;
const IROUND: i32 = ISCALE >> 1;

/// Fixed-point 1.0.
pub const UQ15_ONE: i32 = ISCALE;
/// Largest value representable in a `u16` UQ15 sample (just under 2.0).
pub const UQ15_MAX: i32 = IMAX;
/// Rounding bias added before a 15-bit shift.
pub const UQ15_ROUND: i32 = IROUND;

/// Converts a real value to 15-bit fixed point, rounding half up.
#[inline(always)]
pub fn fix15(x: f64) -> i32 {
    (x * f64::from(ISCALE) + 0.5).floor() as i32
}

/// Converts a normalized real value to a UQ15 sample clamped to `[0, 1.0]`.
#[inline(always)]
pub fn fix_to_uq15_one(x: f64) -> u16 {
    clamp_to_uq15_one(fix15(x))
}

/// Converts a normalized real value to a byte, rounding half up.
#[inline(always)]
pub fn fix_to_byte(x: f64) -> u8 {
    clamp_to_byte((x * 255.0 + 0.5).floor() as i32)
}

#[inline(always)]
pub fn clamp_to_uq15(x: i32) -> u16 {
    x.clamp(0, IMAX) as u16
}

#[inline(always)]
pub fn clamp_to_uq15_one(x: i32) -> u16 {
    x.clamp(0, ISCALE) as u16
}

#[inline(always)]
pub fn clamp_to_byte(x: i32) -> u8 {
    x.clamp(0, 255) as u8
}

#[inline(always)]
pub fn unfix8(x: i32) -> i32 {
    (x + (IROUND >> 7)) >> 8
}

#[inline(always)]
pub fn unfix15(x: i32) -> i32 {
    (x + IROUND) >> ISHIFT
}

/// [`unfix15`] for 64-bit accumulators. The result of any normalized
/// convolution over UQ15 samples fits in an `i32`.
#[inline(always)]
pub fn unfix15_wide(x: i64) -> i32 {
    ((x + i64::from(IROUND)) >> ISHIFT) as i32
}

#[inline(always)]
pub fn unfix22(x: i32) -> i32 {
    (x + (IROUND << 7)) >> 22
}

#[inline(always)]
pub fn unfix_to_uq15(x: i32) -> u16 {
    clamp_to_uq15(unfix15(x))
}

#[inline(always)]
pub fn unfix_to_uq15_one(x: i32) -> u16 {
    clamp_to_uq15_one(unfix15(x))
}

#[inline(always)]
pub fn unfix15_to_byte(x: i32) -> u8 {
    clamp_to_byte(unfix15(x))
}

#[inline(always)]
pub fn unfix22_to_byte(x: i32) -> u8 {
    clamp_to_byte(unfix22(x))
}

/// [`unfix22_to_byte`] for 64-bit accumulators.
#[inline(always)]
pub fn unfix22_wide_to_byte(x: i64) -> u8 {
    ((x + (i64::from(IROUND) << 7)) >> 22).clamp(0, 255) as u8
}

#[inline(always)]
pub fn unfix15_to_f32(x: i32) -> f32 {
    x as f32 * (1.0 / ISCALE as f32)
}
