//! Conversions between raw 24-bit ADC output and numbers.

/// Largest positive output code (0x7FFFFF)
pub const MAX_CODE: i32 = 0x7F_FFFF;

/// Smallest negative output code (0x800000 sign-extended)
pub const MIN_CODE: i32 = -0x80_0000;

/// Interprets three bytes, MSB first, as a 24-bit two's complement value
/// sign-extended to 32 bits.
pub fn decode24(data: [u8; 3]) -> i32 {
    let raw = ((data[0] as i32) << 16) | ((data[1] as i32) << 8) | (data[2] as i32);
    if raw & 0x80_0000 != 0 {
        raw | !0xFF_FFFF
    } else {
        raw
    }
}

/// Lower 24 bits of `code`, MSB first. Out-of-range codes wrap.
pub fn encode24(code: i32) -> [u8; 3] {
    let [_, b0, b1, b2] = code.to_be_bytes();
    [b0, b1, b2]
}

/// Converts an output code to volts for a reference `v_ref` and PGA gain `pga`.
///
/// The divisor is the positive full-scale code, so 0x800000 lands a hair
/// past `-2 * v_ref / pga`.
pub fn to_volts(code: i32, v_ref: f64, pga: f64) -> f64 {
    code as f64 / MAX_CODE as f64 * (2.0 * v_ref / pga)
}
