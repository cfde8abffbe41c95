/// A temperature as the unit encodes it: `(T + 20) * 2`, in one byte.
///
/// This covers -20.0 to 107.5 °C in 0.5 °C steps. Every byte is a
/// valid encoding, even if the temperature it stands for is silly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature(pub u8);

impl Temperature {
    pub const MIN_CELSIUS: f32 = -20.0;
    pub const MAX_CELSIUS: f32 = 107.5;

    pub const fn raw(&self) -> u8 {
        self.0
    }

    /// Encode a temperature, rounding to the nearest half degree and
    /// clamping to the representable range.
    pub fn from_celsius(celsius: f32) -> Self {
        Self(encode(celsius))
    }

    pub fn celsius(&self) -> f32 {
        decode(self.0)
    }
}

impl core::fmt::Display for Temperature {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{:.2}", self.celsius())
    }
}

/// Encode °C into a raw temperature byte, rounding to the nearest half
/// degree and clamping to the representable range.
pub fn encode(celsius: f32) -> u8 {
    let scaled = ((celsius + 20.0) * 2.0).clamp(0.0, 255.0);
    // scaled is non-negative here, so truncating after +0.5 rounds.
    // NaN falls through `as` to 0.
    (scaled + 0.5) as u8
}

/// Decode a raw temperature byte into °C.
pub fn decode(raw: u8) -> f32 {
    raw as f32 / 2.0 - 20.0
}

#[cfg(test)]
#[cfg(feature = "std")]
mod test {
    use super::*;

    use quickcheck_macros::quickcheck;

    #[test]
    fn decode_endpoints() {
        assert_eq!(decode(0x00), -20.0);
        assert_eq!(decode(0x28), 0.0);
        assert_eq!(decode(0xff), 107.5);
    }

    #[test]
    fn decode_every_byte() {
        for b in 0..=255u8 {
            let expected = b as f64 / 2.0 - 20.0;
            assert!((decode(b) as f64 - expected).abs() < 1e-6, "byte {:#04x}", b);
        }
    }

    #[test]
    fn display_two_decimals() {
        assert_eq!(Temperature(0x50).to_string(), "20.00");
        assert_eq!(Temperature(0x4d).to_string(), "18.50");
        assert_eq!(Temperature(0x21).to_string(), "-3.50");
    }

    #[test]
    fn encode_clamps() {
        assert_eq!(Temperature::from_celsius(-40.0), Temperature(0));
        assert_eq!(Temperature::from_celsius(500.0), Temperature(255));
        assert_eq!(Temperature::from_celsius(f32::NAN), Temperature(0));
    }

    #[test]
    fn encode_rounds_to_half_degree() {
        assert_eq!(Temperature::from_celsius(18.4), Temperature(0x4d));
        assert_eq!(Temperature::from_celsius(18.1), Temperature(0x4c));
    }

    #[quickcheck]
    fn decode_monotonic(a: u8, b: u8) -> bool {
        (a <= b) == (decode(a) <= decode(b))
    }

    #[quickcheck]
    fn encode_decode(raw: u8) -> bool {
        encode(decode(raw)) == raw
    }

    #[quickcheck]
    fn decode_encode_close(celsius: f32) -> bool {
        if !(Temperature::MIN_CELSIUS..=Temperature::MAX_CELSIUS).contains(&celsius) {
            return true;
        }
        (decode(encode(celsius)) - celsius).abs() <= 0.25
    }
}
