/// Displays bytes as uppercase hex, two digits per byte, no separators.
///
/// Used for trace output of raw input and frames, without allocating.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl<'a> core::fmt::Display for HexBytes<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        for b in self.0 {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl<'a> core::fmt::Debug for HexBytes<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

#[cfg(feature = "defmt")]
impl<'a> defmt::Format for HexBytes<'a> {
    fn format(&self, f: defmt::Formatter) {
        for b in self.0 {
            defmt::write!(f, "{=u8:02X}", *b);
        }
    }
}
