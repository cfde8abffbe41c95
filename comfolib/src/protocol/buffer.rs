/// Returned when an append would not fit in a [FixedBuffer].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityError {
    pub capacity: usize,
    pub requested: usize,
}

#[cfg(feature = "std")]
impl std::error::Error for CapacityError {}

impl core::fmt::Display for CapacityError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "buffer needs {} bytes but only holds {}",
            self.requested, self.capacity
        )
    }
}

/// A byte buffer backed by a flat array, with a filled length.
///
/// Never grows. Appends check capacity before touching the array, and
/// fail without modifying anything if the data doesn't fit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixedBuffer<const SIZE: usize> {
    len: usize,
    buffer: [u8; SIZE],
}

impl<const SIZE: usize> FixedBuffer<SIZE> {
    pub const fn new() -> Self {
        Self {
            len: 0,
            buffer: [0u8; SIZE],
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// How many more bytes fit.
    pub const fn remaining(&self) -> usize {
        SIZE - self.len
    }

    /// The filled part of the buffer.
    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Remove the first `n` bytes, moving the rest to the front.
    pub fn skip(&mut self, n: usize) {
        let n = n.min(self.len);
        self.buffer.copy_within(n..self.len, 0);
        self.len -= n;
    }

    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<(), CapacityError> {
        if data.len() > self.remaining() {
            return Err(CapacityError {
                capacity: SIZE,
                requested: self.len + data.len(),
            });
        }

        self.buffer[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        Ok(())
    }

    /// Replace the contents with the concatenation of `parts`. If they
    /// don't fit, the buffer is left empty.
    pub fn fill_from(&mut self, parts: &[&[u8]]) -> Result<(), CapacityError> {
        self.clear();
        let requested = parts.iter().map(|p| p.len()).sum();
        if requested > SIZE {
            return Err(CapacityError {
                capacity: SIZE,
                requested,
            });
        }

        for part in parts {
            self.extend_from_slice(part)?;
        }
        Ok(())
    }
}

impl<const SIZE: usize> Default for FixedBuffer<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}
