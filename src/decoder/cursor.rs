//! Bounds-checked read cursor

use super::DecodeError;

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unread bytes
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Fail with `Truncated` unless `needed` more bytes are available
    pub fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        if needed > self.remaining() {
            return Err(DecodeError::Truncated {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn peek_byte(&self) -> Result<u8, DecodeError> {
        self.ensure(1)?;
        Ok(self.data[self.pos])
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = self.peek_byte()?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }
}
