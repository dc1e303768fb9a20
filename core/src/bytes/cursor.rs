//! Bounds-checked cursors over a byte slice (`ReadView`) and a growable
//! output buffer (`WriteBuffer`). Neither allocates on the read side; they
//! only ever advance a position.

use crate::error::ParseError;
use super::compact_size;

/// A borrowing, bounds-checked read cursor into a byte slice.
#[derive(Clone, Copy)]
pub struct ReadView<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ReadView<'a> {
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

    /// The full slice this view was constructed over, independent of position.
    pub fn full_slice(&self) -> &'a [u8] {
        self.data
    }

    /// The slice from the start of the buffer up to (not including) the
    /// current position. Used to build preimages incrementally.
    pub fn consumed_slice(&self) -> &'a [u8] {
        &self.data[..self.pos]
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn require(&self, context: &'static str, n: usize) -> Result<(), ParseError> {
        if self.remaining() < n {
            Err(ParseError::short(context, n, self.remaining()))
        } else {
            Ok(())
        }
    }

    pub fn take(&mut self, context: &'static str, n: usize) -> Result<&'a [u8], ParseError> {
        self.require(context, n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn take_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], ParseError> {
        let slice = self.take(context, N)?;
        Ok(slice.try_into().expect("length checked above"))
    }

    pub fn read_u8(&mut self, context: &'static str) -> Result<u8, ParseError> {
        Ok(self.take_array::<1>(context)?[0])
    }

    pub fn read_u16_le(&mut self, context: &'static str) -> Result<u16, ParseError> {
        Ok(u16::from_le_bytes(self.take_array(context)?))
    }

    pub fn read_u16_be(&mut self, context: &'static str) -> Result<u16, ParseError> {
        Ok(u16::from_be_bytes(self.take_array(context)?))
    }

    pub fn read_u32_le(&mut self, context: &'static str) -> Result<u32, ParseError> {
        Ok(u32::from_le_bytes(self.take_array(context)?))
    }

    pub fn read_i32_le(&mut self, context: &'static str) -> Result<i32, ParseError> {
        Ok(i32::from_le_bytes(self.take_array(context)?))
    }

    pub fn read_u64_le(&mut self, context: &'static str) -> Result<u64, ParseError> {
        Ok(u64::from_le_bytes(self.take_array(context)?))
    }

    pub fn read_i64_le(&mut self, context: &'static str) -> Result<i64, ParseError> {
        Ok(i64::from_le_bytes(self.take_array(context)?))
    }

    pub fn read_compact_size(&mut self, context: &'static str) -> Result<u64, ParseError> {
        let (value, consumed) = compact_size::decode(self.rest())
            .map_err(|_| ParseError::short(context, 1, self.remaining()))?;
        self.pos += consumed;
        Ok(value)
    }

    /// Read a CompactSize-prefixed length and then that many bytes.
    pub fn read_compact_bytes(&mut self, context: &'static str) -> Result<&'a [u8], ParseError> {
        let len = self.read_compact_size(context)?;
        let len = usize::try_from(len)
            .map_err(|_| ParseError::invalid(context, "length does not fit in usize"))?;
        self.take(context, len)
    }

    pub fn advance(&mut self, n: usize) {
        self.pos += n.min(self.remaining());
    }
}

/// A growable output buffer. Thin wrapper over `Vec<u8>` giving symmetric
/// naming with `ReadView` for the write side of the codec.
#[derive(Default, Clone)]
pub struct WriteBuffer {
    buf: Vec<u8>,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16_le(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u16_be(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32_le(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32_le(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64_le(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_compact_size(&mut self, v: u64) {
        compact_size::encode_into(v, &mut self.buf);
    }

    pub fn write_compact_bytes(&mut self, bytes: &[u8]) {
        self.write_compact_size(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_view_tracks_position_and_consumed_slice() {
        let data = [1u8, 2, 3, 4, 5];
        let mut view = ReadView::new(&data);
        assert_eq!(view.read_u8("a").unwrap(), 1);
        assert_eq!(view.read_u16_le("b").unwrap(), u16::from_le_bytes([2, 3]));
        assert_eq!(view.consumed_slice(), &[1, 2, 3]);
        assert_eq!(view.rest(), &[4, 5]);
        assert_eq!(view.remaining(), 2);
    }

    #[test]
    fn read_view_reports_short_reads() {
        let data = [1u8];
        let mut view = ReadView::new(&data);
        assert!(view.read_u32_le("x").is_err());
    }

    #[test]
    fn write_buffer_round_trips_with_read_view() {
        let mut w = WriteBuffer::new();
        w.write_i32_le(-7);
        w.write_compact_bytes(b"hello");
        let bytes = w.into_vec();
        let mut r = ReadView::new(&bytes);
        assert_eq!(r.read_i32_le("v").unwrap(), -7);
        assert_eq!(r.read_compact_bytes("s").unwrap(), b"hello");
        assert!(r.is_empty());
    }
}
