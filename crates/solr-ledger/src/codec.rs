//! Little-endian, length-prefixed field encoding used by the receipt program
//! and by the transaction wire format.

use solr_types::Address;

use crate::error::{CodecError, CodecResult};

/// Append-only field encoder.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn address(&mut self, address: &Address) -> &mut Self {
        self.raw(address.as_bytes())
    }

    /// `u32` byte length followed by the UTF-8 bytes.
    pub fn string(&mut self, s: &str) -> &mut Self {
        self.u32(s.len() as u32);
        self.raw(s.as_bytes())
    }

    /// `u32` element count, used before a sequence of items.
    pub fn seq_len(&mut self, len: usize) -> &mut Self {
        self.u32(len as u32)
    }

    /// Compact-u16 length: 7 bits per byte, high bit set on continuation.
    pub fn compact_u16(&mut self, mut v: u16) -> &mut Self {
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.buf.push(byte);
            if v == 0 {
                break;
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor-based field decoder. Every read checks bounds first.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> CodecResult<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    pub fn address(&mut self) -> CodecResult<Address> {
        Ok(Address::new(self.array()?))
    }

    pub fn string(&mut self, field: &'static str) -> CodecResult<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { field })
    }

    /// Element count for a sequence whose items occupy at least
    /// `min_item_size` bytes each. Counts that could not possibly fit in the
    /// remaining data are rejected before anything is allocated.
    pub fn seq_len(&mut self, field: &'static str, min_item_size: usize) -> CodecResult<usize> {
        let len = self.u32()? as usize;
        let max = self.remaining() / min_item_size.max(1);
        if len > max {
            return Err(CodecError::LengthExceeded { field, len, max });
        }
        Ok(len)
    }

    pub fn compact_u16(&mut self) -> CodecResult<u16> {
        let mut value: u32 = 0;
        for i in 0..3 {
            let byte = self.u8()?;
            value |= ((byte & 0x7f) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return u16::try_from(value).map_err(|_| CodecError::InvalidValue {
                    field: "compact-u16",
                    reason: format!("{value} overflows u16"),
                });
            }
        }
        Err(CodecError::InvalidValue {
            field: "compact-u16",
            reason: "more than 3 bytes".into(),
        })
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(&self) -> CodecResult<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}
