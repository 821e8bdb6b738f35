//! Minimal ASN.1 DER reader and writer.
//!
//! Only what the key loader and the ECDSA signer need: tag-length-value
//! elements with short and long form lengths, SEQUENCE nesting, and
//! non-negative INTEGERs.

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_SEQUENCE: u8 = 0x30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DerError {
    #[error("unexpected tag 0x{found:02x} at offset {offset}, expected 0x{expected:02x}")]
    UnexpectedTag { expected: u8, found: u8, offset: usize },
    #[error("input truncated at offset {offset}")]
    Truncated { offset: usize },
    #[error("unsupported length encoding at offset {offset}")]
    InvalidLength { offset: usize },
    #[error("{remaining} trailing bytes after {context}")]
    TrailingData {
        remaining: usize,
        context: &'static str,
    },
    #[error("unsupported {0}")]
    Unsupported(&'static str),
    #[error("raw signature of {0} bytes cannot be split into r and s")]
    InvalidSignatureLength(usize),
    #[error("integer of {length} bytes does not fit in {width} bytes")]
    IntegerTooWide { length: usize, width: usize },
}

/// Cursor over a DER encoded byte slice.
///
/// Offsets in errors are absolute, so a reader for a nested SEQUENCE reports
/// positions relative to the outermost input.
#[derive(Debug, Clone)]
pub struct DerReader<'a> {
    input: &'a [u8],
    position: usize,
    base: usize,
}

impl<'a> DerReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            position: 0,
            base: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.input.len()
    }

    pub fn remaining(&self) -> usize {
        self.input.len().saturating_sub(self.position)
    }

    /// Peeks at the next tag without consuming it.
    pub fn peek_tag(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    fn offset(&self) -> usize {
        self.base + self.position
    }

    fn read_byte(&mut self) -> Result<u8, DerError> {
        let byte = self
            .input
            .get(self.position)
            .copied()
            .ok_or(DerError::Truncated {
                offset: self.offset(),
            })?;
        self.position += 1;
        Ok(byte)
    }

    fn read_length(&mut self) -> Result<usize, DerError> {
        let offset = self.offset();
        let first = self.read_byte()?;
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }

        let count = usize::from(first & 0x7f);
        if count == 0 || count > std::mem::size_of::<u32>() {
            return Err(DerError::InvalidLength { offset });
        }

        let mut length = 0usize;
        for _ in 0..count {
            length = (length << 8) | usize::from(self.read_byte()?);
        }
        Ok(length)
    }

    /// Reads one element with the expected tag and returns its value bytes.
    pub fn read_element(&mut self, tag: u8) -> Result<&'a [u8], DerError> {
        let offset = self.offset();
        let found = self.read_byte()?;
        if found != tag {
            return Err(DerError::UnexpectedTag {
                expected: tag,
                found,
                offset,
            });
        }

        let length = self.read_length()?;
        let start = self.position;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.input.len())
            .ok_or(DerError::Truncated {
                offset: self.base + self.input.len(),
            })?;
        self.position = end;
        Ok(&self.input[start..end])
    }

    /// Reads a SEQUENCE and returns a reader over its contents.
    pub fn read_sequence(&mut self) -> Result<DerReader<'a>, DerError> {
        let contents = self.read_element(TAG_SEQUENCE)?;
        Ok(DerReader {
            input: contents,
            position: 0,
            base: self.offset() - contents.len(),
        })
    }

    /// Reads a non-negative INTEGER, stripping the leading zero bytes that
    /// DER uses as a sign guard. Zero comes back as an empty slice.
    pub fn read_unsigned_integer(&mut self) -> Result<&'a [u8], DerError> {
        let value = self.read_element(TAG_INTEGER)?;
        Ok(strip_leading_zeros(value))
    }

    /// Fails if any bytes are left unread.
    pub fn finish(self, context: &'static str) -> Result<(), DerError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(DerError::TrailingData { remaining, context }),
        }
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first_significant = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first_significant..]
}

pub fn write_length(length: usize, out: &mut Vec<u8>) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }

    let bytes = length.to_be_bytes();
    let significant = strip_leading_zeros(&bytes);
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

pub fn write_element(tag: u8, value: &[u8], out: &mut Vec<u8>) {
    out.push(tag);
    write_length(value.len(), out);
    out.extend_from_slice(value);
}

/// Writes a big-endian magnitude as a minimal non-negative INTEGER, adding a
/// `0x00` guard byte when the high bit of the first byte is set.
pub fn write_unsigned_integer(magnitude: &[u8], out: &mut Vec<u8>) {
    let magnitude = strip_leading_zeros(magnitude);
    let mut value = Vec::with_capacity(magnitude.len() + 1);
    if magnitude.first().is_none_or(|b| b & 0x80 != 0) {
        value.push(0x00);
    }
    value.extend_from_slice(magnitude);
    write_element(TAG_INTEGER, &value, out);
}

/// Re-encodes a fixed-width `r || s` ECDSA signature as
/// `SEQUENCE { INTEGER r, INTEGER s }`.
pub fn encode_ecdsa_signature(raw: &[u8]) -> Result<Vec<u8>, DerError> {
    if raw.is_empty() || raw.len() % 2 != 0 {
        return Err(DerError::InvalidSignatureLength(raw.len()));
    }
    let (r, s) = raw.split_at(raw.len() / 2);

    let mut body = Vec::with_capacity(raw.len() + 6);
    write_unsigned_integer(r, &mut body);
    write_unsigned_integer(s, &mut body);

    let mut out = Vec::with_capacity(body.len() + 3);
    write_element(TAG_SEQUENCE, &body, &mut out);
    Ok(out)
}

/// Decodes `SEQUENCE { INTEGER r, INTEGER s }` back into `r || s`, each
/// left-padded to `width` bytes.
pub fn decode_ecdsa_signature(der: &[u8], width: usize) -> Result<Vec<u8>, DerError> {
    let mut outer = DerReader::new(der);
    let mut sequence = outer.read_sequence()?;
    outer.finish("ECDSA signature")?;

    let mut raw = vec![0u8; width * 2];
    for chunk in raw.chunks_mut(width) {
        let integer = sequence.read_unsigned_integer()?;
        if integer.len() > width {
            return Err(DerError::IntegerTooWide {
                length: integer.len(),
                width,
            });
        }
        chunk[width - integer.len()..].copy_from_slice(integer);
    }
    sequence.finish("ECDSA signature sequence")?;
    Ok(raw)
}
