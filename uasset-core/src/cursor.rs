//! Position-tracked primitive reads over an in-memory package buffer.

use byteorder::{ByteOrder, BE, LE};
use bytes::Bytes;

use crate::audit::{AuditEntry, AuditTrail};
use crate::error::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// What to do when a read runs past the end of the buffer.
///
/// The reference reader indexes past the buffer and silently propagates the
/// resulting garbage, so `Permissive` (read zeros, keep going) is the
/// compatible default. `Strict` is an explicit opt-in that fails the decode
/// with [`DecodeError::Truncated`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsPolicy {
    #[default]
    Permissive,
    Strict,
}

/// Owns the buffer and the read position; every primitive read advances the
/// position and, in audit mode, reports `{key, type, value, byte-range}` to
/// the trail.
#[derive(Debug)]
pub struct ByteCursor {
    bytes: Bytes,
    pos: usize,
    endian: Endian,
    policy: BoundsPolicy,
    audit: Option<AuditTrail>,
}

impl ByteCursor {
    pub fn new(bytes: Bytes, audit: bool, policy: BoundsPolicy) -> Self {
        Self {
            bytes,
            pos: 0,
            endian: Endian::Little,
            policy,
            audit: audit.then(AuditTrail::default),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Reposition for the next section. Negative offsets clamp to the start
    /// of the buffer; positions past the end are legal under the permissive
    /// policy (subsequent reads see zeros).
    #[inline]
    pub fn seek(&mut self, offset: i64) {
        self.pos = usize::try_from(offset).unwrap_or(0);
    }

    /// Flip every subsequent fixed-width read to the other byte order.
    /// Triggered once, by the byte-swapped package tag.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume `count` bytes. Under the permissive policy bytes past the end
    /// of the buffer read as zero and the position still advances.
    pub fn take(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        if self.pos + count > self.bytes.len() {
            if self.policy == BoundsPolicy::Strict {
                return Err(DecodeError::Truncated {
                    offset: self.pos,
                    wanted: count,
                    len: self.bytes.len(),
                });
            }
            let mut out = vec![0u8; count];
            let available = self.bytes.len().saturating_sub(self.pos);
            if available > 0 {
                out[..available].copy_from_slice(&self.bytes[self.pos..]);
            }
            self.pos += count;
            return Ok(out);
        }
        let out = self.bytes[self.pos..self.pos + count].to_vec();
        self.pos += count;
        Ok(out)
    }

    fn record(&mut self, key: &str, ty: &'static str, value: impl ToString, start: usize, stop: usize) {
        if let Some(trail) = self.audit.as_mut() {
            trail.record(key, ty, value, start, stop);
        }
    }

    /// Out-of-line audit entry for reads whose value isn't a plain scalar
    /// (raw thumbnail payloads).
    pub fn record_raw(&mut self, key: &str, ty: &'static str, value: String, start: usize, stop: usize) {
        self.record(key, ty, value, start, stop);
    }

    pub fn u16(&mut self, key: &str) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        let val = match self.endian {
            Endian::Little => LE::read_u16(&bytes),
            Endian::Big => BE::read_u16(&bytes),
        };
        self.record(key, "uint16", val, self.pos - 2, self.pos - 1);
        Ok(val)
    }

    pub fn u32(&mut self, key: &str) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        let val = match self.endian {
            Endian::Little => LE::read_u32(&bytes),
            Endian::Big => BE::read_u32(&bytes),
        };
        self.record(key, "uint32", val, self.pos - 4, self.pos - 1);
        Ok(val)
    }

    pub fn u64(&mut self, key: &str) -> Result<u64, DecodeError> {
        let bytes = self.take(8)?;
        let val = match self.endian {
            Endian::Little => LE::read_u64(&bytes),
            Endian::Big => BE::read_u64(&bytes),
        };
        self.record(key, "uint64", val, self.pos - 8, self.pos - 1);
        Ok(val)
    }

    pub fn i32(&mut self, key: &str) -> Result<i32, DecodeError> {
        let bytes = self.take(4)?;
        let val = match self.endian {
            Endian::Little => LE::read_i32(&bytes),
            Endian::Big => BE::read_i32(&bytes),
        };
        self.record(key, "int32", val, self.pos - 4, self.pos - 1);
        Ok(val)
    }

    pub fn i64(&mut self, key: &str) -> Result<i64, DecodeError> {
        let bytes = self.take(8)?;
        let val = match self.endian {
            Endian::Little => LE::read_i64(&bytes),
            Endian::Big => BE::read_i64(&bytes),
        };
        self.record(key, "int64", val, self.pos - 8, self.pos - 1);
        Ok(val)
    }

    /// 16 bytes reinterpreted as four little-endian 32-bit slots, each
    /// rendered as 8 upper-case hex digits. This is the FGuid component
    /// layout and is byte-order-fixed regardless of the package endianness.
    pub fn guid_slotted(&mut self, key: &str) -> Result<String, DecodeError> {
        let bytes = self.take(16)?;
        let mut val = String::with_capacity(32);
        for slot in bytes.chunks_exact(4) {
            let word = u32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]);
            val.push_str(&format!("{:08X}", word));
        }
        self.record(key, "guid_slot", &val, self.pos - 16, self.pos - 1);
        Ok(val)
    }

    /// 16 bytes hex-dumped in file order, upper-case. Distinct from
    /// [`guid_slotted`](Self::guid_slotted); the header uses both encodings
    /// and they must never be merged.
    pub fn guid_plain(&mut self, key: &str) -> Result<String, DecodeError> {
        let bytes = self.take(16)?;
        let mut val = String::with_capacity(32);
        for byte in &bytes {
            val.push_str(&format!("{:02X}", byte));
        }
        self.record(key, "guid_plain", &val, self.pos - 16, self.pos - 1);
        Ok(val)
    }

    /// Length-prefixed engine string.
    ///
    /// - prefix 0: empty string, 4 bytes consumed in total
    /// - prefix N > 0: N single-byte (Latin-1) units, trailing NUL dropped
    /// - prefix N < 0: |N| UTF-16LE code units; a high surrogate followed by
    ///   a valid low surrogate combines into one code point
    ///
    /// Unpaired surrogates cannot live in a Rust `String` and decode to
    /// U+FFFD (deviation, see DESIGN.md).
    pub fn fstring(&mut self, key: &str) -> Result<String, DecodeError> {
        let length = self.i32(&format!("{key} (fstring length)"))?;
        if length == 0 {
            return Ok(String::new());
        }

        let start = self.pos;
        let val = if length > 0 {
            let bytes = self.take(length as usize)?;
            bytes[..bytes.len() - 1].iter().map(|&b| b as char).collect()
        } else {
            let bytes = self.take(length.unsigned_abs() as usize * 2)?;
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            char::decode_utf16(units)
                .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        };
        self.record(key, "fstring", &val, start, self.pos - 1);
        Ok(val)
    }

    /// Hand the trail back for the final sort. Empty when audit mode is off.
    pub fn into_audit_entries(self) -> Vec<AuditEntry> {
        self.audit.map(AuditTrail::into_sorted).unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn audit_len(&self) -> usize {
        self.audit.as_ref().map_or(0, AuditTrail::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cursor(bytes: &[u8]) -> ByteCursor {
        ByteCursor::new(Bytes::copy_from_slice(bytes), true, BoundsPolicy::Permissive)
    }

    #[test]
    fn empty_fstring_consumes_exactly_the_prefix() {
        let mut cur = cursor(&[0, 0, 0, 0, 0xAA]);
        assert_eq!(cur.fstring("s").unwrap(), "");
        assert_eq!(cur.position(), 4);
        // only the length prefix is recorded for an empty string
        assert_eq!(cur.audit_len(), 1);
    }

    #[test]
    fn ansi_fstring_drops_trailing_nul() {
        let mut buf = vec![4, 0, 0, 0];
        buf.extend_from_slice(b"abc\0");
        let mut cur = cursor(&buf);
        assert_eq!(cur.fstring("s").unwrap(), "abc");
        assert_eq!(cur.position(), 8);
    }

    #[test]
    fn latin1_bytes_map_to_code_points() {
        // 0xE9 is 'é' in Latin-1, not valid UTF-8 on its own
        let buf = [2, 0, 0, 0, 0xE9, 0x00];
        let mut cur = cursor(&buf);
        assert_eq!(cur.fstring("s").unwrap(), "\u{e9}");
    }

    #[test]
    fn utf16_fstring_combines_surrogate_pair() {
        // length -3: U+1F600 (surrogate pair D83D DE00) followed by 'x'
        let buf = hex::decode("fdffffff3dd800de7800").unwrap();
        let mut cur = cursor(&buf);
        assert_eq!(cur.fstring("s").unwrap(), "\u{1F600}x");
        // 4-byte prefix + 3 * 2 bytes of code units
        assert_eq!(cur.position(), 10);
    }

    #[test]
    fn utf16_unpaired_surrogate_becomes_replacement() {
        let buf = hex::decode("feffffff3dd87800").unwrap();
        let mut cur = cursor(&buf);
        assert_eq!(cur.fstring("s").unwrap(), "\u{FFFD}x");
    }

    #[test]
    fn guid_encodings_differ_on_the_same_bytes() {
        let bytes: Vec<u8> = (0x01..=0x10).collect();
        let mut cur = cursor(&bytes);
        assert_eq!(cur.guid_slotted("g").unwrap(), "04030201080706050C0B0A09100F0E0D");
        cur.seek(0);
        assert_eq!(cur.guid_plain("g").unwrap(), "0102030405060708090A0B0C0D0E0F10");
    }

    #[test]
    fn big_endian_applies_to_fixed_width_reads_only() {
        let mut cur = cursor(&[0x12, 0x34, 0x00, 0x01, 0x02, 0x03]);
        cur.set_endian(Endian::Big);
        assert_eq!(cur.u16("a").unwrap(), 0x1234);
        assert_eq!(cur.u32("b").unwrap(), 0x0001_0203);
    }

    #[test]
    fn permissive_reads_past_end_yield_zeros() {
        let mut cur = cursor(&[0xFF]);
        assert_eq!(cur.u32("a").unwrap(), 0x0000_00FF);
        assert_eq!(cur.position(), 4);
        assert_eq!(cur.u64("b").unwrap(), 0);
    }

    #[test]
    fn strict_reads_past_end_fail() {
        let mut cur = ByteCursor::new(
            Bytes::from_static(&[0xFF]),
            false,
            BoundsPolicy::Strict,
        );
        assert_eq!(
            cur.u32("a"),
            Err(DecodeError::Truncated {
                offset: 0,
                wanted: 4,
                len: 1
            })
        );
    }

    #[test]
    fn audit_entries_cover_inclusive_ranges() {
        let mut cur = cursor(&[1, 0, 2, 0, 0, 0]);
        cur.u16("first").unwrap();
        cur.u32("second").unwrap();
        let entries = cur.into_audit_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].start, entries[0].stop), (0, 1));
        assert_eq!((entries[1].start, entries[1].stop), (2, 5));
        assert_eq!(entries[0].value, "1");
        assert_eq!(entries[1].value, "2");
    }
}
