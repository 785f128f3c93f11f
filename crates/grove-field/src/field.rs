use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use grove_types::{Name, OpCode, OpError, OpResult};

use crate::decimal::{self, DecScale, ScaleError};
use crate::def::{CustomField, FieldDef, FieldFlags, FieldType, OverflowPolicy};
use crate::raw::{RawRead, RawWrite};

/// The numeric interchange type for `get_number`/`put_number`.
pub type FieldNumber = i64;

/// Where a field's bytes live. A closed set: inline arena offset, blob
/// buffer index, or a caller-supplied virtual cell.
#[derive(Clone)]
pub enum FieldStorage {
    Inline { offset: usize },
    Blob { index: usize },
    Custom(Arc<dyn CustomField>),
}

impl fmt::Debug for FieldStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldStorage::Inline { offset } => write!(f, "Inline{{offset:{offset}}}"),
            FieldStorage::Blob { index } => write!(f, "Blob{{index:{index}}}"),
            FieldStorage::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Introspection record for one field, serialized for remote schema
/// discovery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: Name,
    pub r#type: FieldType,
    pub size: usize,
    pub scale: DecScale,
    #[serde(default, skip_serializing_if = "is_default_flags")]
    pub flags: FieldFlags,
}

fn is_default_flags(f: &FieldFlags) -> bool {
    *f == FieldFlags::default()
}

/// One column of a record: semantic type plus assigned physical storage.
///
/// Size and scale are fixed for the field's lifetime; a field never outlives
/// the tab that owns it (tabs own their fields by value and are shared via
/// `Arc<Layout>`).
#[derive(Debug, Clone)]
pub struct Field {
    name: Name,
    ftype: FieldType,
    storage: FieldStorage,
    size: usize,
    scale: DecScale,
    flags: FieldFlags,
}

impl Field {
    /// Bind a declared field to its tab-assigned storage. Only schema
    /// construction (`Tab::build`) should call this.
    pub fn assign(def: FieldDef, storage: FieldStorage) -> Self {
        Self {
            name: def.name,
            ftype: def.ftype,
            storage,
            size: def.size,
            scale: def.scale,
            flags: def.flags,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.ftype
    }

    pub fn storage(&self) -> &FieldStorage {
        &self.storage
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn scale(&self) -> DecScale {
        self.scale
    }

    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    pub fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            name: self.name.clone(),
            r#type: self.ftype,
            size: self.size,
            scale: self.scale,
            flags: self.flags,
        }
    }

    // -- storage access -----------------------------------------------------

    fn inline_slice<'a>(&self, rd: &'a dyn RawRead) -> OpResult<&'a [u8]> {
        let offset = match self.storage {
            FieldStorage::Inline { offset } => offset,
            _ => return Err(OpError::with_message(OpCode::NotFoundField, "not an inline field")),
        };
        rd.inline()
            .get(offset..offset + self.size)
            .ok_or_else(|| OpError::with_message(OpCode::NotFoundField, "field beyond record bounds"))
    }

    fn inline_slice_mut<'a>(&self, wr: &'a mut dyn RawWrite) -> OpResult<&'a mut [u8]> {
        let offset = match self.storage {
            FieldStorage::Inline { offset } => offset,
            _ => return Err(OpError::with_message(OpCode::NotFoundField, "not an inline field")),
        };
        wr.inline_mut()
            .get_mut(offset..offset + self.size)
            .ok_or_else(|| OpError::with_message(OpCode::NotFoundField, "field beyond record bounds"))
    }

    fn blob_slice<'a>(&self, rd: &'a dyn RawRead) -> OpResult<&'a [u8]> {
        match self.storage {
            FieldStorage::Blob { index } => rd
                .blob(index)
                .ok_or_else(|| OpError::with_message(OpCode::NotFoundField, "record has no such blob")),
            _ => Err(OpError::with_message(OpCode::NotFoundField, "not a blob field")),
        }
    }

    fn blob_mut<'a>(&self, wr: &'a mut dyn RawWrite) -> OpResult<&'a mut Vec<u8>> {
        match self.storage {
            FieldStorage::Blob { index } => wr
                .blob_mut(index)
                .ok_or_else(|| OpError::with_message(OpCode::NotFoundField, "record has no such blob")),
            _ => Err(OpError::with_message(OpCode::NotFoundField, "not a blob field")),
        }
    }

    fn read_signed(&self, rd: &dyn RawRead) -> OpResult<i64> {
        let bytes = self.inline_slice(rd)?;
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        // Sign-extend from the stored width.
        let shift = (8 - bytes.len()) * 8;
        Ok((i64::from_le_bytes(buf) << shift) >> shift)
    }

    fn read_unsigned(&self, rd: &dyn RawRead) -> OpResult<u64> {
        let bytes = self.inline_slice(rd)?;
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn write_int(&self, wr: &mut dyn RawWrite, v: i64) -> OpResult<()> {
        let size = self.size;
        let slice = self.inline_slice_mut(wr)?;
        slice.copy_from_slice(&v.to_le_bytes()[..size]);
        Ok(())
    }

    fn signed_bounds(&self) -> (i64, i64) {
        let bits = (self.size * 8) as u32;
        if bits >= 64 {
            (i64::MIN, i64::MAX)
        } else {
            (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
        }
    }

    fn unsigned_max(&self) -> u64 {
        let bits = (self.size * 8) as u32;
        if bits >= 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        }
    }

    /// Null sentinel for numeric fields: signed minimum / unsigned maximum
    /// at the stored width.
    fn null_sentinel_signed(&self) -> i64 {
        self.signed_bounds().0
    }

    // -- null ---------------------------------------------------------------

    pub fn is_null(&self, rd: &dyn RawRead) -> bool {
        match self.ftype {
            FieldType::Bytes => self.blob_slice(rd).map(|b| b.is_empty()).unwrap_or(true),
            FieldType::Chars => match &self.storage {
                FieldStorage::Custom(cell) => cell.render().is_empty(),
                _ => self
                    .inline_slice(rd)
                    .map(|b| b.first().copied().unwrap_or(0) == 0)
                    .unwrap_or(true),
            },
            FieldType::IntSigned | FieldType::Decimal | FieldType::TimeStamp | FieldType::TimeInterval => {
                self.read_signed(rd).map(|v| v == self.null_sentinel_signed()).unwrap_or(true)
            }
            FieldType::IntUnsigned => self
                .read_unsigned(rd)
                .map(|v| v == self.unsigned_max())
                .unwrap_or(true),
        }
    }

    pub fn set_null(&self, wr: &mut dyn RawWrite) -> OpResult<()> {
        if self.flags.read_only {
            return Err(OpError::code(OpCode::UnsupportedWrite));
        }
        self.init_null(wr)
    }

    /// Null-initialize regardless of the read-only flag. Record constructors
    /// use this to bring a fresh arena to the all-null state; everything else
    /// goes through [`Field::set_null`].
    pub fn init_null(&self, wr: &mut dyn RawWrite) -> OpResult<()> {
        match self.ftype {
            FieldType::Bytes => {
                self.blob_mut(wr)?.clear();
                Ok(())
            }
            FieldType::Chars => match &self.storage {
                FieldStorage::Custom(_) => Err(OpError::code(OpCode::UnsupportedNull)),
                _ => {
                    self.inline_slice_mut(wr)?.fill(0);
                    Ok(())
                }
            },
            FieldType::IntSigned | FieldType::Decimal | FieldType::TimeStamp | FieldType::TimeInterval => {
                self.write_int(wr, self.null_sentinel_signed())
            }
            FieldType::IntUnsigned => {
                let max = self.unsigned_max();
                self.write_int(wr, max as i64)
            }
        }
    }

    // -- render -------------------------------------------------------------

    /// Render the field's value as text. `fmt` is an optional width spec:
    /// `"8"` right-justifies in 8 columns, `"-8"` left-justifies.
    /// Null values render empty.
    pub fn render(&self, rd: &dyn RawRead, fmt: Option<&str>) -> String {
        let base = self.render_plain(rd);
        match fmt {
            None | Some("") => base,
            Some(spec) => {
                let (left, digits) = match spec.strip_prefix('-') {
                    Some(d) => (true, d),
                    None => (false, spec),
                };
                match digits.parse::<usize>() {
                    Ok(width) if left => format!("{base:<width$}"),
                    Ok(width) => format!("{base:>width$}"),
                    Err(_) => base,
                }
            }
        }
    }

    fn render_plain(&self, rd: &dyn RawRead) -> String {
        if let FieldStorage::Custom(cell) = &self.storage {
            return cell.render();
        }
        if self.is_null(rd) {
            return String::new();
        }
        match self.ftype {
            FieldType::Bytes => self
                .blob_slice(rd)
                .map(hex::encode)
                .unwrap_or_default(),
            FieldType::Chars => {
                let bytes = match self.inline_slice(rd) {
                    Ok(b) => b,
                    Err(_) => return String::new(),
                };
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                String::from_utf8_lossy(&bytes[..end]).into_owned()
            }
            FieldType::IntSigned => self.read_signed(rd).map(|v| v.to_string()).unwrap_or_default(),
            FieldType::IntUnsigned => self
                .read_unsigned(rd)
                .map(|v| v.to_string())
                .unwrap_or_default(),
            FieldType::Decimal => self
                .read_signed(rd)
                .map(|v| decimal::render_scaled(v, self.scale))
                .unwrap_or_default(),
            FieldType::TimeStamp => self
                .read_signed(rd)
                .ok()
                .and_then(|us| DateTime::from_timestamp_micros(us))
                .map(|dt| dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string())
                .unwrap_or_default(),
            FieldType::TimeInterval => self
                .read_signed(rd)
                .map(|us| trim_zeros(decimal::render_scaled(us, 6)))
                .unwrap_or_default(),
        }
    }

    // -- parse --------------------------------------------------------------

    /// Parse `text` into the field. Empty text sets null. Out-of-range
    /// numeric text is handled per `policy`; malformed text is always a
    /// `ValueFormat` outcome and leaves the field unchanged.
    pub fn parse(&self, wr: &mut dyn RawWrite, text: &str, policy: OverflowPolicy) -> OpResult<()> {
        if self.flags.read_only {
            return Err(OpError::code(OpCode::UnsupportedWrite));
        }
        if let FieldStorage::Custom(cell) = &self.storage {
            return cell.parse(text);
        }
        if text.is_empty() {
            return self.set_null(wr);
        }
        match self.ftype {
            FieldType::Bytes => {
                let decoded = hex::decode(text)
                    .map_err(|e| OpError::with_message(OpCode::ValueFormat, format!("bad hex: {e}")))?;
                let blob = self.blob_mut(wr)?;
                *blob = decoded;
                Ok(())
            }
            FieldType::Chars => {
                let bytes = text.as_bytes();
                if bytes.len() > self.size {
                    match policy {
                        OverflowPolicy::Ignore => return Ok(()),
                        OverflowPolicy::Strict => return Err(OpError::code(OpCode::ValueOverflow)),
                        OverflowPolicy::Saturate => {}
                    }
                }
                let n = bytes.len().min(self.size);
                let slice = self.inline_slice_mut(wr)?;
                slice[..n].copy_from_slice(&bytes[..n]);
                slice[n..].fill(0);
                Ok(())
            }
            FieldType::IntSigned | FieldType::IntUnsigned | FieldType::Decimal | FieldType::TimeInterval => {
                let scale = match self.ftype {
                    FieldType::Decimal => self.scale,
                    FieldType::TimeInterval => 6,
                    _ => 0,
                };
                match decimal::parse_scaled(text, scale) {
                    None => Err(OpError::with_message(
                        OpCode::ValueFormat,
                        format!("bad numeric text {text:?}"),
                    )),
                    Some(Err(e)) => self.store_out_of_range(wr, e, policy),
                    Some(Ok(v)) => self.store_number_checked(wr, v, policy),
                }
            }
            FieldType::TimeStamp => {
                let micros = parse_timestamp(text).ok_or_else(|| {
                    OpError::with_message(OpCode::ValueFormat, format!("bad timestamp {text:?}"))
                })?;
                self.write_int(wr, micros)
            }
        }
    }

    fn store_out_of_range(
        &self,
        wr: &mut dyn RawWrite,
        e: ScaleError,
        policy: OverflowPolicy,
    ) -> OpResult<()> {
        match policy {
            OverflowPolicy::Ignore => Ok(()),
            OverflowPolicy::Strict => Err(OpError::code(match e {
                ScaleError::Underflow => OpCode::ValueUnderflow,
                _ => OpCode::ValueOverflow,
            })),
            OverflowPolicy::Saturate => {
                let v = match (self.ftype, e) {
                    (FieldType::IntUnsigned, ScaleError::Underflow) => 0,
                    (FieldType::IntUnsigned, _) => self.unsigned_max() as i64,
                    (_, ScaleError::Underflow) => self.signed_bounds().0,
                    (_, _) => self.signed_bounds().1,
                };
                self.write_int(wr, v)
            }
        }
    }

    /// Store an already-scaled numeric value, enforcing the stored width.
    fn store_number_checked(
        &self,
        wr: &mut dyn RawWrite,
        v: i64,
        policy: OverflowPolicy,
    ) -> OpResult<()> {
        match self.ftype {
            FieldType::IntUnsigned => {
                if v < 0 {
                    return self.store_out_of_range(wr, ScaleError::Underflow, policy);
                }
                if (v as u64) > self.unsigned_max() {
                    return self.store_out_of_range(wr, ScaleError::Overflow, policy);
                }
                self.write_int(wr, v)
            }
            _ => {
                let (lo, hi) = self.signed_bounds();
                if v < lo {
                    return self.store_out_of_range(wr, ScaleError::Underflow, policy);
                }
                if v > hi {
                    return self.store_out_of_range(wr, ScaleError::Overflow, policy);
                }
                self.write_int(wr, v)
            }
        }
    }

    // -- numeric access -----------------------------------------------------

    /// Read the field as a scaled number. `12.34` stored at scale 2, read at
    /// `out_scale` 1, yields `123` (rounded). `Ok(None)` is null.
    pub fn get_number(&self, rd: &dyn RawRead, out_scale: DecScale) -> OpResult<Option<FieldNumber>> {
        if self.is_null(rd) {
            return Ok(None);
        }
        let convert = |v: i64, from: DecScale| {
            decimal::scale_convert(v, from, out_scale).map(Some).map_err(scale_err)
        };
        match self.ftype {
            FieldType::IntSigned => convert(self.read_signed(rd)?, 0),
            FieldType::IntUnsigned => {
                let v = self.read_unsigned(rd)?;
                // Saturate the one value (u64 > i64::MAX) the interchange
                // type cannot carry.
                convert(v.min(i64::MAX as u64) as i64, 0)
            }
            FieldType::Decimal => convert(self.read_signed(rd)?, self.scale),
            FieldType::TimeStamp | FieldType::TimeInterval => convert(self.read_signed(rd)?, 6),
            FieldType::Chars => {
                let text = self.render_plain(rd);
                match decimal::parse_scaled(&text, out_scale) {
                    None => Err(OpError::code(OpCode::ValueFormat)),
                    Some(Err(e)) => Err(scale_err(e)),
                    Some(Ok(v)) => Ok(Some(v)),
                }
            }
            FieldType::Bytes => Err(OpError::code(OpCode::UnsupportedNumber)),
        }
    }

    /// Write a scaled number into the field: `num` 123 at `scale` 1 means
    /// 12.3.
    pub fn put_number(
        &self,
        wr: &mut dyn RawWrite,
        num: FieldNumber,
        scale: DecScale,
        policy: OverflowPolicy,
    ) -> OpResult<()> {
        if self.flags.read_only {
            return Err(OpError::code(OpCode::UnsupportedWrite));
        }
        let store_scale = match self.ftype {
            FieldType::IntSigned | FieldType::IntUnsigned => 0,
            FieldType::Decimal => self.scale,
            FieldType::TimeStamp | FieldType::TimeInterval => 6,
            FieldType::Chars => {
                let text = decimal::render_scaled(num, scale);
                return self.parse(wr, &text, policy);
            }
            FieldType::Bytes => return Err(OpError::code(OpCode::UnsupportedNumber)),
        };
        match decimal::scale_convert(num, scale, store_scale) {
            Ok(v) => self.store_number_checked(wr, v, policy),
            Err(e) => self.store_out_of_range(wr, e, policy),
        }
    }

    // -- copy / compare -----------------------------------------------------

    /// Copy this field's value from `src` into `dst`. Both records must be
    /// laid out by the same tab.
    pub fn copy(&self, dst: &mut dyn RawWrite, src: &dyn RawRead) -> OpResult<()> {
        if self.flags.read_only {
            return Err(OpError::code(OpCode::UnsupportedWrite));
        }
        match &self.storage {
            FieldStorage::Custom(_) => Err(OpError::code(OpCode::UnsupportedWrite)),
            FieldStorage::Inline { .. } => {
                let value: Vec<u8> = self.inline_slice(src)?.to_vec();
                self.inline_slice_mut(dst)?.copy_from_slice(&value);
                Ok(())
            }
            FieldStorage::Blob { .. } => {
                let value: Vec<u8> = self.blob_slice(src)?.to_vec();
                *self.blob_mut(dst)? = value;
                Ok(())
            }
        }
    }

    /// Order two records by this field. Numeric types compare numerically,
    /// chars/bytes lexicographically; null sorts first.
    pub fn compare(&self, a: &dyn RawRead, b: &dyn RawRead) -> Ordering {
        match (self.is_null(a), self.is_null(b)) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        match self.ftype {
            FieldType::IntUnsigned => {
                let av = self.read_unsigned(a).unwrap_or(0);
                let bv = self.read_unsigned(b).unwrap_or(0);
                av.cmp(&bv)
            }
            FieldType::IntSigned | FieldType::Decimal | FieldType::TimeStamp | FieldType::TimeInterval => {
                let av = self.read_signed(a).unwrap_or(0);
                let bv = self.read_signed(b).unwrap_or(0);
                av.cmp(&bv)
            }
            FieldType::Chars | FieldType::Bytes => {
                self.render_plain(a).cmp(&self.render_plain(b))
            }
        }
    }
}

fn scale_err(e: ScaleError) -> OpError {
    OpError::code(match e {
        ScaleError::Underflow => OpCode::ValueUnderflow,
        _ => OpCode::ValueOverflow,
    })
}

fn trim_zeros(mut s: String) -> String {
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

fn parse_timestamp(text: &str) -> Option<i64> {
    for pat in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y%m%d%H%M%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, pat) {
            return Some(dt.and_utc().timestamp_micros());
        }
    }
    // Fall back to epoch seconds with optional fraction.
    match decimal::parse_scaled(text, 6) {
        Some(Ok(us)) => Some(us),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::VecRaw;
    use grove_types::Name;

    fn inline_field(def: FieldDef, offset: usize) -> Field {
        Field::assign(def, FieldStorage::Inline { offset })
    }

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    #[test]
    fn int_render_parse_round_trip() {
        let fld = inline_field(FieldDef::int_signed(name("Qty"), 4), 0);
        let mut rec = VecRaw::new(4, 0);
        for v in ["0", "500", "-12", "2147483647"] {
            fld.parse(&mut rec, v, OverflowPolicy::Strict).unwrap();
            assert_eq!(fld.render(&rec, None), v);
        }
    }

    #[test]
    fn int_null_sentinel() {
        let fld = inline_field(FieldDef::int_signed(name("Qty"), 2), 0);
        let mut rec = VecRaw::new(2, 0);
        assert!(!fld.is_null(&rec)); // zeroed record stores 0, not null
        fld.set_null(&mut rec).unwrap();
        assert!(fld.is_null(&rec));
        assert_eq!(fld.render(&rec, None), "");
        assert_eq!(fld.get_number(&rec, 0).unwrap(), None);
        // Unsigned null is the width maximum.
        let ufld = inline_field(FieldDef::int_unsigned(name("U"), 1), 0);
        let mut urec = VecRaw::new(1, 0);
        ufld.set_null(&mut urec).unwrap();
        assert_eq!(urec.inline[0], 0xff);
        assert!(ufld.is_null(&urec));
    }

    #[test]
    fn overflow_policy_ignore_saturate_strict() {
        let fld = inline_field(FieldDef::int_signed(name("Q"), 1), 0);
        let mut rec = VecRaw::new(1, 0);
        fld.parse(&mut rec, "100", OverflowPolicy::Strict).unwrap();

        // Ignore: value stays.
        fld.parse(&mut rec, "500", OverflowPolicy::Ignore).unwrap();
        assert_eq!(fld.render(&rec, None), "100");

        // Saturate: clamps to width max.
        fld.parse(&mut rec, "500", OverflowPolicy::Saturate).unwrap();
        assert_eq!(fld.render(&rec, None), "127");

        // Strict: reports overflow, leaves value.
        let err = fld.parse(&mut rec, "500", OverflowPolicy::Strict).unwrap_err();
        assert_eq!(err.code, OpCode::ValueOverflow);
        let err = fld.parse(&mut rec, "-500", OverflowPolicy::Strict).unwrap_err();
        assert_eq!(err.code, OpCode::ValueUnderflow);

        // Malformed text is ValueFormat regardless of policy.
        let err = fld.parse(&mut rec, "12abc", OverflowPolicy::Ignore).unwrap_err();
        assert_eq!(err.code, OpCode::ValueFormat);
    }

    #[test]
    fn decimal_scale_read_out() {
        let fld = inline_field(FieldDef::decimal(name("Px"), 2), 0);
        let mut rec = VecRaw::new(8, 0);
        fld.parse(&mut rec, "12.34", OverflowPolicy::Strict).unwrap();
        assert_eq!(fld.render(&rec, None), "12.34");
        // 12.34 read out at scale 1 rounds to 12.3 -> 123.
        assert_eq!(fld.get_number(&rec, 1).unwrap(), Some(123));
        assert_eq!(fld.get_number(&rec, 3).unwrap(), Some(12340));
        fld.put_number(&mut rec, 123, 1, OverflowPolicy::Strict).unwrap();
        assert_eq!(fld.render(&rec, None), "12.30");
    }

    #[test]
    fn chars_leading_nul_null_and_truncation() {
        let fld = inline_field(FieldDef::chars(name("Nm"), 4), 0);
        let mut rec = VecRaw::new(4, 0);
        assert!(fld.is_null(&rec));
        fld.parse(&mut rec, "ab", OverflowPolicy::Strict).unwrap();
        assert_eq!(fld.render(&rec, None), "ab");
        assert!(!fld.is_null(&rec));

        let err = fld.parse(&mut rec, "abcdef", OverflowPolicy::Strict).unwrap_err();
        assert_eq!(err.code, OpCode::ValueOverflow);
        fld.parse(&mut rec, "abcdef", OverflowPolicy::Saturate).unwrap();
        assert_eq!(fld.render(&rec, None), "abcd");

        fld.set_null(&mut rec).unwrap();
        assert!(fld.is_null(&rec));
        assert_eq!(fld.render(&rec, None), "");
    }

    #[test]
    fn bytes_hex_round_trip_and_null() {
        let fld = Field::assign(FieldDef::bytes(name("Blob")), FieldStorage::Blob { index: 0 });
        let mut rec = VecRaw::new(0, 1);
        assert!(fld.is_null(&rec));
        fld.parse(&mut rec, "deadbeef", OverflowPolicy::Strict).unwrap();
        assert_eq!(fld.render(&rec, None), "deadbeef");
        assert_eq!(rec.blobs[0], vec![0xde, 0xad, 0xbe, 0xef]);
        let err = fld.parse(&mut rec, "zz", OverflowPolicy::Strict).unwrap_err();
        assert_eq!(err.code, OpCode::ValueFormat);
        fld.parse(&mut rec, "", OverflowPolicy::Strict).unwrap();
        assert!(fld.is_null(&rec));
    }

    #[test]
    fn timestamp_render_parse() {
        let fld = inline_field(FieldDef::timestamp(name("Ts")), 0);
        let mut rec = VecRaw::new(8, 0);
        fld.parse(&mut rec, "2026-08-27T09:30:00.250000", OverflowPolicy::Strict).unwrap();
        assert_eq!(fld.render(&rec, None), "2026-08-27T09:30:00.250000");
        // Epoch-seconds text is accepted too.
        fld.parse(&mut rec, "0", OverflowPolicy::Strict).unwrap();
        assert_eq!(fld.render(&rec, None), "1970-01-01T00:00:00.000000");
    }

    #[test]
    fn time_interval_seconds() {
        let fld = inline_field(FieldDef::time_interval(name("Tm")), 0);
        let mut rec = VecRaw::new(8, 0);
        fld.parse(&mut rec, "1.5", OverflowPolicy::Strict).unwrap();
        assert_eq!(fld.get_number(&rec, 6).unwrap(), Some(1_500_000));
        assert_eq!(fld.render(&rec, None), "1.5");
    }

    #[test]
    fn read_only_rejects_writes() {
        let fld = inline_field(FieldDef::int_signed(name("Id"), 4).read_only(), 0);
        let mut rec = VecRaw::new(4, 0);
        assert_eq!(
            fld.parse(&mut rec, "1", OverflowPolicy::Strict).unwrap_err().code,
            OpCode::UnsupportedWrite
        );
        assert_eq!(fld.set_null(&mut rec).unwrap_err().code, OpCode::UnsupportedWrite);
        assert_eq!(
            fld.put_number(&mut rec, 1, 0, OverflowPolicy::Strict).unwrap_err().code,
            OpCode::UnsupportedWrite
        );
    }

    #[test]
    fn copy_and_compare() {
        let fld = inline_field(FieldDef::decimal(name("Px"), 2), 0);
        let mut a = VecRaw::new(8, 0);
        let mut b = VecRaw::new(8, 0);
        fld.parse(&mut a, "10.50", OverflowPolicy::Strict).unwrap();
        fld.parse(&mut b, "2.00", OverflowPolicy::Strict).unwrap();
        assert_eq!(fld.compare(&a, &b), Ordering::Greater);
        fld.copy(&mut b, &a).unwrap();
        assert_eq!(fld.compare(&a, &b), Ordering::Equal);
        fld.set_null(&mut b).unwrap();
        assert_eq!(fld.compare(&b, &a), Ordering::Less);
    }

    #[test]
    fn custom_cell_round_trip() {
        use std::sync::Mutex;
        struct Cell(Mutex<String>);
        impl CustomField for Cell {
            fn render(&self) -> String {
                self.0.lock().expect("lock poisoned").clone()
            }
            fn parse(&self, text: &str) -> OpResult<()> {
                *self.0.lock().expect("lock poisoned") = text.to_string();
                Ok(())
            }
        }
        let cell = Arc::new(Cell(Mutex::new(String::new())));
        let fld = Field::assign(
            FieldDef::custom(name("Env"), cell.clone()),
            FieldStorage::Custom(cell),
        );
        let mut rec = VecRaw::new(0, 0);
        fld.parse(&mut rec, "hello", OverflowPolicy::Strict).unwrap();
        assert_eq!(fld.render(&rec, None), "hello");
    }

    #[test]
    fn width_format_spec() {
        let fld = inline_field(FieldDef::int_signed(name("Q"), 4), 0);
        let mut rec = VecRaw::new(4, 0);
        fld.parse(&mut rec, "42", OverflowPolicy::Strict).unwrap();
        assert_eq!(fld.render(&rec, Some("5")), "   42");
        assert_eq!(fld.render(&rec, Some("-5")), "42   ");
    }
}
