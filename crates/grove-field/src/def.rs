use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use grove_types::{Name, OpResult};

use crate::decimal::DecScale;

/// Semantic type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Byte blob, rendered as hex.
    Bytes,
    /// Fixed-capacity character buffer, NUL padded.
    Chars,
    /// Signed integer, 1/2/4/8 bytes.
    IntSigned,
    /// Unsigned integer, 1/2/4/8 bytes.
    IntUnsigned,
    /// Fixed-point decimal: scaled `i64`.
    Decimal,
    /// Microseconds since the UNIX epoch.
    TimeStamp,
    /// Signed microsecond duration.
    TimeInterval,
}

impl FieldType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::IntSigned
                | FieldType::IntUnsigned
                | FieldType::Decimal
                | FieldType::TimeStamp
                | FieldType::TimeInterval
        )
    }

    /// One-letter tag used by the layout descriptor.
    pub fn tag(self) -> char {
        match self {
            FieldType::Bytes => 'B',
            FieldType::Chars => 'C',
            FieldType::IntSigned => 'S',
            FieldType::IntUnsigned => 'U',
            FieldType::Decimal => 'D',
            FieldType::TimeStamp => 'T',
            FieldType::TimeInterval => 'I',
        }
    }
}

/// Capability flags of a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFlags {
    /// Writes through this field are rejected with an unsupported-write
    /// outcome. UI modules treat attempts to write as protocol violations.
    #[serde(default)]
    pub read_only: bool,
    /// Display-only hint: omit from UI transmission.
    #[serde(default)]
    pub hidden: bool,
}

impl FieldFlags {
    pub const RO: FieldFlags = FieldFlags {
        read_only: true,
        hidden: false,
    };
}

/// What to do when numeric text exceeds a field's representable range.
/// Malformed (non-numeric) text is always a value-format outcome; this
/// policy only governs well-formed but out-of-range values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Leave the stored value untouched and report success.
    #[default]
    Ignore,
    /// Clamp to the nearest representable value.
    Saturate,
    /// Report `ValueOverflow`/`ValueUnderflow`.
    Strict,
}

/// A caller-supplied virtual backing cell: the third storage origin besides
/// inline and blob. The cell owns its own synchronization.
pub trait CustomField: Send + Sync {
    fn render(&self) -> String;
    fn parse(&self, text: &str) -> OpResult<()>;
}

impl fmt::Debug for dyn CustomField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<custom field>")
    }
}

/// A field as declared by a schema author, before the owning tab assigns
/// physical storage. `size` is the inline byte width (integers, decimal,
/// chars); blob and custom fields ignore it.
#[derive(Clone)]
pub struct FieldDef {
    pub name: Name,
    pub ftype: FieldType,
    pub size: usize,
    pub scale: DecScale,
    pub flags: FieldFlags,
    pub custom: Option<Arc<dyn CustomField>>,
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("ftype", &self.ftype)
            .field("size", &self.size)
            .field("scale", &self.scale)
            .field("flags", &self.flags)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl FieldDef {
    fn new(name: Name, ftype: FieldType, size: usize, scale: DecScale) -> Self {
        Self {
            name,
            ftype,
            size,
            scale,
            flags: FieldFlags::default(),
            custom: None,
        }
    }

    /// Variable-length byte blob.
    pub fn bytes(name: Name) -> Self {
        Self::new(name, FieldType::Bytes, 0, 0)
    }

    /// Fixed-capacity character buffer.
    pub fn chars(name: Name, size: usize) -> Self {
        Self::new(name, FieldType::Chars, size, 0)
    }

    /// Signed integer of 1, 2, 4, or 8 bytes. Sizes are validated when the
    /// def is built into a tab.
    pub fn int_signed(name: Name, size: usize) -> Self {
        Self::new(name, FieldType::IntSigned, size, 0)
    }

    /// Unsigned integer of 1, 2, 4, or 8 bytes. Sizes are validated when the
    /// def is built into a tab.
    pub fn int_unsigned(name: Name, size: usize) -> Self {
        Self::new(name, FieldType::IntUnsigned, size, 0)
    }

    /// Fixed-point decimal stored in 8 bytes with `scale` fraction digits.
    pub fn decimal(name: Name, scale: DecScale) -> Self {
        Self::new(name, FieldType::Decimal, 8, scale)
    }

    /// Microsecond timestamp.
    pub fn timestamp(name: Name) -> Self {
        Self::new(name, FieldType::TimeStamp, 8, 6)
    }

    /// Microsecond duration.
    pub fn time_interval(name: Name) -> Self {
        Self::new(name, FieldType::TimeInterval, 8, 6)
    }

    /// A virtual cell backed by caller-supplied storage.
    pub fn custom(name: Name, cell: Arc<dyn CustomField>) -> Self {
        let mut def = Self::new(name, FieldType::Chars, 0, 0);
        def.custom = Some(cell);
        def
    }

    pub fn read_only(mut self) -> Self {
        self.flags.read_only = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.flags.hidden = true;
        self
    }
}
