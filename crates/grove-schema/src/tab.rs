use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use grove_field::{Field, FieldDef, FieldStorage, FieldType};
use grove_types::{Name, OpCode, OpError};

use crate::layout::Layout;
use crate::record::Record;

/// Capability flags of a tab.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabFlags {
    /// Seeds under this tab accept field writes.
    #[serde(default)]
    pub writable: bool,
    /// Each pod may hang a child tree off this tab.
    #[serde(default)]
    pub has_sapling: bool,
    /// Seeds under this tab accept `on_command`.
    #[serde(default)]
    pub supports_command: bool,
    /// Bulk changes must go through the clone/edit/apply workflow.
    #[serde(default)]
    pub needs_apply: bool,
}

impl TabFlags {
    pub const WRITABLE: TabFlags = TabFlags {
        writable: true,
        has_sapling: false,
        supports_command: false,
        needs_apply: false,
    };
}

/// Schema construction failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate field name {0:?} in tab")]
    DuplicateField(Name),
    #[error("duplicate tab name {0:?} in layout")]
    DuplicateTab(Name),
    #[error("layout needs at least one tab")]
    NoTabs,
    #[error("field {0:?}: invalid size {1} for {2:?}")]
    BadFieldSize(Name, usize, FieldType),
    #[error("layout is not dynamically extensible")]
    NotDynamic,
}

impl From<SchemaError> for OpError {
    fn from(err: SchemaError) -> Self {
        OpError::with_message(OpCode::ValueFormat, err.to_string())
    }
}

/// An ordered, immutable list of fields plus flags plus an optional child
/// layout. Identity is the name, unique within the owning layout.
pub struct Tab {
    name: Name,
    fields: Vec<Field>,
    by_name: HashMap<Name, usize>,
    flags: TabFlags,
    sapling_layout: Option<Arc<Layout>>,
    inline_size: usize,
    blob_count: usize,
    index: usize,
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("flags", &self.flags)
            .field("inline_size", &self.inline_size)
            .field("blob_count", &self.blob_count)
            .field("index", &self.index)
            .finish()
    }
}

impl Tab {
    /// Build a tab from declared fields.
    ///
    /// Rejects duplicate field names. Inline offsets and blob indices are
    /// assigned in declaration order; the total inline size and blob count
    /// are fixed here and size every record built under this tab.
    pub fn build(
        name: Name,
        defs: Vec<FieldDef>,
        flags: TabFlags,
        sapling_layout: Option<Arc<Layout>>,
    ) -> Result<Tab, SchemaError> {
        let mut fields = Vec::with_capacity(defs.len());
        let mut by_name = HashMap::with_capacity(defs.len());
        let mut inline_size = 0usize;
        let mut blob_count = 0usize;

        for def in defs {
            if by_name.contains_key(&def.name) {
                return Err(SchemaError::DuplicateField(def.name));
            }
            validate_size(&def)?;
            let storage = if let Some(cell) = &def.custom {
                FieldStorage::Custom(cell.clone())
            } else {
                match def.ftype {
                    FieldType::Bytes => {
                        let index = blob_count;
                        blob_count += 1;
                        FieldStorage::Blob { index }
                    }
                    _ => {
                        let offset = inline_size;
                        inline_size += def.size;
                        FieldStorage::Inline { offset }
                    }
                }
            };
            by_name.insert(def.name.clone(), fields.len());
            fields.push(Field::assign(def, storage));
        }

        Ok(Tab {
            name,
            fields,
            by_name,
            flags,
            sapling_layout,
            inline_size,
            blob_count,
            index: 0,
        })
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn flags(&self) -> TabFlags {
        self.flags
    }

    /// Position of this tab within its layout.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    pub fn field_at(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Total byte size of the inline arena of records under this tab.
    pub fn inline_size(&self) -> usize {
        self.inline_size
    }

    /// Number of blob buffers records under this tab carry.
    pub fn blob_count(&self) -> usize {
        self.blob_count
    }

    pub fn sapling_layout(&self) -> Option<&Arc<Layout>> {
        self.sapling_layout.as_ref()
    }

    /// Allocate a record sized for this tab with every field null.
    pub fn new_record(&self) -> Record {
        let mut rec = Record::with_capacity(self.inline_size, self.blob_count);
        for field in &self.fields {
            if matches!(field.storage(), FieldStorage::Custom(_)) {
                continue;
            }
            // Sizes were validated at build; init cannot fail on a fresh arena.
            let _ = field.init_null(&mut rec);
        }
        rec
    }
}

fn validate_size(def: &FieldDef) -> Result<(), SchemaError> {
    if def.custom.is_some() {
        return Ok(());
    }
    let ok = match def.ftype {
        FieldType::Bytes => true,
        FieldType::Chars => def.size > 0,
        FieldType::IntSigned | FieldType::IntUnsigned => matches!(def.size, 1 | 2 | 4 | 8),
        FieldType::Decimal | FieldType::TimeStamp | FieldType::TimeInterval => def.size == 8,
    };
    if ok {
        Ok(())
    } else {
        Err(SchemaError::BadFieldSize(def.name.clone(), def.size, def.ftype))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_field::{OverflowPolicy, RawRead};

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    #[test]
    fn offsets_assigned_in_declaration_order() {
        let tab = Tab::build(
            name("Base"),
            vec![
                FieldDef::int_signed(name("Qty"), 4),
                FieldDef::chars(name("Nm"), 8),
                FieldDef::bytes(name("Cfg")),
                FieldDef::decimal(name("Px"), 2),
                FieldDef::bytes(name("Note")),
            ],
            TabFlags::WRITABLE,
            None,
        )
        .unwrap();

        assert_eq!(tab.inline_size(), 4 + 8 + 8);
        assert_eq!(tab.blob_count(), 2);
        let offsets: Vec<_> = tab
            .fields()
            .iter()
            .map(|f| format!("{:?}", f.storage()))
            .collect();
        assert_eq!(
            offsets,
            vec![
                "Inline{offset:0}",
                "Inline{offset:4}",
                "Blob{index:0}",
                "Inline{offset:12}",
                "Blob{index:1}",
            ]
        );
    }

    #[test]
    fn duplicate_field_rejected() {
        let err = Tab::build(
            name("T"),
            vec![
                FieldDef::int_signed(name("Qty"), 4),
                FieldDef::decimal(name("Qty"), 2),
            ],
            TabFlags::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField(name("Qty")));
    }

    #[test]
    fn bad_sizes_rejected() {
        let err = Tab::build(
            name("T"),
            vec![FieldDef::int_signed(name("Q"), 3)],
            TabFlags::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::BadFieldSize(_, 3, FieldType::IntSigned)));
        let err = Tab::build(
            name("T"),
            vec![FieldDef::chars(name("C"), 0)],
            TabFlags::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::BadFieldSize(_, 0, FieldType::Chars)));
    }

    #[test]
    fn schema_errors_flow_through_op_results() {
        fn build() -> grove_types::OpResult<()> {
            Tab::build(
                name("T"),
                vec![FieldDef::int_signed(name("Q"), 3)],
                TabFlags::default(),
                None,
            )?;
            Ok(())
        }
        let err = build().unwrap_err();
        assert_eq!(err.code, OpCode::ValueFormat);
        assert!(err.message.contains("invalid size 3"));
    }

    #[test]
    fn new_record_is_all_null() {
        let tab = Tab::build(
            name("T"),
            vec![
                FieldDef::int_signed(name("Qty"), 4),
                FieldDef::chars(name("Nm"), 8),
                FieldDef::bytes(name("B")),
            ],
            TabFlags::WRITABLE,
            None,
        )
        .unwrap();
        let mut rec = tab.new_record();
        assert_eq!(rec.inline_len(), tab.inline_size());
        assert_eq!(rec.blob_count(), tab.blob_count());
        for f in tab.fields() {
            assert!(f.is_null(&rec), "{} should start null", f.name());
        }
        tab.field("Qty")
            .unwrap()
            .parse(&mut rec, "100", OverflowPolicy::Strict)
            .unwrap();
        assert_eq!(tab.field("Qty").unwrap().render(&rec, None), "100");
        assert!(tab.field("Nm").unwrap().is_null(&rec));
        assert!(rec.blob(0).unwrap().is_empty());
    }
}
