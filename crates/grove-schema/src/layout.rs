use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use grove_field::{FieldDescriptor, FieldType};
use grove_types::{Name, OpCode, OpError, OpResult};

use crate::tab::{SchemaError, Tab, TabFlags};

/// The key column of a layout. Keys live as container keys, not inside the
/// record arena; this definition names the key for introspection and
/// validates key text for typed-key trees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDef {
    pub name: Name,
    pub r#type: FieldType,
}

impl KeyDef {
    pub fn chars(name: Name) -> Self {
        Self {
            name,
            r#type: FieldType::Chars,
        }
    }

    pub fn unsigned(name: Name) -> Self {
        Self {
            name,
            r#type: FieldType::IntUnsigned,
        }
    }

    /// Validate key text against the key type.
    pub fn validate(&self, key: &str) -> OpResult<()> {
        if key.is_empty() {
            return Err(OpError::with_message(OpCode::KeyFormat, "empty key"));
        }
        match self.r#type {
            FieldType::IntUnsigned | FieldType::IntSigned => {
                if key.parse::<i64>().is_err() {
                    return Err(OpError::with_message(
                        OpCode::KeyFormat,
                        format!("key {key:?} is not numeric"),
                    ));
                }
                if self.r#type == FieldType::IntUnsigned && key.starts_with('-') {
                    return Err(OpError::with_message(
                        OpCode::KeyFormat,
                        format!("key {key:?} is negative"),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

enum Body {
    /// Tab set fixed at construction.
    Fixed(Vec<Arc<Tab>>),
    /// Tabs may be appended at runtime, never removed, so records built
    /// under an earlier tab stay valid.
    Dynamic(RwLock<Vec<Arc<Tab>>>),
}

/// The full schema for one tree node: one key definition plus 1..N tabs.
/// Shared by `Arc` across every tree with this shape.
pub struct Layout {
    key: KeyDef,
    body: Body,
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("key", &self.key)
            .field("tab_count", &self.tab_count())
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

fn index_tabs(tabs: Vec<Tab>) -> Result<Vec<Arc<Tab>>, SchemaError> {
    if tabs.is_empty() {
        return Err(SchemaError::NoTabs);
    }
    let mut out: Vec<Arc<Tab>> = Vec::with_capacity(tabs.len());
    for (i, mut tab) in tabs.into_iter().enumerate() {
        if out.iter().any(|t| t.name() == tab.name()) {
            return Err(SchemaError::DuplicateTab(tab.name().clone()));
        }
        tab.set_index(i);
        out.push(Arc::new(tab));
    }
    Ok(out)
}

impl Layout {
    /// Fixed single-tab layout, the common case.
    pub fn single(key: KeyDef, tab: Tab) -> Result<Arc<Layout>, SchemaError> {
        Self::fixed(key, vec![tab])
    }

    /// Fixed multi-tab layout.
    pub fn fixed(key: KeyDef, tabs: Vec<Tab>) -> Result<Arc<Layout>, SchemaError> {
        Ok(Arc::new(Layout {
            key,
            body: Body::Fixed(index_tabs(tabs)?),
        }))
    }

    /// Dynamically-extensible multi-tab layout.
    pub fn dynamic(key: KeyDef, tabs: Vec<Tab>) -> Result<Arc<Layout>, SchemaError> {
        Ok(Arc::new(Layout {
            key,
            body: Body::Dynamic(RwLock::new(index_tabs(tabs)?)),
        }))
    }

    pub fn key(&self) -> &KeyDef {
        &self.key
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.body, Body::Dynamic(_))
    }

    pub fn tab_count(&self) -> usize {
        match &self.body {
            Body::Fixed(tabs) => tabs.len(),
            Body::Dynamic(tabs) => tabs.read().expect("layout lock poisoned").len(),
        }
    }

    pub fn tab_at(&self, index: usize) -> Option<Arc<Tab>> {
        match &self.body {
            Body::Fixed(tabs) => tabs.get(index).cloned(),
            Body::Dynamic(tabs) => tabs.read().expect("layout lock poisoned").get(index).cloned(),
        }
    }

    pub fn tab(&self, name: &str) -> Option<Arc<Tab>> {
        match &self.body {
            Body::Fixed(tabs) => tabs.iter().find(|t| t.name() == name).cloned(),
            Body::Dynamic(tabs) => tabs
                .read()
                .expect("layout lock poisoned")
                .iter()
                .find(|t| t.name() == name)
                .cloned(),
        }
    }

    /// The first tab: every layout has at least one.
    pub fn first_tab(&self) -> Arc<Tab> {
        self.tab_at(0).expect("layout holds at least one tab")
    }

    /// Snapshot of all tabs in index order.
    pub fn tabs(&self) -> Vec<Arc<Tab>> {
        match &self.body {
            Body::Fixed(tabs) => tabs.clone(),
            Body::Dynamic(tabs) => tabs.read().expect("layout lock poisoned").clone(),
        }
    }

    /// Append a tab to a dynamic layout. Returns the new tab's index.
    pub fn append_tab(&self, mut tab: Tab) -> Result<usize, SchemaError> {
        match &self.body {
            Body::Fixed(_) => Err(SchemaError::NotDynamic),
            Body::Dynamic(tabs) => {
                let mut tabs = tabs.write().expect("layout lock poisoned");
                if tabs.iter().any(|t| t.name() == tab.name()) {
                    return Err(SchemaError::DuplicateTab(tab.name().clone()));
                }
                let index = tabs.len();
                tab.set_index(index);
                tabs.push(Arc::new(tab));
                Ok(index)
            }
        }
    }

    /// The recursive introspection descriptor for remote schema discovery.
    pub fn descriptor(&self) -> LayoutDescriptor {
        LayoutDescriptor {
            key: self.key.clone(),
            dynamic: self.is_dynamic(),
            tabs: self
                .tabs()
                .iter()
                .map(|tab| TabDescriptor {
                    name: tab.name().clone(),
                    flags: tab.flags(),
                    fields: tab.fields().iter().map(|f| f.descriptor()).collect(),
                    sapling: tab
                        .sapling_layout()
                        .map(|l| Box::new(l.descriptor())),
                })
                .collect(),
        }
    }
}

/// Introspection record for one tab.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TabDescriptor {
    pub name: Name,
    pub flags: TabFlags,
    pub fields: Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sapling: Option<Box<LayoutDescriptor>>,
}

/// Recursive introspection descriptor for a whole layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    pub key: KeyDef,
    #[serde(default)]
    pub dynamic: bool,
    pub tabs: Vec<TabDescriptor>,
}
