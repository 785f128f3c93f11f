use grove_field::{RawRead, RawWrite};

/// The physical arena behind one seed: a fixed inline byte block plus one
/// owned buffer per blob field, both sized by the owning tab.
///
/// Records are only built through [`Tab::new_record`](crate::Tab::new_record),
/// which sizes the arena and null-initializes every field; all access goes
/// through the tab's fields, never through the raw buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    inline: Box<[u8]>,
    blobs: Vec<Vec<u8>>,
}

impl Record {
    pub(crate) fn with_capacity(inline_size: usize, blob_count: usize) -> Self {
        Self {
            inline: vec![0u8; inline_size].into_boxed_slice(),
            blobs: vec![Vec::new(); blob_count],
        }
    }

    pub fn inline_len(&self) -> usize {
        self.inline.len()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }
}

impl RawRead for Record {
    fn inline(&self) -> &[u8] {
        &self.inline
    }

    fn blob(&self, index: usize) -> Option<&[u8]> {
        self.blobs.get(index).map(Vec::as_slice)
    }
}

impl RawWrite for Record {
    fn inline_mut(&mut self) -> &mut [u8] {
        &mut self.inline
    }

    fn blob_mut(&mut self, index: usize) -> Option<&mut Vec<u8>> {
        self.blobs.get_mut(index)
    }
}
