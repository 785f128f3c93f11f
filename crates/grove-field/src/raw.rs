//! Physical record storage contract.
//!
//! A record owns a fixed inline byte arena plus zero or more variable-length
//! blob buffers. Fields never touch storage directly; they go through these
//! traits with offsets the owning tab computed at schema-build time.

/// Read access to one record's storage.
pub trait RawRead {
    /// The fixed inline arena. Integer, decimal, and fixed char fields live
    /// here at tab-computed offsets.
    fn inline(&self) -> &[u8];

    /// One variable-length blob buffer, by tab-computed index.
    /// `None` if the record carries no such blob (schema mismatch).
    fn blob(&self, index: usize) -> Option<&[u8]>;
}

/// Write access to one record's storage.
pub trait RawWrite: RawRead {
    fn inline_mut(&mut self) -> &mut [u8];

    fn blob_mut(&mut self, index: usize) -> Option<&mut Vec<u8>>;
}

/// A minimal standalone record used by tests in this crate; the real record
/// arena lives in `grove-schema`.
#[derive(Debug, Clone, Default)]
pub struct VecRaw {
    pub inline: Vec<u8>,
    pub blobs: Vec<Vec<u8>>,
}

impl VecRaw {
    pub fn new(inline_size: usize, blob_count: usize) -> Self {
        Self {
            inline: vec![0; inline_size],
            blobs: vec![Vec::new(); blob_count],
        }
    }
}

impl RawRead for VecRaw {
    fn inline(&self) -> &[u8] {
        &self.inline
    }

    fn blob(&self, index: usize) -> Option<&[u8]> {
        self.blobs.get(index).map(Vec::as_slice)
    }
}

impl RawWrite for VecRaw {
    fn inline_mut(&mut self) -> &mut [u8] {
        &mut self.inline
    }

    fn blob_mut(&mut self, index: usize) -> Option<&mut Vec<u8>> {
        self.blobs.get_mut(index)
    }
}
