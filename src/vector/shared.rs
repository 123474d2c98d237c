//! Read-only shared matrix region.
//!
//! The specialized model matrix is copied once into an anonymous memory map
//! which is then sealed read-only. Worker threads borrow the model and read
//! the mapped rows directly; nothing is copied per worker. The map is released
//! when the owning [`SharedModel`] is dropped, which happens after every
//! borrower has been joined.

use std::io;
use std::ops::Deref;

use memmap2::{Mmap, MmapMut};

use crate::vector::embedding::ScdvModel;

const BYTES_PER_F32: usize = std::mem::size_of::<f32>();

/// Sealed, read-only region holding a flat `f32` matrix.
#[derive(Debug)]
pub struct SharedRegion {
    map: Mmap,
    len: usize,
}

impl SharedRegion {
    /// Copies `values` into a fresh anonymous map and seals it read-only.
    pub fn publish(values: &[f32]) -> io::Result<Self> {
        // Zero-length anonymous maps are rejected on some platforms.
        let bytes = (values.len() * BYTES_PER_F32).max(BYTES_PER_F32);
        let mut map = MmapMut::map_anon(bytes)?;
        for (dst, v) in map.chunks_exact_mut(BYTES_PER_F32).zip(values) {
            dst.copy_from_slice(&v.to_ne_bytes());
        }
        let map = map.make_read_only()?;

        tracing::debug!(bytes, "published shared model region");
        Ok(Self {
            map,
            len: values.len(),
        })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        // SAFETY: anonymous maps are page aligned, the first `len * 4` bytes
        // were written as native-endian f32 values before sealing, and the
        // map stays alive and immutable for as long as `self` is borrowed.
        unsafe { std::slice::from_raw_parts(self.map.as_ptr().cast::<f32>(), self.len) }
    }

    /// Size of the mapping in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.map.len()
    }
}

/// A specialized model whose matrix lives in a [`SharedRegion`].
///
/// Scoped to one query: create it after specialization, lend `&SharedModel`
/// to the workers, and drop it once they are joined.
#[derive(Debug)]
pub struct SharedModel {
    model: ScdvModel,
}

impl SharedModel {
    pub(crate) fn new(model: ScdvModel) -> Self {
        Self { model }
    }
}

impl Deref for SharedModel {
    type Target = ScdvModel;

    fn deref(&self) -> &ScdvModel {
        &self.model
    }
}

impl Drop for SharedModel {
    fn drop(&mut self) {
        tracing::debug!(
            words = self.model.vocabulary_size(),
            "releasing shared model region"
        );
    }
}
