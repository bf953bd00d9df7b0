use super::{BitArray, backing_file_len, byte_position, check_index, open_backing_file};
use crate::error::{BloomError, Result};
use memmap2::MmapMut;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub(crate) const BACKEND_NAME: &str = "memory-mapped";

/// Mapping and the file it maps. Field order matters: the mapping is
/// dropped before the file handle.
struct MappedFile {
    mmap: MmapMut,
    _file: File,
}

/// Bit array backed by a read-write memory mapping of a file.
///
/// Uses the same on-disk layout as [`super::FileBackedBitArray`]. Bit
/// operations are plain memory accesses; the OS writes dirty pages back,
/// and [`BitArray::flush`] forces it. `close` flushes and unmaps before
/// the file handle is released. `or`/`and` are not supported.
pub struct MmapBitArray {
    mapped: Option<MappedFile>,
    path: PathBuf,
    max_elements: usize,
}

impl MmapBitArray {
    pub fn open(path: impl AsRef<Path>, max_elements: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = open_backing_file(path, max_elements)?;

        // SAFETY: the file is exclusively locked by this instance for as long
        // as the mapping lives, so no other bit array resizes or rewrites it
        // underneath us.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        debug_assert!(mmap.len() as u64 >= backing_file_len(max_elements));

        Ok(Self {
            mapped: Some(MappedFile { mmap, _file: file }),
            path: path.to_path_buf(),
            max_elements,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn bytes(&self) -> Result<&[u8]> {
        self.mapped
            .as_ref()
            .map(|m| &m.mmap[..])
            .ok_or(BloomError::Closed)
    }

    fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        self.mapped
            .as_mut()
            .map(|m| &mut m.mmap[..])
            .ok_or(BloomError::Closed)
    }

    fn layout_bytes_mut(&mut self) -> Result<&mut [u8]> {
        let len = backing_file_len(self.max_elements) as usize;
        Ok(&mut self.bytes_mut()?[..len])
    }
}

impl std::fmt::Debug for MmapBitArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapBitArray")
            .field("path", &self.path)
            .field("max_elements", &self.max_elements)
            .field("closed", &self.mapped.is_none())
            .finish()
    }
}

impl BitArray for MmapBitArray {
    fn get_bit(&self, index: usize) -> Result<bool> {
        check_index(index, self.max_elements)?;
        let (pos, mask) = byte_position(index);
        Ok(self.bytes()?[pos as usize] & mask != 0)
    }

    fn set_bit(&mut self, index: usize) -> Result<bool> {
        check_index(index, self.max_elements)?;
        let (pos, mask) = byte_position(index);
        let byte = &mut self.bytes_mut()?[pos as usize];
        let changed = *byte & mask == 0;
        *byte |= mask;
        Ok(changed)
    }

    fn clear_bit(&mut self, index: usize) -> Result<()> {
        check_index(index, self.max_elements)?;
        let (pos, mask) = byte_position(index);
        self.bytes_mut()?[pos as usize] &= !mask;
        Ok(())
    }

    fn set_bit_if_unset(&mut self, index: usize) -> Result<bool> {
        self.set_bit(index)
    }

    fn clear(&mut self) -> Result<()> {
        self.layout_bytes_mut()?.fill(0);
        Ok(())
    }

    fn or(&mut self, _other: &dyn BitArray) -> Result<()> {
        Err(BloomError::Unsupported {
            operation: "or",
            backend: BACKEND_NAME,
        })
    }

    fn and(&mut self, _other: &dyn BitArray) -> Result<()> {
        Err(BloomError::Unsupported {
            operation: "and",
            backend: BACKEND_NAME,
        })
    }

    fn bit_size(&self) -> usize {
        self.max_elements
    }

    fn count_ones(&self) -> Result<usize> {
        let bytes = self.bytes()?;
        let full_bytes = self.max_elements / 8;
        let tail_bits = self.max_elements % 8;

        let mut ones: usize =
            bytes[..full_bytes].iter().map(|b| b.count_ones() as usize).sum();
        if tail_bits > 0 {
            let mask = (1u8 << tail_bits) - 1;
            ones += (bytes[full_bytes] & mask).count_ones() as usize;
        }
        Ok(ones)
    }

    fn flush(&mut self) -> Result<()> {
        match self.mapped.as_ref() {
            Some(mapped) => Ok(mapped.mmap.flush()?),
            None => Err(BloomError::Closed),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(MappedFile { mmap, _file: file }) = self.mapped.take() {
            let flushed = mmap.flush();
            // unmap first, then release the file handle and its lock
            drop(mmap);
            drop(file);
            flushed?;
            debug!(path = %self.path.display(), "Closed memory-mapped bit array");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }
}

impl Drop for MmapBitArray {
    fn drop(&mut self) {
        if let Some(mapped) = self.mapped.take() {
            if let Err(e) = mapped.mmap.flush() {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to flush unclosed memory-mapped bit array"
                );
            }
        }
    }
}
