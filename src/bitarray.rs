//! Fixed-size bit arrays the Bloom filter stores its state in.
//!
//! Three interchangeable backends share the [`BitArray`] contract:
//!
//! - [`InMemoryBitArray`]: packed 64-bit words on the heap.
//! - [`FileBackedBitArray`]: one seek + read (and seek + write for
//!   mutations) per bit operation on a plain file. Durable, slow.
//! - [`MmapBitArray`]: the same file layout mapped into memory; bit
//!   operations run at memory speed and the OS handles writeback.
//!
//! Both disk backends use the identical on-disk layout: a flat file of
//! `bits / 8 + 1` bytes, bit `i` living in byte `i >> 3` at position
//! `i & 7` (LSB first), no header. A file written by one can be opened by
//! the other.
//!
//! Every backend moves through `Ready -> Closed`; any operation after
//! [`BitArray::close`] fails with [`BloomError::Closed`].
pub mod file;
pub mod memory;
pub mod mmap;

pub use file::FileBackedBitArray;
pub use memory::InMemoryBitArray;
pub use mmap::MmapBitArray;

use crate::error::{BloomError, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait BitArray: Send {
    /// Reads the bit at `index`
    fn get_bit(&self, index: usize) -> Result<bool>;
    /// Sets the bit at `index`, returning whether it flipped from 0 to 1
    fn set_bit(&mut self, index: usize) -> Result<bool>;
    /// Clears the bit at `index`
    fn clear_bit(&mut self, index: usize) -> Result<()>;
    /// Sets the bit only if it is currently unset, returning whether it changed
    fn set_bit_if_unset(&mut self, index: usize) -> Result<bool>;
    /// Clears every bit
    fn clear(&mut self) -> Result<()>;
    /// In-place bitwise OR with an array of the same size
    fn or(&mut self, other: &dyn BitArray) -> Result<()>;
    /// In-place bitwise AND with an array of the same size
    fn and(&mut self, other: &dyn BitArray) -> Result<()>;
    /// Number of addressable bits, fixed for the lifetime of the array
    fn bit_size(&self) -> usize;
    /// Number of set bits
    fn count_ones(&self) -> Result<usize>;
    /// Pushes pending writes down to the backing store
    fn flush(&mut self) -> Result<()>;
    /// Releases the backing store; the array is unusable afterwards
    fn close(&mut self) -> Result<()>;
    /// Short backend name used in logs and errors
    fn backend_name(&self) -> &'static str;
}

/// Which storage a filter's bit array lives in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BitArrayBackend {
    #[default]
    InMemory,
    FileBacked(PathBuf),
    MemoryMapped(PathBuf),
}

impl BitArrayBackend {
    pub fn name(&self) -> &'static str {
        match self {
            BitArrayBackend::InMemory => memory::BACKEND_NAME,
            BitArrayBackend::FileBacked(_) => file::BACKEND_NAME,
            BitArrayBackend::MemoryMapped(_) => mmap::BACKEND_NAME,
        }
    }
}

/// Builds a bit array of `num_bits` bits in the requested backend.
pub fn create_bit_array(
    backend: &BitArrayBackend,
    num_bits: usize,
) -> Result<Box<dyn BitArray>> {
    Ok(match backend {
        BitArrayBackend::InMemory => Box::new(InMemoryBitArray::new(num_bits)?),
        BitArrayBackend::FileBacked(path) => {
            Box::new(FileBackedBitArray::open(path, num_bits)?)
        }
        BitArrayBackend::MemoryMapped(path) => {
            Box::new(MmapBitArray::open(path, num_bits)?)
        }
    })
}

/// Size in bytes of the on-disk layout for `max_elements` bits.
pub fn backing_file_len(max_elements: usize) -> u64 {
    ((max_elements >> 3) + 1) as u64
}

#[inline]
pub(crate) fn check_index(index: usize, capacity: usize) -> Result<()> {
    if index >= capacity {
        return Err(BloomError::IndexOutOfBounds { index, capacity });
    }
    Ok(())
}

#[inline]
pub(crate) fn check_same_size(expected: usize, other: &dyn BitArray) -> Result<()> {
    let actual = other.bit_size();
    if expected != actual {
        return Err(BloomError::SizeMismatch { expected, actual });
    }
    Ok(())
}

/// Byte offset and in-byte mask of bit `index` in the disk layout.
#[inline]
pub(crate) fn byte_position(index: usize) -> (u64, u8) {
    ((index >> 3) as u64, 1u8 << (index & 0x7))
}

/// Contention means another array owns the file; anything else is an I/O
/// failure of the store itself.
fn lock_error(path: &Path, err: std::io::Error) -> BloomError {
    if err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
    {
        BloomError::BackingStoreLocked(path.to_path_buf())
    } else {
        BloomError::BackingStoreUnavailable(err)
    }
}

/// Opens (creating if needed) and exclusively locks the backing file, then
/// grows it to the layout size. Existing contents are never truncated.
pub(crate) fn open_backing_file(path: &Path, max_elements: usize) -> Result<File> {
    use fs2::FileExt;

    if max_elements == 0 {
        return Err(BloomError::InvalidArgument(
            "Max elements in array must be greater than zero".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(BloomError::InvalidArgument(format!(
            "Backing file {} is a directory",
            path.display()
        )));
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    file.try_lock_exclusive()
        .map_err(|e| lock_error(path, e))?;

    let required = backing_file_len(max_elements);
    let current = file.metadata()?.len();
    if current < required {
        // set_len zero-fills the extension
        file.set_len(required)?;
        debug!(
            path = %path.display(),
            from = current,
            to = required,
            "Extended bit array backing file"
        );
    }

    Ok(file)
}
