use super::{BitArray, backing_file_len, byte_position, check_index, open_backing_file};
use crate::error::{BloomError, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub(crate) const BACKEND_NAME: &str = "file-backed";

const CLEAR_CHUNK_BYTES: usize = 64 * 1024;

/// Bit array stored directly in a file, one byte per eight bits.
///
/// Every bit operation is a synchronous seek + read, and mutations add a
/// seek + write, so each call costs one or two disk round trips. Keep the
/// file on a local disk.
///
/// Not safe for concurrent use; the backing file is locked exclusively for
/// the lifetime of the array. `or`/`and` are not supported.
#[derive(Debug)]
pub struct FileBackedBitArray {
    file: Option<File>,
    path: PathBuf,
    max_elements: usize,
    num_bytes: u64,
}

impl FileBackedBitArray {
    /// Opens `path` as a bit array of `max_elements` bits, creating the file
    /// and zero-extending it to `max_elements / 8 + 1` bytes if needed.
    pub fn open(path: impl AsRef<Path>, max_elements: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = open_backing_file(path, max_elements)?;

        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
            max_elements,
            num_bytes: backing_file_len(max_elements),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(BloomError::Closed)
    }

    fn read_byte(&self, pos: u64) -> Result<u8> {
        let mut file = self.file()?;
        let mut byte = [0u8; 1];
        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn write_byte(&self, pos: u64, value: u8) -> Result<()> {
        let mut file = self.file()?;
        file.seek(SeekFrom::Start(pos))?;
        file.write_all(&[value])?;
        Ok(())
    }
}

impl BitArray for FileBackedBitArray {
    fn get_bit(&self, index: usize) -> Result<bool> {
        check_index(index, self.max_elements)?;
        let (pos, mask) = byte_position(index);
        Ok(self.read_byte(pos)? & mask != 0)
    }

    fn set_bit(&mut self, index: usize) -> Result<bool> {
        check_index(index, self.max_elements)?;
        let (pos, mask) = byte_position(index);
        let byte = self.read_byte(pos)?;
        if byte & mask != 0 {
            return Ok(false);
        }
        self.write_byte(pos, byte | mask)?;
        Ok(true)
    }

    fn clear_bit(&mut self, index: usize) -> Result<()> {
        check_index(index, self.max_elements)?;
        let (pos, mask) = byte_position(index);
        let byte = self.read_byte(pos)?;
        if byte & mask != 0 {
            self.write_byte(pos, byte & !mask)?;
        }
        Ok(())
    }

    fn set_bit_if_unset(&mut self, index: usize) -> Result<bool> {
        self.set_bit(index)
    }

    fn clear(&mut self) -> Result<()> {
        let mut file = self.file()?;
        let zeros = vec![0u8; CLEAR_CHUNK_BYTES.min(self.num_bytes as usize)];
        let mut remaining = self.num_bytes;

        file.seek(SeekFrom::Start(0))?;
        while remaining > 0 {
            let chunk = remaining.min(zeros.len() as u64) as usize;
            file.write_all(&zeros[..chunk])?;
            remaining -= chunk as u64;
        }
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
        let mut file = self.file()?;
        let mut bytes = Vec::with_capacity(self.num_bytes as usize);
        file.seek(SeekFrom::Start(0))?;
        file.take(self.num_bytes).read_to_end(&mut bytes)?;

        // Only the first max_elements bits are addressable
        let ones = bytes
            .iter()
            .enumerate()
            .map(|(pos, byte)| {
                let live = self.max_elements.saturating_sub(pos * 8).min(8);
                let mask = if live == 8 { 0xFF } else { (1u8 << live) - 1 };
                (byte & mask).count_ones() as usize
            })
            .sum();
        Ok(ones)
    }

    fn flush(&mut self) -> Result<()> {
        self.file()?.sync_data()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_data()?;
            debug!(path = %self.path.display(), "Closed file-backed bit array");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }
}

impl Drop for FileBackedBitArray {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.sync_data() {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to sync unclosed file-backed bit array"
                );
            }
        }
    }
}
