use super::{BitArray, check_index, check_same_size};
use crate::error::{BloomError, Result};
use bitvec::{order::Lsb0, vec::BitVec};

pub(crate) const BACKEND_NAME: &str = "in-memory";

/// Heap-resident bit array packed into 64-bit words.
#[derive(Debug, Clone)]
pub struct InMemoryBitArray {
    bits: BitVec<u64, Lsb0>,
    closed: bool,
}

impl InMemoryBitArray {
    pub fn new(num_bits: usize) -> Result<Self> {
        if num_bits == 0 {
            return Err(BloomError::InvalidArgument(
                "Bit array must hold at least one bit".to_string(),
            ));
        }

        Ok(Self {
            bits: BitVec::repeat(false, num_bits),
            closed: false,
        })
    }

    /// The packed storage words, lowest bit index first.
    pub fn as_words(&self) -> &[u64] {
        self.bits.as_raw_slice()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(BloomError::Closed);
        }
        Ok(())
    }

    fn combine(
        &mut self,
        other: &dyn BitArray,
        op: impl Fn(bool, bool) -> bool,
    ) -> Result<()> {
        self.ensure_open()?;
        check_same_size(self.bits.len(), other)?;

        // Read everything first so a failing source leaves us untouched
        let theirs = (0..self.bits.len())
            .map(|index| other.get_bit(index))
            .collect::<Result<Vec<bool>>>()?;

        for (index, their_bit) in theirs.into_iter().enumerate() {
            let ours = self.bits[index];
            self.bits.set(index, op(ours, their_bit));
        }
        Ok(())
    }
}

impl BitArray for InMemoryBitArray {
    fn get_bit(&self, index: usize) -> Result<bool> {
        self.ensure_open()?;
        check_index(index, self.bits.len())?;
        Ok(self.bits[index])
    }

    fn set_bit(&mut self, index: usize) -> Result<bool> {
        self.ensure_open()?;
        check_index(index, self.bits.len())?;
        Ok(!self.bits.replace(index, true))
    }

    fn clear_bit(&mut self, index: usize) -> Result<()> {
        self.ensure_open()?;
        check_index(index, self.bits.len())?;
        self.bits.set(index, false);
        Ok(())
    }

    fn set_bit_if_unset(&mut self, index: usize) -> Result<bool> {
        if self.get_bit(index)? {
            return Ok(false);
        }
        self.set_bit(index)
    }

    fn clear(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.bits.fill(false);
        Ok(())
    }

    fn or(&mut self, other: &dyn BitArray) -> Result<()> {
        self.combine(other, |a, b| a | b)
    }

    fn and(&mut self, other: &dyn BitArray) -> Result<()> {
        self.combine(other, |a, b| a & b)
    }

    fn bit_size(&self) -> usize {
        self.bits.len()
    }

    fn count_ones(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.bits.count_ones())
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_open()
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }
}
