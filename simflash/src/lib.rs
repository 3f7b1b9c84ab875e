//! Simulated flash
//!
//! An assembled image is meant to be written, byte for byte, to the start of a
//! device's flash.  This models that device well enough to check the result:
//! the flash starts out erased, reading as 0xFF everywhere, and programming
//! can only clear bits, so an area has to be erased before it can take new
//! data.  Tests program an assembled image into one of these and then read
//! each partition back out of it.
//!
//! The erase size matters for erasing only.  Programming here is done a byte
//! at a time; the write granularity of real devices does not affect where an
//! image lands.

use std::ops::Range;

use anyhow::{anyhow, bail, Result};

pub mod gen;
pub mod styles;

/// The value read back from erased flash.
pub const ERASED: u8 = 0xFF;

pub struct SimFlash {
    erase_size: usize,
    data: Vec<u8>,
}

impl SimFlash {
    /// Build a flash device out of `sectors` sectors of `erase_size` bytes,
    /// starting out fully erased.
    pub fn new(erase_size: usize, sectors: usize) -> Result<SimFlash> {
        if erase_size == 0 || !erase_size.is_power_of_two() {
            bail!("Erase size {} is not a power of two", erase_size);
        }
        let capacity = erase_size
            .checked_mul(sectors)
            .ok_or_else(|| anyhow!("Flash of {} sectors is too large", sectors))?;
        Ok(SimFlash {
            erase_size,
            data: vec![ERASED; capacity],
        })
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn erase_size(&self) -> usize {
        self.erase_size
    }

    /// Erase the sectors covering `from..to`.  Both ends must be sector
    /// aligned.
    pub fn erase(&mut self, from: usize, to: usize) -> Result<()> {
        if from > to || to > self.capacity() {
            bail!("Erase {:#x}..{:#x} out of bounds", from, to);
        }
        if from % self.erase_size != 0 || to % self.erase_size != 0 {
            bail!("Erase {:#x}..{:#x} not aligned to {:#x}", from, to, self.erase_size);
        }
        self.data[from..to].fill(ERASED);
        Ok(())
    }

    /// Program `data` into the flash at `offset`.  The area must be erased.
    pub fn install(&mut self, data: &[u8], offset: usize) -> Result<()> {
        let range = self.check(offset, data.len())?;
        if !self.is_erased(range.clone()) {
            bail!("Write to {:#x}..{:#x} over programmed flash", range.start, range.end);
        }
        // NOR programming only ever clears bits.
        for (cell, byte) in self.data[range].iter_mut().zip(data) {
            *cell &= *byte;
        }
        Ok(())
    }

    /// Read back `len` bytes starting at `offset`.
    pub fn read(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.check(offset, len)?;
        Ok(&self.data[range])
    }

    /// Does every byte in `range` read as erased?
    pub fn is_erased(&self, range: Range<usize>) -> bool {
        self.data[range].iter().all(|&b| b == ERASED)
    }

    fn check(&self, offset: usize, len: usize) -> Result<Range<usize>> {
        if len > self.capacity() || offset > self.capacity() - len {
            bail!(
                "Access {:#x}+{:#x} beyond flash of {:#x} bytes",
                offset,
                len,
                self.capacity()
            );
        }
        Ok(offset..offset + len)
    }
}
