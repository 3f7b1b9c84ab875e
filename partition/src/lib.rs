//! Flash partition maps.
//!
//! A board divides its flash into named partitions, each a fixed region given
//! by an offset into the flash and a size.  The board description hands these
//! over as two tables keyed by partition name, one of offsets and one of sizes.
//! The tables come from generated build output, so before anything is placed
//! into them we check that they agree with each other, and that they describe
//! the partitions an MCUboot image needs.
//!
//! Three partitions matter here:
//!
//! - `mcuboot`, holding the bootloader itself.
//! - `image-0`, the primary application slot.
//! - `image-1`, the secondary (upgrade) slot.  This is only required when a
//!   secondary image is going to be placed.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

mod map;

use alloc::{collections::BTreeMap, string::String};
use core::fmt;

pub use map::{Partition, PartitionMap};

/// Partition holding the bootloader.
pub const BOOTLOADER: &str = "mcuboot";

/// Primary image slot.
pub const PRIMARY: &str = "image-0";

/// Secondary image slot, used in dual-image builds.
pub const SECONDARY: &str = "image-1";

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The offset and size tables do not name the same partitions.
    #[error("inconsistent partition data: {name:?} has {present} but no {absent}")]
    Inconsistent {
        name: String,
        present: Table,
        absent: Table,
    },
    /// A partition required for this build is not described.
    #[error("board partition table does not have {name} partition")]
    MissingPartition { name: &'static str },
}

pub type Result<T> = core::result::Result<T, Error>;

/// Which of the two partition tables an entry was found in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Table {
    Offset,
    Size,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Offset => write!(f, "an offset"),
            Table::Size => write!(f, "a size"),
        }
    }
}

/// A provider of partition descriptions.  This is how a board's flash layout
/// gets into the assembler, without the assembler knowing what format the
/// layout was described in.
pub trait PartitionSource {
    /// Offset of each partition, keyed by partition name.
    fn offsets(&self) -> BTreeMap<String, u64>;
    /// Size of each partition, keyed by partition name.
    fn sizes(&self) -> BTreeMap<String, u64>;
}

/// Already split tables can be used directly.
impl PartitionSource for (BTreeMap<String, u64>, BTreeMap<String, u64>) {
    fn offsets(&self) -> BTreeMap<String, u64> {
        self.0.clone()
    }

    fn sizes(&self) -> BTreeMap<String, u64> {
        self.1.clone()
    }
}
