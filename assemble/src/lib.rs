//! Assemble multiple images into a single image that can be flashed on the
//! device.
//!
//! A bootloader build and one or two signed application images are placed,
//! each at the offset of its partition, into one flat binary.  The gaps
//! between them are filled with 0xFF, which is what erased flash reads as, so
//! the result can be written directly to the start of flash.

use std::{fmt, io, path::PathBuf};

mod assembly;
pub mod board;
mod config;
pub mod dts;

pub use assembly::{Assembly, Placement, Request, Summary, PAD};
pub use config::Config;
pub use partition::{Partition, PartitionMap, PartitionSource};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The partition map itself is unusable.
    #[error(transparent)]
    Partition(#[from] partition::Error),
    #[error("partition {partition:?} is not in the partition map")]
    UnknownPartition { partition: String },
    #[error(
        "partitions not in order, unsupported: {partition} starts at {offset:#x}, \
         but {cursor:#x} bytes are already written"
    )]
    OutOfOrder {
        partition: String,
        offset: u64,
        cursor: u64,
    },
    #[error(
        "image {} is too large for partition {partition} ({len:#x} > {size:#x} bytes)",
        .image.display()
    )]
    OversizedImage {
        image: PathBuf,
        partition: String,
        len: u64,
        size: u64,
    },
    #[error("unable to {op} {}", .path.display())]
    Io {
        op: Op,
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("expected CONFIG_BOARD line in {}", .config.display())]
    MissingBoard { config: PathBuf },
    #[error("no partition description found in {}", .bootdir.display())]
    NoPartitionSource { bootdir: PathBuf },
    #[error("{}:{line}: bad value {value:?}", .path.display())]
    BadDefine {
        path: PathBuf,
        line: usize,
        value: String,
    },
    #[error("{} is not a directory", .path.display())]
    NotADirectory { path: PathBuf },
}

impl Error {
    fn io(op: Op, path: impl Into<PathBuf>, err: io::Error) -> Error {
        Error::Io {
            op,
            path: path.into(),
            err,
        }
    }
}

/// The filesystem operation that failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Op {
    Remove,
    Create,
    Open,
    Read,
    Write,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Remove => "remove",
            Op::Create => "create",
            Op::Open => "open",
            Op::Read => "read",
            Op::Write => "write",
        };
        f.write_str(name)
    }
}
