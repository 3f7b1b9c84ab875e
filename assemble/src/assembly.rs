//! Sequential image assembly.
//!
//! The output is built front to back.  Each image is added by padding the
//! output out to the start of its partition and then appending the image, so
//! the write position only ever moves forward.  This means images have to be
//! added in the order their partitions appear in flash; asking for a partition
//! that starts before the current end of the output is an error, never a
//! splice into what is already there.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use partition::PartitionMap;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::{Error, Op, Result};

/// Gaps between images are filled with this, the value of erased flash.
pub const PAD: u8 = 0xFF;

/// The result of a SHA256 hash.
pub type Hash256 = [u8; 32];

/// A request to place the image in `source` into `partition`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Request {
    pub source: PathBuf,
    pub partition: String,
}

impl Request {
    pub fn new(source: impl Into<PathBuf>, partition: &str) -> Request {
        Request {
            source: source.into(),
            partition: partition.to_string(),
        }
    }

    /// The requests for a normal build: the bootloader, the primary image,
    /// and the secondary image if there is one, in that order.
    pub fn plan(
        bootloader: impl Into<PathBuf>,
        primary: impl Into<PathBuf>,
        secondary: Option<PathBuf>,
    ) -> Vec<Request> {
        let mut requests = vec![
            Request::new(bootloader, partition::BOOTLOADER),
            Request::new(primary, partition::PRIMARY),
        ];
        if let Some(secondary) = secondary {
            requests.push(Request::new(secondary, partition::SECONDARY));
        }
        requests
    }
}

/// Where a single image ended up.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Placement {
    pub partition: String,
    /// Offset of the image in the output.
    pub offset: u64,
    /// Bytes of padding written in front of the image.
    pub padding: u64,
    /// Length of the image itself.
    pub len: u64,
}

/// Description of a finished output.
#[derive(Debug, Clone)]
pub struct Summary {
    pub output: PathBuf,
    pub len: u64,
    pub sha256: Hash256,
    pub placements: Vec<Placement>,
}

impl Summary {
    pub fn sha256_hex(&self) -> String {
        self.sha256.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// An output image under construction.
///
/// The output file belongs to this for its whole life; nothing else should
/// write to it while images are being added.
pub struct Assembly {
    map: PartitionMap,
    output: PathBuf,
    placements: Vec<Placement>,
}

impl Assembly {
    /// Start a new output at `output`.  Anything already at that path is
    /// removed first, so the result never depends on an earlier run.
    pub fn new(map: PartitionMap, output: impl Into<PathBuf>) -> Result<Assembly> {
        let output = output.into();

        match fs::remove_file(&output) {
            Ok(()) => debug!(output = %output.display(), "removed old output"),
            Err(e) if e.kind() == ErrorKind::NotFound => (),
            Err(e) => return Err(Error::io(Op::Remove, &output, e)),
        }
        File::create(&output).map_err(|e| Error::io(Op::Create, &output, e))?;

        Ok(Assembly {
            map,
            output,
            placements: Vec::new(),
        })
    }

    pub fn map(&self) -> &PartitionMap {
        &self.map
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// The images placed so far.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Current length of the output.  This is asked of the file each time
    /// rather than tracked.
    pub fn cursor(&self) -> Result<u64> {
        let meta = fs::metadata(&self.output).map_err(|e| Error::io(Op::Open, &self.output, e))?;
        Ok(meta.len())
    }

    /// Place the image in `source` at the start of `partition`.
    ///
    /// Partitions must be added in non-decreasing offset order.  The gap up to
    /// the partition is padded before the image is read, so if the image turns
    /// out to be too large for the partition, the padding has already been
    /// written, but none of the image has.
    pub fn add_image(&mut self, source: &Path, partition: &str) -> Result<Placement> {
        let part = self
            .map
            .get(partition)
            .ok_or_else(|| Error::UnknownPartition {
                partition: partition.to_string(),
            })?;

        let mut ofd = OpenOptions::new()
            .append(true)
            .open(&self.output)
            .map_err(|e| Error::io(Op::Open, &self.output, e))?;
        let pos = ofd
            .metadata()
            .map_err(|e| Error::io(Op::Open, &self.output, e))?
            .len();

        info!(partition, pos, offset = part.offset, "adding image {}", source.display());

        if pos > part.offset {
            return Err(Error::OutOfOrder {
                partition: partition.to_string(),
                offset: part.offset,
                cursor: pos,
            });
        }

        let padding = part.offset - pos;
        if padding > 0 {
            debug!(partition, padding, "padding to partition");
            io::copy(&mut io::repeat(PAD).take(padding), &mut ofd)
                .map_err(|e| Error::io(Op::Write, &self.output, e))?;
        }

        let ibuf = fs::read(source).map_err(|e| Error::io(Op::Read, source, e))?;
        let len = ibuf.len() as u64;
        if !part.fits(len) {
            return Err(Error::OversizedImage {
                image: source.to_path_buf(),
                partition: partition.to_string(),
                len,
                size: part.size,
            });
        }
        ofd.write_all(&ibuf)
            .map_err(|e| Error::io(Op::Write, &self.output, e))?;

        let placement = Placement {
            partition: partition.to_string(),
            offset: part.offset,
            padding,
            len,
        };
        self.placements.push(placement.clone());
        Ok(placement)
    }

    /// Place the image for a single request.
    pub fn place(&mut self, request: &Request) -> Result<Placement> {
        self.add_image(&request.source, &request.partition)
    }

    /// Place each of the requests, in the order given.  Stops at the first
    /// failure.
    pub fn place_all<'r, I>(&mut self, requests: I) -> Result<()>
    where
        I: IntoIterator<Item = &'r Request>,
    {
        for request in requests {
            self.place(request)?;
        }
        Ok(())
    }

    /// Finish the output, and describe what was built.
    pub fn finish(self) -> Result<Summary> {
        let mut file = File::open(&self.output).map_err(|e| Error::io(Op::Open, &self.output, e))?;

        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 4096];
        let mut len = 0u64;
        loop {
            let count = file
                .read(&mut buffer)
                .map_err(|e| Error::io(Op::Read, &self.output, e))?;
            if count == 0 {
                break;
            }
            hasher.update(&buffer[..count]);
            len += count as u64;
        }
        let mut sha256 = [0u8; 32];
        sha256.copy_from_slice(hasher.finalize().as_slice());

        let summary = Summary {
            output: self.output,
            len,
            sha256,
            placements: self.placements,
        };
        info!(
            output = %summary.output.display(),
            len = summary.len,
            sha256 = %summary.sha256_hex(),
            "image assembled"
        );
        Ok(summary)
    }
}
