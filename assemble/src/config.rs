//! Run configuration.

use std::path::{Path, PathBuf};

use partition::PartitionMap;
use tracing::{debug, info};

use crate::{
    assembly::{Assembly, Request, Summary},
    board,
    dts::DefineHeader,
    Error, Result,
};

/// Generated headers that may describe the flash partitions, relative to the
/// bootloader build directory.  The first one present is used.
pub const PARTITION_HEADERS: [&str; 3] = [
    "zephyr/include/generated/devicetree_legacy_unfixed.h",
    "zephyr/include/generated/devicetree_unfixed.h",
    "zephyr/include/generated/generated_dts_board.h",
];

/// Everything needed to assemble one image.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Directory of the built bootloader.
    pub bootdir: PathBuf,
    /// Signed primary image.
    pub primary: PathBuf,
    /// Signed secondary image.  Setting this makes the build dual image.
    pub secondary: Option<PathBuf>,
    /// Where the full image is written.
    pub output: PathBuf,
    /// Partition header to use instead of looking in the build directory.
    pub partitions: Option<PathBuf>,
    /// The Zephyr tree the bootloader was built from.
    pub zephyr_base: Option<PathBuf>,
}

impl Config {
    pub fn is_dual(&self) -> bool {
        self.secondary.is_some()
    }

    /// The bootloader binary within the build directory.
    pub fn bootloader(&self) -> PathBuf {
        self.bootdir.join("zephyr").join("zephyr.bin")
    }

    /// Work out which header describes the partitions.
    pub fn partition_header(&self) -> Result<PathBuf> {
        if let Some(path) = &self.partitions {
            if path.is_relative() && !path.exists() {
                if let Some(base) = &self.zephyr_base {
                    return Ok(base.join(path));
                }
            }
            return Ok(path.clone());
        }

        PARTITION_HEADERS
            .iter()
            .map(|name| self.bootdir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| Error::NoPartitionSource {
                bootdir: self.bootdir.clone(),
            })
    }

    /// The images to place, in the order they go into flash.
    pub fn requests(&self) -> Vec<Request> {
        Request::plan(self.bootloader(), &self.primary, self.secondary.clone())
    }

    /// Load the partitions of the board.
    pub fn partition_map(&self) -> Result<PartitionMap> {
        let header = self.partition_header()?;
        debug!(header = %header.display(), "reading partitions");
        let source = DefineHeader::from_file(&header)?;
        Ok(PartitionMap::from_source(&source, self.is_dual())?)
    }

    /// Build the full image.
    pub fn run(&self) -> Result<Summary> {
        if let Some(base) = &self.zephyr_base {
            check_dir(base)?;
            debug!(zephyr_base = %base.display());
        }
        check_dir(&self.bootdir)?;

        let board = board::find_board_name(&self.bootdir)?;
        info!(board = %board, dual = self.is_dual(), "assembling");

        let map = self.partition_map()?;
        for (name, part) in map.by_offset() {
            debug!(partition = name, offset = part.offset, size = part.size);
        }

        let mut assembly = Assembly::new(map, &self.output)?;
        assembly.place_all(&self.requests())?;
        assembly.finish()
    }
}

fn check_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::NotADirectory {
            path: path.to_path_buf(),
        })
    }
}
