//! Partition descriptions from generated devicetree headers.
//!
//! A Zephyr build leaves the flash partitions of the board in its generated
//! headers, as lines like:
//!
//! ```text
//! #define DT_FLASH_AREA_IMAGE_0_OFFSET_0 0xc000
//! #define DT_FLASH_AREA_IMAGE_0_SIZE_0 421888
//! ```
//!
//! The label in the macro name is the partition label, upper cased and with
//! dashes turned into underscores.  Any line that isn't a numeric offset or
//! size of a flash area is skipped.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use partition::PartitionSource;
use regex::Regex;
use tracing::trace;

use crate::{Error, Op, Result};

static DEFINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#define DT_FLASH_AREA_([0-9A-Z_]+)_(OFFSET|SIZE)(?:_0)?\s+(0x[0-9a-fA-F]+|[0-9]+)$")
        .expect("flash area pattern")
});

/// Partition tables read from a generated header.
#[derive(Debug, Clone, Default)]
pub struct DefineHeader {
    path: PathBuf,
    offsets: BTreeMap<String, u64>,
    sizes: BTreeMap<String, u64>,
}

impl DefineHeader {
    pub fn from_file(path: &Path) -> Result<DefineHeader> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(Op::Read, path, e))?;
        DefineHeader::parse(path, &text)
    }

    /// Parse the text of a header.  `path` is only used to report errors.
    ///
    /// If a partition's offset or size is defined more than once, the last
    /// definition is the one used.
    pub fn parse(path: &Path, text: &str) -> Result<DefineHeader> {
        let mut header = DefineHeader {
            path: path.to_path_buf(),
            ..DefineHeader::default()
        };

        for (index, line) in text.lines().enumerate() {
            let Some(caps) = DEFINE_RE.captures(line.trim_end()) else {
                continue;
            };
            let name = partition_name(&caps[1]);
            let value = parse_value(&caps[3]).ok_or_else(|| Error::BadDefine {
                path: path.to_path_buf(),
                line: index + 1,
                value: caps[3].to_string(),
            })?;
            trace!(name = %name, kind = &caps[2], value, "flash area");

            let table = if &caps[2] == "OFFSET" {
                &mut header.offsets
            } else {
                &mut header.sizes
            };
            table.insert(name, value);
        }

        Ok(header)
    }

    /// The header these partitions were read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PartitionSource for DefineHeader {
    fn offsets(&self) -> BTreeMap<String, u64> {
        self.offsets.clone()
    }

    fn sizes(&self) -> BTreeMap<String, u64> {
        self.sizes.clone()
    }
}

/// `IMAGE_0` names the `image-0` partition.
fn partition_name(label: &str) -> String {
    label.to_lowercase().replace('_', "-")
}

/// Decimal, or hex with a leading `0x`.  None if it doesn't fit.
fn parse_value(text: &str) -> Option<u64> {
    match text.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
