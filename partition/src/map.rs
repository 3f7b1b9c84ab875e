//! Validated partition maps.

use alloc::{collections::BTreeMap, string::String, vec::Vec};

use crate::{Error, PartitionSource, Result, Table, BOOTLOADER, PRIMARY, SECONDARY};

/// A single region of flash.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Partition {
    /// Start of the partition, as an absolute offset within the flash.
    pub offset: u64,
    /// Capacity of the partition, in bytes.
    pub size: u64,
}

impl Partition {
    /// One past the last byte of the partition.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }

    /// Can an image of `len` bytes be placed here?
    pub fn fits(&self, len: u64) -> bool {
        len <= self.size
    }
}

/// The partitions of a board, checked for consistency.  Once loaded, this is
/// never modified.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PartitionMap {
    offsets: BTreeMap<String, u64>,
    sizes: BTreeMap<String, u64>,
}

impl PartitionMap {
    /// Build a partition map out of the offset and size tables.
    ///
    /// Both tables must name exactly the same partitions, and the bootloader
    /// and primary partitions must be present.  When `require_secondary` is
    /// set, the secondary partition must be present as well.  The tables are
    /// not required to be in any particular order.
    pub fn load(
        offsets: &BTreeMap<String, u64>,
        sizes: &BTreeMap<String, u64>,
        require_secondary: bool,
    ) -> Result<PartitionMap> {
        same_keys(offsets, sizes)?;

        let map = PartitionMap {
            offsets: offsets.clone(),
            sizes: sizes.clone(),
        };

        map.require(BOOTLOADER)?;
        map.require(PRIMARY)?;
        if require_secondary {
            map.require(SECONDARY)?;
        }

        Ok(map)
    }

    /// Load the partition map from a provider.
    pub fn from_source<S: PartitionSource + ?Sized>(
        source: &S,
        require_secondary: bool,
    ) -> Result<PartitionMap> {
        PartitionMap::load(&source.offsets(), &source.sizes(), require_secondary)
    }

    fn require(&self, name: &'static str) -> Result<()> {
        if self.offsets.contains_key(name) {
            Ok(())
        } else {
            Err(Error::MissingPartition { name })
        }
    }

    /// Look up a partition by name.
    pub fn get(&self, name: &str) -> Option<Partition> {
        // Both tables have the same keys, so a hit in one is a hit in both.
        let offset = *self.offsets.get(name)?;
        let size = *self.sizes.get(name)?;
        Some(Partition { offset, size })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.offsets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &BTreeMap<String, u64> {
        &self.offsets
    }

    pub fn sizes(&self) -> &BTreeMap<String, u64> {
        &self.sizes
    }

    /// Iterate over the partitions, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Partition)> + '_ {
        self.offsets.iter().map(move |(name, &offset)| {
            let size = self.sizes[name];
            (name.as_str(), Partition { offset, size })
        })
    }

    /// The partitions in the order they appear in flash.  Partitions sharing
    /// an offset are ordered by name.
    pub fn by_offset(&self) -> Vec<(&str, Partition)> {
        let mut parts: Vec<_> = self.iter().collect();
        parts.sort_by_key(|(name, part)| (part.offset, *name));
        parts
    }
}

/// Make sure every key of `offsets` is in `sizes`, and the reverse.
fn same_keys(offsets: &BTreeMap<String, u64>, sizes: &BTreeMap<String, u64>) -> Result<()> {
    if let Some(name) = offsets.keys().find(|k| !sizes.contains_key(*k)) {
        return Err(Error::Inconsistent {
            name: name.clone(),
            present: Table::Offset,
            absent: Table::Size,
        });
    }
    if let Some(name) = sizes.keys().find(|k| !offsets.contains_key(*k)) {
        return Err(Error::Inconsistent {
            name: name.clone(),
            present: Table::Size,
            absent: Table::Offset,
        });
    }
    Ok(())
}
