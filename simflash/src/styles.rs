//! Board styles
//!
//! Partition layouts for a handful of boards, along with the flash they live
//! in.  These cover the arrangements the assembler has to cope with: gaps
//! between partitions, boards without a secondary slot, and partitions after
//! the image slots that nothing is ever placed in.

use std::{collections::BTreeMap, fmt::Write as _, fs, path::{Path, PathBuf}};

use anyhow::Result;
use partition::PartitionSource;

use crate::SimFlash;

/// A single partition of a board.
pub struct PartitionLayout {
    pub label: &'static str,
    pub offset: u64,
    pub size: u64,
}

/// The flash of a board, and how it is partitioned.
pub struct BoardLayout {
    pub name: &'static str,
    pub erase_size: usize,
    pub sectors: usize,
    pub partitions: &'static [PartitionLayout],
}

impl BoardLayout {
    /// A blank flash device matching this board.
    pub fn build(&self) -> Result<SimFlash> {
        SimFlash::new(self.erase_size, self.sectors)
    }

    pub fn partition(&self, label: &str) -> Option<&PartitionLayout> {
        self.partitions.iter().find(|p| p.label == label)
    }

    /// Does this board have a slot for a secondary image?
    pub fn is_dual(&self) -> bool {
        self.partition(partition::SECONDARY).is_some()
    }

    /// Render the partitions the way the generated devicetree headers
    /// describe them.
    pub fn define_header(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "/* Flash partitions for {} */", self.name);
        let _ = writeln!(text, "#define DT_FLASH_AREA_NUM {}", self.partitions.len());
        for (id, part) in self.partitions.iter().enumerate() {
            let label = part.label.to_uppercase().replace('-', "_");
            let _ = writeln!(text, "#define DT_FLASH_AREA_{}_ID {}", label, id);
            let _ = writeln!(text, "#define DT_FLASH_AREA_{}_READ_ONLY 0", label);
            let _ = writeln!(text, "#define DT_FLASH_AREA_{}_OFFSET_0 {:#x}", label, part.offset);
            let _ = writeln!(text, "#define DT_FLASH_AREA_{}_SIZE_0 {}", label, part.size);
            let _ = writeln!(text, "#define DT_FLASH_AREA_{0}_OFFSET DT_FLASH_AREA_{0}_OFFSET_0", label);
            let _ = writeln!(text, "#define DT_FLASH_AREA_{0}_SIZE DT_FLASH_AREA_{0}_SIZE_0", label);
        }
        text
    }

    /// Lay out a bootloader build directory for this board under `root`, the
    /// way a Zephyr build leaves it: the bootloader binary, the kconfig
    /// output, and the generated partition header.
    pub fn write_build_dir(&self, root: &Path, bootloader: &[u8]) -> Result<PathBuf> {
        let zephyr = root.join("zephyr");
        let generated = zephyr.join("include").join("generated");
        fs::create_dir_all(&generated)?;

        fs::write(zephyr.join("zephyr.bin"), bootloader)?;
        fs::write(
            zephyr.join(".config"),
            format!(
                "# Generated file\nCONFIG_ARM=y\nCONFIG_BOARD=\"{}\"\nCONFIG_BOOT_SIGNATURE_TYPE_RSA=y\n",
                self.name
            ),
        )?;
        fs::write(
            generated.join("devicetree_legacy_unfixed.h"),
            self.define_header(),
        )?;

        Ok(root.to_path_buf())
    }
}

impl PartitionSource for BoardLayout {
    fn offsets(&self) -> BTreeMap<String, u64> {
        self.partitions
            .iter()
            .map(|p| (p.label.to_string(), p.offset))
            .collect()
    }

    fn sizes(&self) -> BTreeMap<String, u64> {
        self.partitions
            .iter()
            .map(|p| (p.label.to_string(), p.size))
            .collect()
    }
}

/// nRF52840-style.  Small uniform sectors, slots packed right after the
/// bootloader, with scratch and storage at the top of flash.
pub static NRF52840: BoardLayout = BoardLayout {
    name: "nrf52840dk_nrf52840",
    erase_size: 4 * 1024,
    sectors: 256,
    partitions: &[
        PartitionLayout { label: "mcuboot", offset: 0x0, size: 0xc000 },
        PartitionLayout { label: "image-0", offset: 0xc000, size: 0x67000 },
        PartitionLayout { label: "image-1", offset: 0x73000, size: 0x67000 },
        PartitionLayout { label: "image-scratch", offset: 0xda000, size: 0x1e000 },
        PartitionLayout { label: "storage", offset: 0xf8000, size: 0x8000 },
    ],
};

/// K64-style.  There is a gap left between the bootloader and the first slot.
pub static K64: BoardLayout = BoardLayout {
    name: "frdm_k64f",
    erase_size: 4 * 1024,
    sectors: 256,
    partitions: &[
        PartitionLayout { label: "mcuboot", offset: 0x0, size: 0x10000 },
        PartitionLayout { label: "image-0", offset: 0x20000, size: 0x60000 },
        PartitionLayout { label: "image-1", offset: 0x80000, size: 0x60000 },
        PartitionLayout { label: "image-scratch", offset: 0xe0000, size: 0x10000 },
        PartitionLayout { label: "storage", offset: 0xf0000, size: 0x10000 },
    ],
};

/// Page-style devices.  Based on the LPC55S69.
pub static LPC: BoardLayout = BoardLayout {
    name: "lpcxpresso55s69_cpu0",
    erase_size: 512,
    sectors: 1024,
    partitions: &[
        PartitionLayout { label: "mcuboot", offset: 0x0, size: 0x20000 },
        PartitionLayout { label: "image-0", offset: 0x20000, size: 0x20000 },
        PartitionLayout { label: "image-1", offset: 0x40000, size: 0x20000 },
    ],
};

/// Large sectors, based on the STM32H745.
pub static STM32H: BoardLayout = BoardLayout {
    name: "nucleo_h745zi_q_m7",
    erase_size: 128 * 1024,
    sectors: 8,
    partitions: &[
        PartitionLayout { label: "mcuboot", offset: 0x0, size: 0x20000 },
        PartitionLayout { label: "image-0", offset: 0x20000, size: 0x80000 },
        PartitionLayout { label: "image-1", offset: 0xa0000, size: 0x60000 },
    ],
};

/// STM32F4-style, with only a primary slot.
pub static STM32F_SINGLE: BoardLayout = BoardLayout {
    name: "nucleo_f401re",
    erase_size: 128 * 1024,
    sectors: 4,
    partitions: &[
        PartitionLayout { label: "mcuboot", offset: 0x0, size: 0x20000 },
        PartitionLayout { label: "image-0", offset: 0x20000, size: 0x60000 },
    ],
};

/// All of the boards.
pub static ALL_BOARDS: [&BoardLayout; 5] = [&NRF52840, &K64, &LPC, &STM32H, &STM32F_SINGLE];

/// An iterator over all of the boards.
pub fn all_boards() -> impl Iterator<Item = &'static BoardLayout> {
    ALL_BOARDS.iter().copied()
}
