//! Board identification.

use std::{fs, path::Path};

use crate::{Error, Op, Result};

/// Find the name of the board the bootloader in `bootdir` was built for, from
/// the `CONFIG_BOARD` setting of its kconfig output.
pub fn find_board_name(bootdir: &Path) -> Result<String> {
    let dot_config = bootdir.join("zephyr").join(".config");
    let text = fs::read_to_string(&dot_config).map_err(|e| Error::io(Op::Read, &dot_config, e))?;

    text.lines()
        .find_map(|line| line.strip_prefix("CONFIG_BOARD="))
        .map(|value| value.trim().trim_matches('"').to_string())
        .ok_or(Error::MissingBoard { config: dot_config })
}
