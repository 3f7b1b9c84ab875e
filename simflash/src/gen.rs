//! Image generation.
//!
//! The assembler never looks inside the images it places, so for testing any
//! bytes will do.  These are random, from a seeded generator, so that a byte
//! landing in the wrong place is very unlikely to go unnoticed.

use std::{fs::File, io::Write, path::{Path, PathBuf}};

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use anyhow::{Context, Result};
use temp_dir::TempDir;

/// A generated image.  The image is also written out to a file, which lives
/// as long as this does.
pub struct GeneratedImage {
    pub data: Vec<u8>,
    path: PathBuf,
    _dir: TempDir,
}

impl GeneratedImage {
    /// Path of the file holding this image.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub struct GenBuilder {
    /// Size of the image.
    size: usize,
    /// Seed for the PRNG
    seed: usize,
    /// File name to write the image to.
    name: String,
}

impl Default for GenBuilder {
    fn default() -> Self {
        GenBuilder {
            size: 76_137,
            seed: 1,
            name: "image.bin".to_string(),
        }
    }
}

impl GenBuilder {
    pub fn size(&mut self, size: usize) -> &mut Self {
        self.size = size;
        self
    }

    pub fn seed(&mut self, seed: usize) -> &mut Self {
        self.seed = seed;
        self
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }

    pub fn build(&self) -> Result<GeneratedImage> {
        let data = self.bytes();

        let dir = TempDir::new()?;
        let path = dir.path().join(&self.name);
        File::create(&path)
            .and_then(|mut f| f.write_all(&data))
            .with_context(|| format!("Writing {}", path.display()))?;

        Ok(GeneratedImage {
            data,
            path,
            _dir: dir,
        })
    }

    /// Generate just the bytes of the image.
    pub fn bytes(&self) -> Vec<u8> {
        let mut rng = Xoshiro256Plus::seed_from_u64(self.seed as u64);
        let mut data = vec![0u8; self.size];
        rng.fill_bytes(&mut data);
        data
    }
}
