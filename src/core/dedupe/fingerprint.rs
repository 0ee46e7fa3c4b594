//! Perceptual fingerprints compared by Hamming distance.
//!
//! Two variants share one fixed-width bit-vector representation:
//! - **Difference** - compares horizontal brightness gradients on a small
//!   grayscale grid; fast and a good default
//! - **Gradient** - the double-gradient algorithm from the image_hasher
//!   crate; more robust to edits

use super::decode::{decode_image, resize_to_grayscale};
use crate::error::DedupeError;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Available fingerprint algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintKind {
    /// Horizontal gradient comparison (dHash family)
    Difference,
    /// Double-gradient via image_hasher
    Gradient,
}

/// A fixed-width bit vector summarizing visual content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    bits: Vec<u8>,
}

impl Fingerprint {
    pub fn from_bytes(bits: Vec<u8>) -> Self {
        Self { bits }
    }

    /// Number of differing bits between two fingerprints.
    pub fn distance(&self, other: &Self) -> u32 {
        self.bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// Total bit width.
    pub fn width_bits(&self) -> u32 {
        (self.bits.len() * 8) as u32
    }

    /// Similarity score in [0, 1]: 1 - distance/width.
    pub fn similarity(&self, other: &Self) -> f64 {
        let width = self.width_bits().max(other.width_bits());
        if width == 0 {
            return 1.0;
        }
        1.0 - (self.distance(other) as f64 / width as f64)
    }

    pub fn to_hex(&self) -> String {
        self.bits.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Computes fingerprints of a fixed grid size.
pub struct FingerprintEngine {
    kind: FingerprintKind,
    grid_size: u32,
    gradient_hasher: image_hasher::Hasher,
}

impl FingerprintEngine {
    /// Engine with an 8x8 grid (64-bit fingerprints).
    pub fn new(kind: FingerprintKind) -> Self {
        Self::with_grid_size(kind, 8)
    }

    pub fn with_grid_size(kind: FingerprintKind, grid_size: u32) -> Self {
        let gradient_hasher = HasherConfig::new()
            .hash_size(grid_size, grid_size)
            .hash_alg(HashAlg::DoubleGradient)
            .to_hasher();

        Self {
            kind,
            grid_size,
            gradient_hasher,
        }
    }

    pub fn kind(&self) -> FingerprintKind {
        self.kind
    }

    /// Fingerprint an already-decoded image.
    pub fn of_image(&self, image: &DynamicImage) -> Result<Fingerprint, DedupeError> {
        match self.kind {
            FingerprintKind::Difference => self.difference_fingerprint(image),
            FingerprintKind::Gradient => {
                let hash = self.gradient_hasher.hash_image(image);
                Ok(Fingerprint::from_bytes(hash.as_bytes().to_vec()))
            }
        }
    }

    /// Decode a file and fingerprint it.
    pub fn of_file(&self, path: &Path) -> Result<Fingerprint, DedupeError> {
        let image = decode_image(path)?;
        self.of_image(&image)
    }

    /// dHash: one extra column so every cell has a right-hand neighbor to
    /// compare against.
    fn difference_fingerprint(&self, image: &DynamicImage) -> Result<Fingerprint, DedupeError> {
        let size = self.grid_size;
        let gray = resize_to_grayscale(image, size + 1, size)?;

        let mut bits = Vec::with_capacity(((size * size) as usize).div_ceil(8));
        let mut current: u8 = 0;
        let mut filled = 0;

        for y in 0..size {
            for x in 0..size {
                let left = gray.get_pixel(x, y)[0];
                let right = gray.get_pixel(x + 1, y)[0];

                if left > right {
                    current |= 1 << (7 - filled);
                }

                filled += 1;
                if filled == 8 {
                    bits.push(current);
                    current = 0;
                    filled = 0;
                }
            }
        }
        if filled > 0 {
            bits.push(current);
        }

        Ok(Fingerprint::from_bytes(bits))
    }
}
