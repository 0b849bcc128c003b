// Fixture images shared by the unit tests.

use std::{fs, path::Path};

use image::{GrayImage, Luma};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::loader::{CLEAN_DIR, NOISY_DIR};

/// Deterministic gradient image, shifted by `offset`.
pub fn write_gray(path: &Path, width: u32, height: u32, offset: u8) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = GrayImage::from_fn(width, height, |x, y| {
        Luma([((x * 16 + y * 8) as u8).wrapping_add(offset)])
    });
    img.save(path).unwrap();
}

/// `n` aligned pairs `0000.png, 0001.png, ...` under `root/{clean,noisy}`.
/// Every noisy pixel differs from its clean pixel.
pub fn write_split(root: &Path, n: usize, width: u32, height: u32) {
    let mut rng = StdRng::seed_from_u64(7);
    for i in 0..n {
        let name = format!("{i:04}.png");
        let clean = GrayImage::from_fn(width, height, |x, y| {
            Luma([((x * 16 + y * 8 + i as u32 * 5) % 256) as u8])
        });
        let mut noisy = clean.clone();
        for p in noisy.pixels_mut() {
            p[0] = p[0].wrapping_add(rng.gen_range(1..40));
        }

        for (dir, img) in [(CLEAN_DIR, &clean), (NOISY_DIR, &noisy)] {
            let path = root.join(dir).join(&name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            img.save(&path).unwrap();
        }
    }
}

/// `root/train` and `root/val` splits of square `size` x `size` images.
pub fn write_dataset(root: &Path, n_train: usize, n_val: usize, size: u32) {
    write_split(&root.join("train"), n_train, size, size);
    write_split(&root.join("val"), n_val, size, size);
}
