use std::path::{Path, PathBuf};

use burn::data::dataset::Dataset;

use crate::data::loader::{decode_image, list_pairs, read_dims, PairPaths};
use crate::domain::{
    error::DataError,
    sample::{ImageDims, ImagePair},
};

/// How images of a split are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// 1 = grayscale, 3 = RGB
    pub channels: usize,
    /// Optional (height, width) every image is resized to
    pub resize:   Option<(u32, u32)>,
}

impl DecodeOptions {
    pub fn new(channels: usize) -> Self {
        Self { channels, resize: None }
    }

    pub fn with_resize(mut self, height: u32, width: u32) -> Self {
        self.resize = Some((height, width));
        self
    }
}

/// One split (train or val) of name-aligned clean/noisy images.
///
/// The file listing and the size checks happen once in `open`;
/// pixels are decoded on every `get`, nothing is cached.
pub struct PairedImageDataset {
    root:    PathBuf,
    pairs:   Vec<PairPaths>,
    options: DecodeOptions,
    dims:    ImageDims,
}

impl PairedImageDataset {
    pub fn open(root: impl AsRef<Path>, options: DecodeOptions) -> Result<Self, DataError> {
        let root = root.as_ref().to_path_buf();
        if !matches!(options.channels, 1 | 3) {
            return Err(DataError::UnsupportedChannels(options.channels));
        }

        let pairs = list_pairs(&root)?;
        let first = pairs.first().ok_or_else(|| DataError::Empty(root.clone()))?;

        let dims = match options.resize {
            Some((height, width)) => ImageDims::new(options.channels, height as usize, width as usize),
            None => {
                // Every pair must agree internally and with the first pair,
                // otherwise the batcher could not stack them
                let expected = read_dims(&first.clean, options.channels)?;
                for pair in &pairs {
                    let clean = read_dims(&pair.clean, options.channels)?;
                    let noisy = read_dims(&pair.noisy, options.channels)?;
                    if clean != noisy {
                        return Err(DataError::DimensionMismatch { name: pair.name.clone(), clean, noisy });
                    }
                    if clean != expected {
                        return Err(DataError::InconsistentSize {
                            name:  pair.name.clone(),
                            expected,
                            found: clean,
                        });
                    }
                }
                expected
            }
        };

        tracing::debug!("Opened '{}': {} pairs of {}", root.display(), pairs.len(), dims);
        Ok(Self { root, pairs, options, dims })
    }

    /// Decode pair `index`, reporting why it failed
    pub fn try_get(&self, index: usize) -> Result<ImagePair, DataError> {
        let pair = self
            .pairs
            .get(index)
            .ok_or(DataError::IndexOutOfRange { index, len: self.pairs.len() })?;

        let (clean, clean_dims) = decode_image(&pair.clean, self.options.channels, self.options.resize)?;
        let (noisy, noisy_dims) = decode_image(&pair.noisy, self.options.channels, self.options.resize)?;

        if clean_dims != noisy_dims {
            return Err(DataError::DimensionMismatch {
                name:  pair.name.clone(),
                clean: clean_dims,
                noisy: noisy_dims,
            });
        }
        // The header check in `open` can go stale if files change mid-run
        if clean_dims != self.dims {
            return Err(DataError::InconsistentSize {
                name:     pair.name.clone(),
                expected: self.dims,
                found:    clean_dims,
            });
        }

        Ok(ImagePair::new(pair.name.clone(), clean, noisy, clean_dims))
    }

    /// Shape shared by every image of the split
    pub fn dims(&self) -> ImageDims {
        self.dims
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.name.as_str())
    }
}

// Burn's DataLoader can only see Option, so a failed decode is
// logged here and turned into None. The trainer counts samples
// per epoch and aborts when the loader comes up short.
impl Dataset<ImagePair> for PairedImageDataset {
    fn get(&self, index: usize) -> Option<ImagePair> {
        match self.try_get(index) {
            Ok(pair) => Some(pair),
            Err(e) => {
                tracing::error!("Cannot load pair {} from '{}': {}", index, self.root.display(), e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{CLEAN_DIR, NOISY_DIR};
    use crate::test_support::{write_gray, write_split};

    #[test]
    fn test_len_matches_aligned_files() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(tmp.path(), 5, 8, 8);

        let ds = PairedImageDataset::open(tmp.path(), DecodeOptions::new(1)).unwrap();
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.dims(), ImageDims::new(1, 8, 8));
    }

    #[test]
    fn test_get_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(tmp.path(), 3, 8, 8);
        let ds = PairedImageDataset::open(tmp.path(), DecodeOptions::new(1)).unwrap();

        for i in 0..ds.len() {
            let a = ds.try_get(i).unwrap();
            let b = ds.try_get(i).unwrap();
            assert_eq!(a, b);
            assert_eq!(a.clean.len(), 64);
            assert_ne!(a.clean, a.noisy);
        }
    }

    #[test]
    fn test_out_of_range_index() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(tmp.path(), 2, 4, 4);
        let ds = PairedImageDataset::open(tmp.path(), DecodeOptions::new(1)).unwrap();

        assert!(matches!(
            ds.try_get(2),
            Err(DataError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_pair_size_mismatch_rejected_at_open() {
        let tmp = tempfile::tempdir().unwrap();
        write_gray(&tmp.path().join(CLEAN_DIR).join("x.png"), 8, 8, 0);
        write_gray(&tmp.path().join(NOISY_DIR).join("x.png"), 8, 6, 0);

        let err = PairedImageDataset::open(tmp.path(), DecodeOptions::new(1)).err().unwrap();
        assert!(matches!(err, DataError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_resize_overrides_size_checks() {
        let tmp = tempfile::tempdir().unwrap();
        write_gray(&tmp.path().join(CLEAN_DIR).join("x.png"), 8, 8, 0);
        write_gray(&tmp.path().join(NOISY_DIR).join("x.png"), 12, 10, 0);

        let ds = PairedImageDataset::open(tmp.path(), DecodeOptions::new(1).with_resize(4, 4)).unwrap();
        let pair = ds.try_get(0).unwrap();
        assert_eq!(pair.dims, ImageDims::new(1, 4, 4));
        assert_eq!(pair.noisy.len(), 16);
    }

    #[test]
    fn test_inconsistent_sizes_across_pairs() {
        let tmp = tempfile::tempdir().unwrap();
        write_gray(&tmp.path().join(CLEAN_DIR).join("a.png"), 8, 8, 0);
        write_gray(&tmp.path().join(NOISY_DIR).join("a.png"), 8, 8, 0);
        write_gray(&tmp.path().join(CLEAN_DIR).join("b.png"), 4, 4, 0);
        write_gray(&tmp.path().join(NOISY_DIR).join("b.png"), 4, 4, 0);

        let err = PairedImageDataset::open(tmp.path(), DecodeOptions::new(1)).err().unwrap();
        assert!(matches!(err, DataError::InconsistentSize { ref name, .. } if name == "b.png"));
    }

    #[test]
    fn test_empty_split_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(CLEAN_DIR)).unwrap();
        std::fs::create_dir_all(tmp.path().join(NOISY_DIR)).unwrap();

        let err = PairedImageDataset::open(tmp.path(), DecodeOptions::new(1)).err().unwrap();
        assert!(matches!(err, DataError::Empty(_)));
    }

    #[test]
    fn test_deleted_file_fails_get() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(tmp.path(), 2, 4, 4);
        let ds = PairedImageDataset::open(tmp.path(), DecodeOptions::new(1)).unwrap();

        let victim = ds.names().next().unwrap().to_string();
        std::fs::remove_file(tmp.path().join(NOISY_DIR).join(&victim)).unwrap();

        assert!(matches!(ds.try_get(0), Err(DataError::Unreadable { .. })));
        assert!(ds.get(1).is_some());
    }
}
