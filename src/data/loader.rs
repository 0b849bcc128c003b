// ============================================================
// Layer 4 - Image Loader
// ============================================================
// Finds the clean/noisy file pairs of a split and decodes image
// files into channel-first f32 buffers using the `image` crate.
//
// Directory layout of one split:
//   data/train/
//     clean/  0001.png  0002.png  ...
//     noisy/  0001.png  0002.png  ...
//
// Files are paired by identical file name. A name present on
// only one side is skipped with a warning, so the split length
// is the number of names both directories share.
//
// Decoding:
//   1 channel  → DynamicImage::to_luma8  (grayscale)
//   3 channels → DynamicImage::to_rgb8
//   each u8 value v becomes v / 255.0, laid out C x H x W
//
// Reference: image crate documentation
//            Rust Book §9 (Error Handling)

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use image::{imageops::FilterType, DynamicImage, GrayImage, RgbImage};

use crate::domain::{error::DataError, sample::ImageDims};

/// File extensions the loader picks up (compared lowercase)
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Sub-directory holding the ground-truth images of a split
pub const CLEAN_DIR: &str = "clean";

/// Sub-directory holding the corrupted images of a split
pub const NOISY_DIR: &str = "noisy";

/// Paths of one matched pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairPaths {
    pub name:  String,
    pub clean: PathBuf,
    pub noisy: PathBuf,
}

/// List `<root>/clean` and `<root>/noisy` and pair them by file name.
/// The result is sorted by name so indices are stable across runs.
pub fn list_pairs(root: &Path) -> Result<Vec<PairPaths>, DataError> {
    let clean = list_images(&root.join(CLEAN_DIR))?;
    let mut noisy = list_images(&root.join(NOISY_DIR))?;

    let mut pairs = Vec::with_capacity(clean.len().min(noisy.len()));
    for (name, clean_path) in clean {
        match noisy.remove(&name) {
            Some(noisy_path) => pairs.push(PairPaths { name, clean: clean_path, noisy: noisy_path }),
            None => tracing::warn!("'{}' has no noisy counterpart, skipping", clean_path.display()),
        }
    }
    // Whatever is left in `noisy` had no clean counterpart
    for path in noisy.values() {
        tracing::warn!("'{}' has no clean counterpart, skipping", path.display());
    }

    Ok(pairs)
}

/// Map of file name → path for every image file directly inside `dir`.
fn list_images(dir: &Path) -> Result<BTreeMap<String, PathBuf>, DataError> {
    if !dir.is_dir() {
        return Err(DataError::MissingDirectory(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|e| DataError::Unreadable {
        path:   dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut images = BTreeMap::new();
    for entry in entries {
        let path = entry
            .map_err(|e| DataError::Unreadable { path: dir.to_path_buf(), reason: e.to_string() })?
            .path();
        if !path.is_file() || !is_image(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            images.insert(name.to_string(), path.clone());
        }
    }
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read only the header of an image to get its size.
/// Cheap enough to run over a whole split at construction time.
pub fn read_dims(path: &Path, channels: usize) -> Result<ImageDims, DataError> {
    let (width, height) = image::image_dimensions(path).map_err(|e| DataError::Unreadable {
        path:   path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(ImageDims::new(channels, height as usize, width as usize))
}

/// Decode one image into a channel-first buffer scaled to [0, 1].
///
/// `resize` is (height, width); when set, the image is resized
/// with a Lanczos3 filter before conversion.
pub fn decode_image(
    path:     &Path,
    channels: usize,
    resize:   Option<(u32, u32)>,
) -> Result<(Vec<f32>, ImageDims), DataError> {
    let mut img = image::open(path).map_err(|e| DataError::Unreadable {
        path:   path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if let Some((height, width)) = resize {
        img = img.resize_exact(width, height, FilterType::Lanczos3);
    }

    let height = img.height() as usize;
    let width  = img.width() as usize;
    let dims   = ImageDims::new(channels, height, width);

    let pixels = match channels {
        1 => img
            .to_luma8()
            .pixels()
            .map(|p| p[0] as f32 / 255.0)
            .collect(),
        3 => {
            // RGB pixels come interleaved (r g b r g b ...);
            // split them into three planes
            let rgb = img.to_rgb8();
            let mut planes = vec![0.0f32; dims.numel()];
            let plane = height * width;
            for (i, p) in rgb.pixels().enumerate() {
                planes[i]             = p[0] as f32 / 255.0;
                planes[plane + i]     = p[1] as f32 / 255.0;
                planes[2 * plane + i] = p[2] as f32 / 255.0;
            }
            planes
        }
        other => return Err(DataError::UnsupportedChannels(other)),
    };

    Ok((pixels, dims))
}

/// Inverse of `decode_image`: clamp to [0, 1] and rebuild an image.
pub fn encode_image(pixels: &[f32], dims: ImageDims) -> Result<DynamicImage, DataError> {
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    let (w, h) = (dims.width as u32, dims.height as u32);
    let plane  = dims.height * dims.width;

    match dims.channels {
        1 => {
            let raw: Vec<u8> = pixels.iter().map(|&v| to_u8(v)).collect();
            GrayImage::from_raw(w, h, raw)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| buffer_error(pixels.len(), dims))
        }
        3 => {
            let mut raw = Vec::with_capacity(3 * plane);
            for i in 0..plane {
                raw.push(to_u8(pixels[i]));
                raw.push(to_u8(pixels[plane + i]));
                raw.push(to_u8(pixels[2 * plane + i]));
            }
            RgbImage::from_raw(w, h, raw)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| buffer_error(pixels.len(), dims))
        }
        other => Err(DataError::UnsupportedChannels(other)),
    }
}

fn buffer_error(len: usize, dims: ImageDims) -> DataError {
    DataError::Unreadable {
        path:   PathBuf::new(),
        reason: format!("buffer of {len} values does not fit a {dims} image"),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_gray;

    #[test]
    fn test_pairs_by_name_and_skips_orphans() {
        let tmp  = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for name in ["b.png", "a.png", "only_clean.png"] {
            write_gray(&root.join(CLEAN_DIR).join(name), 4, 4, 10);
        }
        for name in ["a.png", "b.png", "only_noisy.png"] {
            write_gray(&root.join(NOISY_DIR).join(name), 4, 4, 20);
        }
        // Non-image files are ignored
        std::fs::write(root.join(CLEAN_DIR).join("notes.txt"), "x").unwrap();

        let pairs = list_pairs(root).unwrap();
        let names: Vec<&str> = pairs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
        assert!(pairs[0].noisy.ends_with("noisy/a.png"));
    }

    #[test]
    fn test_missing_subdirectory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(CLEAN_DIR)).unwrap();
        let err = list_pairs(tmp.path()).unwrap_err();
        assert!(matches!(err, DataError::MissingDirectory(p) if p.ends_with(NOISY_DIR)));
    }

    #[test]
    fn test_decode_scales_to_unit_range() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("g.png");
        write_gray(&path, 3, 2, 0);

        let (pixels, dims) = decode_image(&path, 1, None).unwrap();
        assert_eq!(dims, ImageDims::new(1, 2, 3));
        assert_eq!(pixels.len(), 6);
        assert!(pixels.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_decode_rgb_is_channel_first() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("c.png");
        RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 51])).save(&path).unwrap();

        let (pixels, dims) = decode_image(&path, 3, None).unwrap();
        assert_eq!(dims, ImageDims::new(3, 2, 2));
        assert_eq!(&pixels[0..4], &[1.0; 4]);
        assert_eq!(&pixels[4..8], &[0.0; 4]);
        assert!((pixels[8] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_decode_resizes_when_asked() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("r.png");
        write_gray(&path, 10, 6, 0);
        let (_, dims) = decode_image(&path, 1, Some((4, 8))).unwrap();
        assert_eq!(dims, ImageDims::new(1, 4, 8));
    }

    #[test]
    fn test_encode_inverts_decode() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("g.png");
        write_gray(&path, 5, 4, 3);

        let (pixels, dims) = decode_image(&path, 1, None).unwrap();
        let img = encode_image(&pixels, dims).unwrap();
        assert_eq!(img.to_luma8(), image::open(&path).unwrap().to_luma8());
    }

    #[test]
    fn test_unsupported_channels() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("g.png");
        write_gray(&path, 2, 2, 0);
        assert!(matches!(
            decode_image(&path, 2, None),
            Err(DataError::UnsupportedChannels(2))
        ));
    }
}
