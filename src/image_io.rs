use std::path::{Path, PathBuf};
use std::fs;
use image::{ImageFormat, RgbImage};
use log::debug;

use crate::errors::{QuantError, Result};

/// Extensions picked up by discovery, in the order their matches are returned.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "png", "tif"];

/// Represents a decoded source image with its metadata
pub struct InputImage {
    pub image: RgbImage,
    pub path: PathBuf,
    /// File name including extension, e.g. `slide_01.tif`
    pub filename: String,
}

/// List candidate images in a directory (not recursive).
///
/// Matches are grouped by extension in `IMAGE_EXTENSIONS` order. Extensions
/// are compared exactly, so `A.JPG` is not picked up. Within one extension
/// the files are sorted by name; hidden files are skipped.
pub fn list_images<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.is_dir() {
        return Err(QuantError::InvalidDirectory(dir_path.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }

    let mut images = Vec::new();
    for ext in IMAGE_EXTENSIONS {
        let mut matched: Vec<PathBuf> = files
            .iter()
            .filter(|path| matches_extension(path, ext))
            .cloned()
            .collect();
        matched.sort();
        images.extend(matched);
    }

    debug!("Discovered {} images in {}", images.len(), dir_path.display());
    Ok(images)
}

/// Names that are not valid UTF-8 still match, so `load_image` can report them
fn matches_extension(path: &Path, ext: &str) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    !name.to_string_lossy().starts_with('.') && path.extension().map_or(false, |e| e == ext)
}

/// Load an image as 8-bit RGB, dropping any alpha channel
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    let filename = path.file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| QuantError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let img = image::open(path).map_err(|source| QuantError::ImageRead {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(InputImage {
        image: img.to_rgb8(),
        path: path.to_path_buf(),
        filename,
    })
}

/// Save an RGB image as PNG to the specified path
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_list_images_filters_by_extension() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.png");
        touch(dir.path(), "b.tif");
        touch(dir.path(), "c.txt");

        let images = list_images(dir.path()).unwrap();
        assert_eq!(names(&images), vec!["a.png", "b.tif"]);
    }

    #[test]
    fn test_list_images_groups_by_extension_order() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.tif");
        touch(dir.path(), "b.png");
        touch(dir.path(), "z.jpg");
        touch(dir.path(), "a.png");
        touch(dir.path(), "a.jpg");

        let images = list_images(dir.path()).unwrap();
        assert_eq!(names(&images), vec!["a.jpg", "z.jpg", "a.png", "b.png", "a.tif"]);
    }

    #[test]
    fn test_list_images_is_case_sensitive_and_skips_hidden() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "upper.JPG");
        touch(dir.path(), "scan.tiff");
        touch(dir.path(), ".hidden.png");
        fs::create_dir(dir.path().join("folder.png")).unwrap();

        let images = list_images(dir.path()).unwrap();
        assert!(images.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_is_listed_then_rejected_on_load() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let odd = dir.path().join(OsStr::from_bytes(b"slide\xff.png"));
        save_image(&RgbImage::from_pixel(2, 2, Rgb([0, 0, 255])), &odd).unwrap();
        touch(dir.path(), "plain.png");

        let images = list_images(dir.path()).unwrap();
        assert_eq!(images.len(), 2);
        assert!(images.contains(&odd));

        let err = load_image(&odd).err().unwrap();
        assert!(matches!(err, QuantError::InvalidPath(ref p) if p == &odd));
    }

    #[test]
    fn test_list_images_rejects_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(list_images(&missing), Err(QuantError::InvalidDirectory(_))));
    }

    #[test]
    fn test_load_image_reports_undecodable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"not an image").unwrap();

        let err = load_image(&path).err().unwrap();
        assert!(matches!(err, QuantError::ImageRead { .. }));
    }

    #[test]
    fn test_save_and_load_keeps_pixels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("px.png");
        let image = RgbImage::from_pixel(3, 2, Rgb([10, 200, 30]));

        save_image(&image, &path).unwrap();
        let loaded = load_image(&path).unwrap();

        assert_eq!(loaded.filename, "px.png");
        assert_eq!(loaded.image, image);
    }
}
