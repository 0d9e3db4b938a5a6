use std::fs;
use std::path::{Path, PathBuf};

use image::GrayImage;

use crate::config::Config;
use crate::errors::{Result, WingMorphError};
use crate::labeling::BinaryRaster;

/// An input image with its metadata
pub struct InputImage {
    pub image: GrayImage,
    pub path: PathBuf,
    pub filename: String,
}

/// Get all PNG files from a directory (recursively)
pub fn get_png_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(WingMorphError::InvalidPath(dir_path.to_path_buf()));
    }
    if !dir_path.is_dir() {
        return Err(WingMorphError::Config(format!(
            "{} is not a directory",
            dir_path.display()
        )));
    }

    let mut png_files = Vec::new();
    find_png_files_recursive(dir_path, &mut png_files)?;
    png_files.sort();
    Ok(png_files)
}

fn find_png_files_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_dir() {
            find_png_files_recursive(&path, result)?;
        } else if path.is_file() {
            if let Some(ext) = path.extension() {
                if ext.to_ascii_lowercase() == "png" {
                    result.push(path);
                }
            }
        }
    }
    Ok(())
}

/// Load an image as 8-bit grayscale
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    let filename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| WingMorphError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let img = image::open(path)?;
    Ok(InputImage {
        image: img.to_luma8(),
        path: path.to_path_buf(),
        filename,
    })
}

/// Threshold a segmented grayscale image into a binary raster.
///
/// A pixel is foreground when its value matches the configured foreground
/// value; everything else counts as background.
pub fn to_binary_raster(input: &InputImage, config: &Config) -> BinaryRaster {
    let foreground = config.foreground_value;
    BinaryRaster::from_fn(
        input.image.width() as usize,
        input.image.height() as usize,
        |x, y| input.image.get_pixel(x as u32, y as u32).0[0] == foreground,
    )
}
