use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use sigmaker_core::image::LoadedImage;

/// Parse a hex address like `0x1000` or `1000`.
pub fn parse_address(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let digits =
        trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
    u64::from_str_radix(digits, 16).map_err(|_| anyhow!("Invalid hex address: {input}"))
}

/// Load `path` either as a parsed object file (architecture and executable
/// sections detected) or, with `raw`, as a flat code image at `base`.
pub fn load_image(path: &Path, raw: bool, base: u64, arch: Option<&str>) -> Result<LoadedImage> {
    if raw {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read image file {}", path.display()))?;
        LoadedImage::from_raw(bytes, base, arch.unwrap_or("x86_64"))
            .with_context(|| format!("Failed to load raw image {}", path.display()))
    } else {
        LoadedImage::from_file(path, arch)
            .with_context(|| format!("Failed to load image {}", path.display()))
    }
}
