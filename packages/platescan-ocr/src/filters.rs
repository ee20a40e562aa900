//! Image filter pipeline producing the OCR variants of a vehicle image.
//!
//! Each [`Enhancement`] is a fixed chain of basic filters (grayscale,
//! aspect-fit resize, histogram normalization, brightness/contrast
//! modulation, sharpening, linear contrast stretch, crop). Variants are
//! visually distinct renditions of the same region so that at least one of
//! them tends to survive glare, shadow or low resolution.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat};
use imageproc::contrast::{equalize_histogram, stretch_contrast};
use thiserror::Error;

use crate::region::PixelRect;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("crop {0:?} is outside a {1}x{2} image")]
    CropOutOfBounds(PixelRect, u32, u32),
}

/// Enhancement chains applied to a vehicle crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Enhancement {
    /// Grayscale, histogram normalization, mild sharpen. The standard variant.
    Focused,
    /// Brightness/contrast modulation followed by a linear stretch.
    HighContrast,
    /// Strong sharpen on grayscale to bring out glyph edges.
    EdgeEnhanced,
    /// Aspect-fit upscale for small or distant plates.
    Upscaled,
}

impl Enhancement {
    pub const ALL: [Enhancement; 4] = [
        Enhancement::Focused,
        Enhancement::HighContrast,
        Enhancement::EdgeEnhanced,
        Enhancement::Upscaled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Enhancement::Focused => "focused",
            Enhancement::HighContrast => "high_contrast",
            Enhancement::EdgeEnhanced => "edge_enhanced",
            Enhancement::Upscaled => "upscaled",
        }
    }
}

/// Region crops taken from the vehicle image before enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Lower half, where most plates are mounted.
    BottomHalf,
    /// Middle 60% horizontally of the lower two thirds.
    CenterRegion,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::BottomHalf, Region::CenterRegion];

    pub fn label(&self) -> &'static str {
        match self {
            Region::BottomHalf => "bottom-half",
            Region::CenterRegion => "center-region",
        }
    }

    pub fn rect(&self, width: u32, height: u32) -> PixelRect {
        match self {
            Region::BottomHalf => PixelRect {
                x: 0,
                y: height / 2,
                width,
                height: height - height / 2,
            },
            Region::CenterRegion => PixelRect {
                x: width / 5,
                y: height / 3,
                width: (width * 3 / 5).max(1),
                height: (height - height / 3).max(1),
            },
        }
    }
}

pub fn grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Resizes to fit within `max_width` x `max_height`, preserving aspect ratio.
pub fn aspect_fit(img: &DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    img.resize(max_width.max(1), max_height.max(1), FilterType::Lanczos3)
}

/// Largest factor [`upscale`] applies; bigger requests are clamped to it.
pub const MAX_UPSCALE_FACTOR: u32 = 8;

/// Scales the image by `factor` while keeping its aspect ratio.
pub fn upscale(img: &DynamicImage, factor: u32) -> DynamicImage {
    let factor = factor.clamp(1, MAX_UPSCALE_FACTOR);
    aspect_fit(
        img,
        img.width().saturating_mul(factor),
        img.height().saturating_mul(factor),
    )
}

pub fn normalize_histogram(img: &GrayImage) -> GrayImage {
    equalize_histogram(img)
}

/// Adjusts brightness (additive) and contrast (percent, positive increases).
pub fn modulate(img: &DynamicImage, brightness: i32, contrast: f32) -> DynamicImage {
    img.brighten(brightness).adjust_contrast(contrast)
}

pub fn sharpen(img: &DynamicImage, sigma: f32, threshold: i32) -> DynamicImage {
    img.unsharpen(sigma, threshold)
}

/// Stretches the occupied intensity range linearly onto `0..=255`.
pub fn linear_stretch(img: &GrayImage) -> GrayImage {
    let (lo, hi) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if lo >= hi {
        return img.clone();
    }
    stretch_contrast(img, lo, hi, 0, 255)
}

pub fn crop(img: &DynamicImage, rect: PixelRect) -> Result<DynamicImage, FilterError> {
    let fits = rect.width > 0
        && rect.height > 0
        && rect.x.saturating_add(rect.width) <= img.width()
        && rect.y.saturating_add(rect.height) <= img.height();
    if !fits {
        return Err(FilterError::CropOutOfBounds(rect, img.width(), img.height()));
    }
    Ok(img.crop_imm(rect.x, rect.y, rect.width, rect.height))
}

pub fn crop_region(img: &DynamicImage, region: Region) -> Result<DynamicImage, FilterError> {
    crop(img, region.rect(img.width(), img.height()))
}

/// Applies one enhancement chain. `upscale_factor` only affects
/// [`Enhancement::Upscaled`].
pub fn enhance(img: &DynamicImage, enhancement: Enhancement, upscale_factor: u32) -> DynamicImage {
    match enhancement {
        Enhancement::Focused => {
            let gray = normalize_histogram(&grayscale(img));
            sharpen(&DynamicImage::ImageLuma8(gray), 1.0, 2)
        }
        Enhancement::HighContrast => {
            let modulated = modulate(img, 10, 40.0);
            DynamicImage::ImageLuma8(linear_stretch(&grayscale(&modulated)))
        }
        Enhancement::EdgeEnhanced => {
            let gray = DynamicImage::ImageLuma8(grayscale(img));
            sharpen(&gray, 2.5, 0)
        }
        Enhancement::Upscaled => {
            let gray = DynamicImage::ImageLuma8(grayscale(img));
            upscale(&gray, upscale_factor)
        }
    }
}

pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, FilterError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}
