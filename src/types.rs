//! Core types for background compositing operations

use crate::error::{BgError, Result};
use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pixel dimensions with both sides strictly positive
///
/// Only constructible through [`Size::new`], [`Size::of`] or `TryFrom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    width: u32,
    height: u32,
}

impl Size {
    /// Create a size, rejecting zero width or height
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BgError::zero_area("size", width, height));
        }
        Ok(Self { width, height })
    }

    /// Size of an existing image buffer
    pub fn of<I: image::GenericImageView>(image: &I) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height)
    }

    #[must_use]
    pub fn width(self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(self) -> u32 {
        self.height
    }

    /// Pixel count, widened so it cannot overflow
    #[must_use]
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    #[must_use]
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl TryFrom<(u32, u32)> for Size {
    type Error = BgError;

    fn try_from((width, height): (u32, u32)) -> Result<Self> {
        Self::new(width, height)
    }
}

/// How a background's aspect ratio is reconciled with the target canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Scale each axis independently to the exact target size
    Stretch,
    /// Uniform scale until both axes cover the target, then crop
    #[default]
    Cover,
    /// Uniform scale until the whole source fits, then pad
    Contain,
    /// Same transform as `Cover`, kept as its own name for API compatibility
    Fill,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 4] = [Self::Stretch, Self::Cover, Self::Contain, Self::Fill];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stretch => "stretch",
            Self::Cover => "cover",
            Self::Contain => "contain",
            Self::Fill => "fill",
        }
    }

    /// Parse a user-supplied value, falling back to the default for unknown input
    #[must_use]
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!(value = %value, fallback = %Self::default(), "Unknown scale mode");
            Self::default()
        })
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleMode {
    type Err = BgError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| {
                BgError::invalid_parameter(format!(
                    "unknown scale mode '{}' (expected one of: cover, contain, stretch, fill)",
                    s
                ))
            })
    }
}

/// Placement of an axis relative to the target: leading edge, middle, trailing edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Center,
    End,
}

/// Anchor used to align a resized background against the target canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    pub const ALL: [Position; 9] = [
        Self::Center,
        Self::Top,
        Self::Bottom,
        Self::Left,
        Self::Right,
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }
    }

    /// Horizontal component: `left` family, `right` family, or centered
    #[must_use]
    pub fn horizontal(self) -> Anchor {
        match self {
            Self::Left | Self::TopLeft | Self::BottomLeft => Anchor::Start,
            Self::Right | Self::TopRight | Self::BottomRight => Anchor::End,
            Self::Center | Self::Top | Self::Bottom => Anchor::Center,
        }
    }

    /// Vertical component: `top` family, `bottom` family, or centered
    #[must_use]
    pub fn vertical(self) -> Anchor {
        match self {
            Self::Top | Self::TopLeft | Self::TopRight => Anchor::Start,
            Self::Bottom | Self::BottomLeft | Self::BottomRight => Anchor::End,
            Self::Center | Self::Left | Self::Right => Anchor::Center,
        }
    }

    /// Parse a user-supplied value, falling back to the default for unknown input
    #[must_use]
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!(value = %value, fallback = %Self::default(), "Unknown position");
            Self::default()
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = BgError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|position| position.as_str() == normalized)
            .ok_or_else(|| BgError::invalid_parameter(format!("unknown position '{}'", s)))
    }
}

/// Single-channel opacity values (0 = transparent, 255 = opaque)
///
/// Either a foreground mask as produced by segmentation or its inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpacityPlane {
    data: Vec<u8>,
    dimensions: (u32, u32),
}

impl OpacityPlane {
    /// Create a plane from raw row-major values
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let (width, height) = dimensions;
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(BgError::invalid_request(format!(
                "opacity data has {} values, {}x{} requires {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// Caller guarantees `data.len() == width * height`
    pub(crate) fn from_raw_unchecked(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        debug_assert_eq!(data.len(), dimensions.0 as usize * dimensions.1 as usize);
        Self { data, dimensions }
    }

    /// Plane of the given size where every pixel has `value`
    #[must_use]
    pub fn filled(dimensions: (u32, u32), value: u8) -> Self {
        let len = dimensions.0 as usize * dimensions.1 as usize;
        Self {
            data: vec![value; len],
            dimensions,
        }
    }

    /// Create plane from a grayscale image
    #[must_use]
    pub fn from_image(image: &GrayImage) -> Self {
        Self {
            data: image.as_raw().clone(),
            dimensions: image.dimensions(),
        }
    }

    /// Convert plane to a grayscale image
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(width, height, self.data.clone())
            .ok_or_else(|| BgError::internal("Failed to create image from opacity data"))
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Write the plane into the alpha channel of an RGBA image of the same size
    pub fn apply_to_image(&self, image: &mut RgbaImage) -> Result<()> {
        if image.dimensions() != self.dimensions {
            return Err(BgError::dimension_mismatch(
                "opacity plane does not match image",
                image.dimensions(),
                self.dimensions,
            ));
        }

        for (pixel, &alpha) in image.pixels_mut().zip(&self.data) {
            pixel[3] = alpha;
        }

        Ok(())
    }
}
