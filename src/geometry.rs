//! Scale and placement resolution for background images
//!
//! Given the size of a background and the size of the canvas it has to fill,
//! [`resolve`] decides how large the resized background is, whether it is then
//! cropped or padded, and where the target window sits.
//!
//! All arithmetic is integer. The uniform scale factor is never materialised as
//! a float: comparing `tw * sh` against `th * sw` picks the driving axis, that
//! axis lands exactly on the target, and the other axis is the truncated
//! product `floor(other * target / source)`.
//!
//! Covering a target with a background of a very different aspect ratio
//! makes the overflowing axis huge. Such placements are rejected once the
//! resized area exceeds [`MAX_COVER_OVERSCAN`] times the target area.

use crate::error::{BgError, Result};
use crate::types::{Anchor, Position, ScaleMode, Size};

/// Largest allowed ratio between a covering resize and the target area
pub const MAX_COVER_OVERSCAN: u64 = 16;

/// Operation applied after resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOp {
    /// Resized size already equals the target
    Exact,
    /// Resized image covers the target; `offset` is the top-left of the kept window
    Crop,
    /// Resized image fits inside the target; `offset` is where it is pasted
    Pad,
}

/// Result of resolving a scale mode and position against a target size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub resized: Size,
    pub offset: (u32, u32),
    pub op: FitOp,
}

#[derive(Clone, Copy)]
enum Bound {
    /// Smallest uniform scale where both axes are >= target
    Cover,
    /// Largest uniform scale where both axes are <= target
    Contain,
}

/// Resolve resized dimensions, placement offset and final operation
///
/// `Cover` and `Fill` produce identical placements.
pub fn resolve(
    source: Size,
    target: Size,
    mode: ScaleMode,
    position: Position,
) -> Result<Placement> {
    let placement = match mode {
        ScaleMode::Stretch => Placement {
            resized: target,
            offset: (0, 0),
            op: FitOp::Exact,
        },
        ScaleMode::Cover | ScaleMode::Fill => {
            let resized = scale_uniform(source, target, Bound::Cover)?;
            if resized.area() > target.area() * MAX_COVER_OVERSCAN {
                return Err(BgError::InvalidSize(format!(
                    "covering {} with a {} background needs a {} resize, more than {} times the target area",
                    target, source, resized, MAX_COVER_OVERSCAN
                )));
            }
            Placement {
                resized,
                offset: (
                    anchor_offset(resized.width() - target.width(), position.horizontal()),
                    anchor_offset(resized.height() - target.height(), position.vertical()),
                ),
                op: FitOp::Crop,
            }
        },
        ScaleMode::Contain => {
            let resized = scale_uniform(source, target, Bound::Contain)?;
            Placement {
                resized,
                offset: (
                    anchor_offset(target.width() - resized.width(), position.horizontal()),
                    anchor_offset(target.height() - resized.height(), position.vertical()),
                ),
                op: FitOp::Pad,
            }
        },
    };

    tracing::trace!(
        source = %source,
        target = %target,
        mode = %mode,
        position = %position,
        resized = %placement.resized,
        offset_x = placement.offset.0,
        offset_y = placement.offset.1,
        "Resolved background placement"
    );

    Ok(placement)
}

/// Offset along one axis given the difference between the larger and smaller extent
///
/// Centering truncates: a slack of 67 yields 33.
fn anchor_offset(slack: u32, anchor: Anchor) -> u32 {
    match anchor {
        Anchor::Start => 0,
        Anchor::Center => slack / 2,
        Anchor::End => slack,
    }
}

fn scale_uniform(source: Size, target: Size, bound: Bound) -> Result<Size> {
    let (sw, sh) = (u64::from(source.width()), u64::from(source.height()));
    let (tw, th) = (u64::from(target.width()), u64::from(target.height()));

    // tw/sw >= th/sh, cross-multiplied
    let width_ratio_larger = tw * sh >= th * sw;
    let width_driven = match bound {
        Bound::Cover => width_ratio_larger,
        Bound::Contain => !width_ratio_larger || tw * sh == th * sw,
    };

    let (width, height) = if width_driven {
        (tw, sh * tw / sw)
    } else {
        (sw * th / sh, th)
    };

    let to_dimension = |value: u64| -> Result<u32> {
        u32::try_from(value.max(1)).map_err(|_| {
            BgError::InvalidSize(format!(
                "resizing {} to {} overflows the maximum image dimension",
                source, target
            ))
        })
    };

    Size::new(to_dimension(width)?, to_dimension(height)?)
}
