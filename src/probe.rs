//! Pixel probe: viewport coordinate -> image pixel + sampled value.
//! Works identically in both zoom modes (it only consults the transform)
//! and never touches the tile cache.

use egui::{Pos2, Rect};

use crate::picture::{Picture, PixelValue};
use crate::view::ViewTransform;

/// Sample under a viewport point. `Absent` outside the image — that is a
/// normal outcome, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelSample {
    Absent,
    At { x: u32, y: u32, value: PixelValue },
}

/// Inverse-map `pos` through the transform, floor to integer image
/// coordinates and sample. Side-effect-free.
pub fn probe(
    picture: &Picture,
    transform: &ViewTransform,
    viewport: Rect,
    pos: Pos2,
) -> PixelSample {
    let img_pt = transform.screen_to_image(pos, viewport, picture.width(), picture.height());
    let x = img_pt.x.floor();
    let y = img_pt.y.floor();
    if x < 0.0 || y < 0.0 || x >= picture.width() as f32 || y >= picture.height() as f32 {
        return PixelSample::Absent;
    }
    let (x, y) = (x as u32, y as u32);
    PixelSample::At { x, y, value: picture.sample(x, y) }
}
