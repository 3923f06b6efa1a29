use std::path::PathBuf;

use clap::Parser;

/// PixelFE — raster-image viewer with a pixel-inspection mode.
///
/// Zoom with the mouse wheel; at maximum magnification every source pixel
/// becomes an annotated cell showing its channel values.
#[derive(Parser, Debug)]
#[command(
    name = "pixelfe",
    about = "PixelFE interactive image viewer",
    long_about = "View images with continuous mouse-centered zoom. Zooming all the\n\
                  way in switches to pixel-inspection mode, where each source pixel\n\
                  is drawn as a 64x64 cell annotated with its numeric value(s).\n\n\
                  Example:\n  \
                  pixelfe photo.png\n  \
                  pixelfe ./screenshots/"
)]
pub struct CliArgs {
    /// Image file or folder to open at startup.
    /// A folder opens its first image and enables prev/next navigation.
    pub path: Option<PathBuf>,
}
