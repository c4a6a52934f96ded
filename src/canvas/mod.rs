//! Canvas core: coordinate transforms and the CPU compositing surface
//!
//! - `transform` - view state (zoom/pan/rotation) and image↔screen mapping
//! - `surface` - RGBA framebuffer with the raster primitives the compositor
//!   paints with (blits, polygon fill, checker, gradient, blur)

pub mod surface;
pub mod transform;

pub use surface::{box_blur_alpha, box_blur_rgba, Rgba, Surface};
pub use transform::{
    ViewState, fit_to_view, image_extent_on_screen, image_to_screen, screen_to_image,
    ZOOM_MAX, ZOOM_MIN, ZOOM_STEP, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT,
};
