//! Background composition mode
//!
//! The cutout becomes a freely positionable foreground over a chosen
//! background template (flat color, two-stop gradient, or image). The
//! composition has its own foreground transform, independent of the canvas
//! view state, and is discarded when the mode exits.

use crate::asset::ImageAsset;
use crate::canvas::Rgba;
use crate::ui::Rect;

pub const FOREGROUND_SCALE_MIN: f32 = 0.1;
pub const FOREGROUND_SCALE_MAX: f32 = 3.0;

/// What the composition paints behind the foreground
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundTemplate {
    Color(Rgba),
    Gradient { start: Rgba, end: Rgba },
    Image(ImageAsset),
}

impl Default for BackgroundTemplate {
    fn default() -> Self {
        // The stock gradient used when no template has been picked
        BackgroundTemplate::Gradient {
            start: Rgba::opaque(0x66, 0x7e, 0xea),
            end: Rgba::opaque(0x76, 0x4b, 0xa2),
        }
    }
}

/// State of an active composition session
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionState {
    pub background: BackgroundTemplate,
    pub foreground_x: f32,
    pub foreground_y: f32,
    pub foreground_scale: f32,
    /// Background layer effects (0..1 opacity, blur radius px, contain-fit
    /// zoom multiplier)
    pub background_opacity: f32,
    pub background_blur: f32,
    pub background_scale: f32,
}

impl CompositionState {
    pub fn new(background: BackgroundTemplate) -> Self {
        Self {
            background,
            foreground_x: 0.0,
            foreground_y: 0.0,
            foreground_scale: 1.0,
            background_opacity: 1.0,
            background_blur: 0.0,
            background_scale: 1.0,
        }
    }

    pub fn move_foreground(&mut self, dx: f32, dy: f32) {
        self.foreground_x += dx;
        self.foreground_y += dy;
    }

    pub fn set_foreground_scale(&mut self, scale: f32) {
        self.foreground_scale = scale.clamp(FOREGROUND_SCALE_MIN, FOREGROUND_SCALE_MAX);
    }

    pub fn adjust_foreground_scale(&mut self, delta: f32) {
        self.set_foreground_scale(self.foreground_scale + delta);
    }

    /// Center the foreground cutout on the canvas at its current scale
    pub fn center_foreground(&mut self, cutout_dims: (u32, u32), canvas_dims: (f32, f32)) {
        let w = cutout_dims.0 as f32 * self.foreground_scale;
        let h = cutout_dims.1 as f32 * self.foreground_scale;
        self.foreground_x = (canvas_dims.0 - w) / 2.0;
        self.foreground_y = (canvas_dims.1 - h) / 2.0;
    }

    /// On-screen rect of the foreground cutout
    pub fn foreground_rect(&self, cutout_dims: (u32, u32)) -> Rect {
        Rect::new(
            self.foreground_x,
            self.foreground_y,
            cutout_dims.0 as f32 * self.foreground_scale,
            cutout_dims.1 as f32 * self.foreground_scale,
        )
    }
}

/// "Contain" fit: scale the image to fit fully inside the canvas, centered,
/// preserving aspect ratio. The background layer applies its scale setting
/// as a zoom multiplier on top of this.
pub fn contain_fit(image_dims: (u32, u32), canvas_dims: (f32, f32)) -> Rect {
    let (iw, ih) = (image_dims.0 as f32, image_dims.1 as f32);
    let (cw, ch) = canvas_dims;
    if iw <= 0.0 || ih <= 0.0 {
        return Rect::default();
    }

    let image_aspect = iw / ih;
    let canvas_aspect = cw / ch;

    let (draw_w, draw_h) = if image_aspect > canvas_aspect {
        // Wider than the canvas: fit to width
        (cw, cw / image_aspect)
    } else {
        // Taller: fit to height
        (ch * image_aspect, ch)
    };

    Rect::new((cw - draw_w) / 2.0, (ch - draw_h) / 2.0, draw_w, draw_h)
}

/// Apply the background zoom multiplier around the canvas center
pub fn scaled_about_center(fit: Rect, scale: f32, canvas_dims: (f32, f32)) -> Rect {
    let w = fit.w * scale;
    let h = fit.h * scale;
    Rect::new(
        (canvas_dims.0 - w) / 2.0,
        (canvas_dims.1 - h) / 2.0,
        w,
        h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreground_scale_clamped() {
        let mut comp = CompositionState::new(BackgroundTemplate::default());
        comp.set_foreground_scale(10.0);
        assert_eq!(comp.foreground_scale, FOREGROUND_SCALE_MAX);
        comp.set_foreground_scale(0.0);
        assert_eq!(comp.foreground_scale, FOREGROUND_SCALE_MIN);
        comp.adjust_foreground_scale(0.05);
        assert!((comp.foreground_scale - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_contain_fit_wide_image() {
        let fit = contain_fit((2000, 500), (800.0, 600.0));
        assert_eq!(fit.w, 800.0);
        assert_eq!(fit.h, 200.0);
        assert_eq!(fit.x, 0.0);
        assert_eq!(fit.y, 200.0);
    }

    #[test]
    fn test_contain_fit_tall_image() {
        let fit = contain_fit((300, 600), (800.0, 600.0));
        assert_eq!(fit.h, 600.0);
        assert_eq!(fit.w, 300.0);
        assert_eq!(fit.x, 250.0);
    }

    #[test]
    fn test_center_foreground() {
        let mut comp = CompositionState::new(BackgroundTemplate::default());
        comp.set_foreground_scale(0.5);
        comp.center_foreground((400, 200), (800.0, 600.0));
        assert_eq!(comp.foreground_x, 300.0);
        assert_eq!(comp.foreground_y, 250.0);
    }

    #[test]
    fn test_scaled_about_center() {
        let fit = contain_fit((800, 600), (800.0, 600.0));
        let scaled = scaled_about_center(fit, 0.5, (800.0, 600.0));
        assert_eq!(scaled.w, 400.0);
        assert_eq!(scaled.x, 200.0);
    }
}
