//! View transform: zoom / pan / rotation and image↔screen mapping
//!
//! The image is drawn centered on the canvas, offset by the pan vector and
//! scaled by `zoom_percent / 100`. Rotation applies about the image's own
//! on-screen center at draw time only - hit-testing and the crop frame work
//! on the unrotated extent.

use crate::ui::Rect;

pub const ZOOM_MIN: f32 = 5.0;
pub const ZOOM_MAX: f32 = 500.0;
/// Button zoom step
pub const ZOOM_STEP: f32 = 1.2;
/// Wheel zoom factors (scroll up / scroll down)
pub const WHEEL_ZOOM_IN: f32 = 1.1;
pub const WHEEL_ZOOM_OUT: f32 = 0.9;

/// Zoom, pan and rotation for the canvas view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Zoom percentage, always within [ZOOM_MIN, ZOOM_MAX]
    pub zoom_percent: f32,
    pub pan_x: f32,
    pub pan_y: f32,
    /// Degrees, normalized to [0, 360)
    pub rotation_degrees: f32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom_percent: 100.0,
            pan_x: 0.0,
            pan_y: 0.0,
            rotation_degrees: 0.0,
        }
    }
}

impl ViewState {
    /// Screen pixels per image pixel
    pub fn scale(&self) -> f32 {
        self.zoom_percent / 100.0
    }

    /// Pan by a screen-space delta
    pub fn panned(&self, dx: f32, dy: f32) -> Self {
        Self {
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
            ..*self
        }
    }

    /// Rotate by `degrees` (negative = counter-clockwise), normalizing
    /// into [0, 360)
    pub fn rotated(&self, degrees: f32) -> Self {
        Self {
            rotation_degrees: (self.rotation_degrees + degrees).rem_euclid(360.0),
            ..*self
        }
    }

    /// Center-anchored zoom: the image-space point under the canvas center
    /// stays at the canvas center after the zoom change
    pub fn zoomed_to(
        &self,
        new_zoom_percent: f32,
        image_dims: (u32, u32),
        canvas_dims: (f32, f32),
    ) -> Self {
        let new_zoom = new_zoom_percent.clamp(ZOOM_MIN, ZOOM_MAX);

        // Image-space point currently under the canvas center
        let (cx, cy) = (canvas_dims.0 * 0.5, canvas_dims.1 * 0.5);
        let anchor = screen_to_image(self, (cx, cy), image_dims, canvas_dims);

        // Solve the pan that puts the anchor back at the canvas center
        let next = Self {
            zoom_percent: new_zoom,
            ..*self
        };
        let s = next.scale();
        Self {
            pan_x: s * (image_dims.0 as f32 * 0.5 - anchor.0),
            pan_y: s * (image_dims.1 as f32 * 0.5 - anchor.1),
            ..next
        }
    }

    pub fn zoom_in(&self, image_dims: (u32, u32), canvas_dims: (f32, f32)) -> Self {
        self.zoomed_to(self.zoom_percent * ZOOM_STEP, image_dims, canvas_dims)
    }

    pub fn zoom_out(&self, image_dims: (u32, u32), canvas_dims: (f32, f32)) -> Self {
        self.zoomed_to(self.zoom_percent / ZOOM_STEP, image_dims, canvas_dims)
    }

    /// Wheel-driven continuous zoom; `scroll_up` is "towards the screen"
    pub fn wheel_zoom(
        &self,
        scroll_up: bool,
        image_dims: (u32, u32),
        canvas_dims: (f32, f32),
    ) -> Self {
        let factor = if scroll_up { WHEEL_ZOOM_IN } else { WHEEL_ZOOM_OUT };
        self.zoomed_to(self.zoom_percent * factor, image_dims, canvas_dims)
    }
}

/// The unrotated on-screen extent of the image under this view
pub fn image_extent_on_screen(
    view: &ViewState,
    image_dims: (u32, u32),
    canvas_dims: (f32, f32),
) -> Rect {
    let s = view.scale();
    let w = image_dims.0 as f32 * s;
    let h = image_dims.1 as f32 * s;
    Rect::new(
        (canvas_dims.0 - w) * 0.5 + view.pan_x,
        (canvas_dims.1 - h) * 0.5 + view.pan_y,
        w,
        h,
    )
}

/// Map an image-space point to screen space (pre-rotation)
pub fn image_to_screen(
    view: &ViewState,
    point: (f32, f32),
    image_dims: (u32, u32),
    canvas_dims: (f32, f32),
) -> (f32, f32) {
    let extent = image_extent_on_screen(view, image_dims, canvas_dims);
    let s = view.scale();
    (extent.x + point.0 * s, extent.y + point.1 * s)
}

/// Map a screen-space point back to image space (pre-rotation)
pub fn screen_to_image(
    view: &ViewState,
    point: (f32, f32),
    image_dims: (u32, u32),
    canvas_dims: (f32, f32),
) -> (f32, f32) {
    let extent = image_extent_on_screen(view, image_dims, canvas_dims);
    let s = view.scale();
    ((point.0 - extent.x) / s, (point.1 - extent.y) / s)
}

/// Fit-to-view zoom percentage with zero pan.
///
/// Fill fraction is 0.90, or 0.95 when either image dimension exceeds twice
/// the canvas dimension (large composite assets get less margin).
pub fn fit_to_view(image_dims: (u32, u32), canvas_dims: (f32, f32)) -> f32 {
    let (iw, ih) = (image_dims.0 as f32, image_dims.1 as f32);
    let (cw, ch) = canvas_dims;
    if iw <= 0.0 || ih <= 0.0 || cw <= 0.0 || ch <= 0.0 {
        return 100.0;
    }

    let is_large = iw > cw * 2.0 || ih > ch * 2.0;
    let fill = if is_large { 0.95 } else { 0.90 };

    let canvas_aspect = cw / ch;
    let image_aspect = iw / ih;
    let scale = if image_aspect > canvas_aspect {
        cw * fill / iw
    } else {
        ch * fill / ih
    };

    (scale * 100.0).clamp(ZOOM_MIN, ZOOM_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: (f32, f32) = (800.0, 600.0);
    const IMG: (u32, u32) = (400, 300);

    fn anchor_under_center(view: &ViewState) -> (f32, f32) {
        screen_to_image(view, (CANVAS.0 * 0.5, CANVAS.1 * 0.5), IMG, CANVAS)
    }

    #[test]
    fn test_zoom_preserves_canvas_center_point() {
        let view = ViewState {
            zoom_percent: 100.0,
            pan_x: 37.0,
            pan_y: -22.0,
            rotation_degrees: 0.0,
        };
        let before = anchor_under_center(&view);

        for next in [
            view.zoom_in(IMG, CANVAS),
            view.zoom_out(IMG, CANVAS),
            view.zoomed_to(163.0, IMG, CANVAS),
            view.wheel_zoom(true, IMG, CANVAS),
            view.wheel_zoom(false, IMG, CANVAS),
        ] {
            let mapped = image_to_screen(&next, before, IMG, CANVAS);
            assert!((mapped.0 - CANVAS.0 * 0.5).abs() < 1e-3, "{mapped:?}");
            assert!((mapped.1 - CANVAS.1 * 0.5).abs() < 1e-3, "{mapped:?}");
        }
    }

    #[test]
    fn test_zoom_clamped_under_repeated_steps() {
        let mut view = ViewState::default();
        for _ in 0..60 {
            view = view.zoom_in(IMG, CANVAS);
        }
        assert_eq!(view.zoom_percent, ZOOM_MAX);
        for _ in 0..120 {
            view = view.zoom_out(IMG, CANVAS);
        }
        assert_eq!(view.zoom_percent, ZOOM_MIN);
    }

    #[test]
    fn test_fit_to_view_idempotent() {
        let z1 = fit_to_view(IMG, CANVAS);
        let view = ViewState {
            zoom_percent: z1,
            ..Default::default()
        };
        let z2 = fit_to_view(IMG, CANVAS);
        assert_eq!(z1, z2);
        assert_eq!(view.pan_x, 0.0);
        assert_eq!(view.pan_y, 0.0);
    }

    #[test]
    fn test_fit_fill_fractions() {
        // Normal image: width-constrained, 0.90 fill
        let z = fit_to_view((1600, 300), CANVAS);
        assert!((z - 800.0 * 0.90 / 1600.0 * 100.0).abs() < 1e-3);

        // Large composite (both dims > 2x canvas): 0.95 fill
        let z = fit_to_view((4000, 3000), CANVAS);
        assert!((z - 800.0 * 0.95 / 4000.0 * 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_fit_chooses_height_for_tall_images() {
        let z = fit_to_view((300, 1200), CANVAS);
        assert!((z - 600.0 * 0.90 / 1200.0 * 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_screen_image_roundtrip() {
        let view = ViewState {
            zoom_percent: 130.0,
            pan_x: -14.0,
            pan_y: 9.0,
            rotation_degrees: 0.0,
        };
        let p = (123.0, 45.0);
        let s = image_to_screen(&view, p, IMG, CANVAS);
        let back = screen_to_image(&view, s, IMG, CANVAS);
        assert!((back.0 - p.0).abs() < 1e-3);
        assert!((back.1 - p.1).abs() < 1e-3);
    }

    #[test]
    fn test_rotation_normalizes() {
        let view = ViewState::default();
        assert_eq!(view.rotated(-1.0).rotation_degrees, 359.0);
        assert_eq!(view.rotated(365.0).rotation_degrees, 5.0);
        let mut v = view;
        for _ in 0..400 {
            v = v.rotated(1.0);
        }
        assert!(v.rotation_degrees >= 0.0 && v.rotation_degrees < 360.0);
    }
}
