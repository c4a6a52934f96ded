//! Ground-shadow synthesis for the background-removed cutout
//!
//! The silhouette is generated in screen space from the analyzed object
//! bounds, distorted by the virtual light (angle, distance, object height,
//! perspective), rasterized into a coverage mask, blurred, and tinted onto
//! the surface *before* the foreground image so the cutout occludes it.
//!
//! Shadow size follows an inverse-square-root falloff of the light distance:
//! distance 200 is the reference, closer lights throw larger shadows.

use serde::{Deserialize, Serialize};

use crate::canvas::{box_blur_alpha, Rgba, Surface};
use crate::shape::{ObjectBounds, ShapeClass};
use crate::ui::Rect;

/// Reference light distance; `distance / 200` is the falloff factor
pub const REFERENCE_LIGHT_DISTANCE: f32 = 200.0;

/// Which silhouette generator the ground shadow uses.
///
/// The shipped behavior routes every object through the elliptical path for
/// visual consistency; `Auto` routes by the shape classifier instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadowShape {
    #[default]
    Elliptical,
    Auto,
}

/// Virtual light source and shadow styling, supplied by the control panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightConfig {
    pub angle_degrees: f32,
    /// Larger = more distant light = smaller, softer shadow
    pub distance: f32,
    pub object_height: f32,
    /// Extra vertical push of the whole shadow, in pixels
    pub shadow_distance: f32,
    /// 0 = strong skew, 1 = none
    pub perspective: f32,
    pub blur_radius: f32,
    pub opacity: f32,
    pub color: Rgba,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            angle_degrees: 330.0,
            distance: REFERENCE_LIGHT_DISTANCE,
            object_height: 300.0,
            shadow_distance: 0.0,
            perspective: 1.0,
            blur_radius: 10.0,
            opacity: 0.6,
            color: Rgba::BLACK,
        }
    }
}

impl LightConfig {
    pub fn distance_factor(&self) -> f32 {
        self.distance.max(1.0) / REFERENCE_LIGHT_DISTANCE
    }

    /// Inverse-square-root falloff: closer light throws a bigger shadow
    pub fn shadow_scale(&self) -> f32 {
        1.0 / self.distance_factor().sqrt()
    }

    /// Screen-space displacement of the shadow away from the light
    pub fn shadow_offsets(&self) -> (f32, f32) {
        let rad = self.angle_degrees.to_radians();
        let ldf = self.distance_factor();
        (
            rad.cos() * self.object_height * 0.3 / ldf,
            rad.sin() * self.object_height * 0.2 / ldf,
        )
    }
}

/// Simple offset drop shadow (the non-ground shadow mode)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropShadowConfig {
    pub blur_radius: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub opacity: f32,
    pub color: Rgba,
}

impl Default for DropShadowConfig {
    fn default() -> Self {
        Self {
            blur_radius: 10.0,
            offset_x: 5.0,
            offset_y: 5.0,
            opacity: 0.5,
            color: Rgba::BLACK,
        }
    }
}

/// Flat 16-point disc at the object's base, pre-ellipse-projection.
/// `origin` is the on-screen position of the analysis buffer's (0,0).
pub fn circular_base(bounds: &ObjectBounds, origin: (f32, f32)) -> Vec<(f32, f32)> {
    if bounds.is_empty() {
        return Vec::new();
    }
    let center_x = origin.0 + bounds.center_x;
    let base_y = origin.1 + bounds.max_y;
    let radius = bounds.width() / 2.0;

    let num_points = 16;
    (0..num_points)
        .map(|i| {
            let angle = i as f32 / num_points as f32 * std::f32::consts::TAU;
            (center_x + angle.cos() * radius, base_y)
        })
        .collect()
}

/// Flattened ground ellipse for circular objects: 24 samples on an ellipse
/// (1.1×r wide, 0.25×r tall) scaled by the light falloff, then displaced by
/// the light offsets, skewed by perspective, and pulled 3px toward the object.
pub fn elliptical_silhouette(base: &[(f32, f32)], light: &LightConfig) -> Vec<(f32, f32)> {
    if base.is_empty() {
        return Vec::new();
    }
    let center_x = base.iter().map(|p| p.0).sum::<f32>() / base.len() as f32;
    let base_y = base[0].1;
    let radius = base
        .iter()
        .map(|p| (p.0 - center_x).abs())
        .fold(0.0f32, f32::max);
    if radius <= 0.0 {
        return Vec::new();
    }

    let radius_x = radius * 1.1;
    let radius_y = radius * 0.25;
    let scale = light.shadow_scale();
    let (offset_x, offset_y) = light.shadow_offsets();
    let perspective_factor = 1.0 - light.perspective;

    let num_points = 24;
    (0..num_points)
        .map(|i| {
            let angle = i as f32 / num_points as f32 * std::f32::consts::TAU;
            let x = center_x + angle.cos() * radius_x * scale;
            let y = base_y + angle.sin() * radius_y * scale;
            let perspective_offset = (x - center_x) * perspective_factor * 0.3;
            (
                x + offset_x + perspective_offset,
                y + offset_y + light.shadow_distance - 3.0,
            )
        })
        .collect()
}

/// Base edge for rectangular objects: the bottom span of the bounds
pub fn rectangular_base(bounds: &ObjectBounds, origin: (f32, f32)) -> Vec<(f32, f32)> {
    if bounds.is_empty() {
        return Vec::new();
    }
    let left = origin.0 + bounds.min_x;
    let right = origin.0 + bounds.max_x;
    let bottom = origin.1 + bounds.max_y;
    vec![(left, bottom), (right, bottom)]
}

/// Base edge for complex objects: trace the lowest opaque pixel per column
/// (stepped), then smooth and decimate
pub fn contour_base(
    rgba: &[u8],
    width: usize,
    height: usize,
    origin: (f32, f32),
) -> Vec<(f32, f32)> {
    let step = 4usize.max(width / 24);
    let mut edge: Vec<(f32, f32)> = Vec::new();

    let mut x = 0usize;
    while x < width {
        for y in (0..height).rev() {
            if rgba[(y * width + x) * 4 + 3] > crate::shape::ALPHA_THRESHOLD {
                edge.push((origin.0 + x as f32, origin.1 + y as f32));
                break;
            }
        }
        x += step;
    }

    smooth_edge(edge)
}

/// Two passes of window-5 averaging followed by minimum-15px spacing
/// decimation. Endpoints are kept.
fn smooth_edge(mut points: Vec<(f32, f32)>) -> Vec<(f32, f32)> {
    if points.len() < 3 {
        return points;
    }
    points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let mut smoothed = points;
    for _ in 0..2 {
        let window = 5usize;
        let mut next = Vec::with_capacity(smoothed.len());
        for i in 0..smoothed.len() {
            if i == 0 || i == smoothed.len() - 1 {
                next.push(smoothed[i]);
                continue;
            }
            let lo = i.saturating_sub(window);
            let hi = (i + window).min(smoothed.len() - 1);
            let n = (hi - lo + 1) as f32;
            let (sx, sy) = smoothed[lo..=hi]
                .iter()
                .fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
            next.push((sx / n, sy / n));
        }
        smoothed = next;
    }

    let min_distance = 15.0f32;
    let mut decimated = vec![smoothed[0]];
    for p in &smoothed[1..smoothed.len() - 1] {
        let last = decimated[decimated.len() - 1];
        let dist = ((p.0 - last.0).powi(2) + (p.1 - last.1).powi(2)).sqrt();
        if dist >= min_distance {
            decimated.push(*p);
        }
    }
    decimated.push(smoothed[smoothed.len() - 1]);
    decimated
}

/// Standard projection for non-circular base edges: the offset base edge on
/// top, then a perspective-skewed copy pushed down by the shadow distance.
pub fn project_standard(base: &[(f32, f32)], light: &LightConfig) -> Vec<(f32, f32)> {
    if base.is_empty() {
        return Vec::new();
    }
    let (offset_x, offset_y) = light.shadow_offsets();
    let perspective_factor = 1.0 - light.perspective;
    let center_x = (base[0].0 + base[base.len() - 1].0) / 2.0;

    let mut silhouette: Vec<(f32, f32)> = base
        .iter()
        .map(|p| (p.0 + offset_x, p.1 + offset_y))
        .collect();

    for p in base.iter().rev() {
        let perspective_offset = (p.0 - center_x) * perspective_factor * 0.4;
        silhouette.push((
            p.0 + offset_x + perspective_offset,
            p.1 + offset_y + light.shadow_distance,
        ));
    }

    silhouette
}

/// Generate the ground-shadow silhouette for the cutout.
///
/// `rgba`/`width`/`height` is the analysis buffer (the cutout at draw size),
/// `origin` its on-screen position. Returns an empty silhouette for
/// degenerate bounds.
pub fn ground_silhouette(
    rgba: &[u8],
    width: usize,
    height: usize,
    bounds: &ObjectBounds,
    class: ShapeClass,
    shape: ShadowShape,
    origin: (f32, f32),
    light: &LightConfig,
) -> Vec<(f32, f32)> {
    if bounds.is_empty() {
        return Vec::new();
    }

    match (shape, class) {
        (ShadowShape::Elliptical, _) | (ShadowShape::Auto, ShapeClass::Circular) => {
            elliptical_silhouette(&circular_base(bounds, origin), light)
        }
        (ShadowShape::Auto, ShapeClass::Rectangular) => {
            project_standard(&rectangular_base(bounds, origin), light)
        }
        (ShadowShape::Auto, _) => {
            project_standard(&contour_base(rgba, width, height, origin), light)
        }
    }
}

/// Fill the silhouette into a mask, blur, and tint onto the surface.
/// `clip` restricts the shadow to a region (the comparison split uses this).
pub fn render_ground_shadow(
    surface: &mut Surface,
    silhouette: &[(f32, f32)],
    light: &LightConfig,
    clip: Option<Rect>,
) {
    if silhouette.len() < 3 {
        return;
    }
    let mut mask = surface.polygon_mask(silhouette);
    box_blur_alpha(
        &mut mask,
        surface.width,
        surface.height,
        light.blur_radius.max(0.0) as usize,
    );
    if let Some(clip) = clip {
        clip_mask(&mut mask, surface.width, surface.height, clip);
    }
    surface.blend_mask(&mask, light.color, light.opacity);
}

/// Zero mask coverage outside the clip rect
fn clip_mask(mask: &mut [u8], width: usize, height: usize, clip: Rect) {
    for y in 0..height {
        for x in 0..width {
            if !clip.contains(x as f32, y as f32) {
                mask[y * width + x] = 0;
            }
        }
    }
}

/// Offset drop shadow: the cutout's own alpha silhouette (with the current
/// rotation) shifted, blurred, and tinted under the image
pub fn render_drop_shadow(
    surface: &mut Surface,
    cutout_rgba: &[u8],
    cutout_w: usize,
    cutout_h: usize,
    dest: Rect,
    rotation_degrees: f32,
    config: &DropShadowConfig,
    clip: Option<Rect>,
) {
    let mut scratch = Surface::new(surface.width, surface.height);
    let shifted = Rect::new(
        dest.x + config.offset_x,
        dest.y + config.offset_y,
        dest.w,
        dest.h,
    );
    scratch.blit_scaled(
        cutout_rgba,
        cutout_w,
        cutout_h,
        shifted,
        rotation_degrees,
        1.0,
        None,
    );

    let mut mask: Vec<u8> = scratch
        .pixels
        .iter()
        .skip(3)
        .step_by(4)
        .copied()
        .collect();
    box_blur_alpha(
        &mut mask,
        surface.width,
        surface.height,
        config.blur_radius.max(0.0) as usize,
    );
    if let Some(clip) = clip {
        clip_mask(&mut mask, surface.width, surface.height, clip);
    }
    surface.blend_mask(&mask, config.color, config.opacity);
}
