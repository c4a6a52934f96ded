//! The compositor: fixed-layer-order frame painting and WYSIWYG export
//!
//! Layer order per frame: canvas background, composition background layer,
//! grid, image layer for the current view mode (with synthesized shadows
//! under the cutout), crop overlay. Everything paints into the CPU surface;
//! export encodes that surface verbatim, so the exported raster always
//! matches the on-screen layout. Textual chrome (labels, status readouts) is
//! drawn by the shell on top of the presented texture and is not part of the
//! exported surface.

use crate::asset::{self, AssetError, ImageAsset};
use crate::canvas::{box_blur_rgba, Rgba, Surface};
use crate::compose::{contain_fit, scaled_about_center, BackgroundTemplate, CompositionState};
use crate::config::{CanvasBackground, Settings};
use crate::crop::{CropFrame, HANDLE_SIZE};
use crate::session::{EditorSession, ViewMode};
use crate::shadow::{
    ground_silhouette, render_drop_shadow, render_ground_shadow,
};
use crate::ui::Rect;

const THEME_DARK: Rgba = Rgba::opaque(0x0f, 0x17, 0x2a);
const THEME_LIGHT: Rgba = Rgba::opaque(0xf8, 0xfa, 0xfc);
const CHECKER_LIGHT: Rgba = Rgba::opaque(0xf0, 0xf0, 0xf0);
const CHECKER_DARK: Rgba = Rgba::opaque(0xe0, 0xe0, 0xe0);
const CHECKER_CELL: usize = 20;
const GRID_LINE: Rgba = Rgba::new(0x99, 0x99, 0x99, 128);
const DIVIDER: Rgba = Rgba::opaque(0x25, 0x63, 0xeb);
const CROP_DIM: Rgba = Rgba::new(0, 0, 0, 128);
const CROP_GUIDE: Rgba = Rgba::new(255, 255, 255, 77);
const FOREGROUND_OUTLINE: Rgba = Rgba::opaque(0x00, 0xff, 0x00);

/// Paint one full frame of the session into the surface
pub fn draw_frame(surface: &mut Surface, session: &mut EditorSession, settings: &Settings) {
    let canvas_dims = (surface.width as f32, surface.height as f32);

    draw_canvas_background(surface, settings.canvas_background);

    if session.composition.is_some() {
        if let Some(comp) = &session.composition {
            draw_background_layer(surface, comp, canvas_dims);
        }
        if settings.show_grid {
            draw_grid(surface, settings.grid_size);
        }
        if let (Some(comp), Some(cutout)) = (&session.composition, &session.cutout) {
            draw_composition_foreground(surface, cutout, comp);
        }
        return;
    }

    if settings.show_grid {
        draw_grid(surface, settings.grid_size);
    }

    draw_image_layer(surface, session, settings, canvas_dims);

    if let (Some(frame), Some(extent)) =
        (session.crop.frame(), session.displayed_extent(canvas_dims))
    {
        draw_crop_overlay(surface, &frame, extent);
    }
}

/// Lossless PNG of the current surface, sized to the canvas
pub fn export_png(surface: &Surface) -> Result<Vec<u8>, AssetError> {
    asset::encode_png(&surface.pixels, surface.width as u32, surface.height as u32)
}

/// Data-URL form of the export for the upload collaborator
pub fn export_data_url(surface: &Surface) -> Result<String, AssetError> {
    Ok(asset::png_data_url(&export_png(surface)?))
}

fn draw_canvas_background(surface: &mut Surface, background: CanvasBackground) {
    let full = Rect::screen(surface.width as f32, surface.height as f32);
    match background {
        CanvasBackground::ThemeDark => surface.clear(THEME_DARK),
        CanvasBackground::ThemeLight => surface.clear(THEME_LIGHT),
        CanvasBackground::Checker => {
            surface.checker(full, CHECKER_CELL, CHECKER_LIGHT, CHECKER_DARK)
        }
        CanvasBackground::White => surface.clear(Rgba::WHITE),
        CanvasBackground::Black => surface.clear(Rgba::BLACK),
        CanvasBackground::Gray => surface.clear(Rgba::opaque(0x80, 0x80, 0x80)),
    }
}

fn draw_grid(surface: &mut Surface, spacing: f32) {
    let (w, h) = (surface.width as f32, surface.height as f32);
    let mut x = spacing;
    while x < w {
        surface.vline(x, 0.0, h - 1.0, GRID_LINE);
        x += spacing;
    }
    let mut y = spacing;
    while y < h {
        surface.hline(0.0, w - 1.0, y, GRID_LINE);
        y += spacing;
    }
}

/// Composition background: color, gradient, or contain-fit image with the
/// configured opacity / blur / zoom multiplier
fn draw_background_layer(surface: &mut Surface, comp: &CompositionState, canvas_dims: (f32, f32)) {
    let full = Rect::screen(canvas_dims.0, canvas_dims.1);
    let alpha = (comp.background_opacity * 255.0) as u8;
    match &comp.background {
        BackgroundTemplate::Color(color) => {
            surface.fill_rect(full, color.with_alpha(alpha));
        }
        BackgroundTemplate::Gradient { start, end } => {
            surface.diagonal_gradient(full, start.with_alpha(alpha), end.with_alpha(alpha));
        }
        BackgroundTemplate::Image(image) => {
            let fit = contain_fit(image.dims(), canvas_dims);
            let dest = scaled_about_center(fit, comp.background_scale, canvas_dims);
            if comp.background_blur > 0.0 {
                // Blur on a scratch layer so the blur never bleeds into
                // layers already painted
                let mut scratch = Surface::new(surface.width, surface.height);
                scratch.clear(Rgba::TRANSPARENT);
                scratch.blit_scaled(
                    &image.pixels,
                    image.width as usize,
                    image.height as usize,
                    dest,
                    0.0,
                    1.0,
                    None,
                );
                box_blur_rgba(
                    &mut scratch.pixels,
                    scratch.width,
                    scratch.height,
                    comp.background_blur as usize,
                );
                surface.blit_scaled(
                    &scratch.pixels,
                    scratch.width,
                    scratch.height,
                    full,
                    0.0,
                    comp.background_opacity,
                    None,
                );
            } else {
                surface.blit_scaled(
                    &image.pixels,
                    image.width as usize,
                    image.height as usize,
                    dest,
                    0.0,
                    comp.background_opacity,
                    None,
                );
            }
        }
    }
}

/// The movable cutout over the composition background, with a dashed outline
fn draw_composition_foreground(
    surface: &mut Surface,
    cutout: &ImageAsset,
    comp: &CompositionState,
) {
    let dest = comp.foreground_rect(cutout.dims());
    surface.blit_scaled(
        &cutout.pixels,
        cutout.width as usize,
        cutout.height as usize,
        dest,
        0.0,
        1.0,
        None,
    );
    surface.dashed_rect(dest, 5.0, 5.0, FOREGROUND_OUTLINE);
}

fn draw_image_layer(
    surface: &mut Surface,
    session: &mut EditorSession,
    settings: &Settings,
    canvas_dims: (f32, f32),
) {
    let Some(extent) = session.displayed_extent(canvas_dims) else {
        return;
    };
    let rotation = session.view.rotation_degrees;

    match session.view_mode {
        ViewMode::Original => {
            if let Some(source) = &session.source {
                blit_asset(surface, source, extent, rotation, None);
            }
        }
        ViewMode::Processed => {
            if session.cutout.is_some() {
                if settings.transparency_backdrop {
                    surface.checker(extent, CHECKER_CELL, THEME_LIGHT, CHECKER_DARK);
                }
                draw_shadows(surface, session, settings, extent, None);
                if let Some(cutout) = &session.cutout {
                    blit_asset(surface, cutout, extent, rotation, None);
                }
            } else if let Some(source) = &session.source {
                // Fallback: original plus a dim veil; the shell overlays the
                // "no processed image" message
                blit_asset(surface, source, extent, rotation, None);
                surface.fill_rect(extent, CROP_DIM);
            }
        }
        ViewMode::Comparison => {
            let half = extent.w / 2.0;
            let left = Rect::new(extent.x, extent.y, half, extent.h);
            let right = Rect::new(extent.x + half, extent.y, half, extent.h);

            if let Some(source) = &session.source {
                blit_asset(surface, source, extent, rotation, Some(left));
            }
            if session.cutout.is_some() {
                draw_shadows(surface, session, settings, extent, Some(right));
                if let Some(cutout) = &session.cutout {
                    blit_asset(surface, cutout, extent, rotation, Some(right));
                }
            }

            surface.vline_thick(extent.x + half, extent.y, extent.bottom(), 2.0, DIVIDER);
        }
    }
}

/// Ground and/or drop shadow under the cutout, clipped when comparing
fn draw_shadows(
    surface: &mut Surface,
    session: &mut EditorSession,
    settings: &Settings,
    extent: Rect,
    clip: Option<Rect>,
) {
    let rotation = session.view.rotation_degrees;

    if settings.ground_shadow_enabled {
        let draw_w = extent.w.round().max(1.0) as u32;
        let draw_h = extent.h.round().max(1.0) as u32;
        let silhouette = session.ensure_analysis(draw_w, draw_h).map(|analysis| {
            ground_silhouette(
                &analysis.rgba,
                analysis.width as usize,
                analysis.height as usize,
                &analysis.bounds,
                analysis.class,
                settings.shadow_shape,
                (extent.x, extent.y),
                &settings.light,
            )
        });
        if let Some(silhouette) = silhouette {
            render_ground_shadow(surface, &silhouette, &settings.light, clip);
        }
    }

    if settings.drop_shadow_enabled {
        if let Some(cutout) = &session.cutout {
            render_drop_shadow(
                surface,
                &cutout.pixels,
                cutout.width as usize,
                cutout.height as usize,
                extent,
                rotation,
                &settings.drop_shadow,
                clip,
            );
        }
    }
}

fn blit_asset(
    surface: &mut Surface,
    asset: &ImageAsset,
    dest: Rect,
    rotation_degrees: f32,
    clip: Option<Rect>,
) {
    surface.blit_scaled(
        &asset.pixels,
        asset.width as usize,
        asset.height as usize,
        dest,
        rotation_degrees,
        1.0,
        clip,
    );
}

/// Crop overlay: dim mask outside the frame, dashed border, rule-of-thirds
/// guides, corner handles
fn draw_crop_overlay(surface: &mut Surface, frame: &CropFrame, extent: Rect) {
    let f = frame.rect();

    // Dim everything of the image outside the frame
    surface.fill_rect(
        Rect::new(extent.x, extent.y, extent.w, f.y - extent.y),
        CROP_DIM,
    );
    surface.fill_rect(
        Rect::new(extent.x, f.bottom(), extent.w, extent.bottom() - f.bottom()),
        CROP_DIM,
    );
    surface.fill_rect(
        Rect::new(extent.x, f.y, f.x - extent.x, f.h),
        CROP_DIM,
    );
    surface.fill_rect(
        Rect::new(f.right(), f.y, extent.right() - f.right(), f.h),
        CROP_DIM,
    );

    surface.dashed_rect(f, 5.0, 5.0, Rgba::WHITE);

    // Rule-of-thirds guides
    let gx1 = f.x + f.w / 3.0;
    let gx2 = f.x + f.w * 2.0 / 3.0;
    let gy1 = f.y + f.h / 3.0;
    let gy2 = f.y + f.h * 2.0 / 3.0;
    surface.vline(gx1, f.y, f.bottom(), CROP_GUIDE);
    surface.vline(gx2, f.y, f.bottom(), CROP_GUIDE);
    surface.hline(f.x, f.right(), gy1, CROP_GUIDE);
    surface.hline(f.x, f.right(), gy2, CROP_GUIDE);

    // Corner handles: white squares with a blue border
    for (cx, cy) in frame.corners() {
        let handle = Rect::new(
            cx - HANDLE_SIZE / 2.0,
            cy - HANDLE_SIZE / 2.0,
            HANDLE_SIZE,
            HANDLE_SIZE,
        );
        surface.fill_rect(handle, Rgba::WHITE);
        let border = handle.expand(1.0);
        surface.hline(border.x, border.right(), border.y, DIVIDER);
        surface.hline(border.x, border.right(), border.bottom(), DIVIDER);
        surface.vline(border.x, border.y, border.bottom(), DIVIDER);
        surface.vline(border.right(), border.y, border.bottom(), DIVIDER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::ImageAsset;
    use crate::canvas::ViewState;

    fn solid_asset(name: &str, w: u32, h: u32, color: [u8; 4]) -> ImageAsset {
        let mut pixels = Vec::with_capacity((w * h * 4) as usize);
        for _ in 0..w * h {
            pixels.extend_from_slice(&color);
        }
        ImageAsset::from_rgba(name, w, h, pixels)
    }

    fn session_with_source(w: u32, h: u32, canvas: (f32, f32)) -> EditorSession {
        let mut session = EditorSession::new();
        session.apply_source(
            solid_asset("src", w, h, [200, 40, 40, 255]),
            canvas,
        );
        session
    }

    #[test]
    fn test_export_dims_match_canvas_not_source() {
        let mut surface = Surface::new(640, 480);
        let mut session = session_with_source(400, 300, (640.0, 480.0));
        draw_frame(&mut surface, &mut session, &Settings::default());

        let png = export_png(&surface).unwrap();
        let decoded = ImageAsset::from_encoded(&png, "export").unwrap();
        assert_eq!(decoded.dims(), (640, 480));
    }

    #[test]
    fn test_export_data_url_prefix() {
        let surface = Surface::new(16, 16);
        let url = export_data_url(&surface).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_canvas_backgrounds() {
        let mut surface = Surface::new(40, 40);
        draw_canvas_background(&mut surface, CanvasBackground::White);
        assert_eq!(surface.get_pixel(5, 5), Rgba::WHITE);
        draw_canvas_background(&mut surface, CanvasBackground::ThemeDark);
        assert_eq!(surface.get_pixel(5, 5), THEME_DARK);
        draw_canvas_background(&mut surface, CanvasBackground::Checker);
        let a = surface.get_pixel(0, 0);
        let b = surface.get_pixel(CHECKER_CELL, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_image_layer_paints_source_pixels() {
        let mut surface = Surface::new(200, 200);
        let mut session = session_with_source(100, 100, (200.0, 200.0));
        let mut settings = Settings::default();
        settings.canvas_background = CanvasBackground::Black;
        draw_frame(&mut surface, &mut session, &settings);
        // Canvas center lies inside the fitted image
        assert_eq!(surface.get_pixel(100, 100), Rgba::opaque(200, 40, 40));
        // Far corner stays canvas background
        assert_eq!(surface.get_pixel(2, 2), Rgba::BLACK);
    }

    #[test]
    fn test_comparison_divider_painted() {
        let canvas = (200.0, 200.0);
        let mut surface = Surface::new(200, 200);
        let mut session = session_with_source(100, 100, canvas);
        session.view_mode = crate::session::ViewMode::Comparison;
        draw_frame(&mut surface, &mut session, &Settings::default());

        let extent = session.displayed_extent(canvas).unwrap();
        let divider_x = (extent.x + extent.w / 2.0) as usize;
        let mid_y = (extent.y + extent.h / 2.0) as usize;
        assert_eq!(surface.get_pixel(divider_x, mid_y), DIVIDER);
    }

    #[test]
    fn test_processed_without_cutout_dims_image() {
        let canvas = (200.0, 200.0);
        let mut surface = Surface::new(200, 200);
        let mut session = session_with_source(100, 100, canvas);
        session.view_mode = crate::session::ViewMode::Processed;
        draw_frame(&mut surface, &mut session, &Settings::default());

        // The dim veil darkens the source color
        let px = surface.get_pixel(100, 100);
        assert!(px.r < 200 && px.r > 50);
    }

    #[test]
    fn test_crop_overlay_dims_outside_frame() {
        let canvas = (200.0, 200.0);
        let mut surface = Surface::new(200, 200);
        let mut session = session_with_source(100, 100, canvas);
        session.view = ViewState::default(); // zoom 100, centered
        session.enter_crop(canvas);
        let mut settings = Settings::default();
        settings.canvas_background = CanvasBackground::White;
        draw_frame(&mut surface, &mut session, &settings);

        let extent = session.displayed_extent(canvas).unwrap();
        // Just inside the image but outside the 70% frame: dimmed
        let edge = surface.get_pixel((extent.x + 2.0) as usize, (extent.y + 2.0) as usize);
        assert!(edge.r < 200);
        // Center of the frame: undimmed source color
        let center = surface.get_pixel(100, 100);
        assert_eq!(center, Rgba::opaque(200, 40, 40));
    }

    #[test]
    fn test_composition_mode_draws_background_and_foreground() {
        let canvas = (200.0, 200.0);
        let mut surface = Surface::new(200, 200);
        let mut session = session_with_source(100, 100, canvas);
        session.apply_cutout(solid_asset("cut", 50, 50, [0, 200, 0, 255]));
        session.enter_composition(&Settings::default(), canvas);
        session.set_composition_background(BackgroundTemplate::Color(Rgba::opaque(0, 0, 200)));
        draw_frame(&mut surface, &mut session, &Settings::default());

        // Foreground cutout centered on the canvas
        assert_eq!(surface.get_pixel(100, 100), Rgba::opaque(0, 200, 0));
        // Background color elsewhere
        assert_eq!(surface.get_pixel(5, 5), Rgba::opaque(0, 0, 200));
    }

    #[test]
    fn test_ground_shadow_painted_under_cutout() {
        let canvas = (300.0, 300.0);
        let mut surface = Surface::new(300, 300);
        let mut session = session_with_source(200, 200, canvas);

        // Disc cutout so the elliptical path runs
        let size = 200u32;
        let mut pixels = vec![0u8; (size * size * 4) as usize];
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - 100.0;
                let dy = y as f32 - 60.0;
                if dx * dx + dy * dy <= 50.0 * 50.0 {
                    let idx = ((y * size + x) * 4) as usize;
                    pixels[idx + 1] = 180;
                    pixels[idx + 3] = 255;
                }
            }
        }
        session.apply_cutout(ImageAsset::from_rgba("disc", size, size, pixels));
        session.view_mode = crate::session::ViewMode::Processed;

        let mut settings = Settings::default();
        settings.canvas_background = CanvasBackground::White;
        settings.light.blur_radius = 0.0;
        settings.light.opacity = 1.0;
        settings.light.object_height = 0.0;
        settings.light.shadow_distance = 0.0;
        draw_frame(&mut surface, &mut session, &settings);

        // The shadow ellipse sits at the disc's bottom edge; sample a point
        // just below the disc (outside its alpha) but inside the ellipse
        let extent = session.displayed_extent(canvas).unwrap();
        let cx = (extent.x + extent.w * 0.5) as usize;
        let sample_y = extent.y + extent.h * (110.0 / 200.0) + 7.0;
        let px = surface.get_pixel(cx, sample_y as usize);
        assert!(px.r < 100, "expected shadow at disc base, got {px:?}");
        assert!(px.g < 100, "sampled the cutout instead of the shadow: {px:?}");
    }
}
