//! LIGHTBOX STUDIO: product-photo editing canvas
//!
//! Interactive raster editor for product shots: zoom/pan/rotate view of a
//! photo and its background-removed cutout, non-destructive crop, a
//! synthesized ground shadow driven by a virtual light, and background
//! composition - all composited on a CPU surface and exported as PNG,
//! exactly as seen on screen.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod app;
mod asset;
mod canvas;
mod compose;
mod config;
mod crop;
mod render;
mod session;
mod shadow;
mod shape;
mod ui;

use macroquad::prelude::*;

use app::AppState;
use canvas::Surface;
use config::Settings;
use session::ViewMode;
use ui::MouseState;

#[cfg(not(target_arch = "wasm32"))]
use asset::AssetSlot;

/// Canvas never shrinks below this, mirroring the minimum window content size
const MIN_CANVAS_W: f32 = 400.0;
const MIN_CANVAS_H: f32 = 300.0;

const TEXT_COLOR: Color = Color::new(0.85, 0.85, 0.85, 1.0);
const TEXT_DIM: Color = Color::new(0.55, 0.55, 0.55, 1.0);
const ACCENT_COLOR: Color = Color::new(0.28, 0.51, 0.71, 1.0);
const OVERLAY_BG: Color = Color::new(0.0, 0.0, 0.0, 0.8);

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Lightbox Studio v{}", VERSION),
        window_width: 1280,
        window_height: 800,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    // Crash logging first, before any other code runs
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    let settings = Settings::load(std::path::Path::new(config::SETTINGS_FILE));
    let mut app = AppState::new(settings);
    let mut surface = Surface::new(1280, 800);

    // Pan drag tracking
    let mut panning = false;
    let mut last_mouse = (0.0f32, 0.0f32);

    println!("=== LIGHTBOX STUDIO v{} ===", VERSION);

    loop {
        let canvas_w = screen_width().max(MIN_CANVAS_W);
        let canvas_h = screen_height().max(MIN_CANVAS_H);
        let canvas_dims = (canvas_w, canvas_h);
        surface.resize(canvas_w as usize, canvas_h as usize);

        let (mx, my) = mouse_position();
        let mouse = MouseState {
            x: mx,
            y: my,
            left_down: is_mouse_button_down(MouseButton::Left),
            left_pressed: is_mouse_button_pressed(MouseButton::Left),
            left_released: is_mouse_button_released(MouseButton::Left),
            scroll: mouse_wheel().1,
            ctrl: is_key_down(KeyCode::LeftControl) || is_key_down(KeyCode::RightControl),
            shift: is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift),
        };

        handle_keys(&mut app, &mouse, canvas_dims, &surface);
        handle_mouse(&mut app, &mouse, canvas_dims, &mut panning, &mut last_mouse);

        // Apply any decode that completed since last frame
        #[cfg(not(target_arch = "wasm32"))]
        app.poll_decodes(canvas_dims);

        // Composite the scene and present it
        render::draw_frame(&mut surface, &mut app.session, &app.settings);
        let texture =
            Texture2D::from_rgba8(surface.width as u16, surface.height as u16, &surface.pixels);
        texture.set_filter(FilterMode::Nearest);

        clear_background(BLACK);
        draw_texture_ex(
            &texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(canvas_w, canvas_h)),
                ..Default::default()
            },
        );

        draw_overlays(&app, canvas_dims);

        next_frame().await
    }
}

/// Keyboard shortcuts; all state changes repaint on the same frame
fn handle_keys(app: &mut AppState, mouse: &MouseState, canvas_dims: (f32, f32), surface: &Surface) {
    let _ = surface; // only used by the native export path

    // View modes
    if is_key_pressed(KeyCode::Key1) {
        app.session.view_mode = ViewMode::Original;
    }
    if is_key_pressed(KeyCode::Key2) {
        app.session.view_mode = ViewMode::Processed;
    }
    if is_key_pressed(KeyCode::Key3) {
        app.session.view_mode = ViewMode::Comparison;
    }

    // Zoom / fit / reset
    if is_key_pressed(KeyCode::Equal) {
        app.session.zoom_in(canvas_dims);
    }
    if is_key_pressed(KeyCode::Minus) {
        app.session.zoom_out(canvas_dims);
    }
    if is_key_pressed(KeyCode::Key9) {
        app.session.zoom_to(100.0, canvas_dims);
    }
    if is_key_pressed(KeyCode::F) {
        app.session.fit(canvas_dims);
    }
    if is_key_pressed(KeyCode::Key0) {
        app.session.reset_view(canvas_dims);
    }

    // Rotation
    let rot_step = if mouse.shift { 5.0 } else { 1.0 };
    if is_key_pressed(KeyCode::R) {
        app.session.rotate(rot_step);
    }
    if is_key_pressed(KeyCode::L) {
        app.session.rotate(-rot_step);
    }

    // Crop mode
    if is_key_pressed(KeyCode::C) {
        if app.session.crop.is_active() {
            app.session.cancel_crop();
            app.status = "Crop cancelled".to_string();
        } else {
            app.session.enter_crop(canvas_dims);
            if app.session.crop.is_active() {
                app.status = "Crop: drag corners/body, A = aspect, Enter applies".to_string();
            }
        }
    }
    if is_key_pressed(KeyCode::Escape) && app.session.crop.is_active() {
        app.session.cancel_crop();
        app.status = "Crop cancelled".to_string();
    }
    if is_key_pressed(KeyCode::A) && app.session.crop.is_active() {
        let next = app.session.crop.aspect.next();
        if let Some(extent) = app.session.displayed_extent(canvas_dims) {
            app.session.crop.set_aspect(next, extent);
        }
        app.status = format!("Aspect: {}", next.label());
    }
    if is_key_pressed(KeyCode::Enter) && app.session.crop.is_active() {
        match app.session.commit_crop(canvas_dims) {
            Ok(outcome) => {
                app.status = format!("Cropped to {}x{}", outcome.width, outcome.height);
            }
            Err(e) => {
                eprintln!("Crop rejected: {}", e);
                app.status = format!("Crop rejected: {}", e);
            }
        }
    }

    // Composition mode
    if is_key_pressed(KeyCode::M) {
        if app.session.composition.is_some() {
            app.session.exit_composition();
            app.status = "Composition mode off".to_string();
        } else {
            app.session.enter_composition(&app.settings, canvas_dims);
            app.status = "Composition: arrows move, , . scale, B background".to_string();
        }
    }
    if let Some(comp) = &mut app.session.composition {
        let move_step = if mouse.shift { 10.0 } else { 2.0 };
        if is_key_down(KeyCode::Left) {
            comp.move_foreground(-move_step, 0.0);
        }
        if is_key_down(KeyCode::Right) {
            comp.move_foreground(move_step, 0.0);
        }
        if is_key_down(KeyCode::Up) {
            comp.move_foreground(0.0, -move_step);
        }
        if is_key_down(KeyCode::Down) {
            comp.move_foreground(0.0, move_step);
        }
        if is_key_pressed(KeyCode::Comma) {
            comp.adjust_foreground_scale(-0.05);
        }
        if is_key_pressed(KeyCode::Period) {
            comp.adjust_foreground_scale(0.05);
        }
    }

    // Canvas chrome and shadow toggles
    if is_key_pressed(KeyCode::G) {
        app.settings.show_grid = !app.settings.show_grid;
    }
    if is_key_pressed(KeyCode::K) {
        app.settings.canvas_background = app.settings.canvas_background.next();
        app.status = format!("Background: {}", app.settings.canvas_background.label());
    }
    if is_key_pressed(KeyCode::H) {
        app.settings.ground_shadow_enabled = !app.settings.ground_shadow_enabled;
        app.status = format!(
            "Ground shadow {}",
            if app.settings.ground_shadow_enabled { "on" } else { "off" }
        );
    }
    if is_key_pressed(KeyCode::J) {
        app.settings.drop_shadow_enabled = !app.settings.drop_shadow_enabled;
        app.status = format!(
            "Drop shadow {}",
            if app.settings.drop_shadow_enabled { "on" } else { "off" }
        );
    }
    if is_key_pressed(KeyCode::V) {
        use shadow::ShadowShape;
        app.settings.shadow_shape = match app.settings.shadow_shape {
            ShadowShape::Elliptical => ShadowShape::Auto,
            ShadowShape::Auto => ShadowShape::Elliptical,
        };
        app.status = format!("Shadow shape: {:?}", app.settings.shadow_shape);
    }

    // Light nudges
    if is_key_pressed(KeyCode::LeftBracket) {
        app.settings.nudge_light_angle(-5.0);
        app.status = format!("Light angle: {:.0}°", app.settings.light.angle_degrees);
    }
    if is_key_pressed(KeyCode::RightBracket) {
        app.settings.nudge_light_angle(5.0);
        app.status = format!("Light angle: {:.0}°", app.settings.light.angle_degrees);
    }
    if is_key_pressed(KeyCode::PageUp) {
        app.settings.nudge_light_distance(25.0);
        app.status = format!("Light distance: {:.0}", app.settings.light.distance);
    }
    if is_key_pressed(KeyCode::PageDown) {
        app.settings.nudge_light_distance(-25.0);
        app.status = format!("Light distance: {:.0}", app.settings.light.distance);
    }

    // File operations (native only: dialogs and disk I/O)
    #[cfg(not(target_arch = "wasm32"))]
    {
        if is_key_pressed(KeyCode::O) {
            open_into_slot(app, AssetSlot::Source, "Open product photo");
        }
        if is_key_pressed(KeyCode::U) {
            open_into_slot(app, AssetSlot::Cutout, "Open background-removed cutout");
        }
        if is_key_pressed(KeyCode::B) {
            open_into_slot(app, AssetSlot::Background, "Open composition background");
        }
        if is_key_pressed(KeyCode::E) {
            export_surface(app, surface);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn open_into_slot(app: &mut AppState, slot: AssetSlot, title: &str) {
    let dialog = rfd::FileDialog::new()
        .set_title(title)
        .add_filter("Images", &["png", "jpg", "jpeg", "bmp"]);
    let Some(path) = dialog.pick_file() else { return };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    match std::fs::read(&path) {
        Ok(bytes) => {
            app.status = format!("Decoding {}...", name);
            app.begin_decode(bytes, name, slot);
        }
        Err(e) => {
            eprintln!("Failed to read {}: {}", path.display(), e);
            app.status = format!("Failed to read {}", name);
        }
    }
}

/// Save the surface exactly as displayed; what you see is what you export
#[cfg(not(target_arch = "wasm32"))]
fn export_surface(app: &mut AppState, surface: &Surface) {
    let png = match render::export_png(surface) {
        Ok(png) => png,
        Err(e) => {
            eprintln!("Export failed: {}", e);
            app.status = format!("Export failed: {}", e);
            return;
        }
    };

    let dialog = rfd::FileDialog::new()
        .set_title("Export composite")
        .set_file_name("lightbox-export.png")
        .add_filter("PNG", &["png"]);
    let Some(path) = dialog.save_file() else { return };

    match std::fs::write(&path, &png) {
        Ok(()) => {
            // The upload automation consumes the same raster as a data-URL
            let url = asset::png_data_url(&png);
            println!(
                "Exported {}x{} ({} bytes as data URL)",
                surface.width,
                surface.height,
                url.len()
            );
            app.status = format!("Exported {}x{}", surface.width, surface.height);
        }
        Err(e) => {
            eprintln!("Failed to write {}: {}", path.display(), e);
            app.status = format!("Export failed: {}", e);
        }
    }
}

/// Wheel zoom/rotate, crop-frame dragging, and canvas panning
fn handle_mouse(
    app: &mut AppState,
    mouse: &MouseState,
    canvas_dims: (f32, f32),
    panning: &mut bool,
    last_mouse: &mut (f32, f32),
) {
    let session = &mut app.session;

    if mouse.scroll != 0.0 {
        if mouse.ctrl {
            // Ctrl+wheel rotates: 1° per notch, 5° with shift
            let step = if mouse.shift { 5.0 } else { 1.0 };
            session.rotate(if mouse.scroll > 0.0 { step } else { -step });
        } else {
            session.wheel_zoom(mouse.scroll > 0.0, canvas_dims);
        }
    }

    // Crop handles win over panning
    if session.crop.is_active() {
        if let Some(extent) = session.displayed_extent(canvas_dims) {
            session.crop.handle_mouse(mouse, extent);
        }
        if session.crop.is_dragging() {
            *panning = false;
            *last_mouse = (mouse.x, mouse.y);
            return;
        }
    }

    if mouse.left_down {
        if *panning {
            let dx = mouse.x - last_mouse.0;
            let dy = mouse.y - last_mouse.1;
            session.pan(dx, dy);
        }
        *panning = true;
    } else {
        *panning = false;
    }
    *last_mouse = (mouse.x, mouse.y);
}

/// Textual chrome on top of the presented surface. Not part of the exported
/// raster; the export is the surface itself.
fn draw_overlays(app: &AppState, canvas_dims: (f32, f32)) {
    let session = &app.session;
    let (cw, ch) = canvas_dims;

    if session.source.is_none() {
        let msg = "Open a product photo (O)";
        let dims = measure_text(msg, None, 22, 1.0);
        draw_text(msg, (cw - dims.width) / 2.0, ch / 2.0, 22.0, TEXT_DIM);
    }

    // Comparison labels
    if session.view_mode == ViewMode::Comparison && session.composition.is_none() {
        if let Some(extent) = session.displayed_extent(canvas_dims) {
            let half = extent.w / 2.0;
            draw_label_centered("Original", extent.x + half / 2.0, extent.y + 20.0);
            let right_label = if session.cutout.is_some() {
                "Processed"
            } else {
                "Not Processed"
            };
            draw_label_centered(right_label, extent.x + half + half / 2.0, extent.y + 20.0);
        }
    }

    // Processed fallback message over the dim veil
    if session.view_mode == ViewMode::Processed
        && session.cutout.is_none()
        && session.composition.is_none()
    {
        if let Some(extent) = session.displayed_extent(canvas_dims) {
            draw_label_centered(
                "No processed image available",
                extent.center_x(),
                extent.center_y() - 10.0,
            );
            draw_label_centered(
                "Load a cutout first (U)",
                extent.center_x(),
                extent.center_y() + 10.0,
            );
        }
    }

    // Composition readout
    if let Some(comp) = &session.composition {
        draw_rectangle(10.0, 10.0, 260.0, 86.0, OVERLAY_BG);
        draw_text("Composition Mode", 20.0, 32.0, 16.0, TEXT_COLOR);
        draw_text(
            &format!("Scale: {:.0}%", comp.foreground_scale * 100.0),
            20.0,
            52.0,
            14.0,
            TEXT_COLOR,
        );
        draw_text(
            &format!(
                "Position: {:.0}, {:.0}",
                comp.foreground_x, comp.foreground_y
            ),
            20.0,
            70.0,
            14.0,
            TEXT_COLOR,
        );
        draw_text("Exports at canvas resolution", 20.0, 88.0, 12.0, ACCENT_COLOR);
    }

    // Status bar
    let zoom_text = format!(
        "{:.0}%  {}°  {}",
        session.view.zoom_percent,
        session.view.rotation_degrees.round(),
        session.view_mode.label()
    );
    draw_text(&zoom_text, 10.0, ch - 28.0, 16.0, TEXT_COLOR);
    draw_text(&app.status, 10.0, ch - 10.0, 14.0, TEXT_DIM);

    if session.crop.is_active() {
        let crop_text = format!("Crop  [{}]", session.crop.aspect.label());
        let dims = measure_text(&crop_text, None, 16, 1.0);
        draw_text(&crop_text, cw - dims.width - 12.0, ch - 10.0, 16.0, ACCENT_COLOR);
    }
}

fn draw_label_centered(text: &str, x: f32, y: f32) {
    let dims = measure_text(text, None, 16, 1.0);
    draw_rectangle(
        x - dims.width / 2.0 - 6.0,
        y - 14.0,
        dims.width + 12.0,
        20.0,
        OVERLAY_BG,
    );
    draw_text(text, x - dims.width / 2.0, y, 16.0, WHITE);
}
