//! The per-document editing session
//!
//! One `EditorSession` owns everything a loaded document needs: the view
//! transform, the source and cutout assets, crop and composition mode state,
//! and the cached shape analysis. All operations go through the session;
//! there is no global state, so multiple documents are just multiple
//! sessions.

use crate::asset::{AssetSlot, ImageAsset};
use crate::canvas::{
    fit_to_view, image_extent_on_screen, ViewState, ZOOM_MAX, ZOOM_MIN, ZOOM_STEP,
    WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT,
};
use crate::compose::{BackgroundTemplate, CompositionState};
use crate::config::Settings;
use crate::crop::{CropError, CropTool};
use crate::shape::{classify_shape, find_object_bounds, ObjectBounds, ShapeClass};
use crate::ui::Rect;

/// What the image layer shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Original,
    /// Background-removed cutout with synthesized shadow
    Processed,
    /// Split view, original left / processed right
    Comparison,
}

impl ViewMode {
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Original => "Original",
            ViewMode::Processed => "Processed",
            ViewMode::Comparison => "Comparison",
        }
    }
}

/// Result of a committed crop, handed to the surrounding application
pub struct CropOutcome {
    pub asset: ImageAsset,
    /// Lossless PNG of the cropped region
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Cached shape analysis of the cutout at its current draw size
pub struct AnalysisCache {
    key: (u64, u32, u32),
    /// Cutout resampled to draw size (what the rays scan)
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bounds: ObjectBounds,
    pub class: ShapeClass,
}

/// All mutable state for one open document
pub struct EditorSession {
    pub view: ViewState,
    pub view_mode: ViewMode,
    pub source: Option<ImageAsset>,
    pub cutout: Option<ImageAsset>,
    pub crop: CropTool,
    pub composition: Option<CompositionState>,
    /// Bumped whenever source or cutout is replaced; keys the analysis cache
    asset_version: u64,
    /// Monotonic load counter; per-slot expected generation detects stale
    /// decodes racing in after a newer load superseded them
    load_seq: u64,
    expected: [u64; 3],
    analysis: Option<AnalysisCache>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    pub fn new() -> Self {
        Self {
            view: ViewState::default(),
            view_mode: ViewMode::default(),
            source: None,
            cutout: None,
            crop: CropTool::default(),
            composition: None,
            asset_version: 0,
            load_seq: 0,
            expected: [0; 3],
            analysis: None,
        }
    }

    // ----- async load bookkeeping -----

    /// Register a new load for `slot`; returns the generation token the
    /// decode must present on completion
    pub fn begin_load(&mut self, slot: AssetSlot) -> u64 {
        self.load_seq += 1;
        self.expected[slot_index(slot)] = self.load_seq;
        self.load_seq
    }

    /// Whether a completed decode is still the latest load for its slot
    pub fn is_current(&self, slot: AssetSlot, generation: u64) -> bool {
        self.expected[slot_index(slot)] == generation
    }

    // ----- asset lifecycle -----

    /// Install a decoded source image: replaces both assets, leaves crop and
    /// composition modes, and performs the single deterministic layout pass
    pub fn apply_source(&mut self, asset: ImageAsset, canvas_dims: (f32, f32)) {
        println!(
            "Loaded {} ({}x{})",
            asset.name, asset.width, asset.height
        );
        let dims = asset.dims();
        self.source = Some(asset);
        self.cutout = None;
        self.crop.cancel();
        self.composition = None;
        self.asset_version += 1;
        self.analysis = None;
        self.view = ViewState {
            zoom_percent: fit_to_view(dims, canvas_dims),
            ..ViewState::default()
        };
    }

    /// Install the background-removed cutout for the current source
    pub fn apply_cutout(&mut self, asset: ImageAsset) {
        println!(
            "Loaded cutout {} ({}x{})",
            asset.name, asset.width, asset.height
        );
        self.cutout = Some(asset);
        self.asset_version += 1;
        self.analysis = None;
    }

    /// The image the current view mode displays (drives zoom anchoring).
    /// Composition mode handles its own scaling, so no image is reported.
    pub fn displayed_image(&self) -> Option<&ImageAsset> {
        if self.composition.is_some() {
            return None;
        }
        match self.view_mode {
            ViewMode::Original | ViewMode::Comparison => self.source.as_ref(),
            ViewMode::Processed => self.cutout.as_ref().or(self.source.as_ref()),
        }
    }

    /// On-screen extent of the displayed image, if any
    pub fn displayed_extent(&self, canvas_dims: (f32, f32)) -> Option<Rect> {
        self.displayed_image()
            .map(|img| image_extent_on_screen(&self.view, img.dims(), canvas_dims))
    }

    // ----- view operations -----

    pub fn zoom_in(&mut self, canvas_dims: (f32, f32)) {
        match self.displayed_image().map(ImageAsset::dims) {
            Some(dims) => self.view = self.view.zoom_in(dims, canvas_dims),
            None => self.set_zoom_unanchored(self.view.zoom_percent * ZOOM_STEP),
        }
    }

    pub fn zoom_out(&mut self, canvas_dims: (f32, f32)) {
        match self.displayed_image().map(ImageAsset::dims) {
            Some(dims) => self.view = self.view.zoom_out(dims, canvas_dims),
            None => self.set_zoom_unanchored(self.view.zoom_percent / ZOOM_STEP),
        }
    }

    pub fn zoom_to(&mut self, percent: f32, canvas_dims: (f32, f32)) {
        match self.displayed_image().map(ImageAsset::dims) {
            Some(dims) => self.view = self.view.zoomed_to(percent, dims, canvas_dims),
            None => self.set_zoom_unanchored(percent),
        }
    }

    pub fn wheel_zoom(&mut self, scroll_up: bool, canvas_dims: (f32, f32)) {
        match self.displayed_image().map(ImageAsset::dims) {
            Some(dims) => self.view = self.view.wheel_zoom(scroll_up, dims, canvas_dims),
            None => {
                let factor = if scroll_up { WHEEL_ZOOM_IN } else { WHEEL_ZOOM_OUT };
                self.set_zoom_unanchored(self.view.zoom_percent * factor);
            }
        }
    }

    fn set_zoom_unanchored(&mut self, percent: f32) {
        self.view.zoom_percent = percent.clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.view = self.view.panned(dx, dy);
    }

    pub fn rotate(&mut self, degrees: f32) {
        self.view = self.view.rotated(degrees);
    }

    /// Refit the displayed image (zoom + centered pan), keeping rotation
    pub fn fit(&mut self, canvas_dims: (f32, f32)) {
        if let Some(dims) = self.displayed_image().map(ImageAsset::dims) {
            self.view = ViewState {
                zoom_percent: fit_to_view(dims, canvas_dims),
                rotation_degrees: self.view.rotation_degrees,
                ..ViewState::default()
            };
        }
    }

    /// Reset zoom, pan and rotation, then fit
    pub fn reset_view(&mut self, canvas_dims: (f32, f32)) {
        self.view = ViewState::default();
        self.fit(canvas_dims);
    }

    // ----- crop mode -----

    pub fn enter_crop(&mut self, canvas_dims: (f32, f32)) {
        if let Some(extent) = self.displayed_extent(canvas_dims) {
            self.crop.activate(extent);
        }
    }

    pub fn cancel_crop(&mut self) {
        self.crop.cancel();
    }

    /// Destructive crop commit: resample the framed region out of the source,
    /// replace it, drop the stale cutout, and neutralize zoom/pan. On error
    /// the crop session stays active so the user can adjust the frame.
    pub fn commit_crop(&mut self, canvas_dims: (f32, f32)) -> Result<CropOutcome, CropError> {
        let source = self.source.as_ref().ok_or(CropError::Inactive)?;
        let (x, y, w, h) = self
            .crop
            .image_space_rect(&self.view, source.dims(), canvas_dims)?;

        let asset = source.crop_resampled(x, y, w, h);
        let png = asset
            .encode_png()
            .map_err(|e| CropError::Encode(e.to_string()))?;
        println!("Cropped to {}x{}", asset.width, asset.height);

        let outcome = CropOutcome {
            asset: asset.clone(),
            png,
            width: asset.width,
            height: asset.height,
        };

        self.source = Some(asset);
        self.cutout = None; // no longer matches the cropped source
        self.asset_version += 1;
        self.analysis = None;
        self.crop.cancel();
        self.view.zoom_percent = 100.0;
        self.view.pan_x = 0.0;
        self.view.pan_y = 0.0;

        Ok(outcome)
    }

    // ----- composition mode -----

    pub fn enter_composition(&mut self, settings: &Settings, canvas_dims: (f32, f32)) {
        let mut comp = CompositionState::new(BackgroundTemplate::default());
        comp.background_opacity = settings.background_opacity;
        comp.background_blur = settings.background_blur;
        comp.background_scale = settings.background_scale;
        if let Some(cutout) = &self.cutout {
            comp.center_foreground(cutout.dims(), canvas_dims);
        }
        self.composition = Some(comp);
    }

    pub fn exit_composition(&mut self) {
        self.composition = None;
    }

    pub fn set_composition_background(&mut self, background: BackgroundTemplate) {
        if let Some(comp) = &mut self.composition {
            comp.background = background;
        }
    }

    // ----- shape analysis -----

    /// Analyze the cutout at its on-screen draw size, cached until the
    /// assets or the draw size change. Returns None without a cutout.
    pub fn ensure_analysis(&mut self, draw_w: u32, draw_h: u32) -> Option<&AnalysisCache> {
        let cutout = self.cutout.as_ref()?;
        if draw_w == 0 || draw_h == 0 {
            return None;
        }

        let key = (self.asset_version, draw_w, draw_h);
        let stale = self
            .analysis
            .as_ref()
            .map(|c| c.key != key)
            .unwrap_or(true);

        if stale {
            let rgba = cutout.scaled_rgba(draw_w, draw_h);
            let bounds = find_object_bounds(&rgba, draw_w as usize, draw_h as usize);
            let class = classify_shape(&rgba, draw_w as usize, draw_h as usize, &bounds);
            self.analysis = Some(AnalysisCache {
                key,
                rgba,
                width: draw_w,
                height: draw_h,
                bounds,
                class,
            });
        }

        self.analysis.as_ref()
    }
}

fn slot_index(slot: AssetSlot) -> usize {
    match slot {
        AssetSlot::Source => 0,
        AssetSlot::Cutout => 1,
        AssetSlot::Background => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: (f32, f32) = (800.0, 600.0);

    fn flat_asset(name: &str, w: u32, h: u32) -> ImageAsset {
        ImageAsset::from_rgba(name, w, h, vec![128u8; (w * h * 4) as usize])
    }

    fn disc_cutout(size: u32) -> ImageAsset {
        let mut pixels = vec![0u8; (size * size * 4) as usize];
        let c = size as f32 / 2.0;
        let r = size as f32 * 0.4;
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - c;
                let dy = y as f32 - c;
                if dx * dx + dy * dy <= r * r {
                    let idx = ((y * size + x) * 4) as usize;
                    pixels[idx + 3] = 255;
                }
            }
        }
        ImageAsset::from_rgba("disc", size, size, pixels)
    }

    #[test]
    fn test_apply_source_resets_and_fits() {
        let mut session = EditorSession::new();
        session.view = ViewState {
            zoom_percent: 300.0,
            pan_x: 50.0,
            pan_y: 50.0,
            rotation_degrees: 90.0,
        };
        session.apply_source(flat_asset("a", 400, 300), CANVAS);
        assert_eq!(session.view.pan_x, 0.0);
        assert_eq!(session.view.rotation_degrees, 0.0);
        assert!((session.view.zoom_percent - fit_to_view((400, 300), CANVAS)).abs() < 1e-4);
        assert!(session.cutout.is_none());
    }

    #[test]
    fn test_stale_decode_generation_detected() {
        let mut session = EditorSession::new();
        let first = session.begin_load(AssetSlot::Source);
        let second = session.begin_load(AssetSlot::Source);
        assert!(!session.is_current(AssetSlot::Source, first));
        assert!(session.is_current(AssetSlot::Source, second));
        // Loads on other slots do not invalidate this one
        let cutout = session.begin_load(AssetSlot::Cutout);
        assert!(session.is_current(AssetSlot::Source, second));
        assert!(session.is_current(AssetSlot::Cutout, cutout));
    }

    #[test]
    fn test_commit_crop_replaces_source_and_drops_cutout() {
        let mut session = EditorSession::new();
        session.apply_source(flat_asset("a", 400, 300), CANVAS);
        session.apply_cutout(disc_cutout(200));
        session.view = ViewState::default(); // zoom 100 for exact math
        session.enter_crop(CANVAS);
        assert!(session.crop.is_active());

        let outcome = session.commit_crop(CANVAS).expect("crop should commit");
        // Initial frame covers 70% of the 400x300 extent
        assert!((outcome.width as i64 - 280).abs() <= 1);
        assert!((outcome.height as i64 - 210).abs() <= 1);
        assert!(!outcome.png.is_empty());

        assert!(session.cutout.is_none());
        assert!(!session.crop.is_active());
        assert_eq!(session.view.zoom_percent, 100.0);
        assert_eq!(session.source.as_ref().unwrap().width, outcome.width);
    }

    #[test]
    fn test_commit_crop_without_image_rejected() {
        let mut session = EditorSession::new();
        assert!(matches!(
            session.commit_crop(CANVAS),
            Err(CropError::Inactive)
        ));
    }

    #[test]
    fn test_commit_crop_invalid_keeps_mode_active() {
        let mut session = EditorSession::new();
        session.apply_source(flat_asset("a", 400, 300), CANVAS);
        session.enter_crop(CANVAS);
        // Pan the image far off-screen so the frame maps past its right edge
        session.view.pan_x = -10_000.0;
        assert!(matches!(session.commit_crop(CANVAS), Err(CropError::Empty)));
        assert!(session.crop.is_active());
        assert_eq!(session.source.as_ref().unwrap().width, 400);
    }

    #[test]
    fn test_analysis_cached_by_version_and_size() {
        let mut session = EditorSession::new();
        session.apply_source(flat_asset("a", 400, 300), CANVAS);
        session.apply_cutout(disc_cutout(100));

        let bounds = session.ensure_analysis(100, 100).unwrap().bounds;
        assert!(!bounds.is_empty());
        // Same inputs reuse the cache
        let again = session.ensure_analysis(100, 100).unwrap();
        assert_eq!(again.bounds, bounds);
        // New draw size re-analyzes at the new resolution
        let larger = session.ensure_analysis(200, 200).unwrap();
        assert!(larger.bounds.width() > bounds.width());
    }

    #[test]
    fn test_processed_mode_falls_back_to_source() {
        let mut session = EditorSession::new();
        session.apply_source(flat_asset("a", 400, 300), CANVAS);
        session.view_mode = ViewMode::Processed;
        assert_eq!(session.displayed_image().unwrap().name, "a");
        session.apply_cutout(disc_cutout(100));
        assert_eq!(session.displayed_image().unwrap().name, "disc");
    }

    #[test]
    fn test_composition_suppresses_zoom_anchoring() {
        let mut session = EditorSession::new();
        session.apply_source(flat_asset("a", 400, 300), CANVAS);
        session.enter_composition(&Settings::default(), CANVAS);
        assert!(session.displayed_image().is_none());
        session.zoom_in(CANVAS);
        assert!(session.view.zoom_percent <= ZOOM_MAX);
    }
}
