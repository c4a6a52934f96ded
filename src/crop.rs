//! Interactive crop: screen-space frame, aspect constraints, image-space
//! commit math
//!
//! The frame lives in screen space on top of the unrotated image extent and
//! is only converted to image pixels at commit time. Frame mutations return
//! new values; the engine state machine owns the active frame.

use std::fmt;

use crate::canvas::{screen_to_image, ViewState};
use crate::ui::{MouseState, Rect};

/// Drawn size of the corner handles
pub const HANDLE_SIZE: f32 = 8.0;
/// Hit-test radius around each corner
pub const HANDLE_HIT_RADIUS: f32 = 12.0;
/// Frames smaller than this are not produced by dragging
pub const MIN_FRAME_SIZE: f32 = 16.0;
/// Fraction of the on-screen extent the initial frame covers
const INITIAL_COVERAGE: f32 = 0.7;

/// Aspect-ratio constraint for the crop frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Free,
    Square,
    Standard4x3,
    Landscape16x9,
    Portrait3x4,
    Vertical9x16,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 6] = [
        AspectRatio::Free,
        AspectRatio::Square,
        AspectRatio::Standard4x3,
        AspectRatio::Landscape16x9,
        AspectRatio::Portrait3x4,
        AspectRatio::Vertical9x16,
    ];

    /// Width / height, or None for unconstrained
    pub fn ratio(&self) -> Option<f32> {
        match self {
            AspectRatio::Free => None,
            AspectRatio::Square => Some(1.0),
            AspectRatio::Standard4x3 => Some(4.0 / 3.0),
            AspectRatio::Landscape16x9 => Some(16.0 / 9.0),
            AspectRatio::Portrait3x4 => Some(3.0 / 4.0),
            AspectRatio::Vertical9x16 => Some(9.0 / 16.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Free => "Free",
            AspectRatio::Square => "Square (1:1)",
            AspectRatio::Standard4x3 => "Standard (4:3)",
            AspectRatio::Landscape16x9 => "Landscape (16:9)",
            AspectRatio::Portrait3x4 => "Portrait (3:4)",
            AspectRatio::Vertical9x16 => "Vertical (9:16)",
        }
    }

    /// Cycle to the next preset (for the keyboard shortcut)
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|a| a == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Crop rejection reasons
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CropError {
    /// The frame resolves to a zero- or negative-area image rect
    Empty,
    /// No active crop session or no image to crop
    Inactive,
    /// The cropped result could not be serialized
    Encode(String),
}

impl fmt::Display for CropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropError::Empty => write!(f, "crop frame resolves to an empty region"),
            CropError::Inactive => write!(f, "crop mode is not active"),
            CropError::Encode(msg) => write!(f, "failed to encode cropped image: {}", msg),
        }
    }
}

impl std::error::Error for CropError {}

/// Screen-space crop frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropFrame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropFrame {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    fn from_rect(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.w,
            height: r.h,
        }
    }

    /// Corner positions in nw, ne, sw, se order
    pub fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.x, self.y),
            (self.x + self.width, self.y),
            (self.x, self.y + self.height),
            (self.x + self.width, self.y + self.height),
        ]
    }
}

/// Which part of the frame a drag grabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropHandle {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
    Move,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    handle: CropHandle,
    start_x: f32,
    start_y: f32,
    start_frame: CropFrame,
}

/// Crop state machine: inactive -> active -> {committed, cancelled} -> inactive
#[derive(Default)]
pub struct CropTool {
    frame: Option<CropFrame>,
    pub aspect: AspectRatio,
    drag: Option<DragState>,
}

impl CropTool {
    pub fn is_active(&self) -> bool {
        self.frame.is_some()
    }

    pub fn frame(&self) -> Option<CropFrame> {
        self.frame
    }

    /// Enter crop mode with a centered frame over the on-screen extent
    pub fn activate(&mut self, extent: Rect) {
        self.frame = Some(initial_frame(extent, self.aspect));
        self.drag = None;
    }

    /// Leave crop mode without touching the image
    pub fn cancel(&mut self) {
        self.frame = None;
        self.drag = None;
    }

    /// Changing the preset re-initializes the frame, like the original tool
    pub fn set_aspect(&mut self, aspect: AspectRatio, extent: Rect) {
        self.aspect = aspect;
        if self.frame.is_some() {
            self.frame = Some(initial_frame(extent, aspect));
        }
    }

    /// Feed one frame of mouse input; mutates the frame while dragging.
    /// Every mutation keeps the frame inside `extent`.
    pub fn handle_mouse(&mut self, mouse: &MouseState, extent: Rect) {
        let Some(frame) = self.frame else { return };

        if mouse.left_pressed {
            if let Some(handle) = hit_test(&frame, mouse.x, mouse.y) {
                self.drag = Some(DragState {
                    handle,
                    start_x: mouse.x,
                    start_y: mouse.y,
                    start_frame: frame,
                });
            }
        }

        if let Some(drag) = self.drag {
            if mouse.left_down {
                let dx = mouse.x - drag.start_x;
                let dy = mouse.y - drag.start_y;
                self.frame = Some(apply_drag(
                    &drag.start_frame,
                    drag.handle,
                    dx,
                    dy,
                    self.aspect,
                    extent,
                ));
            }
            if mouse.left_released {
                self.drag = None;
            }
        }
    }

    /// Whether a drag is in progress (the canvas suppresses panning then)
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Resolve the active frame to an image-space rect `(x, y, w, h)`,
    /// clamped to the image. Fails with `Empty` when the clamped region has
    /// no area; crop mode stays active so the user can adjust.
    pub fn image_space_rect(
        &self,
        view: &ViewState,
        image_dims: (u32, u32),
        canvas_dims: (f32, f32),
    ) -> Result<(u32, u32, u32, u32), CropError> {
        let frame = self.frame.ok_or(CropError::Inactive)?;
        image_space_rect(&frame, view, image_dims, canvas_dims)
    }
}

/// Centered frame covering 70% of the extent, shrunk on one axis to satisfy
/// the aspect constraint
pub fn initial_frame(extent: Rect, aspect: AspectRatio) -> CropFrame {
    let mut width = extent.w * INITIAL_COVERAGE;
    let mut height = extent.h * INITIAL_COVERAGE;

    if let Some(ratio) = aspect.ratio() {
        if width / height > ratio {
            width = height * ratio;
        } else {
            height = width / ratio;
        }
    }

    CropFrame {
        x: extent.x + (extent.w - width) / 2.0,
        y: extent.y + (extent.h - height) / 2.0,
        width,
        height,
    }
}

/// Which handle (if any) is under the pointer; corners win over the body
pub fn hit_test(frame: &CropFrame, x: f32, y: f32) -> Option<CropHandle> {
    let handles = [
        CropHandle::NorthWest,
        CropHandle::NorthEast,
        CropHandle::SouthWest,
        CropHandle::SouthEast,
    ];
    for (corner, handle) in frame.corners().iter().zip(handles) {
        let dx = x - corner.0;
        let dy = y - corner.1;
        if dx * dx + dy * dy <= HANDLE_HIT_RADIUS * HANDLE_HIT_RADIUS {
            return Some(handle);
        }
    }
    if frame.rect().contains(x, y) {
        return Some(CropHandle::Move);
    }
    None
}

fn apply_drag(
    start: &CropFrame,
    handle: CropHandle,
    dx: f32,
    dy: f32,
    aspect: AspectRatio,
    extent: Rect,
) -> CropFrame {
    match handle {
        CropHandle::Move => {
            let moved = Rect::new(start.x + dx, start.y + dy, start.width, start.height);
            CropFrame::from_rect(moved.clamp_within(&extent))
        }
        _ => {
            // Anchor the opposite corner, move the grabbed one
            let (anchor_x, anchor_y, sign_x, sign_y) = match handle {
                CropHandle::NorthWest => (start.x + start.width, start.y + start.height, -1.0, -1.0),
                CropHandle::NorthEast => (start.x, start.y + start.height, 1.0, -1.0),
                CropHandle::SouthWest => (start.x + start.width, start.y, -1.0, 1.0),
                CropHandle::SouthEast => (start.x, start.y, 1.0, 1.0),
                CropHandle::Move => unreachable!(),
            };

            let grab = match handle {
                CropHandle::NorthWest => (start.x + dx, start.y + dy),
                CropHandle::NorthEast => (start.x + start.width + dx, start.y + dy),
                CropHandle::SouthWest => (start.x + dx, start.y + start.height + dy),
                CropHandle::SouthEast => (start.x + start.width + dx, start.y + start.height + dy),
                CropHandle::Move => unreachable!(),
            };

            let mut width = ((grab.0 - anchor_x) * sign_x).max(MIN_FRAME_SIZE);
            let mut height = ((grab.1 - anchor_y) * sign_y).max(MIN_FRAME_SIZE);

            if let Some(ratio) = aspect.ratio() {
                // The dominant drag axis wins; the other follows the ratio
                if (width - start.width).abs() >= (height - start.height).abs() {
                    height = width / ratio;
                } else {
                    width = height * ratio;
                }
            }

            // Cap against the extent on the growing side, keeping the ratio
            let max_w = if sign_x > 0.0 {
                extent.right() - anchor_x
            } else {
                anchor_x - extent.x
            };
            let max_h = if sign_y > 0.0 {
                extent.bottom() - anchor_y
            } else {
                anchor_y - extent.y
            };
            if width > max_w {
                width = max_w;
                if let Some(ratio) = aspect.ratio() {
                    height = width / ratio;
                }
            }
            if height > max_h {
                height = max_h;
                if let Some(ratio) = aspect.ratio() {
                    width = height * ratio;
                }
            }

            let x = if sign_x > 0.0 { anchor_x } else { anchor_x - width };
            let y = if sign_y > 0.0 { anchor_y } else { anchor_y - height };
            CropFrame::from_rect(Rect::new(x, y, width, height).clamp_within(&extent))
        }
    }
}

/// Convert a screen-space frame to image pixels under the current view,
/// clamped to the image. `Empty` when the clamped rect has no area.
pub fn image_space_rect(
    frame: &CropFrame,
    view: &ViewState,
    image_dims: (u32, u32),
    canvas_dims: (f32, f32),
) -> Result<(u32, u32, u32, u32), CropError> {
    let (img_w, img_h) = (image_dims.0 as f32, image_dims.1 as f32);
    let (x0, y0) = screen_to_image(view, (frame.x, frame.y), image_dims, canvas_dims);
    let scale = view.scale();
    let w0 = frame.width / scale;
    let h0 = frame.height / scale;

    let x = x0.clamp(0.0, img_w);
    let y = y0.clamp(0.0, img_h);
    let w = w0.min(img_w - x);
    let h = h0.min(img_h - y);

    if w <= 0.0 || h <= 0.0 {
        return Err(CropError::Empty);
    }

    Ok((
        x.round() as u32,
        y.round() as u32,
        (w.round() as u32).max(1),
        (h.round() as u32).max(1),
    ))
}
