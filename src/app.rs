//! Application state: one editor session, the validated settings, and the
//! decode jobs in flight

use crate::config::Settings;
use crate::session::EditorSession;

#[cfg(not(target_arch = "wasm32"))]
use crate::asset::{AssetSlot, PendingDecode};
#[cfg(not(target_arch = "wasm32"))]
use crate::compose::BackgroundTemplate;

pub struct AppState {
    pub session: EditorSession,
    pub settings: Settings,
    /// One-line status shown in the shell's footer
    pub status: String,
    #[cfg(not(target_arch = "wasm32"))]
    pending: Vec<PendingDecode>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            session: EditorSession::new(),
            settings,
            status: "Open a product photo (O)".to_string(),
            #[cfg(not(target_arch = "wasm32"))]
            pending: Vec::new(),
        }
    }

    /// Kick off a background decode for the given slot
    #[cfg(not(target_arch = "wasm32"))]
    pub fn begin_decode(&mut self, bytes: Vec<u8>, name: String, slot: AssetSlot) {
        let generation = self.session.begin_load(slot);
        self.pending
            .push(PendingDecode::spawn(bytes, name, slot, generation));
    }

    /// Poll in-flight decodes once per frame. A finished decode only applies
    /// when its generation is still current for the slot; superseded results
    /// are dropped. Decode failures log and leave prior state untouched.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn poll_decodes(&mut self, canvas_dims: (f32, f32)) {
        let mut i = 0;
        while i < self.pending.len() {
            let Some(result) = self.pending[i].poll() else {
                i += 1;
                continue;
            };
            let job = self.pending.swap_remove(i);

            match result {
                Ok(asset) => {
                    if !self.session.is_current(job.slot, job.generation) {
                        println!("Discarding superseded decode of {}", asset.name);
                        continue;
                    }
                    match job.slot {
                        AssetSlot::Source => {
                            self.status = format!(
                                "Loaded {} ({}x{})",
                                asset.name, asset.width, asset.height
                            );
                            self.session.apply_source(asset, canvas_dims);
                        }
                        AssetSlot::Cutout => {
                            self.status = format!("Loaded cutout {}", asset.name);
                            self.session.apply_cutout(asset);
                        }
                        AssetSlot::Background => {
                            if self.session.composition.is_none() {
                                self.session.enter_composition(&self.settings, canvas_dims);
                            }
                            self.status = format!("Composition background: {}", asset.name);
                            self.session
                                .set_composition_background(BackgroundTemplate::Image(asset));
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Decode failed: {}", e);
                    self.status = format!("Load failed: {}", e);
                }
            }
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::asset::ImageAsset;

    const CANVAS: (f32, f32) = (800.0, 600.0);

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        ImageAsset::from_rgba("t", w, h, vec![255u8; (w * h * 4) as usize])
            .encode_png()
            .unwrap()
    }

    fn drain(app: &mut AppState) {
        // Decodes finish on worker threads; poll until none remain
        while {
            app.poll_decodes(CANVAS);
            !app.pending.is_empty()
        } {
            std::thread::yield_now();
        }
    }

    #[test]
    fn test_decode_applies_to_source_slot() {
        let mut app = AppState::new(Settings::default());
        app.begin_decode(png_bytes(40, 30), "photo.png".to_string(), AssetSlot::Source);
        drain(&mut app);
        assert_eq!(app.session.source.as_ref().unwrap().dims(), (40, 30));
    }

    #[test]
    fn test_superseded_decode_dropped() {
        let mut app = AppState::new(Settings::default());
        app.begin_decode(png_bytes(10, 10), "old.png".to_string(), AssetSlot::Source);
        app.begin_decode(png_bytes(20, 20), "new.png".to_string(), AssetSlot::Source);
        drain(&mut app);
        // Whichever thread finished first, only the newest load may win
        assert_eq!(app.session.source.as_ref().unwrap().name, "new.png");
    }

    #[test]
    fn test_decode_failure_keeps_prior_state() {
        let mut app = AppState::new(Settings::default());
        app.begin_decode(png_bytes(10, 10), "good.png".to_string(), AssetSlot::Source);
        drain(&mut app);
        app.begin_decode(b"garbage".to_vec(), "bad.png".to_string(), AssetSlot::Source);
        drain(&mut app);
        // The failed load leaves the previous image in place
        assert_eq!(app.session.source.as_ref().unwrap().name, "good.png");
        assert!(app.status.starts_with("Load failed"));
    }
}
