//! Crop sessions: select a region of a source image and render it into the
//! fixed-size square avatar canvas

use image::imageops::FilterType;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::acquire::SourceImage;
use super::asset::{AssetError, AvatarAsset};
use crate::constants::avatar::{MAX_ZOOM, MIN_ZOOM, OUTPUT_SIZE};

#[derive(Debug, Error)]
pub enum CropError {
    #[error("no crop session is active")]
    NoSession,

    #[error("crop session {0} is no longer active")]
    StaleSession(u64),

    #[error("failed to encode avatar: {0}")]
    Encode(#[from] AssetError),
}

/// Crop rectangle in source-image pixels plus a zoom factor.
///
/// Zoom pre-scales the source around the rectangle's centre, so the region
/// actually sampled is `width / zoom` by `height / zoom`. A zero-sized
/// rectangle means "not adjusted yet" and resolves to the largest centred
/// square with no zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub zoom: f32,
}

impl Default for CropRegion {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            zoom: MIN_ZOOM,
        }
    }
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32, zoom: f32) -> Self {
        Self { x, y, width, height, zoom }
    }

    /// The whole source image at zoom 1
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height, MIN_ZOOM)
    }

    /// Largest centred square of a `width` x `height` image at `zoom`
    pub fn centred(width: u32, height: u32, zoom: f32) -> Self {
        let (x, y, side, _) = centred_square(width, height);
        Self::new(x, y, side, side, zoom)
    }

    pub fn is_unset(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Zoom clamped to the supported range; non-finite values fall back to 1
    fn effective_zoom(&self) -> f32 {
        if !self.zoom.is_finite() {
            warn!(zoom = self.zoom, "Non-finite zoom, using {}", MIN_ZOOM);
            return MIN_ZOOM;
        }
        if self.zoom < MIN_ZOOM {
            warn!(zoom = self.zoom, min = MIN_ZOOM, "Zoom below minimum, clamping");
            MIN_ZOOM
        } else if self.zoom > MAX_ZOOM {
            warn!(zoom = self.zoom, max = MAX_ZOOM, "Zoom exceeds maximum, clamping");
            MAX_ZOOM
        } else {
            self.zoom
        }
    }

    /// Resolve to the pixel rectangle `(x, y, w, h)` to sample from a
    /// `src_w` x `src_h` image. The result is always non-empty and inside the
    /// source bounds (for a non-empty source). Zoom only applies to a usable
    /// rectangle; the centred-square fallback is taken as is.
    pub fn resolve(&self, src_w: u32, src_h: u32) -> (u32, u32, u32, u32) {
        let Some((x, y, w, h)) = self.clamped(src_w, src_h) else {
            if !self.is_unset() {
                warn!(region = ?self, src_w, src_h, "Crop region outside source, using centred square");
            }
            return centred_square(src_w, src_h);
        };

        let zoom = self.effective_zoom();
        let zw = ((w as f32 / zoom).round() as u32).clamp(1, w);
        let zh = ((h as f32 / zoom).round() as u32).clamp(1, h);
        (x + (w - zw) / 2, y + (h - zh) / 2, zw, zh)
    }

    /// Intersect the rectangle with the source bounds
    fn clamped(&self, src_w: u32, src_h: u32) -> Option<(u32, u32, u32, u32)> {
        if self.is_unset() || self.x >= src_w || self.y >= src_h {
            return None;
        }
        let w = self.width.min(src_w - self.x);
        let h = self.height.min(src_h - self.y);
        if (w, h) != (self.width, self.height) {
            debug!(requested = ?(self.width, self.height), clamped = ?(w, h), "Crop region clamped to source");
        }
        Some((self.x, self.y, w, h))
    }
}

/// Largest square centred in a `w` x `h` image
fn centred_square(w: u32, h: u32) -> (u32, u32, u32, u32) {
    let side = w.min(h).max(1);
    (w.saturating_sub(side) / 2, h.saturating_sub(side) / 2, side, side)
}

/// Render `region` of `source` into a `size` x `size` encoded asset
pub fn render(source: &SourceImage, region: &CropRegion, size: u32) -> Result<AvatarAsset, CropError> {
    let (src_w, src_h) = source.dimensions();
    let (x, y, w, h) = region.resolve(src_w, src_h);
    let canvas = source
        .image
        .crop_imm(x, y, w, h)
        .resize_exact(size, size, FilterType::Lanczos3)
        .to_rgba8();
    Ok(AvatarAsset::encode(&canvas, src_w, src_h)?)
}

/// Handle to a crop session; only the engine's current session is live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(u64);

#[derive(Debug)]
struct CropSession {
    id: SessionId,
    source: SourceImage,
    region: CropRegion,
    staged: Option<AvatarAsset>,
}

/// Owns at most one crop session and its staged preview
#[derive(Debug)]
pub struct CropEngine {
    output_size: u32,
    last_id: u64,
    session: Option<CropSession>,
}

impl Default for CropEngine {
    fn default() -> Self {
        Self::new(OUTPUT_SIZE)
    }
}

impl CropEngine {
    pub fn new(output_size: u32) -> Self {
        Self {
            output_size,
            last_id: 0,
            session: None,
        }
    }

    /// Start cropping `source`. Any previous session and its staged preview
    /// are discarded.
    pub fn begin_crop(&mut self, source: SourceImage) -> SessionId {
        self.last_id += 1;
        let id = SessionId(self.last_id);
        if let Some(old) = self.session.take() {
            debug!(old = old.id.0, new = id.0, "Replacing crop session");
        }
        info!(session = id.0, width = source.width(), height = source.height(), "Crop session started");
        self.session = Some(CropSession {
            id,
            source,
            region: CropRegion::default(),
            staged: None,
        });
        id
    }

    pub fn is_active(&self, id: SessionId) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == id)
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Current region of the live session
    pub fn region(&self, id: SessionId) -> Result<CropRegion, CropError> {
        Ok(self.session_ref(id)?.region)
    }

    /// Source dimensions of the live session
    pub fn source_dimensions(&self, id: SessionId) -> Result<(u32, u32), CropError> {
        Ok(self.session_ref(id)?.source.dimensions())
    }

    /// Replace the session's region; the last call before commit wins
    pub fn update_region(&mut self, id: SessionId, region: CropRegion) -> Result<(), CropError> {
        let session = self.session_mut(id)?;
        session.region = region;
        Ok(())
    }

    /// Render the current region into the staging slot without ending the
    /// session. Replaces any earlier preview.
    pub fn preview(&mut self, id: SessionId) -> Result<&AvatarAsset, CropError> {
        let size = self.output_size;
        let session = self.session_mut(id)?;
        let asset = render(&session.source, &session.region, size)?;
        Ok(session.staged.insert(asset))
    }

    /// Staged preview of the live session, if one was rendered
    pub fn staged(&self) -> Option<&AvatarAsset> {
        self.session.as_ref().and_then(|s| s.staged.as_ref())
    }

    /// Render the current region and end the session.
    ///
    /// On an encode failure the session stays open so the caller can retry
    /// or cancel.
    pub fn commit(&mut self, id: SessionId) -> Result<AvatarAsset, CropError> {
        let size = self.output_size;
        let session = self.session_ref(id)?;
        let asset = render(&session.source, &session.region, size)?;
        self.session = None;
        info!(session = id.0, size, "Crop committed");
        Ok(asset)
    }

    /// Discard the session and its staged preview. Cancelling a session that
    /// already ended is a no-op.
    pub fn cancel(&mut self, id: SessionId) {
        if self.is_active(id) {
            self.session = None;
            info!(session = id.0, "Crop cancelled");
        } else {
            debug!(session = id.0, "Cancel for inactive crop session ignored");
        }
    }

    fn session_ref(&self, id: SessionId) -> Result<&CropSession, CropError> {
        match &self.session {
            Some(s) if s.id == id => Ok(s),
            Some(_) => Err(CropError::StaleSession(id.0)),
            None => Err(CropError::NoSession),
        }
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut CropSession, CropError> {
        match &mut self.session {
            Some(s) if s.id == id => Ok(s),
            Some(_) => Err(CropError::StaleSession(id.0)),
            None => Err(CropError::NoSession),
        }
    }
}
