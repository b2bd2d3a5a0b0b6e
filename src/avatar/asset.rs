//! Encoded avatar payloads
//!
//! Avatars are kept as self-contained `data:` URIs so the profile record
//! embeds the image directly and no side files are needed.

use base64::{Engine, engine::general_purpose};
use image::{DynamicImage, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::avatar::OUTPUT_MIME;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("not a base64 data URI")]
    NotDataUri,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
}

/// A rendered avatar ready to embed as an image source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarAsset {
    /// `data:image/png;base64,...`
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
    /// Dimensions of the image the asset was cropped from
    pub source_width: u32,
    pub source_height: u32,
}

impl AvatarAsset {
    /// Encode a rendered canvas as a PNG data URI
    pub fn encode(canvas: &RgbaImage, source_width: u32, source_height: u32) -> Result<Self, AssetError> {
        let mut png = Vec::new();
        image::codecs::png::PngEncoder::new(&mut png)
            .write_image(
                canvas.as_raw(),
                canvas.width(),
                canvas.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(AssetError::Encode)?;

        Ok(Self {
            data_uri: format!(
                "data:{OUTPUT_MIME};base64,{}",
                general_purpose::STANDARD.encode(&png)
            ),
            width: canvas.width(),
            height: canvas.height(),
            source_width,
            source_height,
        })
    }

    /// Rebuild an asset from a bare `data:` URI, reading the dimensions
    /// from the payload
    pub fn from_data_uri(data_uri: &str) -> Result<Self, AssetError> {
        let mut asset = Self {
            data_uri: data_uri.to_string(),
            width: 0,
            height: 0,
            source_width: 0,
            source_height: 0,
        };
        let image = asset.decode()?;
        asset.width = image.width();
        asset.height = image.height();
        asset.source_width = image.width();
        asset.source_height = image.height();
        Ok(asset)
    }

    /// Raw bytes of the encoded image
    pub fn bytes(&self) -> Result<Vec<u8>, AssetError> {
        let payload = self
            .data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .map(|(_mime, payload)| payload)
            .ok_or(AssetError::NotDataUri)?;
        Ok(general_purpose::STANDARD.decode(payload)?)
    }

    /// MIME type declared in the data URI header
    pub fn mime(&self) -> Option<&str> {
        self.data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(mime, _)| mime)
    }

    /// Decode the payload back into pixels
    pub fn decode(&self) -> Result<DynamicImage, AssetError> {
        image::load_from_memory(&self.bytes()?).map_err(AssetError::Decode)
    }
}
