//! Avatar pipeline: acquire a source image, crop it, encode the result

pub mod acquire;
pub mod asset;
pub mod crop;
pub mod loader;

pub use acquire::{AcquireError, ImageBlob, SourceImage, acquire};
pub use asset::AvatarAsset;
pub use crop::{CropEngine, CropError, CropRegion, SessionId};
pub use loader::{AvatarLoader, Generation};
