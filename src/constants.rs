//! Limits, keys and file locations shared across the dashboard

/// Avatar acquisition and crop constants
pub mod avatar {
    /// Maximum accepted upload size (5 MiB)
    pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

    /// MIME types accepted for avatar uploads
    pub const SUPPORTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

    /// Side length of the square output canvas in pixels
    pub const OUTPUT_SIZE: u32 = 120;

    /// Zoom applied when the editor opens a new crop session
    pub const DEFAULT_ZOOM: f32 = 1.2;

    /// Zoom range accepted by the crop engine
    pub const MIN_ZOOM: f32 = 1.0;
    pub const MAX_ZOOM: f32 = 5.0;

    /// MIME type of the encoded output asset
    pub const OUTPUT_MIME: &str = "image/png";
}

/// Dynamic list field bounds
pub mod lists {
    /// Maximum number of entries in interests, potential interests and links
    pub const MAX_ITEMS: usize = 10;

    /// Maximum characters in a single interest tag
    pub const MAX_TAG_CHARS: usize = 30;
}

/// Local key-value store
pub mod store {
    /// Logical key the profile record lives under
    pub const PROFILE_KEY: &str = "profileData";

    /// Visibility key used by records from the first release
    pub const LEGACY_VISIBILITY_KEY: &str = "showProfile";

    /// Schema version written into every stored record
    pub const SCHEMA_VERSION: u32 = 1;

    /// File extension for stored values
    pub const VALUE_EXTENSION: &str = "json";
}

/// Config file location and environment overrides
pub mod config {
    /// Directory name under the platform config/data dirs
    pub const APP_DIR: &str = "profile-dashboard";

    /// Config filename
    pub const FILENAME: &str = "config.json";

    /// Overrides the local store directory
    pub const ENV_STORE_DIR: &str = "PROFILE_DASHBOARD_STORE_DIR";

    /// Overrides the initial mode policy (`view` or `edit`)
    pub const ENV_INITIAL_MODE: &str = "PROFILE_DASHBOARD_INITIAL_MODE";

    /// Log level environment variable
    pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
}
