//! Meme asset inventory — read-only to this core.
//!
//! A collaborator records every image and GIF it observes in chat; this core
//! only samples from a bounded recency window and distinguishes local raster
//! files (decoded and composed) from remote animated-GIF URLs (passed
//! through unmodified).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::error::EngineError;

/// Default recency window for sampling assets.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Where an asset's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    /// A raster file on local disk (png/jpg/jpeg/webp).
    Local(PathBuf),
    /// A remote animated GIF — never rendered, only linked.
    RemoteGif(String),
}

/// One observed chat image, owned by the collaborating asset recorder.
#[derive(Debug, Clone)]
pub struct MemeAsset {
    pub community_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub user_id: String,
    pub location: AssetLocation,
    pub created_at: DateTime<Utc>,
}

impl MemeAsset {
    /// Local path, when this asset is a decodable raster file.
    pub fn local_path(&self) -> Option<&Path> {
        match &self.location {
            AssetLocation::Local(path) => Some(path),
            AssetLocation::RemoteGif(_) => None,
        }
    }
}

/// Raster extensions the compositor can decode. Anything else is skipped
/// with a warning before decode is even attempted.
pub fn is_supported_raster(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("png" | "jpg" | "jpeg" | "webp")
    )
}

/// Read port over the collaborator-owned asset inventory.
pub trait AssetStore: Send + Sync {
    /// Up to `count` local raster assets for `community` observed within
    /// `window` of now, newest first. An empty result is not an error.
    fn recent_images(
        &self,
        community: &str,
        count: usize,
        window: Duration,
    ) -> Result<Vec<MemeAsset>, EngineError>;

    /// A recently observed remote GIF URL, if any.
    fn recent_gif(&self, community: &str) -> Result<Option<String>, EngineError>;
}
