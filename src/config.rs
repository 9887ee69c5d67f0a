//! Engine configuration.
//!
//! Two layers:
//! - [`EngineSettings`] — process-wide tuning (eviction ceiling, asset
//!   sampling, delivery probability table), loaded once from
//!   `config/default.toml` and resolved from `Raw*` serde shapes with
//!   per-field defaults;
//! - [`CommunityConfig`] — per-community switches fetched fresh through the
//!   [`ConfigPort`] on every inbound message; the core keeps no cache.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::EngineError;

// ── Per-community configuration ───────────────────────────────────────────────

/// Per-community chatter configuration, owned by the hosting bot's config
/// storage and fetched fresh per invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct CommunityConfig {
    /// Feature switch — when off, inbound messages are a silent no-op.
    #[serde(default)]
    pub enabled: bool,
    /// Probability in `[0, 1]` that a trained message also triggers a
    /// generated response.
    #[serde(default)]
    pub response_chance: f64,
    #[serde(default = "default_min_words")]
    pub min_words: usize,
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    /// Channels the chatter may respond in. Empty means every channel.
    #[serde(default)]
    pub allowed_channels: Vec<String>,
    /// Channels the chatter must stay out of. Deny wins over allow.
    #[serde(default)]
    pub denied_channels: Vec<String>,
}

fn default_min_words() -> usize { 2 }
fn default_max_words() -> usize { 20 }

impl CommunityConfig {
    pub fn channel_allowed(&self, channel_id: &str) -> bool {
        if self.denied_channels.iter().any(|c| c == channel_id) {
            return false;
        }
        self.allowed_channels.is_empty()
            || self.allowed_channels.iter().any(|c| c == channel_id)
    }
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            response_chance: 0.0,
            min_words: default_min_words(),
            max_words: default_max_words(),
            allowed_channels: Vec::new(),
            denied_channels: Vec::new(),
        }
    }
}

/// Read port over the collaborator-owned per-community configuration.
pub trait ConfigPort: Send + Sync {
    fn community_config(&self, community: &str) -> Result<CommunityConfig, EngineError>;
}

// ── Engine settings ───────────────────────────────────────────────────────────

/// Bigram store maintenance knobs.
#[derive(Debug, Clone, Copy)]
pub struct ChainSettings {
    /// Max edges per community before eviction.
    pub edge_ceiling: u64,
    /// Extra headroom deleted past the overshoot.
    pub evict_batch: u64,
}

/// Asset sampling knobs.
#[derive(Debug, Clone, Copy)]
pub struct AssetSettings {
    /// Recency window, in days, for sampling observed images.
    pub window_days: i64,
    /// Source images per strip composite.
    pub strip_images: usize,
    /// Secondary thumbnails per overlay composite.
    pub overlay_thumbs: usize,
}

/// Cumulative delivery probability table, evaluated in fixed order:
/// gif → strip → overlay → reply → post → reaction (remainder).
#[derive(Debug, Clone, Copy)]
pub struct DeliveryTable {
    pub gif: f64,
    pub strip: f64,
    pub overlay: f64,
    pub reply: f64,
    pub post: f64,
    /// Nested chance that a mention-reply also attaches a reaction.
    pub reply_reaction: f64,
}

impl Default for DeliveryTable {
    fn default() -> Self {
        Self {
            gif: default_p_gif(),
            strip: default_p_strip(),
            overlay: default_p_overlay(),
            reply: default_p_reply(),
            post: default_p_post(),
            reply_reaction: default_p_reply_reaction(),
        }
    }
}

/// Fully-resolved engine tuning.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub chain: ChainSettings,
    pub assets: AssetSettings,
    pub delivery: DeliveryTable,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            chain: ChainSettings {
                edge_ceiling: default_edge_ceiling(),
                evict_batch: default_evict_batch(),
            },
            assets: AssetSettings {
                window_days: default_window_days(),
                strip_images: default_strip_images(),
                overlay_thumbs: default_overlay_thumbs(),
            },
            delivery: DeliveryTable::default(),
        }
    }
}

impl EngineSettings {
    /// Load settings from a TOML file. Missing sections and fields fall back
    /// to the same defaults as [`EngineSettings::default`].
    pub fn load_from(path: &Path) -> Result<Self, EngineError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        let parsed: RawSettings = toml::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("parse error in {}: {e}", path.display())))?;
        let settings = Self {
            chain: ChainSettings {
                edge_ceiling: parsed.chain.edge_ceiling,
                evict_batch: parsed.chain.evict_batch,
            },
            assets: AssetSettings {
                window_days: parsed.assets.window_days,
                strip_images: parsed.assets.strip_images,
                overlay_thumbs: parsed.assets.overlay_thumbs,
            },
            delivery: DeliveryTable {
                gif: parsed.delivery.gif,
                strip: parsed.delivery.strip,
                overlay: parsed.delivery.overlay,
                reply: parsed.delivery.reply,
                post: parsed.delivery.post,
                reply_reaction: parsed.delivery.reply_reaction,
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), EngineError> {
        let d = &self.delivery;
        let sum = d.gif + d.strip + d.overlay + d.reply + d.post;
        if !(0.0..=1.0).contains(&sum) {
            return Err(EngineError::Config(format!(
                "delivery probabilities sum to {sum}, must lie in [0, 1]"
            )));
        }
        for (name, p) in [("gif", d.gif), ("strip", d.strip), ("overlay", d.overlay),
                          ("reply", d.reply), ("post", d.post),
                          ("reply_reaction", d.reply_reaction)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(EngineError::Config(format!(
                    "delivery probability '{name}' = {p}, must lie in [0, 1]"
                )));
            }
        }
        if self.chain.evict_batch == 0 {
            return Err(EngineError::Config("evict_batch must be at least 1".into()));
        }
        Ok(())
    }
}

// ── Raw TOML shapes ───────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct RawSettings {
    #[serde(default)]
    chain: RawChain,
    #[serde(default)]
    assets: RawAssets,
    #[serde(default)]
    delivery: RawDelivery,
}

#[derive(Deserialize)]
struct RawChain {
    #[serde(default = "default_edge_ceiling")]
    edge_ceiling: u64,
    #[serde(default = "default_evict_batch")]
    evict_batch: u64,
}

#[derive(Deserialize)]
struct RawAssets {
    #[serde(default = "default_window_days")]
    window_days: i64,
    #[serde(default = "default_strip_images")]
    strip_images: usize,
    #[serde(default = "default_overlay_thumbs")]
    overlay_thumbs: usize,
}

#[derive(Deserialize)]
struct RawDelivery {
    #[serde(default = "default_p_gif")]
    gif: f64,
    #[serde(default = "default_p_strip")]
    strip: f64,
    #[serde(default = "default_p_overlay")]
    overlay: f64,
    #[serde(default = "default_p_reply")]
    reply: f64,
    #[serde(default = "default_p_post")]
    post: f64,
    #[serde(default = "default_p_reply_reaction")]
    reply_reaction: f64,
}

impl Default for RawChain {
    fn default() -> Self {
        Self {
            edge_ceiling: default_edge_ceiling(),
            evict_batch: default_evict_batch(),
        }
    }
}

impl Default for RawAssets {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            strip_images: default_strip_images(),
            overlay_thumbs: default_overlay_thumbs(),
        }
    }
}

impl Default for RawDelivery {
    fn default() -> Self {
        Self {
            gif: default_p_gif(),
            strip: default_p_strip(),
            overlay: default_p_overlay(),
            reply: default_p_reply(),
            post: default_p_post(),
            reply_reaction: default_p_reply_reaction(),
        }
    }
}

fn default_edge_ceiling() -> u64 { 100_000 }
fn default_evict_batch() -> u64 { 512 }
fn default_window_days() -> i64 { 7 }
fn default_strip_images() -> usize { 2 }
fn default_overlay_thumbs() -> usize { 3 }
fn default_p_gif() -> f64 { 0.05 }
fn default_p_strip() -> f64 { 0.10 }
fn default_p_overlay() -> f64 { 0.03 }
fn default_p_reply() -> f64 { 0.27 }
fn default_p_post() -> f64 { 0.35 }
fn default_p_reply_reaction() -> f64 { 0.30 }
