//! Engine orchestration — one inbound message, end to end.
//!
//! Flow: fetch community config (fresh, every call) → tokenize → train the
//! bigram store → probability gate → generate a response → choose a delivery
//! surface → (maybe) compose a meme → return the chosen [`DeliveryAction`].
//!
//! The engine holds no mutable state between calls; all context arrives as
//! explicit parameters or through the injected ports. Store training,
//! generation, asset lookups, and image compositing all run under
//! `tokio::task::spawn_blocking` so they never stall message intake.

use std::path::PathBuf;
use std::sync::Arc;

use ab_glyph::FontRef;
use chrono::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task;
use tracing::debug;

use crate::chain::generator;
use crate::chain::{BigramStore, EvictionPolicy, MIN_TRAINABLE_TOKENS, train_message};
use crate::config::{ConfigPort, EngineSettings};
use crate::delivery::{DeliveryAction, Surface, choose_surface, pick_reaction};
use crate::error::EngineError;
use crate::meme::compositor::{compose_overlay, compose_strip, load_font};
use crate::meme::AssetStore;
use crate::tokenize::tokenize;

/// Minimal shape of one inbound chat message — the platform-specific
/// interaction object is reduced to this at the boundary.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub community_id: String,
    pub channel_id: String,
    pub author_id: String,
    pub content: String,
}

/// The generative core, wired to its collaborator ports.
pub struct Engine {
    config: Arc<dyn ConfigPort>,
    store: Arc<dyn BigramStore>,
    assets: Arc<dyn AssetStore>,
    settings: EngineSettings,
    font: FontRef<'static>,
}

impl Engine {
    pub fn new(
        config: Arc<dyn ConfigPort>,
        store: Arc<dyn BigramStore>,
        assets: Arc<dyn AssetStore>,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            config,
            store,
            assets,
            settings,
            font: load_font()?,
        })
    }

    fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy {
            edge_ceiling: self.settings.chain.edge_ceiling,
            evict_batch: self.settings.chain.evict_batch,
        }
    }

    /// Handle one inbound message: train, and maybe respond.
    ///
    /// `Ok(None)` covers every silent outcome — feature disabled, filtered
    /// channel, gate not passed, nothing generated. The caller executes the
    /// returned action (or hands it to [`crate::delivery::deliver`]).
    pub async fn handle_message<R: Rng + Send>(
        &self,
        msg: &InboundMessage,
        rng: &mut R,
    ) -> Result<Option<DeliveryAction>, EngineError> {
        let cfg = self.config.community_config(&msg.community_id)?;
        if !cfg.enabled || !cfg.channel_allowed(&msg.channel_id) {
            return Ok(None);
        }

        let tokens = tokenize(&msg.content);
        if tokens.len() >= MIN_TRAINABLE_TOKENS {
            let store = Arc::clone(&self.store);
            let community = msg.community_id.clone();
            let policy = self.eviction_policy();
            let trained = task::spawn_blocking(move || {
                train_message(store.as_ref(), &community, &tokens, policy)
            })
            .await
            .map_err(|e| EngineError::Join(e.to_string()))??;
            debug!(community = %msg.community_id, trained, "trained bigram edges");
        }

        // Probability gate: one uniform draw against the community's chance.
        if rng.r#gen::<f64>() >= cfg.response_chance {
            return Ok(None);
        }

        let text = match self
            .generate_text(&msg.community_id, cfg.min_words, cfg.max_words, rng)
            .await?
        {
            Some(text) => text,
            None => return Ok(None),
        };

        match choose_surface(&self.settings.delivery, rng) {
            Surface::GifPassthrough => {
                let assets = Arc::clone(&self.assets);
                let community = msg.community_id.clone();
                let gif = task::spawn_blocking(move || assets.recent_gif(&community))
                    .await
                    .map_err(|e| EngineError::Join(e.to_string()))??;
                match gif {
                    Some(url) => Ok(Some(DeliveryAction::GifUrl(url))),
                    None => Ok(Some(DeliveryAction::Post(text))),
                }
            }
            Surface::StripMeme => {
                // Both captions are independently generated; an empty bottom
                // caption is acceptable.
                let bottom = self
                    .generate_text(&msg.community_id, cfg.min_words, cfg.max_words, rng)
                    .await?
                    .unwrap_or_default();
                match self.strip_meme(&msg.community_id, text.clone(), bottom).await? {
                    Some(action) => Ok(Some(action)),
                    None => Ok(Some(DeliveryAction::Post(text))),
                }
            }
            Surface::OverlayMeme => {
                let bottom = self
                    .generate_text(&msg.community_id, cfg.min_words, cfg.max_words, rng)
                    .await?
                    .unwrap_or_default();
                match self.overlay_meme(&msg.community_id, text.clone(), bottom).await? {
                    Some(action) => Ok(Some(action)),
                    None => Ok(Some(DeliveryAction::Post(text))),
                }
            }
            Surface::ReplyMention { with_reaction } => {
                let reaction = with_reaction.then(|| pick_reaction(&msg.content).to_string());
                Ok(Some(DeliveryAction::ReplyMention { text, reaction }))
            }
            Surface::Post => Ok(Some(DeliveryAction::Post(text))),
            Surface::Reaction => {
                Ok(Some(DeliveryAction::React(pick_reaction(&msg.content).to_string())))
            }
        }
    }

    /// Run a chain walk on the blocking pool — generation is store I/O all
    /// the way down. The worker's random source is seeded from the caller's,
    /// so a fixed caller seed still reproduces a fixed outcome.
    async fn generate_text<R: Rng>(
        &self,
        community: &str,
        min_words: usize,
        max_words: usize,
        rng: &mut R,
    ) -> Result<Option<String>, EngineError> {
        let store = Arc::clone(&self.store);
        let community = community.to_string();
        let mut worker_rng = StdRng::seed_from_u64(rng.r#gen());
        task::spawn_blocking(move || {
            generator::generate(store.as_ref(), &community, min_words, max_words, &mut worker_rng)
        })
        .await
        .map_err(|e| EngineError::Join(e.to_string()))?
    }

    /// Compose a strip meme, or `None` when no qualifying asset exists or
    /// every candidate fails to decode — the caller falls back to text.
    async fn strip_meme(
        &self,
        community: &str,
        top: String,
        bottom: String,
    ) -> Result<Option<DeliveryAction>, EngineError> {
        let assets = Arc::clone(&self.assets);
        let window = Duration::days(self.settings.assets.window_days);
        let count = self.settings.assets.strip_images;
        let community = community.to_string();
        let font = self.font.clone();
        let result = task::spawn_blocking(move || {
            let paths = recent_paths(assets.as_ref(), &community, count, window)?;
            if paths.is_empty() {
                debug!(community = %community, "no recent images for strip meme");
                return Ok(None);
            }
            compose_strip(&paths, &top, &bottom, &font).map(Some)
        })
        .await
        .map_err(|e| EngineError::Join(e.to_string()))?;
        match result {
            Ok(Some(png)) => Ok(Some(DeliveryAction::Image(png))),
            Ok(None) => Ok(None),
            Err(EngineError::NoAssets) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Compose an overlay meme: first recent image as the primary, the rest
    /// as thumbnails.
    async fn overlay_meme(
        &self,
        community: &str,
        top: String,
        bottom: String,
    ) -> Result<Option<DeliveryAction>, EngineError> {
        let assets = Arc::clone(&self.assets);
        let window = Duration::days(self.settings.assets.window_days);
        let count = self.settings.assets.overlay_thumbs + 1;
        let community = community.to_string();
        let font = self.font.clone();
        let result = task::spawn_blocking(move || {
            let mut paths = recent_paths(assets.as_ref(), &community, count, window)?;
            if paths.is_empty() {
                debug!(community = %community, "no recent images for overlay meme");
                return Ok(None);
            }
            let primary = paths.remove(0);
            compose_overlay(&primary, &paths, &top, &bottom, &font).map(Some)
        })
        .await
        .map_err(|e| EngineError::Join(e.to_string()))?;
        match result {
            Ok(Some(png)) => Ok(Some(DeliveryAction::Image(png))),
            Ok(None) => Ok(None),
            Err(EngineError::NoAssets) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Recent local raster paths for `community`, newest first.
fn recent_paths(
    assets: &dyn AssetStore,
    community: &str,
    count: usize,
    window: Duration,
) -> Result<Vec<PathBuf>, EngineError> {
    let found = assets.recent_images(community, count, window)?;
    Ok(found
        .iter()
        .filter_map(|a| a.local_path().map(|p| p.to_path_buf()))
        .collect())
}
