//! parrot-core — generative core of a community chat bot.
//!
//! A frequency-weighted bigram chain trained incrementally from observed
//! chat messages, a raster compositor that turns generated text and recent
//! chat images into meme PNGs, and a probabilistic selector that decides
//! which surface (text, image, reaction) a result goes out through.
//!
//! Everything platform-specific stays outside: persistence, asset storage,
//! per-community configuration, and the actual posting are injected ports
//! ([`chain::BigramStore`], [`meme::AssetStore`], [`config::ConfigPort`],
//! [`delivery::Transport`]). The engine is stateless between calls and every
//! random decision takes an injected `Rng`, so seeded runs are reproducible.

pub mod chain;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod logger;
pub mod meme;
pub mod tokenize;

pub use config::{CommunityConfig, EngineSettings};
pub use delivery::DeliveryAction;
pub use engine::{Engine, InboundMessage};
pub use error::EngineError;
