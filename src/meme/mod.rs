//! Meme pipeline — recently observed chat images composed with generated
//! captions into a single encoded PNG.
//!
//! [`assets`] models the image inventory a collaborator maintains and the
//! port this core reads it through; [`compositor`] does the CPU-bound
//! decode/draw/encode work and is meant to run on a blocking worker, never
//! on the message-intake path.

pub mod assets;
pub mod compositor;

pub use assets::{AssetLocation, AssetStore, MemeAsset};
pub use compositor::{compose_overlay, compose_strip, load_font};
