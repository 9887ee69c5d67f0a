//! Delivery selection — which surface a generated result goes out through.
//!
//! One uniform draw per message walks a fixed-order cumulative probability
//! table: GIF passthrough, strip meme, overlay meme, mention-reply, plain
//! post, and finally an emoji-only reaction on the remaining mass. The
//! chosen [`DeliveryAction`] is executed against the host-implemented
//! [`Transport`] port; this core never touches the platform's interaction
//! objects.

use rand::Rng;

use crate::config::DeliveryTable;
use crate::error::EngineError;

// ── Surface selection ─────────────────────────────────────────────────────────

/// Output surface chosen for one generated message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Link a recently observed remote GIF instead of the generated text.
    GifPassthrough,
    /// Side-by-side meme from several recent images.
    StripMeme,
    /// Overlay meme: one primary image plus thumbnails.
    OverlayMeme,
    /// Reply to the triggering message, mentioning its author.
    ReplyMention { with_reaction: bool },
    /// Plain channel post of the generated text.
    Post,
    /// Emoji-only reaction to the triggering message.
    Reaction,
}

/// Evaluate the probability table against a single uniform draw.
/// Order is fixed; the table only controls the mass of each bucket.
pub fn choose_surface<R: Rng>(table: &DeliveryTable, rng: &mut R) -> Surface {
    let roll: f64 = rng.r#gen();
    let mut edge = table.gif;
    if roll < edge {
        return Surface::GifPassthrough;
    }
    edge += table.strip;
    if roll < edge {
        return Surface::StripMeme;
    }
    edge += table.overlay;
    if roll < edge {
        return Surface::OverlayMeme;
    }
    edge += table.reply;
    if roll < edge {
        let with_reaction = rng.r#gen::<f64>() < table.reply_reaction;
        return Surface::ReplyMention { with_reaction };
    }
    edge += table.post;
    if roll < edge {
        return Surface::Post;
    }
    Surface::Reaction
}

// ── Reaction choice ───────────────────────────────────────────────────────────

/// Ordered keyword → emoji table; the first entry with any keyword present
/// in the message wins.
const KEYWORD_REACTIONS: &[(&[&str], &str)] = &[
    (&["спасибо", "thanks", "thank"], "🙏"),
    (&["лол", "кек", "ахах", "хах", "lol", "kek", "haha", "lmao"], "😂"),
    (&["привет", "здаров", "hello", "hi "], "👋"),
    (&["люблю", "обожаю", "love"], "❤️"),
    (&["грустно", "печаль", "плак", "sad", "cry"], "😢"),
    (&["злой", "бесит", "angry", "rage"], "😡"),
];

const POSITIVE_WORDS: &[&str] = &[
    "хорошо", "круто", "отлично", "супер", "топ", "класс",
    "good", "great", "nice", "cool", "based",
];
const NEGATIVE_WORDS: &[&str] = &[
    "плохо", "ужас", "фу", "отстой", "bad", "awful", "terrible", "cringe",
];

const NEUTRAL_REACTION: &str = "🤔";

/// Pick a reaction emoji for `text`: first keyword match wins, then a
/// positive-vs-negative sentiment tally, then neutral on a tie or no signal.
pub fn pick_reaction(text: &str) -> &'static str {
    let text = text.to_lowercase();

    for (keywords, emoji) in KEYWORD_REACTIONS {
        if keywords.iter().any(|kw| text.contains(kw)) {
            return emoji;
        }
    }

    let positive = POSITIVE_WORDS.iter().filter(|w| text.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| text.contains(*w)).count();
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => "👍",
        std::cmp::Ordering::Less => "👎",
        std::cmp::Ordering::Equal => NEUTRAL_REACTION,
    }
}

// ── Transport port ────────────────────────────────────────────────────────────

/// Concrete output the engine decided on. The host either executes it
/// itself or hands it to [`deliver`] together with a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryAction {
    /// Mention-reply with the generated text, optionally also reacting to
    /// the triggering message.
    ReplyMention { text: String, reaction: Option<String> },
    /// Plain channel post of the generated text.
    Post(String),
    /// Encoded PNG composite.
    Image(Vec<u8>),
    /// Remote GIF URL, passed through unmodified.
    GifUrl(String),
    /// Emoji-only reaction to the triggering message.
    React(String),
}

/// Minimal capability surface the hosting bot implements. Methods are
/// synchronous from this core's point of view; an async host bridges on its
/// side of the port.
pub trait Transport: Send + Sync {
    fn reply_mention(&self, text: &str) -> Result<(), EngineError>;
    fn send_text(&self, text: &str) -> Result<(), EngineError>;
    fn send_image(&self, png: &[u8]) -> Result<(), EngineError>;
    fn send_gif_url(&self, url: &str) -> Result<(), EngineError>;
    fn react(&self, emoji: &str) -> Result<(), EngineError>;
}

/// Map a chosen action onto the transport port.
pub fn deliver(action: &DeliveryAction, transport: &dyn Transport) -> Result<(), EngineError> {
    match action {
        DeliveryAction::ReplyMention { text, reaction } => {
            transport.reply_mention(text)?;
            if let Some(emoji) = reaction {
                transport.react(emoji)?;
            }
            Ok(())
        }
        DeliveryAction::Post(text) => transport.send_text(text),
        DeliveryAction::Image(png) => transport.send_image(png),
        DeliveryAction::GifUrl(url) => transport.send_gif_url(url),
        DeliveryAction::React(emoji) => transport.react(emoji),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn all_in(bucket: &str) -> DeliveryTable {
        let mut t = DeliveryTable {
            gif: 0.0,
            strip: 0.0,
            overlay: 0.0,
            reply: 0.0,
            post: 0.0,
            reply_reaction: 0.0,
        };
        match bucket {
            "gif" => t.gif = 1.0,
            "strip" => t.strip = 1.0,
            "overlay" => t.overlay = 1.0,
            "reply" => t.reply = 1.0,
            "post" => t.post = 1.0,
            _ => {}
        }
        t
    }

    #[test]
    fn selector_honors_degenerate_tables() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(choose_surface(&all_in("gif"), &mut rng), Surface::GifPassthrough);
        assert_eq!(choose_surface(&all_in("strip"), &mut rng), Surface::StripMeme);
        assert_eq!(choose_surface(&all_in("overlay"), &mut rng), Surface::OverlayMeme);
        assert_eq!(choose_surface(&all_in("post"), &mut rng), Surface::Post);
        // Empty table — all mass falls through to the reaction bucket.
        assert_eq!(choose_surface(&all_in("none"), &mut rng), Surface::Reaction);
    }

    #[test]
    fn reply_reaction_is_nested() {
        let table = DeliveryTable { reply_reaction: 1.0, ..all_in("reply") };
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            choose_surface(&table, &mut rng),
            Surface::ReplyMention { with_reaction: true }
        );
        let table = DeliveryTable { reply_reaction: 0.0, ..all_in("reply") };
        assert_eq!(
            choose_surface(&table, &mut rng),
            Surface::ReplyMention { with_reaction: false }
        );
    }

    #[test]
    fn selector_is_deterministic_per_seed() {
        let table = DeliveryTable::default();
        let a: Vec<Surface> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..50).map(|_| choose_surface(&table, &mut rng)).collect()
        };
        let b: Vec<Surface> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..50).map(|_| choose_surface(&table, &mut rng)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn keyword_reaction_first_match_wins() {
        // "спасибо" appears before the laughter row in the table.
        assert_eq!(pick_reaction("спасибо, лол"), "🙏");
        assert_eq!(pick_reaction("ЛОЛ ну и ну"), "😂");
    }

    #[test]
    fn sentiment_fallback() {
        assert_eq!(pick_reaction("очень круто и супер"), "👍");
        assert_eq!(pick_reaction("какой ужас"), "👎");
        assert_eq!(pick_reaction("просто текст"), "🤔");
        assert_eq!(pick_reaction("круто но ужас"), "🤔");
    }
}
