//! Message tokenizer.
//!
//! Turns raw chat text into a flat, normalized token stream:
//! - user/role/channel mentions, broadcast patterns and bare URLs are
//!   stripped first and never become tokens;
//! - a single combined pattern then matches, in priority order, custom
//!   platform emoji (`<:name:id>` / `<a:name:id>`), Unicode emoji runs,
//!   Latin/Cyrillic alphanumeric word runs, and punctuation clusters;
//! - every match is lower-cased except full emoji matches, which are kept
//!   verbatim.
//!
//! The tokenizer itself accepts any input; the training path rejects
//! messages shorter than three tokens.

use std::sync::LazyLock;

use regex::Regex;

/// Mentions, broadcast-address patterns, and bare URLs — removed up front.
static STRIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<@!?\d+>|<@&\d+>|<#\d+>|@everyone|@here|https?://\S+")
        .expect("strip pattern is valid")
});

/// Combined token pattern. Alternation order matters: emoji forms must win
/// over the punctuation-cluster arm at the same start position.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?P<emoji> <a?:\w+:\d+> | \p{Emoji_Presentation}+ )
        | (?P<word> [0-9A-Za-zА-Яа-яЁё]+ )
        | (?P<punct> [\p{P}\p{S}]+ )
        ",
    )
    .expect("token pattern is valid")
});

/// Tokenize `text` into the normalized token stream.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned = STRIP_RE.replace_all(text, " ");

    TOKEN_RE
        .captures_iter(&cleaned)
        .map(|caps| {
            if let Some(m) = caps.name("emoji") {
                m.as_str().to_string()
            } else {
                // word or punctuation cluster — case-folded
                caps[0].to_lowercase()
            }
        })
        .collect()
}

/// Remove emoji (custom and Unicode) from caption text and collapse runs of
/// whitespace. The bundled typeface has no emoji glyphs, so captions are
/// cleaned before measurement and drawing.
pub fn strip_emoji(text: &str) -> String {
    static EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"<a?:\w+:\d+>|\p{Emoji_Presentation}+").expect("emoji pattern is valid")
    });
    let cleaned = EMOJI_RE.replace_all(text, " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A cluster made only of sentence-ending punctuation (`.`, `!`, `?`).
/// Such a token is appended to a walk and then ends it.
pub fn is_terminal(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| matches!(c, '.' | '!' | '?'))
}

/// Conjunctions excluded from serving as a walk start or continuation.
const CONJUNCTIONS: &[&str] = &[
    "и", "а", "но", "да", "или", "же", "and", "or", "but", "so",
];

/// Tokens excluded from seeding a generation walk or continuing one:
/// the empty string, a small fixed conjunction set, and bare punctuation
/// clusters. Terminal punctuation is also a stopword for *start* filtering;
/// the walk checks [`is_terminal`] before this so sentence enders still get
/// appended.
pub fn is_stopword(token: &str) -> bool {
    if token.is_empty() {
        return true;
    }
    if CONJUNCTIONS.contains(&token) {
        return true;
    }
    is_punctuation_cluster(token)
}

/// A token made entirely of punctuation/symbol characters. Emoji are
/// deliberately not punctuation, so the symbol class subtracts them.
/// Detokenization joins with spaces except immediately before such a token.
pub fn is_punctuation_cluster(token: &str) -> bool {
    static PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[[\p{P}\p{S}]--\p{Emoji_Presentation}]+$")
            .expect("punctuation pattern is valid")
    });
    PUNCT_RE.is_match(token)
}
