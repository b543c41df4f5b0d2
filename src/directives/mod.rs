//! Directive extraction and stripping for model replies.
//!
//! The model embeds control tokens in its free-text answer; this module
//! pulls them out so the customer only ever sees clean text. Three stages
//! run in a fixed order, each on the previous stage's output, and each is
//! a no-op when its marker is absent:
//!
//! 1. `[MUTE]` — hand the conversation to a human operator
//! 2. `IMAGE: <url>` — deliver a product image
//! 3. `||SAVE||name|order|phone||` — capture a structured order
//!
//! Parsing is total: malformed markup yields fewer directives, never an
//! error, and the markup itself is always stripped from the delivered
//! text.

use dukkan_core::message::Order;
use tracing::{debug, warn};

/// Literal token that latches the session mute.
pub const MUTE_TOKEN: &str = "[MUTE]";
/// Marker introducing an image URL.
pub const IMAGE_MARKER: &str = "IMAGE:";
/// Opening delimiter of an order segment.
pub const SAVE_OPEN: &str = "||SAVE||";
/// Closing delimiter of an order segment.
pub const SAVE_CLOSE: &str = "||";

/// A structured instruction extracted from model output.
///
/// Ephemeral: produced and consumed within a single orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Stop replying to this customer until an operator steps in.
    Mute,
    /// Deliver the image at this URL.
    Image(String),
    /// Record a captured order.
    SaveOrder(Order),
}

/// Parse a raw model reply into `(cleaned_text, directives)`.
///
/// `cleaned_text` has all recognized markers and their payloads removed
/// and is trimmed; `directives` preserves extraction order.
pub fn parse(raw: &str) -> (String, Vec<Directive>) {
    let mut directives = Vec::new();
    let text = extract_mute(raw, &mut directives);
    let text = extract_image(&text, &mut directives);
    let text = extract_save_order(&text, &mut directives);
    (text.trim().to_string(), directives)
}

/// Stage 1: `[MUTE]` anywhere in the text emits one Mute directive; every
/// occurrence of the token (and surrounding whitespace) is removed.
fn extract_mute(text: &str, directives: &mut Vec<Directive>) -> String {
    if !text.contains(MUTE_TOKEN) {
        return text.to_string();
    }
    directives.push(Directive::Mute);

    let mut result = text.to_string();
    while let Some(pos) = result.find(MUTE_TOKEN) {
        let before = result[..pos].trim_end();
        let after = result[pos + MUTE_TOKEN.len()..].trim_start();
        result = join_around_marker(before, after);
    }
    result
}

/// Stage 2: split at the first `IMAGE:`. Text before the marker is kept;
/// the first whitespace-delimited token after it becomes the payload when
/// it starts with `http`. The marker and everything after it is never
/// delivered.
fn extract_image(text: &str, directives: &mut Vec<Directive>) -> String {
    let Some(pos) = text.find(IMAGE_MARKER) else {
        return text.to_string();
    };

    let payload = &text[pos + IMAGE_MARKER.len()..];
    match payload.split_whitespace().next() {
        Some(token) if token.starts_with("http") => {
            directives.push(Directive::Image(token.to_string()));
        }
        Some(token) => {
            debug!("image marker without http payload ({token:?}), dropping");
        }
        None => {
            debug!("image marker with empty payload, dropping");
        }
    }

    text[..pos].trim().to_string()
}

/// Stage 3: extract the substring between the first `||SAVE||` and the
/// next `||`, split it on `|`, and emit a SaveOrder when at least three
/// non-empty fields are present (extras are ignored). The whole segment
/// is removed from the delivered text either way; an unterminated segment
/// is stripped to the end of the text.
fn extract_save_order(text: &str, directives: &mut Vec<Directive>) -> String {
    let Some(start) = text.find(SAVE_OPEN) else {
        return text.to_string();
    };

    let after = &text[start + SAVE_OPEN.len()..];
    let (inner, rest, terminated) = match after.find(SAVE_CLOSE) {
        Some(end) => (&after[..end], &after[end + SAVE_CLOSE.len()..], true),
        None => (after, "", false),
    };

    let fields: Vec<&str> = inner
        .split('|')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    if terminated && fields.len() >= 3 {
        if let Some(order) = Order::new(fields[0], fields[1], fields[2]) {
            directives.push(Directive::SaveOrder(order));
        }
    } else {
        warn!(
            "dropping malformed order segment ({} fields, terminated: {terminated})",
            fields.len()
        );
    }

    join_around_marker(text[..start].trim_end(), rest.trim_start())
}

fn join_around_marker(before: &str, after: &str) -> String {
    if before.is_empty() || after.is_empty() {
        format!("{before}{after}")
    } else {
        format!("{before} {after}")
    }
}
