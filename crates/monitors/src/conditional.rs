//! Detection of directives whose placement may be governed by templated
//! conditional blocks, such as `{{#is_alert}}@slack-team{{/is_alert}}`.
//! Such directives can't be safely rewritten at a fixed offset.

use crate::directive::{self, Kind, LEGACY_CHAT_TOKEN};

/// Marker closing a templated conditional block.
pub const CONDITIONAL_CLOSE: &str = "}}";

/// Byte offset just past the last `CONDITIONAL_CLOSE` of `message`,
/// or zero if it has none.
pub fn last_conditional_end(message: &str) -> usize {
    let mut end = 0;
    while let Some(found) = message[end..].find(CONDITIONAL_CLOSE) {
        end += found + CONDITIONAL_CLOSE.len();
    }
    end
}

/// Remove occurrences of the legacy chat token, which may appear anywhere.
pub fn strip_legacy(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut last = 0;

    for d in directive::scan(message, Kind::Chat).filter(|d| d.token == LEGACY_CHAT_TOKEN) {
        out.push_str(&message[last..d.offset]);
        last = d.end();
    }
    out.push_str(&message[last..]);
    out
}

/// Returns true if any `kind` directive of `message` occurs before the end of
/// its last conditional block, in which case `kind` directives of the message
/// are not safe to rewrite automatically.
pub fn in_conditionals(message: &str, kind: Kind) -> bool {
    let cleaned = strip_legacy(message);
    let end = last_conditional_end(&cleaned);

    let found = directive::scan(&cleaned, kind).any(|d| d.offset < end);
    found
}
