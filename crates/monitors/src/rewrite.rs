//! Rewriting of alert messages to route to proposed directives.

use crate::directive::{self, Directive, Kind};
use serde::Serialize;

/// Outcome of rewriting one directive kind of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// The message was rewritten to include the target.
    Rewritten,
    /// No target was proposed.
    NoTarget,
    /// The target is already a current directive.
    AlreadyApplied,
    /// The message has no current directive of this kind, and none is invented.
    NoCurrentRouting,
    /// The message has several current directives, and was left alone.
    Ambiguous,
}

impl Outcome {
    pub fn is_rewritten(self) -> bool {
        self == Outcome::Rewritten
    }
}

/// Current directives of `kind` which count towards rewriting: the legacy
/// chat token is never counted.
pub fn countable(message: &str, kind: Kind) -> Vec<Directive> {
    directive::parse(message, kind, &mut Vec::new())
        .into_iter()
        .filter(|d| !d.is_legacy())
        .collect()
}

/// Rewrite `kind` directives of `message` to route to the `target` token.
///
/// The message is modified only if it has exactly one countable directive of
/// `kind`. Chat targets are comma-joined after the first occurrence of that
/// directive, while paging targets replace every occurrence of it.
pub fn rewrite(message: &mut String, kind: Kind, target: Option<&str>) -> Outcome {
    let Some(target) = target else {
        return Outcome::NoTarget;
    };
    let current = countable(message, kind);

    if current.iter().any(|d| d.token == target) {
        return Outcome::AlreadyApplied;
    }
    let sole = match current.as_slice() {
        [] => return Outcome::NoCurrentRouting,
        [sole] => sole,
        _ => return Outcome::Ambiguous,
    };

    match kind {
        Kind::Chat => message.insert_str(sole.end(), &format!(",{target}")),
        Kind::Paging => *message = substitute(message, kind, &sole.token, target),
    }
    Outcome::Rewritten
}

// Replace whole-token occurrences of `from`, leaving longer tokens which
// merely share its prefix untouched.
fn substitute(message: &str, kind: Kind, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(message.len() + to.len());
    let mut last = 0;

    for d in directive::scan(message, kind).filter(|d| d.token == from) {
        out.push_str(&message[last..d.offset]);
        out.push_str(to);
        last = d.end();
    }
    out.push_str(&message[last..]);
    out
}
