use crate::Diagnostic;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    // A chat directive is `@slack` followed by any number of `-word` segments.
    static ref CHAT_RE: Regex = Regex::new(r"@slack(?:-\w*)*").unwrap();
    // Paging directives follow the same shape under the `@pagerduty` marker.
    static ref PAGING_RE: Regex = Regex::new(r"@pagerduty(?:-\w*)*").unwrap();
}

/// Deprecated chat destination which still lives on in many messages.
/// It's ignored when counting directives and never blocks automation.
pub const LEGACY_CHAT_TOKEN: &str = "@slack-incidents-uk";

/// Kind of a notification directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Kind {
    Chat,
    Paging,
}

impl Kind {
    fn regex(self) -> &'static Regex {
        match self {
            Kind::Chat => &CHAT_RE,
            Kind::Paging => &PAGING_RE,
        }
    }

    /// Prefix which is joined with a destination name to form a directive token.
    pub fn prefix(self) -> &'static str {
        match self {
            Kind::Chat => "@slack-",
            Kind::Paging => "@pagerduty-",
        }
    }

    /// Build the directive token which routes to `destination`.
    pub fn token(self, destination: &str) -> String {
        format!("{}{destination}", self.prefix())
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Kind::Chat => "chat",
            Kind::Paging => "paging",
        })
    }
}

/// A routing token embedded in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    pub kind: Kind,
    pub token: String,
    /// Byte offset of the token within its message.
    pub offset: usize,
}

impl Directive {
    /// Byte offset just past the end of the token.
    pub fn end(&self) -> usize {
        self.offset + self.token.len()
    }

    pub fn is_legacy(&self) -> bool {
        self.token == LEGACY_CHAT_TOKEN
    }
}

/// Scan every occurrence of a `kind` directive in `message`, in order,
/// including repeated occurrences of the same token.
pub fn scan(message: &str, kind: Kind) -> impl Iterator<Item = Directive> + '_ {
    kind.regex().find_iter(message).map(move |m| Directive {
        kind,
        token: m.as_str().to_string(),
        offset: m.start(),
    })
}

/// Parse the `kind` directives of `message`, deduplicated by first occurrence
/// and in their original order. Repeated tokens are reported to `diagnostics`
/// but don't otherwise affect the result.
pub fn parse(message: &str, kind: Kind, diagnostics: &mut Vec<Diagnostic>) -> Vec<Directive> {
    let mut out: Vec<Directive> = Vec::new();
    let mut repeated: Vec<String> = Vec::new();

    for directive in scan(message, kind) {
        if out.iter().any(|d| d.token == directive.token) {
            if !repeated.contains(&directive.token) {
                repeated.push(directive.token);
            }
        } else {
            out.push(directive);
        }
    }

    if !repeated.is_empty() {
        diagnostics.push(Diagnostic::DuplicateDirectives {
            kind,
            tokens: repeated,
        });
    }
    out
}

/// Deduplicated tokens of `kind` in `message`, without diagnostics.
pub fn tokens(message: &str, kind: Kind) -> Vec<String> {
    parse(message, kind, &mut Vec::new())
        .into_iter()
        .map(|d| d.token)
        .collect()
}
