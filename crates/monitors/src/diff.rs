use crate::directive::{self, Kind};
use crate::{AlertDefinition, RecordedAlert};
use serde::Serialize;

/// Compared field of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    Message,
    Tags,
    Query,
    ChatDirectives,
    PagingDirectives,
}

/// Fields which differ between two snapshots of an alert.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub fields: Vec<Field>,
}

impl DiffResult {
    pub fn differs(&self) -> bool {
        !self.fields.is_empty()
    }

    fn check(&mut self, field: Field, same: bool) {
        if !same {
            self.fields.push(field);
        }
    }
}

/// Compare the name, message, tags and query of two alert snapshots.
pub fn structural(a: &AlertDefinition, b: &AlertDefinition) -> DiffResult {
    let mut out = DiffResult::default();
    out.check(Field::Name, a.name == b.name);
    out.check(Field::Message, a.message == b.message);
    out.check(Field::Tags, a.tags == b.tags);
    out.check(Field::Query, a.query == b.query);
    out
}

/// Compare two alert snapshots by every field, including the directives
/// derived from their messages.
pub fn full(a: &AlertDefinition, b: &AlertDefinition) -> DiffResult {
    let mut out = structural(a, b);

    for (kind, field) in [
        (Kind::Chat, Field::ChatDirectives),
        (Kind::Paging, Field::PagingDirectives),
    ] {
        out.check(
            field,
            directive::tokens(&a.message, kind) == directive::tokens(&b.message, kind),
        );
    }
    out
}

/// Compare local truth with the copy recorded in a workbook.
/// Fields the workbook doesn't carry aren't compared.
pub fn recorded(local: &AlertDefinition, recorded: &RecordedAlert) -> DiffResult {
    let mut out = DiffResult::default();

    if let Some(name) = &recorded.name {
        out.check(Field::Name, name.trim() == local.name.trim());
    }
    if let Some(message) = &recorded.message {
        out.check(Field::Message, normalize(message) == normalize(&local.message));
    }
    if let Some(tags) = &recorded.tags {
        out.check(Field::Tags, *tags == local.tags);
    }
    if let Some(query) = &recorded.query {
        out.check(Field::Query, query.trim() == local.query.trim());
    }
    out
}

// Spreadsheet tools rewrite line endings of multi-line cells.
fn normalize(s: &str) -> String {
    s.replace("\r\n", "\n").trim().to_string()
}
