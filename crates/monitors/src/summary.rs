//! Summary export of alert definitions, which is handed to owners as the
//! workbook they fill in with new ownership.

use crate::directive::{self, Kind};
use crate::{columns, terraform_marker, AlertDefinition, OwnershipIntent};
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    // Trailing punctuation of the surrounding prose isn't part of a link.
    static ref URL_RE: Regex = Regex::new(r#"https?://[^\s<>"'\]]*[^\s<>"'\]).,;:!?]"#).unwrap();
    static ref RESOURCE_NAME_RE: Regex = Regex::new(r"resource_name:([\w:]*)").unwrap();
    static ref PRODUCTION_RE: Regex = Regex::new(r"(?i)production").unwrap();
}

/// Environment reported for alerts which don't name one.
pub const ANY_ENVIRONMENT: &str = "any (potentially)";

/// Summary of a single alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub id: i64,
    pub owner: Option<String>,
    pub product_area: Option<String>,
    pub name: String,
    pub environments: Vec<String>,
    pub teams: Vec<String>,
    pub tags: Vec<String>,
    pub runbooks: Vec<String>,
    pub chat: Vec<String>,
    pub paging: Vec<String>,
    pub resource_names: Vec<String>,
    pub terraform: bool,
    pub message: String,
    pub query: String,
}

/// Summarize `definition`, carrying over ownership already declared by `intent`.
pub fn summarize(definition: &AlertDefinition, intent: Option<&OwnershipIntent>) -> SummaryRow {
    let AlertDefinition {
        id,
        name,
        message,
        tags,
        query,
    } = definition;

    let mut environments: Vec<String> = tag_values(tags, "env:").collect();
    if PRODUCTION_RE.is_match(message) {
        environments.push("production".to_string());
    }
    let mut environments: Vec<String> = environments.into_iter().unique().collect();
    if environments.is_empty() {
        environments.push(ANY_ENVIRONMENT.to_string());
    }

    SummaryRow {
        id: *id,
        owner: intent.and_then(|i| i.raw_owner.clone()),
        product_area: intent.and_then(|i| i.product_area.clone()),
        name: name.clone(),
        environments,
        teams: tag_values(tags, "team:").unique().collect(),
        tags: tags.iter().cloned().collect(),
        runbooks: URL_RE
            .find_iter(message)
            .map(|m| m.as_str().replace(')', ""))
            .unique()
            .collect(),
        chat: directive::tokens(message, Kind::Chat),
        paging: directive::tokens(message, Kind::Paging),
        resource_names: RESOURCE_NAME_RE
            .captures_iter(query)
            .map(|c| c[1].to_string())
            .unique()
            .collect(),
        terraform: terraform_marker(tags).is_some(),
        message: message.clone(),
        query: query.clone(),
    }
}

fn tag_values<'t>(
    tags: &'t std::collections::BTreeSet<String>,
    prefix: &'static str,
) -> impl Iterator<Item = String> + 't {
    tags.iter()
        .filter_map(move |t| t.strip_prefix(prefix))
        .map(|v| v.split(':').next().unwrap_or_default().to_string())
}

impl SummaryRow {
    /// Cells of the row, aligned with `columns::HEADERS`.
    pub fn cells(&self) -> Vec<String> {
        let mut out = vec![String::new(); columns::HEADERS.len()];
        out[columns::ID] = self.id.to_string();
        out[columns::OWNER] = self.owner.clone().unwrap_or_default();
        out[columns::PRODUCT_AREA] = self.product_area.clone().unwrap_or_default();
        out[columns::NAME] = self.name.clone();
        out[columns::ENVIRONMENTS] = self.environments.join("\n");
        out[columns::TEAMS] = self.teams.join("\n");
        out[columns::TAGS] = self.tags.join("\n");
        out[columns::RUNBOOKS] = self.runbooks.join("\n");
        out[columns::CHAT] = self.chat.join("\n");
        out[columns::PAGING] = self.paging.join("\n");
        out[columns::RESOURCE_NAMES] = self.resource_names.join("\n");
        out[columns::TERRAFORM] = self.terraform.to_string();
        out[columns::MESSAGE] = self.message.clone();
        out[columns::QUERY] = self.query.clone();
        out
    }
}
