use crate::classify::{terraform_marker, TerraformMarker};
use crate::directive::{self, Directive, Kind};
use crate::rewrite::{self, Outcome};
use crate::{diff, ownership, targets, Diagnostic, ResolvedOwnership, Settings};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Fixed column roles of workbook rows.
pub mod columns {
    pub const ID: usize = 0;
    pub const OWNER: usize = 1;
    pub const PRODUCT_AREA: usize = 2;
    pub const NAME: usize = 3;
    pub const ENVIRONMENTS: usize = 4;
    pub const TEAMS: usize = 5;
    pub const TAGS: usize = 6;
    pub const RUNBOOKS: usize = 7;
    pub const CHAT: usize = 8;
    pub const PAGING: usize = 9;
    pub const RESOURCE_NAMES: usize = 10;
    pub const TERRAFORM: usize = 11;
    pub const MESSAGE: usize = 12;
    pub const QUERY: usize = 13;

    /// Heading of the identifier column, marking header rows.
    pub const ID_HEADER: &str = "Datadog Alert ID";

    pub const HEADERS: [&str; 14] = [
        ID_HEADER,
        "New Owner",
        "Product Area",
        "Alert Name",
        "Environments",
        "Teams",
        "Tags",
        "Runbooks",
        "Slack Channels",
        "Pagerduty Services",
        "Resource Names",
        "Terraform?",
        "Message",
        "Query",
    ];
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("alert identifier {0} is not an integer")]
    InvalidId(String),
    #[error("alert definition is missing its identifier")]
    MissingId,
    #[error("failed to decode alert definition")]
    Json(#[from] serde_json::Error),
}

/// Alert definition as it's known to the monitoring platform.
/// This is the ground truth against which everything else is compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDefinition {
    pub id: i64,
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub query: String,
}

// Fields of a monitor document besides its identifier, which is decoded separately.
#[derive(Deserialize)]
struct RawMonitor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    query: String,
}

impl AlertDefinition {
    /// Decode an exported monitor document.
    pub fn from_export(document: &str) -> Result<Self, LoadError> {
        Self::from_live(&serde_json::from_str(document)?)
    }

    /// Decode a monitor body, as exported or as returned by the monitoring API.
    /// Fields besides the modeled ones are ignored.
    pub fn from_live(body: &serde_json::Value) -> Result<Self, LoadError> {
        let id = match body.get("id") {
            None | Some(serde_json::Value::Null) => return Err(LoadError::MissingId),
            Some(id) => parse_id(id)?,
        };
        let RawMonitor {
            name,
            message,
            tags,
            query,
        } = RawMonitor::deserialize(body)?;

        Ok(Self {
            id,
            name,
            message,
            tags,
            query,
        })
    }
}

fn parse_id(id: &serde_json::Value) -> Result<i64, LoadError> {
    match id {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| LoadError::InvalidId(id.to_string()))
}

/// Copy of an alert recorded by a workbook when it was exported.
/// Each field is present only if the workbook carries its column.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedAlert {
    pub name: Option<String>,
    pub message: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub query: Option<String>,
}

/// Ownership declared by a workbook row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipIntent {
    pub id: i64,
    pub raw_owner: Option<String>,
    pub product_area: Option<String>,
    pub delete_requested: bool,
    pub recorded: Option<RecordedAlert>,
}

impl OwnershipIntent {
    /// Parse a workbook row. Header rows and rows without an identifier are
    /// skipped with `Ok(None)`, while a malformed identifier is an error.
    pub fn from_row(cells: &[&str]) -> Result<Option<Self>, LoadError> {
        let cell = |index: usize| {
            cells
                .get(index)
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
        };

        let id = match cell(columns::ID) {
            None | Some(columns::ID_HEADER) => return Ok(None),
            Some(id) => id
                .parse::<i64>()
                .map_err(|_| LoadError::InvalidId(id.to_string()))?,
        };
        let raw_owner = cell(columns::OWNER).map(str::to_string);
        let delete_requested = raw_owner
            .as_deref()
            .map_or(false, |o| o.eq_ignore_ascii_case(ownership::DELETE_TEAM));

        let recorded = RecordedAlert {
            name: cell(columns::NAME).map(str::to_string),
            message: cell(columns::MESSAGE).map(str::to_string),
            tags: cell(columns::TAGS).map(|tags| {
                tags.lines()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            }),
            query: cell(columns::QUERY).map(str::to_string),
        };
        let recorded = (recorded != RecordedAlert::default()).then_some(recorded);

        Ok(Some(Self {
            id,
            raw_owner,
            product_area: cell(columns::PRODUCT_AREA).map(str::to_string),
            delete_requested,
            recorded,
        }))
    }
}

/// Index intents by alert identifier. Intents are given in sheet order,
/// and the first intent of an identifier wins.
pub fn index_intents<I>(intents: I) -> BTreeMap<i64, OwnershipIntent>
where
    I: IntoIterator<Item = OwnershipIntent>,
{
    let mut out = BTreeMap::new();
    for intent in intents {
        out.entry(intent.id).or_insert(intent);
    }
    out
}

/// An alert being reconciled: local truth merged with its declared ownership,
/// the targets proposed for it, and its possibly-rewritten message.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledAlert {
    /// Local truth, which is never modified.
    pub definition: AlertDefinition,
    pub intent: Option<OwnershipIntent>,
    pub ownership: Option<ResolvedOwnership>,
    pub terraform: Option<TerraformMarker>,
    /// Current message, which is rewritten by `reprocess`.
    pub message: String,
    pub chat: Vec<Directive>,
    pub paging: Vec<Directive>,
    pub new_chat: Option<String>,
    pub new_paging: Option<String>,
    pub chat_outcome: Option<Outcome>,
    pub paging_outcome: Option<Outcome>,
    /// Rewritten message of an alert which can't be updated by this tool.
    pub suggested_message: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ReconciledAlert {
    /// Merge local truth with its workbook intent, if any.
    /// Structural fields are always taken from `definition`.
    pub fn merge(
        definition: AlertDefinition,
        intent: Option<&OwnershipIntent>,
        settings: &Settings,
    ) -> Self {
        let mut diagnostics = Vec::new();

        if let Some(recorded) = intent.and_then(|i| i.recorded.as_ref()) {
            let diff = diff::recorded(&definition, recorded);
            if diff.differs() {
                diagnostics.push(Diagnostic::StaleWorkbookEntry {
                    fields: diff.fields,
                });
            }
        }

        let chat = directive::parse(&definition.message, Kind::Chat, &mut diagnostics);
        let paging = directive::parse(&definition.message, Kind::Paging, &mut diagnostics);
        let ownership = ownership::resolve(intent, &definition.tags, &mut diagnostics);

        let terraform = terraform_marker(&definition.tags);
        if let Some(TerraformMarker::Repository { tag }) = &terraform {
            diagnostics.push(Diagnostic::InferredTerraform { tag: tag.clone() });
        }

        let product_area = intent.and_then(|i| i.product_area.as_deref());
        let mut propose = |kind, current: &[Directive]| {
            targets::propose(
                kind,
                ownership.as_ref(),
                product_area,
                &definition.name,
                current,
                settings,
                &mut diagnostics,
            )
        };
        let new_chat = propose(Kind::Chat, chat.as_slice());
        let new_paging = propose(Kind::Paging, paging.as_slice());

        Self {
            message: definition.message.clone(),
            definition,
            intent: intent.cloned(),
            ownership,
            terraform,
            chat,
            paging,
            new_chat,
            new_paging,
            chat_outcome: None,
            paging_outcome: None,
            suggested_message: None,
            diagnostics,
        }
    }

    pub fn id(&self) -> i64 {
        self.definition.id
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn team(&self) -> Option<&str> {
        self.ownership.as_ref().map(|o| o.team.as_str())
    }

    pub fn squad(&self) -> Option<&str> {
        self.ownership.as_ref().and_then(|o| o.squad.as_deref())
    }

    pub fn product_area(&self) -> Option<&str> {
        self.intent.as_ref().and_then(|i| i.product_area.as_deref())
    }

    /// Rewrite the message to route to the proposed targets, and re-derive
    /// its directives. Chat and paging are rewritten independently.
    pub fn reprocess(&mut self) {
        let mut message = self.message.clone();
        self.chat_outcome = Some(self.rewrite_kind(&mut message, Kind::Chat));
        self.paging_outcome = Some(self.rewrite_kind(&mut message, Kind::Paging));

        self.chat = directive::parse(&message, Kind::Chat, &mut Vec::new());
        self.paging = directive::parse(&message, Kind::Paging, &mut Vec::new());
        self.message = message;
    }

    /// Compute the rewritten message without applying it, for alerts which
    /// must be fixed at their source.
    pub fn suggest(&mut self) {
        let mut message = self.message.clone();
        self.rewrite_kind(&mut message, Kind::Chat);
        self.rewrite_kind(&mut message, Kind::Paging);

        if message != self.message {
            self.suggested_message = Some(message);
        }
    }

    fn rewrite_kind(&mut self, message: &mut String, kind: Kind) -> Outcome {
        let target = match kind {
            Kind::Chat => self.new_chat.as_deref(),
            Kind::Paging => self.new_paging.as_deref(),
        };
        let outcome = rewrite::rewrite(message, kind, target);

        if outcome == Outcome::Ambiguous {
            self.diagnostics.push(Diagnostic::RewriteRejected {
                kind,
                current: rewrite::countable(message, kind)
                    .into_iter()
                    .map(|d| d.token)
                    .collect(),
            });
        }
        outcome
    }

    /// Snapshot of the alert as it would be after this reconciliation.
    pub fn snapshot(&self) -> AlertDefinition {
        AlertDefinition {
            message: self.message.clone(),
            ..self.definition.clone()
        }
    }

    /// Message shown to the operator as the alert's new message.
    pub fn proposed_message(&self) -> &str {
        self.suggested_message.as_deref().unwrap_or(&self.message)
    }

    pub fn updates_chat(&self) -> bool {
        self.chat_outcome.map_or(false, Outcome::is_rewritten)
    }

    pub fn updates_paging(&self) -> bool {
        self.paging_outcome.map_or(false, Outcome::is_rewritten)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn definition(message: &str, tags: &[&str]) -> AlertDefinition {
        AlertDefinition {
            id: 100,
            name: "Queue depth".to_string(),
            message: message.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            query: "avg(last_5m):sum:queue.depth{*} > 10".to_string(),
        }
    }

    #[test]
    fn decode_monitor_documents() {
        let out = AlertDefinition::from_live(&json!({
            "id": 42,
            "name": "Disk full",
            "message": "@slack-ops",
            "tags": ["team:devx", "env:prod", "team:devx"],
            "query": "q",
            "options": {"notify_no_data": true},
        }))
        .unwrap();
        insta::assert_json_snapshot!(out, @r###"
        {
          "id": 42,
          "name": "Disk full",
          "message": "@slack-ops",
          "tags": [
            "env:prod",
            "team:devx"
          ],
          "query": "q"
        }
        "###);

        let out = AlertDefinition::from_export(r#"{"id": "43", "name": "n", "message": ""}"#).unwrap();
        assert_eq!(out.id, 43);

        let err = AlertDefinition::from_export(r#"{"id": "forty", "name": "n"}"#).unwrap_err();
        assert_eq!(err.to_string(), r#"alert identifier "forty" is not an integer"#);
        let err = AlertDefinition::from_export(r#"{"id": 1.5}"#).unwrap_err();
        assert_eq!(err.to_string(), "alert identifier 1.5 is not an integer");
        assert!(matches!(
            AlertDefinition::from_export(r#"{"name": "n"}"#),
            Err(LoadError::MissingId)
        ));
        assert!(matches!(
            AlertDefinition::from_export("not json"),
            Err(LoadError::Json(_))
        ));
    }

    #[test]
    fn parse_workbook_rows() {
        assert_eq!(OwnershipIntent::from_row(&[columns::ID_HEADER, "New Owner"]).unwrap(), None);
        assert_eq!(OwnershipIntent::from_row(&["", "Humans"]).unwrap(), None);
        assert_eq!(OwnershipIntent::from_row(&[]).unwrap(), None);
        assert!(matches!(
            OwnershipIntent::from_row(&["12a", "Humans"]),
            Err(LoadError::InvalidId(id)) if id == "12a"
        ));

        let short = OwnershipIntent::from_row(&[" 7 ", " DELETE ", ""]).unwrap().unwrap();
        assert_eq!(
            short,
            OwnershipIntent {
                id: 7,
                raw_owner: Some("DELETE".to_string()),
                product_area: None,
                delete_requested: true,
                recorded: None,
            }
        );

        let mut cells = vec![""; columns::HEADERS.len()];
        cells[columns::ID] = "8";
        cells[columns::OWNER] = "Core / Channels";
        cells[columns::PRODUCT_AREA] = "Inbox";
        cells[columns::NAME] = "Queue depth";
        cells[columns::TAGS] = "team:core\r\nenv:prod\n";
        cells[columns::MESSAGE] = "@slack-core";
        let full = OwnershipIntent::from_row(&cells).unwrap().unwrap();

        insta::assert_json_snapshot!(full, @r###"
        {
          "id": 8,
          "raw_owner": "Core / Channels",
          "product_area": "Inbox",
          "delete_requested": false,
          "recorded": {
            "name": "Queue depth",
            "message": "@slack-core",
            "tags": [
              "env:prod",
              "team:core"
            ],
            "query": null
          }
        }
        "###);
    }

    #[test]
    fn first_intent_wins() {
        let intent = |id, owner: &str| OwnershipIntent {
            id,
            raw_owner: Some(owner.to_string()),
            product_area: None,
            delete_requested: false,
            recorded: None,
        };
        let index = index_intents(vec![intent(1, "Humans"), intent(2, "Data"), intent(1, "Jobs")]);
        assert_eq!(index.len(), 2);
        assert_eq!(index[&1].raw_owner.as_deref(), Some("Humans"));
    }

    #[test]
    fn merge_and_reprocess() {
        let mut alert = ReconciledAlert::merge(
            definition(
                "alert @slack-incidents-uk @slack-old-team @pagerduty-Old",
                &["team:devx"],
            ),
            None,
            &Settings {
                pagerduty: true,
                ..Default::default()
            },
        );
        assert_eq!(alert.new_chat.as_deref(), Some("@slack-incidents-dev-experience"));
        assert_eq!(alert.new_paging.as_deref(), Some("@pagerduty-DevelopmentEnvironmentRDE"));

        alert.reprocess();
        assert_eq!(
            alert.message,
            "alert @slack-incidents-uk @slack-old-team,@slack-incidents-dev-experience \
             @pagerduty-DevelopmentEnvironmentRDE"
        );
        assert!(alert.updates_chat() && alert.updates_paging());
        assert_eq!(
            alert.chat.iter().map(|d| d.token.as_str()).collect::<Vec<_>>(),
            vec![
                "@slack-incidents-uk",
                "@slack-old-team",
                "@slack-incidents-dev-experience"
            ]
        );
        // Local truth is untouched.
        assert!(alert.definition.message.ends_with("@pagerduty-Old"));
        assert_eq!(alert.snapshot().message, alert.message);
        assert!(alert.diagnostics.is_empty());
    }

    #[test]
    fn ambiguous_rewrites_are_diagnosed() {
        let mut alert = ReconciledAlert::merge(
            definition("@slack-a @slack-b", &["team:humans"]),
            None,
            &Settings::default(),
        );
        alert.reprocess();
        assert_eq!(alert.message, "@slack-a @slack-b");
        assert_eq!(alert.chat_outcome, Some(Outcome::Ambiguous));
        assert_eq!(alert.paging_outcome, Some(Outcome::NoTarget));
        assert_eq!(
            alert.diagnostics,
            vec![Diagnostic::RewriteRejected {
                kind: Kind::Chat,
                current: vec!["@slack-a".to_string(), "@slack-b".to_string()],
            }]
        );
    }

    #[test]
    fn suggestions_are_not_applied() {
        let mut alert = ReconciledAlert::merge(
            definition("@slack-old", &["team:humans", "repo:terraform-monitors"]),
            None,
            &Settings::default(),
        );
        alert.suggest();
        assert_eq!(alert.message, "@slack-old");
        assert_eq!(alert.proposed_message(), "@slack-old,@slack-incidents-humans");
        assert!(!alert.updates_chat());
        assert_eq!(
            alert.diagnostics,
            vec![Diagnostic::InferredTerraform {
                tag: "repo:terraform-monitors".to_string()
            }]
        );
    }

    #[test]
    fn stale_workbook_entries_are_diagnosed() {
        let intent = OwnershipIntent {
            id: 100,
            raw_owner: Some("Humans".to_string()),
            product_area: None,
            delete_requested: false,
            recorded: Some(RecordedAlert {
                name: Some("Old name".to_string()),
                ..Default::default()
            }),
        };
        let alert = ReconciledAlert::merge(
            definition("@slack-a", &[]),
            Some(&intent),
            &Settings::default(),
        );
        assert_eq!(alert.name(), "Queue depth");
        assert_eq!(alert.team(), Some("humans"));
        assert_eq!(
            alert.diagnostics,
            vec![Diagnostic::StaleWorkbookEntry {
                fields: vec![diff::Field::Name]
            }]
        );
    }
}
