use crate::diff::Field;
use crate::directive::Kind;
use serde::Serialize;

/// Data-quality anomaly noticed while reconciling a single alert.
/// Diagnostics never change an outcome: they're surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Diagnostic {
    /// The same directive token appears more than once in the message.
    DuplicateDirectives { kind: Kind, tokens: Vec<String> },
    /// The workbook's recorded copy of the alert differs from local truth.
    StaleWorkbookEntry { fields: Vec<Field> },
    /// Neither a workbook owner nor a usable team tag is present.
    NoOwner,
    /// Several team tags remained after filtering, and one was chosen.
    MultipleTeamTags { tags: Vec<String>, chosen: String },
    /// No target is mapped for the resolved team.
    UnknownTeam { kind: Kind, team: String },
    /// No target is mapped for the resolved squad, and its team has no default.
    UnknownSquad {
        kind: Kind,
        team: String,
        squad: Option<String>,
    },
    /// The squad isn't mapped, so the team's default target was used.
    SquadDefaulted {
        kind: Kind,
        team: String,
        squad: String,
    },
    /// Chat routing of a campaign workflow is intentionally left alone.
    CampaignSuppressed,
    /// Terraform management was inferred from a repository tag.
    InferredTerraform { tag: String },
    /// The message has several current directives, so it wasn't rewritten.
    RewriteRejected { kind: Kind, current: Vec<String> },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::DuplicateDirectives { kind, tokens } => {
                write!(f, "duplicate {kind} directives: {}", tokens.join(", "))
            }
            Diagnostic::StaleWorkbookEntry { fields } => {
                write!(f, "workbook entry is inconsistent with current alert: {fields:?}")
            }
            Diagnostic::NoOwner => f.write_str("no new owner nor team tags, unable to guess"),
            Diagnostic::MultipleTeamTags { tags, chosen } => {
                write!(f, "multiple team tags {tags:?}, guessed {chosen}")
            }
            Diagnostic::UnknownTeam { kind, team } => {
                write!(f, "no {kind} target for unknown team {team}")
            }
            Diagnostic::UnknownSquad { kind, team, squad } => write!(
                f,
                "no {kind} target for unknown squad {} of team {team}",
                squad.as_deref().unwrap_or("<none>")
            ),
            Diagnostic::SquadDefaulted { kind, team, squad } => write!(
                f,
                "squad {squad} has no {kind} target, falling back to default of team {team}"
            ),
            Diagnostic::CampaignSuppressed => {
                f.write_str("campaign workflow, not remapping chat routing")
            }
            Diagnostic::InferredTerraform { tag } => {
                write!(f, "found terraform repository tag {tag}, assuming terraform")
            }
            Diagnostic::RewriteRejected { kind, current } => write!(
                f,
                "multiple current {kind} directives ({}), please reprocess manually",
                current.join(", ")
            ),
        }
    }
}
