use crate::{Diagnostic, OwnershipIntent};
use serde::Serialize;
use std::collections::BTreeSet;

/// Team value reserved for alerts whose owners asked for their removal.
pub const DELETE_TEAM: &str = "delete";

/// Canonical owner of an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOwnership {
    /// Lower-kebab-case team slug, or `DELETE_TEAM`.
    pub team: String,
    /// Lower-kebab-case squad slug. Always `None` for `DELETE_TEAM`.
    pub squad: Option<String>,
}

impl ResolvedOwnership {
    pub fn delete() -> Self {
        Self {
            team: DELETE_TEAM.to_string(),
            squad: None,
        }
    }

    pub fn is_delete(&self) -> bool {
        self.team == DELETE_TEAM
    }

    /// Human-readable `team > squad` label.
    pub fn label(&self) -> String {
        match &self.squad {
            Some(squad) => format!("{} > {squad}", self.team),
            None => self.team.clone(),
        }
    }
}

/// Pattern matched against a normalized (lower-cased, trimmed) owner string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Exact(&'static str),
    Prefix(&'static str),
    Contains(&'static str),
}

impl Pattern {
    pub fn matches(&self, s: &str) -> bool {
        match self {
            Pattern::Exact(p) => s == *p,
            Pattern::Prefix(p) => s.starts_with(p),
            Pattern::Contains(p) => s.contains(p),
        }
    }
}

/// How the squad is derived once an `OwnerRule` matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquadRule {
    None,
    Fixed(&'static str),
    /// The segment after the last `/` or `>`, unless it's the team segment.
    Segment,
    /// The last word of a multi-word owner, as in "Jobs Monetization".
    LastWord,
    /// `Segment` when the owner has a `/`, and `LastWord` otherwise.
    SegmentOrLastWord,
    /// Derived from the declared product area, falling back to `Segment`.
    ProductArea,
}

#[derive(Debug, Clone, Copy)]
pub struct OwnerRule {
    pub pattern: Pattern,
    pub team: &'static str,
    pub squad: SquadRule,
}

const fn rule(pattern: Pattern, team: &'static str, squad: SquadRule) -> OwnerRule {
    OwnerRule {
        pattern,
        team,
        squad,
    }
}

use Pattern::{Contains, Exact, Prefix};

/// Owner rules, evaluated top to bottom with the first match winning.
/// Patterns overlap, so order matters: for example "core" squads are matched
/// by prefix before "basecamp", and "ios core" isn't a "core" prefix match.
/// Owners matching no rule use their `team / squad` segments verbatim.
pub const OWNER_RULES: &[OwnerRule] = &[
    rule(Exact("delete"), DELETE_TEAM, SquadRule::None),
    rule(Contains("monolith"), "shared-monolith", SquadRule::None),
    rule(Exact("data"), "data", SquadRule::Segment),
    rule(Prefix("platform"), "platform-services", SquadRule::Segment),
    rule(Prefix("job"), "jobs", SquadRule::LastWord),
    rule(Prefix("core"), "core", SquadRule::SegmentOrLastWord),
    rule(
        Contains("integration"),
        "talent-evolution",
        SquadRule::Fixed("analytics and integrations"),
    ),
    rule(Prefix("talent"), "talent-evolution", SquadRule::ProductArea),
    rule(Prefix("te "), "talent-evolution", SquadRule::ProductArea),
    rule(Prefix("se "), "spark-engagement", SquadRule::LastWord),
    rule(Prefix("spark"), "spark-engagement", SquadRule::None),
    rule(Exact("monetization"), "jobs", SquadRule::Fixed("monetization")),
    rule(Exact("basecamp"), "core", SquadRule::Fixed("basecamp")),
    rule(
        Contains("search"),
        "infrastructure",
        SquadRule::Fixed("search-technologies"),
    ),
    rule(
        Prefix("ce"),
        "infrastructure",
        SquadRule::Fixed("cloud-engineering"),
    ),
    rule(
        Contains("cloud-engineering"),
        "infrastructure",
        SquadRule::Fixed("cloud-engineering"),
    ),
    rule(Exact("devx"), "infrastructure", SquadRule::Fixed("devx")),
    rule(Exact("ios core"), "platform-services", SquadRule::Fixed("mobile")),
    rule(Exact("mobile"), "platform-services", SquadRule::Fixed("mobile")),
    rule(Contains("live connections"), "live-connections", SquadRule::None),
    rule(Exact("dep"), "platform-services", SquadRule::Fixed("domain events")),
    rule(Contains("humans"), "humans", SquadRule::Segment),
];

/// Squads derived from a lower-cased product area, first match winning.
pub const PRODUCT_AREA_SQUADS: &[(Pattern, &str)] = &[
    (Exact("a&i"), "analytics and integrations"),
    // Names the squad as the channel and paging tables know it.
    (Contains("guidance"), "talent guidance"),
    (Contains("skills"), "skills"),
];

/// Team tag values which describe an audience rather than an owner.
pub const OVERLOADED_TEAM_MARKERS: &[&str] = &["university", "student", "employer"];

#[derive(Debug, Clone, Copy)]
pub struct TagRule {
    pub tag: &'static str,
    pub team: &'static str,
    pub squad: Option<&'static str>,
}

/// Known team tag values, highest precedence first. When an alert has several
/// team tags, the first rule matching any of them decides its owner.
pub const TEAM_TAG_RULES: &[TagRule] = &[
    TagRule {
        tag: "messaging",
        team: "spark-engagement",
        squad: Some("messaging"),
    },
    TagRule {
        tag: "cloud-engineering",
        team: "infrastructure",
        squad: Some("cloud-engineering"),
    },
    TagRule {
        tag: "iam",
        team: "platform-services",
        squad: Some("access-and-admin"),
    },
    TagRule {
        tag: "devx",
        team: "infrastructure",
        squad: Some("devx"),
    },
    TagRule {
        tag: "notifications",
        team: "platform-services",
        squad: Some("notifications"),
    },
    TagRule {
        tag: "platform",
        team: "platform-services",
        squad: None,
    },
    TagRule {
        tag: "data",
        team: "data",
        squad: None,
    },
];

/// Resolve the new owner of an alert, from its workbook intent if there is
/// one and otherwise from its tags. Returns None if no owner can be found.
pub fn resolve(
    intent: Option<&OwnershipIntent>,
    tags: &BTreeSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<ResolvedOwnership> {
    if intent.map_or(false, |i| i.delete_requested) {
        return Some(ResolvedOwnership::delete());
    }
    let product_area = intent.and_then(|i| i.product_area.as_deref());

    let raw_owner = match intent.and_then(|i| i.raw_owner.as_deref()) {
        Some(raw) => raw.to_string(),
        None => infer_from_tags(tags, diagnostics)?,
    };
    resolve_owner(&raw_owner, product_area)
}

/// Infer a raw `team > squad` owner string from `team:` and `squad:` tags.
pub fn infer_from_tags(
    tags: &BTreeSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    let teams: Vec<String> = tag_values(tags, "team:")
        .filter(|team| {
            let team = team.to_lowercase();
            !OVERLOADED_TEAM_MARKERS.iter().any(|m| team.contains(m))
        })
        .collect();
    let mut squads = tag_values(tags, "squad:");

    let first = match teams.first() {
        Some(first) => first,
        None => {
            diagnostics.push(Diagnostic::NoOwner);
            return None;
        }
    };

    let (team, squad) = match TEAM_TAG_RULES
        .iter()
        .find(|r| teams.iter().any(|t| t == r.tag))
    {
        Some(rule) => (rule.team.to_string(), rule.squad.map(str::to_string)),
        None => (first.clone(), None),
    };
    if teams.len() > 1 {
        diagnostics.push(Diagnostic::MultipleTeamTags {
            tags: teams.clone(),
            chosen: team.clone(),
        });
    }

    match squad.or_else(|| squads.next()) {
        Some(squad) => Some(format!("{team} > {squad}")),
        None => Some(team),
    }
}

fn tag_values<'t>(
    tags: &'t BTreeSet<String>,
    prefix: &'static str,
) -> impl Iterator<Item = String> + 't {
    tags.iter()
        .filter(move |t| t.starts_with(prefix))
        .filter_map(|t| t.rsplit(':').next())
        .filter(|v| !v.is_empty())
        .map(|v| v.replace('_', "-"))
}

/// Resolve a human-entered owner string against `OWNER_RULES`.
pub fn resolve_owner(raw: &str, product_area: Option<&str>) -> Option<ResolvedOwnership> {
    let owner = raw.replace('&', "and").trim().to_lowercase();

    let team_segment = owner
        .split('/')
        .next()
        .and_then(|s| s.split('>').next())
        .unwrap_or_default()
        .trim();
    let squad_segment = owner
        .rsplit('/')
        .next()
        .and_then(|s| s.rsplit('>').next())
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != team_segment);

    let (team, squad) = match OWNER_RULES.iter().find(|r| r.pattern.matches(&owner)) {
        Some(rule) if rule.team == DELETE_TEAM => return Some(ResolvedOwnership::delete()),
        Some(rule) => {
            let squad = match rule.squad {
                SquadRule::None => None,
                SquadRule::Fixed(squad) => Some(squad.to_string()),
                SquadRule::Segment => squad_segment.map(str::to_string),
                SquadRule::LastWord => last_word(&owner),
                SquadRule::SegmentOrLastWord if owner.contains('/') => {
                    squad_segment.map(str::to_string)
                }
                SquadRule::SegmentOrLastWord => last_word(&owner),
                SquadRule::ProductArea => product_area
                    .map(str::to_lowercase)
                    .and_then(|area| {
                        PRODUCT_AREA_SQUADS
                            .iter()
                            .find(|(p, _)| p.matches(area.trim()))
                            .map(|(_, squad)| squad.to_string())
                    })
                    .or_else(|| squad_segment.map(str::to_string)),
            };
            (rule.team.to_string(), squad)
        }
        None if team_segment.is_empty() => return None,
        None => (team_segment.to_string(), squad_segment.map(str::to_string)),
    };

    Some(ResolvedOwnership {
        team: slug(&team),
        squad: squad.map(|s| slug(&s).replace("avocates", "advocates")),
    })
}

fn last_word(owner: &str) -> Option<String> {
    let mut words = owner.split_whitespace();
    let first = words.next()?;
    Some(words.last().unwrap_or(first))
        .filter(|last| *last != first)
        .map(str::to_string)
}

fn slug(s: &str) -> String {
    s.trim().replace(' ', "-")
}
