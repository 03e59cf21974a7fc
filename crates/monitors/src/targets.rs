use crate::directive::{Directive, Kind};
use crate::{Diagnostic, ResolvedOwnership, Settings};

/// Targets of a single team, for one directive kind.
#[derive(Debug, Clone, Copy)]
pub struct TeamTargets {
    pub team: &'static str,
    /// Matched as substrings of the lower-cased product area, before squads.
    pub product_areas: &'static [(&'static str, &'static str)],
    pub squads: &'static [(&'static str, &'static str)],
    /// Target when the squad is absent or unmatched.
    /// Without a default, an unmatched squad has no target.
    pub default: Option<&'static str>,
}

const fn team(team: &'static str, default: &'static str) -> TeamTargets {
    TeamTargets {
        team,
        product_areas: &[],
        squads: &[],
        default: Some(default),
    }
}

/// Chat channels of each team, named without their `@slack-` prefix.
pub const CHAT_TARGETS: &[TeamTargets] = &[
    team("jobs", "incidents-jobs"),
    TeamTargets {
        team: "spark-engagement",
        product_areas: &[],
        squads: &[
            ("messaging", "incidents-employer-connections-messaging"),
            ("campaigns", "incidents-spk-campaign"),
        ],
        default: Some("incidents-spark-engagement"),
    },
    TeamTargets {
        team: "core",
        product_areas: &[],
        squads: &[
            ("channels", "incidents-channels"),
            ("basecamp", "incidents-core-basecamp"),
        ],
        default: None,
    },
    team("live-connections", "incidents-live-cxns"),
    team("humans", "incidents-humans"),
    TeamTargets {
        team: "talent-evolution",
        product_areas: &[],
        squads: &[
            ("analytics-and-integrations", "incidents-te-analytics-int"),
            ("talent-guidance", "incidents-te-talent"),
            ("skills", "incidents-te-skills"),
        ],
        default: None,
    },
    TeamTargets {
        team: "platform-services",
        product_areas: &[],
        squads: &[("notifications", "incidents-notifications")],
        default: Some("incidents-platform-services"),
    },
    TeamTargets {
        team: "infrastructure",
        product_areas: &[],
        squads: &[
            ("cloud-engineering", "incidents-cloud-engineering"),
            ("devx", "incidents-dev-experience"),
            ("search-technologies", "incidents-search-technologies"),
        ],
        default: Some("incidents-infrastructure"),
    },
    team("data", "incidents-data"),
];

/// Paging services of each team, named without their `@pagerduty-` prefix.
pub const PAGING_TARGETS: &[TeamTargets] = &[
    team("jobs", "jobs"),
    team("spark-engagement", "Team-SparkEngagement"),
    TeamTargets {
        team: "core",
        product_areas: &[],
        squads: &[("channels", "Squad-Channels"), ("basecamp", "Squad-Basecamp")],
        default: None,
    },
    team("live-connections", "Team-LiveConnections"),
    team("humans", "Team-Humans"),
    TeamTargets {
        team: "talent-evolution",
        product_areas: &[
            ("edu email events", "EmailEvents"),
            ("ats", "ATSApplication"),
            ("importer", "ImporterApplication"),
            ("talent guidance", "TalentGuidance"),
        ],
        squads: &[
            ("analytics-and-integrations", "Squad-AnalyticsandIntegrations"),
            ("talent-guidance", "TalentGuidance"),
            ("skills", "Skills"),
        ],
        default: None,
    },
    team("platform-services", "Team-PlatformServices"),
    TeamTargets {
        team: "infrastructure",
        product_areas: &[],
        squads: &[
            ("cloud-engineering", "CloudEngineering"),
            ("devx", "DevelopmentEnvironmentRDE"),
            ("search-technologies", "Squad-SearchTechnologies"),
        ],
        default: None,
    },
    TeamTargets {
        team: "data",
        product_areas: &[],
        squads: &[
            ("engineering", "Squad-DataEngineering"),
            ("relevance", "Squad-DataRelevance"),
        ],
        default: Some("AirflowandDataPipelines"),
    },
];

/// Product-area marker of campaign workflows, whose chat routing isn't remapped.
pub const CAMPAIGN_MARKER: &str = "campaign";

/// Reason a lookup found no target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unmapped {
    Team,
    Squad,
}

/// Target found by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found {
    pub target: &'static str,
    /// The squad was unmatched, and the team default was used instead.
    pub defaulted: bool,
}

pub fn table(kind: Kind) -> &'static [TeamTargets] {
    match kind {
        Kind::Chat => CHAT_TARGETS,
        Kind::Paging => PAGING_TARGETS,
    }
}

/// Look up the `kind` target of `owner` (outer key team, inner key squad).
pub fn lookup(
    kind: Kind,
    owner: &ResolvedOwnership,
    product_area: Option<&str>,
) -> Result<Found, Unmapped> {
    let targets = table(kind)
        .iter()
        .find(|t| t.team == owner.team)
        .ok_or(Unmapped::Team)?;

    if let Some(area) = product_area.map(str::to_lowercase) {
        if let Some(&(_, target)) = targets.product_areas.iter().find(|(p, _)| area.contains(p)) {
            return Ok(Found {
                target,
                defaulted: false,
            });
        }
    }

    let squad = owner.squad.as_deref();
    if let Some(&(_, target)) = targets.squads.iter().find(|(s, _)| Some(*s) == squad) {
        return Ok(Found {
            target,
            defaulted: false,
        });
    }

    match targets.default {
        Some(target) => Ok(Found {
            target,
            defaulted: squad.is_some() && !targets.squads.is_empty(),
        }),
        None => Err(Unmapped::Squad),
    }
}

/// Propose the directive token which `owner` should be routed to for `kind`.
///
/// Nothing is proposed for alerts that don't currently route to that kind,
/// for alerts marked for deletion, for paging when paging is disabled, or for
/// the chat routing of campaign workflows. Unmapped owners are diagnosed.
pub fn propose(
    kind: Kind,
    owner: Option<&ResolvedOwnership>,
    product_area: Option<&str>,
    alert_name: &str,
    current: &[Directive],
    settings: &Settings,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    let owner = owner.filter(|o| !o.is_delete())?;

    if current.is_empty() || (kind == Kind::Paging && !settings.pagerduty) {
        return None;
    }
    if kind == Kind::Chat && is_campaign(owner, product_area, alert_name) {
        diagnostics.push(Diagnostic::CampaignSuppressed);
        return None;
    }

    match lookup(kind, owner, product_area) {
        Ok(Found { target, defaulted }) => {
            if defaulted {
                diagnostics.push(Diagnostic::SquadDefaulted {
                    kind,
                    team: owner.team.clone(),
                    squad: owner.squad.clone().unwrap_or_default(),
                });
            }
            Some(kind.token(target))
        }
        Err(Unmapped::Team) => {
            diagnostics.push(Diagnostic::UnknownTeam {
                kind,
                team: owner.team.clone(),
            });
            None
        }
        Err(Unmapped::Squad) => {
            diagnostics.push(Diagnostic::UnknownSquad {
                kind,
                team: owner.team.clone(),
                squad: owner.squad.clone(),
            });
            None
        }
    }
}

fn is_campaign(owner: &ResolvedOwnership, product_area: Option<&str>, alert_name: &str) -> bool {
    product_area.map_or(false, |a| a.to_lowercase().contains(CAMPAIGN_MARKER))
        || (owner.team == "spark-engagement" && alert_name.to_lowercase().contains(CAMPAIGN_MARKER))
}
