use serde::Serialize;
use swarmgate_core::{BotParticipant, BotRole, MatchKind, PriorityConfig};

/// A bot matched for an event, with the score that orders it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub bot: BotParticipant,
    pub matched_pattern: String,
    pub exact: bool,
    pub score: i64,
}

pub fn role_weight(role: &BotRole, config: &PriorityConfig) -> i64 {
    match role {
        BotRole::Coordinator => config.coordinator_weight,
        BotRole::Specialist => config.specialist_weight,
        BotRole::Monitor => config.monitor_weight,
        BotRole::Participant => config.participant_weight,
        BotRole::Other(_) => config.default_weight,
    }
}

pub fn priority_score(role: &BotRole, kind: MatchKind, config: &PriorityConfig) -> i64 {
    let bonus = if kind.is_exact() {
        config.exact_match_bonus
    } else {
        0
    };
    role_weight(role, config).saturating_add(bonus)
}

/// Sort by score, highest first. The sort is stable, so candidates passed in
/// registration order keep that order on ties.
pub fn rank_candidates(mut candidates: Vec<RankedCandidate>) -> Vec<RankedCandidate> {
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}
