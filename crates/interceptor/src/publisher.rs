use swarmgate_core::{BotEventResponse, Progression};

/// Overall progression for a set of bot responses: any `block` wins, then the
/// first non-standard progression, otherwise `continue`. No responses means
/// `continue`.
pub fn aggregate_progression(responses: &[BotEventResponse]) -> Progression {
    if responses.iter().any(|r| r.response.progression.is_block()) {
        return Progression::Block;
    }
    responses
        .iter()
        .find_map(|r| match &r.response.progression {
            Progression::Other(value) => Some(Progression::Other(value.clone())),
            _ => None,
        })
        .unwrap_or(Progression::Continue)
}

/// `bot: reason` pairs joined with `; `. Responses without a reason are left out.
pub fn aggregate_reasons(responses: &[BotEventResponse]) -> String {
    responses
        .iter()
        .filter(|r| !r.response.reason.is_empty())
        .map(|r| format!("{}: {}", r.bot_id, r.response.reason))
        .collect::<Vec<_>>()
        .join("; ")
}
