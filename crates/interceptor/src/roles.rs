use std::collections::HashMap;
use swarmgate_core::{BotParticipant, BotRole};

/// Implicit subscriptions for a role, used when a bot declares no behaviors.
/// Entries in `overrides` (keyed by role name) replace the built-in table.
pub fn default_patterns(role: &BotRole, overrides: &HashMap<String, Vec<String>>) -> Vec<String> {
    if let Some(patterns) = overrides.get(role.as_str()) {
        return patterns.clone();
    }
    match role {
        BotRole::Coordinator => vec!["#".to_string()],
        BotRole::Monitor => vec![
            "chat/#".to_string(),
            "swarm/#".to_string(),
            "system/#".to_string(),
        ],
        BotRole::Specialist | BotRole::Participant | BotRole::Other(_) => Vec::new(),
    }
}

/// Every pattern a bot should be indexed under: behavior topics, explicit
/// subscriptions, and role defaults when it has no behaviors. Duplicates are
/// dropped, first occurrence wins.
pub fn subscription_patterns(
    bot: &BotParticipant,
    overrides: &HashMap<String, Vec<String>>,
) -> Vec<String> {
    let behaviors = bot.behaviors();
    let mut patterns: Vec<String> = behaviors
        .iter()
        .map(|b| b.trigger.topic.clone())
        .collect();
    patterns.extend(bot.subscriptions().iter().cloned());
    if behaviors.is_empty() {
        patterns.extend(default_patterns(&bot.role, overrides));
    }

    let mut seen = std::collections::HashSet::new();
    patterns.retain(|p| seen.insert(p.clone()));
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmgate_core::{Action, Behavior, Trigger};

    fn behavior(topic: &str) -> Behavior {
        Behavior {
            trigger: Trigger {
                topic: topic.to_string(),
                when: None,
                progression: None,
            },
            action: Action::Invoke {
                purpose: Some("reply".to_string()),
            },
        }
    }

    #[test]
    fn test_coordinator_without_behaviors_subscribes_broadly() {
        let bot = BotParticipant::new("c1", "Coord", BotRole::Coordinator);
        assert_eq!(subscription_patterns(&bot, &HashMap::new()), vec!["#".to_string()]);
    }

    #[test]
    fn test_monitor_defaults() {
        let bot = BotParticipant::new("m1", "Watch", BotRole::Monitor);
        let patterns = subscription_patterns(&bot, &HashMap::new());
        assert!(patterns.contains(&"chat/#".to_string()));
        assert!(patterns.contains(&"system/#".to_string()));
    }

    #[test]
    fn test_behaviors_suppress_role_defaults() {
        let bot = BotParticipant::new("c1", "Coord", BotRole::Coordinator)
            .with_behavior(behavior("chat/message"))
            .with_subscription("webhook/#")
            .with_subscription("chat/message");
        assert_eq!(
            subscription_patterns(&bot, &HashMap::new()),
            vec!["chat/message".to_string(), "webhook/#".to_string()]
        );
    }

    #[test]
    fn test_specialist_has_no_defaults() {
        let bot = BotParticipant::new("s1", "Spec", BotRole::Specialist);
        assert!(subscription_patterns(&bot, &HashMap::new()).is_empty());
    }

    #[test]
    fn test_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("specialist".to_string(), vec!["tasks/#".to_string()]);
        let bot = BotParticipant::new("s1", "Spec", BotRole::Specialist);
        assert_eq!(subscription_patterns(&bot, &overrides), vec!["tasks/#".to_string()]);
    }
}
