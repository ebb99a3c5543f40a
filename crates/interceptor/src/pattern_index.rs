//! Topic pattern -> bot index.
//!
//! Each bot owns a set of patterns; registering a bot again replaces its
//! previous patterns. Lookups return at most one match per bot (its most
//! specific pattern), ordered by registration.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use swarmgate_core::topic::{specificity, topic_matches, validate_pattern};
use swarmgate_core::MatchKind;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub bot_id: String,
    pub pattern: String,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStats {
    pub total_patterns: usize,
    pub distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct PatternIndex {
    /// pattern -> bot ids, insertion ordered.
    patterns: HashMap<String, Vec<String>>,
    /// bot id -> patterns it is registered under.
    bot_patterns: HashMap<String, Vec<String>>,
    /// bot id -> registration sequence number.
    sequence: HashMap<String, u64>,
    next_seq: u64,
}

impl PatternIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bot_id` under `patterns`, replacing any earlier registration.
    /// Invalid patterns are skipped. Returns how many patterns were indexed.
    pub fn register(&mut self, bot_id: &str, patterns: &[String]) -> usize {
        self.unregister(bot_id);

        let mut accepted: Vec<String> = Vec::new();
        for pattern in patterns {
            if let Err(e) = validate_pattern(pattern) {
                warn!(bot_id = %bot_id, pattern = %pattern, error = %e, "Skipping invalid topic pattern");
                continue;
            }
            if accepted.contains(pattern) {
                continue;
            }
            self.patterns
                .entry(pattern.clone())
                .or_default()
                .push(bot_id.to_string());
            accepted.push(pattern.clone());
        }

        let count = accepted.len();
        self.bot_patterns.insert(bot_id.to_string(), accepted);
        self.sequence.insert(bot_id.to_string(), self.next_seq);
        self.next_seq += 1;
        count
    }

    /// Remove `bot_id` from every pattern. Unknown ids are a no-op.
    pub fn unregister(&mut self, bot_id: &str) -> bool {
        self.sequence.remove(bot_id);
        let Some(patterns) = self.bot_patterns.remove(bot_id) else {
            return false;
        };
        for pattern in patterns {
            if let Some(bots) = self.patterns.get_mut(&pattern) {
                bots.retain(|id| id != bot_id);
                if bots.is_empty() {
                    self.patterns.remove(&pattern);
                }
            }
        }
        true
    }

    pub fn patterns_for(&self, bot_id: &str) -> &[String] {
        self.bot_patterns
            .get(bot_id)
            .map(|p| p.as_slice())
            .unwrap_or(&[])
    }

    /// Bots whose patterns match `topic`, in registration order.
    pub fn match_topic(&self, topic: &str) -> Vec<PatternMatch> {
        let mut best: HashMap<&str, (&str, MatchKind)> = HashMap::new();

        for (pattern, bots) in &self.patterns {
            let Some(kind) = topic_matches(pattern, topic) else {
                continue;
            };
            for bot_id in bots {
                let replace = match best.get(bot_id.as_str()) {
                    None => true,
                    Some((current, current_kind)) => {
                        rank(kind, pattern) > rank(*current_kind, current)
                            || (rank(kind, pattern) == rank(*current_kind, current)
                                && pattern.as_str() < *current)
                    }
                };
                if replace {
                    best.insert(bot_id.as_str(), (pattern.as_str(), kind));
                }
            }
        }

        let mut matches: Vec<PatternMatch> = best
            .into_iter()
            .map(|(bot_id, (pattern, kind))| PatternMatch {
                bot_id: bot_id.to_string(),
                pattern: pattern.to_string(),
                kind,
            })
            .collect();
        matches.sort_by_key(|m| self.sequence.get(&m.bot_id).copied().unwrap_or(u64::MAX));
        matches
    }

    pub fn stats(&self) -> PatternStats {
        PatternStats {
            total_patterns: self.patterns.len(),
            distribution: self
                .patterns
                .iter()
                .map(|(pattern, bots)| (pattern.clone(), bots.len()))
                .collect(),
        }
    }
}

fn rank(kind: MatchKind, pattern: &str) -> (bool, (usize, usize)) {
    (kind.is_exact(), specificity(pattern))
}
