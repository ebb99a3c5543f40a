//! Hierarchical topic matching.
//!
//! Topics and patterns are `/`-delimited. In a pattern, `+` matches exactly
//! one topic segment and a trailing `#` matches zero or more remaining
//! segments. Every other segment must match literally (case-sensitive).

use crate::error::{Error, Result};

pub const SEPARATOR: char = '/';
pub const SINGLE_LEVEL: &str = "+";
pub const MULTI_LEVEL: &str = "#";

/// How a pattern matched a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// The pattern is the topic, character for character.
    Exact,
    /// The pattern matched through `+` or `#`.
    Wildcard,
}

impl MatchKind {
    pub fn is_exact(&self) -> bool {
        matches!(self, MatchKind::Exact)
    }
}

/// Match `topic` against `pattern`, returning how it matched.
pub fn topic_matches(pattern: &str, topic: &str) -> Option<MatchKind> {
    if pattern == topic {
        return Some(MatchKind::Exact);
    }

    let mut topic_segments = topic.split(SEPARATOR);
    let mut pattern_segments = pattern.split(SEPARATOR).peekable();

    while let Some(segment) = pattern_segments.next() {
        if segment == MULTI_LEVEL && pattern_segments.peek().is_none() {
            return Some(MatchKind::Wildcard);
        }
        let Some(topic_segment) = topic_segments.next() else {
            return None;
        };
        if segment != SINGLE_LEVEL && segment != topic_segment {
            return None;
        }
    }

    if topic_segments.next().is_some() {
        return None;
    }
    Some(MatchKind::Wildcard)
}

/// Specificity used to pick between several matching patterns: literal
/// segments count most, then `+`, and a trailing `#` counts least.
pub fn specificity(pattern: &str) -> (usize, usize) {
    let mut literal = 0;
    let mut single = 0;
    for segment in pattern.split(SEPARATOR) {
        match segment {
            MULTI_LEVEL => {}
            SINGLE_LEVEL => single += 1,
            _ => literal += 1,
        }
    }
    (literal, single)
}

/// Reject patterns the matcher can never honor.
pub fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(Error::Validation("topic pattern is empty".to_string()));
    }
    let segments: Vec<&str> = pattern.split(SEPARATOR).collect();
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            return Err(Error::Validation(format!(
                "topic pattern '{}' has an empty segment",
                pattern
            )));
        }
        if *segment == MULTI_LEVEL && i + 1 != segments.len() {
            return Err(Error::Validation(format!(
                "topic pattern '{}' uses '#' before the last segment",
                pattern
            )));
        }
        if segment.len() > 1 && (segment.contains('#') || segment.contains('+')) {
            return Err(Error::Validation(format!(
                "topic pattern '{}' mixes wildcards with literal text in '{}'",
                pattern, segment
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(topic_matches("chat/message", "chat/message"), Some(MatchKind::Exact));
    }

    #[test]
    fn test_single_level_wildcard() {
        assert_eq!(topic_matches("chat/+", "chat/message"), Some(MatchKind::Wildcard));
        assert_eq!(topic_matches("chat/+", "chat/message/edited"), None);
        assert_eq!(topic_matches("chat/+", "chat"), None);
    }

    #[test]
    fn test_multi_level_wildcard() {
        assert_eq!(topic_matches("#", "chat/message"), Some(MatchKind::Wildcard));
        assert_eq!(topic_matches("chat/#", "chat"), Some(MatchKind::Wildcard));
        assert_eq!(topic_matches("chat/#", "chat/message/edited"), Some(MatchKind::Wildcard));
        assert_eq!(topic_matches("chat/#", "system/error"), None);
    }

    #[test]
    fn test_case_sensitive() {
        assert_eq!(topic_matches("Chat/message", "chat/message"), None);
    }

    #[test]
    fn test_literal_mismatch() {
        assert_eq!(topic_matches("system/error", "chat/message"), None);
        assert_eq!(topic_matches("chat/message", "chat/message/x"), None);
    }

    #[test]
    fn test_specificity_orders_literal_first() {
        assert!(specificity("chat/message") > specificity("chat/+"));
        assert!(specificity("chat/+") > specificity("chat/#"));
        assert!(specificity("chat/#") > specificity("#"));
    }

    #[test]
    fn test_validate_pattern() {
        assert!(validate_pattern("chat/+/edited").is_ok());
        assert!(validate_pattern("#").is_ok());
        assert!(validate_pattern("").is_err());
        assert!(validate_pattern("chat//message").is_err());
        assert!(validate_pattern("#/chat").is_err());
        assert!(validate_pattern("chat/mess#").is_err());
    }
}
