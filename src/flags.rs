//! Keyword flag detection over arbitrary text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::defaults::default_flag_keywords;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagResult {
    pub result: String,
    pub has_flags: bool,
    pub flags: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ResultParser {
    keywords: Vec<String>,
}

impl Default for ResultParser {
    fn default() -> Self {
        Self::new(default_flag_keywords())
    }
}

impl ResultParser {
    /// Keywords are matched case-insensitively; repeats in `keywords` are dropped.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.into().trim().to_lowercase();
            if !keyword.is_empty() && !unique.contains(&keyword) {
                unique.push(keyword);
            }
        }
        Self { keywords: unique }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn parse(&self, text: &str) -> FlagResult {
        let haystack = text.to_lowercase();
        let flags: Vec<String> = self
            .keywords
            .iter()
            .filter(|keyword| haystack.contains(keyword.as_str()))
            .cloned()
            .collect();

        if !flags.is_empty() {
            tracing::debug!("Flagged text with {:?}", flags);
        }

        FlagResult {
            result: text.to_string(),
            has_flags: !flags.is_empty(),
            flags,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_every_matching_keyword() {
        let parsed =
            ResultParser::default().parse("This is urgent and needs immediate attention");
        assert!(parsed.has_flags);
        assert_eq!(parsed.flags, vec!["urgent", "immediate attention"]);
        assert_eq!(parsed.result, "This is urgent and needs immediate attention");
    }

    #[test]
    fn routine_text_has_no_flags() {
        let parsed = ResultParser::default().parse("Routine update");
        assert!(!parsed.has_flags);
        assert!(parsed.flags.is_empty());
    }

    #[test]
    fn empty_text_is_zero_matches() {
        let parsed = ResultParser::default().parse("");
        assert!(!parsed.has_flags);
        assert!(parsed.flags.is_empty());
    }

    #[test]
    fn matching_is_case_insensitive_and_reports_each_keyword_once() {
        let parser = ResultParser::new(["Deadline", "deadline", "URGENT"]);
        assert_eq!(parser.keywords(), &["deadline", "urgent"]);

        let parsed = parser.parse("DEADLINE today. Deadline tomorrow. Urgent!");
        assert_eq!(parsed.flags, vec!["deadline", "urgent"]);
    }

    #[test]
    fn serializes_with_rfc3339_timestamp() {
        let parsed = ResultParser::default().parse("critical");
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["has_flags"], true);
        assert_eq!(json["flags"][0], "critical");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }
}
