//! Structural health pre-check for requirement text.
//!
//! A cheap screen run once before any evaluator call. Every rule is
//! advisory: a failing report is logged and processing continues.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Word count above which a requirement is critically long.
pub const MAX_WORDS: usize = 100;
/// Word count above which trimming is suggested.
pub const SOFT_MAX_WORDS: usize = 50;
/// Word count below which a requirement is too short to assess.
pub const MIN_WORDS: usize = 3;
/// Sentence count above which the text is likely not atomic.
pub const MAX_SENTENCES: usize = 2;
/// Conjunction count above which the text is likely not atomic.
pub const MAX_CONJUNCTIONS: usize = 2;

/// Modal verbs accepted as the binding verb of a requirement.
const MODAL_VERBS: &[&str] = &[
    "must", "shall", "should", "may", "can", "will", // English
    "muss", "müssen", "soll", "sollen", "sollte", "sollten", "kann", "können", "darf", "dürfen",
    "wird", "werden", // German
];

const CONJUNCTIONS: &[&str] = &[" and ", " und "];

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthSeverity {
    Warning,
    Critical,
}

/// Which structural rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthIssueKind {
    TooLong,
    Lengthy,
    TooShort,
    MissingModalVerb,
    HeadingOrComment,
    CompoundStatement,
}

/// One advisory finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthIssue {
    #[serde(rename = "type")]
    pub kind: HealthIssueKind,
    pub severity: HealthSeverity,
    pub message: String,
    pub action: String,
}

impl HealthIssue {
    fn new(
        kind: HealthIssueKind,
        severity: HealthSeverity,
        message: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            action: action.into(),
        }
    }
}

/// Outcome of the health pre-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// `true` when no critical issue fired.
    pub passed: bool,
    pub word_count: usize,
    pub issues: Vec<HealthIssue>,
    pub guidance: String,
}

impl HealthReport {
    pub fn has(&self, kind: HealthIssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    pub fn critical_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == HealthSeverity::Critical)
            .count()
    }
}

fn sentence_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.\s+\p{Lu}").expect("static regex is valid"))
}

fn has_modal_verb(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .any(|token| {
            let token = token.to_lowercase();
            MODAL_VERBS.contains(&token.as_str())
        })
}

/// Run every structural rule against `text`.
pub fn check_health(text: &str) -> HealthReport {
    let word_count = text.split_whitespace().count();
    let mut issues = Vec::new();

    if word_count > MAX_WORDS {
        issues.push(HealthIssue::new(
            HealthIssueKind::TooLong,
            HealthSeverity::Critical,
            format!("Requirement has {word_count} words (limit {MAX_WORDS})"),
            format!("Reduce to <{SOFT_MAX_WORDS} words, move details to acceptance criteria"),
        ));
    } else if word_count > SOFT_MAX_WORDS {
        issues.push(HealthIssue::new(
            HealthIssueKind::Lengthy,
            HealthSeverity::Warning,
            format!("Requirement has {word_count} words"),
            "Consider trimming or splitting the requirement",
        ));
    }

    if word_count < MIN_WORDS {
        issues.push(HealthIssue::new(
            HealthIssueKind::TooShort,
            HealthSeverity::Critical,
            format!("Requirement has only {word_count} word(s)"),
            "Too short, add detail",
        ));
    }

    if !has_modal_verb(text) {
        issues.push(HealthIssue::new(
            HealthIssueKind::MissingModalVerb,
            HealthSeverity::Warning,
            "No modal verb (must, shall, should, may, can, will) found",
            "State the obligation with a modal verb",
        ));
    }

    let trimmed = text.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with("//") {
        issues.push(HealthIssue::new(
            HealthIssueKind::HeadingOrComment,
            HealthSeverity::Critical,
            "Text starts with a heading or comment marker",
            "Convert to a proper requirement statement",
        ));
    }

    let sentences = sentence_break().find_iter(text).count() + 1;
    let lowered = text.to_lowercase();
    let conjunctions: usize = CONJUNCTIONS
        .iter()
        .map(|c| lowered.matches(c).count())
        .sum();
    if sentences > MAX_SENTENCES || conjunctions > MAX_CONJUNCTIONS {
        issues.push(HealthIssue::new(
            HealthIssueKind::CompoundStatement,
            HealthSeverity::Warning,
            format!("{sentences} sentence(s), {conjunctions} conjunction(s) detected"),
            "Requirement may not be atomic; consider splitting it",
        ));
    }

    let passed = !issues.iter().any(|i| i.severity == HealthSeverity::Critical);
    let guidance = guidance_for(&issues);

    HealthReport {
        passed,
        word_count,
        issues,
        guidance,
    }
}

fn guidance_for(issues: &[HealthIssue]) -> String {
    if issues.is_empty() {
        return "Requirement is structurally sound.".to_string();
    }
    let mut ordered: Vec<&HealthIssue> = issues.iter().collect();
    ordered.sort_by(|a, b| b.severity.cmp(&a.severity));
    ordered
        .iter()
        .map(|i| i.action.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_german_requirement_with_modal_passes() {
        let report = check_health("Die App muss schnell sein");
        assert!(report.passed);
        assert_eq!(report.word_count, 5);
        assert!(!report.has(HealthIssueKind::MissingModalVerb));
        assert_eq!(report.guidance, "Requirement is structurally sound.");
    }

    #[test]
    fn too_short_is_critical() {
        let report = check_health("Login");
        assert!(!report.passed);
        assert!(report.has(HealthIssueKind::TooShort));
        assert!(report.has(HealthIssueKind::MissingModalVerb));
    }

    #[test]
    fn word_count_bands() {
        let lengthy = format!("The system must {}", "respond ".repeat(60));
        let report = check_health(&lengthy);
        assert!(report.has(HealthIssueKind::Lengthy));
        assert!(!report.has(HealthIssueKind::TooLong));
        assert!(report.passed);

        let too_long = format!("The system must {}", "respond ".repeat(120));
        let report = check_health(&too_long);
        assert!(report.has(HealthIssueKind::TooLong));
        assert!(!report.has(HealthIssueKind::Lengthy));
        assert!(!report.passed);
    }

    fn words(n: usize) -> String {
        let mut tokens = vec!["must"];
        tokens.resize(n, "respond");
        tokens.join(" ")
    }

    #[test]
    fn word_count_band_edges() {
        use HealthIssueKind::{Lengthy, TooLong, TooShort};

        let cases: [(usize, Option<HealthIssueKind>); 6] = [
            (2, Some(TooShort)),
            (3, None),
            (50, None),
            (51, Some(Lengthy)),
            (100, Some(Lengthy)),
            (101, Some(TooLong)),
        ];
        for (n, expected) in cases {
            let report = check_health(&words(n));
            assert_eq!(report.word_count, n);
            let fired: Vec<_> = [TooShort, Lengthy, TooLong]
                .into_iter()
                .filter(|kind| report.has(*kind))
                .collect();
            assert_eq!(fired, expected.into_iter().collect::<Vec<_>>(), "{n} words");
        }
    }

    #[test]
    fn modal_must_be_a_whole_token() {
        // "canvas" and "mayor" contain modal prefixes but are not modals.
        let report = check_health("The canvas shows the mayor");
        assert!(report.has(HealthIssueKind::MissingModalVerb));

        let report = check_health("Shall the operator export reports");
        assert!(!report.has(HealthIssueKind::MissingModalVerb));
    }

    #[test]
    fn heading_and_comment_markers_are_critical() {
        for text in ["# Login requirements must", "// The user must log in"] {
            let report = check_health(text);
            assert!(report.has(HealthIssueKind::HeadingOrComment), "{text}");
            assert!(!report.passed);
        }
    }

    #[test]
    fn compound_hints() {
        let sentences = "The user must log in. The user must log out. Admins must audit.";
        assert!(check_health(sentences).has(HealthIssueKind::CompoundStatement));

        let two = "The user must log in. The session must expire.";
        assert!(!check_health(two).has(HealthIssueKind::CompoundStatement));

        let conjunctions = "The user must create and edit and delete and share documents";
        assert!(check_health(conjunctions).has(HealthIssueKind::CompoundStatement));
    }

    #[test]
    fn guidance_lists_critical_actions_first() {
        let report = check_health("# Notes");
        let first = report.guidance.split("; ").next().unwrap();
        assert!(
            first == "Too short, add detail" || first == "Convert to a proper requirement statement"
        );
        assert!(report.guidance.contains("modal verb"));
    }
}
