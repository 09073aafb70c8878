//! Parsing of LLM replies.
//!
//! Pure text processing, no I/O:
//!
//! | Function | Input | Output |
//! |----------|-------|--------|
//! | [`parse_fragments`] | persona statement | raw issue / solution lines |
//! | [`parse_judge_response`] | judge reply (JSON) | [`JudgeAssessment`] |
//! | [`parse_extraction_response`] | extractor reply (JSON) | [`ExtractionBatch`] |

use crate::findings::category::IssueCategory;
use crate::findings::merge::ExtractionBatch;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors raised when a structured reply cannot be understood
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("No JSON object found in response")]
    NoJson,

    #[error("Malformed JSON: {0}")]
    Malformed(String),
}

/// Issue and solution lines listed at the end of a statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFragments {
    pub issues: Vec<String>,
    pub solutions: Vec<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Issues,
    Solutions,
}

fn section_for(label: &str) -> Option<Section> {
    let label = label.trim().trim_matches('*').trim().to_lowercase();
    match label.as_str() {
        "issues" | "identified issues" | "key issues" | "problems" | "課題" => {
            Some(Section::Issues)
        }
        "solutions" | "proposed solutions" | "recommendations" | "solution proposals"
        | "解決策" => Some(Section::Solutions),
        _ => None,
    }
}

/// Recognize `ISSUES:` style headers (markdown headings and bold allowed).
///
/// Returns the section and any text that followed the colon.
fn section_header(line: &str) -> Option<(Section, &str)> {
    let stripped = line.trim().trim_start_matches(['#', ' ']);
    if let Some(pos) = stripped.find([':', '：']) {
        let (label, rest) = stripped.split_at(pos);
        let rest = rest
            .trim_start_matches([':', '：'])
            .trim()
            .trim_start_matches('*')
            .trim();
        return section_for(label).map(|s| (s, rest));
    }
    section_for(stripped).map(|s| (s, ""))
}

/// Strip a list marker ("1.", "2)", "-", "*", "•") from an item line
fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    for marker in ["- ", "* ", "• ", "・"] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Some(rest.trim()).filter(|s| !s.is_empty());
        }
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &trimmed[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return Some(rest.trim()).filter(|s| !s.is_empty());
        }
    }
    None
}

/// Extract the raw issue and solution lists from a persona statement.
///
/// Personas are asked to end their statement with `ISSUES:` and
/// `SOLUTIONS:` sections of numbered or bulleted items. Indented lines
/// continue the previous item; any other unmarked line closes the section.
pub fn parse_fragments(text: &str) -> RawFragments {
    let mut fragments = RawFragments::default();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        if let Some((section, rest)) = section_header(line) {
            current = Some(section);
            if !rest.is_empty() {
                push_fragment(&mut fragments, section, rest.to_string());
            }
            continue;
        }
        let Some(section) = current else {
            continue;
        };
        if let Some(item) = list_item(line) {
            push_fragment(&mut fragments, section, item.to_string());
        } else if line.trim().is_empty() {
            continue;
        } else if line.starts_with([' ', '\t']) {
            let target = match section {
                Section::Issues => &mut fragments.issues,
                Section::Solutions => &mut fragments.solutions,
            };
            if let Some(last) = target.last_mut() {
                last.push(' ');
                last.push_str(line.trim());
            }
        } else {
            current = None;
        }
    }

    fragments
}

fn push_fragment(fragments: &mut RawFragments, section: Section, item: String) {
    match section {
        Section::Issues => fragments.issues.push(item),
        Section::Solutions => fragments.solutions.push(item),
    }
}

/// Locate the outermost JSON object in a reply (fenced or bare)
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Judge reply, validated against the closed category set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JudgeAssessment {
    pub overall_score: f64,
    pub category_coverage: BTreeMap<IssueCategory, f64>,
    pub missing_areas: Vec<String>,
    pub recommended_personas: Vec<String>,
    pub reasoning: String,
}

#[derive(Deserialize)]
struct RawJudgeReply {
    #[serde(alias = "sufficiency_score", alias = "score")]
    overall_score: f64,
    #[serde(default)]
    category_coverage: BTreeMap<String, f64>,
    #[serde(default)]
    missing_areas: Vec<String>,
    #[serde(default)]
    recommended_personas: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

/// Parse the judge's JSON reply.
///
/// Coverage entries for unknown categories are discarded. Any continue/stop
/// flag in the reply is ignored; that decision belongs to the policy.
pub fn parse_judge_response(text: &str) -> Result<JudgeAssessment, ParseError> {
    let json = extract_json_object(text).ok_or(ParseError::NoJson)?;
    let raw: RawJudgeReply =
        serde_json::from_str(json).map_err(|e| ParseError::Malformed(e.to_string()))?;

    let mut category_coverage = BTreeMap::new();
    for (label, value) in raw.category_coverage {
        match IssueCategory::parse(&label) {
            Some(category) => {
                category_coverage.insert(category, value);
            }
            None => debug!(category = %label, "Ignoring coverage for unknown category"),
        }
    }

    Ok(JudgeAssessment {
        overall_score: raw.overall_score,
        category_coverage,
        missing_areas: raw.missing_areas,
        recommended_personas: raw.recommended_personas,
        reasoning: raw.reasoning,
    })
}

/// Parse the extractor's JSON reply
pub fn parse_extraction_response(text: &str) -> Result<ExtractionBatch, ParseError> {
    let json = extract_json_object(text).ok_or(ParseError::NoJson)?;
    serde_json::from_str(json).map_err(|e| ParseError::Malformed(e.to_string()))
}
