//! Heuristic extraction of structure from a free-form model completion.
//!
//! Everything here is a pure function of the completion text. The rules:
//!
//! - **Sections** are delimited by bold headings such as `**Analysis**`;
//!   a section runs until the next known heading.
//! - **Equations** come from LaTeX display math (`$$…$$`), LaTeX inline
//!   math (`$…$`), plain `X = Y` assignments found outside math, and the
//!   lines of the `Key Equations` section.
//! - **Concepts** come from the lines of the `Concepts` section plus every
//!   entry of [`patterns::KNOWN_CONCEPTS`] that appears in the text
//!   (case-insensitive).
//!
//! Outputs are de-duplicated in first-seen order and never contain empty
//! strings.

pub mod patterns;

use serde::{Deserialize, Serialize};

use patterns::{
    strip_list_marker, DISPLAY_MATH, INLINE_MATH, KNOWN_CONCEPTS, PLAIN_EQUATION,
    TRAILING_ORDINAL,
};

/// Section headings the answer prompt asks the model to use.
pub const SECTION_HEADINGS: &[&str] = &[
    "Analysis",
    "Solution",
    "Explanation",
    "Key Equations",
    "Concepts",
];

/// Equations and concepts mined from a completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub equations: Vec<String>,
    pub concepts: Vec<String>,
}

/// Extract equations and concepts from completion text.
pub fn extract(text: &str) -> Extraction {
    Extraction {
        equations: extract_equations(text),
        concepts: extract_concepts(text),
    }
}

/// A model answer with its heuristically extracted structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// The completion text, untouched
    pub response: String,

    /// Analysis, Solution and Explanation sections joined together
    pub reasoning: String,

    pub equations: Vec<String>,
    pub concepts: Vec<String>,
}

impl Answer {
    /// Build an answer from raw completion text.
    pub fn from_completion(text: impl Into<String>) -> Self {
        let response = text.into();
        let Extraction {
            equations,
            concepts,
        } = extract(&response);

        let reasoning = ["Analysis", "Solution", "Explanation"]
            .iter()
            .filter_map(|name| section(&response, name))
            .filter(|body| !body.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        Self {
            response,
            reasoning,
            equations,
            concepts,
        }
    }

    /// Whether anything was extracted beyond the raw text.
    pub fn has_findings(&self) -> bool {
        !self.equations.is_empty() || !self.concepts.is_empty()
    }

    /// Reasoning if any section was found, otherwise the whole response.
    pub fn summary(&self) -> &str {
        if self.reasoning.is_empty() {
            &self.response
        } else {
            &self.reasoning
        }
    }
}

/// Body of the section introduced by `**name**`, if present.
///
/// The body ends at the next known heading (or the end of the text). A
/// leading `:` and a dangling list ordinal at the end are dropped.
pub fn section<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!("**{}**", name);
    let start = content.find(&marker)? + marker.len();
    let rest = &content[start..];

    let end = SECTION_HEADINGS
        .iter()
        .filter(|other| **other != name)
        .filter_map(|other| rest.find(&format!("**{}**", other)))
        .min()
        .unwrap_or(rest.len());

    let body = rest[..end].trim_start_matches(':').trim();
    let body = match TRAILING_ORDINAL.find(body) {
        Some(m) => body[..m.start()].trim_end(),
        None => body,
    };
    Some(body)
}

/// Non-empty list items of a section, markers stripped.
fn section_items(content: &str, name: &str) -> Vec<String> {
    section(content, name)
        .map(|body| {
            body.lines()
                .map(|line| strip_list_marker(line).trim().to_string())
                .filter(|line| !line.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn push_unique(items: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.trim();
    if !candidate.is_empty() && !items.iter().any(|existing| existing == candidate) {
        items.push(candidate.to_string());
    }
}

/// Equations found in the text, in first-seen order.
pub fn extract_equations(content: &str) -> Vec<String> {
    let mut equations = Vec::new();

    for caps in DISPLAY_MATH.captures_iter(content) {
        push_unique(&mut equations, &caps[1]);
    }

    let without_display = DISPLAY_MATH.replace_all(content, " ");
    for caps in INLINE_MATH.captures_iter(&without_display) {
        push_unique(&mut equations, &caps[1]);
    }

    let without_math = INLINE_MATH.replace_all(&without_display, " ");
    for m in PLAIN_EQUATION.find_iter(&without_math) {
        let equation = m
            .as_str()
            .trim_end_matches(|c: char| c == '.' || c.is_whitespace());
        push_unique(&mut equations, equation);
    }

    for line in section_items(content, "Key Equations") {
        push_unique(&mut equations, line.trim_matches('$'));
    }

    equations
}

/// Concepts found in the text, in first-seen order.
pub fn extract_concepts(content: &str) -> Vec<String> {
    let mut concepts = Vec::new();

    for line in section_items(content, "Concepts") {
        push_unique(&mut concepts, &line);
    }

    let lowered = content.to_lowercase();
    for concept in KNOWN_CONCEPTS {
        if lowered.contains(&concept.to_lowercase()) {
            push_unique(&mut concepts, concept);
        }
    }

    concepts
}

/// Follow-up questions from a completion: lines starting with `- `.
pub fn parse_follow_ups(content: &str, limit: usize) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("- "))
        .map(str::trim)
        .filter(|question| !question.is_empty())
        .take(limit)
        .map(str::to_string)
        .collect()
}
