//! Detection patterns used when mining a completion for equations.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// LaTeX display math: `$$ ... $$`
    pub static ref DISPLAY_MATH: Regex = Regex::new(r"\$\$([^$]+)\$\$").unwrap();

    /// LaTeX inline math: `$ ... $` on a single line
    pub static ref INLINE_MATH: Regex = Regex::new(r"\$([^$\n]+)\$").unwrap();

    /// Plain assignment such as `F = ma` or `KE = 1/2 m v^2`.
    /// The left side is a short symbol, the right side runs to the next
    /// comma, semicolon, newline or dollar sign.
    pub static ref PLAIN_EQUATION: Regex = Regex::new(
        r"\b[A-Za-z][A-Za-z0-9_]{0,3}\s*=\s*[^,;\n$=][^,;\n$]*"
    ).unwrap();

    /// Leading list marker: `-`, `*`, `•`, `1.` or `1)`
    pub static ref LIST_MARKER: Regex = Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s*").unwrap();

    /// Dangling ordinal left at the end of a section, e.g. the `2.` that
    /// precedes the next `**Solution**` heading.
    pub static ref TRAILING_ORDINAL: Regex = Regex::new(r"\s*\n\s*\d+[.)]\s*$").unwrap();
}

/// Physics concepts recognized anywhere in a completion.
pub const KNOWN_CONCEPTS: &[&str] = &[
    "Newton's Laws",
    "Conservation of Energy",
    "Conservation of Momentum",
    "Thermodynamics",
    "Quantum Mechanics",
    "Electromagnetism",
    "Relativity",
    "Wave Motion",
    "Oscillations",
    "Fluid Dynamics",
    "Optics",
    "Gravitation",
    "Kinematics",
    "Dynamics",
    "Work and Energy",
    "Heat Transfer",
    "Entropy",
];

/// Strip a leading list marker from a line.
pub fn strip_list_marker(line: &str) -> &str {
    match LIST_MARKER.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}
