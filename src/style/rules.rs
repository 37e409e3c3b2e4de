//! Regex rule styler loaded from a JSON5 rules file.
//!
//! ```json5
//! {
//!   rules: [
//!     { pattern: "ERROR", foreground: "red", bold: true },
//!     { pattern: "\\d+ms", foreground: "#e5e510", whole_line: false },
//!   ],
//! }
//! ```

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use super::{LineStyleEvent, LineStyler, Rgb, StyleRange};

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rules: {0}")]
    Parse(#[from] json5::Error),
    #[error("invalid pattern {pattern:?} in rule {index}: {source}")]
    Pattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSpec {
    pattern: String,
    foreground: Option<Rgb>,
    background: Option<Rgb>,
    #[serde(default)]
    bold: bool,
    #[serde(default)]
    underline: bool,
    #[serde(default)]
    strikeout: bool,
    #[serde(default)]
    hidden: bool,
    #[serde(default = "default_whole_line")]
    whole_line: bool,
}

const fn default_whole_line() -> bool {
    true
}

/// A compiled rule: decorate the whole line or each match of `pattern`.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    template: StyleRange,
    whole_line: bool,
}

impl Rule {
    /// Rule decorating every line that matches `pattern`.
    ///
    /// # Errors
    /// Returns an error if `pattern` is not a valid regex.
    pub fn whole_line(pattern: &str, template: StyleRange) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            template,
            whole_line: true,
        })
    }

    /// Rule decorating only the matched text.
    ///
    /// # Errors
    /// Returns an error if `pattern` is not a valid regex.
    pub fn matches_only(pattern: &str, template: StyleRange) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            template,
            whole_line: false,
        })
    }

    fn apply(&self, line: &str, out: &mut Vec<StyleRange>) {
        if self.whole_line {
            if self.pattern.is_match(line) {
                out.push(self.range(0, line.chars().count()));
            }
            return;
        }
        for m in self.pattern.find_iter(line) {
            if m.is_empty() {
                continue;
            }
            let start = line[..m.start()].chars().count();
            let length = m.as_str().chars().count();
            out.push(self.range(start, length));
        }
    }

    fn range(&self, start: usize, length: usize) -> StyleRange {
        StyleRange {
            start,
            length,
            ..self.template.clone()
        }
    }
}

/// Line styler applying an ordered list of regex rules.
///
/// Later rules win when two rules decorate the same start offset.
#[derive(Debug, Clone, Default)]
pub struct RuleStyler {
    rules: Vec<Rule>,
}

impl RuleStyler {
    pub const fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Rules suited to typical log output: errors, warnings and info tags.
    pub fn log_levels() -> Self {
        let rules = [
            (r"\b(ERROR|FATAL|PANIC)\b", StyleRange::default().fg(Rgb::RED).bold()),
            (r"\b(WARN|WARNING)\b", StyleRange::default().fg(Rgb::YELLOW)),
            (r"\bDEBUG\b", StyleRange::default().fg(Rgb::GRAY)),
        ]
        .into_iter()
        .filter_map(|(pattern, template)| Rule::whole_line(pattern, template).ok())
        .collect();
        Self { rules }
    }

    /// Parse a JSON5 rules document.
    ///
    /// # Errors
    /// Returns an error if the document is malformed or a pattern does not compile.
    pub fn from_json5(source: &str) -> Result<Self, RulesError> {
        let file: RulesFile = json5::from_str(source)?;
        let rules = file
            .rules
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                let pattern = Regex::new(&spec.pattern).map_err(|source| RulesError::Pattern {
                    index,
                    pattern: spec.pattern.clone(),
                    source,
                })?;
                Ok(Rule {
                    pattern,
                    template: StyleRange {
                        foreground: spec.foreground,
                        background: spec.background,
                        bold: spec.bold,
                        underline: spec.underline,
                        strikeout: spec.strikeout,
                        hidden: spec.hidden,
                        ..StyleRange::default()
                    },
                    whole_line: spec.whole_line,
                })
            })
            .collect::<Result<Vec<_>, RulesError>>()?;
        Ok(Self { rules })
    }

    /// Load rules from a JSON5 file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let source = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json5(&source)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl LineStyler for RuleStyler {
    fn style_line(&self, event: &LineStyleEvent<'_>) -> Vec<StyleRange> {
        let mut out = Vec::new();
        for rule in &self.rules {
            rule.apply(event.line_text, &mut out);
        }
        out
    }
}
