//! ============================================================================
//! Lexical Filter - Ban-list matching on normalized text
//! ============================================================================
//! Input is lowercased and de-obfuscated (accents, leetspeak digits,
//! lookalike symbols) before being matched against the ban-list, either by
//! plain substring containment or by whole-word pattern.
//! ============================================================================

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};

use super::{SecurityCategory, SecurityCheck};
use crate::error::{QaError, Result};

/// Compiled size allowed for the whole-word ban-list pattern
const PATTERN_SIZE_LIMIT: usize = 256 * (1 << 20);

/// `(normalized_text, banned_words) -> triggered`
pub type WordMatcher = fn(&str, &[String]) -> bool;

/// How the ban-list is matched against the text
#[derive(Clone, Copy)]
pub enum FilterMethod {
    /// Substring containment
    Simple,
    /// Whole-word match
    Regex,
    Custom(WordMatcher),
}

impl std::fmt::Debug for FilterMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMethod::Simple => f.write_str("Simple"),
            FilterMethod::Regex => f.write_str("Regex"),
            FilterMethod::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl std::str::FromStr for FilterMethod {
    type Err = QaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "SIMPLE" => Ok(FilterMethod::Simple),
            "REGEX" => Ok(FilterMethod::Regex),
            _ => Err(QaError::config(format!(
                "Unsupported filter method '{}'. Only SIMPLE, REGEX or a custom matcher are available",
                s
            ))),
        }
    }
}

fn substitute(c: char) -> Option<char> {
    let mapped = match c {
        'á' | 'à' | 'â' | 'ä' | '4' | '@' => 'a',
        'é' | 'è' | 'ê' | 'ë' | '3' => 'e',
        'í' | 'ì' | 'î' | 'ï' | '1' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | '0' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        '5' | '$' => 's',
        _ => return None,
    };
    Some(mapped)
}

/// Lowercase and map accented, leetspeak and lookalike characters to letters
pub fn clean_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| substitute(c).unwrap_or(c))
        .collect()
}

/// True when any banned word appears anywhere in the text
pub fn basic_word_occurrence(text: &str, banned_words: &[String]) -> bool {
    banned_words
        .iter()
        .any(|w| !w.is_empty() && text.contains(w.as_str()))
}

/// True when any banned word appears as a whole word.
/// Fails when the ban-list cannot be compiled into a pattern.
pub fn regex_word_occurrence(text: &str, banned_words: &[String]) -> Result<bool> {
    Ok(word_boundary_pattern(banned_words, PATTERN_SIZE_LIMIT)?
        .map(|re| re.is_match(text))
        .unwrap_or(false))
}

/// `None` for a list with no usable terms
fn word_boundary_pattern(banned_words: &[String], size_limit: usize) -> Result<Option<Regex>> {
    let alternation = banned_words
        .iter()
        .filter(|w| !w.is_empty())
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");

    if alternation.is_empty() {
        return Ok(None);
    }

    RegexBuilder::new(&format!(r"(?:^|\W)(?:{})(?:\W|$)", alternation))
        .size_limit(size_limit)
        .dfa_size_limit(size_limit)
        .build()
        .map(Some)
        .map_err(|e| {
            QaError::config(format!(
                "Failed to compile ban-list pattern ({} terms): {}",
                banned_words.len(),
                e
            ))
        })
}

/// Read a one-term-per-line ban-list. A missing file yields an empty list.
pub fn load_ban_list(path: &Path) -> Result<Vec<String>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "Ban-list {} not found; lexical filter runs with an empty default list",
                path.display()
            );
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let words: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    info!("Loaded {} banned terms from {}", words.len(), path.display());
    Ok(words)
}

/// First check of the gate
#[derive(Debug)]
pub struct LexicalFilter {
    method: FilterMethod,
    banned_words: Vec<String>,
    pattern: Option<Regex>,
}

impl LexicalFilter {
    /// Fails with a configuration error when the ban-list cannot be compiled
    pub fn new(method: FilterMethod, banned_words: Vec<String>) -> Result<Self> {
        Self::with_size_limit(method, banned_words, PATTERN_SIZE_LIMIT)
    }

    fn with_size_limit(method: FilterMethod, banned_words: Vec<String>, size_limit: usize) -> Result<Self> {
        // Terms share the normalized alphabet of the text they are matched against
        let mut seen = HashSet::new();
        let banned_words: Vec<String> = banned_words
            .iter()
            .map(|w| clean_text(w.trim()))
            .filter(|w| !w.is_empty() && seen.insert(w.clone()))
            .collect();

        let pattern = match method {
            FilterMethod::Regex => word_boundary_pattern(&banned_words, size_limit)?,
            _ => None,
        };

        debug!("Lexical filter: {:?} with {} terms", method, banned_words.len());

        Ok(Self {
            method,
            banned_words,
            pattern,
        })
    }

    /// Build from a ban-list file
    pub fn from_file(method: FilterMethod, path: &Path) -> Result<Self> {
        Self::new(method, load_ban_list(path)?)
    }

    pub fn method(&self) -> FilterMethod {
        self.method
    }

    pub fn banned_words(&self) -> &[String] {
        &self.banned_words
    }

    pub fn is_banned(&self, text: &str) -> bool {
        let cleaned = clean_text(text);
        match self.method {
            FilterMethod::Simple => basic_word_occurrence(&cleaned, &self.banned_words),
            FilterMethod::Regex => self
                .pattern
                .as_ref()
                .map(|re| re.is_match(&cleaned))
                .unwrap_or(false),
            FilterMethod::Custom(matcher) => matcher(&cleaned, &self.banned_words),
        }
    }
}

#[async_trait]
impl SecurityCheck for LexicalFilter {
    fn category(&self) -> SecurityCategory {
        SecurityCategory::InappropriateContent
    }

    async fn is_triggered(&self, text: &str) -> Result<bool> {
        Ok(self.is_banned(text))
    }
}
