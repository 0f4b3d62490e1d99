//! Domain name generators.
//!
//! Generators feed a [`GeneratorSource`] with base names. Three kinds exist:
//! built-in sequences (`three-letter`, `three-char`), patterns
//! (`pattern:<p>`), and generator files written in TOML. All of them are
//! lazy; a `\w\w\w\w` pattern is never materialized in memory.
//!
//! # Pattern Syntax
//!
//! - `\w` — lowercase letter (a-z) or hyphen
//! - `\d` — digit (0-9)
//! - `?`  — any of the above (letter, digit, or hyphen)
//! - `\\` — literal backslash
//! - Any other character — literal
//!
//! Expansions that are not valid base names (e.g. a leading hyphen) are
//! dropped silently.
//!
//! # Generator files
//!
//! ```toml
//! names = ["cloud", "forge"]
//! patterns = ["app\\d\\d"]
//! prefixes = ["get"]
//! suffixes = ["ly"]
//! include_bare = true
//! ```
//!
//! # Examples
//!
//! ```
//! use domain_seeker_lib::generate::{apply_affixes, expand_pattern};
//!
//! let names: Vec<String> = expand_pattern("app\\d\\d").unwrap().collect();
//! assert_eq!(names.len(), 100); // app00..app99
//!
//! let affixed = apply_affixes("cloud", &["get".to_string()], &["ly".to_string()], true);
//! assert_eq!(affixed, vec!["getcloudly", "getcloud", "cloudly", "cloud"]);
//! ```

use crate::error::DomainSeekerError;
use crate::source::{GeneratorFault, GeneratorItem, GeneratorIter, GeneratorSource};
use crate::utils::is_valid_base_name;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Names accepted by [`builtin_generator`] besides `pattern:<p>`.
pub const BUILTIN_GENERATORS: &[&str] = &["three-letter", "three-char"];

/// A single slot in a parsed pattern.
#[derive(Debug, Clone)]
enum Slot {
    Literal(char),
    Charset(Vec<char>),
}

fn letter_chars() -> Vec<char> {
    ('a'..='z').collect()
}

/// Characters for `\w`: a-z plus hyphen.
fn word_chars() -> Vec<char> {
    let mut chars = letter_chars();
    chars.push('-');
    chars
}

/// Characters for `\d`: 0-9.
fn digit_chars() -> Vec<char> {
    ('0'..='9').collect()
}

/// Characters for `?`: union of `\w` and `\d`.
fn any_chars() -> Vec<char> {
    let mut chars = word_chars();
    chars.extend(digit_chars());
    chars
}

fn alnum_chars() -> Vec<char> {
    let mut chars = letter_chars();
    chars.extend(digit_chars());
    chars
}

/// Parse a pattern string into a sequence of slots.
fn parse_pattern(pattern: &str) -> Result<Vec<Slot>, DomainSeekerError> {
    if pattern.is_empty() {
        return Err(DomainSeekerError::invalid_pattern(
            pattern,
            "pattern cannot be empty",
        ));
    }

    let mut slots = Vec::new();
    let mut chars = pattern.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('w') => slots.push(Slot::Charset(word_chars())),
                Some('d') => slots.push(Slot::Charset(digit_chars())),
                Some('\\') => slots.push(Slot::Literal('\\')),
                Some(other) => {
                    return Err(DomainSeekerError::invalid_pattern(
                        pattern,
                        format!("unknown escape sequence '\\{}'", other),
                    ));
                }
                None => {
                    return Err(DomainSeekerError::invalid_pattern(
                        pattern,
                        "trailing backslash",
                    ));
                }
            },
            '?' => slots.push(Slot::Charset(any_chars())),
            _ => slots.push(Slot::Literal(ch.to_ascii_lowercase())),
        }
    }

    Ok(slots)
}

/// Raw number of combinations a pattern describes, before filtering.
pub fn estimate_pattern_count(pattern: &str) -> Result<usize, DomainSeekerError> {
    let slots = parse_pattern(pattern)?;
    Ok(slots.iter().fold(1usize, |count, slot| {
        let size = match slot {
            Slot::Literal(_) => 1,
            Slot::Charset(chars) => chars.len(),
        };
        count.saturating_mul(size)
    }))
}

/// Lazy odometer over a sequence of character sets.
///
/// The rightmost position turns fastest, so `\d\d` yields `00, 01, ... 99`.
/// Only valid base names are yielded.
#[derive(Debug, Clone)]
pub struct PatternIter {
    options: Vec<Vec<char>>,
    counters: Vec<usize>,
    exhausted: bool,
}

impl PatternIter {
    fn from_charsets(options: Vec<Vec<char>>) -> Self {
        let exhausted = options.is_empty() || options.iter().any(|o| o.is_empty());
        Self {
            counters: vec![0; options.len()],
            options,
            exhausted,
        }
    }

    fn from_slots(slots: Vec<Slot>) -> Self {
        Self::from_charsets(
            slots
                .into_iter()
                .map(|slot| match slot {
                    Slot::Literal(c) => vec![c],
                    Slot::Charset(chars) => chars,
                })
                .collect(),
        )
    }

    fn current(&self) -> String {
        self.counters
            .iter()
            .enumerate()
            .map(|(i, &c)| self.options[i][c])
            .collect()
    }

    // Returns false once every combination has been produced.
    fn advance(&mut self) -> bool {
        for i in (0..self.counters.len()).rev() {
            self.counters[i] += 1;
            if self.counters[i] < self.options[i].len() {
                return true;
            }
            self.counters[i] = 0;
        }
        false
    }
}

impl Iterator for PatternIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.exhausted {
            let name = self.current();
            self.exhausted = !self.advance();
            if is_valid_base_name(&name) {
                return Some(name);
            }
        }
        None
    }
}

/// Expand a pattern lazily into matching base names.
pub fn expand_pattern(pattern: &str) -> Result<PatternIter, DomainSeekerError> {
    Ok(PatternIter::from_slots(parse_pattern(pattern)?))
}

/// Combine one base name with prefixes and suffixes.
///
/// Order: every prefix+name+suffix, then prefix+name, then name+suffix,
/// then the bare name when `include_bare` is set. Invalid combinations are
/// dropped.
pub fn apply_affixes(
    name: &str,
    prefixes: &[String],
    suffixes: &[String],
    include_bare: bool,
) -> Vec<String> {
    let mut variants = Vec::new();

    for prefix in prefixes {
        for suffix in suffixes {
            variants.push(format!("{}{}{}", prefix, name, suffix));
        }
    }
    for prefix in prefixes {
        variants.push(format!("{}{}", prefix, name));
    }
    for suffix in suffixes {
        variants.push(format!("{}{}", name, suffix));
    }
    if include_bare {
        variants.push(name.to_string());
    }

    variants.retain(|v| is_valid_base_name(v));
    variants
}

/// A generator file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorSpec {
    /// Literal base names; any non-string element makes the generator malformed
    pub names: Vec<toml::Value>,

    /// Patterns expanded after the literal names
    pub patterns: Vec<String>,

    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,

    /// Whether to keep each base name without affixes
    pub include_bare: bool,
}

impl Default for GeneratorSpec {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            patterns: Vec::new(),
            prefixes: Vec::new(),
            suffixes: Vec::new(),
            include_bare: true,
        }
    }
}

impl GeneratorSpec {
    pub fn from_toml_str(content: &str) -> Result<Self, DomainSeekerError> {
        toml::from_str(content).map_err(|e| {
            DomainSeekerError::config(format!("malformed generator file: {}", e))
        })
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, DomainSeekerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainSeekerError::config(format!(
                "cannot read generator file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn has_affixes(&self) -> bool {
        !self.prefixes.is_empty() || !self.suffixes.is_empty()
    }

    /// Build the lazy item sequence: names first, then each pattern.
    ///
    /// Patterns are parsed up front so a bad one fails before anything is
    /// produced.
    pub fn into_items(self) -> Result<GeneratorIter, DomainSeekerError> {
        let patterns = self
            .patterns
            .iter()
            .map(|p| expand_pattern(p))
            .collect::<Result<Vec<_>, _>>()?;

        let affixes = Affixes {
            prefixes: self.prefixes,
            suffixes: self.suffixes,
            include_bare: self.include_bare,
        };
        let for_patterns = affixes.clone();

        let names = self.names.into_iter().flat_map(move |value| -> Vec<GeneratorItem> {
            match value {
                toml::Value::String(name) => affixes.apply(name).into_iter().map(Ok).collect(),
                other => vec![Err(GeneratorFault::NotAString(format!(
                    "{} {}",
                    other.type_str(),
                    other
                )))],
            }
        });

        let expanded = patterns
            .into_iter()
            .flatten()
            .flat_map(move |name| for_patterns.apply(name).into_iter().map(Ok));

        Ok(Box::new(names.chain(expanded)))
    }
}

#[derive(Debug, Clone)]
struct Affixes {
    prefixes: Vec<String>,
    suffixes: Vec<String>,
    include_bare: bool,
}

impl Affixes {
    // Without affixes the name passes through untouched so the source can
    // report it if invalid.
    fn apply(&self, name: String) -> Vec<String> {
        if self.prefixes.is_empty() && self.suffixes.is_empty() {
            vec![name]
        } else {
            apply_affixes(&name, &self.prefixes, &self.suffixes, self.include_bare)
        }
    }
}

/// Build a generator by name: `three-letter`, `three-char` or `pattern:<p>`.
pub fn builtin_generator(name: &str) -> Result<GeneratorSource, DomainSeekerError> {
    let name = name.trim();

    let iter = match name {
        "three-letter" => PatternIter::from_charsets(vec![letter_chars(); 3]),
        "three-char" => PatternIter::from_charsets(vec![alnum_chars(); 3]),
        _ => match name.strip_prefix("pattern:") {
            Some(pattern) => expand_pattern(pattern)?,
            None => {
                return Err(DomainSeekerError::config(format!(
                    "unknown generator '{}' (expected {} or pattern:<p>)",
                    name,
                    BUILTIN_GENERATORS.join(", ")
                )))
            }
        },
    };

    Ok(GeneratorSource::new(name, move || {
        Ok(Box::new(iter.map(Ok)) as GeneratorIter)
    }))
}

/// A generator backed by a TOML generator file.
///
/// The file is read when the scan pulls its first name; read and parse
/// failures surface as configuration errors at that point.
pub fn file_generator<P: Into<PathBuf>>(path: P) -> GeneratorSource {
    let path = path.into();
    let name = format!("file:{}", path.display());

    GeneratorSource::new(name, move || {
        GeneratorSpec::load_file(&path)
            .and_then(GeneratorSpec::into_items)
            .map_err(|e| e.to_string())
    })
}

/// Pick the configured generator, if any. A generator file wins over a name.
pub fn configured_generator(
    name: Option<&str>,
    file: Option<&Path>,
) -> Result<Option<GeneratorSource>, DomainSeekerError> {
    if let Some(path) = file {
        return Ok(Some(file_generator(path)));
    }
    name.map(builtin_generator).transpose()
}
