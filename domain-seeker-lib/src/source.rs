//! Domain sources: where candidate base names come from.
//!
//! A source is a finite, lazily consumed sequence of [`BaseName`]s. Two
//! variants exist: [`FileSource`] reads a newline-delimited list and
//! [`GeneratorSource`] wraps a user-supplied producer. Both apply the same
//! validation and drop duplicates, so the scanner never sees a name twice.

use crate::error::DomainSeekerError;
use crate::types::BaseName;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Split};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Invalid entries logged one by one before the rest are suppressed.
const INVALID_LOG_LIMIT: usize = 5;

/// A finite sequence of base names.
pub trait DomainSource: Send {
    /// Human-readable description for log lines.
    fn describe(&self) -> String;

    /// Next valid, not-yet-seen base name; `Ok(None)` when exhausted.
    ///
    /// An `Err` is always fatal for the run.
    fn next_name(&mut self) -> Result<Option<BaseName>, DomainSeekerError>;

    /// Counters for what has been consumed so far.
    fn stats(&self) -> SourceStats;
}

/// Counters kept by every source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    /// Raw entries read (lines or generator values), excluding blanks and comments
    pub entries: usize,
    /// Names handed to the scanner
    pub valid: usize,
    /// Entries skipped by validation
    pub invalid: usize,
    /// Entries skipped because they were already yielded
    pub duplicates: usize,
}

/// Which source a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    File,
    Generator,
    #[default]
    Auto,
}

impl FromStr for SourceMode {
    type Err = DomainSeekerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "generator" => Ok(Self::Generator),
            "auto" => Ok(Self::Auto),
            other => Err(DomainSeekerError::config(format!(
                "unknown domain source '{}' (expected file, generator or auto)",
                other
            ))),
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Generator => write!(f, "generator"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

// Shared validation, dedup and rate-limited logging of rejects.
#[derive(Debug, Default)]
struct NameFilter {
    seen: HashSet<BaseName>,
    stats: SourceStats,
}

impl NameFilter {
    fn admit(&mut self, raw: &str, origin: &str) -> Option<BaseName> {
        self.stats.entries += 1;

        let name = match BaseName::parse(raw) {
            Ok(name) => name,
            Err(err) => {
                self.stats.invalid += 1;
                if self.stats.invalid <= INVALID_LOG_LIMIT {
                    warn!(origin, "Skipping entry: {}", err);
                } else if self.stats.invalid == INVALID_LOG_LIMIT + 1 {
                    warn!(origin, "Further invalid entries suppressed");
                }
                return None;
            }
        };

        if !self.seen.insert(name.clone()) {
            self.stats.duplicates += 1;
            debug!(origin, name = %name, "Skipping duplicate");
            return None;
        }

        self.stats.valid += 1;
        Some(name)
    }
}

/// Base names read from a newline-delimited file.
///
/// Lines are trimmed; blank lines and lines starting with `#` are ignored.
/// Bytes that are not UTF-8 are replaced, so such lines fail validation
/// instead of ending the scan.
pub struct FileSource {
    path: PathBuf,
    lines: Split<BufReader<File>>,
    line_number: usize,
    filter: NameFilter,
}

impl FileSource {
    /// Open a domain list. A missing or unreadable file is a configuration error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DomainSeekerError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            DomainSeekerError::config(format!(
                "cannot open domain list '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            lines: BufReader::new(file).split(b'\n'),
            path,
            line_number: 0,
            filter: NameFilter::default(),
        })
    }

    /// A fresh source over the same file, starting from the first line.
    pub fn reopen(&self) -> Result<Self, DomainSeekerError> {
        Self::open(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DomainSource for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn next_name(&mut self) -> Result<Option<BaseName>, DomainSeekerError> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            self.line_number += 1;

            let line = line.map_err(|e| {
                DomainSeekerError::source_failed(
                    self.describe(),
                    format!("read error at line {}: {}", self.line_number, e),
                )
            })?;

            let line = String::from_utf8_lossy(&line);
            let entry = line.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }

            let origin = format!("{}:{}", self.path.display(), self.line_number);
            if let Some(name) = self.filter.admit(entry, &origin) {
                return Ok(Some(name));
            }
        }
    }

    fn stats(&self) -> SourceStats {
        self.filter.stats
    }
}

/// Why a generator produced no usable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorFault {
    /// The producer itself failed
    Failed(String),
    /// The producer yielded something that is not a string (described here)
    NotAString(String),
}

/// One value from a generator.
pub type GeneratorItem = Result<String, GeneratorFault>;

/// The lazy sequence a generator factory returns.
pub type GeneratorIter = Box<dyn Iterator<Item = GeneratorItem> + Send>;

/// Argument-less producer of a [`GeneratorIter`], invoked at most once.
pub type GeneratorFactory = Box<dyn FnOnce() -> Result<GeneratorIter, String> + Send>;

/// Base names from a user-supplied generator.
///
/// The factory runs on the first call to `next_name`. The source cannot be
/// restarted; once exhausted it stays exhausted.
pub struct GeneratorSource {
    name: String,
    factory: Option<GeneratorFactory>,
    iter: Option<GeneratorIter>,
    filter: NameFilter,
}

impl fmt::Debug for GeneratorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorSource")
            .field("name", &self.name)
            .field("started", &self.factory.is_none())
            .field("stats", &self.filter.stats)
            .finish()
    }
}

impl GeneratorSource {
    pub fn new<N, F>(name: N, factory: F) -> Self
    where
        N: Into<String>,
        F: FnOnce() -> Result<GeneratorIter, String> + Send + 'static,
    {
        Self {
            name: name.into(),
            factory: Some(Box::new(factory)),
            iter: None,
            filter: NameFilter::default(),
        }
    }

    /// A generator over a fixed list of names.
    pub fn from_names<N, I, S>(name: N, names: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        I::IntoIter: Send + 'static,
        S: Into<String>,
    {
        let iter = names.into_iter().map(|s| Ok(s.into()));
        Self::new(name, move || Ok(Box::new(iter) as GeneratorIter))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn started_iter(&mut self) -> Result<&mut GeneratorIter, DomainSeekerError> {
        if let Some(factory) = self.factory.take() {
            let iter = factory().map_err(|message| {
                DomainSeekerError::config(format!(
                    "generator '{}' failed to start: {}",
                    self.name, message
                ))
            })?;
            debug!(generator = %self.name, "Generator started");
            self.iter = Some(iter);
        }

        self.iter.as_mut().ok_or_else(|| {
            DomainSeekerError::config(format!("generator '{}' failed to start", self.name))
        })
    }
}

impl DomainSource for GeneratorSource {
    fn describe(&self) -> String {
        format!("generator {}", self.name)
    }

    fn next_name(&mut self) -> Result<Option<BaseName>, DomainSeekerError> {
        loop {
            let produced = self.filter.stats.entries;
            let item = match self.started_iter()?.next() {
                Some(item) => item,
                None => return Ok(None),
            };

            match item {
                Ok(raw) => {
                    if let Some(name) = self.filter.admit(&raw, &self.name) {
                        return Ok(Some(name));
                    }
                }
                Err(GeneratorFault::NotAString(value)) => {
                    return Err(DomainSeekerError::config(format!(
                        "generator '{}' yielded a non-string value: {}",
                        self.name, value
                    )));
                }
                Err(GeneratorFault::Failed(message)) if produced == 0 => {
                    return Err(DomainSeekerError::config(format!(
                        "generator '{}' failed before producing any name: {}",
                        self.name, message
                    )));
                }
                Err(GeneratorFault::Failed(message)) => {
                    return Err(DomainSeekerError::source_failed(
                        self.describe(),
                        format!("failed after {} entries: {}", produced, message),
                    ));
                }
            }
        }
    }

    fn stats(&self) -> SourceStats {
        self.filter.stats
    }
}

/// Pick the domain source for a run.
///
/// In `auto` mode the file wins when it exists and is non-empty, the
/// generator is used otherwise, and having neither is a configuration error.
pub fn select_source(
    mode: SourceMode,
    file: Option<&Path>,
    generator: Option<GeneratorSource>,
) -> Result<Box<dyn DomainSource>, DomainSeekerError> {
    match mode {
        SourceMode::File => {
            let path = file.ok_or_else(|| {
                DomainSeekerError::config("file source selected but no domain list path given")
            })?;
            Ok(Box::new(FileSource::open(path)?))
        }
        SourceMode::Generator => {
            let generator = generator.ok_or_else(|| {
                DomainSeekerError::config("generator source selected but no generator configured")
            })?;
            Ok(Box::new(generator))
        }
        SourceMode::Auto => {
            if let Some(path) = file.filter(|p| is_non_empty_file(p)) {
                info!(path = %path.display(), "Using domain list file");
                return Ok(Box::new(FileSource::open(path)?));
            }
            if let Some(generator) = generator {
                info!(generator = %generator.name(), "Domain list missing or empty, using generator");
                return Ok(Box::new(generator));
            }
            Err(DomainSeekerError::config(
                "no domain source available: domain list is missing or empty and no generator is configured",
            ))
        }
    }
}

fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}
