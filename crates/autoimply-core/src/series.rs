//! Series configuration.
//!
//! A series is a family of related tags (typically one character) sharing a
//! qualifier convention and a submission topic. Series are declared in a
//! YAML file and validated on load, so malformed patterns or missing fields
//! fail before any inference runs.
//!
//! ```yaml
//! series:
//!   - name: summer
//!     topic_id: 31779
//!     extra_qualifiers: [ss]
//!     extra_costume_patterns: ['(?P<base_name>[^(]+)(?P<qualifiers>_\(.*\))']
//!     qualifier_blacklist: [cosplay]
//!     line_blacklist: ["alice_(maid)_(summer) -> alice_(summer)"]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decompose::{CostumePattern, PatternError};
use crate::error::ConfigError;

/// Default number of open batches allowed per topic.
pub const DEFAULT_MAX_BATCHES_PER_TOPIC: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeriesFile {
    series: Vec<RawSeries>,
}

/// Series entry exactly as written in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSeries {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub topic_id: u64,
    #[serde(default)]
    pub wiki_ids: Vec<u64>,
    #[serde(default)]
    pub extra_costume_patterns: Vec<String>,
    #[serde(default)]
    pub extra_qualifiers: Vec<String>,
    #[serde(default)]
    pub line_blacklist: Vec<String>,
    #[serde(default)]
    pub qualifier_blacklist: Vec<String>,
    #[serde(default = "default_max_batches")]
    pub max_batches_per_topic: u32,
    #[serde(default = "default_true")]
    pub group_by_qualifier: bool,
    #[serde(default = "default_true")]
    pub allow_sub_implications: bool,
    #[serde(default)]
    pub autopost: bool,
}

fn default_max_batches() -> u32 {
    DEFAULT_MAX_BATCHES_PER_TOPIC
}

fn default_true() -> bool {
    true
}

/// A validated series. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub topic_id: u64,
    pub wiki_ids: Vec<u64>,
    pub extra_qualifiers: Vec<String>,
    /// Extra patterns first, default pattern last.
    patterns: Vec<CostumePattern>,
    line_blacklist: HashSet<String>,
    qualifier_blacklist: HashSet<String>,
    pub max_batches_per_topic: u32,
    pub group_by_qualifier: bool,
    pub allow_sub_implications: bool,
    pub autopost: bool,
}

impl Series {
    /// A series with default settings, for programmatic construction.
    pub fn new(name: &str, topic_id: u64) -> Result<Self, ConfigError> {
        Self::from_raw(
            0,
            RawSeries {
                name: name.to_string(),
                topic_id,
                max_batches_per_topic: DEFAULT_MAX_BATCHES_PER_TOPIC,
                group_by_qualifier: true,
                allow_sub_implications: true,
                ..RawSeries::default()
            },
        )
    }

    /// Validate a raw entry; `index` is its position in the file, for errors.
    pub fn from_raw(index: usize, raw: RawSeries) -> Result<Self, ConfigError> {
        let name = raw.name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::MissingField {
                index,
                field: "name",
            });
        }
        if raw.topic_id == 0 {
            return Err(ConfigError::MissingField {
                index,
                field: "topic_id",
            });
        }
        if raw.max_batches_per_topic == 0 {
            return Err(ConfigError::InvalidQuota { series: name });
        }

        let invalid = |pattern: &str, source: PatternError| ConfigError::InvalidPattern {
            series: name.clone(),
            pattern: pattern.to_string(),
            reason: source.to_string(),
        };

        let mut patterns = Vec::with_capacity(raw.extra_costume_patterns.len() + 1);
        for pattern in &raw.extra_costume_patterns {
            patterns.push(CostumePattern::new(pattern).map_err(|e| invalid(pattern, e))?);
        }
        patterns.push(
            CostumePattern::default_pattern()
                .map_err(|e| invalid(crate::decompose::DEFAULT_COSTUME_PATTERN, e))?,
        );

        Ok(Self {
            name,
            topic_id: raw.topic_id,
            wiki_ids: raw.wiki_ids,
            extra_qualifiers: raw.extra_qualifiers,
            patterns,
            line_blacklist: raw.line_blacklist.into_iter().collect(),
            qualifier_blacklist: raw.qualifier_blacklist.into_iter().collect(),
            max_batches_per_topic: raw.max_batches_per_topic,
            group_by_qualifier: raw.group_by_qualifier,
            allow_sub_implications: raw.allow_sub_implications,
            autopost: raw.autopost,
        })
    }

    /// Parse and validate every series in a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Vec<Self>, ConfigError> {
        let file: SeriesFile = serde_yaml::from_str(yaml)?;
        file.series
            .into_iter()
            .enumerate()
            .map(|(index, raw)| Self::from_raw(index, raw))
            .collect()
    }

    /// Load the series config file.
    pub fn load_config(path: &Path) -> Result<Vec<Self>, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn with_extra_qualifiers(mut self, qualifiers: &[&str]) -> Self {
        self.extra_qualifiers = qualifiers.iter().map(|q| q.to_string()).collect();
        self
    }

    pub fn with_line_blacklist(mut self, lines: &[&str]) -> Self {
        self.line_blacklist = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_qualifier_blacklist(mut self, qualifiers: &[&str]) -> Self {
        self.qualifier_blacklist = qualifiers.iter().map(|q| q.to_string()).collect();
        self
    }

    pub fn with_sub_implications(mut self, allow: bool) -> Self {
        self.allow_sub_implications = allow;
        self
    }

    pub fn with_group_by_qualifier(mut self, enabled: bool) -> Self {
        self.group_by_qualifier = enabled;
        self
    }

    pub fn with_max_batches(mut self, max: u32) -> Self {
        self.max_batches_per_topic = max;
        self
    }

    pub fn with_autopost(mut self, autopost: bool) -> Self {
        self.autopost = autopost;
        self
    }

    pub fn costume_patterns(&self) -> &[CostumePattern] {
        &self.patterns
    }

    /// The series' own qualifiers: its name followed by its aliases.
    pub fn series_qualifiers(&self) -> Vec<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.extra_qualifiers.iter().map(String::as_str))
            .collect()
    }

    pub fn is_series_qualifier(&self, token: &str) -> bool {
        token == self.name || self.extra_qualifiers.iter().any(|q| q == token)
    }

    pub fn is_line_blacklisted(&self, child: &str, parent: &str) -> bool {
        self.line_blacklist.contains(&format!("{child} -> {parent}"))
    }

    pub fn has_blacklisted_qualifier<'a>(&self, tokens: impl IntoIterator<Item = &'a str>) -> bool {
        tokens
            .into_iter()
            .any(|token| self.qualifier_blacklist.contains(token))
    }

    /// Whether a user-supplied series name refers to this series.
    ///
    /// `!?.` are trimmed and underscores read as spaces on both sides.
    pub fn matches(&self, query: &str) -> bool {
        let query = normalize_query(query);
        self.series_qualifiers()
            .into_iter()
            .any(|q| normalize_query(q) == query)
    }
}

fn normalize_query(s: &str) -> String {
    s.trim_matches(|c| matches!(c, '!' | '?' | '.'))
        .replace('_', " ")
}

/// Keep only the series matching `query`; an unmatched query is an error.
pub fn select_series(all: Vec<Series>, query: Option<&str>) -> Result<Vec<Series>, ConfigError> {
    let Some(query) = query else {
        return Ok(all);
    };
    let selected: Vec<Series> = all.into_iter().filter(|s| s.matches(query)).collect();
    if selected.is_empty() {
        return Err(ConfigError::UnknownSeries(query.to_string()));
    }
    Ok(selected)
}
