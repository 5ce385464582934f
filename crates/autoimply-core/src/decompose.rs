//! Tag name decomposition.
//!
//! A compound tag such as `alice_(swimsuit)_(summer)` is split into a base
//! identity (`alice`) and an ordered qualifier chain (`(swimsuit)`,
//! `(summer)`). When the last qualifier is one of the series' own qualifiers
//! it is pulled out as the *series qualifier* and pinned to the end of every
//! candidate ancestor name.

use regex::Regex;

/// Pattern every series falls back to after its own extra patterns.
pub const DEFAULT_COSTUME_PATTERN: &str = r"(?P<base_name>[^(]+)(?P<qualifiers>(?:_\(.*\)))";

const BASE_GROUP: &str = "base_name";
const QUALIFIERS_GROUP: &str = "qualifiers";
const EXTRA_QUALIFIER_GROUP: &str = "extra_qualifier";

/// Errors produced while compiling a costume pattern.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error("pattern has no `{0}` capture group")]
    MissingGroup(&'static str),
}

/// A validated decomposition rule.
///
/// The expression is anchored at the start of the tag name and must define
/// `base_name` and `qualifiers` groups; `extra_qualifier` is optional and is
/// prepended to the qualifier chain when it captures.
#[derive(Debug, Clone)]
pub struct CostumePattern {
    source: String,
    regex: Regex,
}

impl CostumePattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        for group in [BASE_GROUP, QUALIFIERS_GROUP] {
            if !regex.capture_names().flatten().any(|name| name == group) {
                return Err(PatternError::MissingGroup(group));
            }
        }
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn default_pattern() -> Result<Self, PatternError> {
        Self::new(DEFAULT_COSTUME_PATTERN)
    }

    /// The pattern as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Split `tag_name`, or `None` when the pattern does not apply.
    pub fn decompose(&self, tag_name: &str, series_qualifiers: &[&str]) -> Option<Decomposition> {
        let caps = self.regex.captures(tag_name)?;
        let base_name = caps.name(BASE_GROUP)?.as_str().to_string();
        let extra = caps.name(EXTRA_QUALIFIER_GROUP).map(|m| m.as_str());
        let qualifier_text = caps.name(QUALIFIERS_GROUP).map_or("", |m| m.as_str());

        let mut qualifiers: Vec<String> = extra
            .into_iter()
            .chain(paren_segments(qualifier_text))
            .map(|q| q.trim_matches('_').to_string())
            .filter(|q| !q.is_empty())
            .collect();

        let series_qualifier = if ends_with_series_qualifier(tag_name, series_qualifiers) {
            qualifiers.pop()
        } else {
            None
        };

        Some(Decomposition {
            base_name,
            qualifiers,
            series_qualifier,
        })
    }
}

/// Result of applying one pattern to a tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    pub base_name: String,
    /// Qualifier segments in name order, series qualifier excluded.
    pub qualifiers: Vec<String>,
    /// Trailing series qualifier, pinned to every candidate.
    pub series_qualifier: Option<String>,
}

impl Decomposition {
    /// Ancestor names obtained by dropping trailing qualifiers: base plus the
    /// first `k` qualifiers for `k = 0..n`, with the series qualifier
    /// re-attached. `tag_name` itself is never returned.
    pub fn candidate_names(&self, tag_name: &str) -> Vec<String> {
        (0..self.qualifiers.len())
            .map(|k| {
                let mut name = format!("{}_{}", self.base_name, self.qualifiers[..k].join("_"));
                if let Some(series_qualifier) = &self.series_qualifier {
                    name.push('_');
                    name.push_str(series_qualifier);
                }
                collapse_underscores(&name)
            })
            .filter(|candidate| candidate != tag_name)
            .collect()
    }
}

/// Apply every pattern in order, keeping the ones that match.
///
/// An empty result means the tag has no derivable ancestor.
pub fn decompose(
    tag_name: &str,
    patterns: &[CostumePattern],
    series_qualifiers: &[&str],
) -> Vec<Decomposition> {
    patterns
        .iter()
        .filter_map(|p| p.decompose(tag_name, series_qualifiers))
        .collect()
}

/// Qualifier tokens of a tag name, without their parentheses.
pub fn qualifier_tokens(tag_name: &str) -> Vec<&str> {
    paren_segments(tag_name)
        .into_iter()
        .map(|segment| &segment[1..segment.len() - 1])
        .collect()
}

fn ends_with_series_qualifier(tag_name: &str, series_qualifiers: &[&str]) -> bool {
    series_qualifiers.iter().any(|q| {
        tag_name
            .strip_suffix(')')
            .and_then(|rest| rest.strip_suffix(q))
            .is_some_and(|rest| rest.ends_with("_("))
    })
}

/// Every `(...)` segment, shortest match first, scanning left to right.
fn paren_segments(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut pos = 0;
    while let Some(open) = text[pos..].find('(') {
        let start = pos + open;
        let Some(close) = text[start + 1..].find(')') else {
            break;
        };
        let end = start + 1 + close + 1;
        segments.push(&text[start..end]);
        pos = end;
    }
    segments
}

fn collapse_underscores(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut previous_underscore = false;
    for c in name.chars() {
        if c == '_' && previous_underscore {
            continue;
        }
        previous_underscore = c == '_';
        out.push(c);
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default() -> CostumePattern {
        CostumePattern::default_pattern().unwrap()
    }

    #[test]
    fn default_pattern_splits_base_and_qualifiers() {
        let d = default().decompose("alice_(swimsuit)_(beach)", &[]).unwrap();
        assert_eq!(d.base_name, "alice");
        assert_eq!(d.qualifiers, vec!["(swimsuit)", "(beach)"]);
        assert_eq!(d.series_qualifier, None);
    }

    #[test]
    fn plain_name_does_not_match() {
        assert!(default().decompose("alice", &[]).is_none());
        assert!(decompose("alice", &[default()], &[]).is_empty());
    }

    #[test]
    fn trailing_series_qualifier_is_pinned() {
        let d = default()
            .decompose("alice_(swimsuit)_(summer)", &["summer"])
            .unwrap();
        assert_eq!(d.qualifiers, vec!["(swimsuit)"]);
        assert_eq!(d.series_qualifier.as_deref(), Some("(summer)"));
    }

    #[test]
    fn series_qualifier_in_the_middle_is_not_pinned() {
        let d = default()
            .decompose("alice_(summer)_(swimsuit)", &["summer"])
            .unwrap();
        assert_eq!(d.series_qualifier, None);
        assert_eq!(d.qualifiers.len(), 2);
    }

    #[test]
    fn alias_counts_as_series_qualifier() {
        let d = default()
            .decompose("alice_(swimsuit)_(ss)", &["summer", "ss"])
            .unwrap();
        assert_eq!(d.series_qualifier.as_deref(), Some("(ss)"));
    }

    #[test]
    fn candidates_keep_series_qualifier_and_skip_self() {
        let d = default()
            .decompose("alice_(swimsuit)_(beach)_(summer)", &["summer"])
            .unwrap();
        assert_eq!(
            d.candidate_names("alice_(swimsuit)_(beach)_(summer)"),
            vec!["alice_(summer)", "alice_(swimsuit)_(summer)"]
        );
    }

    #[test]
    fn candidates_without_series_qualifier_drop_trailing_segments() {
        let d = default().decompose("alice_(swimsuit)_(beach)", &[]).unwrap();
        assert_eq!(
            d.candidate_names("alice_(swimsuit)_(beach)"),
            vec!["alice", "alice_(swimsuit)"]
        );
    }

    #[test]
    fn extra_qualifier_group_is_prepended() {
        let pattern =
            CostumePattern::new(r"(?P<base_name>[^_]+)_(?P<extra_qualifier>[a-z]+)(?P<qualifiers>_\(.*\))")
                .unwrap();
        let d = pattern.decompose("alice_maid_(summer)", &["summer"]).unwrap();
        assert_eq!(d.base_name, "alice");
        assert_eq!(d.qualifiers, vec!["maid"]);
        assert_eq!(d.candidate_names("alice_maid_(summer)"), vec!["alice_(summer)"]);
    }

    #[test]
    fn pattern_without_required_groups_is_rejected() {
        let err = CostumePattern::new(r"(?P<base_name>.+)").unwrap_err();
        assert!(matches!(err, PatternError::MissingGroup("qualifiers")));
        assert!(matches!(
            CostumePattern::new(r"(?P<base_name>[").unwrap_err(),
            PatternError::Regex(_)
        ));
    }

    #[test]
    fn qualifier_tokens_strip_parentheses() {
        assert_eq!(
            qualifier_tokens("alice_(swimsuit)_(summer)"),
            vec!["swimsuit", "summer"]
        );
        assert!(qualifier_tokens("alice").is_empty());
    }

    #[test]
    fn underscore_runs_collapse() {
        assert_eq!(collapse_underscores("alice__(summer)_"), "alice_(summer)");
    }
}
