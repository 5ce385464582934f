//! Implication ledger recovered from historical change-request scripts.
//!
//! Scripts are free text, one directive per line. Only implication
//! directives (`create implication a -> b` and `imply a -> b`) are read;
//! everything else (aliases, removals, comments) is ignored. A malformed
//! implication line is treated as corrupt history and fails the whole build.

use std::collections::HashMap;

use autoimply_state::{ChangeRequestRecord, RequestStatus};

use crate::error::LedgerError;

const DIRECTIVE_PREFIXES: [&str; 2] = ["create implication", "imply"];
const SEPARATOR: &str = " -> ";

/// One previously requested implication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicationRecord {
    pub consequent: String,
    pub status: RequestStatus,
}

/// Parse the implication directives out of a script.
///
/// Lines are normalized first: whitespace runs collapse to one space, the
/// line is trimmed and lowercased.
pub fn parse_script(script: &str) -> Result<Vec<(String, String)>, LedgerError> {
    script
        .lines()
        .map(normalize_line)
        .filter(|line| DIRECTIVE_PREFIXES.iter().any(|p| line.starts_with(p)))
        .map(|line| parse_directive(&line))
        .collect()
}

fn normalize_line(line: &str) -> String {
    line.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn parse_directive(line: &str) -> Result<(String, String), LedgerError> {
    let body = DIRECTIVE_PREFIXES
        .iter()
        .find_map(|p| line.strip_prefix(p))
        .unwrap_or(line)
        .trim();

    let sides: Vec<&str> = body.split(SEPARATOR).collect();
    let [antecedent, consequent] = sides.as_slice() else {
        return Err(LedgerError::SeparatorCount {
            line: line.to_string(),
        });
    };

    if antecedent.contains(' ') || consequent.contains(' ') {
        return Err(LedgerError::MultiWordSide {
            line: line.to_string(),
        });
    }

    Ok((antecedent.to_string(), consequent.to_string()))
}

/// Antecedent → every consequent ever requested for it, with the status of
/// the request that carried it.
///
/// Built once per run from that run's history snapshot and passed to the
/// components that need it.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: HashMap<String, Vec<ImplicationRecord>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from historical requests. Fails on the first malformed line.
    pub fn from_requests<'a>(
        requests: impl IntoIterator<Item = &'a ChangeRequestRecord>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for request in requests {
            ledger.record(request)?;
        }
        Ok(ledger)
    }

    /// Add the directives of one request.
    pub fn record(&mut self, request: &ChangeRequestRecord) -> Result<(), LedgerError> {
        for (antecedent, consequent) in parse_script(&request.script)? {
            self.entries
                .entry(antecedent)
                .or_default()
                .push(ImplicationRecord {
                    consequent,
                    status: request.status.clone(),
                });
        }
        Ok(())
    }

    /// Whether `from -> to` was ever requested, whatever became of it.
    pub fn already_requested(&self, from: &str, to: &str) -> bool {
        self.entries
            .get(from)
            .is_some_and(|records| records.iter().any(|r| r.consequent == to))
    }

    /// Whether `tag` is the antecedent of any still-pending request.
    pub fn has_pending(&self, tag: &str) -> bool {
        self.entries
            .get(tag)
            .is_some_and(|records| records.iter().any(|r| r.status.is_pending()))
    }

    pub fn records_for(&self, antecedent: &str) -> &[ImplicationRecord] {
        self.entries.get(antecedent).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct antecedents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request(script: &str, status: RequestStatus) -> ChangeRequestRecord {
        ChangeRequestRecord {
            id: 1,
            topic_id: 1,
            script: script.to_string(),
            status,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parses_both_directive_forms() {
        let parsed =
            parse_script("create implication a -> b\nimply c -> d\nalias e -> f").unwrap();
        assert_eq!(
            parsed,
            vec![
                ("a".to_string(), "b".to_string()),
                ("c".to_string(), "d".to_string())
            ]
        );
    }

    #[test]
    fn normalizes_whitespace_and_case() {
        let parsed = parse_script("   IMPLY   Alice_(Maid)    ->   alice  ").unwrap();
        assert_eq!(
            parsed,
            vec![("alice_(maid)".to_string(), "alice".to_string())]
        );
    }

    #[test]
    fn two_separators_is_an_error() {
        let err = parse_script("imply a -> b -> c").unwrap_err();
        assert_eq!(
            err,
            LedgerError::SeparatorCount {
                line: "imply a -> b -> c".to_string()
            }
        );
    }

    #[test]
    fn missing_separator_is_an_error() {
        assert!(matches!(
            parse_script("imply a b").unwrap_err(),
            LedgerError::SeparatorCount { .. }
        ));
    }

    #[test]
    fn space_in_antecedent_is_an_error() {
        let err = parse_script("imply a b -> c").unwrap_err();
        assert_eq!(err.line(), "imply a b -> c");
        assert!(matches!(err, LedgerError::MultiWordSide { .. }));
    }

    #[test]
    fn already_requested_ignores_status() {
        let ledger = Ledger::from_requests(&[
            request("imply a -> b", RequestStatus::Rejected),
            request("imply c -> d", RequestStatus::Approved),
        ])
        .unwrap();

        assert!(ledger.already_requested("a", "b"));
        assert!(ledger.already_requested("c", "d"));
        assert!(!ledger.already_requested("a", "d"));
        assert!(!ledger.already_requested("b", "a"));
    }

    #[test]
    fn has_pending_checks_status() {
        let ledger = Ledger::from_requests(&[
            request("imply a -> b", RequestStatus::Rejected),
            request("imply a -> c", RequestStatus::Pending),
            request("imply d -> e", RequestStatus::Approved),
        ])
        .unwrap();

        assert!(ledger.has_pending("a"));
        assert!(!ledger.has_pending("d"));
        assert!(!ledger.has_pending("zzz"));
        assert_eq!(ledger.records_for("a").len(), 2);
    }

    #[test]
    fn corrupt_request_fails_the_build() {
        let result = Ledger::from_requests(&[
            request("imply a -> b", RequestStatus::Approved),
            request("imply x y -> z", RequestStatus::Approved),
        ]);
        assert!(result.is_err());
    }
}
