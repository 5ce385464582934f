//! Parent resolution: pick the implication target for a single tag.

use std::collections::HashSet;

use autoimply_state::TagRecord;
use tracing::trace;

use crate::context::TagIndex;
use crate::decompose::{decompose, qualifier_tokens};
use crate::series::Series;

/// Candidate ancestor names of `tag_name`, merged across every matching
/// pattern, deduplicated in first-seen order. Never contains `tag_name`.
pub fn candidate_parents(tag_name: &str, series: &Series) -> Vec<String> {
    let series_qualifiers = series.series_qualifiers();
    let mut seen = HashSet::new();
    decompose(tag_name, series.costume_patterns(), &series_qualifiers)
        .iter()
        .flat_map(|d| d.candidate_names(tag_name))
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect()
}

/// Candidates in the order they are tried: longest first when sub-implications
/// are allowed, shortest first otherwise. Equal lengths keep generation order.
pub fn ordered_candidates(tag_name: &str, series: &Series) -> Vec<String> {
    let mut candidates = candidate_parents(tag_name, series);
    if series.allow_sub_implications {
        candidates.sort_by(|a, b| b.len().cmp(&a.len()));
    } else {
        candidates.sort_by_key(|c| c.len());
    }
    candidates
}

/// Choose the parent `tag` should imply, if any.
///
/// Deprecated tags, tags that already imply something, and tags carrying a
/// blacklisted qualifier are left alone. Otherwise the first candidate that is not blacklisted, is a
/// known tag of the series and is not deprecated wins. Ledger duplicates are
/// filtered by the caller.
pub fn resolve_parent<'a>(
    tag: &TagRecord,
    known_tags: &'a TagIndex,
    series: &Series,
) -> Option<&'a TagRecord> {
    if tag.is_deprecated || tag.has_antecedent_implication {
        return None;
    }
    if series.has_blacklisted_qualifier(qualifier_tokens(&tag.name)) {
        return None;
    }

    let candidates = ordered_candidates(&tag.name, series);
    if candidates.is_empty() {
        trace!(tag = %tag.name, "could not determine a parent");
        return None;
    }

    for candidate in &candidates {
        if series.is_line_blacklisted(&tag.name, candidate) {
            trace!(tag = %tag.name, parent = %candidate, "implication is blacklisted");
            continue;
        }
        let Some(parent) = known_tags.get(candidate) else {
            continue;
        };
        if parent.is_deprecated {
            continue;
        }
        return Some(parent);
    }

    trace!(tag = %tag.name, "no existing parent among candidates");
    None
}
