//! Implication groups and qualifier clustering.
//!
//! Resolved `child -> parent` pairs are folded into one [`ImplicationGroup`]
//! per parent. Single-child groups are then re-clustered by a shared
//! qualifier so that related one-line implications land in the same batch.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use autoimply_state::TagRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::context::RunContext;
use crate::decompose::qualifier_tokens;
use crate::error::{AutoimplyError, Result};
use crate::resolver::resolve_parent;
use crate::series::Series;

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// One parent and every child resolving to it.
///
/// # Invariants
///
/// Children are sorted by name, none of them is the parent, and within one
/// series run a child belongs to exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplicationGroup {
    pub parent: TagRecord,
    pub children: Vec<TagRecord>,
}

impl ImplicationGroup {
    pub fn children_with_wiki(&self) -> impl Iterator<Item = &TagRecord> {
        self.children.iter().filter(|t| t.has_wiki_page)
    }

    pub fn children_without_wiki(&self) -> impl Iterator<Item = &TagRecord> {
        self.children.iter().filter(|t| !t.has_wiki_page)
    }

    /// `imply <child> -> <parent>` for every documented child.
    pub fn script_lines(&self) -> Vec<String> {
        self.children_with_wiki()
            .map(|child| format!("imply {} -> {}", child.name, self.parent.name))
            .collect()
    }

    pub fn is_single(&self) -> bool {
        self.children.len() == 1
    }
}

/// Resolve every known tag and fold the results into groups sorted by
/// parent name. Pairs already present in the ledger are dropped.
pub fn build_groups(ctx: RunContext<'_>, series: &Series) -> Vec<ImplicationGroup> {
    let mut by_parent: BTreeMap<&str, (TagRecord, Vec<TagRecord>)> = BTreeMap::new();

    for tag in ctx.tags.iter() {
        let Some(parent) = resolve_parent(tag, ctx.tags, series) else {
            continue;
        };
        if ctx.ledger.already_requested(&tag.name, &parent.name) {
            trace!(
                child = %tag.name,
                parent = %parent.name,
                "implication was already requested"
            );
            continue;
        }
        if ctx.ledger.has_pending(&tag.name) {
            debug!(child = %tag.name, "child already has a pending request elsewhere");
        }
        by_parent
            .entry(parent.name.as_str())
            .or_insert_with(|| (parent.clone(), Vec::new()))
            .1
            .push(tag.clone());
    }

    by_parent
        .into_values()
        .map(|(parent, mut children)| {
            children.sort_by(|a, b| a.name.cmp(&b.name));
            ImplicationGroup { parent, children }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// Groups that should be submitted together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifierCluster {
    /// Shared qualifier, `None` for a standalone cluster.
    pub qualifier: Option<String>,
    pub groups: Vec<ImplicationGroup>,
}

impl QualifierCluster {
    fn standalone(group: ImplicationGroup) -> Self {
        Self {
            qualifier: None,
            groups: vec![group],
        }
    }

    fn sort_key(&self) -> &str {
        self.groups.first().map_or("", |g| g.parent.name.as_str())
    }
}

/// One standalone cluster per group, keeping group order.
pub fn standalone_clusters(groups: Vec<ImplicationGroup>) -> Vec<QualifierCluster> {
    groups.into_iter().map(QualifierCluster::standalone).collect()
}

/// Re-cluster single-child groups by shared non-series qualifier.
///
/// Multi-child groups, and single-child groups without a usable qualifier,
/// stay standalone. The qualifier shared by the most remaining groups is
/// taken first (ties go to the qualifier encountered first), until no
/// qualifier is shared by two groups. Qualifier clusters come first in
/// selection order, then standalone clusters sorted by parent name.
pub fn cluster_by_qualifier(
    groups: Vec<ImplicationGroup>,
    series: &Series,
) -> Result<Vec<QualifierCluster>> {
    let mut standalone = Vec::new();
    let mut remaining: Vec<(ImplicationGroup, Vec<String>)> = Vec::new();

    for group in groups {
        if !group.is_single() {
            standalone.push(QualifierCluster::standalone(group));
            continue;
        }
        let mut tokens: Vec<String> = Vec::new();
        for token in qualifier_tokens(&group.children[0].name) {
            if !series.is_series_qualifier(token) && !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
        if tokens.is_empty() {
            standalone.push(QualifierCluster::standalone(group));
        } else {
            remaining.push((group, tokens));
        }
    }

    let expected: Vec<String> = remaining
        .iter()
        .map(|(group, _)| group.children[0].name.clone())
        .chain(
            standalone
                .iter()
                .flat_map(|c| c.groups.iter())
                .filter(|g| g.is_single())
                .map(|g| g.children[0].name.clone()),
        )
        .collect();

    let mut by_qualifier = Vec::new();
    while let Some(qualifier) = most_shared_qualifier(&remaining) {
        let (members, rest): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|(_, tokens)| tokens.contains(&qualifier));
        remaining = rest;
        debug!(qualifier = %qualifier, groups = members.len(), "clustered by qualifier");
        by_qualifier.push(QualifierCluster {
            qualifier: Some(qualifier),
            groups: members.into_iter().map(|(group, _)| group).collect(),
        });
    }
    standalone.extend(
        remaining
            .into_iter()
            .map(|(group, _)| QualifierCluster::standalone(group)),
    );

    let mut assigned: HashMap<&str, usize> = HashMap::new();
    for group in by_qualifier
        .iter()
        .chain(standalone.iter())
        .flat_map(|c| c.groups.iter())
        .filter(|g| g.is_single())
    {
        *assigned.entry(group.children[0].name.as_str()).or_default() += 1;
    }
    let leftovers: Vec<String> = expected
        .into_iter()
        .filter(|name| assigned.get(name.as_str()) != Some(&1))
        .collect();
    if !leftovers.is_empty() {
        warn!(?leftovers, "single-child groups not assigned to exactly one cluster");
        return Err(AutoimplyError::ClusteringInvariant { leftovers });
    }

    standalone.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
    by_qualifier.extend(standalone);
    Ok(by_qualifier)
}

/// The qualifier shared by the most remaining groups, if more than one
/// group shares it. Ties go to the first qualifier encountered.
fn most_shared_qualifier(remaining: &[(ImplicationGroup, Vec<String>)]) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for token in remaining.iter().flat_map(|(_, tokens)| tokens.iter()) {
        let first_seen = counts.len();
        counts.entry(token.as_str()).or_insert((first_seen, 0)).1 += 1;
    }

    counts
        .into_iter()
        .filter(|(_, (_, count))| *count > 1)
        .min_by_key(|(_, (first_seen, count))| (Reverse(*count), *first_seen))
        .map(|(token, _)| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TagIndex;
    use crate::ledger::Ledger;
    use autoimply_state::{ChangeRequestRecord, RequestStatus};

    fn summer() -> Series {
        Series::new("summer", 1).unwrap()
    }

    fn group(parent: &str, children: &[&str]) -> ImplicationGroup {
        ImplicationGroup {
            parent: TagRecord::new(0, parent),
            children: children.iter().map(|c| TagRecord::new(0, *c)).collect(),
        }
    }

    fn index(names: &[&str]) -> TagIndex {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| TagRecord::new(i as u64 + 1, *n))
            .collect()
    }

    #[test]
    fn groups_children_under_shared_parent() {
        let tags = index(&[
            "bob_(summer)",
            "alice_(summer)",
            "alice_(swimsuit)_(summer)",
            "alice_(maid)_(summer)",
            "bob_(maid)_(summer)",
        ]);
        let ledger = Ledger::new();
        let groups = build_groups(RunContext::new(&tags, &ledger), &summer());

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].parent.name, "alice_(summer)");
        let children: Vec<_> = groups[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(children, vec!["alice_(maid)_(summer)", "alice_(swimsuit)_(summer)"]);
        assert_eq!(groups[1].parent.name, "bob_(summer)");
    }

    #[test]
    fn ledger_duplicates_are_dropped() {
        let tags = index(&["alice_(summer)", "alice_(maid)_(summer)"]);
        let ledger = Ledger::from_requests(&[ChangeRequestRecord {
            id: 1,
            topic_id: 1,
            script: "imply alice_(maid)_(summer) -> alice_(summer)".to_string(),
            status: RequestStatus::Rejected,
            updated_at: chrono::Utc::now(),
        }])
        .unwrap();

        assert!(build_groups(RunContext::new(&tags, &ledger), &summer()).is_empty());
    }

    #[test]
    fn no_child_appears_twice() {
        let tags = index(&[
            "alice_(summer)",
            "alice_(swimsuit)_(summer)",
            "alice_(swimsuit)_(beach)_(summer)",
            "alice_(maid)_(summer)",
        ]);
        let ledger = Ledger::new();
        let groups = build_groups(RunContext::new(&tags, &ledger), &summer());

        let mut seen = std::collections::HashSet::new();
        for g in &groups {
            for c in &g.children {
                assert!(seen.insert(c.name.clone()), "{} appears twice", c.name);
                assert_ne!(c.name, g.parent.name);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn clusters_single_groups_by_most_shared_qualifier() {
        let groups = vec![
            group("alice_(summer)", &["alice_(maid)_(summer)"]),
            group("bob_(summer)", &["bob_(maid)_(summer)"]),
            group("carol_(summer)", &["carol_(maid)_(summer)", "carol_(nurse)_(summer)"]),
            group("dave_(summer)", &["dave_(nurse)_(summer)"]),
            group("erin_(summer)", &["erin_(nurse)_(summer)"]),
            group("frank_(summer)", &["frank_(chef)_(summer)"]),
            group("gina", &["gina_(maid)"]),
        ];
        let clusters = cluster_by_qualifier(groups, &summer()).unwrap();

        // maid: alice, bob, gina (3) beats nurse: dave, erin (2)
        assert_eq!(clusters[0].qualifier.as_deref(), Some("maid"));
        assert_eq!(clusters[0].groups.len(), 3);
        assert_eq!(clusters[1].qualifier.as_deref(), Some("nurse"));
        assert_eq!(clusters[1].groups.len(), 2);

        let rest: Vec<_> = clusters[2..]
            .iter()
            .map(|c| (c.qualifier.clone(), c.groups[0].parent.name.as_str()))
            .collect();
        assert_eq!(rest, vec![(None, "carol_(summer)"), (None, "frank_(summer)")]);
    }

    #[test]
    fn ties_break_by_encounter_order() {
        let groups = vec![
            group("a_(summer)", &["a_(nurse)_(summer)"]),
            group("b_(summer)", &["b_(maid)_(summer)"]),
            group("c_(summer)", &["c_(maid)_(summer)"]),
            group("d_(summer)", &["d_(nurse)_(summer)"]),
        ];
        let clusters = cluster_by_qualifier(groups, &summer()).unwrap();
        assert_eq!(clusters[0].qualifier.as_deref(), Some("nurse"));
        assert_eq!(clusters[1].qualifier.as_deref(), Some("maid"));
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn counts_are_recomputed_after_each_selection() {
        // "maid" and "beach" tie at three; "maid" was seen first and takes
        // a, b and c, which leaves "beach" on d alone.
        let groups = vec![
            group("a_(summer)", &["a_(maid)_(beach)_(summer)"]),
            group("b_(summer)", &["b_(maid)_(beach)_(summer)"]),
            group("c_(summer)", &["c_(maid)_(summer)"]),
            group("d_(summer)", &["d_(beach)_(summer)"]),
        ];
        let clusters = cluster_by_qualifier(groups, &summer()).unwrap();
        assert_eq!(clusters[0].qualifier.as_deref(), Some("maid"));
        assert_eq!(clusters[0].groups.len(), 3);
        assert_eq!(clusters[1].qualifier, None);
        assert_eq!(clusters[1].groups[0].parent.name, "d_(summer)");
    }

    #[test]
    fn every_group_lands_in_exactly_one_cluster() {
        let groups = vec![
            group("a_(summer)", &["a_(maid)_(summer)"]),
            group("b_(summer)", &["b_(summer)_(summer)"]),
            group("c_(summer)", &["c_(x)_(summer)", "c_(y)_(summer)"]),
            group("d_(summer)", &["d_(maid)_(summer)"]),
            group("e_(summer)", &["e_(z)_(summer)"]),
        ];
        let clusters = cluster_by_qualifier(groups.clone(), &summer()).unwrap();
        let total: usize = clusters.iter().map(|c| c.groups.len()).sum();
        assert_eq!(total, groups.len());
        for g in &groups {
            let hits = clusters
                .iter()
                .filter(|c| c.groups.contains(g))
                .count();
            assert_eq!(hits, 1, "{} clustered {} times", g.parent.name, hits);
        }
    }

    #[test]
    fn series_qualifiers_never_cluster() {
        let series = summer().with_extra_qualifiers(&["ss"]);
        let groups = vec![
            group("a", &["a_(ss)"]),
            group("b", &["b_(ss)"]),
        ];
        let clusters = cluster_by_qualifier(groups, &series).unwrap();
        assert!(clusters.iter().all(|c| c.qualifier.is_none()));
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn script_lines_skip_children_without_wiki() {
        let g = ImplicationGroup {
            parent: TagRecord::new(1, "alice"),
            children: vec![
                TagRecord::new(2, "alice_(maid)"),
                TagRecord::new(3, "alice_(nurse)").without_wiki(),
            ],
        };
        assert_eq!(g.script_lines(), vec!["imply alice_(maid) -> alice"]);
        assert_eq!(g.children_without_wiki().count(), 1);
    }
}
