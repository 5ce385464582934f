//! Per-run state handed explicitly to each component.

use std::collections::HashMap;

use autoimply_state::TagRecord;

use crate::ledger::Ledger;

/// The known tags of one series, keyed by name.
///
/// Iteration follows first-insertion order. Re-inserting a name replaces the
/// record but keeps its position.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    tags: Vec<TagRecord>,
    by_name: HashMap<String, usize>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: TagRecord) {
        match self.by_name.get(&tag.name) {
            Some(&slot) => self.tags[slot] = tag,
            None => {
                self.by_name.insert(tag.name.clone(), self.tags.len());
                self.tags.push(tag);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TagRecord> {
        self.by_name.get(name).map(|&slot| &self.tags[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagRecord> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<TagRecord> for TagIndex {
    fn from_iter<I: IntoIterator<Item = TagRecord>>(iter: I) -> Self {
        let mut index = Self::new();
        for tag in iter {
            index.insert(tag);
        }
        index
    }
}

/// Everything derived for one series run: its known tags and the ledger of
/// prior requests. Built fresh every run and dropped afterwards.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub tags: &'a TagIndex,
    pub ledger: &'a Ledger,
}

impl<'a> RunContext<'a> {
    pub fn new(tags: &'a TagIndex, ledger: &'a Ledger) -> Self {
        Self { tags, ledger }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinsert_replaces_record_in_place() {
        let mut index: TagIndex = vec![TagRecord::new(1, "alice"), TagRecord::new(2, "bob")]
            .into_iter()
            .collect();
        index.insert(TagRecord::new(1, "alice").deprecated());

        let names: Vec<_> = index.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert!(index.get("alice").unwrap().is_deprecated);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn lookup_by_name() {
        let index: TagIndex = std::iter::once(TagRecord::new(1, "alice")).collect();
        assert!(index.contains("alice"));
        assert!(!index.contains("bob"));
        assert!(index.get("bob").is_none());
    }
}
