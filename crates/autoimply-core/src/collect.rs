//! Collecting the known tags of a series from a tag source.
//!
//! Two inputs feed the index: a suffix search for every series qualifier
//! (`*_(summer)`), and, when the series lists wiki pages, the tags those
//! pages link to together with their costume children.

use std::collections::HashSet;

use autoimply_state::{StateResult, TagRecord, TagSource};
use tracing::{debug, error, info};

use crate::context::TagIndex;
use crate::series::Series;

/// Wiki-linked tags below this popularity are ignored.
pub const MIN_WIKI_TAG_POPULARITY: u64 = 5;

/// Tags found by searching for each series qualifier suffix.
pub async fn tags_from_search(source: &dyn TagSource, series: &Series) -> StateResult<Vec<TagRecord>> {
    let mut tags = Vec::new();
    for qualifier in series.series_qualifiers() {
        tags.extend(source.tags_matching(&format!("*_({qualifier})")).await?);
    }
    Ok(tags)
}

/// Tags linked from the series' wiki pages, plus their children.
///
/// Names already found by search are skipped. Linked tags must be popular
/// enough and belong to the series; children must not already imply
/// anything and must belong to the series too.
pub async fn tags_from_wiki(
    source: &dyn TagSource,
    series: &Series,
    from_search: &[TagRecord],
) -> StateResult<Vec<TagRecord>> {
    if series.wiki_ids.is_empty() {
        return Ok(Vec::new());
    }

    let searched: HashSet<&str> = from_search.iter().map(|t| t.name.as_str()).collect();
    let mut names: Vec<String> = Vec::new();
    for page in source.wiki_pages(&series.wiki_ids).await? {
        info!(series = %series.name, wiki = %page.title, "processing wiki page");
        for name in page.linked_tags {
            if !searched.contains(name.as_str()) && !names.contains(&name) {
                names.push(name);
            }
        }
    }
    if names.is_empty() {
        return Ok(Vec::new());
    }
    debug!(count = names.len(), "tag names linked from wikis");

    let mut kept = Vec::new();
    for tag in source.tags_by_names(&names).await? {
        if tag.post_count < MIN_WIKI_TAG_POPULARITY {
            continue;
        }
        if !belongs_to_series(source, series, &tag).await? {
            debug!(tag = %tag.name, series = %series.name, "tag does not belong to series");
            continue;
        }
        kept.push(tag);
    }

    let children = child_tags(source, series, &kept).await?;
    kept.extend(children);
    info!(series = %series.name, count = kept.len(), "done processing tags from wikis");
    Ok(kept)
}

async fn child_tags(
    source: &dyn TagSource,
    series: &Series,
    parents: &[TagRecord],
) -> StateResult<Vec<TagRecord>> {
    if parents.is_empty() {
        return Ok(Vec::new());
    }
    let parent_names: HashSet<&str> = parents.iter().map(|t| t.name.as_str()).collect();
    let prefixes: Vec<String> = parents.iter().map(|t| t.name.clone()).collect();

    let mut children = Vec::new();
    for tag in source.tags_with_prefix(&prefixes).await? {
        if parent_names.contains(tag.name.as_str()) || tag.has_antecedent_implication {
            continue;
        }
        if !belongs_to_series(source, series, &tag).await? {
            debug!(tag = %tag.name, series = %series.name, "child tag does not belong to series");
            continue;
        }
        children.push(tag);
    }
    Ok(children)
}

/// A tag belongs to a series when it ends in a series qualifier, or when the
/// catalog relates it to a copyright named like one.
pub async fn belongs_to_series(
    source: &dyn TagSource,
    series: &Series,
    tag: &TagRecord,
) -> StateResult<bool> {
    let qualifiers = series.series_qualifiers();
    if qualifiers
        .iter()
        .any(|q| tag.name.ends_with(&format!("_({q})")))
    {
        return Ok(true);
    }

    let copyrights = source.related_copyrights(&tag.name).await?;
    if copyrights.is_empty() {
        error!(tag = %tag.name, "copyrights for tag could not be determined");
        return Ok(false);
    }
    Ok(qualifiers.iter().any(|q| copyrights.iter().any(|c| c == q)))
}

/// Build the known-tag index: wiki-derived tags first, then search results,
/// later entries replacing earlier ones of the same name.
pub async fn collect_series_tags(source: &dyn TagSource, series: &Series) -> StateResult<TagIndex> {
    let from_search = tags_from_search(source, series).await?;
    let from_wiki = tags_from_wiki(source, series, &from_search).await?;
    debug!(
        from_wiki = from_wiki.len(),
        from_search = from_search.len(),
        "tags to process"
    );
    Ok(from_wiki.into_iter().chain(from_search).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoimply_state::{MemoryTagSource, WikiPageRecord};
    use std::collections::HashMap;

    fn source() -> MemoryTagSource {
        let mut copyrights = HashMap::new();
        copyrights.insert("alice".to_string(), vec!["summer".to_string()]);
        copyrights.insert("alice_(maid)".to_string(), vec!["summer".to_string()]);
        copyrights.insert("zed".to_string(), vec!["winter".to_string()]);

        MemoryTagSource::new(vec![
            TagRecord::new(1, "alice").with_post_count(50),
            TagRecord::new(2, "alice_(maid)").with_post_count(3),
            TagRecord::new(3, "alice_(nurse)").with_antecedent_implication(),
            TagRecord::new(4, "bob_(summer)").with_post_count(10),
            TagRecord::new(5, "zed").with_post_count(99),
            TagRecord::new(6, "tiny").with_post_count(1),
            TagRecord::new(7, "alice_(swimsuit)_(summer)"),
        ])
        .with_wiki_pages(vec![WikiPageRecord {
            id: 9,
            title: "list_of_summer_characters".to_string(),
            linked_tags: vec![
                "alice".to_string(),
                "zed".to_string(),
                "tiny".to_string(),
                "bob_(summer)".to_string(),
            ],
        }])
        .with_copyrights(copyrights)
    }

    fn series_with_wiki() -> Series {
        let mut series = Series::new("summer", 1).unwrap();
        series.wiki_ids = vec![9];
        series
    }

    #[tokio::test]
    async fn search_finds_series_suffix_tags() {
        let found = tags_from_search(&source(), &Series::new("summer", 1).unwrap())
            .await
            .unwrap();
        let names: Vec<_> = found.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["bob_(summer)", "alice_(swimsuit)_(summer)"]);
    }

    #[tokio::test]
    async fn wiki_tags_are_filtered_and_expanded_with_children() {
        let source = source();
        let series = series_with_wiki();
        let searched = tags_from_search(&source, &series).await.unwrap();
        let found = tags_from_wiki(&source, &series, &searched).await.unwrap();
        let names: Vec<_> = found.iter().map(|t| t.name.as_str()).collect();

        // zed: wrong copyright; tiny: unpopular; bob: already searched;
        // alice_(nurse): already implies something
        assert_eq!(
            names,
            vec!["alice", "alice_(maid)", "alice_(swimsuit)_(summer)"]
        );
    }

    #[tokio::test]
    async fn no_wiki_ids_means_no_wiki_tags() {
        let series = Series::new("summer", 1).unwrap();
        assert!(tags_from_wiki(&source(), &series, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn index_contains_both_inputs_once() {
        let index = collect_series_tags(&source(), &series_with_wiki())
            .await
            .unwrap();
        assert!(index.contains("alice"));
        assert!(index.contains("bob_(summer)"));
        assert_eq!(index.len(), 4);
    }
}
