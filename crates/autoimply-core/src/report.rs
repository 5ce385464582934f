//! Justification text and follow-up listing attached to submitted batches.

use autoimply_state::TagRecord;

use crate::scheduler::Batch;

/// Largest number of tags a single follow-up link covers.
pub const LINK_PAGE_SIZE: usize = 100;

pub const BOT_IMPLICATION_REASON: &str = "\n [code]beep boop[/code]\n";

pub const BOT_DISCLAIMER: &str = "[tn]This is an automatic post. Reply in this topic to report \
errors, false positives or general feedback.[/tn]";

/// Listing of tags that could not be proposed for lack of a wiki page.
///
/// Empty when there is nothing to list. Otherwise one `[[tag]]` entry per
/// tag, then one search link per page of at most [`LINK_PAGE_SIZE`] tags;
/// links are numbered only when there is more than one.
pub fn wikiless_listing(tags: &[TagRecord]) -> String {
    if tags.is_empty() {
        return String::new();
    }

    let mut body = String::from("\n[expand Tags without a wiki that couldn't be submitted]");
    for tag in tags {
        body.push_str(&format!("\n* [[{}]]", tag.name));
    }
    body.push_str("\n[/expand]\n");

    let paged = tags.len() > LINK_PAGE_SIZE;
    for (index, page) in tags.chunks(LINK_PAGE_SIZE).enumerate() {
        let ids = page
            .iter()
            .map(|t| t.id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let number = if paged {
            format!(" #{}", index + 1)
        } else {
            String::new()
        };
        body.push_str(&format!(
            "\n* \"Link{number} to tags that couldn't be submitted\":/tags?search[has_wiki_page]=no&limit={LINK_PAGE_SIZE}&search[id]={ids}"
        ));
    }

    body
}

/// Full reason text for a series: bot reason, listing (sorted by name), disclaimer.
pub fn justification(children_without_wiki: &[TagRecord]) -> String {
    let mut sorted = children_without_wiki.to_vec();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted.dedup_by(|a, b| a.name == b.name);
    format!(
        "{BOT_IMPLICATION_REASON}\n{}\n{BOT_DISCLAIMER}",
        wikiless_listing(&sorted)
    )
}

/// Human-readable dump of every batch, for the run log.
pub fn render_batches(batches: &[Batch]) -> String {
    batches
        .iter()
        .enumerate()
        .map(|(index, batch)| {
            format!(
                "[expand BUR #{}]\n{}\n[/expand]",
                index + 1,
                batch.script
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
