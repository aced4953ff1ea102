//! Clustering of counted tags by the text before their first hyphen.

use std::collections::HashMap;

use serde::Serialize;

use crate::aggregator::TagCount;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagGroup {
    pub prefix: String,
    pub tags: Vec<TagCount>,
}

/// Group key: the tag up to its first `-`, or the whole tag.
pub fn prefix_of(tag: &str) -> &str {
    tag.split_once('-').map_or(tag, |(head, _)| head)
}

/// Groups sorted by prefix; members keep their order from `counts`.
///
/// Every key forms a group, singletons included: a key is cut before the first
/// `-`, so it never looks like a fragment and a lone `#db-read` yields `db`.
pub fn group_by_prefix(counts: &[TagCount]) -> Vec<TagGroup> {
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<&TagCount>> = HashMap::new();

    for tc in counts {
        let key = prefix_of(&tc.tag);
        members
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(tc);
    }

    let mut groups: Vec<TagGroup> = order
        .into_iter()
        .filter_map(|key| {
            let tags = members.remove(key)?;
            Some(TagGroup {
                prefix: key.to_string(),
                tags: tags.into_iter().cloned().collect(),
            })
        })
        .collect();

    groups.sort_by(|a, b| a.prefix.cmp(&b.prefix));
    groups
}
