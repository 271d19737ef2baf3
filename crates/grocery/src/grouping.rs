use std::collections::BTreeMap;

use shared::domain::{GroceryEntry, GroceryList, ListId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayGrouping {
    /// One bucket per supplied list, empty lists included.
    pub buckets: BTreeMap<ListId, Vec<GroceryEntry>>,
    /// Entries on the default list.
    pub listless: Vec<GroceryEntry>,
    /// Entries pointing at a list that was not supplied.
    pub orphaned: Vec<GroceryEntry>,
}

impl DisplayGrouping {
    pub fn entries_for(&self, list_id: ListId) -> &[GroceryEntry] {
        self.buckets
            .get(&list_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

pub fn group(lists: &[GroceryList], entries: &[GroceryEntry]) -> DisplayGrouping {
    let mut grouping = DisplayGrouping {
        buckets: lists.iter().map(|list| (list.id, Vec::new())).collect(),
        ..DisplayGrouping::default()
    };

    for entry in entries {
        match entry.list_id {
            None => grouping.listless.push(entry.clone()),
            Some(list_id) => match grouping.buckets.get_mut(&list_id) {
                Some(bucket) => bucket.push(entry.clone()),
                None => grouping.orphaned.push(entry.clone()),
            },
        }
    }

    grouping
}
