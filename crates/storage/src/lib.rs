use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use grocery::store::{EntryQuery, GroceryStore, ListFilter, ListQuery};
use shared::domain::{
    EntryId, GroHereBinding, GroceryEntry, GroceryList, GuildId, ListId, NewEntry, NewList,
};
use tokio::sync::RwLock;
use tracing::debug;

/// In-process store for the console bot and tests.
///
/// Rows live in insertion order; each trait call takes the lock once, which
/// gives every call (batches included) all-or-nothing semantics.
#[derive(Clone, Default)]
pub struct Storage {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    entries: Vec<GroceryEntry>,
    lists: Vec<GroceryList>,
    grohere: Vec<GroHereBinding>,
    next_entry_id: i64,
    next_list_id: i64,
}

impl Tables {
    fn allocate_entry_id(&mut self) -> EntryId {
        self.next_entry_id += 1;
        EntryId(self.next_entry_id)
    }

    fn allocate_list_id(&mut self) -> ListId {
        self.next_list_id += 1;
        ListId(self.next_list_id)
    }
}

fn entry_matches(entry: &GroceryEntry, query: &EntryQuery) -> bool {
    entry.guild_id == query.guild_id
        && match query.list {
            ListFilter::Any => true,
            ListFilter::Listless => entry.list_id.is_none(),
            ListFilter::In(list_id) => entry.list_id == Some(list_id),
        }
}

fn list_matches(list: &GroceryList, query: &ListQuery) -> bool {
    list.guild_id == query.guild_id
        && query
            .label
            .as_deref()
            .map_or(true, |label| list.label == label)
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn health_check(&self) -> Result<()> {
        let _tables = self.tables.read().await;
        Ok(())
    }

    pub async fn entry_count(&self, guild_id: GuildId) -> usize {
        self.tables
            .read()
            .await
            .entries
            .iter()
            .filter(|entry| entry.guild_id == guild_id)
            .count()
    }
}

#[async_trait]
impl GroceryStore for Storage {
    async fn list_exists(&self, list_id: ListId) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.lists.iter().any(|list| list.id == list_id))
    }

    async fn delete_entry(&self, entry: &GroceryEntry) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.entries.retain(|row| row.id != entry.id);
        Ok(())
    }

    async fn find_entries(&self, query: &EntryQuery) -> Result<Vec<GroceryEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .iter()
            .filter(|entry| entry_matches(entry, query))
            .cloned()
            .collect())
    }

    async fn find_lists(&self, query: &ListQuery) -> Result<Vec<GroceryList>> {
        let tables = self.tables.read().await;
        Ok(tables
            .lists
            .iter()
            .filter(|list| list_matches(list, query))
            .cloned()
            .collect())
    }

    async fn create_entries(&self, entries: Vec<NewEntry>) -> Result<Vec<GroceryEntry>> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut created = Vec::with_capacity(entries.len());
        for new in entries {
            created.push(GroceryEntry {
                id: tables.allocate_entry_id(),
                guild_id: new.guild_id,
                description: new.description,
                list_id: new.list_id,
                updated_by: new.updated_by,
                created_at: now,
                updated_at: now,
            });
        }
        tables.entries.extend(created.iter().cloned());
        debug!(count = created.len(), "inserted grocery entries");
        Ok(created)
    }

    async fn update_entry(&self, entry: &GroceryEntry) -> Result<()> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.entries.iter_mut().find(|row| row.id == entry.id) else {
            bail!("grocery entry {} does not exist", entry.id);
        };
        *row = entry.clone();
        Ok(())
    }

    async fn delete_entries(&self, query: &EntryQuery) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.entries.len();
        tables.entries.retain(|entry| !entry_matches(entry, query));
        Ok((before - tables.entries.len()) as u64)
    }

    async fn create_list(&self, list: NewList) -> Result<GroceryList> {
        let mut tables = self.tables.write().await;
        if tables
            .lists
            .iter()
            .any(|row| row.guild_id == list.guild_id && row.label == list.label)
        {
            bail!(
                "list label `{}` already exists in guild {}",
                list.label,
                list.guild_id
            );
        }
        let created = GroceryList {
            id: tables.allocate_list_id(),
            guild_id: list.guild_id,
            label: list.label,
            display_name: list.display_name,
        };
        tables.lists.push(created.clone());
        Ok(created)
    }

    async fn update_list(&self, list: &GroceryList) -> Result<()> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.lists.iter_mut().find(|row| row.id == list.id) else {
            bail!("grocery list {} does not exist", list.id);
        };
        *row = list.clone();
        Ok(())
    }

    async fn delete_list(&self, list_id: ListId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.lists.retain(|list| list.id != list_id);
        Ok(())
    }

    async fn save_grohere(&self, binding: GroHereBinding) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.grohere.retain(|row| {
            !(row.guild_id == binding.guild_id && row.list_label == binding.list_label)
        });
        tables.grohere.push(binding);
        Ok(())
    }

    async fn find_grohere(&self, guild_id: GuildId) -> Result<Vec<GroHereBinding>> {
        let tables = self.tables.read().await;
        Ok(tables
            .grohere
            .iter()
            .filter(|row| row.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn delete_grohere(&self, guild_id: GuildId, list_label: Option<String>) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .grohere
            .retain(|row| !(row.guild_id == guild_id && row.list_label == list_label));
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
