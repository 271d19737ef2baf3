use anyhow::Result;
use async_trait::async_trait;
use shared::domain::{
    GroHereBinding, GroceryEntry, GroceryList, GuildId, ListId, NewEntry, NewList,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    Any,
    /// Only entries on the default list.
    Listless,
    In(ListId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    pub guild_id: GuildId,
    pub list: ListFilter,
}

impl EntryQuery {
    pub fn guild(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            list: ListFilter::Any,
        }
    }

    /// Entries of one addressed list: the default list for `None`.
    pub fn for_list(guild_id: GuildId, list_id: Option<ListId>) -> Self {
        Self {
            guild_id,
            list: match list_id {
                Some(id) => ListFilter::In(id),
                None => ListFilter::Listless,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub guild_id: GuildId,
    pub label: Option<String>,
}

impl ListQuery {
    pub fn guild(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            label: None,
        }
    }

    pub fn label(guild_id: GuildId, label: impl Into<String>) -> Self {
        Self {
            guild_id,
            label: Some(label.into()),
        }
    }
}

/// CRUD collaborator behind the bot. Results come back in insertion order and
/// no call retries on its own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroceryStore: Send + Sync {
    async fn list_exists(&self, list_id: ListId) -> Result<bool>;
    async fn delete_entry(&self, entry: &GroceryEntry) -> Result<()>;
    async fn find_entries(&self, query: &EntryQuery) -> Result<Vec<GroceryEntry>>;
    async fn find_lists(&self, query: &ListQuery) -> Result<Vec<GroceryList>>;

    /// Inserts every entry or none of them.
    async fn create_entries(&self, entries: Vec<NewEntry>) -> Result<Vec<GroceryEntry>>;
    async fn update_entry(&self, entry: &GroceryEntry) -> Result<()>;
    async fn delete_entries(&self, query: &EntryQuery) -> Result<u64>;

    async fn create_list(&self, list: NewList) -> Result<GroceryList>;
    async fn update_list(&self, list: &GroceryList) -> Result<()>;
    /// Leaves the list's entries in place; they become orphans.
    async fn delete_list(&self, list_id: ListId) -> Result<()>;

    /// Replaces any binding with the same guild and label.
    async fn save_grohere(&self, binding: GroHereBinding) -> Result<()>;
    async fn find_grohere(&self, guild_id: GuildId) -> Result<Vec<GroHereBinding>>;
    async fn delete_grohere(&self, guild_id: GuildId, list_label: Option<String>) -> Result<()>;
}
