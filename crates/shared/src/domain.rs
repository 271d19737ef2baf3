use std::fmt;

use chrono::{DateTime, Utc};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(GuildId);
id_newtype!(ChannelId);
id_newtype!(MessageId);
id_newtype!(ListId);
id_newtype!(EntryId);

/// One item on a guild's grocery list.
///
/// `list_id == None` places the entry on the guild's default list. A
/// `Some` reference whose list has been deleted is an orphan until the
/// reconciliation worker removes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroceryEntry {
    pub id: EntryId,
    pub guild_id: GuildId,
    pub description: String,
    pub list_id: Option<ListId>,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroceryList {
    pub id: ListId,
    pub guild_id: GuildId,
    pub label: String,
    pub display_name: Option<String>,
}

impl GroceryList {
    /// Display name when set, otherwise the label.
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub guild_id: GuildId,
    pub description: String,
    pub list_id: Option<ListId>,
    pub updated_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewList {
    pub guild_id: GuildId,
    pub label: String,
    pub display_name: Option<String>,
}

/// A posted message that is re-rendered whenever the guild's groceries change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroHereBinding {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub list_label: Option<String>,
}
