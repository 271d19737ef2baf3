use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use grocery::{EntryQuery, ListQuery};
use shared::{
    domain::{
        GroHereBinding, GroceryEntry, GroceryList, ListId, MessageId, NewEntry, NewList,
    },
    error::MessagingError,
};
use storage::Storage;

use super::*;
use crate::messaging::MockMessagingClient;

const GUILD: GuildId = GuildId(1);
const CHANNEL: ChannelId = ChannelId(10);

fn setup(messenger: MockMessagingClient) -> (BotContext, Storage) {
    let storage = Storage::new();
    let ctx = BotContext::new(
        Arc::new(storage.clone()),
        Arc::new(messenger),
        ReconcileConfig {
            queue_capacity: 32,
            idle_timeout: Duration::from_millis(20),
        },
    );
    (ctx, storage)
}

fn message_from(author: &str, content: &str) -> IncomingMessage {
    IncomingMessage {
        guild_id: GUILD,
        channel_id: CHANNEL,
        author: author.to_string(),
        content: content.to_string(),
    }
}

async fn reply(ctx: &BotContext, content: &str) -> String {
    process_message(ctx, &message_from("alice", content))
        .await
        .unwrap_or_else(|| panic!("{content:?} should get a reply"))
}

async fn descriptions(storage: &Storage) -> Vec<String> {
    storage
        .find_entries(&EntryQuery::guild(GUILD))
        .await
        .expect("entries")
        .into_iter()
        .map(|entry| entry.description)
        .collect()
}

async fn wait_for_reconciler(ctx: &BotContext) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while ctx.reconciler.is_draining() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("reconciler should go idle");
}

#[tokio::test]
async fn adds_to_the_default_list() {
    let (ctx, storage) = setup(MockMessagingClient::new());

    let text = reply(&ctx, "!gro Chicken wings").await;

    assert_eq!(text, "Added *Chicken wings* to your grocery list.");
    let entries = storage
        .find_entries(&EntryQuery::guild(GUILD))
        .await
        .expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].list_id, None);
    assert_eq!(entries[0].updated_by, "alice");
}

#[tokio::test]
async fn adds_one_item_per_line() {
    let (ctx, storage) = setup(MockMessagingClient::new());

    let text = reply(&ctx, "!gro milk\neggs\n\n  bread  ").await;

    assert_eq!(text, "Added 3 items to your grocery list.");
    assert_eq!(descriptions(&storage).await, ["milk", "eggs", "bread"]);
}

#[tokio::test]
async fn add_without_items_explains_usage() {
    let (ctx, storage) = setup(MockMessagingClient::new());

    let text = reply(&ctx, "!gro   ").await;

    assert!(text.contains("Tell me what to add"), "got: {text}");
    assert!(descriptions(&storage).await.is_empty());
}

#[tokio::test]
async fn unknown_label_is_reported_as_not_found() {
    let (ctx, storage) = setup(MockMessagingClient::new());

    let text = reply(&ctx, "!gro:amazon PS5").await;

    assert!(text.contains("can't find a list called `amazon`"), "got: {text}");
    assert!(descriptions(&storage).await.is_empty());
}

#[tokio::test]
async fn overlong_command_gets_its_own_reply() {
    let (ctx, _) = setup(MockMessagingClient::new());

    let text = reply(&ctx, &format!("!gro:{} milk", "a".repeat(40))).await;

    assert_eq!(text, "Sorry, that command is too long.");
}

#[tokio::test]
async fn ignores_chatter_and_unknown_commands() {
    let (ctx, _) = setup(MockMessagingClient::new());

    for content in ["hello there", "!help", "!groceries please", "!gro:a:b milk"] {
        assert!(
            process_message(&ctx, &message_from("alice", content))
                .await
                .is_none(),
            "{content:?} should be ignored"
        );
    }
}

#[tokio::test]
async fn help_lists_commands() {
    let (ctx, _) = setup(MockMessagingClient::new());

    let text = reply(&ctx, "!grohelp").await;

    assert!(text.contains("!groremove"));
    assert!(text.contains("!grolist new"));
}

#[tokio::test]
async fn grolist_numbers_each_section_from_one() {
    let (ctx, _) = setup(MockMessagingClient::new());
    reply(&ctx, "!grolist new amazon").await;
    reply(&ctx, "!gro milk").await;
    reply(&ctx, "!gro:amazon PS5\nSwitch").await;

    let text = reply(&ctx, "!grolist").await;

    assert!(
        text.starts_with("Here's your grocery list:\n1: milk\n\n**amazon**\n1: PS5\n2: Switch"),
        "got: {text}"
    );
    assert!(text.contains("*Last updated by alice, just now.*"), "got: {text}");
}

#[tokio::test]
async fn grolist_with_label_renders_only_that_list() {
    let (ctx, _) = setup(MockMessagingClient::new());
    reply(&ctx, "!grolist new amazon Amazon wishlist").await;
    reply(&ctx, "!gro milk").await;
    reply(&ctx, "!gro:amazon PS5").await;

    let text = reply(&ctx, "!grolist:amazon").await;

    assert!(text.starts_with("**Amazon wishlist (amazon)**\n1: PS5"), "got: {text}");
    assert!(!text.contains("milk"));
    assert!(!text.contains("Here's your grocery list"));
}

#[tokio::test]
async fn grolist_on_an_empty_guild() {
    let (ctx, _) = setup(MockMessagingClient::new());

    let text = reply(&ctx, "!grolist").await;

    assert_eq!(text, grocery::render::EMPTY_MESSAGE);
}

#[tokio::test]
async fn removes_by_position_and_by_name() {
    let (ctx, storage) = setup(MockMessagingClient::new());
    reply(&ctx, "!gro milk\neggs\nbread\nham").await;

    let text = reply(&ctx, "!groremove 1 3").await;
    assert_eq!(text, "Deleted 2 items off your grocery list.");
    assert_eq!(descriptions(&storage).await, ["eggs", "ham"]);

    let text = reply(&ctx, "!groremove EGGS").await;
    assert_eq!(text, "Deleted *eggs* off your grocery list.");
    assert_eq!(descriptions(&storage).await, ["ham"]);
}

#[tokio::test]
async fn remove_rejects_unknown_positions_and_names() {
    let (ctx, storage) = setup(MockMessagingClient::new());
    reply(&ctx, "!gro milk").await;

    let text = reply(&ctx, "!groremove 1 5").await;
    assert!(text.contains("can't find item #5"), "got: {text}");

    let text = reply(&ctx, "!groremove caviar").await;
    assert!(text.contains("can't find *caviar*"), "got: {text}");

    assert_eq!(descriptions(&storage).await, ["milk"]);
}

#[tokio::test]
async fn remove_positions_are_scoped_to_the_addressed_list() {
    let (ctx, storage) = setup(MockMessagingClient::new());
    reply(&ctx, "!grolist new amazon").await;
    reply(&ctx, "!gro milk").await;
    reply(&ctx, "!gro:amazon PS5").await;

    let text = reply(&ctx, "!groremove:amazon 1").await;

    assert_eq!(text, "Deleted *PS5* off the `amazon` list.");
    assert_eq!(descriptions(&storage).await, ["milk"]);
}

#[tokio::test]
async fn edit_replaces_description_and_editor() {
    let (ctx, storage) = setup(MockMessagingClient::new());
    reply(&ctx, "!gro milk\neggs").await;

    let text = process_message(&ctx, &message_from("bob", "!groedit 1 oat milk"))
        .await
        .expect("reply");

    assert_eq!(text, "Updated item #1 on your grocery list to *oat milk*.");
    let entries = storage
        .find_entries(&EntryQuery::guild(GUILD))
        .await
        .expect("entries");
    assert_eq!(entries[0].description, "oat milk");
    assert_eq!(entries[0].updated_by, "bob");
    assert!(entries[0].updated_at >= entries[0].created_at);
}

#[tokio::test]
async fn edit_requires_position_and_text() {
    let (ctx, _) = setup(MockMessagingClient::new());
    reply(&ctx, "!gro milk").await;

    for content in ["!groedit", "!groedit 1", "!groedit one oat milk"] {
        let text = reply(&ctx, content).await;
        assert!(text.starts_with("Usage: `!groedit"), "{content:?} got: {text}");
    }
    let text = reply(&ctx, "!groedit 4 oat milk").await;
    assert!(text.contains("can't find item #4"), "got: {text}");
}

#[tokio::test]
async fn deets_show_the_last_editor() {
    let (ctx, _) = setup(MockMessagingClient::new());
    reply(&ctx, "!gro milk").await;

    let text = reply(&ctx, "!grodeets 1").await;

    assert!(text.starts_with("Item #1 on your grocery list: *milk*"), "got: {text}");
    assert!(text.contains("last updated by alice"), "got: {text}");
}

#[tokio::test]
async fn clear_only_touches_the_addressed_list() {
    let (ctx, storage) = setup(MockMessagingClient::new());
    reply(&ctx, "!grolist new amazon").await;
    reply(&ctx, "!gro milk").await;
    reply(&ctx, "!gro:amazon PS5\nSwitch").await;

    let text = reply(&ctx, "!groclear:amazon").await;
    assert_eq!(text, "Deleted 2 items off the `amazon` list.");
    assert_eq!(descriptions(&storage).await, ["milk"]);

    let text = reply(&ctx, "!groclear:amazon").await;
    assert_eq!(text, "Nothing to clear, the `amazon` list is already empty.");
}

#[tokio::test]
async fn new_list_validates_its_label() {
    let (ctx, storage) = setup(MockMessagingClient::new());

    let text = reply(&ctx, "!grolist new amazon Amazon wishlist").await;
    assert_eq!(text, "Created *Amazon wishlist*. Add to it with `!gro:amazon <item>`.");

    let text = reply(&ctx, "!grolist new amazon").await;
    assert!(text.contains("already exists"), "got: {text}");

    for content in ["!grolist new", "!grolist new ama2on", "!grolist new amazön"] {
        let text = reply(&ctx, content).await;
        assert!(text.contains("letters a-z"), "{content:?} got: {text}");
    }

    let text = reply(&ctx, &format!("!grolist new {}", "a".repeat(31))).await;
    assert!(text.contains("at most 30"), "got: {text}");

    let text = reply(&ctx, "!grolist:amazon new costco").await;
    assert!(text.starts_with("Create lists with"), "got: {text}");

    let lists = storage
        .find_lists(&ListQuery::guild(GUILD))
        .await
        .expect("lists");
    assert_eq!(lists.len(), 1);
}

#[tokio::test]
async fn deleting_a_list_cleans_up_its_entries_in_the_background() {
    let (ctx, storage) = setup(MockMessagingClient::new());
    reply(&ctx, "!grolist new amazon").await;
    reply(&ctx, "!gro milk").await;
    reply(&ctx, "!gro:amazon PS5\nSwitch").await;

    let text = reply(&ctx, "!grolist:amazon delete").await;
    assert_eq!(text, "Deleted the `amazon` list.");

    wait_for_reconciler(&ctx).await;
    assert_eq!(descriptions(&storage).await, ["milk"]);
    let text = reply(&ctx, "!gro:amazon PS5").await;
    assert!(text.contains("can't find a list called `amazon`"), "got: {text}");
}

#[tokio::test]
async fn delete_requires_a_label() {
    let (ctx, _) = setup(MockMessagingClient::new());

    let text = reply(&ctx, "!grolist delete").await;

    assert!(text.contains("Say which list to delete"), "got: {text}");
}

#[tokio::test]
async fn grolist_forwards_orphans_to_the_reconciler() {
    let (ctx, storage) = setup(MockMessagingClient::new());
    storage
        .create_entries(vec![
            NewEntry {
                guild_id: GUILD,
                description: "milk".to_string(),
                list_id: None,
                updated_by: "alice".to_string(),
            },
            NewEntry {
                guild_id: GUILD,
                description: "stranded".to_string(),
                list_id: Some(ListId(404)),
                updated_by: "alice".to_string(),
            },
        ])
        .await
        .expect("entries");

    let text = reply(&ctx, "!grolist").await;

    assert!(!text.contains("stranded"), "got: {text}");
    assert_eq!(ctx.reconciler.drains_started(), 1);
    wait_for_reconciler(&ctx).await;
    assert_eq!(descriptions(&storage).await, ["milk"]);
}

#[tokio::test]
async fn edit_name_changes_the_header() {
    let (ctx, _) = setup(MockMessagingClient::new());
    reply(&ctx, "!grolist new amazon").await;

    let text = reply(&ctx, "!grolist:amazon edit-name Amazon wishlist").await;
    assert_eq!(text, "Renamed `amazon` to *Amazon wishlist*.");

    let text = reply(&ctx, "!grolist:amazon").await;
    assert!(text.starts_with("**Amazon wishlist (amazon)**"), "got: {text}");
}

#[tokio::test]
async fn unknown_list_action_is_explained() {
    let (ctx, _) = setup(MockMessagingClient::new());

    let text = reply(&ctx, "!grolist archive").await;

    assert!(text.contains("`archive`"), "got: {text}");
}

#[tokio::test]
async fn grohere_posts_then_edits_on_change() {
    let mut messenger = MockMessagingClient::new();
    messenger
        .expect_send_message()
        .times(1)
        .returning(|_, _| Ok(MessageId(500)));
    messenger
        .expect_edit_message()
        .withf(|channel, message, text| {
            *channel == CHANNEL && *message == MessageId(500) && text.contains("1: eggs")
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    let (ctx, storage) = setup(messenger);

    assert!(process_message(&ctx, &message_from("alice", "!grohere"))
        .await
        .is_none());
    assert_eq!(
        storage.find_grohere(GUILD).await.expect("bindings"),
        vec![GroHereBinding {
            guild_id: GUILD,
            channel_id: CHANNEL,
            message_id: MessageId(500),
            list_label: None,
        }]
    );

    reply(&ctx, "!gro eggs").await;
}

#[tokio::test]
async fn grohere_binding_is_dropped_when_message_is_gone() {
    let mut messenger = MockMessagingClient::new();
    messenger
        .expect_send_message()
        .times(1)
        .returning(|_, _| Ok(MessageId(500)));
    messenger
        .expect_edit_message()
        .times(1)
        .returning(|_, _, _| Err(MessagingError::TargetGone));
    let (ctx, storage) = setup(messenger);

    process_message(&ctx, &message_from("alice", "!grohere")).await;
    reply(&ctx, "!gro eggs").await;
    assert!(storage.find_grohere(GUILD).await.expect("bindings").is_empty());

    // no binding left, so no further edits
    reply(&ctx, "!gro ham").await;
}

#[tokio::test]
async fn labeled_grohere_is_unbound_when_its_list_is_deleted() {
    let mut messenger = MockMessagingClient::new();
    messenger
        .expect_send_message()
        .times(1)
        .returning(|_, _| Ok(MessageId(7)));
    messenger
        .expect_edit_message()
        .withf(|_, _, text| text.starts_with("**amazon**"))
        .times(1)
        .returning(|_, _, _| Ok(()));
    let (ctx, storage) = setup(messenger);
    reply(&ctx, "!grolist new amazon").await;

    process_message(&ctx, &message_from("alice", "!grohere:amazon")).await;
    reply(&ctx, "!gro:amazon PS5").await;
    reply(&ctx, "!grolist:amazon delete").await;

    assert!(storage.find_grohere(GUILD).await.expect("bindings").is_empty());
}

#[tokio::test]
async fn handle_message_sends_exactly_one_reply() {
    let mut messenger = MockMessagingClient::new();
    messenger
        .expect_send_message()
        .withf(|channel, text| *channel == CHANNEL && text.starts_with("Added *milk*"))
        .times(1)
        .returning(|_, _| Ok(MessageId(1)));
    let (ctx, _) = setup(messenger);

    handle_message(&ctx, &message_from("alice", "!gro milk")).await;
}

#[tokio::test]
async fn handle_message_stays_quiet_for_chatter() {
    let mut messenger = MockMessagingClient::new();
    messenger.expect_send_message().never();
    let (ctx, _) = setup(messenger);

    handle_message(&ctx, &message_from("alice", "what's for dinner?")).await;
}

#[tokio::test]
async fn handle_message_survives_send_failures() {
    let mut messenger = MockMessagingClient::new();
    messenger
        .expect_send_message()
        .times(1)
        .returning(|_, _| Err(MessagingError::Other("rate limited".into())));
    let (ctx, storage) = setup(messenger);

    handle_message(&ctx, &message_from("alice", "!gro milk")).await;

    assert_eq!(descriptions(&storage).await, ["milk"]);
}

struct OfflineStore;

#[async_trait]
impl GroceryStore for OfflineStore {
    async fn list_exists(&self, _: ListId) -> anyhow::Result<bool> {
        Err(anyhow!("store offline"))
    }
    async fn delete_entry(&self, _: &GroceryEntry) -> anyhow::Result<()> {
        Err(anyhow!("store offline"))
    }
    async fn find_entries(&self, _: &EntryQuery) -> anyhow::Result<Vec<GroceryEntry>> {
        Err(anyhow!("store offline"))
    }
    async fn find_lists(&self, _: &ListQuery) -> anyhow::Result<Vec<GroceryList>> {
        Err(anyhow!("store offline"))
    }
    async fn create_entries(&self, _: Vec<NewEntry>) -> anyhow::Result<Vec<GroceryEntry>> {
        Err(anyhow!("store offline"))
    }
    async fn update_entry(&self, _: &GroceryEntry) -> anyhow::Result<()> {
        Err(anyhow!("store offline"))
    }
    async fn delete_entries(&self, _: &EntryQuery) -> anyhow::Result<u64> {
        Err(anyhow!("store offline"))
    }
    async fn create_list(&self, _: NewList) -> anyhow::Result<GroceryList> {
        Err(anyhow!("store offline"))
    }
    async fn update_list(&self, _: &GroceryList) -> anyhow::Result<()> {
        Err(anyhow!("store offline"))
    }
    async fn delete_list(&self, _: ListId) -> anyhow::Result<()> {
        Err(anyhow!("store offline"))
    }
    async fn save_grohere(&self, _: GroHereBinding) -> anyhow::Result<()> {
        Err(anyhow!("store offline"))
    }
    async fn find_grohere(&self, _: GuildId) -> anyhow::Result<Vec<GroHereBinding>> {
        Err(anyhow!("store offline"))
    }
    async fn delete_grohere(&self, _: GuildId, _: Option<String>) -> anyhow::Result<()> {
        Err(anyhow!("store offline"))
    }
}

#[tokio::test]
async fn store_failures_get_a_generic_reply() {
    let ctx = BotContext::new(
        Arc::new(OfflineStore),
        Arc::new(MockMessagingClient::new()),
        ReconcileConfig::default(),
    );

    for content in ["!gro milk", "!grolist", "!gro:amazon PS5"] {
        let text = reply(&ctx, content).await;
        assert!(text.starts_with("Oops, something went wrong"), "{content:?} got: {text}");
        assert!(!text.contains("offline"));
    }
}

/// Storage whose grohere bindings can't be removed.
struct StickyBindingStore(Storage);

#[async_trait]
impl GroceryStore for StickyBindingStore {
    async fn list_exists(&self, list_id: ListId) -> anyhow::Result<bool> {
        self.0.list_exists(list_id).await
    }
    async fn delete_entry(&self, entry: &GroceryEntry) -> anyhow::Result<()> {
        self.0.delete_entry(entry).await
    }
    async fn find_entries(&self, query: &EntryQuery) -> anyhow::Result<Vec<GroceryEntry>> {
        self.0.find_entries(query).await
    }
    async fn find_lists(&self, query: &ListQuery) -> anyhow::Result<Vec<GroceryList>> {
        self.0.find_lists(query).await
    }
    async fn create_entries(&self, entries: Vec<NewEntry>) -> anyhow::Result<Vec<GroceryEntry>> {
        self.0.create_entries(entries).await
    }
    async fn update_entry(&self, entry: &GroceryEntry) -> anyhow::Result<()> {
        self.0.update_entry(entry).await
    }
    async fn delete_entries(&self, query: &EntryQuery) -> anyhow::Result<u64> {
        self.0.delete_entries(query).await
    }
    async fn create_list(&self, list: NewList) -> anyhow::Result<GroceryList> {
        self.0.create_list(list).await
    }
    async fn update_list(&self, list: &GroceryList) -> anyhow::Result<()> {
        self.0.update_list(list).await
    }
    async fn delete_list(&self, list_id: ListId) -> anyhow::Result<()> {
        self.0.delete_list(list_id).await
    }
    async fn save_grohere(&self, binding: GroHereBinding) -> anyhow::Result<()> {
        self.0.save_grohere(binding).await
    }
    async fn find_grohere(&self, guild_id: GuildId) -> anyhow::Result<Vec<GroHereBinding>> {
        self.0.find_grohere(guild_id).await
    }
    async fn delete_grohere(&self, _: GuildId, _: Option<String>) -> anyhow::Result<()> {
        Err(anyhow!("binding table locked"))
    }
}

#[tokio::test]
async fn list_delete_still_queues_cleanup_when_binding_removal_fails() {
    let storage = Storage::new();
    let ctx = BotContext::new(
        Arc::new(StickyBindingStore(storage.clone())),
        Arc::new(MockMessagingClient::new()),
        ReconcileConfig {
            queue_capacity: 32,
            idle_timeout: Duration::from_millis(20),
        },
    );
    reply(&ctx, "!grolist new amazon").await;
    reply(&ctx, "!gro:amazon PS5").await;

    let text = reply(&ctx, "!grolist:amazon delete").await;

    assert_eq!(text, "Deleted the `amazon` list.");
    assert_eq!(ctx.reconciler.drains_started(), 1);
    wait_for_reconciler(&ctx).await;
    assert!(descriptions(&storage).await.is_empty());
}
