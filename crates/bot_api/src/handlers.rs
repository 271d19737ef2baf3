use chrono::Utc;
use grocery::{
    relative_time, render, EntryQuery, ListQuery, ParsedCommand, MAX_TOKEN_CHARS,
};
use shared::{
    domain::{GroceryEntry, GroceryList, GuildId, NewEntry, NewList},
    error::GroceryError,
};
use tracing::{debug, error, info};

use crate::{grohere, BotContext, IncomingMessage};

const HELP_TEXT: &str = "Here's what I can do:
`!gro <item>` add an item (one per line to add several)
`!groremove <n> [<n>...]` or `!groremove <name>` remove items
`!groedit <n> <new name>` rename an item
`!grodeets <n>` show who last touched an item and when
`!groclear` remove everything on a list
`!grolist` show every list
`!grolist new <label> [display name]` create a list
`!grolist:<label> delete` delete a list
`!grolist:<label> edit-name <name>` change a list's display name
`!grohere` post a list that keeps itself up to date
Add `:<label>` to a command to work on a named list, e.g. `!gro:amazon PS5`.";

pub(crate) async fn dispatch(
    ctx: &BotContext,
    msg: &IncomingMessage,
    cmd: &ParsedCommand,
) -> Result<Option<String>, GroceryError> {
    let reply = match cmd.command.as_str() {
        "!grohelp" => HELP_TEXT.to_string(),
        "!gro" => add_items(ctx, msg, cmd).await?,
        "!groremove" => remove_items(ctx, msg, cmd).await?,
        "!groedit" => edit_item(ctx, msg, cmd).await?,
        "!grodeets" => item_details(ctx, msg, cmd).await?,
        "!groclear" => clear_list(ctx, msg, cmd).await?,
        "!grolist" => list_command(ctx, msg, cmd).await?,
        "!grohere" => {
            grohere::post(ctx, msg, &cmd.label).await?;
            return Ok(None);
        }
        other => {
            debug!(command = %other, "ignoring unknown command");
            return Ok(None);
        }
    };
    Ok(Some(reply))
}

/// Looks up the list a command addresses; `None` is the default list.
async fn resolve_list(
    ctx: &BotContext,
    guild_id: GuildId,
    label: &str,
) -> Result<Option<GroceryList>, GroceryError> {
    if label.is_empty() {
        return Ok(None);
    }
    let found = ctx
        .store
        .find_lists(&ListQuery::label(guild_id, label))
        .await?;
    match found.into_iter().next() {
        Some(list) => Ok(Some(list)),
        None => Err(GroceryError::ListNotFound(label.to_string())),
    }
}

async fn entries_on(
    ctx: &BotContext,
    guild_id: GuildId,
    list: Option<&GroceryList>,
) -> Result<Vec<GroceryEntry>, GroceryError> {
    let query = EntryQuery::for_list(guild_id, list.map(|list| list.id));
    Ok(ctx.store.find_entries(&query).await?)
}

fn list_phrase(list: Option<&GroceryList>) -> String {
    match list {
        Some(list) => format!("the `{}` list", list.label),
        None => "your grocery list".to_string(),
    }
}

/// Renders one list (`label` set) or the whole guild, forwarding orphans to
/// the reconciliation worker.
pub(crate) async fn render_for(
    ctx: &BotContext,
    guild_id: GuildId,
    label: &str,
) -> Result<String, GroceryError> {
    let (text, orphaned) = match resolve_list(ctx, guild_id, label).await? {
        Some(list) => {
            let entries = entries_on(ctx, guild_id, Some(&list)).await?;
            render(std::slice::from_ref(&list), &entries, true)
        }
        None => {
            let lists = ctx.store.find_lists(&ListQuery::guild(guild_id)).await?;
            let entries = ctx.store.find_entries(&EntryQuery::guild(guild_id)).await?;
            render(&lists, &entries, false)
        }
    };

    if !orphaned.is_empty() {
        debug!(%guild_id, count = orphaned.len(), "found orphaned entries while rendering");
        ctx.reconciler.submit(orphaned);
    }
    Ok(text)
}

/// Parses 1-based item numbers and checks them against `len`.
/// `None` when any token isn't a number, so the caller can match by name.
fn parse_positions(
    args: &str,
    len: usize,
    phrase: &str,
) -> Option<Result<Vec<usize>, GroceryError>> {
    let mut positions = Vec::new();
    for token in args.split_whitespace() {
        let position: usize = token.parse().ok()?;
        if position == 0 || position > len {
            return Some(Err(GroceryError::usage(format!(
                "Hmm, I can't find item #{position} on {phrase}."
            ))));
        }
        if !positions.contains(&position) {
            positions.push(position);
        }
    }
    Some(Ok(positions))
}

async fn add_items(
    ctx: &BotContext,
    msg: &IncomingMessage,
    cmd: &ParsedCommand,
) -> Result<String, GroceryError> {
    let items: Vec<&str> = cmd
        .args
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if items.is_empty() {
        return Err(GroceryError::usage(
            "Tell me what to add, e.g. `!gro milk`. Put each item on its own line to add several.",
        ));
    }

    let list = resolve_list(ctx, msg.guild_id, &cmd.label).await?;
    let new_entries = items
        .iter()
        .map(|description| NewEntry {
            guild_id: msg.guild_id,
            description: description.to_string(),
            list_id: list.as_ref().map(|list| list.id),
            updated_by: msg.author.clone(),
        })
        .collect();
    let created = ctx.store.create_entries(new_entries).await?;
    grohere::refresh(ctx, msg.guild_id).await;

    let phrase = list_phrase(list.as_ref());
    Ok(match created.as_slice() {
        [one] => format!("Added *{}* to {phrase}.", one.description),
        many => format!("Added {} items to {phrase}.", many.len()),
    })
}

async fn remove_items(
    ctx: &BotContext,
    msg: &IncomingMessage,
    cmd: &ParsedCommand,
) -> Result<String, GroceryError> {
    let args = cmd.args.trim();
    if args.is_empty() {
        return Err(GroceryError::usage(
            "Tell me what to remove, e.g. `!groremove 1 3` or `!groremove milk`.",
        ));
    }

    let list = resolve_list(ctx, msg.guild_id, &cmd.label).await?;
    let phrase = list_phrase(list.as_ref());
    let entries = entries_on(ctx, msg.guild_id, list.as_ref()).await?;

    let doomed: Vec<&GroceryEntry> = match parse_positions(args, entries.len(), &phrase) {
        Some(positions) => positions?
            .into_iter()
            .map(|position| &entries[position - 1])
            .collect(),
        None => {
            let needle = args.to_lowercase();
            let found = entries
                .iter()
                .find(|entry| entry.description.to_lowercase() == needle)
                .ok_or_else(|| {
                    GroceryError::usage(format!("Hmm, I can't find *{args}* on {phrase}."))
                })?;
            vec![found]
        }
    };

    for entry in &doomed {
        ctx.store.delete_entry(entry).await?;
    }
    grohere::refresh(ctx, msg.guild_id).await;

    Ok(match doomed.as_slice() {
        [one] => format!("Deleted *{}* off {phrase}.", one.description),
        many => format!("Deleted {} items off {phrase}.", many.len()),
    })
}

async fn edit_item(
    ctx: &BotContext,
    msg: &IncomingMessage,
    cmd: &ParsedCommand,
) -> Result<String, GroceryError> {
    let usage =
        || GroceryError::usage("Usage: `!groedit <n> <new name>`, e.g. `!groedit 2 oat milk`.");
    let (position, new_description) = cmd
        .args
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(usage)?;
    let position: usize = position.parse().map_err(|_| usage())?;
    let new_description = new_description.trim();
    if new_description.is_empty() {
        return Err(usage());
    }

    let list = resolve_list(ctx, msg.guild_id, &cmd.label).await?;
    let phrase = list_phrase(list.as_ref());
    let entries = entries_on(ctx, msg.guild_id, list.as_ref()).await?;
    let Some(entry) = position.checked_sub(1).and_then(|idx| entries.get(idx)) else {
        return Err(GroceryError::usage(format!(
            "Hmm, I can't find item #{position} on {phrase}."
        )));
    };

    let mut updated = entry.clone();
    updated.description = new_description.to_string();
    updated.updated_by = msg.author.clone();
    updated.updated_at = Utc::now();
    ctx.store.update_entry(&updated).await?;
    grohere::refresh(ctx, msg.guild_id).await;

    Ok(format!(
        "Updated item #{position} on {phrase} to *{new_description}*."
    ))
}

async fn item_details(
    ctx: &BotContext,
    msg: &IncomingMessage,
    cmd: &ParsedCommand,
) -> Result<String, GroceryError> {
    let position: usize = cmd
        .args
        .trim()
        .parse()
        .map_err(|_| GroceryError::usage("Usage: `!grodeets <n>`, e.g. `!grodeets 1`."))?;

    let list = resolve_list(ctx, msg.guild_id, &cmd.label).await?;
    let phrase = list_phrase(list.as_ref());
    let entries = entries_on(ctx, msg.guild_id, list.as_ref()).await?;
    let Some(entry) = position.checked_sub(1).and_then(|idx| entries.get(idx)) else {
        return Err(GroceryError::usage(format!(
            "Hmm, I can't find item #{position} on {phrase}."
        )));
    };

    let now = Utc::now();
    Ok(format!(
        "Item #{position} on {phrase}: *{}*\nAdded {}, last updated by {} {}.",
        entry.description,
        relative_time(entry.created_at, now),
        entry.updated_by,
        relative_time(entry.updated_at, now),
    ))
}

async fn clear_list(
    ctx: &BotContext,
    msg: &IncomingMessage,
    cmd: &ParsedCommand,
) -> Result<String, GroceryError> {
    let list = resolve_list(ctx, msg.guild_id, &cmd.label).await?;
    let phrase = list_phrase(list.as_ref());
    let query = EntryQuery::for_list(msg.guild_id, list.as_ref().map(|list| list.id));
    let removed = ctx.store.delete_entries(&query).await?;
    if removed == 0 {
        return Ok(format!("Nothing to clear, {phrase} is already empty."));
    }
    grohere::refresh(ctx, msg.guild_id).await;

    let plural = if removed == 1 { "" } else { "s" };
    Ok(format!("Deleted {removed} item{plural} off {phrase}."))
}

async fn list_command(
    ctx: &BotContext,
    msg: &IncomingMessage,
    cmd: &ParsedCommand,
) -> Result<String, GroceryError> {
    let args = cmd.args.trim();
    let (action, rest) = args
        .split_once(char::is_whitespace)
        .map(|(action, rest)| (action, rest.trim()))
        .unwrap_or((args, ""));

    match action {
        "" => render_for(ctx, msg.guild_id, &cmd.label).await,
        "new" => create_list(ctx, msg, cmd, rest).await,
        "delete" => delete_list(ctx, msg, cmd).await,
        "edit-name" => rename_list(ctx, msg, cmd, rest).await,
        other => Err(GroceryError::usage(format!(
            "I don't know how to `{other}` a list. Try `new`, `delete` or `edit-name`."
        ))),
    }
}

fn validate_label(label: &str) -> Result<(), GroceryError> {
    if label.is_empty() || !label.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(GroceryError::usage(
            "List labels can only contain the letters a-z and A-Z, e.g. `!grolist new amazon`.",
        ));
    }
    if label.chars().count() > MAX_TOKEN_CHARS {
        return Err(GroceryError::usage(format!(
            "List labels can be at most {MAX_TOKEN_CHARS} letters long."
        )));
    }
    Ok(())
}

async fn create_list(
    ctx: &BotContext,
    msg: &IncomingMessage,
    cmd: &ParsedCommand,
    rest: &str,
) -> Result<String, GroceryError> {
    if cmd.has_label() {
        return Err(GroceryError::usage(
            "Create lists with `!grolist new <label> [display name]`.",
        ));
    }
    let (label, display_name) = rest
        .split_once(char::is_whitespace)
        .map(|(label, name)| (label, name.trim()))
        .unwrap_or((rest, ""));
    validate_label(label)?;

    let existing = ctx
        .store
        .find_lists(&ListQuery::label(msg.guild_id, label))
        .await?;
    if !existing.is_empty() {
        return Err(GroceryError::usage(format!(
            "A list called `{label}` already exists."
        )));
    }

    let display_name = (!display_name.is_empty()).then(|| display_name.to_string());
    let list = ctx
        .store
        .create_list(NewList {
            guild_id: msg.guild_id,
            label: label.to_string(),
            display_name,
        })
        .await?;
    info!(guild_id = %msg.guild_id, label = %list.label, "created grocery list");
    grohere::refresh(ctx, msg.guild_id).await;

    Ok(format!(
        "Created *{}*. Add to it with `!gro:{} <item>`.",
        list.title(),
        list.label
    ))
}

async fn delete_list(
    ctx: &BotContext,
    msg: &IncomingMessage,
    cmd: &ParsedCommand,
) -> Result<String, GroceryError> {
    if !cmd.has_label() {
        return Err(GroceryError::usage(
            "Say which list to delete, e.g. `!grolist:amazon delete`.",
        ));
    }
    let Some(list) = resolve_list(ctx, msg.guild_id, &cmd.label).await? else {
        return Err(GroceryError::ListNotFound(cmd.label.clone()));
    };

    let stranded = entries_on(ctx, msg.guild_id, Some(&list)).await?;
    ctx.store.delete_list(list.id).await?;
    info!(
        guild_id = %msg.guild_id,
        label = %list.label,
        stranded = stranded.len(),
        "deleted grocery list"
    );
    ctx.reconciler.submit(stranded);

    // the list is gone either way; a stale binding unbinds itself on the next refresh
    if let Err(error) = ctx
        .store
        .delete_grohere(msg.guild_id, Some(list.label.clone()))
        .await
    {
        error!(
            guild_id = %msg.guild_id,
            label = %list.label,
            ?error,
            "failed to remove grohere binding"
        );
    }
    grohere::refresh(ctx, msg.guild_id).await;

    Ok(format!("Deleted the `{}` list.", list.label))
}

async fn rename_list(
    ctx: &BotContext,
    msg: &IncomingMessage,
    cmd: &ParsedCommand,
    new_name: &str,
) -> Result<String, GroceryError> {
    if !cmd.has_label() || new_name.is_empty() {
        return Err(GroceryError::usage(
            "Usage: `!grolist:<label> edit-name <new name>`.",
        ));
    }
    let Some(mut list) = resolve_list(ctx, msg.guild_id, &cmd.label).await? else {
        return Err(GroceryError::ListNotFound(cmd.label.clone()));
    };

    list.display_name = Some(new_name.to_string());
    ctx.store.update_list(&list).await?;
    grohere::refresh(ctx, msg.guild_id).await;

    Ok(format!("Renamed `{}` to *{new_name}*.", list.label))
}
