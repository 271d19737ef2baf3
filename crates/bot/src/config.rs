use std::{fs, io, path::Path, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use grocery::ReconcileConfig;

pub const DEFAULT_CONFIG_PATH: &str = "grocerybot.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub guild_id: i64,
    pub channel_id: i64,
    pub author: String,
    pub reconcile_queue_capacity: usize,
    pub reconcile_idle_timeout_ms: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        let reconcile = ReconcileConfig::default();
        Self {
            guild_id: 1,
            channel_id: 1,
            author: "console".into(),
            reconcile_queue_capacity: reconcile.queue_capacity,
            reconcile_idle_timeout_ms: u64::try_from(reconcile.idle_timeout.as_millis())
                .unwrap_or(u64::MAX),
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            queue_capacity: self.reconcile_queue_capacity,
            idle_timeout: Duration::from_millis(self.reconcile_idle_timeout_ms),
        }
    }
}

/// Defaults, then the TOML file at `path` (a missing file is fine), then the
/// environment.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

/// Overlays a flat TOML table. Values may be written as strings or integers.
pub(crate) fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let table = toml::from_str::<toml::Table>(raw)?;
    let value = |key: &str| -> anyhow::Result<Option<String>> {
        match table.get(key) {
            None => Ok(None),
            Some(toml::Value::String(v)) => Ok(Some(v.clone())),
            Some(toml::Value::Integer(v)) => Ok(Some(v.to_string())),
            Some(other) => Err(anyhow!(
                "`{key}` must be a string or integer, got {}",
                other.type_str()
            )),
        }
    };

    if let Some(v) = value("guild_id")? {
        settings.guild_id = parse_field("guild_id", &v)?;
    }
    if let Some(v) = value("channel_id")? {
        settings.channel_id = parse_field("channel_id", &v)?;
    }
    if let Some(v) = value("author")? {
        settings.author = v;
    }
    if let Some(v) = value("reconcile_queue_capacity")? {
        settings.reconcile_queue_capacity = parse_field("reconcile_queue_capacity", &v)?;
    }
    if let Some(v) = value("reconcile_idle_timeout_ms")? {
        settings.reconcile_idle_timeout_ms = parse_field("reconcile_idle_timeout_ms", &v)?;
    }
    if let Some(v) = value("log_filter")? {
        settings.log_filter = v;
    }
    Ok(())
}

/// `APP__<KEY>` takes precedence over `GROCERYBOT_<KEY>`.
pub(crate) fn apply_env(
    settings: &mut Settings,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    let lookup = |key: &str| {
        var(&format!("APP__{key}")).or_else(|| var(&format!("GROCERYBOT_{key}")))
    };

    if let Some(v) = lookup("GUILD_ID") {
        settings.guild_id = parse_field("GUILD_ID", &v)?;
    }
    if let Some(v) = lookup("CHANNEL_ID") {
        settings.channel_id = parse_field("CHANNEL_ID", &v)?;
    }
    if let Some(v) = lookup("AUTHOR") {
        settings.author = v;
    }
    if let Some(v) = lookup("RECONCILE_QUEUE_CAPACITY") {
        settings.reconcile_queue_capacity = parse_field("RECONCILE_QUEUE_CAPACITY", &v)?;
    }
    if let Some(v) = lookup("RECONCILE_IDLE_TIMEOUT_MS") {
        settings.reconcile_idle_timeout_ms = parse_field("RECONCILE_IDLE_TIMEOUT_MS", &v)?;
    }
    if let Some(v) = lookup("LOG_FILTER") {
        settings.log_filter = v;
    }
    Ok(())
}

fn parse_field<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("`{key}` has invalid value '{raw}'"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
