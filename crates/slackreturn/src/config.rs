use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use toml::{Table, Value};

const DEFAULT_CONFIG_NAME: &str = "slackreturn.toml";

/// Read-only view over the minion-style configuration file.
///
/// Keys are addressed with dots (`slack.channel`, `alternative.slack.api_key`).
/// A dotted key matches either a literal top-level key of that name or the
/// equivalent path through nested tables, so both
/// `"slack.channel" = "#ops"` and `[slack] channel = "#ops"` resolve the same.
#[derive(Debug, Default, Clone)]
pub struct Config {
    table: Table,
}

impl Config {
    /// Load configuration from an explicit path, or search upward from current dir
    /// and then the user config directory.
    pub fn load(path_override: Option<PathBuf>) -> Result<Self> {
        let path = match path_override {
            Some(p) => p,
            None => find_upwards(DEFAULT_CONFIG_NAME)
                .or_else(user_config_file)
                .context("Failed to locate slackreturn.toml in current, parent or user config directories")?,
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Reading config file {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("Parsing TOML config {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let table: Table = toml::from_str(contents)?;
        Ok(Self { table })
    }

    /// Look up a dotted option key.
    pub fn option(&self, key: &str) -> Option<&Value> {
        lookup(&self.table, key)
    }

    /// Look up a dotted key that must name a table (profile blocks).
    pub fn block(&self, key: &str) -> Option<&Table> {
        self.option(key).and_then(Value::as_table)
    }
}

impl From<Table> for Config {
    fn from(table: Table) -> Self {
        Self { table }
    }
}

fn lookup<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    if let Some(value) = table.get(key) {
        return Some(value);
    }
    key.match_indices('.').find_map(|(idx, _)| {
        let (head, rest) = (&key[..idx], &key[idx + 1..]);
        table.get(head)?.as_table().and_then(|t| lookup(t, rest))
    })
}

fn find_upwards(file_name: &str) -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(file_name);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

fn user_config_file() -> Option<PathBuf> {
    let candidate = dirs::config_dir()?
        .join("slackreturn")
        .join(DEFAULT_CONFIG_NAME);
    candidate.exists().then_some(candidate)
}
