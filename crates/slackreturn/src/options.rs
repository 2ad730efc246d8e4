use std::collections::BTreeMap;

use thiserror::Error;
use toml::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::job::JobResult;

/// Name under which this returner's options are namespaced.
pub const VIRTUAL_NAME: &str = "slack";

const DEFAULT_CHANNEL: &str = "#general";

/// Option name -> key inside the primary/alternative block.
const ATTRS: &[(&str, &str)] = &[
    ("slack_profile", "profile"),
    ("channel", "channel"),
    ("username", "username"),
    ("as_user", "as_user"),
    ("api_key", "api_key"),
];

/// Option name -> key inside the profile block.
/// `api_version` is a legacy alias and reads the same key as `api_key`.
const PROFILE_ATTRS: &[(&str, &str)] = &[
    ("from_jid", "from_jid"),
    ("api_key", "api_key"),
    ("api_version", "api_key"),
];

const PROFILE_OPTION: &str = "slack_profile";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("slack.{0} not defined in config")]
    Missing(&'static str),
}

/// Options after layering, before the required-field check.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReturnerOptions {
    values: BTreeMap<String, Value>,
}

impl ReturnerOptions {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Non-empty textual value of an option.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(text)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(flag)
    }
}

/// The four settings a notification cannot be sent without.
#[derive(Clone, PartialEq, Eq)]
pub struct EffectiveOptions {
    pub channel: String,
    pub username: String,
    pub as_user: bool,
    pub api_key: String,
}

impl std::fmt::Debug for EffectiveOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectiveOptions")
            .field("channel", &self.channel)
            .field("username", &self.username)
            .field("as_user", &self.as_user)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl TryFrom<&ReturnerOptions> for EffectiveOptions {
    type Error = OptionsError;

    fn try_from(opts: &ReturnerOptions) -> Result<Self, Self::Error> {
        let channel = opts.text("channel").ok_or(OptionsError::Missing("channel"))?;
        let username = opts
            .text("username")
            .ok_or(OptionsError::Missing("username"))?;
        let as_user = opts.flag("as_user").ok_or(OptionsError::Missing("as_user"))?;
        let api_key = opts.text("api_key").ok_or(OptionsError::Missing("api_key"))?;
        Ok(Self {
            channel,
            username,
            as_user,
            api_key,
        })
    }
}

/// Layer the configuration for one return.
///
/// Per option, highest priority first: the alternative block named by
/// `ret_config`, the profile block, the primary block, the built-in default.
/// `ret_kwargs` on the job result then override everything.
pub fn returner_options(
    config: &Config,
    ret: &JobResult,
    ret_config: Option<&str>,
) -> ReturnerOptions {
    let alternative = |key: &str| {
        ret_config
            .and_then(|alt| config.option(&format!("{alt}.{VIRTUAL_NAME}.{key}")))
            .filter(|v| is_set(v))
    };
    let primary = |key: &str| {
        config
            .option(&format!("{VIRTUAL_NAME}.{key}"))
            .filter(|v| is_set(v))
    };

    let mut direct: BTreeMap<&str, (Option<&Value>, Option<&Value>)> = BTreeMap::new();
    for &(name, key) in ATTRS {
        direct.insert(name, (alternative(key), primary(key)));
    }

    let profile = direct
        .get(PROFILE_OPTION)
        .and_then(|(alt, prim)| alt.or(*prim))
        .and_then(text)
        .map(|name| profile_options(config, &name))
        .unwrap_or_default();

    let mut values: BTreeMap<String, Value> = BTreeMap::new();
    let names = ATTRS
        .iter()
        .map(|(name, _)| *name)
        .chain(PROFILE_ATTRS.iter().map(|(name, _)| *name));
    for name in names {
        if values.contains_key(name) {
            continue;
        }
        let (alt, prim) = direct.get(name).copied().unwrap_or((None, None));
        let value = alt
            .or_else(|| profile.get(name).copied())
            .or(prim)
            .cloned()
            .or_else(|| default_for(name));
        if let Some(value) = value {
            values.insert(name.to_string(), value);
        }
    }

    if let Some(kwargs) = &ret.ret_kwargs {
        for (name, value) in kwargs {
            match Value::try_from(value) {
                Ok(value) if is_set(&value) => {
                    debug!(option = %name, "option overridden by ret_kwargs");
                    values.insert(name.clone(), value);
                }
                _ => {}
            }
        }
    }

    ReturnerOptions { values }
}

/// Resolve the effective options, naming the first missing required field.
pub fn resolve(
    config: &Config,
    ret: &JobResult,
    ret_config: Option<&str>,
) -> Result<EffectiveOptions, OptionsError> {
    EffectiveOptions::try_from(&returner_options(config, ret, ret_config))
}

fn profile_options<'a>(config: &'a Config, profile: &str) -> BTreeMap<&'static str, &'a Value> {
    let Some(block) = config.block(profile) else {
        debug!(%profile, "profile block not found");
        return BTreeMap::new();
    };
    info!(%profile, "Using profile");

    let namespaced = block.get(VIRTUAL_NAME).and_then(Value::as_table);
    PROFILE_ATTRS
        .iter()
        .filter_map(|&(name, key)| {
            block
                .get(&format!("{VIRTUAL_NAME}.{key}"))
                .or_else(|| namespaced.and_then(|t| t.get(key)))
                .or_else(|| block.get(key))
                .filter(|v| is_set(v))
                .map(|v| (name, v))
        })
        .collect()
}

fn default_for(name: &str) -> Option<Value> {
    match name {
        "channel" => Some(Value::String(DEFAULT_CHANNEL.to_string())),
        _ => None,
    }
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Table(t) => !t.is_empty(),
        _ => true,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::Integer(i) => Some(*i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn config(toml: &str) -> Config {
        Config::from_toml(toml).unwrap()
    }

    const PRIMARY: &str = r##"[slack]
channel = "#ops"
username = "salt"
as_user = true
api_key = "primary-key"
"##;

    #[test]
    fn primary_block_resolves() {
        let opts = resolve(&config(PRIMARY), &JobResult::default(), None).unwrap();
        assert_eq!(
            opts,
            EffectiveOptions {
                channel: "#ops".into(),
                username: "salt".into(),
                as_user: true,
                api_key: "primary-key".into(),
            }
        );
    }

    #[test]
    fn channel_defaults_to_general() {
        let cfg = config(
            r#"[slack]
username = "salt"
as_user = true
api_key = "k"
"#,
        );
        let opts = resolve(&cfg, &JobResult::default(), None).unwrap();
        assert_eq!(opts.channel, "#general");
    }

    #[test]
    fn empty_channel_falls_back_to_default() {
        let cfg = config(
            r#"[slack]
channel = ""
username = "salt"
as_user = true
api_key = "k"
"#,
        );
        let opts = resolve(&cfg, &JobResult::default(), None).unwrap();
        assert_eq!(opts.channel, "#general");
    }

    #[test]
    fn missing_fields_reported_in_order() {
        let cfg = config("[slack]\n");
        assert_matches!(
            resolve(&cfg, &JobResult::default(), None),
            Err(OptionsError::Missing("username"))
        );

        let cfg = config(
            r#"[slack]
username = "salt"
api_key = "k"
"#,
        );
        assert_matches!(
            resolve(&cfg, &JobResult::default(), None),
            Err(OptionsError::Missing("as_user"))
        );

        let cfg = config(
            r#"[slack]
username = "salt"
as_user = "yes"
"#,
        );
        assert_matches!(
            resolve(&cfg, &JobResult::default(), None),
            Err(OptionsError::Missing("api_key"))
        );
    }

    #[test]
    fn missing_error_names_config_key() {
        assert_eq!(
            OptionsError::Missing("api_key").to_string(),
            "slack.api_key not defined in config"
        );
    }

    #[test]
    fn alternative_block_wins_and_falls_back_per_field() {
        let cfg = config(&format!(
            r##"{PRIMARY}
[alternative.slack]
channel = "#alerts"
api_key = "alt-key"
"##
        ));
        let opts = resolve(&cfg, &JobResult::default(), Some("alternative")).unwrap();
        assert_eq!(opts.channel, "#alerts");
        assert_eq!(opts.api_key, "alt-key");
        assert_eq!(opts.username, "salt");

        // Without the flag the primary block is used.
        let opts = resolve(&cfg, &JobResult::default(), None).unwrap();
        assert_eq!(opts.channel, "#ops");
    }

    #[test]
    fn profile_supplies_api_key() {
        let cfg = config(
            r#"[slack]
profile = "team"
username = "salt"
as_user = true

[team]
"slack.api_key" = "profile-key"
"#,
        );
        let opts = resolve(&cfg, &JobResult::default(), None).unwrap();
        assert_eq!(opts.api_key, "profile-key");
    }

    #[test]
    fn profile_accepts_bare_and_nested_keys() {
        let cfg = config(
            r#"[slack]
profile = "team"

[team.slack]
api_key = "nested"
from_jid = "bot@example.com"
"#,
        );
        let opts = returner_options(&cfg, &JobResult::default(), None);
        assert_eq!(opts.text("api_key").as_deref(), Some("nested"));
        assert_eq!(opts.text("from_jid").as_deref(), Some("bot@example.com"));

        let cfg = config(
            r#"[slack]
profile = "team"

[team]
api_key = "bare"
"#,
        );
        let opts = returner_options(&cfg, &JobResult::default(), None);
        assert_eq!(opts.text("api_key").as_deref(), Some("bare"));
    }

    #[test]
    fn profile_overrides_primary_block() {
        let cfg = config(&format!(
            r#"{PRIMARY}profile = "team"

[team]
api_key = "profile-key"
"#
        ));
        let opts = resolve(&cfg, &JobResult::default(), None).unwrap();
        assert_eq!(opts.api_key, "profile-key");
    }

    #[test]
    fn alternative_key_not_overridden_by_profile() {
        let cfg = config(&format!(
            r#"{PRIMARY}
[alternative.slack]
profile = "team"
api_key = "alt-key"

[team]
api_key = "profile-key"
"#
        ));
        let opts = resolve(&cfg, &JobResult::default(), Some("alternative")).unwrap();
        assert_eq!(opts.api_key, "alt-key");
    }

    #[test]
    fn api_version_is_alias_of_api_key() {
        let cfg = config(
            r#"[slack]
profile = "team"

[team]
api_key = "shared"
"#,
        );
        let opts = returner_options(&cfg, &JobResult::default(), None);
        assert_eq!(opts.text("api_version"), opts.text("api_key"));
    }

    #[test]
    fn unknown_profile_is_ignored() {
        let cfg = config(&format!("{PRIMARY}profile = \"nope\"\n"));
        let opts = resolve(&cfg, &JobResult::default(), None).unwrap();
        assert_eq!(opts.api_key, "primary-key");
    }

    #[test]
    fn ret_kwargs_override_everything() {
        let ret: JobResult = serde_json::from_value(json!({
            "ret_kwargs": {"channel": "#deploys", "as_user": false, "username": ""}
        }))
        .unwrap();
        let opts = resolve(&config(PRIMARY), &ret, None).unwrap();
        assert_eq!(opts.channel, "#deploys");
        assert!(!opts.as_user);
        assert_eq!(opts.username, "salt");
    }

    #[test]
    fn as_user_accepts_strings() {
        let cfg = config(
            r#"[slack]
username = "salt"
as_user = "False"
api_key = "k"
"#,
        );
        let opts = resolve(&cfg, &JobResult::default(), None).unwrap();
        assert!(!opts.as_user);
    }

    #[test]
    fn debug_output_hides_api_key() {
        let opts = resolve(&config(PRIMARY), &JobResult::default(), None).unwrap();
        let rendered = format!("{opts:?}");
        assert!(!rendered.contains("primary-key"));
        assert!(rendered.contains("#ops"));
    }
}
