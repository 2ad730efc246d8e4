use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One job return as handed over by the orchestration system.
///
/// Only the fields rendered into the message and the two per-call
/// configuration hooks are modelled; anything else in the record is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct JobResult {
    /// Minion id.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub fun: Option<Value>,
    #[serde(default)]
    pub fun_args: Option<Value>,
    #[serde(default)]
    pub jid: Option<Value>,
    #[serde(default, rename = "return")]
    pub return_value: Option<Value>,
    /// Name of the alternative configuration block requested for this return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret_config: Option<String>,
    /// Per-call option overrides; these win over every configuration layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret_kwargs: Option<Map<String, Value>>,
}

impl JobResult {
    /// Read a job result as JSON from `path`, or from stdin when `path` is
    /// `None` or `-`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let contents = match path {
            Some(p) if p != Path::new("-") => fs::read_to_string(p)
                .with_context(|| format!("Reading job result {}", p.display()))?,
            _ => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Reading job result from stdin")?;
                buf
            }
        };
        serde_json::from_str(&contents).context("Parsing job result JSON")
    }
}
