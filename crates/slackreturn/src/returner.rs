use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::job::JobResult;
use crate::message::{fenced, format_message, ChatMessage};
use crate::options::{resolve, VIRTUAL_NAME};
use crate::slack::SlackClient;

/// Something the orchestration system hands finished job results to.
#[async_trait]
pub trait Returner: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one job result. Failures are logged, never raised.
    async fn returner(&self, ret: &JobResult) -> bool;
}

pub fn returner_from_name(name: &str, config: Config) -> Result<Box<dyn Returner>> {
    match name {
        VIRTUAL_NAME => Ok(Box::new(SlackReturner::new(config))),
        other => anyhow::bail!("Returner '{other}' is not available"),
    }
}

/// Posts job results to a Slack channel.
pub struct SlackReturner {
    config: Config,
    client: SlackClient,
    return_config: Option<String>,
}

impl SlackReturner {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: SlackClient::new(),
            return_config: None,
        }
    }

    pub fn with_client(mut self, client: SlackClient) -> Self {
        self.client = client;
        self
    }

    /// Force an alternative configuration block, overriding any `ret_config`
    /// carried by the job result.
    pub fn with_return_config(mut self, return_config: Option<String>) -> Self {
        self.return_config = return_config;
        self
    }

    /// Format `ret` and post it. Returns `true` only if Slack accepted the message.
    pub async fn notify(&self, ret: &JobResult) -> bool {
        let ret_config = self
            .return_config
            .as_deref()
            .or(ret.ret_config.as_deref());

        let opts = match resolve(&self.config, ret, ret_config) {
            Ok(opts) => opts,
            Err(e) => {
                error!("{e}");
                return false;
            }
        };
        debug!(?opts, ?ret_config, "resolved Slack options");

        let message = ChatMessage {
            channel: opts.channel,
            username: opts.username,
            as_user: opts.as_user,
            text: fenced(&format_message(ret)),
        };

        match self.client.post_message(&message, &opts.api_key).await {
            Ok(channel) => {
                info!(channel = %message.channel, response = %channel, "job result posted to Slack");
                true
            }
            Err(e) => {
                warn!(channel = %message.channel, "Slack notification failed: {e}");
                false
            }
        }
    }
}

#[async_trait]
impl Returner for SlackReturner {
    fn name(&self) -> &str {
        VIRTUAL_NAME
    }

    async fn returner(&self, ret: &JobResult) -> bool {
        self.notify(ret).await
    }
}
