use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::message::ChatMessage;

pub const DEFAULT_API_URL: &str = "https://slack.com";

/// Overrides [`DEFAULT_API_URL`], e.g. for a proxy or a local test server.
pub const API_URL_ENV: &str = "SLACKRETURN_API_URL";

/// Web API methods this client knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlackFunction {
    Rooms,
    Users,
    Message,
}

impl SlackFunction {
    /// Path segment under `/api/`.
    pub fn request(self) -> &'static str {
        match self {
            SlackFunction::Rooms => "channels.list",
            SlackFunction::Users => "users.list",
            SlackFunction::Message => "chat.postMessage",
        }
    }

    /// Field of a successful response that carries the payload.
    pub fn response(self) -> &'static str {
        match self {
            SlackFunction::Rooms => "channels",
            SlackFunction::Users => "members",
            SlackFunction::Message => "channel",
        }
    }

    pub fn method(self) -> Method {
        match self {
            SlackFunction::Message => Method::POST,
            SlackFunction::Rooms | SlackFunction::Users => Method::GET,
        }
    }
}

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("No Slack api key found.")]
    MissingApiKey,
    #[error("connection to Slack failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Slack API error: {0}")]
    Api(String),
    #[error("unexpected Slack response (HTTP {status}): {body}")]
    Malformed { status: u16, body: String },
}

/// Outcome of one API call: the response payload, or why the call failed.
/// A `204 No Content` succeeds with `Value::Null`.
pub type QueryResult = Result<Value, SlackError>;

/// Client for the Slack Web API.
#[derive(Debug, Clone)]
pub struct SlackClient {
    base_url: String,
    http: reqwest::Client,
}

impl Default for SlackClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SlackClient {
    /// Client against [`DEFAULT_API_URL`] unless `SLACKRETURN_API_URL` is set.
    pub fn new() -> Self {
        let base_url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::with_base_url(base_url)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Build a full API URL.
    pub fn endpoint(&self, function: SlackFunction) -> String {
        format!(
            "{}/api/{}",
            self.base_url.trim_end_matches('/'),
            function.request()
        )
    }

    /// Call `function` once, authenticating with `api_key` as the `token`
    /// query parameter. `params` go in the form body for POST methods and in
    /// the query string otherwise.
    pub async fn query<P>(&self, function: SlackFunction, api_key: &str, params: &P) -> QueryResult
    where
        P: serde::Serialize + std::fmt::Debug + ?Sized,
    {
        if api_key.is_empty() {
            error!("No Slack api key found.");
            return Err(SlackError::MissingApiKey);
        }

        let url = self.endpoint(function);
        let method = function.method();
        let mut req = self
            .http
            .request(method.clone(), &url)
            .query(&[("token", api_key)]);
        req = if method == Method::POST {
            req.form(params)
        } else {
            req.query(params)
        };

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            debug!(%url, ?params, %status, %body, "unexpected Slack response status");
        }
        classify(function, status, &body)
    }

    /// Send a message to a Slack channel. The payload is the channel id on success.
    pub async fn post_message(&self, message: &ChatMessage, api_key: &str) -> QueryResult {
        let result = self.query(SlackFunction::Message, api_key, message).await;
        debug!(?result, "chat.postMessage result");
        result
    }

    pub async fn list_rooms(&self, api_key: &str) -> QueryResult {
        self.query(SlackFunction::Rooms, api_key, &[] as &[(&str, &str)])
            .await
    }

    pub async fn list_users(&self, api_key: &str) -> QueryResult {
        self.query(SlackFunction::Users, api_key, &[] as &[(&str, &str)])
            .await
    }
}

/// Map an HTTP status and body to a [`QueryResult`].
///
/// `200` must carry JSON; an `error` field fails the call, otherwise the
/// function's payload field is returned. `204` succeeds without payload.
/// Any other status fails on an `error` field or a non-JSON body and
/// otherwise succeeds with the raw body.
pub fn classify(function: SlackFunction, status: StatusCode, body: &str) -> QueryResult {
    let malformed = || SlackError::Malformed {
        status: status.as_u16(),
        body: body.to_string(),
    };

    match status {
        StatusCode::NO_CONTENT => Ok(Value::Null),
        StatusCode::OK => {
            let json: Value = serde_json::from_str(body).map_err(|_| malformed())?;
            if let Some(err) = json.get("error") {
                return Err(SlackError::Api(error_text(err)));
            }
            Ok(json.get(function.response()).cloned().unwrap_or(Value::Null))
        }
        _ => {
            let json: Value = serde_json::from_str(body).map_err(|_| malformed())?;
            match json.get("error") {
                Some(err) => Err(SlackError::Api(error_text(err))),
                None => Ok(Value::String(body.to_string())),
            }
        }
    }
}

fn error_text(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
