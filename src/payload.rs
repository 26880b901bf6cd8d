use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use derive_more::From;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{key_value::KeyValueMap, Error};

/// An event to publish with [`Client::log_event`](crate::Client::log_event).
///
/// ```
/// # use logsnag::{LogEvent, Parser};
/// let event = LogEvent::new("deploys", "Deployed v2")
///     .icon("🚀")
///     .notify(true)
///     .tag("env", "prod")
///     .parser(Parser::Markdown);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogEvent {
    pub(crate) channel: Option<String>,
    pub(crate) event: String,
    pub(crate) user_id: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) icon: Option<String>,
    pub(crate) notify: Option<bool>,
    pub(crate) tags: Option<Vec<(String, Value)>>,
    pub(crate) parser: Option<String>,
    pub(crate) timestamp: Option<i64>,
}

impl LogEvent {
    /// Create an event published to `channel`.
    pub fn new(channel: impl Into<String>, event: impl Into<String>) -> Self {
        LogEvent {
            channel: Some(channel.into()),
            event: event.into(),
            ..Default::default()
        }
    }

    /// Create an event published to the channel configured with
    /// [`ClientConfig::channel`](crate::ClientConfig::channel).
    pub fn in_default_channel(event: impl Into<String>) -> Self {
        LogEvent {
            event: event.into(),
            ..Default::default()
        }
    }

    /// Override the channel.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Link the event to a user.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Add a longer description, rendered according to [`LogEvent::parser`].
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set an emoji shown next to the event.
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Whether to send a push notification.
    pub fn notify(mut self, notify: bool) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Append a tag. Keys may only contain lowercase letters and hyphens; values must be null
    /// or a scalar. Both are checked when the event is sent.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    /// Append several tags at once. An empty iterator still sends an empty `tags` object.
    pub fn tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.tags
            .get_or_insert_with(Vec::new)
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the description parser. Anything other than `"markdown"` or `"text"` is rejected
    /// when the event is sent.
    pub fn parser(mut self, parser: impl Into<String>) -> Self {
        self.parser = Some(parser.into());
        self
    }

    /// Set a UNIX timestamp (seconds) for historical data. Must not be negative.
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the timestamp from a UTC datetime, truncated to whole seconds.
    pub fn timestamp_at(self, time: DateTime<Utc>) -> Self {
        self.timestamp(time.timestamp())
    }
}

/// Supported description parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parser {
    /// Render the description as Markdown.
    Markdown,
    /// Show the description as plain text.
    Text,
}

impl Parser {
    /// The wire name of the parser.
    pub fn as_str(&self) -> &'static str {
        match self {
            Parser::Markdown => "markdown",
            Parser::Text => "text",
        }
    }
}

impl fmt::Display for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parser {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markdown" => Ok(Parser::Markdown),
            "text" => Ok(Parser::Text),
            other => Err(Error::invalid_message(format!(
                "The parser [{other}] is not supported. Supported parsers are \"markdown\" and \"text\"."
            ))),
        }
    }
}

impl From<Parser> for String {
    fn from(value: Parser) -> Self {
        value.as_str().to_owned()
    }
}

/// The value of an insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum InsightValue {
    /// Free-form text.
    String(String),
    /// Whole number.
    Integer(i64),
    /// Floating-point number. Must be finite.
    Float(f64),
}

impl From<&str> for InsightValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i32> for InsightValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

/// An insight to publish with [`Client::insight`](crate::Client::insight).
#[derive(Debug, Clone)]
pub struct Insight {
    pub(crate) title: String,
    pub(crate) value: InsightValue,
    pub(crate) icon: Option<String>,
}

impl Insight {
    /// Create an insight named `title` with the given value.
    pub fn new(title: impl Into<String>, value: impl Into<InsightValue>) -> Self {
        Insight {
            title: title.into(),
            value: value.into(),
            icon: None,
        }
    }

    /// Set an emoji shown next to the insight.
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// A relative change to an existing insight, sent with
/// [`Client::insight_mutate`](crate::Client::insight_mutate).
///
/// At least one mutation must be set, otherwise the call is rejected.
///
/// ```
/// # use logsnag::InsightMutation;
/// let mutation = InsightMutation::new("Active users").inc(1);
/// ```
#[derive(Debug, Clone)]
pub struct InsightMutation {
    pub(crate) title: String,
    pub(crate) mutations: MutationSet,
    pub(crate) icon: Option<String>,
}

impl InsightMutation {
    /// Create a mutation of the insight named `title`. Add at least one mutation before sending.
    pub fn new(title: impl Into<String>) -> Self {
        InsightMutation {
            title: title.into(),
            mutations: MutationSet::default(),
            icon: None,
        }
    }

    /// Increase (or, with a negative value, decrease) the insight.
    pub fn inc(mut self, by: i64) -> Self {
        self.mutations.inc = Some(by);
        self
    }

    /// Set an emoji shown next to the insight.
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct MutationSet {
    #[serde(rename = "$inc", skip_serializing_if = "Option::is_none")]
    pub inc: Option<i64>,
}

impl MutationSet {
    pub fn is_empty(&self) -> bool {
        self.inc.is_none()
    }
}

// Wire payloads. Unset optional fields are skipped so no null-valued keys reach the server.

#[derive(Debug, Serialize)]
pub(crate) struct LogPayload<'a> {
    pub project: &'a str,
    pub channel: &'a str,
    pub event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<KeyValueMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser: Option<Parser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IdentifyPayload<'a> {
    pub project: &'a str,
    pub user_id: &'a str,
    pub properties: KeyValueMap,
}

#[derive(Debug, Serialize)]
pub(crate) struct InsightPayload<'a, V> {
    pub project: &'a str,
    pub title: &'a str,
    pub value: &'a V,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'a str>,
}
