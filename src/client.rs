use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::{
    key_value::validate_key_value_map,
    payload::{IdentifyPayload, InsightPayload, LogPayload, Parser},
    transport::{Method, Request, Transport},
    ClientConfig, Error, Insight, InsightMutation, InsightValue, LogEvent, Response, Result,
};

const LOG_ENDPOINT: &str = "/v1/log";
const IDENTIFY_ENDPOINT: &str = "/v1/identify";
const INSIGHT_ENDPOINT: &str = "/v1/insight";

/// A client for LogSnag API.
///
/// In order to create a client instance, first create [`ClientConfig`].
///
/// Every operation validates its input before sending anything, issues exactly one blocking
/// request and returns the decoded response body. Nothing is retried.
///
/// # Examples
/// ```
/// # use logsnag::{Client, ClientConfig};
/// let client = Client::new(ClientConfig::new("token", "my-project")).unwrap();
/// ```
pub struct Client<'a> {
    // Shared with every request, so sending doesn't copy the token.
    token: Arc<str>,
    project: String,
    channel: Option<String>,
    transport: Box<dyn Transport + Send + Sync + 'a>,
}

impl<'a> Client<'a> {
    /// Create a new `Client` using the specified configuration.
    pub fn new(mut config: ClientConfig<'a>) -> Result<Self> {
        let transport = config.build_transport()?;
        Ok(Client {
            token: config.token.into(),
            project: config.project,
            channel: config.channel,
            transport,
        })
    }

    /// Publish an event (`POST /v1/log`).
    ///
    /// ```no_run
    /// # use logsnag::{ClientConfig, LogEvent};
    /// # let client = ClientConfig::new("token", "my-project").to_client()?;
    /// client.log_event(LogEvent::new("deploys", "Deployed v2").tag("env", "prod"))?;
    /// # Ok::<(), logsnag::Error>(())
    /// ```
    pub fn log_event(&self, event: LogEvent) -> Result<Response> {
        let payload = self.log_payload(&event).inspect_err(|err| {
            log::warn!(target: "logsnag", event = event.event.as_str(); "rejected event: {}", err);
        })?;
        self.send(Method::Post, LOG_ENDPOINT, &payload)
    }

    fn log_payload<'b>(&'b self, event: &'b LogEvent) -> Result<LogPayload<'b>> {
        let channel = event
            .channel
            .as_deref()
            .or(self.channel.as_deref())
            .unwrap_or_default();
        if channel.is_empty() {
            return Err(Error::invalid_message(
                "A channel must be provided, either on the event or as the client default.",
            ));
        }
        if event.event.is_empty() {
            return Err(Error::invalid_message("The event name must not be empty."));
        }

        let tags = event
            .tags
            .as_ref()
            .map(|tags| validate_key_value_map("tags", tags.iter().cloned()))
            .transpose()?;

        let parser = event
            .parser
            .as_deref()
            .map(str::parse::<Parser>)
            .transpose()?;

        if let Some(timestamp) = event.timestamp {
            if timestamp < 0 {
                return Err(Error::invalid_message(format!(
                    "The timestamp [{timestamp}] is not a valid UNIX timestamp."
                )));
            }
        }

        Ok(LogPayload {
            project: &self.project,
            channel,
            event: &event.event,
            user_id: event.user_id.as_deref(),
            description: event.description.as_deref(),
            icon: event.icon.as_deref(),
            notify: event.notify,
            tags,
            parser,
            timestamp: event.timestamp,
        })
    }

    /// Identify a user and attach properties to their profile (`POST /v1/identify`).
    ///
    /// Property keys may only contain lowercase letters and hyphens; values must be null or a
    /// scalar and are sent as strings.
    pub fn identify<I, K, V>(&self, user_id: &str, properties: I) -> Result<Response>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let properties = validate_key_value_map("properties", properties).inspect_err(|err| {
            log::warn!(target: "logsnag", user_id; "rejected identify: {}", err);
        })?;

        let payload = IdentifyPayload {
            project: &self.project,
            user_id,
            properties,
        };
        self.send(Method::Post, IDENTIFY_ENDPOINT, &payload)
    }

    /// Publish the current value of an insight (`POST /v1/insight`).
    ///
    /// Fails with [`Error::InvalidMessage`] if the value is a NaN or infinite float, which JSON
    /// cannot represent.
    pub fn insight(&self, insight: Insight) -> Result<Response> {
        if let InsightValue::Float(value) = insight.value {
            if !value.is_finite() {
                log::warn!(target: "logsnag", title = insight.title.as_str(); "rejected non-finite insight value");
                return Err(Error::invalid_message(format!(
                    "The value [{value}] of the insight [{}] is not a finite number.",
                    insight.title
                )));
            }
        }

        let payload = InsightPayload {
            project: &self.project,
            title: &insight.title,
            value: &insight.value,
            icon: insight.icon.as_deref(),
        };
        self.send(Method::Post, INSIGHT_ENDPOINT, &payload)
    }

    /// Change an insight relative to its current value (`PATCH /v1/insight`).
    ///
    /// Fails with [`Error::InvalidMessage`] if no mutation was set.
    pub fn insight_mutate(&self, mutation: InsightMutation) -> Result<Response> {
        if mutation.mutations.is_empty() {
            log::warn!(target: "logsnag", title = mutation.title.as_str(); "rejected insight mutation without mutations");
            return Err(Error::invalid_message("At least one mutation must be provided."));
        }

        let payload = InsightPayload {
            project: &self.project,
            title: &mutation.title,
            value: &mutation.mutations,
            icon: mutation.icon.as_deref(),
        };
        self.send(Method::Patch, INSIGHT_ENDPOINT, &payload)
    }

    fn send(
        &self,
        method: Method,
        path: &'static str,
        payload: &impl Serialize,
    ) -> Result<Response> {
        let request = Request {
            method,
            path,
            token: Arc::clone(&self.token),
            body: serde_json::to_value(payload)?,
        };

        log::debug!(target: "logsnag", method:?, path; "sending request");
        let response = self.transport.send(&request).inspect_err(|err| {
            log::warn!(target: "logsnag", method:?, path; "request failed: {:?}", err);
        })?;
        log::trace!(target: "logsnag", method:?, path, response:serde; "received response");

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value};
    use wiremock::{
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use crate::{
        transport::Method, Client, ClientConfig, Error, Insight, InsightMutation, LogEvent,
        Parser, Request, Response, Result,
    };

    type Sent = Arc<Mutex<Vec<Request>>>;

    fn response() -> Response {
        json!({"id": "evt_1", "ok": true})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn recording_client(config: ClientConfig<'static>) -> (Client<'static>, Sent) {
        let sent = Sent::default();
        let client = {
            let sent = sent.clone();
            config
                .transport(move |request: &Request| -> Result<Response> {
                    sent.lock().unwrap().push(request.clone());
                    Ok(response())
                })
                .to_client()
                .unwrap()
        };
        (client, sent)
    }

    fn client() -> (Client<'static>, Sent) {
        recording_client(ClientConfig::new("secret-token", "acme"))
    }

    fn only_request(sent: &Sent) -> Request {
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        sent[0].clone()
    }

    #[test]
    fn logs_event_with_tags() {
        let (client, sent) = client();

        let result = client
            .log_event(LogEvent::new("deploys", "Deployed v2").tag("env", "prod"))
            .unwrap();

        assert_eq!(result, response());
        let request = only_request(&sent);
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/v1/log");
        assert_eq!(&*request.token, "secret-token");
        assert_eq!(
            request.body,
            json!({
                "project": "acme",
                "channel": "deploys",
                "event": "Deployed v2",
                "tags": {"env": "prod"},
            })
        );
    }

    #[test]
    fn logs_event_with_every_optional_field() {
        let (client, sent) = client();

        client
            .log_event(
                LogEvent::new("payments", "New subscription")
                    .user_id("user-42")
                    .description("**Pro** plan")
                    .icon("💰")
                    .notify(false)
                    .tag("plan", "pro")
                    .tag("seats", 5)
                    .parser(Parser::Markdown)
                    .timestamp(1_700_000_000),
            )
            .unwrap();

        assert_eq!(
            only_request(&sent).body,
            json!({
                "project": "acme",
                "channel": "payments",
                "event": "New subscription",
                "user_id": "user-42",
                "description": "**Pro** plan",
                "icon": "💰",
                "notify": false,
                "tags": {"plan": "pro", "seats": "5"},
                "parser": "markdown",
                "timestamp": 1_700_000_000,
            })
        );
    }

    #[test]
    fn omitted_fields_do_not_appear_in_payload() {
        let (client, sent) = client();

        client.log_event(LogEvent::new("deploys", "Deployed")).unwrap();

        let body = only_request(&sent).body;
        let keys: Vec<&str> = body
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["channel", "event", "project"]);
    }

    #[test]
    fn empty_tags_are_still_sent() {
        let (client, sent) = client();

        client
            .log_event(LogEvent::new("deploys", "Deployed").tags(Vec::<(String, Value)>::new()))
            .unwrap();

        assert_eq!(only_request(&sent).body["tags"], json!({}));
    }

    #[test]
    fn unsupported_parser_is_rejected_before_sending() {
        let (client, sent) = client();

        for parser in ["html", "Markdown", ""] {
            let err = client
                .log_event(LogEvent::new("deploys", "Deployed").parser(parser))
                .unwrap_err();
            assert!(err.is_invalid_message());
        }

        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn text_parser_is_accepted() {
        let (client, sent) = client();

        client
            .log_event(LogEvent::new("deploys", "Deployed").parser("text"))
            .unwrap();

        assert_eq!(only_request(&sent).body["parser"], json!("text"));
    }

    #[test]
    fn negative_timestamp_is_rejected() {
        let (client, sent) = client();

        let err = client
            .log_event(LogEvent::new("deploys", "Deployed").timestamp(-1))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidMessage(message) if message.contains("[-1]")));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn zero_timestamp_is_accepted() {
        let (client, sent) = client();

        client
            .log_event(LogEvent::new("deploys", "Deployed").timestamp(0))
            .unwrap();

        assert_eq!(only_request(&sent).body["timestamp"], json!(0));
    }

    #[test]
    fn invalid_tag_key_is_rejected_before_sending() {
        let (client, sent) = client();

        let err = client
            .log_event(LogEvent::new("deploys", "Deployed").tag("Env", "prod"))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidMessage(message) if message.contains("\"tags\"")));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn non_stringable_tag_value_is_rejected() {
        let (client, sent) = client();

        let err = client
            .log_event(LogEvent::new("deploys", "Deployed").tag("env", json!(["prod"])))
            .unwrap_err();

        assert!(err.is_invalid_message());
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn uses_default_channel() {
        let (client, sent) = recording_client(ClientConfig::new("token", "acme").channel("general"));

        client
            .log_event(LogEvent::in_default_channel("Signed up"))
            .unwrap();
        client
            .log_event(LogEvent::new("deploys", "Deployed"))
            .unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent[0].body["channel"], json!("general"));
        assert_eq!(sent[1].body["channel"], json!("deploys"));
    }

    #[test]
    fn missing_channel_is_rejected() {
        let (client, sent) = client();

        assert!(client
            .log_event(LogEvent::in_default_channel("Signed up"))
            .unwrap_err()
            .is_invalid_message());
        assert!(client
            .log_event(LogEvent::new("", "Signed up"))
            .unwrap_err()
            .is_invalid_message());
        assert!(client
            .log_event(LogEvent::new("users", ""))
            .unwrap_err()
            .is_invalid_message());
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn identifies_user() {
        let (client, sent) = client();

        client.identify("user-42", [("plan", "pro")]).unwrap();

        let request = only_request(&sent);
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/v1/identify");
        assert_eq!(
            request.body,
            json!({
                "project": "acme",
                "user_id": "user-42",
                "properties": {"plan": "pro"},
            })
        );
    }

    #[test]
    fn identify_coerces_property_values() {
        let (client, sent) = client();

        client
            .identify(
                "user-42",
                [("seats", json!(3)), ("trial", json!(true)), ("referrer", Value::Null)],
            )
            .unwrap();

        assert_eq!(
            only_request(&sent).body["properties"],
            json!({"seats": "3", "trial": "1", "referrer": ""})
        );
    }

    #[test]
    fn identify_rejects_invalid_property_key() {
        let (client, sent) = client();

        let err = client
            .identify("user-42", [("signup_date", "2024-01-01")])
            .unwrap_err();

        assert!(
            matches!(err, Error::InvalidMessage(message) if message.contains("[signup_date]") && message.contains("\"properties\""))
        );
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn identify_over_http_accepts_empty_acknowledgement() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/identify"))
            .and(body_json(json!({
                "project": "acme",
                "user_id": "user-42",
                "properties": {"plan": "pro"},
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let base_url = server.uri();
        let response = tokio::task::spawn_blocking(move || {
            ClientConfig::new("token", "acme")
                .base_url(base_url)
                .to_client()?
                .identify("user-42", [("plan", "pro")])
        })
        .await
        .unwrap()
        .unwrap();

        assert!(response.is_empty());
    }

    #[test]
    fn publishes_insight() {
        let (client, sent) = client();

        client
            .insight(Insight::new("Active users", 120).icon("👥"))
            .unwrap();
        client.insight(Insight::new("Uptime", 99.9)).unwrap();
        client.insight(Insight::new("Status", "healthy")).unwrap();

        let sent = sent.lock().unwrap();
        assert!(sent
            .iter()
            .all(|request| request.method == Method::Post && request.path == "/v1/insight"));
        assert_eq!(
            sent[0].body,
            json!({"project": "acme", "title": "Active users", "value": 120, "icon": "👥"})
        );
        assert_eq!(
            sent[1].body,
            json!({"project": "acme", "title": "Uptime", "value": 99.9})
        );
        assert_eq!(sent[2].body["value"], json!("healthy"));
    }

    #[test]
    fn non_finite_insight_value_is_rejected() {
        let (client, sent) = client();

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = client.insight(Insight::new("Uptime", value)).unwrap_err();
            assert!(
                matches!(err, Error::InvalidMessage(message) if message.contains("[Uptime]"))
            );
        }

        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn mutates_insight() {
        let (client, sent) = client();

        client
            .insight_mutate(InsightMutation::new("Active users").inc(5))
            .unwrap();

        let request = only_request(&sent);
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.path, "/v1/insight");
        assert_eq!(
            request.body,
            json!({"project": "acme", "title": "Active users", "value": {"$inc": 5}})
        );
    }

    #[test]
    fn mutation_keeps_icon() {
        let (client, sent) = client();

        client
            .insight_mutate(InsightMutation::new("Active users").inc(-1).icon("👥"))
            .unwrap();

        assert_eq!(only_request(&sent).body["icon"], json!("👥"));
    }

    #[test]
    fn mutation_without_mutations_is_rejected() {
        let (client, sent) = client();

        let err = client
            .insight_mutate(InsightMutation::new("Active users").icon("👥"))
            .unwrap_err();

        assert!(err.is_invalid_message());
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn transport_errors_propagate() {
        let client = ClientConfig::new("token", "acme")
            .transport(|_: &Request| -> Result<Response> {
                Err(Error::HttpStatus {
                    status: 500,
                    body: "internal error".to_owned(),
                })
            })
            .to_client()
            .unwrap();

        let err = client
            .insight(Insight::new("Active users", 1))
            .unwrap_err();

        assert!(err.is_transport_failure());
        assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
    }

    #[test]
    fn can_be_shared_between_threads() {
        let (client, sent) = client();

        std::thread::scope(|scope| {
            for i in 0..4 {
                let client = &client;
                scope.spawn(move || {
                    client
                        .insight_mutate(InsightMutation::new("Requests").inc(i))
                        .unwrap();
                });
            }
        });

        assert_eq!(sent.lock().unwrap().len(), 4);
    }
}
