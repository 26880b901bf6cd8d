use std::time::Duration;

use crate::{transport::HttpTransport, Client, Result, Transport};

/// Configuration for [`Client`].
pub struct ClientConfig<'a> {
    pub(crate) token: String,
    pub(crate) project: String,
    pub(crate) channel: Option<String>,
    pub(crate) base_url: String,
    pub(crate) timeout: Option<Duration>,
    pub(crate) transport: Option<Box<dyn Transport + Send + Sync + 'a>>,
}

impl<'a> ClientConfig<'a> {
    /// Create a default configuration using the specified API token and project.
    ///
    /// ```
    /// # use logsnag::ClientConfig;
    /// ClientConfig::new("token", "my-project");
    /// ```
    pub fn new(token: impl Into<String>, project: impl Into<String>) -> Self {
        ClientConfig {
            token: token.into(),
            project: project.into(),
            channel: None,
            base_url: ClientConfig::DEFAULT_BASE_URL.to_owned(),
            timeout: None,
            transport: None,
        }
    }

    /// Default base URL for API calls.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.logsnag.com";

    /// Set the channel used by events created with
    /// [`LogEvent::in_default_channel`](crate::LogEvent::in_default_channel).
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Override base URL for API calls. Clients should use the default setting in most cases.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set a timeout for each request made by the built-in HTTP transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the built-in HTTP transport. `base_url` and `timeout` are ignored when a custom
    /// transport is set.
    ///
    /// ```
    /// # use logsnag::{ClientConfig, Request, Response, Result};
    /// let config = ClientConfig::new("token", "my-project").transport(
    ///     |request: &Request| -> Result<Response> {
    ///         println!("{} {}", request.path, request.body);
    ///         Ok(Response::new())
    ///     },
    /// );
    /// ```
    pub fn transport(mut self, transport: impl Transport + Send + Sync + 'a) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Create a new [`Client`] using the specified configuration.
    ///
    /// ```
    /// # use logsnag::{Client, ClientConfig};
    /// let client: Client = ClientConfig::new("token", "my-project").to_client().unwrap();
    /// ```
    pub fn to_client(self) -> Result<Client<'a>> {
        Client::new(self)
    }

    pub(crate) fn build_transport(&mut self) -> Result<Box<dyn Transport + Send + Sync + 'a>> {
        match self.transport.take() {
            Some(transport) => Ok(transport),
            None => Ok(Box::new(HttpTransport::new(&self.base_url, self.timeout)?)),
        }
    }
}
