//! The HTTP seam: one request in, one response out.

use crate::api::error::TransportError;
use std::{io::Read, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// JSON body, if any.
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends requests. Any status code, including 4xx and 5xx, is a response;
/// only a failed exchange is an error.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] over a shared `ureq::Agent`, which pools connections.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Wrap a caller-built agent. It must be built with `.redirects(0)`,
    /// otherwise ureq follows 3xx responses with further requests.
    pub fn new(agent: ureq::Agent) -> Self {
        UreqTransport { agent }
    }

    pub(crate) fn with_timeouts(
        timeout: Option<Duration>,
        connect_timeout: Option<Duration>,
        user_agent: &str,
    ) -> Self {
        let mut builder = ureq::AgentBuilder::new()
            .user_agent(user_agent)
            .redirects(0);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = connect_timeout {
            builder = builder.timeout_connect(timeout);
        }
        UreqTransport::new(builder.build())
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let call = self.agent.request(request.method.as_str(), &request.url);
        let result = match &request.body {
            Some(body) => call
                .set("Content-Type", "application/json")
                .send_string(body),
            None => call.call(),
        };
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => return Err(transport.into()),
        };
        let status = response.status();
        let mut body = Vec::new();
        response.into_reader().read_to_end(&mut body)?;
        Ok(HttpResponse { status, body })
    }
}

impl From<ureq::Transport> for TransportError {
    fn from(transport: ureq::Transport) -> Self {
        use ureq::ErrorKind;
        match transport.kind() {
            ErrorKind::InvalidUrl | ErrorKind::UnknownScheme => {
                TransportError::InvalidUrl(transport.to_string())
            }
            ErrorKind::Dns | ErrorKind::ConnectionFailed => {
                TransportError::Connection(transport.to_string())
            }
            _ => TransportError::Other(transport.to_string()),
        }
    }
}
