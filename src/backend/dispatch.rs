//! The single request pipeline every operation goes through.
//!
//! A call sends exactly one request: no retries, no backoff. The outcome is
//! classified by status code:
//!
//! - 2xx: the body is returned.
//! - 4xx with an `error_code`/`message` body: [`Error::Rejected`].
//! - anything else: [`Error::UnexpectedStatus`], carrying the body.

use crate::api::error::{Error, ErrorResponse, Result};
use crate::backend::{
    config::Verb,
    transport::{HttpRequest, HttpResponse, Transport},
};
use serde::Serialize;

/// Send `payload` to `url` and return the raw body of a successful response.
pub fn dispatch<P>(
    transport: &dyn Transport,
    url: &str,
    verb: Verb,
    payload: Option<&P>,
) -> Result<Vec<u8>>
where
    P: Serialize + ?Sized,
{
    let request = build_request(url, verb, payload)?;
    tracing::debug!(url = %request.url, method = request.method.as_str(), "sending request");
    let response = transport.send(&request).map_err(|source| Error::Transport {
        url: request.url.clone(),
        source,
    })?;
    tracing::debug!(
        url = %request.url,
        status = response.status,
        bytes = response.body.len(),
        "received response"
    );
    classify(response)
}

pub(crate) fn build_request<P>(url: &str, verb: Verb, payload: Option<&P>) -> Result<HttpRequest>
where
    P: Serialize + ?Sized,
{
    let mut url = url.to_owned();
    let mut body = None;
    if let Some(payload) = payload {
        match verb {
            Verb::Get => {
                let query = serde_qs::to_string(&payload).map_err(|err| Error::Serialize(err.into()))?;
                if !query.is_empty() {
                    url.push('?');
                    url.push_str(&query);
                }
            }
            Verb::GetWithBody | Verb::Post => {
                let json = serde_json::to_string(payload).map_err(|err| Error::Serialize(err.into()))?;
                body = Some(json);
            }
        }
    }
    Ok(HttpRequest {
        method: verb.method(),
        url,
        body,
    })
}

/// Sort a response into a success body or an error.
pub fn classify(response: HttpResponse) -> Result<Vec<u8>> {
    let HttpResponse { status, body } = response;
    match status {
        200..=299 => Ok(body),
        400..=499 => match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(rejection) => {
                tracing::warn!(status, code = %rejection.error_code, "request rejected");
                Err(Error::Rejected {
                    status,
                    code: rejection.error_code,
                    message: rejection.message,
                })
            }
            Err(_) => Err(unexpected(status, &body)),
        },
        _ => Err(unexpected(status, &body)),
    }
}

fn unexpected(status: u16, body: &[u8]) -> Error {
    tracing::warn!(status, "unexpected response status");
    Error::UnexpectedStatus {
        status,
        body: String::from_utf8_lossy(body).into_owned(),
    }
}
