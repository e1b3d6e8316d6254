//! Shared HTTP plumbing for provider adapters.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;
use vidstage_common::{Error, Result};

/// Default per-request timeout for provider calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Build a client with the given per-request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))
}

/// Send a request, turning transport failures and non-2xx responses into
/// request errors that carry the status code and response body.
pub(crate) async fn send(operation: &str, request: RequestBuilder) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::transport(operation, e.to_string()))?;

    let status = response.status();
    debug!(operation, status = status.as_u16(), "provider response");
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::request(operation, status.as_u16(), body))
}

/// Read and deserialize a JSON body.
pub(crate) async fn json<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
    let body = bytes(operation, response).await?;
    serde_json::from_slice(&body).map_err(|e| {
        Error::transport(
            operation,
            format!("malformed response body ({e}): {}", String::from_utf8_lossy(&body)),
        )
    })
}

/// Read the full body as bytes.
pub(crate) async fn bytes(operation: &str, response: Response) -> Result<Bytes> {
    response
        .bytes()
        .await
        .map_err(|e| Error::transport(operation, format!("failed to read body: {e}")))
}

/// Parse a configured API root. It must be able to carry path segments.
pub(crate) fn parse_base(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::config(format!("invalid base url {url}: {e}")))?;
    if parsed.cannot_be_a_base() {
        return Err(Error::config(format!("base url cannot carry a path: {url}")));
    }
    Ok(parsed)
}

/// Append `segments` to `base`.
///
/// Each segment is percent-encoded on its own, so a `/`, `?` or `#` inside
/// an id stays part of that segment instead of retargeting the request.
pub(crate) fn endpoint<I>(base: &Url, segments: I) -> Url
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidstage_common::ErrorKind;

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let base = parse_base("https://api.example.com/v1/").unwrap();
        assert_eq!(
            endpoint(&base, ["videos", "video_1", "content"]).as_str(),
            "https://api.example.com/v1/videos/video_1/content"
        );
    }

    #[test]
    fn test_endpoint_encodes_each_segment() {
        let base = parse_base("https://api.example.com/v1").unwrap();
        let url = endpoint(&base, ["videos", "a/../b?x=1#f g"]);
        assert_eq!(url.path(), "/v1/videos/a%2F..%2Fb%3Fx=1%23f%20g");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_parse_base_rejects_non_urls() {
        assert_eq!(parse_base("not a url").unwrap_err().kind(), ErrorKind::Config);
        assert_eq!(parse_base("mailto:ops@example.com").unwrap_err().kind(), ErrorKind::Config);
    }
}
