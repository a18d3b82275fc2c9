//! Extension utilities.

use http::HeaderValue;
use url::Url;

/// Extension trait for http::response::Builder objects
///
/// Allows the user to attach the request `Url` to an `http::Response`, so
/// [`Response::from_http`](crate::Response::from_http) can recover it.
pub trait ResponseBuilderExt {
    /// A builder method for the `http::response::Builder` type that allows the user to add a `Url`
    /// to the `http::Response`
    fn url(self, url: Url) -> Self;
}

/// Extension type to store the request URL in a response's extensions.
#[derive(Clone)]
pub(crate) struct RequestUrl(pub Url);

/// Extension trait for `Url` helpers.
pub(crate) trait UrlExt {
    /// The `host` header value: the port is left out when it is the scheme's default.
    fn host_header(&self) -> Option<HeaderValue>;
}

// ===== impl ResponseBuilderExt =====

impl ResponseBuilderExt for http::response::Builder {
    fn url(self, url: Url) -> Self {
        self.extension(RequestUrl(url))
    }
}

// ===== impl UrlExt =====

impl UrlExt for Url {
    fn host_header(&self) -> Option<HeaderValue> {
        let host = self.host_str()?;
        // `Url` drops a port equal to the scheme default while parsing, even
        // when it was written out explicitly.
        let value = match self.port() {
            Some(port) => HeaderValue::from_str(&format!("{host}:{port}")),
            None => HeaderValue::from_str(host),
        };
        value.ok()
    }
}
