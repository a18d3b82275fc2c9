use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};
use url::Url;

use crate::ext::RequestUrl;

/// A response, complete or partial, as received by the transport.
///
/// Errors that carry a response hold it behind an `Arc`, so observers see the
/// very same value the transport produced.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    url: Url,
    redirect_urls: Vec<Url>,
    body: Bytes,
}

impl Response {
    /// A response with `status` for the request to `url`.
    pub fn new(status: StatusCode, url: Url) -> Response {
        Response {
            status,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            url,
            redirect_urls: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Converts an `http::Response`, taking the URL from the extension set by
    /// [`ResponseBuilderExt::url`](crate::ResponseBuilderExt::url), or `url`
    /// when absent.
    pub fn from_http(response: http::Response<Bytes>, url: Url) -> Response {
        let (mut parts, body) = response.into_parts();
        let url = parts
            .extensions
            .remove::<RequestUrl>()
            .map_or(url, |RequestUrl(url)| url);
        Response {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            url,
            redirect_urls: Vec::new(),
            body,
        }
    }

    /// Sets the headers, builder style.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Response {
        self.headers = headers;
        self
    }

    /// Sets the body read so far, builder style.
    #[must_use]
    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Response {
        self.body = body.into();
        self
    }

    /// Sets the HTTP version, builder style.
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Response {
        self.version = version;
        self
    }

    /// Sets the URLs the request was redirected through, builder style.
    #[must_use]
    pub fn with_redirect_urls(mut self, urls: Vec<Url>) -> Response {
        self.redirect_urls = urls;
        self
    }

    /// Get the `StatusCode` of this `Response`.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The canonical reason phrase of the status, or `"Unknown"`.
    #[inline]
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }

    /// Get the HTTP `Version` of this `Response`.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get the `Headers` of this `Response`.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the final `Url` of this `Response`.
    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URLs followed before this response, oldest first.
    #[inline]
    pub fn redirect_urls(&self) -> &[Url] {
        &self.redirect_urls
    }

    /// The body bytes received so far.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}
