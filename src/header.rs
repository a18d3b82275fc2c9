//! HTTP header types and header normalization.
//!
//! This module re-exports the [`http::header`] types and provides
//! [`normalize`], which turns the header options of a request into the
//! [`HeaderMap`] to transmit.

use std::fmt;

pub use http::header::*;
use log::{debug, trace};
use url::Url;

use crate::{
    body::{BodyDescriptor, BodyKind},
    ext::UrlExt,
    util::method_has_defined_payload_semantics,
    Error, Options, Value,
};

/// The `user-agent` sent when the caller does not supply one.
pub const DEFAULT_USER_AGENT: &str = concat!("reqopt/", env!("CARGO_PKG_VERSION"));

/// The content codings this build can decode, in preference order.
///
/// ```
/// assert!(reqopt::header::supported_encodings().starts_with(&["gzip", "deflate"]));
/// ```
pub fn supported_encodings() -> &'static [&'static str] {
    #[cfg(feature = "brotli")]
    {
        &["gzip", "deflate", "br"]
    }
    #[cfg(not(feature = "brotli"))]
    {
        &["gzip", "deflate"]
    }
}

/// Produces the headers to transmit for a request.
///
/// Header names are lower-cased, later spellings of the same name winning.
/// A header set to [`Value::Unset`] is left out, which lets a call cancel a
/// default header. A header set to [`Value::Null`] is rejected.
///
/// Unless the caller supplied them (an `Unset` entry counts as supplied):
///
/// - `user-agent` is [`DEFAULT_USER_AGENT`]
/// - `accept-encoding` lists [`supported_encodings`], if decompression is on
/// - `accept` is `application/json` for JSON responses
///
/// `content-type` follows a `json` or `form` option unless the caller sends
/// one; an `Unset` entry does not count here.
///
/// `content-length` is derived from `body`:
///
/// - no body: `0`, for methods that define a payload
/// - string, buffer, or stream of known length: its length in bytes
/// - stream of unknown length: none, the body is sent chunked
/// - multipart form: the encoded length, even over a caller value, along
///   with a `multipart/form-data` content type carrying the boundary
///
/// A caller supplied `content-length` is sent as-is for every other body,
/// even when it does not match the body.
///
/// # Errors
///
/// Fails with a builder error if a header is `Null`, or if a name or value
/// cannot be represented in HTTP.
pub fn normalize(options: &Options, body: &BodyDescriptor) -> crate::Result<HeaderMap> {
    let supplied = options.headers();
    let builder = |source: crate::error::BoxError| Error::builder(source, Some(options.clone()));

    let mut headers = HeaderMap::with_capacity(supplied.len() + 4);
    for (name, value) in supplied.iter() {
        let value = match value {
            Value::Unset => {
                trace!("omitting unset header {name:?}");
                continue;
            }
            Value::Null => return Err(builder(Box::new(NullHeader(name.to_owned())))),
            value => value.to_scalar_string().ok_or_else(|| {
                builder(format!("header {name:?} has a {} value", value.type_name()).into())
            })?,
        };
        let name = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
            .map_err(|e| builder(e.into()))?;
        let value = HeaderValue::try_from(value).map_err(|e| builder(e.into()))?;
        headers.insert(name, value);
    }

    let supplied_any = |name: &HeaderName| supplied.contains_key(name.as_str());

    if !supplied_any(&USER_AGENT) {
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    }

    if options.decompress() && !supplied_any(&ACCEPT_ENCODING) {
        let encodings = supported_encodings().join(", ");
        headers.insert(
            ACCEPT_ENCODING,
            HeaderValue::try_from(encodings).map_err(|e| builder(e.into()))?,
        );
    }

    if options.response_type() == crate::ResponseType::Json && !supplied_any(&ACCEPT) {
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    }

    // Body-derived headers only yield to values actually sent; an `Unset`
    // entry was already dropped above and does not suppress them.
    if let Some(content_type) = options.body_content_type() {
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }

    match body.kind() {
        BodyKind::None => {
            if method_has_defined_payload_semantics(options.method()) {
                headers
                    .entry(CONTENT_LENGTH)
                    .or_insert_with(|| HeaderValue::from(0u64));
            }
        }
        BodyKind::String | BodyKind::Buffer | BodyKind::Stream => {
            if let Some(len) = body.known_length() {
                let entry = headers.entry(CONTENT_LENGTH);
                if let Entry::Occupied(ref caller) = entry {
                    if caller.get().to_str().ok() != Some(len.to_string().as_str()) {
                        debug!(
                            "sending caller content-length {:?} for a body of {len} bytes",
                            caller.get()
                        );
                    }
                }
                entry.or_insert_with(|| HeaderValue::from(len));
            }
        }
        BodyKind::Form { boundary } => {
            if !headers.contains_key(CONTENT_TYPE) {
                let content_type = format!("multipart/form-data; boundary={boundary}");
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::try_from(content_type).map_err(|e| builder(e.into()))?,
                );
            }
            if let Some(len) = body.known_length() {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
            }
        }
    }

    debug!(
        "normalized {} headers for {} {}",
        headers.len(),
        options.method(),
        options.url()
    );
    Ok(headers)
}

/// The `host` header for a request to `url`.
///
/// The port is left out when it is the scheme's default, whether or not the
/// URL spells it out. Returns `None` for URLs without a host.
pub fn host_header(url: &Url) -> Option<HeaderValue> {
    url.host_header()
}

#[derive(Debug)]
struct NullHeader(String);

impl fmt::Display for NullHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Use `Unset` instead of `Null` to delete HTTP headers (header {:?})",
            self.0
        )
    }
}

impl std::error::Error for NullHeader {}
