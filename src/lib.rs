#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # reqopt
//!
//! The `reqopt` crate is the configuration core of an HTTP client: the part
//! that decides *what* is sent, leaving *how* to a transport.
//!
//! - [Options merging](#merging-options) across client defaults, instance
//!   options and per-call options
//! - [Header normalization](#headers): case folding, encoding negotiation,
//!   `content-length` derivation and header deletion
//! - A closed [error taxonomy](#errors) every transport, retry, redirect and
//!   decoding layer reports through
//!
//! ## Merging options
//!
//! Options are open bags of [`Value`]s. Nested maps merge recursively, lists
//! replace wholesale and a string merged onto a [`Url`] is resolved against
//! it.
//!
//! ```rust
//! use reqopt::{merged, Map, Url, Value};
//!
//! let base = Map::new()
//!     .with("url", Url::parse("https://example.com/api/")?)
//!     .with("retry", Map::new().with("limit", 2));
//! let call = Map::new()
//!     .with("url", "users")
//!     .with("retry", Map::new().with("methods", vec!["GET"]));
//!
//! let options = merged([&base, &call]);
//! assert_eq!(
//!     options.get("url").and_then(Value::as_url).map(Url::as_str),
//!     Some("https://example.com/api/users")
//! );
//! assert_eq!(options.get("retry").and_then(Value::as_map).map(Map::len), Some(2));
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! Most callers go through [`Defaults`], which also lower-cases header names
//! so that differently cased spellings of one header collide.
//!
//! ## Headers
//!
//! [`Options::normalized_headers`] produces the [`HeaderMap`] to transmit.
//! A header set to [`Value::Unset`] is removed, which lets one call cancel a
//! default header:
//!
//! ```rust
//! use reqopt::{header, Defaults, Map, Value};
//!
//! let options = Defaults::new().options(
//!     &Map::new()
//!         .with("url", "https://example.com/")
//!         .with("method", "PUT")
//!         .with("headers", Map::new().with("User-Agent", Value::Unset)),
//! )?;
//!
//! let headers = options.normalized_headers()?;
//! assert!(!headers.contains_key(header::USER_AGENT));
//! assert_eq!(headers[header::CONTENT_LENGTH], "0");
//! # Ok::<_, reqopt::Error>(())
//! ```
//!
//! ## Errors
//!
//! Every failure is one [`Error`], built once with the request's [`Options`]
//! and, where one was received, its [`Response`]:
//!
//! ```rust
//! use reqopt::{Defaults, Error, Map, Response, StatusCode};
//!
//! let options = Defaults::new().options(&Map::new().with("url", "https://example.com/"))?;
//! let response = Response::new(StatusCode::SERVICE_UNAVAILABLE, options.url().clone());
//! let err = Error::http(response, options);
//!
//! assert_eq!(err.to_string(), "Response code 503 (Service Unavailable)");
//! assert!(err.is_retryable());
//! # Ok::<_, reqopt::Error>(())
//! ```
//!
//! ## Optional Features
//!
//! - **brotli**: Advertises `br` in the default `accept-encoding`.
//! - **stream**: Adds [`Body::file`], a stream body with a known length.

pub use http::{HeaderMap, Method, StatusCode, Version};
pub use url::Url;

pub use self::body::{Body, BodyDescriptor, BodyKind, BodyStream};
pub use self::error::{BoxError, Error, Kind, Result, TIMEOUT_CODE};
pub use self::ext::ResponseBuilderExt;
pub use self::into_url::IntoUrl;
pub use self::merge::{merge, merged};
pub use self::options::{
    merge_options, Defaults, DefaultsBuilder, Options, ResponseType, RetryOptions, Timeouts,
};
pub use self::response::Response;
pub use self::timings::{Phases, TimeoutEvent, Timings};
pub use self::value::{Map, Value};

mod body;
mod error;
mod ext;
pub mod header;
mod into_url;
mod merge;
pub mod multipart;
mod options;
mod response;
mod sync;
mod timings;
mod util;
mod value;

fn _assert_impls() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    fn assert_clone<T: Clone>() {}

    assert_send::<Options>();
    assert_sync::<Options>();
    assert_clone::<Options>();

    assert_send::<Defaults>();
    assert_sync::<Defaults>();

    assert_send::<Value>();
    assert_sync::<Value>();
    assert_clone::<Value>();

    assert_send::<Body>();
    assert_sync::<Body>();

    assert_send::<Error>();
    assert_sync::<Error>();

    assert_send::<Response>();
    assert_sync::<Response>();
}
