//! Canonical request options.
//!
//! Requests are configured in layers: library defaults, then client instance
//! options, then per-call options. Each layer is a [`Map`]; [`merge_options`]
//! folds them together and [`Options::new`] validates the result into the
//! canonical, immutable form handed to the transport.
//!
//! ```
//! use reqopt::{Defaults, Map, Value};
//!
//! let client = Defaults::builder()
//!     .prefix_url("https://api.example.com/v1/")
//!     .header("X-Api-Key", "secret")
//!     .build()?;
//!
//! let options = client.options(
//!     &Map::new()
//!         .with("url", "users")
//!         .with("headers", Map::new().with("x-api-key", Value::Unset)),
//! )?;
//!
//! assert_eq!(options.url().as_str(), "https://api.example.com/v1/users");
//! assert_eq!(options.headers().get("x-api-key"), Some(&Value::Unset));
//! # Ok::<_, reqopt::Error>(())
//! ```

use std::{borrow::Borrow, fmt, str::FromStr, sync::Arc, time::Duration};

use http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::{
    header,
    into_url::{IntoUrl, IntoUrlSealed},
    merge::merge,
    timings::TimeoutEvent,
    util::fold_header_names,
    Body, Error, Map, Value,
};

/// The validated, fully merged configuration of one request.
///
/// Cheap to clone: clones share the same immutable state.
#[derive(Clone)]
pub struct Options {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    map: Map,
    url: Url,
    method: Method,
    headers: Map,
    body: Body,
    body_content_type: Option<&'static str>,
    decompress: bool,
    response_type: ResponseType,
    follow_redirect: bool,
    max_redirects: u32,
    throw_http_errors: bool,
    timeout: Timeouts,
    retry: RetryOptions,
}

/// How the response body is to be decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// As UTF-8 text.
    #[default]
    Text,
    /// As JSON. Requests advertise `accept: application/json`.
    Json,
    /// As raw bytes.
    Buffer,
}

/// Per-phase timeouts. A phase without a timeout is `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Timeouts {
    lookup: Option<Duration>,
    connect: Option<Duration>,
    secure_connect: Option<Duration>,
    socket: Option<Duration>,
    send: Option<Duration>,
    response: Option<Duration>,
    request: Option<Duration>,
}

/// Which failed requests may be sent again, and how often.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryOptions {
    /// Maximum number of retries.
    pub limit: u32,
    /// Methods that may be retried.
    pub methods: Vec<Method>,
    /// Response statuses that may be retried.
    pub status_codes: Vec<StatusCode>,
    /// Error codes that may be retried.
    pub error_codes: Vec<String>,
}

/// Client-wide default options.
///
/// [`Defaults::new`] holds the library defaults; [`Defaults::extend`] layers
/// client instance options on top, and [`Defaults::options`] merges the
/// per-call options last.
#[derive(Clone, Debug)]
pub struct Defaults {
    options: Map,
}

/// A builder for [`Defaults`].
#[must_use]
#[derive(Debug)]
pub struct DefaultsBuilder {
    config: crate::Result<Map>,
}

/// Merges options bags into a new one, left to right.
///
/// Unlike a bare [`merge`], header names of every source are lower-cased
/// before merging, so `User-Agent` from one layer and `user-agent` from the
/// next address the same header and the later layer wins.
pub fn merge_options<I>(sources: I) -> Map
where
    I: IntoIterator,
    I::Item: Borrow<Map>,
{
    let mut target = Map::new();
    for source in sources {
        let source = source.borrow();
        match source.get("headers") {
            Some(Value::Map(headers)) => {
                let mut folded = source.clone();
                folded.insert("headers", fold_header_names(headers));
                merge(&mut target, [folded]);
            }
            _ => {
                merge(&mut target, [source]);
            }
        }
    }
    target
}

// ===== impl Options =====

impl Options {
    /// Validates a merged options bag.
    ///
    /// # Errors
    ///
    /// Fails with a builder error if:
    ///
    /// - `url` is missing, cannot be parsed or has no host
    /// - `url` starts with a slash while `prefixUrl` is set
    /// - more than one of `body`, `json` and `form` is set
    /// - a recognized field has the wrong type
    pub fn new(map: Map) -> crate::Result<Options> {
        let mut url = resolve_url(&map)?;
        apply_search_params(&mut url, map.get("searchParams"))?;

        let method = match present(&map, "method") {
            None => Method::GET,
            Some(Value::String(method)) => {
                Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                    .map_err(|e| Error::builder(e, None))?
            }
            Some(other) => return Err(invalid("method", "a string", other)),
        };

        let headers = match present(&map, "headers") {
            None => Map::new(),
            Some(Value::Map(headers)) => {
                let headers = fold_header_names(headers);
                for (name, value) in headers.iter() {
                    if !matches!(
                        value,
                        Value::String(_)
                            | Value::Number(_)
                            | Value::Bool(_)
                            | Value::Null
                            | Value::Unset
                    ) {
                        return Err(invalid(
                            &format!("headers.{name}"),
                            "a string",
                            value,
                        ));
                    }
                }
                headers
            }
            Some(other) => return Err(invalid("headers", "a map", other)),
        };

        let (body, body_content_type) = materialize_body(&map)?;

        let response_type = match present(&map, "responseType") {
            None => ResponseType::default(),
            Some(Value::String(s)) => s.parse()?,
            Some(other) => return Err(invalid("responseType", "a string", other)),
        };

        let max_redirects = match present(&map, "maxRedirects") {
            None => 10,
            Some(value) => value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| invalid("maxRedirects", "a non-negative integer", value))?,
        };

        Ok(Options {
            inner: Arc::new(Inner {
                url,
                method,
                headers,
                body,
                body_content_type,
                decompress: flag(&map, "decompress", true)?,
                response_type,
                follow_redirect: flag(&map, "followRedirect", true)?,
                max_redirects,
                throw_http_errors: flag(&map, "throwHttpErrors", true)?,
                timeout: Timeouts::from_value(map.get("timeout"))?,
                retry: RetryOptions::from_value(map.get("retry"))?,
                map,
            }),
        })
    }

    /// The request URL, with `prefixUrl` and `searchParams` applied.
    #[inline]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// The request method.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// The header options, with lower-cased names and sentinels kept.
    ///
    /// Use [`Options::normalized_headers`] for the headers to transmit.
    #[inline]
    pub fn headers(&self) -> &Map {
        &self.inner.headers
    }

    /// The request body, with `json` or `form` already encoded.
    #[inline]
    pub fn body(&self) -> &Body {
        &self.inner.body
    }

    /// Whether responses are decompressed, which also advertises
    /// `accept-encoding`.
    #[inline]
    pub fn decompress(&self) -> bool {
        self.inner.decompress
    }

    /// How the response body is to be decoded.
    #[inline]
    pub fn response_type(&self) -> ResponseType {
        self.inner.response_type
    }

    /// Whether redirects are followed.
    #[inline]
    pub fn follow_redirect(&self) -> bool {
        self.inner.follow_redirect
    }

    /// Maximum number of redirects to follow.
    #[inline]
    pub fn max_redirects(&self) -> u32 {
        self.inner.max_redirects
    }

    /// Whether failed response statuses are reported as errors.
    #[inline]
    pub fn throw_http_errors(&self) -> bool {
        self.inner.throw_http_errors
    }

    /// Per-phase timeouts.
    #[inline]
    pub fn timeout(&self) -> &Timeouts {
        &self.inner.timeout
    }

    /// The retry policy.
    #[inline]
    pub fn retry(&self) -> &RetryOptions {
        &self.inner.retry
    }

    /// A raw field of the merged bag, including fields this crate does not
    /// interpret.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.map.get(key)
    }

    /// The merged bag these options were built from.
    #[inline]
    pub fn as_map(&self) -> &Map {
        &self.inner.map
    }

    /// The headers to transmit, derived from these options and their body.
    ///
    /// See [`header::normalize`].
    pub fn normalized_headers(&self) -> crate::Result<HeaderMap> {
        header::normalize(self, &self.inner.body.descriptor())
    }

    /// The `content-type` implied by a `json` or `form` option.
    #[inline]
    pub(crate) fn body_content_type(&self) -> Option<&'static str> {
        self.inner.body_content_type
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

/// A field's value, with sentinels treated as absent.
fn present<'a>(map: &'a Map, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_unset() && !v.is_null())
}

fn invalid(field: &str, expected: &str, got: &Value) -> Error {
    Error::builder(
        format!("expected `{field}` to be {expected}, got {}", got.type_name()),
        None,
    )
}

fn flag(map: &Map, key: &str, default: bool) -> crate::Result<bool> {
    match present(map, key) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(invalid(key, "a boolean", other)),
    }
}

fn resolve_url(map: &Map) -> crate::Result<Url> {
    let prefix = match present(map, "prefixUrl") {
        None => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.as_str().into_url()?),
        Some(Value::Url(url)) => Some(url.into_url()?),
        Some(other) => return Err(invalid("prefixUrl", "a URL", other)),
    };

    match (present(map, "url"), prefix) {
        (Some(Value::Url(url)), _) => url.into_url(),
        (Some(Value::String(input)), Some(mut prefix)) => {
            if input.starts_with('/') {
                return Err(Error::builder(
                    "`url` must not start with a slash when using `prefixUrl`",
                    None,
                ));
            }
            if !prefix.path().ends_with('/') {
                let path = format!("{}/", prefix.path());
                prefix.set_path(&path);
            }
            prefix
                .join(input)
                .map_err(|e| Error::builder(e, None))?
                .into_url()
        }
        (Some(Value::String(input)), None) => input.as_str().into_url(),
        (None, Some(prefix)) => Ok(prefix),
        (None, None) => Err(Error::builder("missing `url` option", None)),
        (Some(other), _) => Err(invalid("url", "a URL", other)),
    }
}

/// Both forms append to the query already present in `url`.
fn apply_search_params(url: &mut Url, params: Option<&Value>) -> crate::Result<()> {
    match params {
        None | Some(Value::Unset) | Some(Value::Null) => Ok(()),
        Some(Value::String(query)) => {
            let query = query.strip_prefix('?').unwrap_or(query);
            if !query.is_empty() {
                let pairs = url::form_urlencoded::parse(query.as_bytes()).into_owned();
                url.query_pairs_mut().extend_pairs(pairs);
            }
            Ok(())
        }
        Some(Value::Map(params)) => {
            let mut pairs = Vec::with_capacity(params.len());
            for (key, value) in params.iter() {
                if value.is_unset() {
                    continue;
                }
                let value = value.to_scalar_string().ok_or_else(|| {
                    invalid(&format!("searchParams.{key}"), "a scalar", value)
                })?;
                pairs.push((key, value));
            }
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
            Ok(())
        }
        Some(other) => Err(invalid("searchParams", "a map or string", other)),
    }
}

fn materialize_body(map: &Map) -> crate::Result<(Body, Option<&'static str>)> {
    let body = present(map, "body");
    let json = present(map, "json");
    let form = present(map, "form");

    if [body, json, form].iter().filter(|v| v.is_some()).count() > 1 {
        return Err(Error::builder(
            "The `body`, `json` and `form` options are mutually exclusive",
            None,
        ));
    }

    if let Some(body) = body {
        return match body {
            Value::Body(body) => Ok((body.clone(), None)),
            Value::String(s) => Ok((Body::from(s.clone()), None)),
            other => Err(invalid("body", "a body or string", other)),
        };
    }

    if let Some(json) = json {
        let encoded = serde_json::to_string(json).map_err(|e| Error::builder(e, None))?;
        return Ok((Body::from(encoded), Some("application/json")));
    }

    if let Some(form) = form {
        let Value::Map(fields) = form else {
            return Err(invalid("form", "a map", form));
        };
        let encoded = serde_urlencoded::to_string(fields).map_err(|e| Error::builder(e, None))?;
        return Ok((
            Body::from(encoded),
            Some("application/x-www-form-urlencoded"),
        ));
    }

    Ok((Body::empty(), None))
}

// ===== impl ResponseType =====

impl ResponseType {
    /// The name used for the `responseType` option.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Text => "text",
            ResponseType::Json => "json",
            ResponseType::Buffer => "buffer",
        }
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<ResponseType> {
        match s {
            "text" => Ok(ResponseType::Text),
            "json" => Ok(ResponseType::Json),
            "buffer" => Ok(ResponseType::Buffer),
            other => Err(Error::builder(
                format!("unknown `responseType` {other:?}"),
                None,
            )),
        }
    }
}

// ===== impl Timeouts =====

impl Timeouts {
    /// The timeout of `event`, if any.
    pub fn get(&self, event: TimeoutEvent) -> Option<Duration> {
        match event {
            TimeoutEvent::Lookup => self.lookup,
            TimeoutEvent::Connect => self.connect,
            TimeoutEvent::SecureConnect => self.secure_connect,
            TimeoutEvent::Socket => self.socket,
            TimeoutEvent::Send => self.send,
            TimeoutEvent::Response => self.response,
            TimeoutEvent::Request => self.request,
        }
    }

    fn slot(&mut self, event: TimeoutEvent) -> &mut Option<Duration> {
        match event {
            TimeoutEvent::Lookup => &mut self.lookup,
            TimeoutEvent::Connect => &mut self.connect,
            TimeoutEvent::SecureConnect => &mut self.secure_connect,
            TimeoutEvent::Socket => &mut self.socket,
            TimeoutEvent::Send => &mut self.send,
            TimeoutEvent::Response => &mut self.response,
            TimeoutEvent::Request => &mut self.request,
        }
    }

    /// A number is the whole-request timeout in milliseconds; a map gives
    /// milliseconds per phase name.
    fn from_value(value: Option<&Value>) -> crate::Result<Timeouts> {
        let millis = |field: &str, value: &Value| {
            value
                .as_u64()
                .map(Duration::from_millis)
                .ok_or_else(|| invalid(field, "milliseconds", value))
        };

        let mut timeouts = Timeouts::default();
        match value {
            None | Some(Value::Unset) | Some(Value::Null) => {}
            Some(value @ Value::Number(_)) => timeouts.request = Some(millis("timeout", value)?),
            Some(Value::Map(phases)) => {
                for event in TimeoutEvent::ALL {
                    match phases.get(event.as_str()) {
                        None | Some(Value::Unset) => {}
                        Some(value) => {
                            let field = format!("timeout.{event}");
                            *timeouts.slot(event) = Some(millis(&field, value)?);
                        }
                    }
                }
            }
            Some(other) => return Err(invalid("timeout", "a number or map", other)),
        }
        Ok(timeouts)
    }
}

// ===== impl RetryOptions =====

impl Default for RetryOptions {
    fn default() -> RetryOptions {
        RetryOptions {
            limit: 2,
            methods: vec![
                Method::GET,
                Method::PUT,
                Method::HEAD,
                Method::DELETE,
                Method::OPTIONS,
                Method::TRACE,
            ],
            status_codes: [408, 413, 429, 500, 502, 503, 504, 521, 522, 524]
                .into_iter()
                .filter_map(|code| StatusCode::from_u16(code).ok())
                .collect(),
            error_codes: [
                "ETIMEDOUT",
                "ECONNRESET",
                "EADDRINUSE",
                "ECONNREFUSED",
                "EPIPE",
                "ENOTFOUND",
                "ENETUNREACH",
                "EAI_AGAIN",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

impl RetryOptions {
    /// A number is the retry limit; a map may set `limit`, `methods`,
    /// `statusCodes` and `errorCodes`. Missing fields keep their defaults.
    fn from_value(value: Option<&Value>) -> crate::Result<RetryOptions> {
        let mut retry = RetryOptions::default();
        let limit = |value: &Value| {
            value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| invalid("retry.limit", "a non-negative integer", value))
        };

        match value {
            None | Some(Value::Unset) | Some(Value::Null) => {}
            Some(value @ Value::Number(_)) => retry.limit = limit(value)?,
            Some(Value::Map(map)) => {
                if let Some(value) = present(map, "limit") {
                    retry.limit = limit(value)?;
                }
                if let Some(value) = present(map, "methods") {
                    retry.methods = strings("retry.methods", value)?
                        .into_iter()
                        .map(|m| {
                            Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                                .map_err(|e| Error::builder(e, None))
                        })
                        .collect::<crate::Result<_>>()?;
                }
                if let Some(value) = present(map, "statusCodes") {
                    let list = value
                        .as_list()
                        .ok_or_else(|| invalid("retry.statusCodes", "a list of statuses", value))?;
                    retry.status_codes = list
                        .iter()
                        .map(|item| {
                            item.as_u64()
                                .and_then(|n| u16::try_from(n).ok())
                                .and_then(|n| StatusCode::from_u16(n).ok())
                                .ok_or_else(|| {
                                    invalid("retry.statusCodes", "a list of statuses", item)
                                })
                        })
                        .collect::<crate::Result<_>>()?;
                }
                if let Some(value) = present(map, "errorCodes") {
                    retry.error_codes = strings("retry.errorCodes", value)?
                        .into_iter()
                        .map(str::to_owned)
                        .collect();
                }
            }
            Some(other) => return Err(invalid("retry", "a number or map", other)),
        }
        Ok(retry)
    }

    fn to_value(&self) -> Value {
        Value::Map(
            Map::new()
                .with("limit", self.limit)
                .with(
                    "methods",
                    self.methods.iter().map(Method::as_str).collect::<Vec<_>>(),
                )
                .with(
                    "statusCodes",
                    self.status_codes
                        .iter()
                        .map(StatusCode::as_u16)
                        .collect::<Vec<_>>(),
                )
                .with("errorCodes", self.error_codes.clone()),
        )
    }
}

fn strings<'a>(field: &str, value: &'a Value) -> crate::Result<Vec<&'a str>> {
    let list = value
        .as_list()
        .ok_or_else(|| invalid(field, "a list of strings", value))?;
    list.iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| invalid(field, "a list of strings", item))
        })
        .collect()
}

// ===== impl Defaults =====

impl Default for Defaults {
    fn default() -> Defaults {
        Defaults::new()
    }
}

impl Defaults {
    /// The library defaults.
    pub fn new() -> Defaults {
        let options = Map::new()
            .with("method", "GET")
            .with("headers", Map::new())
            .with("decompress", true)
            .with("responseType", ResponseType::default().as_str())
            .with("followRedirect", true)
            .with("maxRedirects", 10)
            .with("throwHttpErrors", true)
            .with("retry", RetryOptions::default().to_value());
        Defaults { options }
    }

    /// Constructs a `DefaultsBuilder` on top of the library defaults.
    pub fn builder() -> DefaultsBuilder {
        DefaultsBuilder {
            config: Ok(Map::new()),
        }
    }

    /// The default options bag.
    #[inline]
    pub fn as_map(&self) -> &Map {
        &self.options
    }

    /// New defaults with `options` merged on top of these.
    pub fn extend(&self, options: &Map) -> Defaults {
        Defaults {
            options: self.merge(options),
        }
    }

    /// Merges per-call `options` on top of these defaults, without
    /// validating the result.
    pub fn merge(&self, options: &Map) -> Map {
        merge_options([&self.options, options])
    }

    /// Merges per-call `options` on top of these defaults and validates the
    /// result.
    pub fn options(&self, options: &Map) -> crate::Result<Options> {
        Options::new(self.merge(options))
    }
}

// ===== impl DefaultsBuilder =====

impl DefaultsBuilder {
    /// Sets a base URL that relative `url` options are resolved against.
    pub fn prefix_url<U: IntoUrl>(self, url: U) -> DefaultsBuilder {
        self.and_then(|map| Ok(map.with("prefixUrl", url.into_url()?)))
    }

    /// Adds a default header. Names are case-insensitive.
    pub fn header<K, V>(self, name: K, value: V) -> DefaultsBuilder
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let name = name.as_ref().to_ascii_lowercase();
        let value = value.into();
        self.and_then(move |mut map| {
            match map.get_mut("headers") {
                Some(Value::Map(headers)) => {
                    headers.insert(name, value);
                }
                _ => {
                    map.insert("headers", Map::new().with(name, value));
                }
            }
            Ok(map)
        })
    }

    /// Sets the `user-agent` header.
    pub fn user_agent<V: Into<String>>(self, value: V) -> DefaultsBuilder {
        self.header(http::header::USER_AGENT, value.into())
    }

    /// Enables or disables response decompression.
    pub fn decompress(self, enable: bool) -> DefaultsBuilder {
        self.option("decompress", enable)
    }

    /// Sets how response bodies are decoded.
    pub fn response_type(self, response_type: ResponseType) -> DefaultsBuilder {
        self.option("responseType", response_type.as_str())
    }

    /// Enables a whole-request timeout.
    pub fn timeout(self, timeout: Duration) -> DefaultsBuilder {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.option("timeout", Map::new().with("request", millis))
    }

    /// Enables or disables following redirects.
    pub fn follow_redirect(self, enable: bool) -> DefaultsBuilder {
        self.option("followRedirect", enable)
    }

    /// Sets the maximum number of redirects to follow.
    pub fn max_redirects(self, max: u32) -> DefaultsBuilder {
        self.option("maxRedirects", max)
    }

    /// Enables or disables reporting failed statuses as errors.
    pub fn throw_http_errors(self, enable: bool) -> DefaultsBuilder {
        self.option("throwHttpErrors", enable)
    }

    /// Sets the retry limit.
    pub fn retry_limit(self, limit: u32) -> DefaultsBuilder {
        self.option("retry", Map::new().with("limit", limit))
    }

    /// Sets any option field, merged like every other layer.
    pub fn option<K, V>(self, key: K, value: V) -> DefaultsBuilder
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let layer = Map::new().with(key, value);
        self.and_then(move |map| Ok(merge_options([&map, &layer])))
    }

    /// Returns the `Defaults` built on top of the library defaults.
    ///
    /// # Errors
    ///
    /// Fails if any builder step received an invalid value.
    pub fn build(self) -> crate::Result<Defaults> {
        Ok(Defaults::new().extend(&self.config?))
    }

    fn and_then<F>(self, f: F) -> DefaultsBuilder
    where
        F: FnOnce(Map) -> crate::Result<Map>,
    {
        DefaultsBuilder {
            config: self.config.and_then(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(map: Map) -> Options {
        Defaults::new().options(&map).unwrap()
    }

    #[test]
    fn library_defaults() {
        let opts = options(Map::new().with("url", "http://example.com/"));
        assert_eq!(opts.method(), &Method::GET);
        assert!(opts.decompress());
        assert_eq!(opts.response_type(), ResponseType::Text);
        assert!(opts.follow_redirect());
        assert_eq!(opts.max_redirects(), 10);
        assert!(opts.throw_http_errors());
        assert_eq!(opts.retry(), &RetryOptions::default());
        assert!(opts.body().is_empty());
        assert_eq!(opts.timeout(), &Timeouts::default());
    }

    #[test]
    fn method_is_upper_cased() {
        let opts = options(Map::new().with("url", "http://a/").with("method", "patch"));
        assert_eq!(opts.method(), &Method::PATCH);
    }

    #[test]
    fn prefix_url_joins() {
        let opts = options(
            Map::new()
                .with("prefixUrl", "https://example.com/api")
                .with("url", "users/1"),
        );
        assert_eq!(opts.url().as_str(), "https://example.com/api/users/1");
    }

    #[test]
    fn prefix_url_rejects_leading_slash() {
        let err = Defaults::new()
            .options(
                &Map::new()
                    .with("prefixUrl", "https://example.com/api/")
                    .with("url", "/users"),
            )
            .unwrap_err();
        assert!(err.is_builder());
    }

    #[test]
    fn url_instance_ignores_prefix() {
        let url = Url::parse("http://other/x").unwrap();
        let opts = options(
            Map::new()
                .with("prefixUrl", "https://example.com/api/")
                .with("url", url.clone()),
        );
        assert_eq!(opts.url(), &url);
    }

    #[test]
    fn missing_url() {
        let err = Defaults::new().options(&Map::new()).unwrap_err();
        assert!(err.is_builder());
        assert_eq!(err.message(), "missing `url` option");
    }

    #[test]
    fn search_params() {
        let opts = options(
            Map::new().with("url", "http://a/path?x=1").with(
                "searchParams",
                Map::new()
                    .with("q", "a b")
                    .with("page", 2)
                    .with("skip", Value::Unset),
            ),
        );
        assert_eq!(opts.url().as_str(), "http://a/path?x=1&q=a+b&page=2");

        let opts = options(
            Map::new()
                .with("url", "http://a/path?x=1")
                .with("searchParams", "?y=2"),
        );
        assert_eq!(opts.url().query(), Some("x=1&y=2"));
    }

    #[test]
    fn search_params_forms_agree() {
        let from_string = options(
            Map::new()
                .with("url", "http://a/p?x=1")
                .with("searchParams", "y=2&z=a+b"),
        );
        let from_map = options(
            Map::new()
                .with("url", "http://a/p?x=1")
                .with("searchParams", Map::new().with("y", "2").with("z", "a b")),
        );
        assert_eq!(from_string.url(), from_map.url());
        assert_eq!(from_map.url().query(), Some("x=1&y=2&z=a+b"));
    }

    #[test]
    fn json_body() {
        let opts = options(
            Map::new()
                .with("url", "http://a/")
                .with("method", "POST")
                .with("json", Map::new().with("lang", "rust")),
        );
        assert_eq!(opts.body().as_bytes(), Some(&br#"{"lang":"rust"}"#[..]));
        assert_eq!(opts.body_content_type(), Some("application/json"));
    }

    #[test]
    fn form_body() {
        let opts = options(
            Map::new()
                .with("url", "http://a/")
                .with("method", "POST")
                .with("form", Map::new().with("foo", "bar").with("baz", "qu ux")),
        );
        assert_eq!(opts.body().as_bytes(), Some(&b"foo=bar&baz=qu+ux"[..]));
        assert_eq!(
            opts.body_content_type(),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn body_options_are_exclusive() {
        let err = Defaults::new()
            .options(
                &Map::new()
                    .with("url", "http://a/")
                    .with("body", "x")
                    .with("json", Map::new()),
            )
            .unwrap_err();
        assert!(err.is_builder());
    }

    #[test]
    fn unset_body_does_not_count() {
        let opts = options(
            Map::new()
                .with("url", "http://a/")
                .with("body", Value::Unset)
                .with("json", vec![1, 2]),
        );
        assert_eq!(opts.body().as_bytes(), Some(&b"[1,2]"[..]));
    }

    #[test]
    fn timeouts() {
        let opts = options(Map::new().with("url", "http://a/").with("timeout", 500));
        assert_eq!(
            opts.timeout().get(TimeoutEvent::Request),
            Some(Duration::from_millis(500))
        );

        let opts = options(
            Map::new()
                .with("url", "http://a/")
                .with("timeout", Map::new().with("connect", 50).with("secureConnect", 70)),
        );
        assert_eq!(
            opts.timeout().get(TimeoutEvent::Connect),
            Some(Duration::from_millis(50))
        );
        assert_eq!(
            opts.timeout().get(TimeoutEvent::SecureConnect),
            Some(Duration::from_millis(70))
        );
        assert_eq!(opts.timeout().get(TimeoutEvent::Request), None);
    }

    #[test]
    fn retry_number_sets_limit() {
        let opts = options(Map::new().with("url", "http://a/").with("retry", 0));
        assert_eq!(opts.retry().limit, 0);
        assert_eq!(opts.retry().methods, RetryOptions::default().methods);
    }

    #[test]
    fn retry_methods_are_replaced() {
        let opts = options(
            Map::new()
                .with("url", "http://a/")
                .with("retry", Map::new().with("methods", vec!["post"])),
        );
        assert_eq!(opts.retry().methods, vec![Method::POST]);
        assert_eq!(opts.retry().limit, 2);
        assert_eq!(opts.retry().status_codes, RetryOptions::default().status_codes);
    }

    #[test]
    fn retry_status_codes() {
        let opts = options(
            Map::new()
                .with("url", "http://a/")
                .with("retry", Map::new().with("statusCodes", vec![503])),
        );
        assert_eq!(opts.retry().status_codes, vec![StatusCode::SERVICE_UNAVAILABLE]);

        let err = Defaults::new()
            .options(
                &Map::new()
                    .with("url", "http://a/")
                    .with("retry", Map::new().with("statusCodes", vec![42])),
            )
            .unwrap_err();
        assert!(err.is_builder());
    }

    #[test]
    fn invalid_types() {
        for (key, value) in [
            ("decompress", Value::from("yes")),
            ("maxRedirects", Value::from(-1)),
            ("responseType", Value::from("xml")),
            ("headers", Value::from(vec!["a"])),
            ("timeout", Value::from("soon")),
        ] {
            let err = Defaults::new()
                .options(&Map::new().with("url", "http://a/").with(key, value))
                .unwrap_err();
            assert!(err.is_builder(), "{key}");
        }
    }

    #[test]
    fn header_names_fold_across_layers() {
        let defaults = Defaults::new().extend(
            &Map::new().with("headers", Map::new().with("User-Agent", "a")),
        );
        let merged = defaults.merge(
            &Map::new().with("headers", Map::new().with("user-agent", Value::Unset)),
        );
        let headers = merged.get("headers").and_then(Value::as_map).unwrap();
        assert_eq!(headers.get("user-agent"), Some(&Value::Unset));
        assert!(!headers.contains_key("User-Agent"));
    }

    #[test]
    fn unknown_fields_are_kept() {
        let opts = options(
            Map::new()
                .with("url", "http://a/")
                .with("hooks", Map::new().with("beforeRequest", vec![Value::Null])),
        );
        assert!(opts.get("hooks").and_then(Value::as_map).is_some());
    }

    #[test]
    fn builder() {
        let defaults = Defaults::builder()
            .prefix_url("http://example.com/v1/")
            .user_agent("my-agent")
            .header("X-Trace", "1")
            .decompress(false)
            .response_type(ResponseType::Json)
            .timeout(Duration::from_secs(1))
            .max_redirects(3)
            .retry_limit(5)
            .build()
            .unwrap();

        let opts = defaults.options(&Map::new().with("url", "items")).unwrap();
        assert_eq!(opts.url().as_str(), "http://example.com/v1/items");
        assert_eq!(opts.headers().get("user-agent"), Some(&Value::from("my-agent")));
        assert_eq!(opts.headers().get("x-trace"), Some(&Value::from("1")));
        assert!(!opts.decompress());
        assert_eq!(opts.response_type(), ResponseType::Json);
        assert_eq!(
            opts.timeout().get(TimeoutEvent::Request),
            Some(Duration::from_secs(1))
        );
        assert_eq!(opts.max_redirects(), 3);
        assert_eq!(opts.retry().limit, 5);
        assert_eq!(opts.retry().methods, RetryOptions::default().methods);
    }

    #[test]
    fn builder_keeps_first_error() {
        let err = Defaults::builder()
            .prefix_url("not a url")
            .header("x", "y")
            .build()
            .unwrap_err();
        assert!(err.is_builder());
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn options_are_send_sync() {
        assert_send_sync::<Options>();
        assert_send_sync::<Defaults>();
    }
}
