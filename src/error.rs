use std::{error::Error as StdError, fmt, io, sync::Arc, time::Duration};

use log::debug;
use url::Url;

use crate::{
    timings::{TimeoutEvent, Timings},
    Options, Response,
};

/// A `Result` alias where the `Err` case is `reqopt::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// A boxed error type that can be used for dynamic error handling.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The code carried by every [`Kind::Timeout`] error.
pub const TIMEOUT_CODE: &str = "ETIMEDOUT";

/// The single error type reported for every failure of a request.
///
/// Each error is built exactly once, at the site that detected the failure,
/// and is never re-classified afterwards. It keeps the canonical
/// [`Options`] of the request and, for response-bearing kinds, the
/// [`Response`] received so far. Match on [`Error::kind`] to branch:
///
/// ```
/// # use reqopt::{Error, Kind};
/// fn describe(err: &Error) -> &'static str {
///     match err.kind() {
///         Kind::Http { .. } => "bad status",
///         Kind::Timeout { .. } => "too slow",
///         _ if err.is_retryable() => "transient",
///         _ => "fatal",
///     }
/// }
/// ```
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    message: String,
    code: Option<String>,
    options: Option<Options>,
    source: Option<BoxError>,
}

/// What went wrong.
///
/// A closed set: every failure is exactly one of these.
#[derive(Debug, Clone)]
pub enum Kind {
    /// The cache layer failed.
    Cache,
    /// The request could not be constructed or sent; no response was received.
    Request,
    /// Reading the response body failed mid-stream.
    Read,
    /// The response body could not be decoded.
    Parse {
        /// The response whose body failed to decode.
        response: Arc<Response>,
    },
    /// The response status indicates failure.
    Http {
        /// The failed response.
        response: Arc<Response>,
    },
    /// The redirect limit was exceeded.
    MaxRedirects {
        /// The last redirect response.
        response: Arc<Response>,
        /// How many redirects were followed.
        redirects: u32,
    },
    /// The URL's protocol is not supported by the transport.
    UnsupportedProtocol,
    /// A phase-specific timeout elapsed.
    Timeout {
        /// The phase that timed out.
        event: TimeoutEvent,
        /// Timings of the request up to the timeout.
        timings: Timings,
    },
    /// The caller cancelled the request.
    Cancel,
    /// The options are invalid; raised before anything is sent.
    Builder,
}

impl Error {
    fn new(
        kind: Kind,
        message: String,
        options: Option<Options>,
        source: Option<BoxError>,
    ) -> Error {
        let code = source
            .as_deref()
            .and_then(|err| system_code(err))
            .map(str::to_owned);
        debug!("{:?} error: {message}", KindName(&kind));
        Error {
            inner: Box::new(Inner {
                kind,
                message,
                code,
                options,
                source,
            }),
        }
    }

    /// The cache layer failed with `source`.
    pub fn cache<E: Into<BoxError>>(source: E, options: Options) -> Error {
        let source = source.into();
        Error::new(Kind::Cache, source.to_string(), Some(options), Some(source))
    }

    /// Building or dispatching the request failed with `source` before any
    /// response was received.
    pub fn request<E: Into<BoxError>>(source: E, options: Options) -> Error {
        let source = source.into();
        Error::new(Kind::Request, source.to_string(), Some(options), Some(source))
    }

    /// Reading the response body failed with `source`.
    pub fn read<E: Into<BoxError>>(source: E, options: Options) -> Error {
        let source = source.into();
        Error::new(Kind::Read, source.to_string(), Some(options), Some(source))
    }

    /// Decoding the body of `response` failed with `source`.
    ///
    /// The message names the request URL.
    pub fn parse<E, R>(source: E, response: R, options: Options) -> Error
    where
        E: Into<BoxError>,
        R: Into<Arc<Response>>,
    {
        let source = source.into();
        let message = format!("{source} in \"{}\"", options.url());
        let kind = Kind::Parse {
            response: response.into(),
        };
        Error::new(kind, message, Some(options), Some(source))
    }

    /// `response` has a status that counts as a failure.
    ///
    /// The message names the status code and its reason phrase.
    pub fn http<R: Into<Arc<Response>>>(response: R, options: Options) -> Error {
        let response = response.into();
        let message = format!(
            "Response code {} ({})",
            response.status().as_u16(),
            response.status_text()
        );
        Error::new(Kind::Http { response }, message, Some(options), None)
    }

    /// More than the allowed number of redirects were followed; `response` is
    /// the last one received.
    pub fn max_redirects<R: Into<Arc<Response>>>(
        response: R,
        redirects: u32,
        options: Options,
    ) -> Error {
        let kind = Kind::MaxRedirects {
            response: response.into(),
            redirects,
        };
        let message = format!("Redirected {redirects} times. Aborting.");
        Error::new(kind, message, Some(options), None)
    }

    /// The transport does not speak the protocol of the request URL.
    pub fn unsupported_protocol(options: Options) -> Error {
        let message = format!("Unsupported protocol \"{}:\"", options.url().scheme());
        Error::new(Kind::UnsupportedProtocol, message, Some(options), None)
    }

    /// The `event` phase did not complete within `delay`.
    pub fn timeout(
        event: TimeoutEvent,
        delay: Duration,
        timings: Timings,
        options: Options,
    ) -> Error {
        let message = format!("Timeout awaiting '{event}' for {}ms", delay.as_millis());
        let mut err = Error::new(
            Kind::Timeout { event, timings },
            message,
            Some(options),
            Some(Box::new(TimedOut)),
        );
        err.inner.code = Some(TIMEOUT_CODE.to_owned());
        err
    }

    /// The caller cancelled the request.
    pub fn cancel(options: Options) -> Error {
        Error::new(
            Kind::Cancel,
            "Request was cancelled".to_owned(),
            Some(options),
            None,
        )
    }

    /// The options are invalid. `options` is `None` when the failure happened
    /// before canonical options existed.
    pub fn builder<E: Into<BoxError>>(source: E, options: Option<Options>) -> Error {
        let source = source.into();
        Error::new(Kind::Builder, source.to_string(), options, Some(source))
    }

    pub(crate) fn url_bad_scheme(url: &Url) -> Error {
        Error::builder(BadScheme(url.to_string()), None)
    }

    /// Replaces the machine-readable code, as reported by the failing system
    /// call or library.
    ///
    /// ```
    /// # use std::io;
    /// # use reqopt::{Error, Options, Map};
    /// # let options = Options::new(Map::new().with("url", "http://localhost/")).unwrap();
    /// let err = Error::request(io::Error::other("lookup failed"), options)
    ///     .with_code("ENOTFOUND");
    /// assert_eq!(err.code(), Some("ENOTFOUND"));
    /// ```
    pub fn with_code<C: Into<String>>(mut self, code: C) -> Self {
        self.inner.code = Some(code.into());
        self
    }
}

impl Error {
    /// What went wrong.
    #[inline]
    pub fn kind(&self) -> &Kind {
        &self.inner.kind
    }

    /// The human-readable message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// A short machine-readable code such as `ETIMEDOUT` or `ECONNRESET`.
    #[inline]
    pub fn code(&self) -> Option<&str> {
        self.inner.code.as_deref()
    }

    /// The canonical options of the failed request.
    ///
    /// Always present except for [`Kind::Builder`] errors raised before the
    /// options could be built.
    #[inline]
    pub fn options(&self) -> Option<&Options> {
        self.inner.options.as_ref()
    }

    /// The response received before the failure, for response-bearing kinds.
    pub fn response(&self) -> Option<&Arc<Response>> {
        match &self.inner.kind {
            Kind::Parse { response }
            | Kind::Http { response }
            | Kind::MaxRedirects { response, .. } => Some(response),
            _ => None,
        }
    }

    /// The number of redirects followed, if this is a redirect-limit error.
    pub fn redirect_count(&self) -> Option<u32> {
        match self.inner.kind {
            Kind::MaxRedirects { redirects, .. } => Some(redirects),
            _ => None,
        }
    }

    /// The phase that timed out, if this is a timeout.
    pub fn timeout_event(&self) -> Option<TimeoutEvent> {
        match self.inner.kind {
            Kind::Timeout { event, .. } => Some(event),
            _ => None,
        }
    }

    /// The timings snapshot, if this is a timeout.
    pub fn timings(&self) -> Option<&Timings> {
        match &self.inner.kind {
            Kind::Timeout { timings, .. } => Some(timings),
            _ => None,
        }
    }

    /// Returns true if the error came from invalid options.
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the error is related to the cache.
    pub fn is_cache(&self) -> bool {
        matches!(self.inner.kind, Kind::Cache)
    }

    /// Returns true if the error happened while sending the request.
    pub fn is_request(&self) -> bool {
        matches!(self.inner.kind, Kind::Request)
    }

    /// Returns true if the error happened while reading the response body.
    pub fn is_read(&self) -> bool {
        matches!(self.inner.kind, Kind::Read)
    }

    /// Returns true if the error is related to decoding the response's body.
    pub fn is_parse(&self) -> bool {
        matches!(self.inner.kind, Kind::Parse { .. })
    }

    /// Returns true if the error came from a failed response status.
    pub fn is_status(&self) -> bool {
        matches!(self.inner.kind, Kind::Http { .. })
    }

    /// Returns true if the redirect limit was exceeded.
    pub fn is_redirect(&self) -> bool {
        matches!(self.inner.kind, Kind::MaxRedirects { .. })
    }

    /// Returns true if the URL protocol is not supported.
    pub fn is_unsupported_protocol(&self) -> bool {
        matches!(self.inner.kind, Kind::UnsupportedProtocol)
    }

    /// Returns true if the error is related to a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::Timeout { .. })
    }

    /// Returns true if the request was cancelled.
    pub fn is_cancel(&self) -> bool {
        matches!(self.inner.kind, Kind::Cancel)
    }

    /// Returns true if the request may be sent again.
    ///
    /// Request, read and timeout failures qualify when their code, if any, is
    /// a retry error code. Status failures qualify when the status is a retry
    /// status code. In both cases the request method must be a retry method
    /// and the retry limit must not be zero.
    pub fn is_retryable(&self) -> bool {
        let Some(options) = &self.inner.options else {
            return false;
        };
        let retry = options.retry();

        let eligible = match &self.inner.kind {
            Kind::Request | Kind::Read | Kind::Timeout { .. } => match self.code() {
                Some(code) => retry.error_codes.iter().any(|c| c == code),
                None => true,
            },
            Kind::Http { response } => retry.status_codes.contains(&response.status()),
            _ => false,
        };
        eligible && retry.limit > 0 && retry.methods.contains(options.method())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("reqopt::Error");

        builder.field("kind", &KindName(&self.inner.kind));
        builder.field("message", &self.inner.message);

        if let Some(ref code) = self.inner.code {
            builder.field("code", code);
        }

        if let Some(ref options) = self.inner.options {
            builder.field("url", &options.url().as_str());
        }

        if let Some(response) = self.response() {
            builder.field("status", &response.status());
        }

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.inner.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

/// Debug-prints only the variant name, leaving out the attached response.
struct KindName<'a>(&'a Kind);

impl fmt::Debug for KindName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self.0 {
            Kind::Cache => "Cache",
            Kind::Request => "Request",
            Kind::Read => "Read",
            Kind::Parse { .. } => "Parse",
            Kind::Http { .. } => "Http",
            Kind::MaxRedirects { .. } => "MaxRedirects",
            Kind::UnsupportedProtocol => "UnsupportedProtocol",
            Kind::Timeout { .. } => "Timeout",
            Kind::Cancel => "Cancel",
            Kind::Builder => "Builder",
        })
    }
}

/// Finds the system code of the first `io::Error` in the source chain.
fn system_code(err: &(dyn StdError + 'static)) -> Option<&'static str> {
    let mut source = Some(err);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<io::Error>() {
            return io_code(io.kind());
        }
        source = err.source();
    }
    None
}

fn io_code(kind: io::ErrorKind) -> Option<&'static str> {
    use io::ErrorKind::*;

    Some(match kind {
        NotFound => "ENOENT",
        PermissionDenied => "EACCES",
        ConnectionRefused => "ECONNREFUSED",
        ConnectionReset => "ECONNRESET",
        ConnectionAborted => "ECONNABORTED",
        NotConnected => "ENOTCONN",
        AddrInUse => "EADDRINUSE",
        AddrNotAvailable => "EADDRNOTAVAIL",
        BrokenPipe => "EPIPE",
        AlreadyExists => "EEXIST",
        WouldBlock => "EAGAIN",
        InvalidInput => "EINVAL",
        TimedOut => TIMEOUT_CODE,
        Interrupted => "EINTR",
        UnexpectedEof => "ECONNRESET",
        _ => return None,
    })
}

#[derive(Debug)]
pub(crate) struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("operation timed out")
    }
}

impl StdError for TimedOut {}

#[derive(Debug)]
pub(crate) struct BadScheme(String);

impl fmt::Display for BadScheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "URL scheme is not allowed ({})", self.0)
    }
}

impl StdError for BadScheme {}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use http::StatusCode;

    use super::*;
    use crate::Map;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    fn options(method: &str) -> Options {
        Options::new(
            Map::new()
                .with("url", "http://example.com/api")
                .with("method", method),
        )
        .unwrap()
    }

    fn response(status: u16) -> Response {
        let url = Url::parse("http://example.com/api").unwrap();
        Response::new(StatusCode::from_u16(status).unwrap(), url)
    }

    #[test]
    fn test_source_chain() {
        let root = Error::request(io::Error::other("boom"), options("GET"));
        assert!(root.source().is_some());

        let link = Error::read(root, options("GET"));
        let source = link.source().unwrap();
        assert!(source.is::<Error>());
        assert_eq!(link.message(), "boom");
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn mem_size_of() {
        use std::mem::size_of;
        assert_eq!(size_of::<Error>(), size_of::<usize>());
    }

    #[test]
    fn code_from_io_error() {
        let err = Error::request(
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
            options("GET"),
        );
        assert_eq!(err.code(), Some("ECONNREFUSED"));

        let nested = Error::read(
            Error::request(io::Error::from(io::ErrorKind::ConnectionReset), options("GET")),
            options("GET"),
        );
        assert_eq!(nested.code(), Some("ECONNRESET"));

        let plain = Error::cache("disk full", options("GET"));
        assert_eq!(plain.code(), None);
        assert!(plain.is_cache());
    }

    #[test]
    fn http_error_message() {
        let failed = Arc::new(response(500));
        let err = Error::http(failed.clone(), options("GET"));
        assert!(err.is_status());
        assert_eq!(err.message(), "Response code 500 (Internal Server Error)");
        assert!(Arc::ptr_eq(err.response().unwrap(), &failed));
        assert!(err.is_retryable());

        let not_found = Error::http(response(404), options("GET"));
        assert!(!not_found.is_retryable());
    }

    #[test]
    fn parse_error_names_url() {
        let err = Error::parse("unexpected token", response(200), options("GET"));
        assert_eq!(
            err.to_string(),
            "unexpected token in \"http://example.com/api\""
        );
        assert!(err.is_parse());
    }

    #[test]
    fn max_redirects_message() {
        let err = Error::max_redirects(response(302), 10, options("GET"));
        assert_eq!(err.message(), "Redirected 10 times. Aborting.");
        assert_eq!(err.redirect_count(), Some(10));
        assert_eq!(err.response().unwrap().status(), StatusCode::FOUND);
    }

    #[test]
    fn unsupported_protocol_message() {
        let opts = Options::new(Map::new().with("url", "ftp://example.com/")).unwrap();
        let err = Error::unsupported_protocol(opts);
        assert_eq!(err.message(), "Unsupported protocol \"ftp:\"");
        assert!(err.response().is_none());
    }

    #[test]
    fn timeout_error() {
        let timings = Timings::new(Instant::now());
        let err = Error::timeout(
            TimeoutEvent::Connect,
            Duration::from_millis(150),
            timings,
            options("GET"),
        );
        assert!(err.is_timeout());
        assert_eq!(err.code(), Some(TIMEOUT_CODE));
        assert_eq!(err.message(), "Timeout awaiting 'connect' for 150ms");
        assert_eq!(err.timeout_event(), Some(TimeoutEvent::Connect));
        assert!(err.timings().is_some());
        assert!(err.is_retryable());
    }

    #[test]
    fn retryable_depends_on_method() {
        let get = Error::request(io::Error::other("reset"), options("GET"));
        assert!(get.is_retryable());

        let post = Error::request(io::Error::other("reset"), options("POST"));
        assert!(!post.is_retryable());
    }

    #[test]
    fn retryable_depends_on_code() {
        let listed = Error::request(
            io::Error::from(io::ErrorKind::ConnectionReset),
            options("GET"),
        );
        assert!(listed.is_retryable());

        let unlisted = Error::request(io::Error::other("x"), options("GET")).with_code("EWHATEVER");
        assert!(!unlisted.is_retryable());
    }

    #[test]
    fn terminal_kinds() {
        assert!(!Error::cancel(options("GET")).is_retryable());
        assert!(!Error::max_redirects(response(301), 3, options("GET")).is_retryable());
        assert!(!Error::parse("bad", response(200), options("GET")).is_retryable());
    }

    #[test]
    fn debug_output() {
        let err = Error::http(response(404), options("GET"));
        let debug = format!("{err:?}");
        assert!(debug.starts_with("reqopt::Error { kind: Http"));
        assert!(debug.contains("status: 404"));
    }
}
