//! Request timing snapshots.

use std::{
    fmt,
    time::{Duration, Instant},
};

/// A phase of a request that can time out on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeoutEvent {
    /// DNS lookup.
    Lookup,
    /// TCP connection establishment.
    Connect,
    /// TLS handshake.
    SecureConnect,
    /// Socket inactivity.
    Socket,
    /// Writing the request.
    Send,
    /// Waiting for the first response byte.
    Response,
    /// The whole request, from start to the end of the response.
    Request,
}

impl TimeoutEvent {
    /// All events, in the order they occur during a request.
    pub const ALL: [TimeoutEvent; 7] = [
        TimeoutEvent::Lookup,
        TimeoutEvent::Connect,
        TimeoutEvent::SecureConnect,
        TimeoutEvent::Socket,
        TimeoutEvent::Send,
        TimeoutEvent::Response,
        TimeoutEvent::Request,
    ];

    /// The event name, as used for the keys of the `timeout` option.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutEvent::Lookup => "lookup",
            TimeoutEvent::Connect => "connect",
            TimeoutEvent::SecureConnect => "secureConnect",
            TimeoutEvent::Socket => "socket",
            TimeoutEvent::Send => "send",
            TimeoutEvent::Response => "response",
            TimeoutEvent::Request => "request",
        }
    }
}

impl fmt::Display for TimeoutEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instants at which a request crossed each milestone.
///
/// Filled in by the transport as the request progresses; any milestone not
/// reached yet is `None`.
#[derive(Clone, Debug)]
pub struct Timings {
    /// The request started.
    pub start: Instant,
    /// A socket was assigned.
    pub socket: Option<Instant>,
    /// DNS lookup finished.
    pub lookup: Option<Instant>,
    /// The TCP connection was established.
    pub connect: Option<Instant>,
    /// The TLS handshake finished.
    pub secure_connect: Option<Instant>,
    /// The request was fully written.
    pub upload: Option<Instant>,
    /// The response headers arrived.
    pub response: Option<Instant>,
    /// The response body was fully read.
    pub end: Option<Instant>,
    /// The request failed.
    pub error: Option<Instant>,
    /// The request was aborted.
    pub abort: Option<Instant>,
}

/// Durations of each request phase, derived from [`Timings`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Phases {
    /// `start` to `socket`.
    pub wait: Option<Duration>,
    /// `socket` to `lookup`.
    pub dns: Option<Duration>,
    /// `lookup` to `connect`.
    pub tcp: Option<Duration>,
    /// `connect` to `secure_connect`.
    pub tls: Option<Duration>,
    /// Connection established to `upload`.
    pub request: Option<Duration>,
    /// `upload` to `response`.
    pub first_byte: Option<Duration>,
    /// `response` to `end`.
    pub download: Option<Duration>,
    /// `start` to whichever of `end`, `error` or `abort` happened.
    pub total: Option<Duration>,
}

impl Timings {
    /// A snapshot where only the start is known.
    pub fn new(start: Instant) -> Timings {
        Timings {
            start,
            socket: None,
            lookup: None,
            connect: None,
            secure_connect: None,
            upload: None,
            response: None,
            end: None,
            error: None,
            abort: None,
        }
    }

    /// Computes the duration of each phase reached so far.
    pub fn phases(&self) -> Phases {
        fn between(from: Option<Instant>, to: Option<Instant>) -> Option<Duration> {
            to?.checked_duration_since(from?)
        }

        let start = Some(self.start);
        let connected = self.secure_connect.or(self.connect);
        Phases {
            wait: between(start, self.socket),
            dns: between(self.socket, self.lookup),
            tcp: between(self.lookup, self.connect),
            tls: between(self.connect, self.secure_connect),
            request: between(connected, self.upload),
            first_byte: between(self.upload, self.response),
            download: between(self.response, self.end),
            total: between(start, self.end.or(self.error).or(self.abort)),
        }
    }
}
