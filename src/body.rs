use std::{fmt, pin::Pin, sync::Arc};

use bytes::Bytes;
use futures_core::Stream;
use futures_util::TryStreamExt;

use crate::{error::BoxError, multipart::Form, sync::Mutex};

/// A boxed stream of body chunks, as handed to the transport.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// An outgoing request body.
///
/// Cloning a `Body` clones a handle: buffered contents are reference counted
/// and a stream is shared, to be taken once by the transport.
#[derive(Clone)]
pub struct Body {
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    Empty,
    Text(Bytes),
    Bytes(Bytes),
    Stream {
        stream: Arc<Mutex<Option<BodyStream>>>,
        len: Option<u64>,
    },
    Form(Arc<Form>),
}

/// What kind of body a request carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BodyKind {
    /// No body at all.
    None,
    /// A UTF-8 string.
    String,
    /// A byte buffer.
    Buffer,
    /// A stream of chunks.
    Stream,
    /// A multipart form, with the boundary its encoder uses.
    Form {
        /// The multipart boundary token.
        boundary: String,
    },
}

/// Metadata about an outgoing body: its kind and, if statically known, its
/// length in bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodyDescriptor {
    kind: BodyKind,
    known_length: Option<u64>,
}

// ===== impl Body =====

impl Body {
    /// An empty body.
    #[inline]
    pub fn empty() -> Body {
        Body { inner: Inner::Empty }
    }

    /// Wrap a futures `Stream` in a box inside `Body`. The length is unknown,
    /// so the body will be sent chunked.
    ///
    /// ```
    /// # use reqopt::Body;
    /// # use futures_util;
    /// # fn main() {
    /// let chunks: Vec<Result<_, ::std::io::Error>> = vec![Ok("hello"), Ok(" "), Ok("world")];
    ///
    /// let stream = futures_util::stream::iter(chunks);
    ///
    /// let body = Body::wrap_stream(stream);
    /// assert_eq!(body.content_length(), None);
    /// # }
    /// ```
    pub fn wrap_stream<S>(stream: S) -> Body
    where
        S: futures_core::stream::TryStream + Send + 'static,
        S::Error: Into<BoxError>,
        Bytes: From<S::Ok>,
    {
        Body::stream(stream, None)
    }

    /// Wrap a futures `Stream` whose total length is known up front, such as
    /// one reading a file.
    pub fn sized_stream<S>(stream: S, len: u64) -> Body
    where
        S: futures_core::stream::TryStream + Send + 'static,
        S::Error: Into<BoxError>,
        Bytes: From<S::Ok>,
    {
        Body::stream(stream, Some(len))
    }

    fn stream<S>(stream: S, len: Option<u64>) -> Body
    where
        S: futures_core::stream::TryStream + Send + 'static,
        S::Error: Into<BoxError>,
        Bytes: From<S::Ok>,
    {
        let boxed: BodyStream = Box::pin(
            stream
                .map_ok(Bytes::from)
                .map_err(|err| -> BoxError { err.into() }),
        );
        Body {
            inner: Inner::Stream {
                stream: Arc::new(Mutex::new(Some(boxed))),
                len,
            },
        }
    }

    /// A stream body reading `file`, with its length taken from the file's
    /// metadata.
    #[cfg(feature = "stream")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stream")))]
    pub async fn file(file: tokio::fs::File) -> std::io::Result<Body> {
        let len = file.metadata().await?.len();
        Ok(Body::sized_stream(
            tokio_util::io::ReaderStream::new(file),
            len,
        ))
    }

    /// Returns the buffered contents, if the body is a string or a buffer.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.inner {
            Inner::Text(bytes) | Inner::Bytes(bytes) => Some(bytes.as_ref()),
            _ => None,
        }
    }

    /// Returns the form, if the body is a multipart form.
    pub fn as_form(&self) -> Option<&Form> {
        match &self.inner {
            Inner::Form(form) => Some(form),
            _ => None,
        }
    }

    /// Returns true if there is no body.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self.inner, Inner::Empty)
    }

    /// The body length in bytes, if it is known without reading the body.
    pub fn content_length(&self) -> Option<u64> {
        match &self.inner {
            Inner::Empty => Some(0),
            Inner::Text(bytes) | Inner::Bytes(bytes) => Some(bytes.len() as u64),
            Inner::Stream { len, .. } => *len,
            Inner::Form(form) => Some(form.compute_length()),
        }
    }

    /// Describes this body for header normalization.
    pub fn descriptor(&self) -> BodyDescriptor {
        let kind = match &self.inner {
            Inner::Empty => BodyKind::None,
            Inner::Text(_) => BodyKind::String,
            Inner::Bytes(_) => BodyKind::Buffer,
            Inner::Stream { .. } => BodyKind::Stream,
            Inner::Form(form) => BodyKind::Form {
                boundary: form.boundary().to_owned(),
            },
        };
        BodyDescriptor::new(kind, self.content_length())
    }

    /// Takes the stream out of a stream body.
    ///
    /// Every clone shares the same stream, so only the first call returns it.
    /// Buffered bodies and forms are turned into a single-chunk stream on
    /// every call.
    pub fn take_stream(&self) -> Option<BodyStream> {
        let once = |bytes: Bytes| -> BodyStream {
            Box::pin(futures_util::stream::once(async move {
                Ok::<_, BoxError>(bytes)
            }))
        };
        match &self.inner {
            Inner::Empty => None,
            Inner::Text(bytes) | Inner::Bytes(bytes) => Some(once(bytes.clone())),
            Inner::Stream { stream, .. } => stream.lock().take(),
            Inner::Form(form) => Some(once(form.to_bytes())),
        }
    }

    /// Returns true if both handles refer to the same body.
    pub fn ptr_eq(&self, other: &Body) -> bool {
        match (&self.inner, &other.inner) {
            (Inner::Empty, Inner::Empty) => true,
            (Inner::Text(a), Inner::Text(b)) | (Inner::Bytes(a), Inner::Bytes(b)) => {
                a.as_ptr() == b.as_ptr() && a.len() == b.len()
            }
            (Inner::Stream { stream: a, .. }, Inner::Stream { stream: b, .. }) => Arc::ptr_eq(a, b),
            (Inner::Form(a), Inner::Form(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Default for Body {
    #[inline]
    fn default() -> Body {
        Body::empty()
    }
}

impl From<String> for Body {
    #[inline]
    fn from(s: String) -> Body {
        Body {
            inner: Inner::Text(Bytes::from(s)),
        }
    }
}

impl From<&'static str> for Body {
    #[inline]
    fn from(s: &'static str) -> Body {
        Body {
            inner: Inner::Text(Bytes::from_static(s.as_bytes())),
        }
    }
}

impl From<Bytes> for Body {
    #[inline]
    fn from(bytes: Bytes) -> Body {
        Body {
            inner: Inner::Bytes(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    #[inline]
    fn from(vec: Vec<u8>) -> Body {
        Body::from(Bytes::from(vec))
    }
}

impl From<&'static [u8]> for Body {
    #[inline]
    fn from(s: &'static [u8]) -> Body {
        Body::from(Bytes::from_static(s))
    }
}

impl From<Form> for Body {
    #[inline]
    fn from(form: Form) -> Body {
        Body {
            inner: Inner::Form(Arc::new(form)),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.inner {
            Inner::Empty => f.write_str("Body::Empty"),
            Inner::Text(bytes) => f.debug_tuple("Body::Text").field(&bytes.len()).finish(),
            Inner::Bytes(bytes) => f.debug_tuple("Body::Bytes").field(&bytes.len()).finish(),
            Inner::Stream { len, .. } => f.debug_struct("Body::Stream").field("len", len).finish(),
            Inner::Form(form) => f.debug_tuple("Body::Form").field(form).finish(),
        }
    }
}

// ===== impl BodyDescriptor =====

impl BodyDescriptor {
    /// Describes a body of `kind`, with its length if statically known.
    #[inline]
    pub fn new(kind: BodyKind, known_length: Option<u64>) -> BodyDescriptor {
        BodyDescriptor { kind, known_length }
    }

    /// The descriptor of a request without a body.
    #[inline]
    pub fn none() -> BodyDescriptor {
        BodyDescriptor::new(BodyKind::None, None)
    }

    /// The body kind.
    #[inline]
    pub fn kind(&self) -> &BodyKind {
        &self.kind
    }

    /// The body length in bytes, if statically known.
    #[inline]
    pub fn known_length(&self) -> Option<u64> {
        self.known_length
    }
}
