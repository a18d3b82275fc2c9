//! multipart/form-data
//!
//! A [`Form`] is fully buffered, so its encoded length is always known up
//! front and can be announced in `content-length`.
//!
//! ```
//! use reqopt::multipart::{Form, Part};
//!
//! let form = Form::new()
//!     .text("username", "seanmonstar")
//!     .part("avatar", Part::bytes(&b"\x89PNG"[..]).file_name("a.png"));
//!
//! assert_eq!(form.compute_length(), form.to_bytes().len() as u64);
//! ```

use std::{borrow::Cow, fmt};

use bytes::{BufMut, Bytes, BytesMut};
use mime::Mime;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::util::fast_random;

/// Characters escaped in `name` and `filename` parameters, as browsers do.
const FORM_PARAM: &AsciiSet = &CONTROLS.add(b'"');

/// An encoder for a multipart/form-data body.
#[derive(Clone)]
pub struct Form {
    boundary: String,
    fields: Vec<(Cow<'static, str>, Part)>,
}

/// A field in a multipart form.
#[derive(Clone)]
pub struct Part {
    value: Bytes,
    mime: Option<Mime>,
    file_name: Option<Cow<'static, str>>,
}

// ===== impl Form =====

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Creates a new Form without any content.
    pub fn new() -> Form {
        Form {
            boundary: gen_boundary(),
            fields: Vec::new(),
        }
    }

    /// Get the boundary that this form will use.
    #[inline]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a data field with supplied name and value.
    pub fn text<T, U>(self, name: T, value: U) -> Form
    where
        T: Into<Cow<'static, str>>,
        U: Into<Cow<'static, str>>,
    {
        self.part(name, Part::text(value))
    }

    /// Adds a customized Part.
    pub fn part<T>(mut self, name: T, part: Part) -> Form
    where
        T: Into<Cow<'static, str>>,
    {
        self.fields.push((name.into(), part));
        self
    }

    /// Number of fields in the form.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the form has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The exact number of bytes [`Form::to_bytes`] produces.
    pub fn compute_length(&self) -> u64 {
        let boundary = self.boundary.len() as u64;
        let fields: u64 = self
            .fields
            .iter()
            .map(|(name, part)| {
                // --boundary\r\n headers \r\n value \r\n
                2 + boundary + 2 + part.headers(name).len() as u64 + 2 + part.value.len() as u64 + 2
            })
            .sum();
        // --boundary--\r\n
        fields + 2 + boundary + 4
    }

    /// Encodes the whole form.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.compute_length() as usize);
        for (name, part) in &self.fields {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");
            buf.put_slice(part.headers(name).as_bytes());
            buf.put_slice(b"\r\n");
            buf.put_slice(&part.value);
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");
        buf.freeze()
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Form")
            .field("boundary", &self.boundary)
            .field("parts", &self.fields)
            .finish()
    }
}

// ===== impl Part =====

impl Part {
    /// Makes a text parameter.
    pub fn text<T>(value: T) -> Part
    where
        T: Into<Cow<'static, str>>,
    {
        let body = match value.into() {
            Cow::Borrowed(slice) => Bytes::from_static(slice.as_bytes()),
            Cow::Owned(string) => Bytes::from(string),
        };
        Part::new(body)
    }

    /// Makes a new parameter from arbitrary bytes.
    pub fn bytes<T>(value: T) -> Part
    where
        T: Into<Cow<'static, [u8]>>,
    {
        let body = match value.into() {
            Cow::Borrowed(slice) => Bytes::from_static(slice),
            Cow::Owned(vec) => Bytes::from(vec),
        };
        Part::new(body)
    }

    fn new(value: Bytes) -> Part {
        Part {
            value,
            mime: None,
            file_name: None,
        }
    }

    /// Tries to set the mime of this part.
    pub fn mime_str(self, mime: &str) -> crate::Result<Part> {
        Ok(self.mime(mime.parse().map_err(|e| crate::Error::builder(e, None))?))
    }

    /// Sets the mime of this part.
    pub fn mime(mut self, mime: Mime) -> Part {
        self.mime = Some(mime);
        self
    }

    /// Sets the filename, builder style.
    pub fn file_name<T>(mut self, filename: T) -> Part
    where
        T: Into<Cow<'static, str>>,
    {
        self.file_name = Some(filename.into());
        self
    }

    /// The part's header block, each line terminated by CRLF.
    fn headers(&self, name: &str) -> String {
        let mut headers = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            utf8_percent_encode(name, FORM_PARAM)
        );
        if let Some(file_name) = &self.file_name {
            headers.push_str("; filename=\"");
            headers.extend(utf8_percent_encode(file_name, FORM_PARAM));
            headers.push('"');
        }
        headers.push_str("\r\n");
        if let Some(mime) = &self.mime {
            headers.push_str("Content-Type: ");
            headers.push_str(mime.as_ref());
            headers.push_str("\r\n");
        }
        headers
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Part")
            .field("len", &self.value.len())
            .field("mime", &self.mime)
            .field("file_name", &self.file_name)
            .finish()
    }
}

fn gen_boundary() -> String {
    let a = fast_random();
    let b = fast_random();
    let c = fast_random();
    let d = fast_random();

    format!("{a:016x}-{b:016x}-{c:016x}-{d:016x}")
}
