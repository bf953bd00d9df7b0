//! Turning typed values into the byte sequences that get hashed.
//!
//! Identical logical values must decompose to identical bytes on every call
//! and regardless of the bit array backend, otherwise the filter would report
//! false negatives. [`ByteSink`] therefore writes every primitive in a fixed
//! big-endian layout.
use crate::charset::Charset;
use std::fmt::Display;
use std::marker::PhantomData;

/// Byte accumulator handed to decomposers.
#[derive(Debug, Clone, Default)]
pub struct ByteSink {
    bytes: Vec<u8>,
    charset: Charset,
}

impl ByteSink {
    pub fn new(charset: Charset) -> Self {
        Self {
            bytes: Vec::new(),
            charset,
        }
    }

    /// Charset used by [`ByteSink::put_string`].
    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn put_byte(&mut self, b: u8) -> &mut Self {
        self.bytes.push(b);
        self
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// A single UTF-16 code unit, big-endian.
    pub fn put_char(&mut self, c: u16) -> &mut Self {
        self.put_bytes(&c.to_be_bytes())
    }

    pub fn put_short(&mut self, s: i16) -> &mut Self {
        self.put_bytes(&s.to_be_bytes())
    }

    pub fn put_int(&mut self, i: i32) -> &mut Self {
        self.put_bytes(&i.to_be_bytes())
    }

    pub fn put_long(&mut self, l: i64) -> &mut Self {
        self.put_bytes(&l.to_be_bytes())
    }

    pub fn put_float(&mut self, f: f32) -> &mut Self {
        self.put_bytes(&f.to_bits().to_be_bytes())
    }

    pub fn put_double(&mut self, d: f64) -> &mut Self {
        self.put_bytes(&d.to_bits().to_be_bytes())
    }

    pub fn put_boolean(&mut self, b: bool) -> &mut Self {
        self.put_byte(u8::from(b))
    }

    /// Every UTF-16 code unit of `text`, big-endian, independent of charset.
    pub fn put_chars(&mut self, text: &str) -> &mut Self {
        for unit in text.encode_utf16() {
            self.put_char(unit);
        }
        self
    }

    /// `text` encoded with the sink's charset.
    pub fn put_string(&mut self, text: &str) -> &mut Self {
        self.put_string_with(text, self.charset)
    }

    pub fn put_string_with(&mut self, text: &str, charset: Charset) -> &mut Self {
        charset.encode_into(text, &mut self.bytes);
        self
    }
}

/// A value that knows how to write itself into a [`ByteSink`].
pub trait Decomposable {
    fn decompose(&self, into: &mut ByteSink);
}

/// Converts values of type `T` into bytes.
pub trait Decomposer<T: ?Sized>: Send + Sync {
    fn decompose(&self, value: &T, sink: &mut ByteSink);
}

impl<T: ?Sized, F> Decomposer<T> for F
where
    F: Fn(&T, &mut ByteSink) + Send + Sync,
{
    fn decompose(&self, value: &T, sink: &mut ByteSink) {
        self(value, sink)
    }
}

/// Writes the value's `Display` text in the sink's charset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDecomposer;

impl<T: Display + ?Sized> Decomposer<T> for DefaultDecomposer {
    fn decompose(&self, value: &T, sink: &mut ByteSink) {
        sink.put_string(&value.to_string());
    }
}

/// Lets [`Decomposable`] values describe themselves.
pub struct SelfDecomposer<T: ?Sized>(PhantomData<fn(&T)>);

impl<T: ?Sized> SelfDecomposer<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: ?Sized> Default for SelfDecomposer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Decomposable + ?Sized> Decomposer<T> for SelfDecomposer<T> {
    fn decompose(&self, value: &T, sink: &mut ByteSink) {
        value.decompose(sink);
    }
}
