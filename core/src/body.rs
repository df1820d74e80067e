//! JSON encoding of request bodies.
//!
//! # Design
//! A request body is any `Serialize` value that also implements [`Body`].
//! `Body` has a single defaulted method, so most types opt in with an empty
//! `impl Body for MyType {}`; types that want `<`, `>` and `&` sent verbatim
//! override `escape_html` or get wrapped in [`Unescaped`]. Types from other
//! crates that cannot implement `Body` are sent through [`Escaped`], which
//! keeps the default escaping.
//!
//! Escaping follows the conventions of HTML-safe JSON encoders: the three
//! characters become `\u003c`, `\u003e` and `\u0026`, and U+2028/U+2029 are
//! always escaped so the payload stays valid inside a `<script>` tag.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::io::{self, Write};

use serde::{Serialize, Serializer};

/// A value that can be sent as a JSON request body.
pub trait Body: Serialize {
    /// Whether `<`, `>` and `&` inside JSON strings are escaped.
    fn escape_html(&self) -> bool {
        true
    }
}

/// Type used for the body parameter of a call that sends no body.
pub const NO_BODY: Option<&()> = None;

/// Sends any `Serialize` value with the default escaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Escaped<T>(pub T);

impl<T: Serialize> Serialize for Escaped<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<T: Serialize> Body for Escaped<T> {}

/// Sends the wrapped value with `<`, `>` and `&` left unescaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Unescaped<T>(pub T);

impl<T: Serialize> Serialize for Unescaped<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<T: Serialize> Body for Unescaped<T> {
    fn escape_html(&self) -> bool {
        false
    }
}

impl<T: Body + ?Sized> Body for &T {
    fn escape_html(&self) -> bool {
        (**self).escape_html()
    }
}

impl<T: Body + ?Sized> Body for Box<T> {
    fn escape_html(&self) -> bool {
        (**self).escape_html()
    }
}

macro_rules! plain_bodies {
    ($($ty:ty),* $(,)?) => {
        $(impl Body for $ty {})*
    };
}

plain_bodies!(
    (), bool, char, str, String, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
    usize, f32, f64,
);

macro_rules! tuple_bodies {
    ($(($($name:ident),+))*) => {
        $(impl<$($name: Serialize),+> Body for ($($name,)+) {})*
    };
}

tuple_bodies! {
    (A)
    (A, B)
    (A, B, C)
    (A, B, C, D)
    (A, B, C, D, E)
    (A, B, C, D, E, F)
    (A, B, C, D, E, F, G)
    (A, B, C, D, E, F, G, H)
}

impl<T, const N: usize> Body for [T; N] where [T; N]: Serialize {}
impl Body for serde_json::Value {}
impl<T: Serialize> Body for [T] {}
impl<T: Serialize> Body for Vec<T> {}
impl<T: Serialize> Body for Option<T> {}
impl<K: Serialize, V: Serialize> Body for BTreeMap<K, V> {}
impl<K: Serialize, V: Serialize, H: BuildHasher> Body for HashMap<K, V, H> {}

/// Encode `body` as a single JSON value with no trailing newline.
pub(crate) fn encode<B: Body + ?Sized>(body: &B) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(128);
    let formatter = HtmlSafeFormatter {
        escape_html: body.escape_html(),
    };
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    body.serialize(&mut serializer)?;
    Ok(buf)
}

/// Compact formatter that additionally escapes HTML-sensitive characters.
struct HtmlSafeFormatter {
    escape_html: bool,
}

impl serde_json::ser::Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let escape = match ch {
                '<' | '>' | '&' => self.escape_html,
                '\u{2028}' | '\u{2029}' => true,
                _ => false,
            };
            if !escape {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            write!(writer, "\\u{:04x}", ch as u32)?;
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
