//! String, case-insensitive string and byte kinds.
//!
//! All three encode as a `u64` little-endian length followed by the raw
//! bytes. Decoding in place keeps the value as a window into the input
//! buffer instead of copying it.

use super::{compare_with, push_element, Borrowed, Type, TypeDescriptor};
use crate::codec::BlobInput;
use crate::error::BlobError;
use crate::hash::one_at_a_time;
use crate::value::{bytes_of, text_of, ByteBuf, Text, Value};
use core::any::Any;
use core::cmp::Ordering;

const LEN_WIDTH: usize = 8;

fn write_len_prefixed(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// Reads the length prefix and returns `(start, len)` of the payload.
fn read_len_prefixed(bytes: &[u8]) -> Result<(usize, usize), BlobError> {
    if bytes.len() < LEN_WIDTH {
        return Err(BlobError::Truncated {
            needed: LEN_WIDTH,
            available: bytes.len(),
        });
    }
    let mut raw = [0u8; LEN_WIDTH];
    raw.copy_from_slice(&bytes[..LEN_WIDTH]);
    let len = u64::from_le_bytes(raw);
    let available = bytes.len() - LEN_WIDTH;
    match usize::try_from(len) {
        Ok(len) if len <= available => Ok((LEN_WIDTH, len)),
        _ => Err(BlobError::Truncated {
            needed: usize::try_from(len).unwrap_or(usize::MAX),
            available,
        }),
    }
}

/// UTF-8 text; `ci` selects ASCII case-insensitive compare and hash.
pub struct TextType {
    name: &'static str,
    ci: bool,
}

impl TextType {
    pub const fn new(name: &'static str, ci: bool) -> Self {
        TextType { name, ci }
    }

    fn order(&self, a: &str, b: &str) -> Ordering {
        if self.ci {
            a.bytes()
                .map(|c| c.to_ascii_uppercase())
                .cmp(b.bytes().map(|c| c.to_ascii_uppercase()))
        } else {
            a.cmp(b)
        }
    }
}

impl TypeDescriptor for TextType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn xml_name(&self) -> Option<&'static str> {
        Some("xs:string")
    }

    fn data_is_pointer(&self) -> bool {
        true
    }

    fn accepts(&self, v: &dyn Any) -> bool {
        text_of(v).is_some()
    }

    fn create(&self) -> Value {
        Value::new(Text::new(""))
    }

    fn copy(&self, v: &dyn Any) -> Option<Value> {
        text_of(v).map(|s| Value::new(Text::new(s)))
    }

    fn share(&self, v: &dyn Any) -> Option<Value> {
        match crate::value::cast::<Text>(v) {
            Some(t) => Some(Value::new(t.clone())),
            None => self.copy(v),
        }
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Ordering {
        compare_with(text_of(a), text_of(b), |a, b| self.order(a, b))
    }

    fn size(&self, v: &dyn Any) -> usize {
        text_of(v).map_or(0, str::len)
    }

    fn format_value(&self, v: &dyn Any) -> String {
        text_of(v).unwrap_or_default().to_owned()
    }

    fn to_blob(&self, v: &dyn Any, out: &mut Vec<u8>) -> Result<(), BlobError> {
        let s = text_of(v).ok_or(BlobError::TypeMismatch(self.name))?;
        write_len_prefixed(s.as_bytes(), out);
        Ok(())
    }

    fn from_blob(&self, input: BlobInput<'_>) -> Result<(Value, usize), BlobError> {
        let (start, len) = read_len_prefixed(input.bytes())?;
        let text = Text::from_storage(input.storage(start, len)).ok_or(BlobError::InvalidUtf8)?;
        Ok((Value::new(text), start + len))
    }

    fn clear(&self, v: &mut Value) {
        if self.accepts(v.as_any()) {
            *v = self.create();
        }
    }

    fn to_xml(&self, v: &dyn Any, element: &str, out: &mut String) {
        push_element(out, element, text_of(v).unwrap_or_default());
    }

    #[cfg(feature = "json")]
    fn to_json(&self, v: &dyn Any) -> serde_json::Value {
        text_of(v)
            .map(|s| serde_json::Value::String(s.to_owned()))
            .unwrap_or(serde_json::Value::Null)
    }

    fn hash(&self, v: &dyn Any) -> Option<u64> {
        let s = text_of(v)?;
        if self.ci {
            Some(one_at_a_time(s.bytes().map(|c| c.to_ascii_uppercase())))
        } else {
            Some(one_at_a_time(s.bytes()))
        }
    }
}

/// Arbitrary byte strings.
pub struct BytesType {
    name: &'static str,
}

impl TypeDescriptor for BytesType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn xml_name(&self) -> Option<&'static str> {
        Some("xs:base64Binary")
    }

    fn data_is_pointer(&self) -> bool {
        true
    }

    fn accepts(&self, v: &dyn Any) -> bool {
        bytes_of(v).is_some()
    }

    fn create(&self) -> Value {
        Value::new(ByteBuf::new(Vec::new()))
    }

    fn copy(&self, v: &dyn Any) -> Option<Value> {
        bytes_of(v).map(|b| Value::new(ByteBuf::new(b)))
    }

    fn share(&self, v: &dyn Any) -> Option<Value> {
        match crate::value::cast::<ByteBuf>(v) {
            Some(b) => Some(Value::new(b.clone())),
            None => self.copy(v),
        }
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Ordering {
        compare_with(bytes_of(a), bytes_of(b), |a, b| a.cmp(b))
    }

    fn size(&self, v: &dyn Any) -> usize {
        bytes_of(v).map_or(0, <[u8]>::len)
    }

    fn format_value(&self, v: &dyn Any) -> String {
        bytes_of(v)
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    fn to_bytes(&self, v: &dyn Any) -> Vec<u8> {
        bytes_of(v).map(<[u8]>::to_vec).unwrap_or_default()
    }

    fn to_blob(&self, v: &dyn Any, out: &mut Vec<u8>) -> Result<(), BlobError> {
        let b = bytes_of(v).ok_or(BlobError::TypeMismatch(self.name))?;
        write_len_prefixed(b, out);
        Ok(())
    }

    fn from_blob(&self, input: BlobInput<'_>) -> Result<(Value, usize), BlobError> {
        let (start, len) = read_len_prefixed(input.bytes())?;
        let bytes = ByteBuf::from_storage(input.storage(start, len));
        Ok((Value::new(bytes), start + len))
    }

    fn clear(&self, v: &mut Value) {
        if self.accepts(v.as_any()) {
            *v = self.create();
        }
    }

    fn to_xml(&self, v: &dyn Any, element: &str, out: &mut String) {
        push_element(out, element, &self.format_value(v));
    }

    #[cfg(feature = "json")]
    fn to_json(&self, v: &dyn Any) -> serde_json::Value {
        bytes_of(v)
            .map(|b| serde_json::Value::String(String::from_utf8_lossy(b).into_owned()))
            .unwrap_or(serde_json::Value::Null)
    }
}

static STRING_DESC: TextType = TextType::new("string", false);
static STRING_NC: Borrowed = Borrowed::new(&STRING_DESC);
static STRING_CI_DESC: TextType = TextType::new("string_ci", true);
static STRING_CI_NC: Borrowed = Borrowed::new(&STRING_CI_DESC);
static BYTES_DESC: BytesType = BytesType { name: "bytes" };
static BYTES_NC: Borrowed = Borrowed::new(&BYTES_DESC);

/// Case-sensitive UTF-8 text.
pub static STRING: Type = &STRING_DESC;
pub static STRING_NO_COPY: Type = &STRING_NC;
/// UTF-8 text compared and hashed ignoring ASCII case.
pub static STRING_CI: Type = &STRING_CI_DESC;
pub static STRING_CI_NO_COPY: Type = &STRING_CI_NC;
/// Raw bytes.
pub static BYTES: Type = &BYTES_DESC;
pub static BYTES_NO_COPY: Type = &BYTES_NC;
