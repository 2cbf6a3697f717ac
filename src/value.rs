//! Type-erased values and the byte storage behind text and byte kinds.

use crate::hash_table::HashTable;
use crate::list::List;
use core::any::Any;
use core::fmt;
use core::ops::{Deref, Range};
use std::sync::Arc;

/// An owned, type-erased value stored as a key or value in a table.
///
/// The concrete type is interpreted by the `TypeDescriptor` recorded next
/// to it; a `Value` on its own only knows how to downcast.
pub struct Value(Box<dyn Any + Send + Sync>);

impl Value {
    pub fn new<T: Any + Send + Sync>(v: T) -> Self {
        Value(Box::new(v))
    }

    pub fn as_any(&self) -> &dyn Any {
        &*self.0
    }

    pub fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut *self.0
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.downcast_mut()
    }

    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        match self.0.downcast::<T>() {
            Ok(v) => Ok(*v),
            Err(inner) => Err(Value(inner)),
        }
    }

    /// Text view of string kinds, and of byte kinds holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        text_of(self.as_any())
            .or_else(|| bytes_of(self.as_any()).and_then(|b| core::str::from_utf8(b).ok()))
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        bytes_of(self.as_any()).or_else(|| text_of(self.as_any()).map(str::as_bytes))
    }

    pub fn as_table(&self) -> Option<&HashTable> {
        self.downcast_ref()
    }

    pub fn as_list(&self) -> Option<&List> {
        self.downcast_ref()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.debug_tuple("Value").field(&s).finish(),
            None => f.debug_struct("Value").finish_non_exhaustive(),
        }
    }
}

/// Looks through a `Value` passed where a bare `&dyn Any` is expected.
pub(crate) fn unwrap_any(v: &dyn Any) -> &dyn Any {
    match v.downcast_ref::<Value>() {
        Some(inner) => inner.as_any(),
        None => v,
    }
}

pub(crate) fn cast<T: Any>(v: &dyn Any) -> Option<&T> {
    unwrap_any(v).downcast_ref()
}

/// Text accepted by string kinds: `Text`, `String` or a static `&str`.
pub(crate) fn text_of(v: &dyn Any) -> Option<&str> {
    let v = unwrap_any(v);
    if let Some(t) = v.downcast_ref::<Text>() {
        Some(t.as_str())
    } else if let Some(s) = v.downcast_ref::<String>() {
        Some(s.as_str())
    } else {
        v.downcast_ref::<&'static str>().copied()
    }
}

/// Bytes accepted by the byte kind: `ByteBuf`, `Vec<u8>` or a static slice.
pub(crate) fn bytes_of(v: &dyn Any) -> Option<&[u8]> {
    let v = unwrap_any(v);
    if let Some(b) = v.downcast_ref::<ByteBuf>() {
        Some(b.as_slice())
    } else if let Some(b) = v.downcast_ref::<Vec<u8>>() {
        Some(b.as_slice())
    } else {
        v.downcast_ref::<&'static [u8]>().copied()
    }
}

/// Backing bytes: owned, or a window into a buffer shared with a decoder.
#[derive(Clone)]
pub(crate) enum Storage {
    Owned(Box<[u8]>),
    Shared { buf: Arc<[u8]>, range: Range<usize> },
}

impl Storage {
    pub(crate) fn as_bytes(&self) -> &[u8] {
        match self {
            Storage::Owned(b) => b,
            Storage::Shared { buf, range } => &buf[range.clone()],
        }
    }

    fn is_shared(&self) -> bool {
        matches!(self, Storage::Shared { .. })
    }

    fn detached(&self) -> Storage {
        Storage::Owned(self.as_bytes().into())
    }
}

/// UTF-8 text, either owned or borrowed from a shared decode buffer.
#[derive(Clone)]
pub struct Text(Storage);

impl Text {
    pub fn new(s: impl Into<String>) -> Self {
        Text(Storage::Owned(s.into().into_bytes().into_boxed_slice()))
    }

    pub(crate) fn from_storage(storage: Storage) -> Option<Self> {
        core::str::from_utf8(storage.as_bytes()).ok()?;
        Some(Text(storage))
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: every constructor validates UTF-8 and storage is immutable.
        unsafe { core::str::from_utf8_unchecked(self.0.as_bytes()) }
    }

    /// True when the text still points into a decode buffer.
    pub fn is_shared(&self) -> bool {
        self.0.is_shared()
    }

    /// A copy that owns its bytes.
    pub fn detached(&self) -> Self {
        Text(self.0.detached())
    }
}

impl Deref for Text {
    type Target = str;
    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}
impl Eq for Text {}

impl PartialEq<str> for Text {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Text {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::new(s)
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Text::new(s)
    }
}

/// Arbitrary bytes, either owned or borrowed from a shared decode buffer.
#[derive(Clone)]
pub struct ByteBuf(Storage);

impl ByteBuf {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        ByteBuf(Storage::Owned(bytes.into().into_boxed_slice()))
    }

    pub(crate) fn from_storage(storage: Storage) -> Self {
        ByteBuf(storage)
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_shared(&self) -> bool {
        self.0.is_shared()
    }

    pub fn detached(&self) -> Self {
        ByteBuf(self.0.detached())
    }
}

impl Deref for ByteBuf {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for ByteBuf {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}
impl Eq for ByteBuf {}

impl PartialEq<[u8]> for ByteBuf {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_slice() == other
    }
}

impl fmt::Debug for ByteBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ByteBuf")
            .field(&String::from_utf8_lossy(self.as_slice()))
            .finish()
    }
}

macro_rules! value_from {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::new(v)
                }
            }
        )*
    };
}

value_from!(bool, i8, u8, i16, u16, i32, u32, i64, u64, i128, u128, f32, f64);
value_from!(Text, ByteBuf, HashTable, List);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::new(Text::new(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::new(Text::new(s))
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::new(ByteBuf::new(b))
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::new(ByteBuf::new(b))
    }
}
