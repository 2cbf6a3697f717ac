//! Type descriptors: the vtable through which tables operate on erased values.
//!
//! Every key kind and value kind a table stores is described by a
//! `'static` descriptor. Identity is by address, so two descriptors are the
//! same type only if they are the same static. Each built-in kind has a
//! borrowing twin (`*_NO_COPY`) that describes the same representation but
//! copies shallowly; the codec and the registry treat a twin as its base.

use crate::codec::BlobInput;
use crate::error::BlobError;
use crate::value::Value;
use core::any::Any;
use core::cmp::Ordering;

pub mod compound;
pub mod primitive;
pub mod registry;
pub mod text;

pub use compound::{HASH_TABLE, HASH_TABLE_NO_COPY, LIST, LIST_NO_COPY};
pub use primitive::{
    BOOL, BOOL_NO_COPY, F32, F32_NO_COPY, F64, F64_NO_COPY, I128, I128_NO_COPY, I16, I16_NO_COPY,
    I32, I32_NO_COPY, I64, I64_NO_COPY, I8, I8_NO_COPY, U128, U128_NO_COPY, U16, U16_NO_COPY,
    U32, U32_NO_COPY, U64, U64_NO_COPY, U8, U8_NO_COPY,
};
pub use text::{BYTES, BYTES_NO_COPY, STRING, STRING_CI, STRING_CI_NO_COPY, STRING_NO_COPY};

pub type Type = &'static dyn TypeDescriptor;

/// Operations a table needs from a stored kind.
///
/// Value arguments are `&dyn Any`; implementations must tolerate values
/// they do not accept (compare orders accepted before rejected, the rest
/// return empty output or an error).
pub trait TypeDescriptor: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn xml_name(&self) -> Option<&'static str> {
        None
    }

    /// True when values are heap structures rather than plain scalars.
    fn data_is_pointer(&self) -> bool;

    /// The owning descriptor this one borrows for, if it is a twin.
    fn owning(&self) -> Option<Type> {
        None
    }

    fn accepts(&self, v: &dyn Any) -> bool;

    fn create(&self) -> Value;

    /// Deep copy.
    fn copy(&self, v: &dyn Any) -> Option<Value>;

    /// Shallow copy; shares backing storage where the kind has any.
    fn share(&self, v: &dyn Any) -> Option<Value> {
        self.copy(v)
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Ordering;

    fn size(&self, v: &dyn Any) -> usize;

    fn format_value(&self, v: &dyn Any) -> String;

    fn to_bytes(&self, v: &dyn Any) -> Vec<u8> {
        self.format_value(v).into_bytes()
    }

    fn to_blob(&self, v: &dyn Any, out: &mut Vec<u8>) -> Result<(), BlobError>;

    /// Decodes one value, returning it with the number of bytes consumed.
    fn from_blob(&self, input: BlobInput<'_>) -> Result<(Value, usize), BlobError>;

    fn clear(&self, v: &mut Value);

    fn to_xml(&self, v: &dyn Any, element: &str, out: &mut String);

    #[cfg(feature = "json")]
    fn to_json(&self, v: &dyn Any) -> serde_json::Value;

    /// Kind-specific hash; `None` selects the generic byte hash.
    fn hash(&self, _v: &dyn Any) -> Option<u64> {
        None
    }
}

impl core::fmt::Debug for dyn TypeDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// True when `a` and `b` are the same descriptor.
pub fn same_type(a: Type, b: Type) -> bool {
    core::ptr::addr_eq(a as *const dyn TypeDescriptor, b as *const dyn TypeDescriptor)
}

/// The owning descriptor for a twin, or `ty` itself.
pub fn base(ty: Type) -> Type {
    ty.owning().unwrap_or(ty)
}

/// True when `ty` is a twin.
pub fn is_no_copy(ty: Type) -> bool {
    ty.owning().is_some()
}

/// Ordering for values that may not match the descriptor: matching values
/// order by `f`, a matching value sorts after a foreign one.
pub(crate) fn compare_with<T: ?Sized>(
    a: Option<&T>,
    b: Option<&T>,
    f: impl FnOnce(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => f(a, b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

pub(crate) fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

pub(crate) fn push_element(out: &mut String, element: &str, text: &str) {
    out.push('<');
    out.push_str(element);
    out.push('>');
    push_escaped(out, text);
    out.push_str("</");
    out.push_str(element);
    out.push('>');
}

/// Borrowing twin of a base descriptor.
pub struct Borrowed {
    base: Type,
}

impl Borrowed {
    pub const fn new(base: Type) -> Self {
        Borrowed { base }
    }
}

impl TypeDescriptor for Borrowed {
    fn name(&self) -> &'static str {
        self.base.name()
    }

    fn xml_name(&self) -> Option<&'static str> {
        self.base.xml_name()
    }

    fn data_is_pointer(&self) -> bool {
        self.base.data_is_pointer()
    }

    fn owning(&self) -> Option<Type> {
        Some(self.base)
    }

    fn accepts(&self, v: &dyn Any) -> bool {
        self.base.accepts(v)
    }

    fn create(&self) -> Value {
        self.base.create()
    }

    fn copy(&self, v: &dyn Any) -> Option<Value> {
        self.base.share(v)
    }

    fn share(&self, v: &dyn Any) -> Option<Value> {
        self.base.share(v)
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Ordering {
        self.base.compare(a, b)
    }

    fn size(&self, v: &dyn Any) -> usize {
        self.base.size(v)
    }

    fn format_value(&self, v: &dyn Any) -> String {
        self.base.format_value(v)
    }

    fn to_bytes(&self, v: &dyn Any) -> Vec<u8> {
        self.base.to_bytes(v)
    }

    fn to_blob(&self, v: &dyn Any, out: &mut Vec<u8>) -> Result<(), BlobError> {
        self.base.to_blob(v, out)
    }

    fn from_blob(&self, input: BlobInput<'_>) -> Result<(Value, usize), BlobError> {
        self.base.from_blob(input)
    }

    fn clear(&self, v: &mut Value) {
        self.base.clear(v)
    }

    fn to_xml(&self, v: &dyn Any, element: &str, out: &mut String) {
        self.base.to_xml(v, element, out)
    }

    #[cfg(feature = "json")]
    fn to_json(&self, v: &dyn Any) -> serde_json::Value {
        self.base.to_json(v)
    }

    fn hash(&self, v: &dyn Any) -> Option<u64> {
        self.base.hash(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: A twin resolves to its base and compares as a distinct descriptor.
    #[test]
    fn twin_resolves_to_base() {
        assert!(same_type(base(STRING_NO_COPY), STRING));
        assert!(!same_type(STRING_NO_COPY, STRING));
        assert!(is_no_copy(I32_NO_COPY));
        assert!(!is_no_copy(I32));
        assert_eq!(STRING_NO_COPY.name(), STRING.name());
    }

    /// Invariant: Distinct kinds are never the same descriptor.
    #[test]
    fn kinds_are_distinct() {
        assert!(!same_type(I32, U32));
        assert!(!same_type(STRING, STRING_CI));
        assert!(same_type(HASH_TABLE, HASH_TABLE));
    }
}
