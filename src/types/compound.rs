//! Nested structure kinds: lists and hash tables as values.

use super::{compare_with, Borrowed, Type, TypeDescriptor};
use crate::codec::{self, BlobInput};
use crate::error::BlobError;
use crate::hash_table::HashTable;
use crate::list::List;
use crate::sequence;
use crate::value::{cast, Value};
use core::any::Any;
use core::cmp::Ordering;

pub struct ListType {
    name: &'static str,
}

impl TypeDescriptor for ListType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn data_is_pointer(&self) -> bool {
        true
    }

    fn accepts(&self, v: &dyn Any) -> bool {
        cast::<List>(v).is_some()
    }

    fn create(&self) -> Value {
        Value::new(List::new(super::STRING))
    }

    fn copy(&self, v: &dyn Any) -> Option<Value> {
        cast::<List>(v).map(|l| Value::new(l.copy()))
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Ordering {
        compare_with(cast::<List>(a), cast::<List>(b), List::compare)
    }

    fn hash(&self, v: &dyn Any) -> Option<u64> {
        cast::<List>(v).map(sequence::hash)
    }

    fn size(&self, v: &dyn Any) -> usize {
        cast::<List>(v).map_or(0, |l| {
            core::mem::size_of::<List>() + l.len() * core::mem::size_of::<crate::list::ListNode>()
        })
    }

    fn format_value(&self, v: &dyn Any) -> String {
        cast::<List>(v).map(ToString::to_string).unwrap_or_default()
    }

    fn to_blob(&self, v: &dyn Any, out: &mut Vec<u8>) -> Result<(), BlobError> {
        let list = cast::<List>(v).ok_or(BlobError::TypeMismatch(self.name))?;
        codec::encode(list, out)
    }

    fn from_blob(&self, input: BlobInput<'_>) -> Result<(Value, usize), BlobError> {
        let decoded = codec::decode::<List>(input.nested())?;
        let consumed = decoded.consumed;
        Ok((Value::new(decoded.into_result()?), consumed))
    }

    fn clear(&self, v: &mut Value) {
        if let Some(l) = v.downcast_mut::<List>() {
            *l = List::new(l.key_type());
        }
    }

    fn to_xml(&self, v: &dyn Any, element: &str, out: &mut String) {
        if let Some(l) = cast::<List>(v) {
            l.write_xml(element, out);
        }
    }

    #[cfg(feature = "json")]
    fn to_json(&self, v: &dyn Any) -> serde_json::Value {
        cast::<List>(v)
            .map(List::to_json)
            .unwrap_or(serde_json::Value::Null)
    }
}

pub struct HashTableType {
    name: &'static str,
}

impl TypeDescriptor for HashTableType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn data_is_pointer(&self) -> bool {
        true
    }

    fn accepts(&self, v: &dyn Any) -> bool {
        cast::<HashTable>(v).is_some()
    }

    fn create(&self) -> Value {
        Value::new(HashTable::new(super::STRING))
    }

    fn copy(&self, v: &dyn Any) -> Option<Value> {
        cast::<HashTable>(v).map(|t| Value::new(t.copy()))
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Ordering {
        compare_with(cast::<HashTable>(a), cast::<HashTable>(b), HashTable::compare)
    }

    fn hash(&self, v: &dyn Any) -> Option<u64> {
        cast::<HashTable>(v).map(sequence::hash)
    }

    fn size(&self, v: &dyn Any) -> usize {
        cast::<HashTable>(v).map_or(0, HashTable::size_in_memory)
    }

    fn format_value(&self, v: &dyn Any) -> String {
        cast::<HashTable>(v).map(ToString::to_string).unwrap_or_default()
    }

    fn to_bytes(&self, v: &dyn Any) -> Vec<u8> {
        cast::<HashTable>(v).map(HashTable::to_bytes).unwrap_or_default()
    }

    fn to_blob(&self, v: &dyn Any, out: &mut Vec<u8>) -> Result<(), BlobError> {
        let table = cast::<HashTable>(v).ok_or(BlobError::TypeMismatch(self.name))?;
        codec::encode(table, out)
    }

    fn from_blob(&self, input: BlobInput<'_>) -> Result<(Value, usize), BlobError> {
        let decoded = codec::decode::<HashTable>(input.nested())?;
        let consumed = decoded.consumed;
        Ok((Value::new(decoded.into_result()?), consumed))
    }

    fn clear(&self, v: &mut Value) {
        if let Some(t) = v.downcast_mut::<HashTable>() {
            t.clear();
        }
    }

    fn to_xml(&self, v: &dyn Any, element: &str, out: &mut String) {
        if let Some(t) = cast::<HashTable>(v) {
            t.write_xml(element, out);
        }
    }

    #[cfg(feature = "json")]
    fn to_json(&self, v: &dyn Any) -> serde_json::Value {
        cast::<HashTable>(v)
            .map(HashTable::to_json)
            .unwrap_or(serde_json::Value::Null)
    }
}

static LIST_DESC: ListType = ListType { name: "list" };
static LIST_NC: Borrowed = Borrowed::new(&LIST_DESC);
static HASH_TABLE_DESC: HashTableType = HashTableType { name: "hash_table" };
static HASH_TABLE_NC: Borrowed = Borrowed::new(&HASH_TABLE_DESC);

/// Nested [`List`] values.
pub static LIST: Type = &LIST_DESC;
pub static LIST_NO_COPY: Type = &LIST_NC;
/// Nested [`HashTable`] values.
pub static HASH_TABLE: Type = &HASH_TABLE_DESC;
pub static HASH_TABLE_NO_COPY: Type = &HASH_TABLE_NC;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{I32, STRING, STRING_CI};

    /// Invariant: Nested tables compare structurally and copy deeply.
    #[test]
    fn nested_table_compare_and_copy() {
        let mut inner = HashTable::new(STRING);
        inner.add_entry("a", 1i32, I32).unwrap();
        let copy = HASH_TABLE.copy(&inner).unwrap();
        assert_eq!(HASH_TABLE.compare(&inner, copy.as_any()), Ordering::Equal);
        inner.add_entry("b", 2i32, I32).unwrap();
        assert_eq!(HASH_TABLE.compare(&inner, copy.as_any()), Ordering::Greater);
    }

    /// Invariant: Tables that compare equal hash alike, so either one finds
    /// the other's entry when used as a key.
    #[test]
    fn equal_tables_hash_alike() {
        let mut k1 = HashTable::new(STRING);
        k1.add_entry("a", 1i32, I32).unwrap();
        let mut k2 = HashTable::new(STRING);
        k2.add_entry("b", 1i32, I32).unwrap();
        assert_eq!(HASH_TABLE.compare(&k1, &k2), Ordering::Equal);
        assert_eq!(HASH_TABLE.hash(&k1), HASH_TABLE.hash(&k2));

        let mut t = HashTable::new(HASH_TABLE);
        t.add_entry(k1, "found", STRING).unwrap();
        assert_eq!(t.get_value(&k2).and_then(Value::as_str), Some("found"));

        let mut other = HashTable::new(STRING);
        other.add_entry("a", 2i32, I32).unwrap();
        assert!(t.get_value(&other).is_none());
    }

    /// Invariant: Nested values hash by their own kind, so case-blind text
    /// inside a list hashes case-blind.
    #[test]
    fn list_hash_follows_value_kinds() {
        let mut a = List::new(STRING);
        a.push("x", "Urn", STRING_CI);
        let mut b = List::new(STRING);
        b.push("y", "URN", STRING_CI);
        assert_eq!(LIST.compare(&a, &b), Ordering::Equal);
        assert_eq!(LIST.hash(&a), LIST.hash(&b));
    }

    /// Invariant: A nested table that decodes only partially is a value error.
    #[test]
    fn partial_nested_decode_is_error() {
        let mut inner = HashTable::new(STRING);
        inner.add_entry("a", 1i32, I32).unwrap();
        let mut blob = inner.to_blob().unwrap();
        blob.truncate(blob.len() - 1);
        assert!(HASH_TABLE.from_blob(BlobInput::copied(&blob)).is_err());
    }

    /// Invariant: Clearing a nested value empties it in place.
    #[test]
    fn clear_nested() {
        let mut inner = HashTable::new(STRING);
        inner.add_entry("a", 1i32, I32).unwrap();
        let mut v = Value::new(inner);
        HASH_TABLE.clear(&mut v);
        assert!(v.as_table().unwrap().is_empty());
    }
}
