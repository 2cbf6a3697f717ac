//! HashTable: structural layer with ordered buckets and a global entry order.
//!
//! Entries live in a generational arena and are addressed by [`EntryId`].
//! Each hash index holds an ordered [`Bucket`]; in addition every entry is
//! linked into one doubly linked list whose order is "bucket index, then
//! key order within the bucket". That list is what iteration, comparison,
//! display and the binary codec walk.

use crate::bucket::Bucket;
use crate::error::{Result, TableError};
use crate::hash::one_at_a_time;
use crate::list::List;
use crate::sequence::{self, Sequence};
use crate::types::{self, Type};
use crate::value::{unwrap_any, Value};
use core::any::Any;
use core::cmp::Ordering;
use core::fmt;
use slotmap::{new_key_type, SlotMap};

/// Capacity used by [`HashTable::new`].
pub const OPTIMAL_HASH_TABLE_SIZE: usize = 64;
/// Smallest capacity a table is created with.
pub const MIN_HASH_TABLE_SIZE: usize = u64::BITS as usize;

new_key_type! {
    /// Stable handle to one entry of a [`HashTable`].
    pub struct EntryId;
}

struct Node {
    key: Value,
    value: Value,
    ty: Type,
    prev: Option<EntryId>,
    next: Option<EntryId>,
}

/// Borrowed view of one entry.
#[derive(Clone, Copy)]
pub struct EntryRef<'a> {
    id: EntryId,
    node: &'a Node,
}

impl<'a> EntryRef<'a> {
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn key(&self) -> &'a Value {
        &self.node.key
    }

    pub fn value(&self) -> &'a Value {
        &self.node.value
    }

    pub fn value_type(&self) -> Type {
        self.node.ty
    }
}

impl fmt::Debug for EntryRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryRef")
            .field("id", &self.id)
            .field("key", &self.node.key)
            .field("value", &self.node.value)
            .field("type", &self.node.ty.name())
            .finish()
    }
}

/// An entry taken out of a table.
#[derive(Debug)]
pub struct Entry {
    pub key: Value,
    pub value: Value,
    pub ty: Type,
}

/// Fixed-capacity hash table over type-erased keys and values.
///
/// The key kind is fixed per table; each value carries its own kind.
/// Capacity never changes after construction.
pub struct HashTable {
    buckets: Box<[Option<Bucket>]>,
    nodes: SlotMap<EntryId, Node>,
    key_type: Type,
    last_added_type: Option<Type>,
    head: Option<EntryId>,
    tail: Option<EntryId>,
}

impl HashTable {
    pub fn new(key_type: Type) -> Self {
        Self::with_capacity(key_type, OPTIMAL_HASH_TABLE_SIZE)
    }

    /// Capacity is `size_hint`, raised to [`MIN_HASH_TABLE_SIZE`].
    pub fn with_capacity(key_type: Type, size_hint: usize) -> Self {
        let capacity = size_hint.max(MIN_HASH_TABLE_SIZE);
        log::trace!(
            "creating table with key type `{}` and {capacity} buckets",
            key_type.name()
        );
        HashTable {
            buckets: (0..capacity).map(|_| None).collect(),
            nodes: SlotMap::with_key(),
            key_type,
            last_added_type: None,
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn key_type(&self) -> Type {
        self.key_type
    }

    /// Replaces the key kind. Existing keys are not revalidated.
    pub fn set_key_type(&mut self, key_type: Type) {
        self.key_type = key_type;
    }

    /// Value kind of the most recent insert.
    pub fn last_added_type(&self) -> Option<Type> {
        self.last_added_type
    }

    /// Bucket index of `key`; keys the key kind does not accept map to 0.
    pub fn hash_key(&self, key: &dyn Any) -> usize {
        let key = unwrap_any(key);
        if !self.key_type.accepts(key) {
            log::debug!("hash of a key not of type `{}`", self.key_type.name());
            return 0;
        }
        let hash = match self.key_type.hash(key) {
            Some(h) => h,
            None => {
                let mut canonical = Vec::new();
                if self.key_type.to_blob(key, &mut canonical).is_err() {
                    return 0;
                }
                one_at_a_time(canonical)
            }
        };
        (hash % self.capacity() as u64) as usize
    }

    /// Inserts `key`/`value`, taking ownership of both.
    ///
    /// Equal keys are kept side by side; lookups find the oldest.
    pub fn add_entry(
        &mut self,
        key: impl Into<Value>,
        value: impl Into<Value>,
        ty: Type,
    ) -> Result<EntryId> {
        let key = key.into();
        let value = value.into();
        if !self.key_type.accepts(key.as_any()) {
            log::error!("key does not match key type `{}`", self.key_type.name());
            return Err(TableError::KeyType(self.key_type.name()));
        }
        if !ty.accepts(value.as_any()) {
            log::error!("value does not match value type `{}`", ty.name());
            return Err(TableError::ValueType(ty.name()));
        }
        Ok(self.insert_node(key, value, ty))
    }

    /// Inserts with the value kind of the previous insert, or the key kind
    /// when the table has seen no insert yet.
    pub fn add_entry_inferred(
        &mut self,
        key: impl Into<Value>,
        value: impl Into<Value>,
    ) -> Result<EntryId> {
        let ty = self.last_added_type.unwrap_or(self.key_type);
        log::debug!("defaulting value type to `{}`", ty.name());
        self.add_entry(key, value, ty)
    }

    /// Inserts copies of `key` and `value` made through their descriptors.
    pub fn add_entry_copied(&mut self, key: &dyn Any, value: &dyn Any, ty: Type) -> Result<EntryId> {
        let key = self
            .key_type
            .copy(key)
            .ok_or(TableError::KeyType(self.key_type.name()))?;
        let value = ty.copy(value).ok_or(TableError::ValueType(ty.name()))?;
        self.add_entry(key, value, ty)
    }

    fn insert_node(&mut self, key: Value, value: Value, ty: Type) -> EntryId {
        let index = self.hash_key(key.as_any());
        log::trace!("adding entry to bucket {index}");
        let key_type = self.key_type;
        let nodes = &self.nodes;

        let (pos, prev, next) = match &self.buckets[index] {
            Some(bucket) => {
                let pos = bucket
                    .insert_position(|id| key_type.compare(nodes[id].key.as_any(), key.as_any()));
                match pos.checked_sub(1).and_then(|p| bucket.get(p)) {
                    Some(before) => (pos, Some(before), nodes[before].next),
                    None => {
                        let after = bucket.get(pos);
                        (pos, after.and_then(|a| nodes[a].prev), after)
                    }
                }
            }
            None => {
                let (prev, next) = self.update_tree_links(index);
                (0, prev, next)
            }
        };

        let id = self.nodes.insert(Node {
            key,
            value,
            ty,
            prev,
            next,
        });
        self.buckets[index]
            .get_or_insert_with(Bucket::new)
            .insert_at(pos, id);
        self.link(id, prev, next);
        self.last_added_type = Some(ty);
        id
    }

    /// Neighbours in the global order for the first entry of a new bucket at
    /// `index`: the head of the next non-empty bucket and its predecessor,
    /// falling back to the tail of the closest earlier bucket.
    fn update_tree_links(&self, index: usize) -> (Option<EntryId>, Option<EntryId>) {
        if self.nodes.is_empty() {
            return (None, None);
        }
        let mut prev = None;
        let mut next = None;
        if let Some(bucket) = self.buckets[index + 1..].iter().flatten().next() {
            next = bucket.head();
            prev = next.and_then(|n| self.nodes[n].prev);
        }
        if prev.is_none() && index > 0 {
            if let Some(bucket) = self.buckets[..index].iter().rev().flatten().next() {
                prev = bucket.tail();
                if next.is_none() {
                    next = prev.and_then(|p| self.nodes[p].next);
                }
            }
        }
        (prev, next)
    }

    fn link(&mut self, id: EntryId, prev: Option<EntryId>, next: Option<EntryId>) {
        match prev {
            Some(p) => self.nodes[p].next = Some(id),
            None => self.head = Some(id),
        }
        match next {
            Some(n) => self.nodes[n].prev = Some(id),
            None => self.tail = Some(id),
        }
    }

    fn locate(&self, key: &dyn Any) -> Option<(usize, usize)> {
        let key = unwrap_any(key);
        if !self.key_type.accepts(key) {
            return None;
        }
        let index = self.hash_key(key);
        let bucket = self.buckets[index].as_ref()?;
        let pos = bucket.find(|id| self.key_type.compare(self.nodes[id].key.as_any(), key))?;
        Some((index, pos))
    }

    fn find_id(&self, key: &dyn Any) -> Option<EntryId> {
        let (index, pos) = self.locate(key)?;
        self.buckets[index].as_ref()?.get(pos)
    }

    pub fn get_entry(&self, key: &dyn Any) -> Option<EntryRef<'_>> {
        self.find_id(key).and_then(|id| self.entry(id))
    }

    pub fn get_value(&self, key: &dyn Any) -> Option<&Value> {
        self.get_entry(key).map(|e| e.value())
    }

    pub fn get_value_mut(&mut self, key: &dyn Any) -> Option<&mut Value> {
        let id = self.find_id(key)?;
        self.nodes.get_mut(id).map(|n| &mut n.value)
    }

    pub fn contains_key(&self, key: &dyn Any) -> bool {
        self.locate(key).is_some()
    }

    pub fn entry(&self, id: EntryId) -> Option<EntryRef<'_>> {
        self.nodes.get(id).map(|node| EntryRef { id, node })
    }

    /// Re-labels the value kind of an entry. The new kind must accept the
    /// stored value.
    pub fn set_entry_type(&mut self, id: EntryId, ty: Type) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(TableError::ValueType(ty.name()))?;
        if !ty.accepts(node.value.as_any()) {
            return Err(TableError::ValueType(ty.name()));
        }
        node.ty = ty;
        Ok(())
    }

    /// Removes the oldest entry with `key`. Absent keys are not an error.
    pub fn remove_entry(&mut self, key: &dyn Any) -> Option<Entry> {
        let (index, pos) = self.locate(key)?;
        let id = self.take_from_bucket(index, pos)?;
        self.unlink(id)
    }

    pub fn remove_by_id(&mut self, id: EntryId) -> Option<Entry> {
        let node = self.nodes.get(id)?;
        let index = self.hash_key(node.key.as_any());
        let pos = self.buckets[index].as_ref()?.position_of(id)?;
        self.take_from_bucket(index, pos)?;
        self.unlink(id)
    }

    fn take_from_bucket(&mut self, index: usize, pos: usize) -> Option<EntryId> {
        let bucket = self.buckets[index].as_mut()?;
        let id = bucket.remove_at(pos);
        if bucket.is_empty() {
            self.buckets[index] = None;
        }
        Some(id)
    }

    fn unlink(&mut self, id: EntryId) -> Option<Entry> {
        let node = self.nodes.remove(id)?;
        if self.head == Some(id) {
            self.head = node.next;
        }
        if self.tail == Some(id) {
            self.tail = node.prev;
        }
        if let Some(p) = node.prev {
            self.nodes[p].next = node.next;
        }
        if let Some(n) = node.next {
            self.nodes[n].prev = node.prev;
        }
        Some(Entry {
            key: node.key,
            value: node.value,
            ty: node.ty,
        })
    }

    /// Removes every entry; capacity and key kind are kept.
    pub fn clear(&mut self) {
        log::trace!("clearing {} entries", self.len());
        self.buckets.iter_mut().for_each(|b| *b = None);
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    /// Deep copy with the same key kind and capacity, entries re-added in
    /// order with their value kinds.
    pub fn copy(&self) -> HashTable {
        let mut copy = HashTable::with_capacity(self.key_type, self.capacity());
        for entry in self.iter() {
            if let Err(e) = copy.add_entry_copied(
                entry.key().as_any(),
                entry.value().as_any(),
                entry.value_type(),
            ) {
                log::error!("dropping entry while copying: {e}");
            }
        }
        copy
    }

    /// Orders by key kind, then size, then values in global order.
    /// Keys themselves are not compared.
    pub fn compare(&self, other: &HashTable) -> Ordering {
        sequence::compare(self, other)
    }

    pub fn head(&self) -> Option<EntryId> {
        self.head
    }

    pub fn tail(&self) -> Option<EntryId> {
        self.tail
    }

    pub fn next_id(&self, id: EntryId) -> Option<EntryId> {
        self.nodes.get(id)?.next
    }

    pub fn prev_id(&self, id: EntryId) -> Option<EntryId> {
        self.nodes.get(id)?.prev
    }

    /// Entries in global order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            table: self,
            front: self.head,
            back: self.tail,
            remaining: self.len(),
        }
    }

    /// Structural footprint of the table, excluding entry payloads.
    pub fn size_in_memory(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.capacity() * core::mem::size_of::<Option<Bucket>>()
            + self.len() * (core::mem::size_of::<Node>() + core::mem::size_of::<EntryId>())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Ordered copy of the entries.
    pub fn to_list(&self) -> List {
        let mut list = List::new(self.key_type);
        for entry in self.iter() {
            if let Err(e) = list.push_copied(
                entry.key().as_any(),
                entry.value().as_any(),
                entry.value_type(),
            ) {
                log::error!("dropping entry while converting to list: {e}");
            }
        }
        list
    }

    /// Builds a table sized to `list`. Nested lists become nested tables.
    pub fn from_list(list: &List) -> HashTable {
        let mut table = HashTable::with_capacity(list.key_type(), list.len());
        for node in list.iter() {
            let added = match node.value.as_list() {
                Some(nested) => {
                    let key_type = list.key_type();
                    let key = key_type
                        .copy(node.key.as_any())
                        .unwrap_or_else(|| key_type.create());
                    table.add_entry(key, HashTable::from_list(nested), types::HASH_TABLE)
                }
                None => table.add_entry_copied(node.key.as_any(), node.value.as_any(), node.ty),
            };
            if let Err(e) = added {
                log::error!("dropping list entry: {e}");
            }
        }
        table
    }

    /// Renders the table as `<element>` with one child per entry, named
    /// after the entry's key.
    pub fn to_xml(&self, element: &str) -> String {
        let mut out = String::new();
        self.write_xml(element, &mut out);
        out
    }

    pub(crate) fn write_xml(&self, element: &str, out: &mut String) {
        out.push('<');
        out.push_str(element);
        out.push('>');
        for entry in self.iter() {
            let name = self.key_type.format_value(entry.key().as_any());
            entry.value_type().to_xml(entry.value().as_any(), &name, out);
        }
        out.push_str("</");
        out.push_str(element);
        out.push('>');
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for entry in self.iter() {
            map.insert(
                self.key_type.format_value(entry.key().as_any()),
                entry.value_type().to_json(entry.value().as_any()),
            );
        }
        serde_json::Value::Object(map)
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut walked = Vec::new();
        let mut cur = self.head;
        let mut prev = None;
        while let Some(id) = cur {
            assert_eq!(self.nodes[id].prev, prev, "prev link mismatch");
            walked.push(id);
            prev = Some(id);
            cur = self.nodes[id].next;
        }
        assert_eq!(self.tail, prev, "tail is not the last walked entry");
        assert_eq!(walked.len(), self.len(), "global order misses entries");

        let mut expected = Vec::new();
        for (index, slot) in self.buckets.iter().enumerate() {
            if let Some(bucket) = slot {
                assert!(!bucket.is_empty(), "empty bucket at {index}");
                let mut last: Option<EntryId> = None;
                for id in bucket.iter() {
                    assert_eq!(self.hash_key(self.nodes[id].key.as_any()), index);
                    if let Some(l) = last {
                        assert_ne!(
                            self.key_type
                                .compare(self.nodes[l].key.as_any(), self.nodes[id].key.as_any()),
                            Ordering::Greater,
                            "bucket {index} out of order"
                        );
                    }
                    last = Some(id);
                    expected.push(id);
                }
            }
        }
        assert_eq!(walked, expected, "global order differs from bucket order");
    }
}

impl Clone for HashTable {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl fmt::Debug for HashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("key_type", &self.key_type.name())
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

fn push_indented(out: &mut String, text: &str, indent: &str) {
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
            out.push_str(indent);
        }
        out.push_str(line);
    }
}

impl fmt::Display for HashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from("{\n");
        out.push_str(&format!("  size={}\n", self.len()));
        out.push_str(&format!("  tableSize={}\n", self.capacity()));
        for (index, slot) in self.buckets.iter().enumerate() {
            let Some(bucket) = slot else { continue };
            out.push_str(&format!("  table[{index}]={{\n"));
            for id in bucket.iter() {
                let node = &self.nodes[id];
                out.push_str("    ");
                push_indented(&mut out, &self.key_type.format_value(node.key.as_any()), "    ");
                out.push_str(" = ");
                push_indented(&mut out, &node.ty.format_value(node.value.as_any()), "    ");
                out.push('\n');
            }
            out.push_str("  }\n");
        }
        out.push('}');
        f.write_str(&out)
    }
}

/// Compares two optional tables: absent tables sort first and two absent
/// tables are equal.
pub fn compare_tables(a: Option<&HashTable>, b: Option<&HashTable>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.compare(b),
    }
}

impl Sequence for HashTable {
    fn with_key_type(key_type: Type, size_hint: usize) -> Self {
        HashTable::with_capacity(key_type, size_hint)
    }

    fn key_type(&self) -> Type {
        self.key_type
    }

    fn set_key_type(&mut self, ty: Type) {
        self.key_type = ty;
    }

    fn count(&self) -> usize {
        self.len()
    }

    fn push(&mut self, key: Value, value: Value, ty: Type) -> Result<()> {
        self.add_entry(key, value, ty).map(|_| ())
    }

    fn entries(&self) -> Box<dyn ExactSizeIterator<Item = (&Value, &Value, Type)> + '_> {
        Box::new(self.iter().map(|e| (e.key(), e.value(), e.value_type())))
    }
}

/// Iterator over entries in global order.
pub struct Iter<'a> {
    table: &'a HashTable,
    front: Option<EntryId>,
    back: Option<EntryId>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = EntryRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front?;
        let node = self.table.nodes.get(id)?;
        self.remaining -= 1;
        self.front = node.next;
        Some(EntryRef { id, node })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.back?;
        let node = self.table.nodes.get(id)?;
        self.remaining -= 1;
        self.back = node.prev;
        Some(EntryRef { id, node })
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a HashTable {
    type Item = EntryRef<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BYTES, HASH_TABLE, I32, STRING, STRING_CI, U32};

    fn keys(t: &HashTable) -> Vec<String> {
        t.iter()
            .map(|e| t.key_type().format_value(e.key().as_any()))
            .collect()
    }

    /// Invariant: Capacity is raised to the minimum and otherwise kept.
    #[test]
    fn capacity_rules() {
        assert_eq!(HashTable::with_capacity(STRING, 0).capacity(), 64);
        assert_eq!(HashTable::with_capacity(STRING, 1).capacity(), 64);
        assert_eq!(HashTable::with_capacity(STRING, 200).capacity(), 200);
        assert_eq!(HashTable::new(STRING).capacity(), OPTIMAL_HASH_TABLE_SIZE);
    }

    /// Invariant: Keys of the wrong kind are rejected and leave the table unchanged.
    #[test]
    fn wrong_kinds_rejected() {
        let mut t = HashTable::new(STRING);
        assert!(matches!(
            t.add_entry(1i32, "v", STRING),
            Err(TableError::KeyType("string"))
        ));
        assert!(matches!(
            t.add_entry("k", 1i32, STRING),
            Err(TableError::ValueType("string"))
        ));
        assert!(t.is_empty());
        assert_eq!(t.hash_key(&1i32), 0);
    }

    /// Invariant: Forward and backward walks agree with bucket order after inserts.
    #[test]
    fn global_order_matches_buckets() {
        let mut t = HashTable::new(I32);
        for i in (0..300).rev() {
            t.add_entry(i, i, I32).unwrap();
            t.assert_invariants();
        }
        let fwd: Vec<EntryId> = t.iter().map(|e| e.id()).collect();
        let mut bwd: Vec<EntryId> = t.iter().rev().map(|e| e.id()).collect();
        bwd.reverse();
        assert_eq!(fwd, bwd);
        assert_eq!(t.iter().len(), 300);
    }

    /// Invariant: Removing heads, tails and middles keeps links and drops empty buckets.
    #[test]
    fn removal_keeps_order() {
        let mut t = HashTable::new(U32);
        for i in 0..200u32 {
            t.add_entry(i, i, U32).unwrap();
        }
        let head_key = *t.entry(t.head().unwrap()).unwrap().key().downcast_ref::<u32>().unwrap();
        assert!(t.remove_entry(&head_key).is_some());
        t.assert_invariants();
        let tail_key = *t.entry(t.tail().unwrap()).unwrap().key().downcast_ref::<u32>().unwrap();
        assert!(t.remove_entry(&tail_key).is_some());
        t.assert_invariants();
        for i in (0..200u32).step_by(3) {
            t.remove_entry(&i);
            t.assert_invariants();
        }
        assert!(t.remove_entry(&1000u32).is_none());
        while let Some(id) = t.head() {
            t.remove_by_id(id).unwrap();
            t.assert_invariants();
        }
        assert!(t.is_empty());
        assert!(t.tail().is_none());
    }

    /// Invariant: Duplicate keys are kept; lookup returns the oldest and removal
    /// exposes the next.
    #[test]
    fn duplicate_keys() {
        let mut t = HashTable::new(STRING);
        t.add_entry("k", "first", STRING).unwrap();
        t.add_entry("k", "second", STRING).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get_value(&"k").and_then(Value::as_str), Some("first"));
        t.remove_entry(&"k");
        assert_eq!(t.get_value(&"k").and_then(Value::as_str), Some("second"));
        t.assert_invariants();
    }

    /// Invariant: The inferred value kind follows the previous insert, else the key kind.
    #[test]
    fn inferred_value_type() {
        let mut t = HashTable::new(STRING);
        let id = t.add_entry_inferred("a", "b").unwrap();
        assert!(types::same_type(t.entry(id).unwrap().value_type(), STRING));
        t.add_entry("n", 5i32, I32).unwrap();
        let id = t.add_entry_inferred("m", 6i32).unwrap();
        assert!(types::same_type(t.entry(id).unwrap().value_type(), I32));
        assert!(t.add_entry_inferred("x", "not an i32").is_err());
    }

    /// Invariant: Retyping an entry requires the new kind to accept the value.
    #[test]
    fn set_entry_type_validates() {
        let mut t = HashTable::new(STRING);
        let id = t.add_entry("k", "v", STRING).unwrap();
        t.set_entry_type(id, types::STRING_NO_COPY).unwrap();
        assert!(types::is_no_copy(t.entry(id).unwrap().value_type()));
        assert!(t.set_entry_type(id, I32).is_err());
    }

    /// Invariant: A copy is equal, shares nothing and keeps capacity.
    #[test]
    fn copy_is_independent() {
        let mut t = HashTable::with_capacity(STRING, 100);
        t.add_entry("a", "1", STRING).unwrap();
        t.add_entry("b", 2i32, I32).unwrap();
        let mut c = t.copy();
        assert_eq!(c.capacity(), 100);
        assert_eq!(t.compare(&c), Ordering::Equal);
        assert_eq!(keys(&t), keys(&c));
        *c.get_value_mut(&"b").unwrap().downcast_mut::<i32>().unwrap() = 3;
        assert_eq!(t.get_value(&"b").unwrap().downcast_ref::<i32>(), Some(&2));
        assert_ne!(t.compare(&c), Ordering::Equal);
    }

    /// Invariant: Optional comparison orders absent before present.
    #[test]
    fn compare_optional_tables() {
        let t = HashTable::new(STRING);
        assert_eq!(compare_tables(None, None), Ordering::Equal);
        assert_eq!(compare_tables(None, Some(&t)), Ordering::Less);
        assert_eq!(compare_tables(Some(&t), None), Ordering::Greater);
        assert_eq!(compare_tables(Some(&t), Some(&t)), Ordering::Equal);
    }

    /// Invariant: Case-insensitive keys collide into one bucket and one entry.
    #[test]
    fn case_insensitive_lookup() {
        let mut t = HashTable::new(STRING_CI);
        t.add_entry("SoapAction", b"urn:x".to_vec(), BYTES).unwrap();
        assert_eq!(t.hash_key(&"SoapAction"), t.hash_key(&"SOAPAction"));
        assert_eq!(
            t.get_value(&"SOAPAction").and_then(Value::as_str),
            Some("urn:x")
        );
    }

    /// Invariant: Display lists size, capacity and occupied buckets.
    #[test]
    fn display_format() {
        let mut t = HashTable::new(STRING);
        t.add_entry("key1", "value1", STRING).unwrap();
        let index = t.hash_key(&"key1");
        let s = t.to_string();
        assert!(s.starts_with("{\n  size=1\n  tableSize=64\n"));
        assert!(s.contains(&format!("  table[{index}]={{\n    key1 = value1\n  }}\n")));
        assert!(s.ends_with('}'));
    }

    /// Invariant: List conversion keeps order; nested lists become tables.
    #[test]
    fn list_conversion() {
        let mut t = HashTable::new(STRING);
        for k in ["a", "b", "c", "d"] {
            t.add_entry(k, k, STRING).unwrap();
        }
        let list = t.to_list();
        assert_eq!(list.len(), 4);
        let back = HashTable::from_list(&list);
        assert_eq!(t.compare(&back), Ordering::Equal);

        let mut inner = List::new(STRING);
        inner.push("x", 1i32, I32);
        let mut outer = List::new(STRING);
        outer.push("nested", inner, types::LIST);
        let table = HashTable::from_list(&outer);
        let entry = table.get_entry(&"nested").unwrap();
        assert!(types::same_type(entry.value_type(), HASH_TABLE));
        assert!(entry.value().as_table().unwrap().contains_key(&"x"));
    }

    /// Invariant: Clearing keeps capacity and key kind and resets links.
    #[test]
    fn clear_resets() {
        let mut t = HashTable::new(STRING);
        t.add_entry("a", "b", STRING).unwrap();
        t.clear();
        assert!(t.is_empty());
        assert!(t.head().is_none() && t.tail().is_none());
        assert_eq!(t.capacity(), 64);
        t.add_entry("a", "b", STRING).unwrap();
        t.assert_invariants();
    }
}
