//! bucket-table: a type-erased hash table whose buckets are ordered
//! collision chains and whose entries share one global iteration order.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one table structure that stores keys and values of any kind
//!   described at runtime, iterates in a deterministic order, and encodes
//!   to a stable versioned binary format.
//! - Layers:
//!   - TypeDescriptor / registry: `'static` vtables for each kind plus a
//!     process-wide index table that names kinds on the wire. Every kind
//!     has a borrowing twin at the next index.
//!   - HashTable: structural layer. Fixed bucket array, each occupied
//!     bucket an ordered chain; entries live in a generational arena and
//!     are linked into one doubly linked list ordered by bucket index, then
//!     key order.
//!   - SyncHashTable: wraps HashTable in a reentrant mutex for shared use
//!     across threads.
//!   - codec / xml / json: conversion to and from bytes and text.
//!
//! Constraints
//! - Capacity is fixed at construction (at least 64 buckets); there is no
//!   rehashing.
//! - The key kind is fixed per table; each value carries its own kind.
//! - Duplicate keys are kept. Lookups and removals act on the oldest.
//! - Global order invariant: walking `head -> next` visits every entry
//!   exactly once, buckets in ascending index, each bucket in key order;
//!   walking `tail -> prev` visits the reverse.
//!
//! Why this split?
//! - Structural code never needs a lock: `&mut HashTable` already proves
//!   exclusive access, which is the "thread safety disabled" mode.
//! - Locking lives in one wrapper whose every operation holds the lock for
//!   its full duration.
//! - Kind-specific behaviour is isolated behind descriptors, so the table
//!   never inspects a value itself.
//!
//! Reentrancy policy
//! - HashTable only calls descriptor code (`compare`, `hash`, `to_blob`)
//!   while probing; mutation requires `&mut self`, so a descriptor cannot
//!   reenter a table it is being called from.
//! - SyncHashTable permits same-thread reentry through its recursive lock.
//!   Reads nest freely; a mutation attempted while the same thread holds a
//!   borrow is refused with `TableError::Busy`.
//!
//! Wire format
//! - `u16 0x4ABC | u32 10 | i16 key kind | u64 count`, then per entry
//!   `i16 value kind | value | key`, all little-endian. Decoding keeps
//!   whatever decoded before an entry-level failure and reports the
//!   failure alongside it.
//!
//! Notes and non-goals
//! - No persistence, networking or resizing.
//! - Null tables and null keys are unrepresentable; `compare_tables`
//!   covers the optional-table comparison.

mod bucket;
pub mod codec;
pub mod error;
pub mod hash;
pub mod hash_table;
#[cfg(test)]
mod hash_table_proptest;
#[cfg(feature = "json")]
pub mod json;
pub mod list;
mod sequence;
pub mod sync_table;
pub mod types;
pub mod value;
pub mod xml;

// Public surface
pub use codec::{BlobInput, Decoded, DS_MARKER, DS_VERSION, MAX_NESTING_DEPTH};
pub use error::{BlobError, Result, TableError};
pub use hash_table::{
    compare_tables, Entry, EntryId, EntryRef, HashTable, Iter, MIN_HASH_TABLE_SIZE,
    OPTIMAL_HASH_TABLE_SIZE,
};
#[cfg(feature = "json")]
pub use json::json_to_hash_table;
pub use list::{List, ListNode};
pub use sync_table::SyncHashTable;
pub use types::{Type, TypeDescriptor};
pub use value::{ByteBuf, Text, Value};
pub use xml::xml_to_hash_table;
