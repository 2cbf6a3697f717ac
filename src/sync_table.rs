//! SyncHashTable: a `HashTable` behind a recursive lock.
//!
//! Every operation holds the lock for its full duration, so compound
//! operations (copy, encode, display) see a consistent table. The lock is
//! reentrant: a thread already inside an operation, for example from a
//! closure passed to [`SyncHashTable::read`], can call back into the same
//! table without deadlocking. Re-entry that would alias a mutable borrow
//! is refused with [`TableError::Busy`].

use crate::codec::Decoded;
use crate::error::{BlobError, Result, TableError};
use crate::hash_table::{Entry, EntryId, EntryRef, HashTable};
use crate::types::Type;
use crate::value::Value;
use core::any::Any;
use core::cell::RefCell;
use core::cmp::Ordering;
use core::fmt;
use parking_lot::ReentrantMutex;
use std::sync::Arc;
use std::time::Duration;

/// How long [`SyncHashTable::compare`] waits for its second lock.
pub const COMPARE_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

pub struct SyncHashTable {
    inner: ReentrantMutex<RefCell<HashTable>>,
}

impl SyncHashTable {
    pub fn new(key_type: Type) -> Self {
        HashTable::new(key_type).into()
    }

    pub fn with_capacity(key_type: Type, size_hint: usize) -> Self {
        HashTable::with_capacity(key_type, size_hint).into()
    }

    pub fn into_inner(self) -> HashTable {
        self.inner.into_inner().into_inner()
    }

    /// Runs `f` on the table under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&HashTable) -> R) -> Result<R> {
        let guard = self.inner.lock();
        let table = guard.try_borrow().map_err(|_| {
            log::warn!("table read while a mutation is in progress on this thread");
            TableError::Busy
        })?;
        Ok(f(&*table))
    }

    /// Runs `f` on the table under the lock with mutable access.
    pub fn write<R>(&self, f: impl FnOnce(&mut HashTable) -> R) -> Result<R> {
        let guard = self.inner.lock();
        let mut table = guard.try_borrow_mut().map_err(|_| {
            log::warn!("table mutated while already borrowed on this thread");
            TableError::Busy
        })?;
        Ok(f(&mut *table))
    }

    pub fn add_entry(
        &self,
        key: impl Into<Value>,
        value: impl Into<Value>,
        ty: Type,
    ) -> Result<EntryId> {
        self.write(|t| t.add_entry(key, value, ty))?
    }

    pub fn add_entry_inferred(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<EntryId> {
        self.write(|t| t.add_entry_inferred(key, value))?
    }

    pub fn add_entry_copied(&self, key: &dyn Any, value: &dyn Any, ty: Type) -> Result<EntryId> {
        self.write(|t| t.add_entry_copied(key, value, ty))?
    }

    /// Copy of the value stored under `key`.
    pub fn get_value(&self, key: &dyn Any) -> Option<Value> {
        self.with_entry(key, |e| e.value_type().copy(e.value().as_any()))
            .flatten()
    }

    /// Runs `f` on the entry for `key` while the lock is held.
    pub fn with_entry<R>(&self, key: &dyn Any, f: impl FnOnce(EntryRef<'_>) -> R) -> Option<R> {
        self.read(|t| t.get_entry(key).map(f)).ok().flatten()
    }

    pub fn contains_key(&self, key: &dyn Any) -> bool {
        self.read(|t| t.contains_key(key)).unwrap_or(false)
    }

    pub fn remove_entry(&self, key: &dyn Any) -> Result<Option<Entry>> {
        self.write(|t| t.remove_entry(key))
    }

    pub fn clear(&self) -> Result<()> {
        self.write(HashTable::clear)
    }

    pub fn len(&self) -> usize {
        self.read(HashTable::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.read(HashTable::capacity).unwrap_or(0)
    }

    pub fn key_type(&self) -> Option<Type> {
        self.read(HashTable::key_type).ok()
    }

    pub fn hash_key(&self, key: &dyn Any) -> usize {
        self.read(|t| t.hash_key(key)).unwrap_or(0)
    }

    pub fn copy(&self) -> Result<SyncHashTable> {
        self.read(|t| SyncHashTable::from(t.copy()))
    }

    /// Deep copy of the underlying table.
    pub fn snapshot(&self) -> Result<HashTable> {
        self.read(HashTable::copy)
    }

    /// Compares under both locks, taken in address order.
    ///
    /// The second lock is only waited on for [`COMPARE_LOCK_TIMEOUT`]: a
    /// thread already holding one of the tables (inside [`read`] or
    /// [`write`]) could otherwise deadlock against a thread comparing the
    /// pair the other way round. Timing out, or either table being mutated
    /// by this thread, is [`TableError::Busy`].
    ///
    /// [`read`]: SyncHashTable::read
    /// [`write`]: SyncHashTable::write
    pub fn compare(&self, other: &SyncHashTable) -> Result<Ordering> {
        if core::ptr::eq(self, other) {
            return self.read(|_| Ordering::Equal);
        }
        let (first, second) = if (self as *const Self) < (other as *const Self) {
            (self, other)
        } else {
            (other, self)
        };
        let first_guard = first.inner.lock();
        let Some(second_guard) = second.inner.try_lock_for(COMPARE_LOCK_TIMEOUT) else {
            log::warn!("compare timed out waiting for the second table");
            return Err(TableError::Busy);
        };
        let (a, b) = if core::ptr::eq(first, self) {
            (&first_guard, &second_guard)
        } else {
            (&second_guard, &first_guard)
        };
        let ord = match (a.try_borrow(), b.try_borrow()) {
            (Ok(a), Ok(b)) => Ok(a.compare(&b)),
            _ => {
                log::warn!("compare on a table that is being mutated by this thread");
                Err(TableError::Busy)
            }
        };
        ord
    }

    pub fn to_blob(&self) -> Result<Vec<u8>> {
        Ok(self.read(HashTable::to_blob)??)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.read(HashTable::to_bytes)
    }

    pub fn from_blob(bytes: &[u8]) -> Result<Decoded<SyncHashTable>, BlobError> {
        HashTable::from_blob(bytes).map(Decoded::into_sync)
    }

    pub fn from_blob_in_place(buf: Arc<[u8]>) -> Result<Decoded<SyncHashTable>, BlobError> {
        HashTable::from_blob_in_place(buf).map(Decoded::into_sync)
    }
}

impl Decoded<HashTable> {
    fn into_sync(self) -> Decoded<SyncHashTable> {
        Decoded {
            value: self.value.into(),
            consumed: self.consumed,
            error: self.error,
        }
    }
}

impl From<HashTable> for SyncHashTable {
    fn from(table: HashTable) -> Self {
        SyncHashTable {
            inner: ReentrantMutex::new(RefCell::new(table)),
        }
    }
}

impl fmt::Display for SyncHashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.read(|t| t.to_string()) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl fmt::Debug for SyncHashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.read(|t| format!("{t:?}")) {
            Ok(s) => write!(f, "SyncHashTable({s})"),
            Err(_) => f.write_str("SyncHashTable(<borrowed>)"),
        }
    }
}
