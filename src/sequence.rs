//! Behaviour shared by ordered key/value sequences (tables and lists):
//! comparison and the hooks the codec builds and walks them through.

use crate::error::Result;
use crate::hash::one_at_a_time;
use crate::types::{base, registry, same_type, Type};
use crate::value::Value;
use core::cmp::Ordering;

pub(crate) trait Sequence: Sized {
    fn with_key_type(key_type: Type, size_hint: usize) -> Self;
    fn key_type(&self) -> Type;
    fn set_key_type(&mut self, ty: Type);
    fn count(&self) -> usize;
    fn push(&mut self, key: Value, value: Value, ty: Type) -> Result<()>;
    fn entries(&self) -> Box<dyn ExactSizeIterator<Item = (&Value, &Value, Type)> + '_>;
}

/// Order of two kinds by registry index; twins rank as their base.
pub(crate) fn kind_order(a: Type, b: Type) -> Ordering {
    let (a, b) = (base(a), base(b));
    match (registry::index_of(a), registry::index_of(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name().cmp(b.name()),
    }
}

pub(crate) fn compare<A: Sequence, B: Sequence>(a: &A, b: &B) -> Ordering {
    if !same_type(base(a.key_type()), base(b.key_type())) {
        return kind_order(a.key_type(), b.key_type());
    }
    match a.count().cmp(&b.count()) {
        Ordering::Equal => {}
        ord => return ord,
    }
    for (position, ((_, va, ta), (_, vb, tb))) in a.entries().zip(b.entries()).enumerate() {
        if !same_type(base(ta), base(tb)) {
            return kind_order(ta, tb);
        }
        let ord = ta.compare(va.as_any(), vb.as_any());
        if ord != Ordering::Equal {
            log::debug!("sequences differ at position {position}");
            return ord;
        }
    }
    Ordering::Equal
}

/// Hash agreeing with [`compare`]: covers the key kind, the count and every
/// value with its kind. Keys are left out.
pub(crate) fn hash<S: Sequence>(seq: &S) -> u64 {
    let mut bytes = Vec::new();
    push_kind(&mut bytes, seq.key_type());
    bytes.extend_from_slice(&(seq.count() as u64).to_le_bytes());
    for (_, value, ty) in seq.entries() {
        push_kind(&mut bytes, ty);
        let h = match ty.hash(value.as_any()) {
            Some(h) => h,
            None => {
                let mut blob = Vec::new();
                // Values that cannot be encoded hash by kind alone.
                let _ = ty.to_blob(value.as_any(), &mut blob);
                one_at_a_time(blob)
            }
        };
        bytes.extend_from_slice(&h.to_le_bytes());
    }
    one_at_a_time(bytes)
}

fn push_kind(out: &mut Vec<u8>, ty: Type) {
    let ty = base(ty);
    match registry::index_of(ty) {
        Some(index) => out.extend_from_slice(&index.to_le_bytes()),
        None => out.extend_from_slice(ty.name().as_bytes()),
    }
}
