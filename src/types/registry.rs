//! Process-wide registry assigning stable indices to descriptors.
//!
//! Indices are part of the wire format: index `i` is a base kind and
//! `i + 1` its borrowing twin. Built-in kinds occupy `1..=36` in a fixed
//! order with every scalar before every compound kind; descriptors added
//! through [`register`] are appended after them. Index `0` and negative
//! indices are never assigned.

use super::{base, is_no_copy, same_type, Borrowed, Type};
use super::{
    BOOL, BOOL_NO_COPY, BYTES, BYTES_NO_COPY, F32, F32_NO_COPY, F64, F64_NO_COPY, HASH_TABLE,
    HASH_TABLE_NO_COPY, I128, I128_NO_COPY, I16, I16_NO_COPY, I32, I32_NO_COPY, I64,
    I64_NO_COPY, I8, I8_NO_COPY, LIST, LIST_NO_COPY, STRING, STRING_CI, STRING_CI_NO_COPY,
    STRING_NO_COPY, U128, U128_NO_COPY, U16, U16_NO_COPY, U32, U32_NO_COPY, U64, U64_NO_COPY,
    U8, U8_NO_COPY,
};
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

struct Registry {
    by_index: Vec<Type>,
    by_addr: HashMap<usize, i16>,
}

impl Registry {
    fn with_builtins() -> Self {
        #[rustfmt::skip]
        let builtins = [
            BOOL, BOOL_NO_COPY,
            I8, I8_NO_COPY, U8, U8_NO_COPY,
            I16, I16_NO_COPY, U16, U16_NO_COPY,
            I32, I32_NO_COPY, U32, U32_NO_COPY,
            I64, I64_NO_COPY, U64, U64_NO_COPY,
            I128, I128_NO_COPY, U128, U128_NO_COPY,
            F32, F32_NO_COPY, F64, F64_NO_COPY,
            STRING, STRING_NO_COPY, STRING_CI, STRING_CI_NO_COPY,
            BYTES, BYTES_NO_COPY,
            LIST, LIST_NO_COPY, HASH_TABLE, HASH_TABLE_NO_COPY,
        ];
        let mut registry = Registry {
            by_index: Vec::with_capacity(builtins.len()),
            by_addr: HashMap::with_capacity(builtins.len()),
        };
        for ty in builtins {
            registry.push(ty);
        }
        registry
    }

    fn push(&mut self, ty: Type) -> i16 {
        self.by_index.push(ty);
        let index = self.by_index.len() as i16;
        self.by_addr.insert(addr(ty), index);
        index
    }
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::with_builtins()));

fn addr(ty: Type) -> usize {
    ty as *const dyn super::TypeDescriptor as *const () as usize
}

/// Index of `ty`, if registered.
pub fn index_of(ty: Type) -> Option<i16> {
    REGISTRY.read().by_addr.get(&addr(ty)).copied()
}

/// Descriptor at `index`, if any.
pub fn type_at(index: i16) -> Option<Type> {
    if index < 1 {
        return None;
    }
    REGISTRY.read().by_index.get(index as usize - 1).copied()
}

/// The borrowing twin of `ty`; a twin is its own twin.
pub fn no_copy(ty: Type) -> Option<Type> {
    if is_no_copy(ty) {
        return Some(ty);
    }
    let twin = type_at(index_of(ty)?.checked_add(1)?)?;
    twin.owning()
        .filter(|owner| same_type(*owner, ty))
        .map(|_| twin)
}

/// True for kinds whose values are nested structures (lists, tables and
/// anything registered after them).
pub fn is_compound(ty: Type) -> bool {
    match (index_of(base(ty)), index_of(LIST)) {
        (Some(i), Some(list)) => i >= list,
        _ => true,
    }
}

/// Registers a descriptor and a borrowing twin for it, returning the
/// descriptor's index. Registering the same descriptor again returns the
/// existing index.
pub fn register(ty: Type) -> i16 {
    let ty = base(ty);
    let mut registry = REGISTRY.write();
    if let Some(&index) = registry.by_addr.get(&addr(ty)) {
        return index;
    }
    let twin: Type = Box::leak(Box::new(Borrowed::new(ty)));
    let index = registry.push(ty);
    registry.push(twin);
    log::debug!("registered type `{}` at index {index}", ty.name());
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BlobInput;
    use crate::error::BlobError;
    use crate::types::TypeDescriptor;
    use crate::value::Value;
    use core::any::Any;
    use core::cmp::Ordering;

    /// Invariant: Built-in kinds have fixed indices and twins follow their base.
    #[test]
    fn builtin_indices_are_stable() {
        assert_eq!(index_of(BOOL), Some(1));
        assert_eq!(index_of(BOOL_NO_COPY), Some(2));
        assert_eq!(index_of(I32), Some(11));
        assert_eq!(index_of(STRING), Some(27));
        assert_eq!(index_of(LIST), Some(33));
        assert_eq!(index_of(HASH_TABLE), Some(35));
        for i in (1..=35).step_by(2) {
            let ty = type_at(i).unwrap();
            let twin = type_at(i + 1).unwrap();
            assert!(same_type(base(twin), ty));
            assert!(same_type(no_copy(ty).unwrap(), twin));
        }
    }

    /// Invariant: Index 0 and negative indices never resolve.
    #[test]
    fn invalid_indices() {
        assert!(type_at(0).is_none());
        assert!(type_at(-1).is_none());
        assert!(type_at(i16::MAX).is_none());
    }

    /// Invariant: Scalars are not compound; lists, tables and their twins are.
    #[test]
    fn compound_kinds() {
        assert!(!is_compound(BOOL));
        assert!(!is_compound(BYTES_NO_COPY));
        assert!(is_compound(LIST));
        assert!(is_compound(HASH_TABLE_NO_COPY));
    }

    struct Unit {
        name: &'static str,
    }

    impl TypeDescriptor for Unit {
        fn name(&self) -> &'static str {
            self.name
        }
        fn data_is_pointer(&self) -> bool {
            false
        }
        fn accepts(&self, v: &dyn Any) -> bool {
            v.is::<()>()
        }
        fn create(&self) -> Value {
            Value::new(())
        }
        fn copy(&self, _v: &dyn Any) -> Option<Value> {
            Some(Value::new(()))
        }
        fn compare(&self, _a: &dyn Any, _b: &dyn Any) -> Ordering {
            Ordering::Equal
        }
        fn size(&self, _v: &dyn Any) -> usize {
            0
        }
        fn format_value(&self, _v: &dyn Any) -> String {
            "()".into()
        }
        fn to_blob(&self, _v: &dyn Any, _out: &mut Vec<u8>) -> Result<(), BlobError> {
            Ok(())
        }
        fn from_blob(&self, _input: BlobInput<'_>) -> Result<(Value, usize), BlobError> {
            Ok((Value::new(()), 0))
        }
        fn clear(&self, _v: &mut Value) {}
        fn to_xml(&self, _v: &dyn Any, _element: &str, _out: &mut String) {}
        #[cfg(feature = "json")]
        fn to_json(&self, _v: &dyn Any) -> serde_json::Value {
            serde_json::Value::Null
        }
    }

    static UNIT: Unit = Unit { name: "unit" };

    /// Invariant: Registering appends a base and twin pair and is idempotent.
    #[test]
    fn register_appends_pair() {
        let index = register(&UNIT);
        assert!(index > 36);
        assert_eq!(register(&UNIT), index);
        let ty = type_at(index).unwrap();
        assert!(same_type(ty, &UNIT));
        let twin = no_copy(ty).unwrap();
        assert_eq!(index_of(twin), Some(index + 1));
        assert!(is_compound(ty));
    }
}
