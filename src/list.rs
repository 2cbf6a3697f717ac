//! List: an ordered key/value sequence with per-entry value kinds.

use crate::codec::{self, Decoded};
use crate::error::{BlobError, Result, TableError};
use crate::sequence::{self, Sequence};
use crate::types::Type;
use crate::value::Value;
use core::any::Any;
use core::cmp::Ordering;
use core::fmt;

#[derive(Debug)]
pub struct ListNode {
    pub key: Value,
    pub value: Value,
    pub ty: Type,
}

pub struct List {
    key_type: Type,
    nodes: Vec<ListNode>,
}

impl List {
    pub fn new(key_type: Type) -> Self {
        List {
            key_type,
            nodes: Vec::new(),
        }
    }

    pub fn key_type(&self) -> Type {
        self.key_type
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, key: impl Into<Value>, value: impl Into<Value>, ty: Type) {
        self.nodes.push(ListNode {
            key: key.into(),
            value: value.into(),
            ty,
        });
    }

    pub fn push_copied(&mut self, key: &dyn Any, value: &dyn Any, ty: Type) -> Result<()> {
        let key = self
            .key_type
            .copy(key)
            .ok_or(TableError::KeyType(self.key_type.name()))?;
        let value = ty.copy(value).ok_or(TableError::ValueType(ty.name()))?;
        self.push(key, value, ty);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&ListNode> {
        self.nodes.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, ListNode> {
        self.nodes.iter()
    }

    pub fn copy(&self) -> List {
        let mut copy = List::new(self.key_type);
        for node in &self.nodes {
            if let Err(e) = copy.push_copied(node.key.as_any(), node.value.as_any(), node.ty) {
                log::error!("dropping entry while copying list: {e}");
            }
        }
        copy
    }

    pub fn compare(&self, other: &List) -> Ordering {
        sequence::compare(self, other)
    }

    pub fn to_blob(&self) -> Result<Vec<u8>, BlobError> {
        let mut out = Vec::new();
        codec::encode(self, &mut out)?;
        Ok(out)
    }

    pub fn from_blob(bytes: &[u8]) -> Result<Decoded<List>, BlobError> {
        codec::decode(codec::BlobInput::copied(bytes))
    }

    pub(crate) fn write_xml(&self, element: &str, out: &mut String) {
        out.push('<');
        out.push_str(element);
        out.push('>');
        for node in &self.nodes {
            let name = self.key_type.format_value(node.key.as_any());
            node.ty.to_xml(node.value.as_any(), &name, out);
        }
        out.push_str("</");
        out.push_str(element);
        out.push('>');
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.nodes
                .iter()
                .map(|node| node.ty.to_json(node.value.as_any()))
                .collect(),
        )
    }
}

impl Clone for List {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("key_type", &self.key_type.name())
            .field("nodes", &self.nodes)
            .finish()
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{} = {}",
                self.key_type.format_value(node.key.as_any()),
                node.ty.format_value(node.value.as_any())
            )?;
        }
        f.write_str("]")
    }
}

impl Sequence for List {
    fn with_key_type(key_type: Type, size_hint: usize) -> Self {
        List {
            key_type,
            nodes: Vec::with_capacity(size_hint),
        }
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
        List::push(self, key, value, ty);
        Ok(())
    }

    fn entries(&self) -> Box<dyn ExactSizeIterator<Item = (&Value, &Value, Type)> + '_> {
        Box::new(self.nodes.iter().map(|n| (&n.key, &n.value, n.ty)))
    }
}
