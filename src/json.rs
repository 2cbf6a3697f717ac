//! JSON ingestion: one object from a text stream into a string-keyed table.

use crate::error::{Result, TableError};
use crate::hash_table::HashTable;
use crate::list::List;
use crate::types::{BOOL, BYTES, F64, HASH_TABLE, I64, LIST, STRING, U64};
use crate::value::{ByteBuf, Value};
use serde_json::{Deserializer, Map};

/// Parses the JSON object starting at `*position` in `text`.
///
/// On success `*position` is advanced past the object. Member kinds:
/// strings are `BYTES`, integers `I64` (`U64` when they only fit
/// unsigned), other numbers `F64`, booleans `BOOL`, objects nested
/// `HASH_TABLE`s and arrays `LIST`s keyed by `U64` index. `null` members
/// are skipped.
pub fn json_to_hash_table(text: &str, position: &mut usize) -> Result<HashTable> {
    let rest = text
        .get(*position..)
        .ok_or_else(|| TableError::Json(format!("position {} is out of range", *position)))?;
    let start = rest.len() - rest.trim_start().len();
    if !rest[start..].starts_with('{') {
        log::error!("no opening brace at position {}", *position + start);
        return Err(TableError::Json("expected a JSON object".into()));
    }

    let mut stream = Deserializer::from_str(rest).into_iter::<serde_json::Value>();
    let value = match stream.next() {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            log::error!("malformed JSON: {e}");
            return Err(TableError::Json(e.to_string()));
        }
        None => return Err(TableError::Json("unexpected end of input".into())),
    };
    *position += stream.byte_offset();

    match value {
        serde_json::Value::Object(map) => object_to_table(map),
        _ => Err(TableError::Json("expected a JSON object".into())),
    }
}

fn object_to_table(map: Map<String, serde_json::Value>) -> Result<HashTable> {
    let mut table = HashTable::new(STRING);
    for (key, member) in map {
        match member_value(member)? {
            Some((value, ty)) => {
                table.add_entry(key, value, ty)?;
            }
            None => log::debug!("skipping null member `{key}`"),
        }
    }
    Ok(table)
}

fn array_to_list(items: Vec<serde_json::Value>) -> Result<List> {
    let mut list = List::new(U64);
    for (index, item) in items.into_iter().enumerate() {
        match member_value(item)? {
            Some((value, ty)) => list.push(index as u64, value, ty),
            None => log::debug!("skipping null element {index}"),
        }
    }
    Ok(list)
}

fn member_value(member: serde_json::Value) -> Result<Option<(Value, crate::types::Type)>> {
    Ok(Some(match member {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Bool(b) => (Value::new(b), BOOL),
        serde_json::Value::String(s) => (Value::new(ByteBuf::new(s.into_bytes())), BYTES),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                (Value::new(i), I64)
            } else if let Some(u) = n.as_u64() {
                (Value::new(u), U64)
            } else {
                (Value::new(n.as_f64().unwrap_or(f64::NAN)), F64)
            }
        }
        serde_json::Value::Array(items) => (Value::new(array_to_list(items)?), LIST),
        serde_json::Value::Object(map) => (Value::new(object_to_table(map)?), HASH_TABLE),
    }))
}

impl HashTable {
    /// Parses a complete JSON object; see [`json_to_hash_table`].
    pub fn from_json(text: &str) -> Result<HashTable> {
        let mut position = 0;
        json_to_hash_table(text, &mut position)
    }
}
