//! Permissive XML scanner producing string-keyed tables.
//!
//! This is not an XML parser. It skips the wrapper element (a SOAP-style
//! `...Request`/`...Response` element when present, else the first
//! element), then reads sibling children until it meets a closing tag.
//! Child names become keys; text content becomes a `BYTES` value and
//! content that itself looks like XML becomes a nested `HASH_TABLE`.

use crate::hash_table::HashTable;
use crate::types::{BYTES, HASH_TABLE, STRING};
use crate::value::ByteBuf;

fn find_from(haystack: &str, from: usize, needle: char) -> Option<usize> {
    haystack.get(from..)?.find(needle).map(|i| from + i)
}

fn find_str_from(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    haystack.get(from..)?.find(needle).map(|i| from + i)
}

/// True when `value` has a `<` with a `>` somewhere after it.
fn looks_like_xml(value: &str) -> bool {
    match (value.find('<'), value.rfind('>')) {
        (Some(open), Some(close)) => open < close,
        _ => false,
    }
}

/// Builds a table from the children of the outermost element of `xml`.
///
/// Returns `None` when the input does not start (after whitespace) with `<`.
pub fn xml_to_hash_table(xml: &str) -> Option<HashTable> {
    let xml = xml.trim_start();
    if !xml.starts_with('<') {
        log::debug!("no XML provided");
        return None;
    }
    log::trace!("scanning {} bytes of XML", xml.len());

    let mut table = HashTable::new(STRING);
    let wrapper = xml
        .find("Request")
        .or_else(|| xml.find("Response"))
        .or_else(|| xml.find('>').map(|i| i.saturating_sub(1)));
    let mut cursor = wrapper
        .and_then(|w| find_from(xml, w, '>'))
        .and_then(|gt| find_from(xml, gt, '<'));

    while let Some(open) = cursor {
        let name_start = open + 1;
        if xml[name_start..].starts_with('/') {
            break;
        }
        let end_of_line = find_from(xml, open, '\n').unwrap_or(xml.len());
        let gt = find_from(xml, name_start, '>');
        let end_of_tag = match find_from(xml, name_start, ' ') {
            Some(space) if space < end_of_line && gt.map_or(true, |g| space < g) => Some(space),
            _ => gt,
        };
        let Some(end_of_tag) = end_of_tag else {
            cursor = find_from(xml, name_start, '<');
            continue;
        };

        let self_closing = xml.as_bytes()[end_of_tag] == b'>' && xml[..end_of_tag].ends_with('/');
        let key = xml[name_start..end_of_tag].trim_end_matches('/');
        let value_start = if self_closing {
            None
        } else if xml.as_bytes()[end_of_tag] == b'>' {
            Some(end_of_tag + 1)
        } else {
            find_from(xml, name_start, '>').map(|g| g + 1)
        };

        let close_tag = format!("</{key}");
        let close = value_start.and_then(|v| find_str_from(xml, v, &close_tag).map(|c| (v, c)));
        let value = close.map_or("", |(v, c)| &xml[v..c]);

        if looks_like_xml(value) {
            let wrapped = format!("<{key}>\n{value}</{key}>\n");
            match xml_to_hash_table(&wrapped) {
                Some(nested) => {
                    if let Err(e) = table.add_entry(key, nested, HASH_TABLE) {
                        log::error!("dropping nested element `{key}`: {e}");
                    }
                }
                None => log::debug!("element `{key}` did not scan as XML"),
            }
        } else if let Err(e) = table.add_entry(key, ByteBuf::new(value.as_bytes()), BYTES) {
            log::error!("dropping element `{key}`: {e}");
        }

        cursor = match close {
            Some((_, c)) => find_from(xml, c + 1, '<'),
            None => find_from(xml, name_start, '<'),
        };
    }

    Some(table)
}

impl HashTable {
    /// See [`xml_to_hash_table`].
    pub fn from_xml(xml: &str) -> Option<HashTable> {
        xml_to_hash_table(xml)
    }
}
