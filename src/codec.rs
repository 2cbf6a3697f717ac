//! Binary format for tables and lists.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! u16 marker (0x4ABC) | u32 version (10) | i16 key kind index | u64 entry count
//! then per entry: i16 value kind index | value blob | key blob
//! ```
//!
//! Kind indices come from the registry and always name the base kind.
//! Decoding either copies every value out of the input or, in place,
//! leaves text and byte values pointing into a shared input buffer.
//! Entry-level failures stop decoding but keep what was decoded.

use crate::error::{BlobError, Result};
use crate::hash_table::HashTable;
use crate::sequence::Sequence;
use crate::types::{base, registry, Type};
use crate::value::Storage;
use std::sync::Arc;

pub const DS_MARKER: u16 = 0x4ABC;
pub const DS_VERSION: u32 = 10;
pub const HEADER_LEN: usize = 2 + 4 + 2 + 8;
/// Deepest nesting of tables and lists a decoder follows.
pub const MAX_NESTING_DEPTH: u16 = 32;
/// Smallest encoded entry: kind index plus one byte each of value and key.
const MIN_ENTRY_LEN: usize = 4;

/// Input to a decoder: a byte window plus, in place, the buffer it belongs to.
#[derive(Clone, Copy)]
pub struct BlobInput<'a> {
    bytes: &'a [u8],
    shared: Option<(&'a Arc<[u8]>, usize)>,
    depth: u16,
}

impl<'a> BlobInput<'a> {
    /// Decoded values copy their bytes.
    pub fn copied(bytes: &'a [u8]) -> Self {
        BlobInput {
            bytes,
            shared: None,
            depth: 0,
        }
    }

    /// Decoded text and byte values share `buf`.
    pub fn in_place(buf: &'a Arc<[u8]>) -> Self {
        BlobInput {
            bytes: buf,
            shared: Some((buf, 0)),
            depth: 0,
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn is_in_place(&self) -> bool {
        self.shared.is_some()
    }

    /// The input after skipping `n` bytes.
    pub fn advance(&self, n: usize) -> Self {
        let n = n.min(self.bytes.len());
        BlobInput {
            bytes: &self.bytes[n..],
            shared: self.shared.map(|(buf, offset)| (buf, offset + n)),
            depth: self.depth,
        }
    }

    /// How many enclosing structures this input is nested in.
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// The same input one nesting level down.
    pub fn nested(&self) -> Self {
        BlobInput {
            depth: self.depth.saturating_add(1),
            ..*self
        }
    }

    /// Storage for `len` bytes at `start`; the caller has bounds-checked.
    pub(crate) fn storage(&self, start: usize, len: usize) -> Storage {
        match self.shared {
            Some((buf, offset)) => Storage::Shared {
                buf: Arc::clone(buf),
                range: offset + start..offset + start + len,
            },
            None => Storage::Owned(self.bytes[start..start + len].into()),
        }
    }
}

/// Outcome of decoding: what was built, how many bytes it used, and the
/// failure that stopped decoding early, if any.
#[derive(Debug)]
pub struct Decoded<T> {
    pub value: T,
    pub consumed: usize,
    pub error: Option<BlobError>,
}

impl<T> Decoded<T> {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// The value, or the error if decoding stopped early.
    pub fn into_result(self) -> Result<T, BlobError> {
        match self.error {
            None => Ok(self.value),
            Some(e) => Err(e),
        }
    }
}

fn read_array<const N: usize>(bytes: &[u8], at: usize) -> Result<[u8; N], BlobError> {
    let available = bytes.len().saturating_sub(at);
    let slice = bytes.get(at..at + N).ok_or(BlobError::Truncated {
        needed: N,
        available,
    })?;
    let mut raw = [0u8; N];
    raw.copy_from_slice(slice);
    Ok(raw)
}

fn index_for(ty: Type) -> Result<i16, BlobError> {
    registry::index_of(base(ty)).ok_or(BlobError::Unregistered(ty.name()))
}

pub(crate) fn encode<S: Sequence>(seq: &S, out: &mut Vec<u8>) -> Result<(), BlobError> {
    let key_type = seq.key_type();
    let key_index = index_for(key_type)?;
    out.reserve(HEADER_LEN);
    out.extend_from_slice(&DS_MARKER.to_le_bytes());
    out.extend_from_slice(&DS_VERSION.to_le_bytes());
    out.extend_from_slice(&key_index.to_le_bytes());
    out.extend_from_slice(&(seq.count() as u64).to_le_bytes());
    for (key, value, ty) in seq.entries() {
        out.extend_from_slice(&index_for(ty)?.to_le_bytes());
        ty.to_blob(value.as_any(), out)?;
        key_type.to_blob(key.as_any(), out)?;
    }
    Ok(())
}

pub(crate) fn decode<S: Sequence>(input: BlobInput<'_>) -> Result<Decoded<S>, BlobError> {
    if input.depth() > MAX_NESTING_DEPTH {
        log::error!("blob nests deeper than {MAX_NESTING_DEPTH} levels");
        return Err(BlobError::TooDeep(MAX_NESTING_DEPTH));
    }
    let bytes = input.bytes();
    if bytes.len() < HEADER_LEN {
        log::error!(
            "blob of {} bytes is shorter than its {HEADER_LEN}-byte header",
            bytes.len()
        );
        return Err(BlobError::Truncated {
            needed: HEADER_LEN,
            available: bytes.len(),
        });
    }
    let marker = u16::from_le_bytes(read_array(bytes, 0)?);
    if marker != DS_MARKER {
        log::error!("unknown byte array marker {marker:#06x}");
        return Err(BlobError::BadMarker(marker));
    }
    let version = u32::from_le_bytes(read_array(bytes, 2)?);
    if version != DS_VERSION {
        log::error!("unsupported format version {version}");
        return Err(BlobError::UnsupportedVersion(version));
    }
    let key_index = i16::from_le_bytes(read_array(bytes, 6)?);
    let key_type = registry::type_at(key_index).ok_or_else(|| {
        log::error!("invalid key type index {key_index}");
        BlobError::UnknownType(key_index)
    })?;
    let declared = u64::from_le_bytes(read_array(bytes, 8)?);

    let in_place = input.is_in_place();
    // The remaining input bounds how many entries can follow.
    let size_hint = usize::try_from(declared)
        .unwrap_or(usize::MAX)
        .min((bytes.len() - HEADER_LEN) / MIN_ENTRY_LEN);
    let mut seq = S::with_key_type(registry::no_copy(key_type).unwrap_or(key_type), size_hint);

    let mut pos = HEADER_LEN;
    let mut decoded: u64 = 0;
    let mut error = None;
    while decoded < declared && pos < bytes.len() {
        match decode_entry(&mut seq, input, pos, key_type) {
            Ok(used) => {
                pos += used;
                decoded += 1;
            }
            Err(e) => {
                log::error!("entry {decoded} of {declared} failed to decode: {e}");
                error = Some(e);
                break;
            }
        }
    }
    if error.is_none() && decoded < declared {
        log::error!("blob declared {declared} entries but held {decoded}");
        error = Some(BlobError::Incomplete {
            expected: declared,
            decoded,
        });
    }

    if !in_place || registry::is_compound(key_type) {
        seq.set_key_type(key_type);
    }
    Ok(Decoded {
        value: seq,
        consumed: pos,
        error,
    })
}

fn decode_entry<S: Sequence>(
    seq: &mut S,
    input: BlobInput<'_>,
    pos: usize,
    key_type: Type,
) -> Result<usize, BlobError> {
    let index = i16::from_le_bytes(read_array(input.bytes(), pos)?);
    let value_type = registry::type_at(index).ok_or(BlobError::UnknownType(index))?;
    let mut used = 2;
    let (value, n) = value_type.from_blob(input.advance(pos + used))?;
    used += n;
    let (key, n) = key_type.from_blob(input.advance(pos + used))?;
    used += n;

    // In-place scalars keep the borrowing kind; nested structures own
    // their contents once decoded.
    let ty = if input.is_in_place() && !registry::is_compound(value_type) {
        registry::no_copy(value_type).unwrap_or(value_type)
    } else {
        value_type
    };
    seq.push(key, value, ty)
        .map_err(|_| BlobError::TypeMismatch(key_type.name()))?;
    Ok(used)
}

impl HashTable {
    pub fn to_blob(&self) -> Result<Vec<u8>, BlobError> {
        let mut out = Vec::new();
        encode(self, &mut out)?;
        Ok(out)
    }

    /// Decodes a table, copying every value out of `bytes`.
    pub fn from_blob(bytes: &[u8]) -> Result<Decoded<HashTable>, BlobError> {
        decode(BlobInput::copied(bytes))
    }

    /// Decodes a table whose text and byte values share `buf`.
    pub fn from_blob_in_place(buf: Arc<[u8]>) -> Result<Decoded<HashTable>, BlobError> {
        decode(BlobInput::in_place(&buf))
    }
}
