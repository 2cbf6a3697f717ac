//! Jenkins one-at-a-time hash over 64-bit lanes.

/// Hashes `bytes` with the one-at-a-time mixing steps, using wrapping
/// 64-bit arithmetic.
pub fn one_at_a_time<I>(bytes: I) -> u64
where
    I: IntoIterator<Item = u8>,
{
    let mut hash: u64 = 0;
    for b in bytes {
        hash = hash.wrapping_add(u64::from(b));
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);
    hash
}
