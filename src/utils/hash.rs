//! FNV-1a hashing
//!
//! Every identifier in the pipeline state subsystem (property ids, shader
//! combination ids, signature ids) is derived from FNV-1a so the values are
//! stable across runs, platforms and builds.

/// FNV-1a 32-bit offset basis.
pub const FNV1A_INITIAL_HASH_32: u32 = 0x811c_9dc5;

/// FNV-1a 32-bit prime.
pub const FNV1A_MAGIC_PRIME_32: u32 = 0x0100_0193;

/// FNV-1a 64-bit offset basis.
pub const FNV1A_INITIAL_HASH_64: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime.
pub const FNV1A_MAGIC_PRIME_64: u64 = 0x0000_0100_0000_01b3;

/// Hashes `bytes` starting from the FNV-1a offset basis.
#[inline]
#[must_use]
pub const fn fnv1a_32(bytes: &[u8]) -> u32 {
    fnv1a_32_seeded(bytes, FNV1A_INITIAL_HASH_32)
}

/// Folds `bytes` into an existing 32-bit hash.
#[must_use]
pub const fn fnv1a_32_seeded(bytes: &[u8], seed: u32) -> u32 {
    let mut hash = seed;
    let mut i = 0;
    while i < bytes.len() {
        hash = (hash ^ bytes[i] as u32).wrapping_mul(FNV1A_MAGIC_PRIME_32);
        i += 1;
    }
    hash
}

/// Hashes `bytes` starting from the 64-bit FNV-1a offset basis.
#[inline]
#[must_use]
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    fnv1a_64_seeded(bytes, FNV1A_INITIAL_HASH_64)
}

/// Folds `bytes` into an existing 64-bit hash.
#[must_use]
pub const fn fnv1a_64_seeded(bytes: &[u8], seed: u64) -> u64 {
    let mut hash = seed;
    let mut i = 0;
    while i < bytes.len() {
        hash = (hash ^ bytes[i] as u64).wrapping_mul(FNV1A_MAGIC_PRIME_64);
        i += 1;
    }
    hash
}

/// Folds a `u32` (little endian) into a 32-bit hash.
#[inline]
#[must_use]
pub const fn fold_u32(value: u32, seed: u32) -> u32 {
    fnv1a_32_seeded(&value.to_le_bytes(), seed)
}

/// Folds an `i32` (little endian) into a 32-bit hash.
#[inline]
#[must_use]
pub const fn fold_i32(value: i32, seed: u32) -> u32 {
    fnv1a_32_seeded(&value.to_le_bytes(), seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(fnv1a_32(b""), FNV1A_INITIAL_HASH_32);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);

        assert_eq!(fnv1a_64(b""), FNV1A_INITIAL_HASH_64);
        assert_eq!(fnv1a_64(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a_64(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn test_seeded_is_incremental() {
        let whole = fnv1a_32(b"foobar");
        let split = fnv1a_32_seeded(b"bar", fnv1a_32(b"foo"));
        assert_eq!(whole, split);

        let whole = fnv1a_64(b"foobar");
        let split = fnv1a_64_seeded(b"bar", fnv1a_64(b"foo"));
        assert_eq!(whole, split);
    }
}
