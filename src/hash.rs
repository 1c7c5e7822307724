use fastmurmur3::murmur3_x64_128;

/// Hashes canonical position encodings with 128-bit Murmur3.
///
/// Used to recognise repeated positions, both by the game record's repetition
/// guard and by random playouts that must not loop.
pub struct MurMurHasher;

impl MurMurHasher {
    /// Hashes a byte encoding of a position.
    pub fn hash(bytes: &[u8]) -> u128 {
        murmur3_x64_128(bytes, 0)
    }

    /// Renders a hash as 32 lowercase hex digits, for logs.
    pub fn to_hex(hash: u128) -> String {
        format!("{hash:032x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_bytes_hash_equal() {
        let a = MurMurHasher::hash(b"hexaequo");
        let b = MurMurHasher::hash(b"hexaequo");
        let c = MurMurHasher::hash(b"hexaequp");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hex_is_fixed_width() {
        assert_eq!(MurMurHasher::to_hex(0xff), format!("{}ff", "0".repeat(30)));
        assert_eq!(MurMurHasher::to_hex(MurMurHasher::hash(&[])).len(), 32);
    }
}
