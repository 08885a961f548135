//! Maze Layout Hashing
//!
//! SHA-256 digest of a maze layout. Server and clients log the same
//! digest for the same maze, which makes a session traceable across
//! processes.

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type LayoutHash = [u8; 32];

/// Hasher for maze layouts.
///
/// Order of updates is significant.
pub struct LayoutHasher {
    hasher: Sha256,
}

impl LayoutHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for a maze layout.
    pub fn for_layout() -> Self {
        Self::new(b"MAZE_DUEL_LAYOUT_V1")
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> LayoutHash {
        self.hasher.finalize().into()
    }
}

/// Digest a layout given its logical size and its standing wall positions.
///
/// Walls must be supplied in row-major order for equal layouts to hash
/// equally.
pub fn layout_digest(width: u32, height: u32, walls: &[[i32; 2]]) -> LayoutHash {
    let mut hasher = LayoutHasher::for_layout();
    hasher.update_u32(width);
    hasher.update_u32(height);
    hasher.update_u32(walls.len() as u32);
    for [x, y] in walls {
        hasher.update_i32(*x);
        hasher.update_i32(*y);
    }
    hasher.finalize()
}

/// Short hex prefix of a digest, for log lines.
pub fn short_hex(hash: &LayoutHash) -> String {
    hex::encode(&hash[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_layout_same_digest() {
        let walls = vec![[0, 0], [1, 0], [2, 0]];
        assert_eq!(layout_digest(6, 6, &walls), layout_digest(6, 6, &walls));
    }

    #[test]
    fn test_digest_depends_on_walls_and_size() {
        let walls = vec![[0, 0], [1, 0]];
        let other = vec![[0, 0], [2, 0]];
        let base = layout_digest(6, 6, &walls);

        assert_ne!(base, layout_digest(6, 6, &other));
        assert_ne!(base, layout_digest(7, 6, &walls));
    }

    #[test]
    fn test_short_hex_length() {
        let digest = layout_digest(6, 6, &[]);
        assert_eq!(short_hex(&digest).len(), 12);
    }
}
