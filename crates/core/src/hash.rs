//! Stable snapshot hashing for grid idempotence checks.

use std::hash::Hasher;

use xxhash_rust::xxh3::Xxh3;

use crate::state::Grid;

impl Grid {
    pub fn snapshot_hash(&self) -> u64 {
        let mut hasher = Xxh3::new();
        let geometry = self.geometry();
        hasher.write_u32(geometry.tile_width);
        hasher.write_u32(geometry.tile_height);
        hasher.write_u32(geometry.offset_x);
        hasher.write_u32(geometry.offset_y);
        hasher.write_u64(self.len() as u64);
        for (coord, label) in self.iter() {
            hasher.write_i32(coord.x);
            hasher.write_i32(coord.y);
            hasher.write_u8(label as u8);
        }
        hasher.finish()
    }
}

/// Format a snapshot hash as `0x` followed by exactly 16 lowercase hex digits.
pub fn format_snapshot_hash(hash: u64) -> String {
    format!("0x{hash:016x}")
}
