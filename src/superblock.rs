//! Superblock (block 0) parsing and validation.

use crate::error::{FsError, Result};
use crate::BLOCK_SIZE;

const SIGNATURE: &[u8; 8] = b"ECS150FS";

/// The parsed, validated contents of block 0.
///
/// Read-only after mount: nothing in the core ever rewrites layout fields
/// once a disk has been mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub total_blocks: u16,
    pub root_dir_block: u16,
    pub data_start_block: u16,
    pub data_block_count: u16,
    pub fat_block_count: u8,
}

impl SuperBlock {
    /// Parses and validates a superblock out of a raw block-0 image,
    /// checking it against the device's actual block count.
    pub fn parse(buf: &[u8; BLOCK_SIZE], device_block_count: usize) -> Result<Self> {
        if &buf[0..8] != SIGNATURE {
            return Err(FsError::CorruptSuperblock(format!(
                "bad signature {:?}",
                &buf[0..8]
            )));
        }

        let total_blocks = u16::from_le_bytes([buf[8], buf[9]]);
        let root_dir_block = u16::from_le_bytes([buf[10], buf[11]]);
        let data_start_block = u16::from_le_bytes([buf[12], buf[13]]);
        let data_block_count = u16::from_le_bytes([buf[14], buf[15]]);
        let fat_block_count = buf[16];

        let sb = SuperBlock {
            total_blocks,
            root_dir_block,
            data_start_block,
            data_block_count,
            fat_block_count,
        };

        if total_blocks as usize != device_block_count {
            return Err(FsError::CorruptSuperblock(format!(
                "total_blocks {total_blocks} does not match device block count {device_block_count}"
            )));
        }

        let expected_fat_blocks =
            ((data_block_count as usize * 2) + BLOCK_SIZE - 1) / BLOCK_SIZE;
        if fat_block_count as usize != expected_fat_blocks {
            return Err(FsError::CorruptSuperblock(format!(
                "fat_block_count {fat_block_count} does not match expected {expected_fat_blocks}"
            )));
        }

        let expected_root = 1 + fat_block_count as u16;
        if root_dir_block != expected_root {
            return Err(FsError::CorruptSuperblock(format!(
                "root_dir_block {root_dir_block} does not match expected {expected_root}"
            )));
        }

        let expected_data_start = root_dir_block + 1;
        if data_start_block != expected_data_start {
            return Err(FsError::CorruptSuperblock(format!(
                "data_start_block {data_start_block} does not match expected {expected_data_start}"
            )));
        }

        let expected_total = data_start_block as u32 + data_block_count as u32;
        if total_blocks as u32 != expected_total {
            return Err(FsError::CorruptSuperblock(format!(
                "total_blocks {total_blocks} does not match expected {expected_total}"
            )));
        }

        Ok(sb)
    }

    /// Serializes this superblock back into a fresh, zero-padded block-0 image.
    pub fn to_bytes(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..8].copy_from_slice(SIGNATURE);
        buf[8..10].copy_from_slice(&self.total_blocks.to_le_bytes());
        buf[10..12].copy_from_slice(&self.root_dir_block.to_le_bytes());
        buf[12..14].copy_from_slice(&self.data_start_block.to_le_bytes());
        buf[14..16].copy_from_slice(&self.data_block_count.to_le_bytes());
        buf[16] = self.fat_block_count;
        buf
    }

    /// Builds a fresh, internally-consistent superblock for `data_block_count`
    /// data blocks. Used by disk-image construction tooling and tests; the
    /// core itself never needs to invent a layout, only validate one.
    pub fn new_layout(data_block_count: u16) -> Self {
        let fat_block_count =
            (((data_block_count as usize * 2) + BLOCK_SIZE - 1) / BLOCK_SIZE) as u8;
        let root_dir_block = 1 + fat_block_count as u16;
        let data_start_block = root_dir_block + 1;
        let total_blocks = data_start_block + data_block_count;
        SuperBlock {
            total_blocks,
            root_dir_block,
            data_start_block,
            data_block_count,
            fat_block_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let sb = SuperBlock::new_layout(8192);
        let bytes = sb.to_bytes();
        let parsed = SuperBlock::parse(&bytes, sb.total_blocks as usize).unwrap();
        assert_eq!(sb, parsed);
    }

    #[test]
    fn rejects_bad_signature() {
        let sb = SuperBlock::new_layout(8192);
        let mut bytes = sb.to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            SuperBlock::parse(&bytes, sb.total_blocks as usize),
            Err(FsError::CorruptSuperblock(_))
        ));
    }

    #[test]
    fn rejects_mismatched_device_size() {
        let sb = SuperBlock::new_layout(8192);
        let bytes = sb.to_bytes();
        assert!(SuperBlock::parse(&bytes, sb.total_blocks as usize + 1).is_err());
    }

    #[test]
    fn derives_8192_data_block_layout_from_spec_example() {
        let sb = SuperBlock::new_layout(8192);
        assert_eq!(sb.fat_block_count, 4);
        assert_eq!(sb.root_dir_block, 5);
        assert_eq!(sb.data_start_block, 6);
        assert_eq!(sb.total_blocks, 6 + 8192);
    }
}
