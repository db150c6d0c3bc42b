/*!
 * ECS150FS: a small FAT-style file system
 *
 * A disk is a fixed-size array of `BLOCK_SIZE`-byte blocks. This crate
 * mounts one such disk and speaks a flat (no directories), byte-granular
 * file system over it:
 *
 * .                 | block
 * superblock        | 0
 * FAT               | 1 .. 1+fat_block_count
 * root directory     | 1+fat_block_count
 * data region       | 2+fat_block_count .. total_blocks
 *
 * The FAT is an array of 16-bit entries, one per data block. Using FAT
 * entries as "next pointers", data blocks are formed into chains; a file's
 * root directory entry names the head of its chain (or `FAT_EOC` if the
 * file is empty).
 *
 * The root directory is a single block holding 128 fixed-size entries.
 *
 * There is no notion of sub-directories: every file lives in that one flat
 * table.
 */

mod block_device;
mod descriptor;
mod directory;
mod error;
mod fat;
mod io;
mod mount;
mod superblock;

/// Size, in bytes, of every block on the device and of the superblock,
/// each FAT block, and the root directory block.
pub const BLOCK_SIZE: usize = 4096;

pub use block_device::{BlockDevice, FileBlockDevice, RamBlockDevice};
pub use descriptor::{Descriptor, FS_OPEN_MAX_COUNT};
pub use directory::{DirEntry, FS_FILENAME_LEN, FS_FILE_MAX_COUNT};
pub use error::{FsError, Result};
pub use fat::FAT_EOC;
pub use mount::{api, Mount};
pub use superblock::SuperBlock;

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_disk(data_block_count: u16) -> RamBlockDevice {
        let sb = SuperBlock::new_layout(data_block_count);
        let mut dev = RamBlockDevice::new(sb.total_blocks as usize);
        dev.write_block(0, &sb.to_bytes()).unwrap();

        let fat = fat::Fat::new(data_block_count as usize);
        for (i, block) in fat.to_blocks(sb.fat_block_count as usize).into_iter().enumerate() {
            dev.write_block(1 + i, &block).unwrap();
        }

        let root = directory::RootDirectory::new();
        dev.write_block(sb.root_dir_block as usize, &root.to_block())
            .unwrap();
        dev
    }

    #[test]
    fn mount_umount_remount_round_trip() {
        let dev = fresh_disk(8192);
        let mut mount = Mount::mount(dev).unwrap();
        mount.create("x").unwrap();
        let fd = mount.open("x").unwrap();
        mount.write(fd, b"hello").unwrap();
        mount.close(fd).unwrap();
        // umount consumes the Mount, writing FAT + root dir back; to
        // remount in this in-memory test we'd need the device back, so
        // this is exercised against a real file in tests/scenarios.rs
        // instead. Here we just check it doesn't error.
        mount.umount().map_err(|(_, e)| e).unwrap();
    }
}
