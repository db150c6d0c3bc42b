//! Block device adapter.
//!
//! The core never touches a disk directly: every read or write goes through
//! a [`BlockDevice`], a block-granular `{read_block, write_block,
//! block_count}` interface. Production code uses [`FileBlockDevice`]; tests
//! use [`RamBlockDevice`] so the rest of the crate can be exercised without
//! touching the filesystem.

use crate::error::{FsError, Result};
use crate::BLOCK_SIZE;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A fixed-size array of blocks, numbered `[0, block_count())`.
///
/// `read_block`/`write_block` each transfer exactly one block and fail
/// atomically: either the whole block transfers, or the call reports an
/// error and the device is left unchanged from the caller's point of view.
pub trait BlockDevice {
    fn block_count(&self) -> usize;
    fn read_block(&mut self, block: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<()>;
    fn write_block(&mut self, block: usize, buf: &[u8; BLOCK_SIZE]) -> Result<()>;
}

/// A block device backed by a real file on disk.
pub struct FileBlockDevice {
    file: File,
    block_count: usize,
}

impl FileBlockDevice {
    /// Opens `path` as a block device. The file's length must be an exact
    /// multiple of `BLOCK_SIZE`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|_| FsError::NoDisk)?;
        let len = file.metadata()?.len();
        if len % (BLOCK_SIZE as u64) != 0 {
            return Err(FsError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("disk length {len} is not a multiple of block size {BLOCK_SIZE}"),
            )));
        }
        Ok(FileBlockDevice {
            file,
            block_count: (len / BLOCK_SIZE as u64) as usize,
        })
    }

    pub fn close(self) {
        drop(self);
    }
}

impl BlockDevice for FileBlockDevice {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&mut self, block: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start((block * BLOCK_SIZE) as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, block: usize, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start((block * BLOCK_SIZE) as u64))?;
        self.file.write_all(buf)?;
        Ok(())
    }
}

/// An in-memory block device, used as the default unit-test harness.
pub struct RamBlockDevice {
    blocks: Vec<[u8; BLOCK_SIZE]>,
}

impl RamBlockDevice {
    pub fn new(block_count: usize) -> Self {
        RamBlockDevice {
            blocks: vec![[0u8; BLOCK_SIZE]; block_count],
        }
    }
}

impl BlockDevice for RamBlockDevice {
    fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn read_block(&mut self, block: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        let src = self
            .blocks
            .get(block)
            .ok_or_else(|| {
                FsError::IoError(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("block {block} out of range"),
                ))
            })?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_block(&mut self, block: usize, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        let dst = self
            .blocks
            .get_mut(block)
            .ok_or_else(|| {
                FsError::IoError(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("block {block} out of range"),
                ))
            })?;
        dst.copy_from_slice(buf);
        Ok(())
    }
}
