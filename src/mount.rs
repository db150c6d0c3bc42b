//! Mount lifecycle: orchestrates the superblock, FAT, root directory, and
//! file descriptor table across a single `BlockDevice`.

use crate::block_device::BlockDevice;
use crate::descriptor::FdTable;
use crate::directory::RootDirectory;
use crate::error::{FsError, Result};
use crate::fat::Fat;
use crate::io as io_engine;
use crate::superblock::SuperBlock;
use crate::BLOCK_SIZE;
use log::{error, warn};

/// A mounted file system: owns the device and every piece of in-memory
/// state derived from it. The only constructor is [`Mount::mount`]; the
/// only destructor is [`Mount::umount`].
pub struct Mount<D: BlockDevice> {
    device: D,
    superblock: SuperBlock,
    fat: Fat,
    root: RootDirectory,
    fd_table: FdTable,
    in_operation: bool,
}

impl<D: BlockDevice> Mount<D> {
    /// Runs `f` with a re-entrancy check: the core is documented as
    /// single-threaded and non-reentrant, and in debug builds a violation
    /// becomes an immediate panic instead of silently corrupting in-memory
    /// state. In release builds the flag is still tracked but not asserted
    /// on, so this costs nothing but a bool write either way.
    fn non_reentrant<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        debug_assert!(!self.in_operation, "re-entrant call into Mount; core is non-reentrant");
        self.in_operation = true;
        let result = f(self);
        self.in_operation = false;
        result
    }

    /// Loads the superblock, FAT, and root directory from `device` and
    /// binds them into a live mount.
    pub fn mount(mut device: D) -> Result<Self> {
        let mut block0 = [0u8; BLOCK_SIZE];
        device.read_block(0, &mut block0)?;
        let superblock = SuperBlock::parse(&block0, device.block_count())?;

        let mut fat_raw = Vec::with_capacity(superblock.fat_block_count as usize * BLOCK_SIZE);
        for i in 0..superblock.fat_block_count as usize {
            let mut block = [0u8; BLOCK_SIZE];
            device.read_block(1 + i, &mut block)?;
            fat_raw.extend_from_slice(&block);
        }
        let fat = Fat::from_blocks(&fat_raw, superblock.data_block_count as usize);

        let mut root_block = [0u8; BLOCK_SIZE];
        device.read_block(superblock.root_dir_block as usize, &mut root_block)?;
        let root = RootDirectory::from_block(&root_block);

        Ok(Mount {
            device,
            superblock,
            fat,
            root,
            fd_table: FdTable::new(),
            in_operation: false,
        })
    }

    /// Writes the FAT and root directory back to disk and releases the
    /// mount. Fails with `Busy` if any descriptor is still open, or with an
    /// I/O error if a flush write fails; either way `self` comes back in the
    /// `Err` so the caller can close the offending descriptors (or retry the
    /// write) and call `umount` again instead of losing the mount entirely.
    pub fn umount(mut self) -> std::result::Result<(), (Self, FsError)> {
        if !self.fd_table.is_empty() {
            warn!("umount: descriptors still open");
            return Err((self, FsError::Busy));
        }

        let fat_blocks = self.fat.to_blocks(self.superblock.fat_block_count as usize);
        for (i, block) in fat_blocks.into_iter().enumerate() {
            if let Err(e) = self.device.write_block(1 + i, &block) {
                return Err((self, e));
            }
        }
        let root_block = self.root.to_block();
        if let Err(e) = self
            .device
            .write_block(self.superblock.root_dir_block as usize, &root_block)
        {
            return Err((self, e));
        }
        Ok(())
    }

    pub fn info(&self) -> String {
        let sb = &self.superblock;
        let fat_free = sb.data_block_count as usize - self.fat.used_count();
        format!(
            "FS Info:\ntotal_blk_count={}\nfat_blk_count={}\nrdir_blk={}\ndata_blk={}\ndata_blk_count={}\nfat_free_ratio={}/{}\nrdir_free_ratio={}/{}\n",
            sb.total_blocks,
            sb.fat_block_count,
            sb.root_dir_block,
            sb.data_start_block,
            sb.data_block_count,
            fat_free,
            sb.data_block_count,
            self.root.free_slot_count(),
            crate::directory::FS_FILE_MAX_COUNT,
        )
    }

    pub fn create(&mut self, name: &str) -> Result<()> {
        self.non_reentrant(|m| m.root.create(name).map(|_| ()))
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.non_reentrant(|m| {
            let idx = m.root.find(name).ok_or(FsError::NotFound)?;
            // Check the busy condition before mutating any FAT state, so a
            // failed delete leaves the chain untouched.
            if m.root.open_count(idx) > 0 {
                return Err(FsError::Busy);
            }
            let first_block = m.root.entry(idx).first_block;
            m.fat.free_chain(first_block)?;
            m.root.delete(idx)
        })
    }

    pub fn ls(&self) -> String {
        let mut out = String::from("FS Ls:\n");
        for (_, entry) in self.root.iter_non_empty() {
            out.push_str(&format!(
                "file: {}, size: {}, data_blk: {}\n",
                entry.name(),
                entry.size,
                entry.first_block
            ));
        }
        out
    }

    pub fn open(&mut self, name: &str) -> Result<usize> {
        self.non_reentrant(|m| {
            let idx = m.root.find(name).ok_or(FsError::NotFound)?;
            let fd = m.fd_table.alloc(idx)?;
            m.root.incr_open(idx);
            Ok(fd)
        })
    }

    pub fn close(&mut self, fd: usize) -> Result<()> {
        self.non_reentrant(|m| {
            let idx = m.fd_table.close(fd)?;
            m.root.decr_open(idx);
            Ok(())
        })
    }

    pub fn stat(&self, fd: usize) -> Result<u32> {
        let desc = self.fd_table.get(fd)?;
        Ok(self.root.entry(desc.root_index).size)
    }

    pub fn lseek(&mut self, fd: usize, offset: u32) -> Result<()> {
        self.non_reentrant(|m| {
            let size = m.stat(fd)?;
            if offset > size {
                return Err(FsError::OutOfBounds);
            }
            m.fd_table.get_mut(fd)?.offset = offset;
            Ok(())
        })
    }

    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        self.non_reentrant(|m| {
            let desc = *m.fd_table.get(fd)?;
            let entry = *m.root.entry(desc.root_index);
            let n = io_engine::read_chain(
                &mut m.device,
                &m.fat,
                m.superblock.data_start_block,
                entry.first_block,
                entry.size,
                desc.offset,
                buf,
                buf.len(),
            )?;
            m.fd_table.get_mut(fd)?.offset += n as u32;
            Ok(n)
        })
    }

    pub fn write(&mut self, fd: usize, buf: &[u8]) -> Result<usize> {
        self.non_reentrant(|m| {
            let desc = *m.fd_table.get(fd)?;
            let mut first_block = m.root.entry(desc.root_index).first_block;
            let n = io_engine::write_chain(
                &mut m.device,
                &mut m.fat,
                m.superblock.data_start_block,
                &mut first_block,
                desc.offset,
                buf,
                buf.len(),
            )?;

            let entry = m.root.entry_mut(desc.root_index);
            entry.first_block = first_block;
            entry.size = entry.size.max(desc.offset + n as u32);
            m.fd_table.get_mut(fd)?.offset += n as u32;
            if n < buf.len() {
                warn!("write: short write, {} of {} bytes accepted (disk full)", n, buf.len());
            }
            Ok(n)
        })
    }
}

/// A thin `-1`-on-failure adapter over the typed [`Mount`] API, for callers
/// (golden-file tests, a CLI front-end) that want the exact §6 surface
/// instead of `Result`.
pub mod api {
    use super::*;

    fn report(context: &str, err: &FsError) {
        error!("{context}: {err}");
    }

    /// Mounts `device`, returning the live [`Mount`] on success. There's no
    /// process-wide mount slot to signal `0`/`-1` into (every other call in
    /// this module takes the `Mount` the caller already holds), so failure
    /// is reported the same way as everywhere else in this module — logged
    /// and collapsed to `-1` — with the handle simply absent from `Err`.
    pub fn mount<D: BlockDevice>(device: D) -> std::result::Result<Mount<D>, i32> {
        match Mount::mount(device) {
            Ok(m) => Ok(m),
            Err(e) => {
                report("mount", &e);
                Err(-1)
            }
        }
    }

    /// Unmounts `m`. On failure `m` is handed back alongside `-1` so the
    /// caller can close the offending descriptors and retry, mirroring
    /// [`Mount::umount`]'s own recoverable-`Err` shape.
    pub fn umount<D: BlockDevice>(m: Mount<D>) -> std::result::Result<(), (Mount<D>, i32)> {
        match m.umount() {
            Ok(()) => Ok(()),
            Err((m, e)) => {
                report("umount", &e);
                Err((m, -1))
            }
        }
    }

    pub fn create<D: BlockDevice>(m: &mut Mount<D>, name: &str) -> i32 {
        match m.create(name) {
            Ok(()) => 0,
            Err(e) => {
                report("create", &e);
                -1
            }
        }
    }

    pub fn delete<D: BlockDevice>(m: &mut Mount<D>, name: &str) -> i32 {
        match m.delete(name) {
            Ok(()) => 0,
            Err(e) => {
                report("delete", &e);
                -1
            }
        }
    }

    pub fn open<D: BlockDevice>(m: &mut Mount<D>, name: &str) -> i32 {
        match m.open(name) {
            Ok(fd) => fd as i32,
            Err(e) => {
                report("open", &e);
                -1
            }
        }
    }

    pub fn close<D: BlockDevice>(m: &mut Mount<D>, fd: usize) -> i32 {
        match m.close(fd) {
            Ok(()) => 0,
            Err(e) => {
                report("close", &e);
                -1
            }
        }
    }

    pub fn stat<D: BlockDevice>(m: &Mount<D>, fd: usize) -> i64 {
        match m.stat(fd) {
            Ok(size) => size as i64,
            Err(e) => {
                report("stat", &e);
                -1
            }
        }
    }

    pub fn lseek<D: BlockDevice>(m: &mut Mount<D>, fd: usize, offset: u32) -> i32 {
        match m.lseek(fd, offset) {
            Ok(()) => 0,
            Err(e) => {
                report("lseek", &e);
                -1
            }
        }
    }

    pub fn read<D: BlockDevice>(m: &mut Mount<D>, fd: usize, buf: &mut [u8]) -> i64 {
        match m.read(fd, buf) {
            Ok(n) => n as i64,
            Err(e) => {
                report("read", &e);
                -1
            }
        }
    }

    pub fn write<D: BlockDevice>(m: &mut Mount<D>, fd: usize, buf: &[u8]) -> i64 {
        match m.write(fd, buf) {
            Ok(n) => n as i64,
            Err(e) => {
                report("write", &e);
                -1
            }
        }
    }
}
