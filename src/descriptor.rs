//! File descriptor table: 32 fixed slots mediating positional access.

use crate::error::{FsError, Result};

pub const FS_OPEN_MAX_COUNT: usize = 32;

/// A single open file: which root directory slot it points at, and the
/// current cursor.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    pub root_index: usize,
    pub offset: u32,
}

pub struct FdTable {
    slots: [Option<Descriptor>; FS_OPEN_MAX_COUNT],
}

impl FdTable {
    pub fn new() -> Self {
        FdTable {
            slots: [None; FS_OPEN_MAX_COUNT],
        }
    }

    /// Allocates the lowest-numbered free slot for `root_index`, returning
    /// the fd number.
    pub fn alloc(&mut self, root_index: usize) -> Result<usize> {
        let fd = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(FsError::FdExhausted)?;
        self.slots[fd] = Some(Descriptor {
            root_index,
            offset: 0,
        });
        Ok(fd)
    }

    pub fn get(&self, fd: usize) -> Result<&Descriptor> {
        self.slots
            .get(fd)
            .and_then(|s| s.as_ref())
            .ok_or(FsError::BadFd)
    }

    pub fn get_mut(&mut self, fd: usize) -> Result<&mut Descriptor> {
        self.slots
            .get_mut(fd)
            .and_then(|s| s.as_mut())
            .ok_or(FsError::BadFd)
    }

    /// Frees `fd`, returning the root index it pointed at so the caller can
    /// decrement that file's open count.
    pub fn close(&mut self, fd: usize) -> Result<usize> {
        let desc = self.get(fd)?;
        let root_index = desc.root_index;
        self.slots[fd] = None;
        Ok(root_index)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_picks_lowest_free_fd() {
        let mut fds = FdTable::new();
        assert_eq!(fds.alloc(3).unwrap(), 0);
        assert_eq!(fds.alloc(7).unwrap(), 1);
    }

    #[test]
    fn close_restores_the_slot() {
        let mut fds = FdTable::new();
        let fd = fds.alloc(3).unwrap();
        assert_eq!(fds.close(fd).unwrap(), 3);
        assert!(matches!(fds.get(fd), Err(FsError::BadFd)));
        assert!(fds.is_empty());
    }

    #[test]
    fn alloc_fails_when_exhausted() {
        let mut fds = FdTable::new();
        for i in 0..FS_OPEN_MAX_COUNT {
            fds.alloc(i).unwrap();
        }
        assert!(matches!(fds.alloc(0), Err(FsError::FdExhausted)));
    }

    #[test]
    fn get_on_an_invalid_fd_fails() {
        let fds = FdTable::new();
        assert!(matches!(fds.get(100), Err(FsError::BadFd)));
        assert!(matches!(fds.get(0), Err(FsError::BadFd)));
    }
}
