//! I/O engine: maps a logical byte range on a file onto a FAT chain walk.

use crate::block_device::BlockDevice;
use crate::error::Result;
use crate::fat::{Fat, Next, FAT_EOC};
use crate::BLOCK_SIZE;

/// Advances `steps` times along the chain starting at `head`, returning the
/// data-block index reached. Never allocates.
fn advance(fat: &Fat, head: u16, steps: usize) -> Result<u16> {
    let mut cur = head;
    for _ in 0..steps {
        cur = match fat.next(cur)? {
            Next::Block(b) => b,
            Next::End => {
                // Caller asked for a position past the current chain; this
                // is only legal for write(), which extends before calling
                // further. Surfacing the current tail lets write() extend
                // from exactly here.
                return Ok(cur);
            }
        };
    }
    Ok(cur)
}

/// Finds the data block holding logical offset `offset` in a file starting
/// at `head`.
pub fn chain_walk(fat: &Fat, head: u16, offset: u32) -> Result<u16> {
    let steps = offset as usize / BLOCK_SIZE;
    advance(fat, head, steps)
}

/// Copies up to `count` bytes from `offset` in the file described by
/// `first_block`/`size`, returning the number of bytes actually copied.
/// Stops early at end of file; never reads past `size`.
pub fn read_chain<D: BlockDevice>(
    dev: &mut D,
    fat: &Fat,
    data_start_block: u16,
    first_block: u16,
    size: u32,
    offset: u32,
    buf: &mut [u8],
    count: usize,
) -> Result<usize> {
    let count = count.min((size.saturating_sub(offset)) as usize);
    if count == 0 {
        return Ok(0);
    }

    let mut remaining = count;
    let mut cursor = offset;
    let mut cur = chain_walk(fat, first_block, cursor)?;
    let mut written = 0usize;

    while remaining > 0 {
        let in_block = cursor as usize % BLOCK_SIZE;
        let take = remaining.min(BLOCK_SIZE - in_block);
        let phys = data_start_block as usize + cur as usize;

        if take == BLOCK_SIZE {
            let dst: &mut [u8; BLOCK_SIZE] = (&mut buf[written..written + BLOCK_SIZE])
                .try_into()
                .expect("aligned full-block slice");
            dev.read_block(phys, dst)?;
        } else {
            let mut scratch = [0u8; BLOCK_SIZE];
            dev.read_block(phys, &mut scratch)?;
            buf[written..written + take].copy_from_slice(&scratch[in_block..in_block + take]);
        }

        cursor += take as u32;
        written += take;
        remaining -= take;
        if remaining > 0 {
            cur = match fat.next(cur)? {
                Next::Block(b) => b,
                Next::End => break,
            };
        }
    }

    Ok(written)
}

/// Copies up to `count` bytes at `offset` into the file described by
/// `first_block`/`size`, growing the chain as needed. `first_block` is
/// updated in place if this is the file's first allocation. Returns the
/// number of bytes actually written: a short count (rather than an error)
/// signals the allocator ran out of space mid-write.
#[allow(clippy::too_many_arguments)]
pub fn write_chain<D: BlockDevice>(
    dev: &mut D,
    fat: &mut Fat,
    data_start_block: u16,
    first_block: &mut u16,
    offset: u32,
    buf: &[u8],
    count: usize,
) -> Result<usize> {
    if count == 0 {
        return Ok(0);
    }

    if *first_block == FAT_EOC {
        *first_block = match fat.allocate() {
            Ok(b) => b,
            Err(_) => return Ok(0),
        };
    }

    let steps = offset as usize / BLOCK_SIZE;
    let mut cur = *first_block;
    for _ in 0..steps {
        cur = match fat.next(cur)? {
            Next::Block(b) => b,
            Next::End => match fat.extend(cur) {
                Ok(b) => b,
                Err(_) => return Ok(0),
            },
        };
    }

    let mut remaining = count;
    let mut cursor = offset;
    let mut written = 0usize;

    while remaining > 0 {
        let in_block = cursor as usize % BLOCK_SIZE;
        let take = remaining.min(BLOCK_SIZE - in_block);
        let phys = data_start_block as usize + cur as usize;

        if take == BLOCK_SIZE {
            let src: &[u8; BLOCK_SIZE] = (&buf[written..written + BLOCK_SIZE])
                .try_into()
                .expect("aligned full-block slice");
            dev.write_block(phys, src)?;
        } else {
            let mut scratch = [0u8; BLOCK_SIZE];
            dev.read_block(phys, &mut scratch)?;
            scratch[in_block..in_block + take].copy_from_slice(&buf[written..written + take]);
            dev.write_block(phys, &scratch)?;
        }

        cursor += take as u32;
        written += take;
        remaining -= take;

        if remaining > 0 {
            cur = match fat.next(cur)? {
                Next::Block(b) => b,
                Next::End => match fat.extend(cur) {
                    Ok(b) => b,
                    Err(_) => break,
                },
            };
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_device::RamBlockDevice;

    fn setup(data_block_count: usize) -> (RamBlockDevice, Fat, u16) {
        let dev = RamBlockDevice::new(data_block_count + 1);
        let fat = Fat::new(data_block_count);
        (dev, fat, 1) // data region starts right after the lone reserved block
    }

    #[test]
    fn write_then_read_small_payload() {
        let (mut dev, mut fat, data_start) = setup(8);
        let mut first_block = FAT_EOC;
        let payload = b"hello";
        let written =
            write_chain(&mut dev, &mut fat, data_start, &mut first_block, 0, payload, 5).unwrap();
        assert_eq!(written, 5);
        assert_ne!(first_block, FAT_EOC);

        let mut buf = [0u8; 5];
        let read = read_chain(&mut dev, &fat, data_start, first_block, 5, 0, &mut buf, 5).unwrap();
        assert_eq!(read, 5);
        assert_eq!(&buf, payload);
    }

    #[test]
    fn write_across_a_block_boundary_extends_the_chain() {
        let (mut dev, mut fat, data_start) = setup(8);
        let mut first_block = FAT_EOC;
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 20) as u8).collect();
        let written = write_chain(
            &mut dev,
            &mut fat,
            data_start,
            &mut first_block,
            0,
            &payload,
            payload.len(),
        )
        .unwrap();
        assert_eq!(written, 5000);
        assert_eq!(fat.next(first_block).unwrap(), Next::Block(first_block + 1));

        let mut buf = vec![0u8; 5000];
        let read = read_chain(
            &mut dev,
            &fat,
            data_start,
            first_block,
            5000,
            0,
            &mut buf,
            5000,
        )
        .unwrap();
        assert_eq!(read, 5000);
        assert_eq!(buf, payload);
    }

    #[test]
    fn read_clamps_to_file_size() {
        let (mut dev, mut fat, data_start) = setup(8);
        let mut first_block = FAT_EOC;
        write_chain(&mut dev, &mut fat, data_start, &mut first_block, 0, b"hello", 5).unwrap();

        let mut buf = [0u8; 10];
        let read = read_chain(&mut dev, &fat, data_start, first_block, 5, 2, &mut buf, 10).unwrap();
        assert_eq!(read, 3);
        assert_eq!(&buf[..3], b"llo");
    }

    #[test]
    fn write_short_counts_when_disk_runs_out_of_space() {
        let (mut dev, mut fat, data_start) = setup(2);
        let mut first_block = FAT_EOC;
        let payload = vec![0xAAu8; BLOCK_SIZE * 3];
        let written = write_chain(
            &mut dev,
            &mut fat,
            data_start,
            &mut first_block,
            0,
            &payload,
            payload.len(),
        )
        .unwrap();
        assert_eq!(written, BLOCK_SIZE); // only 1 free data block available
    }
}
