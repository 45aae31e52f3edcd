//! Sector-sized write batching.

use std::io::{self, Write};

/// Audio-CD sector size in bytes.
pub const SECTOR_SIZE: usize = 2352;

/// Accumulates bytes and hands them to the writer one full sector at a time.
#[derive(Debug, Clone)]
pub struct SectorBuffer {
    bytes: Box<[u8; SECTOR_SIZE]>,
    used: usize,
}

impl Default for SectorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SectorBuffer {
    pub fn new() -> Self {
        Self {
            bytes: Box::new([0u8; SECTOR_SIZE]),
            used: 0,
        }
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Append one byte, writing the sector out when it becomes full.
    #[inline]
    pub fn push<W: Write>(&mut self, byte: u8, out: &mut W) -> io::Result<()> {
        self.bytes[self.used] = byte;
        self.used += 1;
        if self.used == SECTOR_SIZE {
            out.write_all(&self.bytes[..])?;
            self.used = 0;
        }
        Ok(())
    }

    /// Append a run of bytes.
    pub fn extend<W: Write>(&mut self, bytes: &[u8], out: &mut W) -> io::Result<()> {
        let mut rest = bytes;
        while !rest.is_empty() {
            let take = (SECTOR_SIZE - self.used).min(rest.len());
            self.bytes[self.used..self.used + take].copy_from_slice(&rest[..take]);
            self.used += take;
            rest = &rest[take..];
            if self.used == SECTOR_SIZE {
                out.write_all(&self.bytes[..])?;
                self.used = 0;
            }
        }
        Ok(())
    }

    /// Write whatever is buffered, unpadded, and reset.
    pub fn flush_residue<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.used > 0 {
            out.write_all(&self.bytes[..self.used])?;
            self.used = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the size of every write call.
    #[derive(Default)]
    struct WriteLog {
        data: Vec<u8>,
        writes: Vec<usize>,
    }

    impl Write for WriteLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.data.extend_from_slice(buf);
            self.writes.push(buf.len());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_only_full_sectors() {
        let mut log = WriteLog::default();
        let mut sector = SectorBuffer::new();
        for i in 0..(SECTOR_SIZE * 2 + 10) {
            sector.push(i as u8, &mut log).unwrap();
        }
        assert_eq!(log.writes, vec![SECTOR_SIZE, SECTOR_SIZE]);
        assert_eq!(sector.len(), 10);

        sector.flush_residue(&mut log).unwrap();
        assert_eq!(log.writes, vec![SECTOR_SIZE, SECTOR_SIZE, 10]);
        assert!(sector.is_empty());
        assert_eq!(log.data.len(), SECTOR_SIZE * 2 + 10);
        assert_eq!(log.data[SECTOR_SIZE], (SECTOR_SIZE % 256) as u8);
    }

    #[test]
    fn test_extend_matches_push() {
        let input: Vec<u8> = (0..7000u32).map(|i| (i * 31) as u8).collect();

        let mut pushed = WriteLog::default();
        let mut a = SectorBuffer::new();
        for &b in &input {
            a.push(b, &mut pushed).unwrap();
        }
        a.flush_residue(&mut pushed).unwrap();

        let mut extended = WriteLog::default();
        let mut b = SectorBuffer::new();
        b.extend(&input[..100], &mut extended).unwrap();
        b.extend(&input[100..], &mut extended).unwrap();
        b.flush_residue(&mut extended).unwrap();

        assert_eq!(pushed.data, extended.data);
        assert_eq!(pushed.writes, extended.writes);
    }

    #[test]
    fn test_empty_residue_writes_nothing() {
        let mut log = WriteLog::default();
        SectorBuffer::new().flush_residue(&mut log).unwrap();
        assert!(log.writes.is_empty());
    }

    #[test]
    fn test_write_error_propagates() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut sector = SectorBuffer::new();
        let result = sector.extend(&[0u8; SECTOR_SIZE], &mut Broken);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::Other);
    }
}
