//! The output stage shared by both encoders.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::interleave::Interleaver;
use crate::sector::SectorBuffer;

use super::{EncodeError, EncodeSummary, OutputLayout};

/// Turns the track-ordered symbol stream into output bytes.
///
/// Owns the interleaver and the sector buffer, so exactly one sink exists per
/// run and it always sees symbols in stream order.
#[derive(Debug)]
pub struct TrackSink<W: Write> {
    out: W,
    layout: OutputLayout,
    interleaver: Interleaver,
    sector: SectorBuffer,
    tracks: u64,
    symbols: u64,
    bytes_written: u64,
}

impl<W: Write> TrackSink<W> {
    pub fn new(out: W, layout: OutputLayout) -> Self {
        Self {
            out,
            layout,
            interleaver: Interleaver::new(),
            sector: SectorBuffer::new(),
            tracks: 0,
            symbols: 0,
            bytes_written: 0,
        }
    }

    /// Feed one symbol.
    #[inline]
    pub fn push(&mut self, symbol: u8) -> Result<(), EncodeError> {
        self.symbols += 1;
        match self.layout {
            OutputLayout::Interleaved => {
                if let Some(frame) = self.interleaver.push(symbol) {
                    self.bytes_written += frame.len() as u64;
                    self.sector
                        .extend(&frame, &mut self.out)
                        .map_err(EncodeError::io("writing sector"))?;
                }
            }
            OutputLayout::Raw => {
                self.bytes_written += 1;
                self.sector
                    .push(symbol, &mut self.out)
                    .map_err(EncodeError::io("writing sector"))?;
            }
        }
        Ok(())
    }

    /// Feed a complete track's symbols.
    pub fn push_track(&mut self, symbols: &[u8]) -> Result<(), EncodeError> {
        match self.layout {
            OutputLayout::Raw => {
                self.symbols += symbols.len() as u64;
                self.bytes_written += symbols.len() as u64;
                self.sector
                    .extend(symbols, &mut self.out)
                    .map_err(EncodeError::io("writing sector"))?;
            }
            OutputLayout::Interleaved => {
                for &symbol in symbols {
                    self.push(symbol)?;
                }
            }
        }
        self.end_track();
        Ok(())
    }

    /// Mark the end of a track fed symbol by symbol.
    pub fn end_track(&mut self) {
        self.tracks += 1;
    }

    pub fn summary(&self) -> EncodeSummary {
        EncodeSummary {
            tracks: self.tracks,
            symbols: self.symbols,
            bytes_written: self.bytes_written,
        }
    }

    /// Write the partial last sector and flush the writer.
    ///
    /// Symbols still inside the interleaver ring, and those of an incomplete
    /// last frame, are not emitted.
    pub fn finish(mut self) -> Result<(EncodeSummary, W), EncodeError> {
        self.sector
            .flush_residue(&mut self.out)
            .map_err(EncodeError::io("writing final sector"))?;
        self.out
            .flush()
            .map_err(EncodeError::io("flushing output"))?;
        if self.interleaver.pending() > 0 {
            tracing::debug!(
                dropped = self.interleaver.pending(),
                "incomplete final frame not emitted"
            );
        }
        Ok((self.summary(), self.out))
    }
}

/// Output file that is removed unless the run commits it.
#[derive(Debug)]
pub struct OutputFile {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    committed: bool,
}

impl OutputFile {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, EncodeError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .map_err(EncodeError::io(format!("creating {}", path.display())))?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer_mut(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::other("output file already closed"))
    }

    /// Flush, sync and keep the file.
    pub fn commit(mut self) -> Result<PathBuf, EncodeError> {
        let writer = self
            .writer_mut()
            .map_err(EncodeError::io("committing output"))?;
        writer
            .flush()
            .map_err(EncodeError::io("flushing output"))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(EncodeError::io("syncing output"))?;
        self.committed = true;
        Ok(self.path.clone())
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer_mut()?.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer_mut()?.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer_mut()?.flush()
    }
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        drop(self.writer.take());
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed partial output"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "could not remove partial output"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interleave::{deinterleave, max_latency_frames, FRAME_LEN};

    #[test]
    fn test_raw_layout_passes_through() {
        let mut sink = TrackSink::new(Vec::new(), OutputLayout::Raw);
        sink.push_track(&[1, 2, 3]).unwrap();
        for b in [4, 5] {
            sink.push(b).unwrap();
        }
        sink.end_track();
        let (summary, out) = sink.finish().unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            summary,
            EncodeSummary {
                tracks: 2,
                symbols: 5,
                bytes_written: 5
            }
        );
    }

    #[test]
    fn test_interleaved_drops_partial_frame() {
        let mut sink = TrackSink::new(Vec::new(), OutputLayout::Interleaved);
        sink.push_track(&[0xAA; FRAME_LEN * 4 + 7]).unwrap();
        let (summary, out) = sink.finish().unwrap();
        assert_eq!(out.len(), FRAME_LEN * 4);
        assert_eq!(summary.symbols, (FRAME_LEN * 4 + 7) as u64);
        assert_eq!(summary.bytes_written, out.len() as u64);
    }

    #[test]
    fn test_interleaved_inverts() {
        let data: Vec<u8> = (0..FRAME_LEN * 50).map(|i| (i % 251) as u8).collect();
        let mut sink = TrackSink::new(Vec::new(), OutputLayout::Interleaved);
        sink.push_track(&data).unwrap();
        sink.push_track(&vec![0; max_latency_frames() * FRAME_LEN]).unwrap();
        let (_, out) = sink.finish().unwrap();
        assert_eq!(deinterleave(&out), data);
    }

    #[test]
    fn test_push_and_push_track_agree() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i * 7) as u8).collect();
        let mut a = TrackSink::new(Vec::new(), OutputLayout::Interleaved);
        a.push_track(&data).unwrap();
        let mut b = TrackSink::new(Vec::new(), OutputLayout::Interleaved);
        for &s in &data {
            b.push(s).unwrap();
        }
        b.end_track();
        assert_eq!(a.finish().unwrap().1, b.finish().unwrap().1);
    }

    #[test]
    fn test_output_file_removed_unless_committed() {
        let dir = tempfile::tempdir().unwrap();
        let dropped = dir.path().join("dropped.bin");
        let kept = dir.path().join("kept.bin");

        {
            let mut file = OutputFile::create(&dropped).unwrap();
            file.write_all(b"partial").unwrap();
            assert!(dropped.exists());
        }
        assert!(!dropped.exists());

        let mut file = OutputFile::create(&kept).unwrap();
        file.write_all(b"complete").unwrap();
        assert_eq!(file.commit().unwrap(), kept);
        assert_eq!(fs::read(&kept).unwrap(), b"complete");
    }

    #[test]
    fn test_output_file_bad_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.bin");
        assert!(matches!(
            OutputFile::create(&path),
            Err(EncodeError::Io { .. })
        ));
    }
}
