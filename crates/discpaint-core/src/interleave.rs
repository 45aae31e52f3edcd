//! Convolutional interleaver shaped like audio-CD CIRC frame interleaving.
//!
//! Symbols are written 24 at a time into a ring of 112 frames. Input position
//! `k` of a frame lands `M(k)` frames behind the current frame at column
//! `offset(k)`, where both come from the fixed delay table. After each full
//! frame the ring advances and the frame under the cursor is emitted in
//! column order. A byte written in frame `F` at position `k` is therefore
//! emitted `111 - M(k)` frames later at column `offset(k)`.
//!
//! The transform depends only on stream position, never on byte values.

/// Symbols per interleave frame.
pub const FRAME_LEN: usize = 24;

/// Frames held by the ring.
pub const RING_FRAMES: usize = 28 * D as usize;

/// Total ring capacity in bytes.
pub const RING_LEN: usize = FRAME_LEN * RING_FRAMES;

const D: i32 = 4;

/// Slot offsets, relative to the current frame start, for each input position.
pub const DELAYS: [i32; FRAME_LEN] = [
    -24 * 3,
    -24 * (D + 2) + 1,
    8 - 24 * (2 * D + 3),
    8 - 24 * (3 * D + 2) + 1,
    16 - 24 * (4 * D + 3),
    16 - 24 * (5 * D + 2) + 1,
    2 - 24 * (6 * D + 3),
    2 - 24 * (7 * D + 2) + 1,
    10 - 24 * (8 * D + 3),
    10 - 24 * (9 * D + 2) + 1,
    18 - 24 * (10 * D + 3),
    18 - 24 * (11 * D + 2) + 1,
    4 - 24 * (16 * D + 1),
    4 - 24 * (17 * D) + 1,
    12 - 24 * (18 * D + 1),
    12 - 24 * (19 * D) + 1,
    20 - 24 * (20 * D + 1),
    20 - 24 * (21 * D) + 1,
    6 - 24 * (22 * D + 1),
    6 - 24 * (23 * D) + 1,
    14 - 24 * (24 * D + 1),
    14 - 24 * (25 * D) + 1,
    22 - 24 * (26 * D + 1),
    22 - 24 * (27 * D) + 1,
];

/// Column and frame lag encoded by a delay table entry.
#[inline]
fn split_delay(delay: i32) -> (usize, usize) {
    let column = delay.rem_euclid(FRAME_LEN as i32);
    let frames_behind = (column - delay) / FRAME_LEN as i32;
    (column as usize, frames_behind as usize)
}

/// Number of frames between writing a byte at position `k` and emitting it.
#[inline]
pub fn latency_frames(k: usize) -> usize {
    let (_, behind) = split_delay(DELAYS[k]);
    RING_FRAMES - 1 - behind
}

/// Longest latency over all positions.
pub fn max_latency_frames() -> usize {
    (0..FRAME_LEN).map(latency_frames).max().unwrap_or(0)
}

/// Streaming interleaver state.
///
/// Owned by whichever stage writes the output; never shared between threads.
#[derive(Debug, Clone)]
pub struct Interleaver {
    ring: Box<[u8; RING_LEN]>,
    cursor: usize,
    frame: usize,
}

impl Default for Interleaver {
    fn default() -> Self {
        Self::new()
    }
}

impl Interleaver {
    pub fn new() -> Self {
        Self {
            ring: Box::new([0u8; RING_LEN]),
            cursor: 0,
            // the first completed frame advances to, and emits, frame 0
            frame: RING_FRAMES - 1,
        }
    }

    #[inline]
    fn slot(&self, offset: i32) -> usize {
        (self.frame as i32 * FRAME_LEN as i32 + offset).rem_euclid(RING_LEN as i32) as usize
    }

    /// Feed one symbol. Returns the emitted frame when this symbol completes
    /// a frame.
    #[inline]
    pub fn push(&mut self, byte: u8) -> Option<[u8; FRAME_LEN]> {
        let slot = self.slot(DELAYS[self.cursor]);
        self.ring[slot] = byte;
        self.cursor += 1;

        if self.cursor < FRAME_LEN {
            return None;
        }

        self.cursor = 0;
        self.frame = (self.frame + 1) % RING_FRAMES;
        let start = self.slot(0);
        let mut out = [0u8; FRAME_LEN];
        out.copy_from_slice(&self.ring[start..start + FRAME_LEN]);
        Some(out)
    }

    /// Symbols written into the current, incomplete frame.
    pub fn pending(&self) -> usize {
        self.cursor
    }
}

/// Invert the interleaver on a complete output stream.
///
/// Returns the input symbols of every frame whose bytes have all been
/// emitted, i.e. the first `frames - max_latency` input frames.
pub fn deinterleave(stream: &[u8]) -> Vec<u8> {
    let frames = stream.len() / FRAME_LEN;
    let recoverable = frames.saturating_sub(max_latency_frames());
    let mut out = Vec::with_capacity(recoverable * FRAME_LEN);

    for frame in 0..recoverable {
        for k in 0..FRAME_LEN {
            let (column, _) = split_delay(DELAYS[k]);
            let emitted_in = frame + latency_frames(k);
            out.push(stream[emitted_in * FRAME_LEN + column]);
        }
    }
    out
}
