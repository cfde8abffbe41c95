//! Reassembling frames from a chunked byte stream.
//!
//! Input arrives in arbitrary pieces. Anything that might still become
//! part of a frame is kept in a fixed-size backlog between deliveries,
//! and each delivery is searched together with that backlog.

use super::buffer::FixedBuffer;
use super::hex::HexBytes;
use super::scan::find_sequence;
use super::{BACKLOG_SIZE, FRAME_END, FRAME_START, MAX_FRAME_SIZE};

/// What a single extraction attempt found.
///
/// Variants are tried in declaration order. Anything already sitting in
/// the backlog is older than the new data, so it's drained first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Extraction {
    /// Start and end both in the backlog. No new data was consumed, and
    /// the backlog may hold more frames.
    FoundInBacklog,
    /// Start in the backlog, end marker split across the backlog and
    /// the first byte of new data. Consumes exactly one new byte.
    SplitAtStopBoundary,
    /// Start in the backlog, end in new data.
    BacklogStartNewDataStop { resume: usize },
    /// Start marker split across the backlog and new data, end in new
    /// data.
    SplitAtStartBoundary { resume: usize },
    /// Start and end both in new data, at or after the search cursor.
    FoundInNewData { resume: usize },
    /// Nothing more to extract.
    NotFound,
}

impl Extraction {
    /// Where in the new data the next attempt should start searching,
    /// given the current cursor. [None] means stop.
    pub fn resume(&self, cursor: usize) -> Option<usize> {
        match self {
            Self::FoundInBacklog => Some(cursor),
            Self::SplitAtStopBoundary => Some(1),
            Self::BacklogStartNewDataStop { resume } => Some(*resume),
            Self::SplitAtStartBoundary { resume } => Some(*resume),
            Self::FoundInNewData { resume } => Some(*resume),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

/// Counters for things the assembler recovers from on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AssemblerStats {
    /// Frames copied into the command buffer.
    pub frames: u64,
    /// Times the backlog was thrown away because it ran out of room.
    pub overflows: u64,
    /// Frames found but too long for the command buffer.
    pub oversized: u64,
}

/// Owns the parser session state: the backlog and the command buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameAssembler {
    backlog: FixedBuffer<BACKLOG_SIZE>,
    command: FixedBuffer<MAX_FRAME_SIZE>,
    stats: AssemblerStats,
}

impl FrameAssembler {
    pub const fn new() -> Self {
        Self {
            backlog: FixedBuffer::new(),
            command: FixedBuffer::new(),
            stats: AssemblerStats {
                frames: 0,
                overflows: 0,
                oversized: 0,
            },
        }
    }

    /// Unresolved input carried over from earlier deliveries.
    pub fn backlog(&self) -> &[u8] {
        self.backlog.data()
    }

    /// The most recently extracted frame, if the last attempt produced
    /// one.
    pub fn frame(&self) -> Option<&[u8]> {
        if self.command.is_empty() {
            None
        } else {
            Some(self.command.data())
        }
    }

    pub fn stats(&self) -> &AssemblerStats {
        &self.stats
    }

    /// Start extracting frames from the backlog plus `new`.
    ///
    /// Frames come out of [Ingest::next_frame]. Whatever part of `new`
    /// was not consumed is moved into the backlog once the [Ingest] is
    /// exhausted or dropped.
    pub fn ingest<'a>(&'a mut self, new: &'a [u8]) -> Ingest<'a> {
        Ingest {
            assembler: self,
            new,
            cursor: 0,
            done: false,
        }
    }

    /// Ingest `new`, calling `f` on every complete frame. Returns the
    /// number of frames found.
    pub fn ingest_with<F>(&mut self, new: &[u8], mut f: F) -> usize
    where
        F: FnMut(&[u8]),
    {
        let mut ingest = self.ingest(new);
        let mut count = 0;
        while let Some(frame) = ingest.next_frame() {
            f(frame);
            count += 1;
        }
        count
    }

    /// Make one attempt at extracting a frame, searching new data from
    /// `cursor`.
    ///
    /// On success the frame is in [Self::frame()], unless it was too
    /// long for the command buffer, in which case it's counted and
    /// dropped but the input is still consumed.
    pub fn extract(&mut self, new: &[u8], cursor: usize) -> Extraction {
        self.command.clear();
        let extraction = self.locate(new, cursor);
        if extraction.is_found() {
            tracing::trace!(?extraction, "frame located");
        }
        extraction
    }

    fn locate(&mut self, new: &[u8], cursor: usize) -> Extraction {
        let backlog = self.backlog.data();

        if let Some(start) = find_sequence(backlog, 0, &FRAME_START) {
            if let Some(stop) = find_sequence(backlog, start + FRAME_START.len(), &FRAME_END) {
                let end = stop + FRAME_END.len();
                load(&mut self.command, &mut self.stats, &[&backlog[start..end]]);
                // keep whatever follows the frame
                self.backlog.skip(end);
                return Extraction::FoundInBacklog;
            }

            if let Some(&first) = new.first() {
                if backlog.last() == Some(&FRAME_END[0]) && first == FRAME_END[1] {
                    load(
                        &mut self.command,
                        &mut self.stats,
                        &[&backlog[start..], &new[..1]],
                    );
                    self.backlog.clear();
                    return Extraction::SplitAtStopBoundary;
                }

                if let Some(stop) = find_sequence(new, 0, &FRAME_END) {
                    let end = stop + FRAME_END.len();
                    load(
                        &mut self.command,
                        &mut self.stats,
                        &[&backlog[start..], &new[..end]],
                    );
                    self.backlog.clear();
                    return Extraction::BacklogStartNewDataStop { resume: end };
                }
            }
        } else if let (Some(&last), Some(&first)) = (backlog.last(), new.first()) {
            if last == FRAME_START[0] && first == FRAME_START[1] {
                if let Some(stop) = find_sequence(new, 0, &FRAME_END) {
                    let end = stop + FRAME_END.len();
                    load(
                        &mut self.command,
                        &mut self.stats,
                        &[&FRAME_START[..1], &new[..end]],
                    );
                    self.backlog.clear();
                    return Extraction::SplitAtStartBoundary { resume: end };
                }
            }
        }

        if let Some(start) = find_sequence(new, cursor, &FRAME_START) {
            if let Some(stop) = find_sequence(new, start + FRAME_START.len(), &FRAME_END) {
                let end = stop + FRAME_END.len();
                load(&mut self.command, &mut self.stats, &[&new[start..end]]);
                return Extraction::FoundInNewData { resume: end };
            }
        }

        Extraction::NotFound
    }

    /// Append unconsumed input to the backlog.
    ///
    /// If it doesn't fit, the backlog is emptied first and only the
    /// newest bytes are kept. Any frame that was partly in the old
    /// backlog is lost; parsing picks up again at the next start marker.
    pub fn retain(&mut self, rest: &[u8]) {
        if self.backlog.extend_from_slice(rest).is_ok() {
            return;
        }

        self.stats.overflows += 1;
        tracing::warn!(
            discarded = self.backlog.len(),
            incoming = rest.len(),
            "backlog overflow, resynchronizing"
        );

        self.backlog.clear();
        let tail = &rest[rest.len().saturating_sub(BACKLOG_SIZE)..];
        // tail always fits in an empty backlog
        let _ = self.backlog.extend_from_slice(tail);
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn load(
    command: &mut FixedBuffer<MAX_FRAME_SIZE>,
    stats: &mut AssemblerStats,
    parts: &[&[u8]],
) {
    match command.fill_from(parts) {
        Ok(()) => {
            stats.frames += 1;
            tracing::debug!("frame {} bytes: {}", command.len(), HexBytes(command.data()));
        }
        Err(e) => {
            stats.oversized += 1;
            tracing::warn!(length = e.requested, "dropping oversized frame");
        }
    }
}

/// Frames being pulled out of one delivery of new data.
///
/// Each call to [Self::next_frame] overwrites the previous frame.
pub struct Ingest<'a> {
    assembler: &'a mut FrameAssembler,
    new: &'a [u8],
    cursor: usize,
    done: bool,
}

impl<'a> Ingest<'a> {
    /// Find the next complete frame, or [None] once nothing more can be
    /// extracted from this delivery.
    pub fn next_frame(&mut self) -> Option<&[u8]> {
        if self.done {
            return None;
        }

        loop {
            let extraction = self.assembler.extract(self.new, self.cursor);
            let Some(resume) = extraction.resume(self.cursor) else {
                self.finish();
                return None;
            };
            self.cursor = resume;

            // oversized frames leave the command buffer empty
            if !self.assembler.command.is_empty() {
                return Some(self.assembler.command.data());
            }
        }
    }

    fn finish(&mut self) {
        if !self.done {
            self.done = true;
            self.assembler.retain(&self.new[self.cursor..]);
        }
    }
}

impl<'a> Drop for Ingest<'a> {
    fn drop(&mut self) {
        self.finish();
    }
}
