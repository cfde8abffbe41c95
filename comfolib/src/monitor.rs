use crate::protocol::{interpret, Command, FrameAssembler, HexBytes};

/// Most bytes taken from the source per poll.
pub const READ_CHUNK_SIZE: usize = 64;

/// Why [Monitor::poll()] gave up. Everything the parser itself runs
/// into is recovered from and counted, so only the byte source can
/// stop it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MonitorError<E> {
    /// The source reported bytes available, then delivered none. For a
    /// capture file this is the end of the capture.
    SourceClosed {
        /// Bytes read from the source before it closed.
        after: u64,
    },
    /// The source failed to report or deliver bytes.
    Source(E),
}

#[cfg(feature = "std")]
impl<E> std::error::Error for MonitorError<E> where E: core::fmt::Debug {}

impl<E> core::fmt::Display for MonitorError<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::SourceClosed { after } => {
                write!(f, "byte source closed after {} bytes", after)
            }
            Self::Source(e) => write!(f, "byte source failed: {:?}", e),
        }
    }
}

impl<E> From<E> for MonitorError<E> {
    fn from(other: E) -> Self {
        Self::Source(other)
    }
}

/// Somewhere bytes come from, polled without blocking.
pub trait ByteSource: embedded_io::ErrorType {
    /// How many bytes can be read right now.
    fn available(&mut self) -> Result<usize, Self::Error>;

    /// Read up to `buf.len()` of the available bytes.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

impl<S> ByteSource for &mut S
where
    S: ByteSource + ?Sized,
{
    fn available(&mut self) -> Result<usize, Self::Error> {
        (**self).available()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read_available(buf)
    }
}

/// Somewhere interpreted measurements go.
///
/// Implementations handle their own connection state. A failed publish
/// is reported, never retried.
pub trait Publish {
    type Error: core::fmt::Debug;

    fn publish(&mut self, payload: &dyn core::fmt::Display) -> Result<(), Self::Error>;

    /// Called once per poll, busy or not. Must return quickly; this is
    /// where reconnects belong.
    fn maintain(&mut self) {}
}

impl<P> Publish for &mut P
where
    P: Publish + ?Sized,
{
    type Error = P::Error;

    fn publish(&mut self, payload: &dyn core::fmt::Display) -> Result<(), Self::Error> {
        (**self).publish(payload)
    }

    fn maintain(&mut self) {
        (**self).maintain()
    }
}

/// Running totals for a [Monitor].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorStats {
    pub bytes: u64,
    pub frames: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub unknown: u64,
    pub truncated: u64,
}

/// What one [Monitor::poll()] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollSummary {
    pub bytes: usize,
    pub frames: usize,
    pub published: usize,
}

impl PollSummary {
    /// True if the source had nothing for us.
    pub fn is_idle(&self) -> bool {
        self.bytes == 0
    }
}

/// Moves bytes from a source, through the frame assembler and command
/// interpreter, to a publisher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Monitor<S, P> {
    source: S,
    sink: P,
    assembler: FrameAssembler,
    chunk: [u8; READ_CHUNK_SIZE],
    stats: MonitorStats,
}

impl<S, P> Monitor<S, P>
where
    S: ByteSource,
    P: Publish,
{
    pub fn new(source: S, sink: P) -> Self {
        Self {
            source,
            sink,
            assembler: FrameAssembler::new(),
            chunk: [0; READ_CHUNK_SIZE],
            stats: MonitorStats::default(),
        }
    }

    pub fn assembler(&self) -> &FrameAssembler {
        &self.assembler
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }

    /// Let the sink do upkeep, then read whatever is available (up to
    /// [READ_CHUNK_SIZE]) and handle every frame that completes.
    pub fn poll(&mut self) -> Result<PollSummary, MonitorError<S::Error>> {
        self.sink.maintain();

        let available = self.source.available()?;
        if available == 0 {
            return Ok(PollSummary::default());
        }

        let want = available.min(READ_CHUNK_SIZE);
        let amt = self.source.read_available(&mut self.chunk[..want])?;
        if amt == 0 {
            return Err(MonitorError::SourceClosed {
                after: self.stats.bytes,
            });
        }

        let data = &self.chunk[..amt];
        tracing::trace!("uart: {}", HexBytes(data));
        self.stats.bytes += amt as u64;

        let mut summary = PollSummary {
            bytes: amt,
            ..Default::default()
        };

        let mut ingest = self.assembler.ingest(data);
        while let Some(frame) = ingest.next_frame() {
            summary.frames += 1;
            self.stats.frames += 1;
            if dispatch(&mut self.sink, &mut self.stats, interpret(frame)) {
                summary.published += 1;
            }
        }

        Ok(summary)
    }
}

/// Publish a command if it has a payload. Returns true if it was
/// published.
fn dispatch<P>(sink: &mut P, stats: &mut MonitorStats, command: Command) -> bool
where
    P: Publish,
{
    match command {
        Command::Temperatures(_) => {}
        Command::Unknown { code, len } => {
            tracing::debug!("cmd = 0x{:02X} ({} bytes) - not parsed", code, len);
            stats.unknown += 1;
            return false;
        }
        Command::Truncated { code, len } => {
            tracing::warn!(?code, len, "frame too short for its command");
            stats.truncated += 1;
            return false;
        }
    }

    let Some(payload) = command.payload() else {
        return false;
    };

    tracing::debug!("{}", payload);
    match sink.publish(&payload) {
        Ok(()) => {
            stats.published += 1;
            true
        }
        Err(e) => {
            tracing::warn!(error = ?e, "failed to publish");
            stats.publish_failures += 1;
            false
        }
    }
}

#[cfg(test)]
#[cfg(feature = "std")]
mod test {
    use super::*;

    use std::collections::VecDeque;

    const FRAME: [u8; 17] = [
        0x07, 0xf0, 0x00, 0xd2, 0x09, 0x50, 0x4c, 0x4d, 0x54, 0x54, 0x0f, 0x28, 0x28, 0x28, 0xa0,
        0x07, 0x0f,
    ];

    const PAYLOAD: &str = "command=D2 t_comfort=20.00,t1_intake=18.00,t2_tohome=18.50,t3_fromhome=22.00,t4_exhaust=22.00";

    /// Hands out pre-cut deliveries, one per poll.
    #[derive(Default)]
    struct Deliveries {
        queue: VecDeque<Vec<u8>>,
        lie: bool,
    }

    impl Deliveries {
        fn new(parts: &[&[u8]]) -> Self {
            Self {
                queue: parts.iter().map(|p| p.to_vec()).collect(),
                lie: false,
            }
        }
    }

    impl embedded_io::ErrorType for Deliveries {
        type Error = core::convert::Infallible;
    }

    impl ByteSource for Deliveries {
        fn available(&mut self) -> Result<usize, Self::Error> {
            if self.lie {
                return Ok(1);
            }
            Ok(self.queue.front().map(|p| p.len()).unwrap_or(0))
        }

        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let Some(front) = self.queue.front_mut() else {
                return Ok(0);
            };
            let n = buf.len().min(front.len());
            buf[..n].copy_from_slice(&front[..n]);
            front.drain(..n);
            if front.is_empty() {
                self.queue.pop_front();
            }
            Ok(n)
        }
    }

    #[derive(Default)]
    struct Recorder {
        published: Vec<String>,
        fail: bool,
        maintained: usize,
    }

    impl Publish for Recorder {
        type Error = &'static str;

        fn publish(&mut self, payload: &dyn core::fmt::Display) -> Result<(), Self::Error> {
            if self.fail {
                return Err("not connected");
            }
            self.published.push(payload.to_string());
            Ok(())
        }

        fn maintain(&mut self) {
            self.maintained += 1;
        }
    }

    fn drain(monitor: &mut Monitor<Deliveries, Recorder>) {
        while !monitor.poll().unwrap().is_idle() {}
    }

    #[test]
    fn publishes_whole_frame_once() {
        let mut monitor = Monitor::new(Deliveries::new(&[&FRAME]), Recorder::default());
        let summary = monitor.poll().unwrap();
        assert_eq!(
            summary,
            PollSummary {
                bytes: FRAME.len(),
                frames: 1,
                published: 1
            }
        );
        assert!(monitor.poll().unwrap().is_idle());
        assert_eq!(monitor.sink().published, vec![PAYLOAD.to_string()]);
    }

    #[test]
    fn publishes_split_frame_once() {
        let mut monitor = Monitor::new(
            Deliveries::new(&[&FRAME[..3], &FRAME[3..]]),
            Recorder::default(),
        );
        assert_eq!(monitor.poll().unwrap().frames, 0);
        assert_eq!(monitor.poll().unwrap().published, 1);
        assert_eq!(monitor.sink().published, vec![PAYLOAD.to_string()]);
    }

    #[test]
    fn same_frame_twice() {
        let mut monitor = Monitor::new(Deliveries::new(&[&FRAME, &FRAME]), Recorder::default());
        drain(&mut monitor);
        assert_eq!(
            monitor.sink().published,
            vec![PAYLOAD.to_string(), PAYLOAD.to_string()]
        );
        assert!(monitor.assembler().backlog().is_empty());
    }

    #[test]
    fn unknown_command_not_published() {
        let frame = [0x07, 0xf0, 0x00, 0x01, 0x00, 0x55, 0x07, 0x0f];
        let mut monitor = Monitor::new(Deliveries::new(&[&frame]), Recorder::default());
        assert_eq!(monitor.poll().unwrap().frames, 1);
        assert!(monitor.sink().published.is_empty());
        assert_eq!(monitor.stats().unknown, 1);
    }

    #[test]
    fn truncated_command_not_published() {
        let frame = [0x07, 0xf0, 0x00, 0xd2, 0x01, 0x55, 0x07, 0x0f];
        let mut monitor = Monitor::new(Deliveries::new(&[&frame]), Recorder::default());
        drain(&mut monitor);
        assert!(monitor.sink().published.is_empty());
        assert_eq!(monitor.stats().truncated, 1);
    }

    #[test]
    fn reads_at_most_one_chunk() {
        let mut data = vec![0x00; READ_CHUNK_SIZE];
        data.extend_from_slice(&FRAME);
        let mut monitor = Monitor::new(Deliveries::new(&[&data]), Recorder::default());

        let first = monitor.poll().unwrap();
        assert_eq!(first.bytes, READ_CHUNK_SIZE);
        assert_eq!(first.frames, 0);

        let second = monitor.poll().unwrap();
        assert_eq!(second.bytes, FRAME.len());
        assert_eq!(second.published, 1);
        assert_eq!(monitor.stats().bytes, data.len() as u64);
    }

    #[test]
    fn publish_failure_is_counted() {
        let mut monitor = Monitor::new(
            Deliveries::new(&[&FRAME, &FRAME]),
            Recorder {
                fail: true,
                ..Default::default()
            },
        );
        let summary = monitor.poll().unwrap();
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.published, 0);
        assert_eq!(monitor.stats().publish_failures, 1);

        // parser state doesn't care
        monitor.sink_mut().fail = false;
        assert_eq!(monitor.poll().unwrap().published, 1);
        assert_eq!(monitor.sink().published, vec![PAYLOAD.to_string()]);
    }

    #[test]
    fn busy_source_still_maintains_sink() {
        // never idle until the very end
        let parts = [&FRAME[..]; 5];
        let mut monitor = Monitor::new(
            Deliveries::new(&parts),
            Recorder {
                fail: true,
                ..Default::default()
            },
        );
        for _ in 0..5 {
            assert!(!monitor.poll().unwrap().is_idle());
        }
        assert_eq!(monitor.sink().maintained, 5);
        assert_eq!(monitor.stats().publish_failures, 5);
    }

    #[test]
    fn closed_source_reports_bytes_read() {
        let mut monitor = Monitor::new(Deliveries::new(&[&FRAME]), Recorder::default());
        monitor.poll().unwrap();
        monitor.source.lie = true;
        assert_eq!(
            monitor.poll(),
            Err(MonitorError::SourceClosed {
                after: FRAME.len() as u64
            })
        );
        assert_eq!(monitor.sink().published, vec![PAYLOAD.to_string()]);
    }

    #[test]
    fn idle_source() {
        let mut monitor = Monitor::new(Deliveries::default(), Recorder::default());
        assert!(monitor.poll().unwrap().is_idle());
    }

    #[test]
    fn lying_source_is_eof() {
        let mut monitor = Monitor::new(
            Deliveries {
                lie: true,
                ..Default::default()
            },
            Recorder::default(),
        );
        assert_eq!(
            monitor.poll(),
            Err(MonitorError::SourceClosed { after: 0 })
        );
    }
}
