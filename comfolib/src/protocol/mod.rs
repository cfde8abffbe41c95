pub const FRAME_START: [u8; 2] = [0x07, 0xf0];
pub const FRAME_END: [u8; 2] = [0x07, 0x0f];

/// Smallest frame the unit sends: start, two header bytes, length,
/// checksum, end.
pub const MIN_FRAME_SIZE: usize = 8;

/// The length field is one byte, so at most 255 data bytes.
pub const MAX_FRAME_SIZE: usize = MIN_FRAME_SIZE + 255;

/// Backlog holds two frames' worth of unresolved input.
pub const BACKLOG_SIZE: usize = 2 * MAX_FRAME_SIZE;

pub const BAUD_RATE: u32 = 9600;

pub mod assemble;
pub use assemble::{AssemblerStats, Extraction, FrameAssembler, Ingest};

pub mod buffer;
pub use buffer::FixedBuffer;

pub mod command;
pub use command::{interpret, Command, CommandType, Payload, TemperatureReading};

pub mod hex;
pub use hex::HexBytes;

pub mod scan;
pub use scan::find_sequence;

pub mod temperature;
pub use temperature::Temperature;
