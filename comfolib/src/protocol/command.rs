//! Interpreting assembled frames.
//!
//! A frame on the wire looks like
//!
//! ```text
//! 07 f0 | 00 | code | len | data[len] | checksum | 07 0f
//! ```
//!
//! Only the extended temperatures command (0xd2) is understood. The
//! checksum is never checked.

use nom::IResult;

use super::temperature::Temperature;
use super::FRAME_START;

/// Commands with a known code.
pub trait CommandType {
    const CODE: u8;
}

/// 0xd2 Extended temperatures, sent periodically by the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureReading {
    /// Comfort setpoint.
    pub comfort: Temperature,
    /// T1, outdoor air coming in.
    pub intake: Temperature,
    /// T2, supply air going to the dwelling.
    pub to_home: Temperature,
    /// T3, extract air coming from the dwelling.
    pub from_home: Temperature,
    /// T4, exhaust air going outside.
    pub exhaust: Temperature,
}

impl CommandType for TemperatureReading {
    const CODE: u8 = 0xd2;
}

impl TemperatureReading {
    pub fn from_raw(raw: [u8; 5]) -> Self {
        let [comfort, intake, to_home, from_home, exhaust] = raw.map(Temperature);
        Self {
            comfort,
            intake,
            to_home,
            from_home,
            exhaust,
        }
    }

    pub fn to_raw(&self) -> [u8; 5] {
        [
            self.comfort.raw(),
            self.intake.raw(),
            self.to_home.raw(),
            self.from_home.raw(),
            self.exhaust.raw(),
        ]
    }

    /// Parse the body following the command code: a length byte, then
    /// five temperatures. Anything after that is ignored.
    pub fn parse_body(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, _len) = nom::number::complete::u8(input)?;
        let mut raw = [0u8; 5];
        let (input, ()) = nom::multi::fill(
            nom::number::complete::u8::<_, nom::error::Error<&[u8]>>,
            &mut raw,
        )(input)?;
        Ok((input, Self::from_raw(raw)))
    }
}

impl core::fmt::Display for TemperatureReading {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "t_comfort={},t1_intake={},t2_tohome={},t3_fromhome={},t4_exhaust={}",
            self.comfort, self.intake, self.to_home, self.from_home, self.exhaust
        )
    }
}

/// What a frame turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Temperatures(TemperatureReading),
    /// A frame with a code we don't interpret.
    Unknown { code: u8, len: usize },
    /// A frame too short to hold what its code needs. `code` is missing
    /// if the frame can't even hold a header.
    Truncated { code: Option<u8>, len: usize },
}

impl Command {
    pub fn code(&self) -> Option<u8> {
        match self {
            Self::Temperatures(_) => Some(TemperatureReading::CODE),
            Self::Unknown { code, .. } => Some(*code),
            Self::Truncated { code, .. } => *code,
        }
    }

    /// The text to publish, for commands that have one.
    pub fn payload(&self) -> Option<Payload<'_>> {
        match self {
            Self::Temperatures(reading) => Some(Payload(reading)),
            _ => None,
        }
    }
}

/// Published key/value text for an interpreted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Payload<'a>(&'a TemperatureReading);

impl<'a> core::fmt::Display for Payload<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "command={:02X} {}", TemperatureReading::CODE, self.0)
    }
}

/// Frame start, one unknown byte, then the command code.
fn header(input: &[u8]) -> IResult<&[u8], u8> {
    let (input, _) = nom::bytes::complete::tag(&FRAME_START[..])(input)?;
    let (input, _) = nom::number::complete::u8(input)?;
    nom::number::complete::u8(input)
}

/// Decide what a complete frame means.
pub fn interpret(frame: &[u8]) -> Command {
    let len = frame.len();
    let Ok((body, code)) = header(frame) else {
        return Command::Truncated {
            code: frame.get(3).copied(),
            len,
        };
    };

    match code {
        TemperatureReading::CODE => match TemperatureReading::parse_body(body) {
            Ok((_, reading)) => Command::Temperatures(reading),
            Err(_) => Command::Truncated {
                code: Some(code),
                len,
            },
        },
        code => Command::Unknown { code, len },
    }
}
