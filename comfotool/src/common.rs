use std::io::Read;

use comfolib::{ByteSource, READ_CHUNK_SIZE};

#[derive(clap::Args, Debug, Clone)]
pub struct SerialPortArgs {
    #[arg(default_value_t = default_serial_port())]
    port: String,
    #[arg(short, long, default_value_t = comfolib::protocol::BAUD_RATE)]
    baud: u32,
    /// Read from a plain file (or fifo) instead of a serial port.
    #[arg(long)]
    plain_file: bool,
    /// Connect to a TCP serial bridge at host:port.
    #[arg(long)]
    tcp: bool,
}

#[derive(Debug)]
pub enum SerialPort {
    Serial(Box<dyn serialport::SerialPort>),
    File(std::fs::File),
    Tcp(std::net::TcpStream),
}

pub fn default_serial_port() -> String {
    if let Ok(infos) = serialport::available_ports() {
        for info in infos {
            #[cfg(target_os = "macos")]
            if info.port_name.ends_with(".Bluetooth-Incoming-Port") {
                // these ports are almost always *not* what we want
                continue;
            }

            #[cfg(target_os = "macos")]
            if info.port_name.starts_with("/dev/tty.") {
                // macos ports with tty. have flow control we don't use
                // use cu. ports instead!
                continue;
            }

            return info.port_name.clone();
        }
    }

    // not great, but reasonable fallback
    "/dev/ttyUSB0".to_owned()
}

impl SerialPort {
    /// True if running out of data means the input is finished.
    pub fn is_finite(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl embedded_io::ErrorType for SerialPort {
    type Error = std::io::Error;
}

impl ByteSource for SerialPort {
    fn available(&mut self) -> Result<usize, Self::Error> {
        match self {
            Self::Serial(port) => Ok(port.bytes_to_read()? as usize),
            // no way to ask, so read blocks until there is something
            Self::File(_) => Ok(READ_CHUNK_SIZE),
            Self::Tcp(port) => {
                let mut peek = [0u8; READ_CHUNK_SIZE];
                match port.peek(&mut peek) {
                    Ok(0) => Err(std::io::ErrorKind::UnexpectedEof.into()),
                    Ok(n) => Ok(n),
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
                    Err(e) => Err(e),
                }
            }
        }
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self {
            Self::Serial(port) => port.read(buf),
            Self::File(port) => port.read(buf),
            Self::Tcp(port) => port.read(buf),
        }
    }
}

impl SerialPortArgs {
    pub fn open(&self) -> anyhow::Result<SerialPort> {
        if self.tcp {
            let port = std::net::TcpStream::connect(&self.port)?;
            port.set_nonblocking(true)?;
            Ok(SerialPort::Tcp(port))
        } else if self.plain_file {
            let port = std::fs::File::open(&self.port)?;
            Ok(SerialPort::File(port))
        } else {
            // the unit talks 8N1, which is also the serialport default
            let mut port = serialport::new(&self.port, self.baud)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .flow_control(serialport::FlowControl::None)
                .open()?;
            port.set_timeout(std::time::Duration::from_secs(1))?;
            Ok(SerialPort::Serial(port))
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }
}
