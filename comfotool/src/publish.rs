use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use comfolib::Publish;

/// Sent on the system topic whenever a publisher (re)connects.
pub const CONNECTION_OK: &str = "command=00 status=1";

/// Longest a connection attempt may hold up the parser. The serial
/// driver keeps buffering meanwhile.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(clap::Args, Debug, Clone)]
pub struct PublishArgs {
    /// Send `topic payload` lines to host:port instead of stdout.
    #[arg(long)]
    publish: Option<String>,
    #[arg(long, default_value = "smarthome/ventilation/zehnder450D/data")]
    data_topic: String,
    #[arg(long, default_value = "smarthome/ventilation/zehnder450D/system")]
    system_topic: String,
    /// Seconds between reconnect attempts.
    #[arg(long, default_value_t = 5)]
    reconnect: u64,
}

impl PublishArgs {
    pub fn open(&self) -> Publisher {
        match self.publish {
            Some(ref addr) => Publisher::Tcp(TcpPublisher::new(
                addr.clone(),
                self.data_topic.clone(),
                self.system_topic.clone(),
                Duration::from_secs(self.reconnect),
            )),
            None => {
                println!("{} {}", self.system_topic, CONNECTION_OK);
                Publisher::Stdout {
                    data_topic: self.data_topic.clone(),
                }
            }
        }
    }
}

#[derive(Debug)]
pub enum Publisher {
    Stdout { data_topic: String },
    Tcp(TcpPublisher),
}

impl Publish for Publisher {
    type Error = std::io::Error;

    fn publish(&mut self, payload: &dyn std::fmt::Display) -> Result<(), Self::Error> {
        match self {
            Self::Stdout { data_topic } => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{} {}", data_topic, payload)?;
                stdout.flush()
            }
            Self::Tcp(p) => p.publish(payload),
        }
    }

    fn maintain(&mut self) {
        if let Self::Tcp(p) = self {
            p.maintain();
        }
    }
}

/// Writes `topic payload` lines to a TCP peer, reconnecting at most
/// once per retry interval.
///
/// While disconnected, payloads are dropped.
#[derive(Debug)]
pub struct TcpPublisher {
    addr: String,
    data_topic: String,
    system_topic: String,
    retry: Duration,
    stream: Option<std::io::BufWriter<TcpStream>>,
    last_attempt: Option<Instant>,
}

impl TcpPublisher {
    pub fn new(addr: String, data_topic: String, system_topic: String, retry: Duration) -> Self {
        Self {
            addr,
            data_topic,
            system_topic,
            retry,
            stream: None,
            last_attempt: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Reconnect if disconnected and the retry interval has passed.
    pub fn maintain(&mut self) {
        if self.is_connected() {
            return;
        }

        if let Some(last) = self.last_attempt {
            if last.elapsed() < self.retry {
                return;
            }
        }
        self.last_attempt = Some(Instant::now());

        tracing::info!("connecting to {}...", self.addr);
        match self.connect() {
            Ok(()) => tracing::info!("connected to {}", self.addr),
            Err(e) => {
                tracing::warn!("failed to connect to {}: {}", self.addr, e);
                self.stream = None;
            }
        }
    }

    fn connect(&mut self) -> std::io::Result<()> {
        let addr = self
            .addr
            .to_socket_addrs()?
            .next()
            .ok_or(std::io::ErrorKind::AddrNotAvailable)?;

        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        stream.set_nodelay(true)?;
        let stream = self.stream.insert(std::io::BufWriter::new(stream));

        // once connected, announce ourselves
        writeln!(stream, "{} {}", self.system_topic, CONNECTION_OK)?;
        stream.flush()
    }
}

impl Publish for TcpPublisher {
    type Error = std::io::Error;

    fn publish(&mut self, payload: &dyn std::fmt::Display) -> Result<(), Self::Error> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(std::io::ErrorKind::NotConnected.into());
        };

        let res = writeln!(stream, "{} {}", self.data_topic, payload).and_then(|_| stream.flush());
        if res.is_err() {
            // drop it, maintain() will reconnect
            self.stream = None;
        }
        res
    }

    fn maintain(&mut self) {
        TcpPublisher::maintain(self)
    }
}
