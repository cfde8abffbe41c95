use comfolib::{Monitor, MonitorError};

#[derive(clap::Args, Debug)]
pub struct MonitorOpts {
    #[command(flatten)]
    port: crate::common::SerialPortArgs,
    #[command(flatten)]
    publish: crate::publish::PublishArgs,

    /// Milliseconds to sleep when there is nothing to read.
    #[arg(long, default_value_t = 10)]
    idle_ms: u64,
}

impl crate::ToolRun for MonitorOpts {
    fn run(&self) -> anyhow::Result<()> {
        let port = self.port.open()?;
        let finite = port.is_finite();
        tracing::info!("listening on {}", self.port.port());

        let idle = std::time::Duration::from_millis(self.idle_ms);
        // every poll gives the publisher a chance to reconnect
        let mut monitor = Monitor::new(port, self.publish.open());
        let res = loop {
            match monitor.poll() {
                Ok(summary) if summary.is_idle() => std::thread::sleep(idle),
                Ok(_) => {}
                Err(MonitorError::SourceClosed { after }) if finite => {
                    tracing::info!("end of input after {} bytes", after);
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };

        let stats = monitor.stats();
        let assembled = monitor.assembler().stats();
        tracing::info!(
            bytes = stats.bytes,
            frames = stats.frames,
            published = stats.published,
            publish_failures = stats.publish_failures,
            unknown = stats.unknown,
            truncated = stats.truncated,
            overflows = assembled.overflows,
            oversized = assembled.oversized,
            "stopped"
        );

        res?;
        Ok(())
    }
}
