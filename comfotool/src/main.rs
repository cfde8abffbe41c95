use clap::{Parser, Subcommand};

mod common;
mod monitor;
mod parsedump;
mod publish;

trait ToolRun {
    fn run(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Listen to a ComfoAir ventilation unit and publish what it says.
#[derive(Parser, Debug)]
#[command(version, about)]
struct ToolOptions {
    /// Log more. Repeat for even more.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,

    #[command(subcommand)]
    command: ToolCommand,
}

#[derive(Subcommand, Debug)]
enum ToolCommand {
    /// Read frames from a serial port and publish temperatures.
    Monitor(monitor::MonitorOpts),
    /// Parse a captured stream from a file.
    ParseDump(parsedump::ParseDumpOpts),
}

impl ToolRun for ToolCommand {
    fn run(&self) -> anyhow::Result<()> {
        use ToolCommand::*;
        match self {
            Monitor(o) => o.run(),
            ParseDump(o) => o.run(),
        }
    }
}

fn init_logging(debug: u8) {
    let default = match debug {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let opts = ToolOptions::parse();
    init_logging(opts.debug);
    opts.command.run()
}
