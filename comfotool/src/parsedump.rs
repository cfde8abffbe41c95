use comfolib::protocol::{interpret, FrameAssembler, HexBytes};
use comfolib::READ_CHUNK_SIZE;

/// Run a captured byte stream through the frame assembler.
#[derive(clap::Args, Debug)]
pub struct ParseDumpOpts {
    dump: String,
    /// Feed the assembler this many bytes at a time.
    #[arg(long, default_value_t = READ_CHUNK_SIZE)]
    chunk_size: usize,
    /// The dump is hex text, not raw bytes. Whitespace is ignored.
    #[arg(long)]
    hex: bool,
}

impl crate::ToolRun for ParseDumpOpts {
    fn run(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk size must be at least 1");

        let rawdata = if self.hex {
            decode_hex_dump(&std::fs::read_to_string(&self.dump)?)?
        } else {
            std::fs::read(&self.dump)?
        };

        let mut assembler = FrameAssembler::new();
        let mut frames = 0;
        for chunk in rawdata.chunks(self.chunk_size) {
            assembler.ingest_with(chunk, |frame| {
                frames += 1;
                let command = interpret(frame);
                println!("frame {}, {} bytes: {}", frames, frame.len(), HexBytes(frame));
                match command.payload() {
                    Some(payload) => println!("{}", payload),
                    None => println!("{:?}", command),
                }
                println!();
            });
        }

        let stats = assembler.stats();
        eprintln!(
            "{} bytes, {} frames, {} overflows, {} oversized, {} bytes left over",
            rawdata.len(),
            stats.frames,
            stats.overflows,
            stats.oversized,
            assembler.backlog().len(),
        );
        Ok(())
    }
}

/// Decode a hex capture, as written by trace logging or copied from a
/// terminal. Whitespace and line breaks are ignored.
fn decode_hex_dump(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let text: String = text.split_whitespace().collect();
    hex::decode(text)
}
