use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use log::error;
use structopt::StructOpt;

use streaming_inflate_rs::gzip;

#[derive(StructOpt)]
struct GzipParams {
    input: PathBuf,
    output: Option<PathBuf>,
    /// Decompress and discard the output, to measure throughput without I/O.
    #[structopt(short)]
    simulate: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let params: GzipParams = GzipParams::from_args();

    let compressed = match fs::read(&params.input) {
        Ok(data) => data,
        Err(err) => {
            error!("couldn't read {}: {err}", params.input.display());
            return ExitCode::FAILURE;
        }
    };

    let decompressed = match gzip::decompress(&compressed) {
        Ok(data) => data,
        Err(err) => {
            error!("{} is not a valid gzip stream: {err}", params.input.display());
            return ExitCode::FAILURE;
        }
    };

    if params.simulate {
        return ExitCode::SUCCESS;
    }

    let write_result = match params.output {
        Some(path) => fs::write(path, decompressed),
        None => io::stdout().write_all(&decompressed),
    };

    match write_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("failed to write output: {err}");
            ExitCode::FAILURE
        }
    }
}
