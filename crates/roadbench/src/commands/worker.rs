//! Worker process entry point

use std::io::{self, BufWriter};

use libroadbench_parallel::serve_job;

use crate::error::Result;

/// Read one job frame from stdin and answer with frames on stdout
pub fn run() -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    serve_job(&mut input, BufWriter::new(io::stdout()))?;
    Ok(())
}
