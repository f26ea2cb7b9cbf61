//! Kernel mode — runs one numeric kernel over stdin.
//!
//! This is the worker side of the process runner: the JSON parameters
//! arrive on stdin, the forecast is printed to stdout, and any failure
//! goes to stderr with a non-zero exit status.

use std::io::{Read, Write};

use foresight_predict::kernel;

pub fn run(algorithm: &str) -> anyhow::Result<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;

    let output = kernel::run_algorithm(algorithm, &input)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
