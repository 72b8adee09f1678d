use clap::Parser;
use miette::{Diagnostic, Result};
use std::{io::Read, path::PathBuf};
use thiserror::Error;

/// Command line interface of the DQBF solver.
#[derive(Debug, Parser)]
#[command(name = "henkinium", about = "A DQBF solver based on counterexample-guided expansion")]
pub struct Options {
    /// Path to a DQDIMACS file; reads from stdin when omitted.
    pub input: Option<PathBuf>,

    /// Print formula statistics instead of solving.
    #[arg(long)]
    pub info: bool,

    /// Detect equivalent existential variables instead of solving.
    #[arg(long)]
    pub detect_equiv: bool,

    /// Enable verbose (debug) logging.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ArgError {
    #[error("Path {} does not exist", path.display())]
    FileDoesNotExist { path: PathBuf },

    #[error("{} is not a file", path.display())]
    NotAFile { path: PathBuf },

    #[error("Cannot read file {}: {}", path.display(), err)]
    CannotReadFile { path: PathBuf, err: std::io::Error },

    #[error("Cannot read from stdin: {}", err)]
    CannotReadStdIn { err: std::io::Error },
}

/// Loads the input selected by `options`, falling back to stdin.
///
/// # Errors
///
/// Fails if the path does not point to a readable file or stdin cannot be
/// read.
pub fn read_input(options: &Options) -> Result<Vec<u8>> {
    let Some(file_path) = &options.input else {
        tracing::info!("No input file provided, read from stdin");
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .map_err(|err| ArgError::CannotReadStdIn { err })?;
        return Ok(buffer);
    };
    if !file_path.exists() {
        return Err(ArgError::FileDoesNotExist { path: file_path.clone() }.into());
    }
    if !file_path.is_file() {
        return Err(ArgError::NotAFile { path: file_path.clone() }.into());
    }
    let contents = std::fs::read(file_path)
        .map_err(|err| ArgError::CannotReadFile { path: file_path.clone(), err })?;
    Ok(contents)
}
