// A tiny error type so we don't rely on anyhow/thiserror.
// Every variant states *where* things went wrong.
use std::fmt::{self, Display};

#[derive(Debug)]
pub enum Error {
    WindowInit(String),   // Creating the window failed
    WindowUpdate(String), // Presenting a frame failed
    InvalidLut(String),   // A LUT atlas has the wrong shape or size
    ImageLoad(String),    // Decoding a plate or atlas image failed
    Pipeline(String),     // A pass was handed buffers it cannot use
    Config(String),       // Bad command line option
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::WindowInit(s) => write!(f, "Window init error: {s}"),
            Error::WindowUpdate(s) => write!(f, "Window update error: {s}"),
            Error::InvalidLut(s) => write!(f, "Invalid LUT: {s}"),
            Error::ImageLoad(s) => write!(f, "Image load error: {s}"),
            Error::Pipeline(s) => write!(f, "Pipeline error: {s}"),
            Error::Config(s) => write!(f, "Config error: {s}"),
        }
    }
}

impl std::error::Error for Error {}

