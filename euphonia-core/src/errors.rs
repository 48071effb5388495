// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error;
use std::fmt;
use std::io;
use std::result;

/// `Error` provides an enumeration of all possible errors reported by Euphonia.
#[derive(Debug)]
pub enum Error {
    /// An IO error occured while reading or writing a stream.
    IoError(std::io::Error),
    /// The stream contained malformed data and could not be decoded.
    DecodeError(&'static str),
    /// A bounded queue had no room for the operation. The operation was fully rejected; the caller
    /// must drain output and retry.
    BufferError(&'static str),
    /// The elementary decoder rejected the fed data, or failed in a way that concealment could not
    /// recover from.
    ProcessError(&'static str),
    /// A parameter or parameter value is outside the supported range. The previously stored value
    /// is left unchanged.
    UnsupportedParam(&'static str),
    /// An allocation required by the operation failed.
    OutOfMemory,
    /// The stream configuration (sample rate or channel count) changed mid-stream. The session
    /// must be flushed or reconstructed before decoding can continue.
    NeedsRestart,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::IoError(ref err) => err.fmt(f),
            Error::DecodeError(msg) => {
                write!(f, "malformed stream: {}", msg)
            }
            Error::BufferError(msg) => {
                write!(f, "insufficient buffer space: {}", msg)
            }
            Error::ProcessError(msg) => {
                write!(f, "processing failed: {}", msg)
            }
            Error::UnsupportedParam(msg) => {
                write!(f, "unsupported parameter: {}", msg)
            }
            Error::OutOfMemory => {
                write!(f, "out of memory")
            }
            Error::NeedsRestart => {
                write!(f, "decoder needs to be restarted")
            }
        }
    }
}

impl std::error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> {
        match *self {
            Error::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a decode error.
pub fn decode_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::DecodeError(desc))
}

/// Convenience function to create a buffer error.
pub fn buffer_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::BufferError(desc))
}

/// Convenience function to create a process error.
pub fn process_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::ProcessError(desc))
}

/// Convenience function to create an unsupported parameter error.
pub fn unsupported_param_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::UnsupportedParam(desc))
}

/// Convenience function to create a restart required error.
pub fn restart_error<T>() -> Result<T> {
    Err(Error::NeedsRestart)
}
