/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

/// Error while processing the TCP/IP stream.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::exhaustive_enums)]
pub enum Error {
    /// The line is longer than expected, it has been consumed up to its `\r\n`.
    #[error("buffer is not supposed to be longer than {expected} bytes but got {got}")]
    BufferTooLong {
        /// Maximum size expected.
        expected: usize,
        /// Actual size.
        got: usize,
    },
    /// The accumulated body of the message is longer than the configured limit.
    #[error("message is not supposed to be longer than {expected} bytes but got at least {got}")]
    MessageSizeExceeded {
        /// Maximum size expected.
        expected: usize,
        /// Size read when the limit has been exceeded.
        got: usize,
    },
    /// Other IO error, [`std::io::ErrorKind::TimedOut`] when a read or a write did not
    /// complete in time.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Invalid UTF-8.
    #[error("{0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// A reply received by the client is ill-formed.
    #[error("invalid reply: {0}")]
    InvalidReply(String),
}

impl Error {
    /// Is the error produced by a read or a write exceeding its deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::TimedOut)
    }
}

pub(crate) fn timed_out(timeout: std::time::Duration) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("no activity on the stream for {timeout:?}"),
    )
}

impl From<Error> for std::io::Error {
    #[inline]
    fn from(value: Error) -> Self {
        match value {
            Error::Io(io) => io,
            otherwise => Self::new(std::io::ErrorKind::InvalidData, otherwise),
        }
    }
}
