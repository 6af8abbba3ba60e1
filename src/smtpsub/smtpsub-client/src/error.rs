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

use smtpsub_common::Reply;

/// Failure of a step of the submission.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with an unexpected code.
    #[error("{code}{} {text}", .enhanced.as_ref().map(|e| format!(" {e}")).unwrap_or_default())]
    Reply {
        ///
        code: u16,
        /// Enhanced status code, if the server sent one.
        enhanced: Option<String>,
        /// Lines of the reply, joined with `\n`.
        text: String,
    },
    /// The socket failed.
    #[error(transparent)]
    Io(std::io::Error),
    /// A read or a write did not complete in time.
    #[error("timeout: {0}")]
    Timeout(std::io::Error),
    /// Invalid TLS configuration or failed handshake.
    #[error("tls: {0}")]
    Tls(String),
    /// The server closed the connection, or the connection is unusable after a failure.
    #[error("connection closed by the server")]
    ConnectionClosed,
    /// The server did not advertise the extension required by the step.
    #[error("extension not supported by the server: {0}")]
    ExtensionNotSupported(String),
    /// The credentials would be sent on a clear text channel.
    #[error("refusing to authenticate on a clear text channel")]
    InsecureAuth,
    /// The envelope to submit has no forward path.
    #[error("the envelope has no recipient")]
    NoRecipient,
    /// The server does not follow the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Code of the reply, if the step failed because of the server's answer.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::Reply { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<Reply> for Error {
    fn from(reply: Reply) -> Self {
        Self::Reply {
            code: reply.code().value(),
            enhanced: reply.code().details().map(str::to_string),
            text: reply.text().join("\n"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::TimedOut => Self::Timeout(error),
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset => Self::ConnectionClosed,
            _ => Self::Io(error),
        }
    }
}

impl From<smtpsub_protocol::Error> for Error {
    fn from(error: smtpsub_protocol::Error) -> Self {
        match error {
            smtpsub_protocol::Error::Io(io) => io.into(),
            otherwise => Self::Protocol(otherwise.to_string()),
        }
    }
}
