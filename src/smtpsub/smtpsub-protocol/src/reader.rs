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

use crate::{command::Command, error::timed_out, Error, UnparsedArgs, Verb};
use bytes::Buf;
use tokio::io::AsyncReadExt;
use smtpsub_common::Reply;

/// Maximum length of a command line, `\r\n` included (RFC5321#4.5.3.1.4).
pub const COMMAND_LINE_MAX: usize = 1000;
/// Maximum length of a line of the message once unstuffed, `\r\n` included
/// (RFC5321#4.5.3.1.6).
pub const MESSAGE_LINE_MAX: usize = 1000;
/// Maximum length of a reply line accepted by the client.
pub const REPLY_LINE_MAX: usize = 1000;

fn find(bytes: &[u8], search: &[u8]) -> Option<usize> {
    bytes
        .windows(search.len())
        .position(|window| window == search)
}

/// Stream for reading commands from the client, or replies from the server.
///
/// The bytes received but not consumed yet are kept between calls, so the
/// lines pipelined by the peer are not lost when switching from one kind of
/// stream to another.
pub struct Reader<R: tokio::io::AsyncRead + Unpin + Send> {
    inner: R,
    buffer: bytes::BytesMut,
    timeout: std::time::Duration,
    additional_reserve: usize,
    message_terminated: bool,
    broken: bool,
}

impl<R: tokio::io::AsyncRead + Unpin + Send> Reader<R> {
    /// Create a new stream, every read must complete before `timeout`.
    #[must_use]
    #[inline]
    pub fn new(inner: R, timeout: std::time::Duration) -> Self {
        Self {
            inner,
            buffer: bytes::BytesMut::with_capacity(80),
            timeout,
            additional_reserve: 100,
            message_terminated: true,
            broken: false,
        }
    }

    /// Consume the instance and return the underlying reader.
    ///
    /// The bytes buffered but not consumed are lost, see [`Reader::has_pending_input`].
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Some bytes have been received but not consumed yet.
    #[inline]
    #[must_use]
    pub fn has_pending_input(&self) -> bool {
        !self.buffer.is_empty()
    }

    async fn fill_buf(&mut self) -> std::io::Result<usize> {
        self.buffer.reserve(self.additional_reserve);
        let read = match tokio::time::timeout(self.timeout, self.inner.read_buf(&mut self.buffer))
            .await
        {
            Ok(read) => read,
            Err(_elapsed) => Err(timed_out(self.timeout)),
        };
        if read.is_err() {
            self.broken = true;
        }
        read
    }

    /// Read a "\r\n" terminated line of at most `max` bytes (`\r\n` included).
    ///
    /// A longer line is consumed entirely and produces [`Error::BufferTooLong`],
    /// the reader can still be used afterward.
    ///
    /// # Returns
    ///
    /// * `None` if the peer closed the connection, an unterminated line is discarded
    ///
    /// # Errors
    ///
    /// * [`Error::BufferTooLong`]
    /// * [`Error::Io`] produced by the underlying reader, or a timeout
    pub async fn read_line(&mut self, max: usize) -> Result<Option<Vec<u8>>, Error> {
        let mut discarded = 0;
        let mut searched = 0;

        loop {
            if let Some(pos) = find(&self.buffer[searched..], b"\r\n") {
                let line = self.buffer.split_to(searched + pos + 2);
                let got = discarded + line.len();
                if got > max {
                    return Err(Error::BufferTooLong { expected: max, got });
                }
                return Ok(Some(line.to_vec()));
            }

            if self.buffer.len() > max {
                // the last byte may be the '\r' of the terminator
                let drop = self.buffer.len() - 1;
                discarded += drop;
                self.buffer.advance(drop);
                searched = 0;
            } else {
                searched = self.buffer.len().saturating_sub(1);
            }

            if self.fill_buf().await? == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        "connection closed with an unterminated line: {:?}",
                        String::from_utf8_lossy(&self.buffer)
                    );
                    self.buffer.clear();
                }
                return Ok(None);
            }
        }
    }

    /// Read the next command.
    ///
    /// # Errors
    ///
    /// * see [`Reader::read_line`]
    pub async fn read_command(&mut self) -> Result<Option<Command<Verb, UnparsedArgs>>, Error> {
        let line = match self.read_line(COMMAND_LINE_MAX).await? {
            Some(line) => line,
            None => return Ok(None),
        };
        tracing::trace!("<< {:?}", String::from_utf8_lossy(&line));

        Ok(Some(Verb::parse_line(&line)))
    }

    /// Read the next (possibly multi-line) reply.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidReply`] if the lines cannot be folded into a [`Reply`]
    /// * see [`Reader::read_line`]
    pub async fn read_reply(&mut self) -> Result<Option<Reply>, Error> {
        let mut next_reply = Vec::with_capacity(512);

        loop {
            let line = match self.read_line(REPLY_LINE_MAX).await? {
                Some(line) => line,
                None if next_reply.is_empty() => return Ok(None),
                None => {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "connection closed in the middle of a reply",
                    )))
                }
            };

            next_reply.extend_from_slice(&line);
            if line.get(3) != Some(&b'-') {
                break;
            }
        }

        let next_reply = std::str::from_utf8(&next_reply)?;
        tracing::trace!("<< {:?}", next_reply);

        <Reply as std::str::FromStr>::from_str(next_reply)
            .map(Some)
            .map_err(|e| Error::InvalidReply(format!("{next_reply:?}: {e}")))
    }

    /// Produce a stream of lines to generate IMF compliant messages.
    ///
    /// The leading dot of each line is removed, and the stream ends on the line `.\r\n`.
    /// The first error ends the stream, the rest of the message can be discarded with
    /// [`Reader::drain_message`].
    #[inline]
    pub fn as_message_stream(
        &mut self,
        size_limit: usize,
    ) -> impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + '_ {
        async_stream::stream! {
            self.message_terminated = false;
            let mut size = 0;

            loop {
                // one more byte for the dot-stuffing
                let line = match self.read_line(MESSAGE_LINE_MAX + 1).await {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        yield Err(Error::Io(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "connection closed in the middle of a message",
                        )));
                        return;
                    }
                    Err(Error::BufferTooLong { got, .. }) => {
                        yield Err(Error::BufferTooLong { expected: MESSAGE_LINE_MAX, got });
                        return;
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                tracing::trace!("<< {:?}", String::from_utf8_lossy(&line));

                if line == b".\r\n" {
                    self.message_terminated = true;
                    return;
                }

                let line = match line.strip_prefix(b".") {
                    Some(unstuffed) => unstuffed.to_vec(),
                    None => line,
                };

                if line.len() > MESSAGE_LINE_MAX {
                    yield Err(Error::BufferTooLong { expected: MESSAGE_LINE_MAX, got: line.len() });
                    return;
                }

                size += line.len();
                if size > size_limit {
                    yield Err(Error::MessageSizeExceeded { expected: size_limit, got: size });
                    return;
                }

                yield Ok(line);
            }
        }
    }

    /// Discard the remaining lines of the message being read, up to and including
    /// the line `.\r\n`. Does nothing if the message has been read entirely.
    ///
    /// # Errors
    ///
    /// * the underlying reader failed previously, or fails while draining
    /// * the peer closed the connection before the end of the message
    pub async fn drain_message(&mut self) -> Result<(), Error> {
        if self.broken {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "the stream failed while reading the message",
            )));
        }

        while !self.message_terminated {
            match self.read_line(MESSAGE_LINE_MAX + 1).await {
                Ok(Some(line)) if line == b".\r\n" => self.message_terminated = true,
                Ok(Some(_)) | Err(Error::BufferTooLong { .. }) => {}
                Ok(None) => {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "connection closed in the middle of a message",
                    )))
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
