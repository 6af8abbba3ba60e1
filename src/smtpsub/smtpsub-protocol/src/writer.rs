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

use crate::error::timed_out;
use smtpsub_common::Reply;
use tokio::io::AsyncWriteExt;

/// Sink for sending reply to the client, or commands to the server.
pub struct Writer<W: tokio::io::AsyncWrite + Unpin + Send> {
    inner: W,
    timeout: std::time::Duration,
}

impl<W: tokio::io::AsyncWrite + Unpin + Send> AsMut<W> for Writer<W> {
    #[inline]
    fn as_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

impl<W: tokio::io::AsyncWrite + Unpin + Send> Writer<W> {
    /// Create a new instance, every write must complete before `timeout`.
    #[inline]
    #[must_use]
    pub const fn new(inner: W, timeout: std::time::Duration) -> Self {
        Self { inner, timeout }
    }

    /// Consume the instance and return the underlying writer.
    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Send the buffer to the peer.
    ///
    /// # Errors
    ///
    /// * [`std::io::Error`] produced by the underlying writer
    /// * [`std::io::ErrorKind::TimedOut`] if the write did not complete in time
    #[inline]
    pub async fn write_all(&mut self, buffer: &str) -> std::io::Result<()> {
        tracing::trace!(">> {:?}", buffer);
        self.write_all_bytes(buffer.as_bytes()).await
    }

    /// Send the buffer to the peer, and flush the underlying writer.
    ///
    /// # Errors
    ///
    /// * [`std::io::Error`] produced by the underlying writer
    /// * [`std::io::ErrorKind::TimedOut`] if the write did not complete in time
    #[inline]
    pub async fn write_all_bytes(&mut self, buffer: &[u8]) -> std::io::Result<()> {
        let inner = &mut self.inner;
        match tokio::time::timeout(self.timeout, async move {
            inner.write_all(buffer).await?;
            inner.flush().await
        })
        .await
        {
            Ok(written) => written,
            Err(_elapsed) => Err(timed_out(self.timeout)),
        }
    }

    /// Send a reply to the client.
    ///
    /// # Errors
    ///
    /// * see [`Writer::write_all`]
    #[inline]
    pub async fn send_reply(&mut self, reply: &Reply) -> std::io::Result<()> {
        if reply.code().is_error() {
            tracing::debug!(reply = reply.as_ref().trim_end(), "Sending error reply.");
        }
        self.write_all(reply.as_ref()).await
    }

    /// Shutdown the write side of the underlying stream.
    ///
    /// # Errors
    ///
    /// * see [`Writer::write_all`]
    #[inline]
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        match tokio::time::timeout(self.timeout, self.inner.shutdown()).await {
            Ok(done) => done,
            Err(_elapsed) => Err(timed_out(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Writer;
    use smtpsub_common::{Reply, ReplyCode};

    #[tokio::test]
    async fn send_reply() {
        let mut output = vec![];
        let mut writer = Writer::new(&mut output, std::time::Duration::from_secs(1));

        writer
            .send_reply(&Reply::with_lines(
                ReplyCode::Code { code: 250 },
                vec!["localhost".to_string(), "SIZE 10".to_string()],
            ))
            .await
            .unwrap();
        writer.write_all("QUIT\r\n").await.unwrap();

        pretty_assertions::assert_eq!(
            std::str::from_utf8(&output).unwrap(),
            "250-localhost\r\n250 SIZE 10\r\nQUIT\r\n"
        );
    }

    #[tokio::test]
    async fn write_timeout() {
        let (_client, server) = tokio::io::duplex(8);
        let mut writer = Writer::new(server, std::time::Duration::from_millis(50));

        let error = writer.write_all("a buffer larger than 8 bytes").await.unwrap_err();
        pretty_assertions::assert_eq!(error.kind(), std::io::ErrorKind::TimedOut);
    }
}
