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

use crate::{client::expect, Client, Error};
use smtpsub_common::Reply;
use smtpsub_protocol::DotStuffer;

/// Body of a message being sent after `DATA`.
///
/// Lines starting with a `.` are doubled, so the end of data indication cannot
/// appear in the content. The body must be completed with [`DataWriter::close`],
/// dropping the writer leaves the connection in the middle of the message.
pub struct DataWriter<'client, S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send> {
    client: &'client mut Client<S>,
    stuffer: DotStuffer,
    buffer: Vec<u8>,
}

impl<'client, S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send>
    DataWriter<'client, S>
{
    pub(crate) fn new(client: &'client mut Client<S>) -> Self {
        Self {
            client,
            stuffer: DotStuffer::new(),
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Send a part of the body, lines can be split across calls.
    ///
    /// # Errors
    ///
    /// * the connection failed, it cannot be used anymore
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), Error> {
        self.buffer.clear();
        self.stuffer.stuff(chunk, &mut self.buffer);
        self.client.write_raw(&self.buffer).await
    }

    /// Terminate the body with `<CRLF>.<CRLF>` and wait for the server's verdict.
    ///
    /// # Errors
    ///
    /// * [`Error::Reply`] if the message has been refused
    pub async fn close(mut self) -> Result<Reply, Error> {
        self.buffer.clear();
        self.stuffer.finish(&mut self.buffer);
        self.client.write_raw(&self.buffer).await?;

        expect(self.client.read_reply().await?, &[250])
    }
}
