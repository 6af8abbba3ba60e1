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

use smtpsub_protocol::Error;

/// An [`tokio::io::AsyncRead`] over the lines of the message produced by the
/// [`Receiver`](smtpsub_protocol::Receiver), handed to [`Session::data`](crate::Session::data).
///
/// The first error of the stream (line too long, message too big, transport failure)
/// is kept and returned again by every subsequent read.
pub struct MessageReader<S> {
    stream: S,
    chunk: Vec<u8>,
    position: usize,
    size: usize,
    error: Option<Error>,
    ended: bool,
}

fn to_io_error(error: &Error) -> std::io::Error {
    let kind = match error {
        Error::Io(e) => e.kind(),
        _ => std::io::ErrorKind::InvalidData,
    };
    std::io::Error::new(kind, error.to_string())
}

impl<S> MessageReader<S>
where
    S: tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + Unpin,
{
    /// Wrap the stream of lines.
    pub const fn new(stream: S) -> Self {
        Self {
            stream,
            chunk: Vec::new(),
            position: 0,
            size: 0,
            error: None,
            ended: false,
        }
    }

    /// Number of bytes received from the stream so far.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Read the rest of the stream, the lines being discarded.
    pub async fn consume_remaining(&mut self) {
        while !self.ended && self.error.is_none() {
            match tokio_stream::StreamExt::next(&mut self.stream).await {
                Some(Ok(line)) => self.size += line.len(),
                Some(Err(e)) => self.error = Some(e),
                None => self.ended = true,
            }
        }
        self.chunk.clear();
        self.position = 0;
    }

    /// Take the error which ended the stream, if any.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}

impl<S> tokio::io::AsyncRead for MessageReader<S>
where
    S: tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + Unpin,
{
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        loop {
            if self.position < self.chunk.len() {
                let count = std::cmp::min(buf.remaining(), self.chunk.len() - self.position);
                let start = self.position;
                buf.put_slice(&self.chunk[start..start + count]);
                self.position += count;
                return std::task::Poll::Ready(Ok(()));
            }

            if let Some(error) = &self.error {
                return std::task::Poll::Ready(Err(to_io_error(error)));
            }
            if self.ended {
                return std::task::Poll::Ready(Ok(()));
            }

            match std::task::ready!(tokio_stream::Stream::poll_next(
                std::pin::Pin::new(&mut self.stream),
                cx
            )) {
                Some(Ok(line)) => {
                    self.size += line.len();
                    self.chunk = line;
                    self.position = 0;
                }
                Some(Err(e)) => self.error = Some(e),
                None => self.ended = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MessageReader;
    use smtpsub_protocol::Error;
    use tokio::io::AsyncReadExt;

    fn lines(
        input: Vec<Result<&'static str, Error>>,
    ) -> impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + Unpin {
        tokio_stream::iter(
            input
                .into_iter()
                .map(|line| line.map(|l| l.as_bytes().to_vec()))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn read_whole_body() {
        let mut reader = MessageReader::new(lines(vec![Ok(".leading\r\n"), Ok(".double\r\n")]));
        let mut body = String::new();
        reader.read_to_string(&mut body).await.unwrap();

        pretty_assertions::assert_eq!(body, ".leading\r\n.double\r\n");
        pretty_assertions::assert_eq!(reader.size(), body.len());
        assert!(reader.take_error().is_none());
    }

    #[tokio::test]
    async fn small_buffer() {
        let mut reader = MessageReader::new(lines(vec![Ok("0123456789\r\n")]));
        let mut buffer = [0; 4];
        let mut body = vec![];
        loop {
            let read = reader.read(&mut buffer).await.unwrap();
            if read == 0 {
                break;
            }
            body.extend_from_slice(&buffer[..read]);
        }
        pretty_assertions::assert_eq!(body, b"0123456789\r\n");
    }

    #[tokio::test]
    async fn error_is_sticky() {
        let mut reader = MessageReader::new(lines(vec![
            Ok("0123456789\r\n"),
            Err(Error::MessageSizeExceeded {
                expected: 10,
                got: 12,
            }),
        ]));

        let mut body = vec![];
        let error = reader.read_to_end(&mut body).await.unwrap_err();
        pretty_assertions::assert_eq!(error.kind(), std::io::ErrorKind::InvalidData);
        assert!(reader.read_to_end(&mut body).await.is_err());

        assert!(matches!(
            reader.take_error(),
            Some(Error::MessageSizeExceeded { expected: 10, got: 12 })
        ));
    }

    #[tokio::test]
    async fn consume_without_reading() {
        let mut reader = MessageReader::new(lines(vec![
            Ok("first\r\n"),
            Ok("second\r\n"),
            Err(Error::BufferTooLong {
                expected: 1000,
                got: 1200,
            }),
            Ok("never read\r\n"),
        ]));
        reader.consume_remaining().await;

        pretty_assertions::assert_eq!(reader.size(), "first\r\nsecond\r\n".len());
        assert!(matches!(
            reader.take_error(),
            Some(Error::BufferTooLong { .. })
        ));
    }
}
