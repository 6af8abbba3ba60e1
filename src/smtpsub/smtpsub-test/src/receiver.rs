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

use smtpsub_config::{get_rustls_config, Config};
use smtpsub_protocol::{rustls, tokio_rustls, AcceptArgs};
use smtpsub_server::{serve_connection, Backend, Handler};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

/// A type implementing Write+Read to emulate sockets
#[derive(Debug)]
pub struct Mock<'a, T: AsRef<[u8]> + Unpin> {
    read_cursor: std::io::Cursor<T>,
    write_cursor: std::io::Cursor<&'a mut Vec<u8>>,
}

impl<'a, T: AsRef<[u8]> + Unpin> Mock<'a, T> {
    /// Create an new instance
    pub fn new(read: T, write: &'a mut Vec<u8>) -> Self {
        Self {
            read_cursor: std::io::Cursor::new(read),
            write_cursor: std::io::Cursor::new(write),
        }
    }
}

impl<T: AsRef<[u8]> + Unpin> tokio::io::AsyncRead for Mock<'_, T> {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.read_cursor).poll_read(cx, buf)
    }
}

impl<T: AsRef<[u8]> + Unpin> tokio::io::AsyncWrite for Mock<'_, T> {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        std::task::Poll::Ready(std::io::Write::write(&mut self.write_cursor, buf))
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(std::io::Write::flush(&mut self.write_cursor))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }
}

/// Addresses of the connections simulated by the harness.
#[must_use]
pub fn accept_args() -> AcceptArgs {
    AcceptArgs {
        client_addr: "127.0.0.1:53844".parse().unwrap(),
        server_addr: "127.0.0.1:53845".parse().unwrap(),
    }
}

/// The [`rustls`] configuration of the server, if TLS is configured.
///
/// # Panics
///
/// * the certificate or the private key is invalid
#[must_use]
pub fn server_tls(config: &Config) -> Option<std::sync::Arc<rustls::ServerConfig>> {
    config
        .server
        .tls
        .as_ref()
        .map(|tls| std::sync::Arc::new(get_rustls_config(tls).unwrap()))
}

/// Run a session on `smtp_input` and assert the replies produced are `expected_output`.
///
/// # Errors
///
/// * the outcome of the session
///
/// # Panics
///
/// * the replies do not match
pub async fn test_receiver_inner<B: Backend>(
    smtp_input: &[u8],
    expected_output: &[u8],
    config: std::sync::Arc<Config>,
    backend: std::sync::Arc<B>,
) -> std::io::Result<()> {
    let mut written_data = Vec::new();
    let mock = Mock::new(smtp_input.to_vec(), &mut written_data);

    let handler = Handler::new(config.clone(), server_tls(&config), backend);
    let result = serve_connection(handler, mock, &config.server.smtp, accept_args()).await;

    pretty_assertions::assert_eq!(
        std::str::from_utf8(expected_output),
        std::str::from_utf8(&written_data),
    );

    result
}

/// Read the replies until the server closes the connection, or the read fails.
async fn read_until_closed<R: tokio::io::AsyncRead + Unpin>(reader: &mut R, out: &mut Vec<u8>) {
    let mut buffer = [0; 1024];
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => out.extend_from_slice(&buffer[..n]),
            Err(error) => {
                tracing::debug!(%error, "Connection closed abruptly.");
                break;
            }
        }
    }
}

/// Run a session on `smtp_input`, upgrade the connection once the server answers
/// `220` to `STARTTLS`, and continue with `secured_input`.
///
/// The replies of both parts must be `expected_output`.
///
/// # Errors
///
/// * the outcome of the session
///
/// # Panics
///
/// * TLS is not configured
/// * the replies do not match
pub async fn test_starttls_inner<B: Backend>(
    smtp_input: &[u8],
    expected_output: &[u8],
    server_name: &str,
    secured_input: &[u8],
    config: std::sync::Arc<Config>,
    backend: std::sync::Arc<B>,
) -> std::io::Result<()> {
    assert!(
        config.server.tls.is_some(),
        "the server must be configured with TLS"
    );

    let (client, server) = tokio::io::duplex(64 * 1024);
    let session = tokio::spawn(async move {
        let handler = Handler::new(config.clone(), server_tls(&config), backend);
        serve_connection(handler, server, &config.server.smtp, accept_args()).await
    });

    let mut client = tokio::io::BufReader::new(client);
    client.write_all(smtp_input).await?;

    let mut output = Vec::new();
    let mut is_banner = true;
    let go_ahead = loop {
        let mut line = String::new();
        if client.read_line(&mut line).await? == 0 {
            break false;
        }
        output.extend_from_slice(line.as_bytes());
        if line.starts_with("220 ") && !is_banner {
            break true;
        }
        is_banner = false;
    };

    if go_ahead {
        let connector = tokio_rustls::TlsConnector::from(std::sync::Arc::new(
            crate::config::client_tls(),
        ));
        let mut secured = connector
            .connect(
                rustls::ServerName::try_from(server_name).unwrap(),
                client.into_inner(),
            )
            .await?;

        secured.write_all(secured_input).await?;
        secured.shutdown().await?;
        read_until_closed(&mut secured, &mut output).await;
    }

    pretty_assertions::assert_eq!(
        std::str::from_utf8(expected_output),
        std::str::from_utf8(&output),
    );

    session.await.unwrap()
}

/// Concatenate the lines of a transcript.
#[must_use]
pub fn concat_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines.iter().map(AsRef::as_ref).collect()
}

/// Run a transcript against the session engine.
///
/// ```ignore
/// run_test! {
///     fn name,
///     input = [ "EHLO client.com\r\n", "QUIT\r\n" ],
///     expected = [ "220 ...\r\n", "250 ...\r\n", "221 ...\r\n" ],
///     starttls = "testserver.com" => [ "EHLO client.com\r\n" ],  // optional
///     config = local_test(),                                       // optional
///     backend = RecordingBackend::new(),                           // optional
/// }
/// ```
///
/// Without `fn name`, the macro expands to the [`std::io::Result`] of the session.
#[macro_export]
macro_rules! run_test {
    (fn $name:ident, $( $rest:tt )*) => {
        #[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
        async fn $name() {
            let result = $crate::run_test!( $( $rest )* );
            result.unwrap();
        }
    };
    (
        input = [ $( $input:expr ),* $(,)? ],
        expected = [ $( $expected:expr ),* $(,)? ],
        starttls = $server_name:expr => [ $( $secured_input:expr ),* $(,)? ]
        $(, config = $config:expr )?
        $(, backend = $backend:expr )?
        $(,)?
    ) => {
        $crate::receiver::test_starttls_inner(
            $crate::receiver::concat_lines(&[ $( $input ),* ]).as_bytes(),
            $crate::receiver::concat_lines(&[ $( $expected ),* ]).as_bytes(),
            $server_name,
            $crate::receiver::concat_lines(&[ $( $secured_input ),* ]).as_bytes(),
            std::sync::Arc::new($crate::run_test!(@config $( $config )?)),
            std::sync::Arc::new($crate::run_test!(@backend $( $backend )?)),
        )
        .await
    };
    (
        input = [ $( $input:expr ),* $(,)? ],
        expected = [ $( $expected:expr ),* $(,)? ]
        $(, config = $config:expr )?
        $(, backend = $backend:expr )?
        $(,)?
    ) => {
        $crate::receiver::test_receiver_inner(
            $crate::receiver::concat_lines(&[ $( $input ),* ]).as_bytes(),
            $crate::receiver::concat_lines(&[ $( $expected ),* ]).as_bytes(),
            std::sync::Arc::new($crate::run_test!(@config $( $config )?)),
            std::sync::Arc::new($crate::run_test!(@backend $( $backend )?)),
        )
        .await
    };
    (@config) => { $crate::config::local_test() };
    (@config $config:expr) => { $config };
    (@backend) => { $crate::recorder::RecordingBackend::new() };
    (@backend $backend:expr) => { $backend };
}
