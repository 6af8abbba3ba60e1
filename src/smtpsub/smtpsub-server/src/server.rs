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

use crate::{Backend, Handler};
use anyhow::Context;
use smtpsub_config::{field::FieldServerSMTP, get_rustls_config, Config};
use smtpsub_protocol::{AcceptArgs, Receiver};
use tokio_rustls::rustls;

/// TCP/IP server
pub struct Server<B: Backend> {
    config: std::sync::Arc<Config>,
    tls_config: Option<std::sync::Arc<rustls::ServerConfig>>,
    backend: std::sync::Arc<B>,
}

/// Create a `TCPListener` ready to be listened to
///
/// # Errors
///
/// * failed to bind to the socket address
/// * failed to set the listener to non blocking
pub fn socket_bind_anyhow<A: std::net::ToSocketAddrs + std::fmt::Debug>(
    addr: A,
) -> anyhow::Result<std::net::TcpListener> {
    let socket = std::net::TcpListener::bind(&addr)
        .with_context(|| format!("Failed to bind socket on addr: '{addr:?}'"))?;

    socket
        .set_nonblocking(true)
        .with_context(|| format!("Failed to set non-blocking socket on addr: '{addr:?}'"))?;

    Ok(socket)
}

type ListenerStreamItem = std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)>;

fn listener_to_stream(
    listener: &tokio::net::TcpListener,
) -> impl tokio_stream::Stream<Item = ListenerStreamItem> + '_ {
    async_stream::try_stream! {
        loop {
            let client = listener.accept().await?;
            yield client;
        }
    }
}

/// Drive a SMTP session on `stream` until the client quits or the connection fails.
///
/// # Errors
///
/// * the connection failed (transport error, timeout)
pub async fn serve_connection<B, S>(
    handler: Handler<B>,
    stream: S,
    smtp: &FieldServerSMTP,
    args: AcceptArgs,
) -> std::io::Result<()>
where
    B: Backend,
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    let receiver = Receiver::new(
        stream,
        handler,
        smtp.message_size_limit,
        smtp.read_timeout,
        smtp.write_timeout,
    );

    let transactions = receiver.into_stream(args);
    tokio::pin!(transactions);

    let mut count = 0_usize;
    while let Some(transaction) = tokio_stream::StreamExt::next(&mut transactions).await {
        transaction?;
        count += 1;
        tracing::debug!(count, "Transaction completed.");
    }

    Ok(())
}

impl<B: Backend> Server<B> {
    /// Create a server with the configuration provided.
    ///
    /// # Errors
    ///
    /// * cannot initialize [rustls] config
    pub fn new(config: std::sync::Arc<Config>, backend: std::sync::Arc<B>) -> anyhow::Result<Self> {
        Ok(Self {
            tls_config: if let Some(tls) = &config.server.tls {
                Some(std::sync::Arc::new(get_rustls_config(tls)?))
            } else {
                None
            },
            config,
            backend,
        })
    }

    #[tracing::instrument(name = "handle-client", skip_all, fields(client = %client_addr, server = %server_addr))]
    async fn run_session(
        config: std::sync::Arc<Config>,
        tls_config: Option<std::sync::Arc<rustls::ServerConfig>>,
        backend: std::sync::Arc<B>,
        stream: tokio::net::TcpStream,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
    ) {
        tracing::info!("Connection accepted.");

        let handler = Handler::new(config.clone(), tls_config, backend);
        match serve_connection(
            handler,
            stream,
            &config.server.smtp,
            AcceptArgs {
                client_addr,
                server_addr,
            },
        )
        .await
        {
            Ok(()) => tracing::info!("Connection closed cleanly."),
            Err(error) => tracing::warn!(%error, "Connection closing failure."),
        }
    }

    /// Main loop of the server, accepting connections until `shutdown` completes.
    ///
    /// Once the shutdown is requested the listener is closed, and the sessions in progress
    /// are awaited until they complete or time out.
    ///
    /// # Errors
    ///
    /// * failed to convert the socket to a [`tokio::net::TcpListener`]
    /// * failed to accept a connection
    #[tracing::instrument(name = "serve", skip_all)]
    pub async fn listen_and_serve(
        self,
        socket: std::net::TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send,
    ) -> anyhow::Result<()> {
        let mut sessions = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        let outcome = {
            let listener = tokio::net::TcpListener::from_std(socket)?;
            let server_addr = listener.local_addr()?;
            tracing::info!(interface = %server_addr, "Listening for clients.");

            let accept = listener_to_stream(&listener);
            tokio::pin!(accept);

            loop {
                tokio::select! {
                    biased;
                    () = &mut shutdown => {
                        tracing::info!("Shutdown requested, the listener is closed.");
                        break Ok(());
                    }
                    Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
                    client = tokio_stream::StreamExt::next(&mut accept) => {
                        let (stream, client_addr) = match client {
                            Some(Ok(client)) => client,
                            Some(Err(error)) => {
                                tracing::error!(%error, "Failed to accept a connection.");
                                break Err(anyhow::Error::new(error));
                            }
                            None => break Ok(()),
                        };

                        sessions.spawn(Self::run_session(
                            self.config.clone(),
                            self.tls_config.clone(),
                            self.backend.clone(),
                            stream,
                            client_addr,
                            server_addr,
                        ));
                    }
                }
            }
        };

        if !sessions.is_empty() {
            tracing::info!(count = sessions.len(), "Waiting for the sessions in progress.");
        }
        while sessions.join_next().await.is_some() {}

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::{socket_bind_anyhow, Server};
    use crate::LoggingBackend;
    use smtpsub_config::Config;

    #[tokio::test]
    async fn shutdown_without_client() {
        let config = std::sync::Arc::new(Config::default());
        let server = Server::new(
            config.clone(),
            std::sync::Arc::new(LoggingBackend::from_config(&config)),
        )
        .unwrap();

        let socket = socket_bind_anyhow("127.0.0.1:0").unwrap();
        server
            .listen_and_serve(socket, async {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn greeting_over_tcp() {
        let config = std::sync::Arc::new(Config::default());
        let server = Server::new(
            config.clone(),
            std::sync::Arc::new(LoggingBackend::from_config(&config)),
        )
        .unwrap();

        let socket = socket_bind_anyhow("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(server.listen_and_serve(socket, async move {
            let _ = rx.await;
        }));

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut client, b"QUIT\r\n")
            .await
            .unwrap();

        let mut output = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut client, &mut output)
            .await
            .unwrap();

        pretty_assertions::assert_eq!(
            output,
            "220 localhost Service ready\r\n221 Service closing transmission channel\r\n"
        );

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[test]
    fn bind_twice() {
        let socket = socket_bind_anyhow("127.0.0.1:0").unwrap();
        assert!(socket_bind_anyhow(socket.local_addr().unwrap()).is_err());
    }
}
