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

use crate::{
    reader::Reader, writer::Writer, AcceptArgs, AuthArgs, AuthError, EhloArgs, Error, HeloArgs,
    MailFromArgs, ParseArgsError, RcptToArgs, ReceiverHandler, TlsArgs, Verb,
};
use smtpsub_common::{auth::Mechanism, Stage};
use tokio_rustls::rustls;
use tokio_stream::StreamExt;
extern crate alloc;

enum HandshakeOutcome {
    Message,
    UpgradeTLS {
        config: alloc::sync::Arc<rustls::ServerConfig>,
        handshake_timeout: std::time::Duration,
    },
    Authenticate {
        mechanism: Mechanism,
        initial_response: Option<Vec<u8>>,
    },
    Quit,
}

/// Result of the commands read until the end of a transaction.
enum Step {
    Transaction,
    UpgradeTLS {
        config: alloc::sync::Arc<rustls::ServerConfig>,
        handshake_timeout: std::time::Duration,
    },
    Quit,
}

/// An handle to send event from the [`ReceiverHandler`] to the [`Receiver`].
#[allow(clippy::module_name_repetitions)]
#[derive(Default)]
pub struct ReceiverContext {
    outcome: Option<HandshakeOutcome>,
}

impl ReceiverContext {
    /// Make the [`Receiver`] quit the connection early, and close cleanly.
    #[inline]
    pub fn deny(&mut self) {
        self.outcome = Some(HandshakeOutcome::Quit);
    }

    /// Make the [`Receiver`] initialize a TLS handshake.
    #[inline]
    pub fn upgrade_tls(
        &mut self,
        config: alloc::sync::Arc<rustls::ServerConfig>,
        handshake_timeout: std::time::Duration,
    ) {
        self.outcome = Some(HandshakeOutcome::UpgradeTLS {
            config,
            handshake_timeout,
        });
    }

    /// Make the [`Receiver`] initialize a SASL handshake.
    #[inline]
    pub fn authenticate(&mut self, mechanism: Mechanism, initial_response: Option<Vec<u8>>) {
        self.outcome = Some(HandshakeOutcome::Authenticate {
            mechanism,
            initial_response,
        });
    }
}

/// A SMTP receiver, driving one connection.
pub struct Receiver<
    T: ReceiverHandler + Send,
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
> {
    pub(crate) handler: T,
    pub(crate) writer: Writer<tokio::io::WriteHalf<S>>,
    pub(crate) reader: Reader<tokio::io::ReadHalf<S>>,
    context: ReceiverContext,
    message_size_max: usize,
    read_timeout: std::time::Duration,
    write_timeout: std::time::Duration,
}

impl<T, S> Receiver<T, S>
where
    T: ReceiverHandler + Send,
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    /// Create a new [`Receiver`] from a stream (TCP/IP or in-memory).
    #[inline]
    pub fn new(
        stream: S,
        handler: T,
        message_size_max: usize,
        read_timeout: std::time::Duration,
        write_timeout: std::time::Duration,
    ) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self {
            handler,
            writer: Writer::new(write, write_timeout),
            reader: Reader::new(read, read_timeout),
            context: ReceiverContext::default(),
            message_size_max,
            read_timeout,
            write_timeout,
        }
    }

    /// Handle the inner stream to produce a [`tokio_stream::Stream`], each item
    /// being a successful SMTP transaction.
    ///
    /// The stream ends when the connection is closed, an error being produced
    /// if the closure was not requested by the client.
    #[inline]
    pub fn into_stream(
        mut self,
        args: AcceptArgs,
    ) -> impl tokio_stream::Stream<Item = std::io::Result<()>> {
        async_stream::try_stream! {
            let reply_accept = self.handler.on_accept(&mut self.context, args).await;
            self.writer.send_reply(&reply_accept).await?;

            let produced_context_accept = std::mem::take(&mut self.context);
            if matches!(produced_context_accept.outcome, Some(HandshakeOutcome::Quit)) {
                return;
            }

            loop {
                match self.next_transaction().await? {
                    Step::Transaction => yield (),
                    Step::UpgradeTLS { config, handshake_timeout } => {
                        for await i in self.upgrade_tls(config, handshake_timeout) {
                            yield i?;
                        }
                        return;
                    }
                    Step::Quit => {
                        self.close().await;
                        break;
                    }
                }
            }
        }
    }

    fn upgrade_tls(
        self,
        config: alloc::sync::Arc<rustls::ServerConfig>,
        handshake_timeout: std::time::Duration,
    ) -> impl tokio_stream::Stream<Item = std::io::Result<()>> {
        async_stream::try_stream! {
            if self.reader.has_pending_input() {
                tracing::warn!("Received data before the TLS handshake, closing the connection.");
                return;
            }

            let stream = self.reader.into_inner().unsplit(self.writer.into_inner());
            let acceptor = tokio_rustls::TlsAcceptor::from(config);

            let tls_stream = match tokio::time::timeout(
                handshake_timeout,
                acceptor.accept(stream),
            )
            .await
            {
                Ok(Ok(tls_stream)) => tls_stream,
                Ok(Err(e)) => {
                    tracing::warn!("TLS handshake failed: {e}");
                    return;
                }
                Err(_elapsed) => {
                    tracing::warn!("TLS handshake did not complete after {handshake_timeout:?}");
                    return;
                }
            };

            let tls_connection = tls_stream.get_ref().1;
            let args = TlsArgs {
                sni: tls_connection.sni_hostname().map(str::to_string),
                protocol_version: tls_connection.protocol_version().ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "tls handshake not completed")
                })?,
                cipher_suite: tls_connection
                    .negotiated_cipher_suite()
                    .ok_or_else(|| {
                        std::io::Error::new(std::io::ErrorKind::Other, "tls handshake not completed")
                    })?
                    .suite(),
                peer_certificates: tls_connection
                    .peer_certificates()
                    .map(<[rustls::Certificate]>::to_vec),
            };
            tracing::debug!(
                sni = ?args.sni,
                protocol_version = ?args.protocol_version,
                cipher_suite = ?args.cipher_suite,
                "TLS handshake completed."
            );

            let secured_receiver = Receiver::new(
                tls_stream,
                self.handler,
                self.message_size_max,
                self.read_timeout,
                self.write_timeout,
            )
            .into_secured_stream(args);

            for await i in secured_receiver {
                yield i?;
            }
        }
    }

    fn into_secured_stream(
        mut self,
        args: TlsArgs,
    ) -> impl tokio_stream::Stream<Item = std::io::Result<()>> {
        async_stream::try_stream! {
            self.handler.on_post_tls_handshake(args).await;

            loop {
                match self.next_transaction().await? {
                    Step::Transaction => yield (),
                    Step::UpgradeTLS { .. } => {
                        tracing::warn!("TLS upgrade requested on a secured connection, closing.");
                        break;
                    }
                    Step::Quit => {
                        self.close().await;
                        break;
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!("Failed to shutdown the connection: {e}");
        }
    }

    /// Read and handle the commands until a message has been received, or the
    /// connection must be upgraded or closed.
    async fn next_transaction(&mut self) -> std::io::Result<Step> {
        loop {
            match self.smtp_handshake().await? {
                HandshakeOutcome::Message => {
                    self.receive_message().await?;
                    return Ok(Step::Transaction);
                }
                HandshakeOutcome::UpgradeTLS {
                    config,
                    handshake_timeout,
                } => {
                    return Ok(Step::UpgradeTLS {
                        config,
                        handshake_timeout,
                    })
                }
                HandshakeOutcome::Authenticate {
                    mechanism,
                    initial_response,
                } => {
                    let auth_result = self.authenticate(mechanism, initial_response).await;
                    let auth_result = match auth_result {
                        Err(AuthError::IO(e)) => return Err(e),
                        otherwise => otherwise,
                    };

                    let reply = self
                        .handler
                        .on_post_auth(&mut self.context, auth_result)
                        .await;
                    self.writer.send_reply(&reply).await?;

                    let produced_context = std::mem::take(&mut self.context);
                    if matches!(produced_context.outcome, Some(HandshakeOutcome::Quit)) {
                        return Ok(Step::Quit);
                    }
                }
                HandshakeOutcome::Quit => return Ok(Step::Quit),
            }
        }
    }

    async fn receive_message(&mut self) -> std::io::Result<()> {
        let reply = {
            let message_stream = self
                .reader
                .as_message_stream(self.message_size_max)
                .fuse();
            tokio::pin!(message_stream);

            self.handler
                .on_message(&mut self.context, message_stream)
                .await
        };

        self.reader.drain_message().await?;
        self.writer.send_reply(&reply).await?;

        let produced_context = std::mem::take(&mut self.context);
        if matches!(produced_context.outcome, Some(HandshakeOutcome::Quit)) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                "connection closed by the handler after the message",
            ));
        }
        Ok(())
    }

    /// SMTP handshake (generate the envelope and metadata).
    async fn smtp_handshake(&mut self) -> std::io::Result<HandshakeOutcome> {
        macro_rules! handle_args {
            ($args_output:ty, $args:expr, $on_event:tt) => {
                match <$args_output>::try_from($args) {
                    Ok(args) => self.handler.$on_event(&mut self.context, args).await,
                    Err(e) => self.handler.on_args_error(e).await,
                }
            };
            ($args_output:ty, $args:expr, Option: $on_event:tt) => {
                match <$args_output>::try_from($args) {
                    Ok(args) => self.handler.$on_event(&mut self.context, args).await,
                    Err(e) => Some(self.handler.on_args_error(e).await),
                }
            };
        }

        loop {
            let (verb, args) = match self.reader.read_command().await {
                Ok(Some(command)) => command,
                Ok(None) => {
                    tracing::info!("Connection closed by the client.");
                    return Ok(HandshakeOutcome::Quit);
                }
                Err(Error::BufferTooLong { expected, got }) => {
                    let reply = self
                        .handler
                        .on_args_error(ParseArgsError::BufferTooLong { expected, got })
                        .await;
                    self.writer.send_reply(&reply).await?;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Closing the connection: {e}");
                    return Err(e.into());
                }
            };

            let stage = self.handler.get_stage();
            let reply = match (verb, stage) {
                (Verb::Helo, _) => Some(handle_args!(HeloArgs, args, on_helo)),
                (Verb::Ehlo, _) => Some(handle_args!(EhloArgs, args, on_ehlo)),
                (Verb::Quit, _) => {
                    self.context.outcome = Some(HandshakeOutcome::Quit);
                    Some(self.handler.on_quit().await)
                }
                (Verb::Unknown, _) => Some(self.handler.on_unknown(args.0).await),
                (Verb::Noop, Stage::Helo | Stage::MailFrom | Stage::RcptTo) => {
                    Some(self.handler.on_noop().await)
                }
                (Verb::Rset, Stage::Helo | Stage::MailFrom | Stage::RcptTo) => {
                    Some(self.handler.on_rset().await)
                }
                (Verb::StartTls, Stage::Helo) => {
                    Some(self.handler.on_starttls(&mut self.context).await)
                }
                (Verb::Auth, Stage::Helo) => {
                    handle_args!(AuthArgs, args, Option: on_auth)
                }
                (Verb::MailFrom, Stage::Helo) => {
                    Some(handle_args!(MailFromArgs, args, on_mail_from))
                }
                (Verb::RcptTo, Stage::MailFrom | Stage::RcptTo) => {
                    Some(handle_args!(RcptToArgs, args, on_rcpt_to))
                }
                (Verb::Data, Stage::RcptTo) => {
                    let reply = self.handler.on_data(&mut self.context).await;
                    if reply.code().value() == 354 {
                        self.context.outcome = Some(HandshakeOutcome::Message);
                    }
                    Some(reply)
                }
                otherwise => Some(self.handler.on_bad_sequence(otherwise).await),
            };

            if let Some(reply) = reply {
                self.writer.send_reply(&reply).await?;
            }

            let produced_context = std::mem::take(&mut self.context);
            if let Some(done) = produced_context.outcome {
                return Ok(done);
            }
        }
    }
}
