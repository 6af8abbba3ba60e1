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

use crate::{stream::Stream, DataWriter, Error};
use base64::Engine as _;
use smtpsub_common::Reply;
use smtpsub_config::field::{FieldClient, FieldClientEnvelope};
use smtpsub_protocol::{rustls, tokio_rustls, DotStuffer, Reader, Writer};
use tokio::io::{ReadHalf, WriteHalf};

type Io<S> = (Reader<ReadHalf<Stream<S>>>, Writer<WriteHalf<Stream<S>>>);

/// Identity sent with `AUTH PLAIN`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Authorization identity, empty to act as `authcid`.
    pub authzid: String,
    /// Authentication identity.
    pub authcid: String,
    ///
    pub passwd: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("authzid", &self.authzid)
            .field("authcid", &self.authcid)
            .finish_non_exhaustive()
    }
}

/// A message to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Empty for the null reverse path `<>`.
    pub reverse_path: String,
    ///
    pub forward_paths: Vec<String>,
    /// Body of the message, before dot-stuffing.
    pub body: Vec<u8>,
}

impl From<&FieldClientEnvelope> for Envelope {
    fn from(envelope: &FieldClientEnvelope) -> Self {
        Self {
            reverse_path: envelope.reverse_path.clone(),
            forward_paths: envelope.forward_paths.clone(),
            body: envelope.body.as_bytes().to_vec(),
        }
    }
}

/// Properties of the TLS session negotiated by [`Client::starttls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsState {
    ///
    pub protocol_version: rustls::ProtocolVersion,
    ///
    pub cipher_suite: rustls::CipherSuite,
}

/// Client side of a submission conversation.
///
/// Every step verifies the code of the reply and fails with [`Error::Reply`] otherwise.
/// After a transport failure the connection is dropped and the next steps fail with
/// [`Error::ConnectionClosed`].
pub struct Client<S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send> {
    io: Option<Io<S>>,
    client_name: String,
    read_timeout: std::time::Duration,
    write_timeout: std::time::Duration,
    allow_insecure_auth: bool,
    banner: Reply,
    extensions: Option<std::collections::HashMap<String, String>>,
    tls: Option<TlsState>,
}

impl Client<tokio::net::TcpStream> {
    /// Dial `config.addr` and read the banner, both within `config.dial_timeout`.
    ///
    /// # Errors
    ///
    /// * [`Error::Timeout`] if the server is not reachable in time
    /// * see [`Client::new`]
    pub async fn connect(config: &FieldClient) -> Result<Self, Error> {
        let dial = async {
            let stream = tokio::net::TcpStream::connect(&config.addr).await?;
            tracing::debug!(addr = %config.addr, "Connected.");
            Self::new(stream, config).await
        };

        tokio::time::timeout(config.dial_timeout, dial)
            .await
            .map_err(|_elapsed| {
                Error::Timeout(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!(
                        "no banner from '{}' within {:?}",
                        config.addr, config.dial_timeout
                    ),
                ))
            })?
    }
}

impl<S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send> Client<S> {
    /// Start the conversation on an established stream and read the `220` banner.
    ///
    /// # Errors
    ///
    /// * [`Error::Reply`] if the server refused the connection
    /// * [`Error::ConnectionClosed`] if the server closed without a banner
    pub async fn new(stream: S, config: &FieldClient) -> Result<Self, Error> {
        let mut client = Self {
            io: None,
            client_name: config.client_name.clone(),
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            allow_insecure_auth: config.allow_insecure_auth,
            banner: Reply::new(
                smtpsub_common::ReplyCode::Code { code: 220 },
                String::new(),
            ),
            extensions: None,
            tls: None,
        };
        client.install(Stream::Plain(stream));

        client.banner = expect(client.read_reply().await?, &[220])?;
        Ok(client)
    }

    fn install(&mut self, stream: Stream<S>) {
        let (read, write) = tokio::io::split(stream);
        self.io = Some((
            Reader::new(read, self.read_timeout),
            Writer::new(write, self.write_timeout),
        ));
    }

    fn io(&mut self) -> Result<&mut Io<S>, Error> {
        self.io.as_mut().ok_or(Error::ConnectionClosed)
    }

    /// Greeting sent by the server.
    #[must_use]
    pub const fn banner(&self) -> &Reply {
        &self.banner
    }

    /// Parameters of an extension advertised in the last `EHLO` reply, `None` if the
    /// server did not advertise it (or `EHLO` has not been sent yet).
    #[must_use]
    pub fn extension(&self, keyword: &str) -> Option<&str> {
        self.extensions
            .as_ref()?
            .get(&keyword.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// `None` until [`Client::starttls`] succeeds.
    #[must_use]
    pub const fn tls_state(&self) -> Option<&TlsState> {
        self.tls.as_ref()
    }

    pub(crate) async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let (_, writer) = self.io()?;
        if let Err(error) = writer.write_all_bytes(bytes).await {
            self.io = None;
            return Err(error.into());
        }
        Ok(())
    }

    pub(crate) async fn read_reply(&mut self) -> Result<Reply, Error> {
        let (reader, _) = self.io()?;
        match reader.read_reply().await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => {
                self.io = None;
                Err(Error::ConnectionClosed)
            }
            Err(error) => {
                self.io = None;
                Err(error.into())
            }
        }
    }

    async fn command(&mut self, command: &str, expected: &[u16]) -> Result<Reply, Error> {
        tracing::trace!(">> {:?}", command);
        self.write_raw(format!("{command}\r\n").as_bytes()).await?;
        expect(self.read_reply().await?, expected)
    }

    /// Send `EHLO`, falling back to `HELO` if the server does not know it, and
    /// record the extensions advertised.
    ///
    /// # Errors
    ///
    /// * [`Error::Reply`] if both greetings are refused
    pub async fn hello(&mut self) -> Result<(), Error> {
        let ehlo = format!("EHLO {}", self.client_name);
        tracing::trace!(">> {:?}", ehlo);
        self.write_raw(format!("{ehlo}\r\n").as_bytes()).await?;
        let reply = self.read_reply().await?;

        let extensions = match reply.code().value() {
            250 => reply
                .text()
                .iter()
                .skip(1)
                .map(|line| {
                    let (keyword, params) = line.split_once(' ').unwrap_or((line, ""));
                    (keyword.to_ascii_uppercase(), params.to_string())
                })
                .collect(),
            500..=599 => {
                tracing::debug!(reply = reply.as_ref().trim_end(), "EHLO refused, trying HELO.");
                self.command(&format!("HELO {}", self.client_name), &[250])
                    .await?;
                std::collections::HashMap::new()
            }
            _ => return Err(reply.into()),
        };

        tracing::debug!(?extensions, "Server greeted.");
        self.extensions = Some(extensions);
        Ok(())
    }

    async fn ensure_hello(&mut self) -> Result<(), Error> {
        if self.extensions.is_none() {
            self.hello().await?;
        }
        Ok(())
    }

    /// Upgrade the connection with `STARTTLS` and greet the server again.
    ///
    /// # Errors
    ///
    /// * [`Error::ExtensionNotSupported`] if `STARTTLS` is not advertised
    /// * [`Error::Reply`] if the server refused the command, the connection is still usable
    /// * [`Error::Tls`] if the handshake failed, the connection is dropped
    pub async fn starttls(
        &mut self,
        config: std::sync::Arc<rustls::ClientConfig>,
        server_name: &str,
    ) -> Result<(), Error> {
        self.ensure_hello().await?;
        if self.tls.is_some() {
            return Err(Error::Protocol("the connection is already secured".to_string()));
        }
        if self.extension("STARTTLS").is_none() {
            return Err(Error::ExtensionNotSupported("STARTTLS".to_string()));
        }
        let server_name =
            rustls::ServerName::try_from(server_name).map_err(|e| Error::Tls(e.to_string()))?;

        self.command("STARTTLS", &[220]).await?;

        let (reader, writer) = self.io.take().ok_or(Error::ConnectionClosed)?;
        if reader.has_pending_input() {
            return Err(Error::Protocol(
                "data received before the TLS handshake".to_string(),
            ));
        }
        let Stream::Plain(plain) = reader.into_inner().unsplit(writer.into_inner()) else {
            return Err(Error::Protocol("the connection is already secured".to_string()));
        };

        let handshake = tokio_rustls::TlsConnector::from(config).connect(server_name, plain);
        let secured = tokio::time::timeout(self.read_timeout, handshake)
            .await
            .map_err(|_elapsed| {
                Error::Timeout(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "TLS handshake did not complete in time",
                ))
            })?
            .map_err(|e| Error::Tls(e.to_string()))?;

        let (_, connection) = secured.get_ref();
        let state = TlsState {
            protocol_version: connection
                .protocol_version()
                .ok_or_else(|| Error::Tls("no protocol version negotiated".to_string()))?,
            cipher_suite: connection
                .negotiated_cipher_suite()
                .ok_or_else(|| Error::Tls("no cipher suite negotiated".to_string()))?
                .suite(),
        };
        tracing::debug!(?state, "Connection secured.");

        self.install(Stream::Tls(Box::new(secured)));
        self.tls = Some(state);
        self.extensions = None;

        self.hello().await
    }

    /// Authenticate with the `PLAIN` mechanism, the response is sent with the command.
    ///
    /// # Errors
    ///
    /// * [`Error::ExtensionNotSupported`] if `AUTH PLAIN` is not advertised
    /// * [`Error::InsecureAuth`] on a clear text channel, unless allowed by the configuration
    /// * [`Error::Reply`] if the credentials are refused
    pub async fn auth_plain(&mut self, credentials: &Credentials) -> Result<(), Error> {
        self.ensure_hello().await?;

        let supported = self.extension("AUTH").map_or(false, |mechanisms| {
            mechanisms
                .split_ascii_whitespace()
                .any(|m| m.eq_ignore_ascii_case("PLAIN"))
        });
        if !supported {
            return Err(Error::ExtensionNotSupported("AUTH PLAIN".to_string()));
        }
        if self.tls.is_none() && !self.allow_insecure_auth {
            return Err(Error::InsecureAuth);
        }

        let response = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}\0{}\0{}",
            credentials.authzid, credentials.authcid, credentials.passwd
        ));
        tracing::trace!(">> \"AUTH PLAIN ***\"");
        self.write_raw(format!("AUTH PLAIN {response}\r\n").as_bytes())
            .await?;
        expect(self.read_reply().await?, &[235])?;

        tracing::debug!(authcid = %credentials.authcid, "Authenticated.");
        Ok(())
    }

    /// Open a transaction, with `SIZE=` if the hint is set and the server advertises it.
    ///
    /// # Errors
    ///
    /// * [`Error::Reply`] if the reverse path is refused
    pub async fn mail(&mut self, reverse_path: &str, size_hint: Option<usize>) -> Result<(), Error> {
        self.ensure_hello().await?;

        let mut command = format!("MAIL FROM:<{reverse_path}>");
        if let Some(size) = size_hint.filter(|_| self.extension("SIZE").is_some()) {
            command.push_str(" SIZE=");
            command.push_str(&size.to_string());
        }
        self.command(&command, &[250]).await.map(|_| ())
    }

    /// Add a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// * [`Error::Reply`] if the forward path is refused
    pub async fn rcpt(&mut self, forward_path: &str) -> Result<(), Error> {
        self.command(&format!("RCPT TO:<{forward_path}>"), &[250, 251])
            .await
            .map(|_| ())
    }

    /// Start sending the body, which must be completed with [`DataWriter::close`].
    ///
    /// # Errors
    ///
    /// * [`Error::Reply`] if the server does not answer `354`
    pub async fn data(&mut self) -> Result<DataWriter<'_, S>, Error> {
        self.command("DATA", &[354]).await?;
        Ok(DataWriter::new(self))
    }

    /// Abort the transaction in progress.
    ///
    /// # Errors
    ///
    /// * [`Error::Reply`] if the server does not answer `250`
    pub async fn reset(&mut self) -> Result<(), Error> {
        self.command("RSET", &[250]).await.map(|_| ())
    }

    /// # Errors
    ///
    /// * [`Error::Reply`] if the server does not answer `250`
    pub async fn noop(&mut self) -> Result<(), Error> {
        self.command("NOOP", &[250]).await.map(|_| ())
    }

    /// Send `QUIT` and close the connection, whatever the answer.
    ///
    /// # Errors
    ///
    /// * [`Error::Reply`] if the server does not answer `221`
    pub async fn quit(&mut self) -> Result<(), Error> {
        let result = self.command("QUIT", &[221]).await;
        if let Some((_, mut writer)) = self.io.take() {
            if let Err(error) = writer.shutdown().await {
                tracing::debug!(%error, "Failed to shutdown the connection.");
            }
        }
        result.map(|_| ())
    }

    /// Run the whole submission: greeting, `STARTTLS` and `AUTH PLAIN` if requested,
    /// then the transaction and `QUIT`.
    ///
    /// The first failure aborts the conversation, `QUIT` is still attempted.
    ///
    /// # Errors
    ///
    /// * the first step that failed
    pub async fn send_mail(
        &mut self,
        starttls: Option<(std::sync::Arc<rustls::ClientConfig>, &str)>,
        credentials: Option<&Credentials>,
        envelope: &Envelope,
    ) -> Result<(), Error> {
        match self.submit(starttls, credentials, envelope).await {
            Ok(()) => {
                tracing::info!(
                    from = %envelope.reverse_path,
                    to = ?envelope.forward_paths,
                    size = envelope.body.len(),
                    "Message accepted."
                );
                self.quit().await
            }
            Err(error) => {
                tracing::warn!(%error, "Submission failed.");
                if self.io.is_some() {
                    if let Err(quit) = self.quit().await {
                        tracing::debug!(error = %quit, "QUIT failed.");
                    }
                }
                Err(error)
            }
        }
    }

    async fn submit(
        &mut self,
        starttls: Option<(std::sync::Arc<rustls::ClientConfig>, &str)>,
        credentials: Option<&Credentials>,
        envelope: &Envelope,
    ) -> Result<(), Error> {
        if envelope.forward_paths.is_empty() {
            return Err(Error::NoRecipient);
        }

        self.ensure_hello().await?;
        if let Some((config, server_name)) = starttls {
            self.starttls(config, server_name).await?;
        }
        if let Some(credentials) = credentials {
            self.auth_plain(credentials).await?;
        }

        self.mail(
            &envelope.reverse_path,
            Some(DotStuffer::stuffed_len(&envelope.body)),
        )
        .await?;
        for forward_path in &envelope.forward_paths {
            self.rcpt(forward_path).await?;
        }

        let mut data = self.data().await?;
        data.write(&envelope.body).await?;
        data.close().await.map(|_| ())
    }
}

pub(crate) fn expect(reply: Reply, expected: &[u16]) -> Result<Reply, Error> {
    if expected.contains(&reply.code().value()) {
        Ok(reply)
    } else {
        Err(reply.into())
    }
}
