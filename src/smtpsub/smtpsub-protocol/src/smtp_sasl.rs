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

use crate::{Error, Receiver, ReceiverHandler};
use base64::Engine;
use smtpsub_common::auth::{Credentials, Mechanism};

/// Maximum length of a line sent by the client during the SASL exchange (RFC4954#4).
const SASL_LINE_MAX: usize = 12288;

///
#[repr(transparent)]
#[allow(clippy::exhaustive_structs)]
pub struct CallbackWrap(pub Box<dyn rsasl::callback::SessionCallback + Send + Sync>);

impl rsasl::callback::SessionCallback for CallbackWrap {
    #[inline]
    fn callback(
        &self,
        session_data: &rsasl::callback::SessionData,
        context: &rsasl::callback::Context<'_>,
        request: &mut rsasl::callback::Request<'_>,
    ) -> Result<(), rsasl::prelude::SessionError> {
        self.0.callback(session_data, context, request)
    }

    #[inline]
    fn validate(
        &self,
        session_data: &rsasl::callback::SessionData,
        context: &rsasl::callback::Context<'_>,
        validate: &mut rsasl::validate::Validate<'_>,
    ) -> Result<(), rsasl::validate::ValidationError> {
        self.0.validate(session_data, context, validate)
    }
}

/// The value produced by a successful SASL exchange: the credentials sent by the client,
/// verified afterward by the [`ReceiverHandler`].
#[allow(clippy::exhaustive_structs)]
pub struct CredentialsValidation;

impl rsasl::validate::Validation for CredentialsValidation {
    type Value = Credentials;
}

/// The possible outcomes of a SMTP-SASL handshake.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::exhaustive_enums)]
pub enum AuthError {
    /// [`Verb::Auth`](crate::Verb::Auth) contains an initial buffer where the mechanism is not supposed to.
    #[error("client must not start with this mechanism")]
    ClientMustNotStart,
    /// The authentication has failed.
    #[error("validation failed: {0}")]
    ValidationError(Box<dyn std::error::Error + Send + Sync>),
    /// The client send `*\r\n` during the SASL handshake.
    #[error("sasl challenge cancelled by the client")]
    Canceled,
    /// The buffer sent/received during the SMTP+SASL handshake must be [`base64`] encoded.
    #[error("base64 decoding fail: {source}")]
    Base64 {
        /// Inner error.
        #[from]
        #[source]
        source: base64::DecodeError,
    },
    /// The line received during the handshake is too long.
    #[error("line too long: {0}")]
    LineTooLong(Error),
    /// Error while reading/writing to the underlying stream.
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
    /// Other error produced by the SASL backend.
    #[error("error produced by the backend: {0}")]
    SessionError(rsasl::prelude::SessionError),
    /// Error while initializing the SASL backend.
    #[error("error while initializing the SASL backend: {0}")]
    ConfigError(#[from] rsasl::prelude::SASLError),
}

/// Decode a response of the client, `=` being an empty response (RFC4954#4).
fn decode_response(buffer: &[u8]) -> Result<Vec<u8>, AuthError> {
    match buffer {
        b"*" => Err(AuthError::Canceled),
        b"=" => Ok(vec![]),
        otherwise => Ok(base64::engine::general_purpose::STANDARD.decode(otherwise)?),
    }
}

impl<T, S> Receiver<T, S>
where
    T: ReceiverHandler + Send,
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    async fn next_sasl_response(&mut self) -> Result<Vec<u8>, AuthError> {
        match self.reader.read_line(SASL_LINE_MAX).await {
            Ok(Some(line)) => {
                tracing::trace!("<< {:?}", String::from_utf8_lossy(&line));
                decode_response(line.strip_suffix(b"\r\n").unwrap_or(&line))
            }
            Ok(None) => Err(AuthError::IO(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed during the SASL exchange",
            ))),
            Err(Error::Io(e)) => Err(AuthError::IO(e)),
            Err(otherwise) => Err(AuthError::LineTooLong(otherwise)),
        }
    }

    /// Run the SASL exchange, the challenges being written as `334 <base64>`.
    pub(crate) async fn authenticate(
        &mut self,
        mechanism: Mechanism,
        initial_response: Option<Vec<u8>>,
    ) -> Result<Credentials, AuthError> {
        let callback = self.handler.generate_sasl_callback();

        let rsasl_config = rsasl::config::SASLConfig::builder()
            .with_default_mechanisms()
            .with_callback(callback)?;

        let sasl_server = rsasl::prelude::SASLServer::<CredentialsValidation>::new(rsasl_config);

        #[allow(clippy::expect_used)]
        let selected = rsasl::prelude::Mechname::parse(mechanism.as_ref().as_bytes())
            .expect("mechanism is valid");
        let mut session = sasl_server.start_suggested(selected)?;

        let mut data = match (initial_response, session.are_we_first()) {
            (None, true) => None,
            (None, false) => {
                self.writer.write_all("334 \r\n").await?;
                Some(self.next_sasl_response().await?)
            }
            (Some(_), true) => return Err(AuthError::ClientMustNotStart),
            (Some(data), false) => Some(decode_response(&data)?),
        };

        loop {
            let mut challenge = Vec::new();

            #[allow(clippy::wildcard_enum_match_arm)]
            let state = session
                .step(data.as_deref(), &mut challenge)
                .map_err(|e| match e {
                    rsasl::prelude::SessionError::ValidationError(
                        rsasl::validate::ValidationError::Boxed(e),
                    ) => AuthError::ValidationError(e),
                    otherwise => AuthError::SessionError(otherwise),
                })?;

            if !state.is_running() {
                break;
            }

            self.writer
                .write_all(&format!(
                    "334 {}\r\n",
                    base64::engine::general_purpose::STANDARD.encode(&challenge)
                ))
                .await?;
            data = Some(self.next_sasl_response().await?);
        }

        session.validation().ok_or_else(|| {
            AuthError::ValidationError("the exchange did not produce any credentials".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_response, AuthError};

    #[rstest::rstest]
    #[case(b"AHVzZXJuYW1lAHBhc3N3b3Jk", b"\0username\0password")]
    #[case(b"=", b"")]
    fn decode(#[case] input: &[u8], #[case] expected: &[u8]) {
        pretty_assertions::assert_eq!(decode_response(input).unwrap(), expected);
    }

    #[test]
    fn decode_error() {
        assert!(matches!(decode_response(b"*"), Err(AuthError::Canceled)));
        assert!(matches!(
            decode_response(b"not base64!"),
            Err(AuthError::Base64 { .. })
        ));
    }
}
