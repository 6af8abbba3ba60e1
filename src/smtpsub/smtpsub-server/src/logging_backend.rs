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

use crate::{Backend, BackendError, ConnectionState, MailOptions, Session};
use smtpsub_common::auth::Credentials;
use smtpsub_config::{field::FieldAccount, Config};

/// A [`Backend`] accepting the accounts of the configuration, and logging every
/// envelope it receives.
#[derive(Debug, Clone)]
pub struct LoggingBackend {
    accounts: Vec<FieldAccount>,
}

impl LoggingBackend {
    /// Accept the accounts of `server.accounts`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            accounts: config.server.accounts.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Backend for LoggingBackend {
    type Session = LoggingSession;

    async fn login(
        &self,
        state: &ConnectionState,
        credentials: &Credentials,
    ) -> Result<Self::Session, BackendError> {
        if self.accounts.iter().any(|account| {
            account.username == credentials.authid && account.password == credentials.authpass
        }) {
            Ok(LoggingSession {
                username: credentials.authid.clone(),
                client_addr: state.client_addr,
            })
        } else {
            Err(BackendError::Other(anyhow::anyhow!(
                "invalid username or password"
            )))
        }
    }
}

/// Session opened by the [`LoggingBackend`].
#[derive(Debug)]
pub struct LoggingSession {
    username: String,
    client_addr: std::net::SocketAddr,
}

#[async_trait::async_trait]
impl Session for LoggingSession {
    async fn mail(
        &mut self,
        reverse_path: Option<&str>,
        options: &MailOptions,
    ) -> Result<(), BackendError> {
        tracing::info!(
            username = %self.username,
            ?options,
            "Mail from: {}",
            reverse_path.unwrap_or("<>")
        );
        Ok(())
    }

    async fn rcpt(&mut self, forward_path: &str) -> Result<(), BackendError> {
        tracing::info!(username = %self.username, "Rcpt to: {forward_path}");
        Ok(())
    }

    async fn data(
        &mut self,
        reader: &mut (dyn tokio::io::AsyncRead + Send + Unpin),
    ) -> Result<(), BackendError> {
        let mut body = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(reader, &mut body)
            .await
            .map_err(|e| BackendError::Other(e.into()))?;

        tracing::info!(
            username = %self.username,
            "Data: {}",
            String::from_utf8_lossy(&body)
        );
        Ok(())
    }

    async fn reset(&mut self) {}

    async fn logout(&mut self) {
        tracing::debug!(username = %self.username, client = %self.client_addr, "Logout.");
    }
}
