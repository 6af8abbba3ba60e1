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

use smtpsub_common::{auth::Credentials, Reply};
use smtpsub_server::{Backend, BackendError, ConnectionState, MailOptions, Session};

/// A call received by a [`RecordingBackend`] or one of its sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A session has been opened by `AUTH`.
    Login {
        ///
        authzid: Option<String>,
        ///
        authid: String,
    },
    /// A session has been opened without authentication.
    Anonymous,
    ///
    Mail {
        ///
        reverse_path: Option<String>,
        ///
        options: MailOptions,
    },
    ///
    Rcpt(String),
    /// The body of the message, read entirely.
    Data(Vec<u8>),
    ///
    Reset,
    ///
    Logout,
}

/// A backend accepting the account `username` / `password`, and recording every call.
///
/// The clones share the same records.
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    accounts: Vec<(String, String)>,
    anonymous: bool,
    rejected_rcpt: Vec<(String, Reply)>,
    events: std::sync::Arc<std::sync::Mutex<Vec<Event>>>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    ///
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: vec![("username".to_string(), "password".to_string())],
            anonymous: false,
            rejected_rcpt: vec![],
            events: std::sync::Arc::default(),
        }
    }

    /// Open a session on `MAIL FROM` for the clients which did not authenticate.
    #[must_use]
    pub fn with_anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Refuse the recipient `forward_path` with `reply`.
    #[must_use]
    pub fn with_rejected_rcpt(mut self, forward_path: &str, reply: Reply) -> Self {
        self.rejected_rcpt.push((forward_path.to_string(), reply));
        self
    }

    /// Calls received so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Calls received so far, without [`Event::Logout`], which can be produced
    /// asynchronously when the connection is dropped.
    #[must_use]
    pub fn events_without_logout(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| *e != Event::Logout)
            .collect()
    }

    /// Bodies received so far.
    #[must_use]
    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Data(body) => Some(body),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn session(&self) -> RecordingSession {
        RecordingSession {
            backend: self.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Backend for RecordingBackend {
    type Session = RecordingSession;

    async fn login(
        &self,
        _: &ConnectionState,
        credentials: &Credentials,
    ) -> Result<Self::Session, BackendError> {
        if !self
            .accounts
            .iter()
            .any(|(username, password)| {
                *username == credentials.authid && *password == credentials.authpass
            })
        {
            return Err(anyhow::anyhow!("invalid username or password").into());
        }

        self.push(Event::Login {
            authzid: credentials.authzid.clone(),
            authid: credentials.authid.clone(),
        });
        Ok(self.session())
    }

    async fn anonymous_login(&self, _: &ConnectionState) -> Result<Self::Session, BackendError> {
        if !self.anonymous {
            return Err(BackendError::AuthRequired);
        }
        self.push(Event::Anonymous);
        Ok(self.session())
    }
}

/// Session of a [`RecordingBackend`].
pub struct RecordingSession {
    backend: RecordingBackend,
}

#[async_trait::async_trait]
impl Session for RecordingSession {
    async fn mail(
        &mut self,
        reverse_path: Option<&str>,
        options: &MailOptions,
    ) -> Result<(), BackendError> {
        self.backend.push(Event::Mail {
            reverse_path: reverse_path.map(str::to_string),
            options: options.clone(),
        });
        Ok(())
    }

    async fn rcpt(&mut self, forward_path: &str) -> Result<(), BackendError> {
        if let Some((_, reply)) = self
            .backend
            .rejected_rcpt
            .iter()
            .find(|(rejected, _)| rejected == forward_path)
        {
            return Err(BackendError::Reply(reply.clone()));
        }
        self.backend.push(Event::Rcpt(forward_path.to_string()));
        Ok(())
    }

    async fn data(
        &mut self,
        reader: &mut (dyn tokio::io::AsyncRead + Send + Unpin),
    ) -> Result<(), BackendError> {
        let mut body = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(reader, &mut body)
            .await
            .map_err(anyhow::Error::from)?;

        self.backend.push(Event::Data(body));
        Ok(())
    }

    async fn reset(&mut self) {
        self.backend.push(Event::Reset);
    }

    async fn logout(&mut self) {
        self.backend.push(Event::Logout);
    }
}
