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

use smtpsub_common::{auth::Credentials, ClientName, Reply};
use smtpsub_protocol::{MailFromArgs, MimeBodyType, TlsArgs};

/// Properties of the connection known by the server, handed to the [`Backend`]
/// when a session is opened.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    /// Peer address.
    pub client_addr: std::net::SocketAddr,
    /// Local address of the accepted connection.
    pub server_addr: std::net::SocketAddr,
    /// Name announced with `HELO` / `EHLO`, cleared after `STARTTLS`.
    pub client_name: Option<ClientName>,
    /// Properties of the TLS session, once `STARTTLS` has succeeded.
    pub tls: Option<TlsArgs>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        let unspecified = std::net::SocketAddr::from(([0, 0, 0, 0], 0));
        Self {
            client_addr: unspecified,
            server_addr: unspecified,
            client_name: None,
            tls: None,
        }
    }
}

impl ConnectionState {
    /// Is the connection encrypted.
    #[must_use]
    pub const fn is_secured(&self) -> bool {
        self.tls.is_some()
    }
}

/// ESMTP parameters of `MAIL FROM`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailOptions {
    /// Size declared by the client with `SIZE=`.
    pub size: Option<usize>,
    /// Body type declared with `BODY=`.
    pub body: Option<MimeBodyType>,
}

impl From<&MailFromArgs> for MailOptions {
    fn from(args: &MailFromArgs) -> Self {
        Self {
            size: args.size,
            body: args.body,
        }
    }
}

/// Refusal of a [`Backend`] or a [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Reply sent as is to the client.
    #[error("rejected with the reply {0:?}")]
    Reply(Reply),
    /// The session cannot be opened without authentication.
    #[error("authentication required")]
    AuthRequired,
    /// Any other failure, replaced by the default reply of the command.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Entry point of the server toward the application: open a [`Session`] for a connection.
///
/// The same instance is shared by every connection, and can be called concurrently.
#[async_trait::async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Handle of an opened session.
    type Session: Session + 'static;

    /// Called on a successful `AUTH` exchange, the credentials are not verified yet.
    ///
    /// # Errors
    ///
    /// * the credentials are not valid, replied with `535`
    async fn login(
        &self,
        state: &ConnectionState,
        credentials: &Credentials,
    ) -> Result<Self::Session, BackendError>;

    /// Called on `MAIL FROM` when the client did not authenticate.
    ///
    /// # Errors
    ///
    /// * rejected by default with [`BackendError::AuthRequired`]
    async fn anonymous_login(
        &self,
        state: &ConnectionState,
    ) -> Result<Self::Session, BackendError> {
        let _ = state;
        Err(BackendError::AuthRequired)
    }
}

/// Callbacks of the mail transactions of one connection.
///
/// The calls of a session are serialized, and the session is owned by the connection.
#[async_trait::async_trait]
pub trait Session: Send {
    /// A reverse path has been received, `None` being the null reverse path `<>`.
    ///
    /// # Errors
    ///
    /// * the error is sent as the reply to `MAIL FROM`
    async fn mail(
        &mut self,
        reverse_path: Option<&str>,
        options: &MailOptions,
    ) -> Result<(), BackendError>;

    /// A forward path has been received.
    ///
    /// # Errors
    ///
    /// * the error is sent as the reply to `RCPT TO`
    async fn rcpt(&mut self, forward_path: &str) -> Result<(), BackendError>;

    /// The body of the message, read from `reader` until the end of the stream.
    ///
    /// The reader produces the unstuffed body, without the terminating `.<CRLF>`,
    /// and fails if the message is over the limits of the server.
    ///
    /// # Errors
    ///
    /// * the error is sent as the reply to the end of `DATA`
    async fn data(
        &mut self,
        reader: &mut (dyn tokio::io::AsyncRead + Send + Unpin),
    ) -> Result<(), BackendError>;

    /// The envelope in progress is discarded.
    async fn reset(&mut self);

    /// The session is closed, the instance is dropped afterward.
    async fn logout(&mut self);
}

/// Own a [`Session`] and make sure [`Session::logout`] is called once, including
/// when the connection is dropped.
pub(crate) struct SessionGuard<S: Session + 'static> {
    inner: Option<S>,
}

impl<S: Session + 'static> SessionGuard<S> {
    pub(crate) const fn new(session: S) -> Self {
        Self {
            inner: Some(session),
        }
    }

    pub(crate) fn get_mut(&mut self) -> Option<&mut S> {
        self.inner.as_mut()
    }

    pub(crate) async fn logout(mut self) {
        if let Some(mut session) = self.inner.take() {
            session.logout().await;
        }
    }
}

impl<S: Session + 'static> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(mut session) = self.inner.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move { session.logout().await });
                }
                Err(_) => {
                    tracing::warn!("No runtime available, the session is dropped without logout.");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendError, Session, SessionGuard};

    struct Counter(std::sync::Arc<std::sync::atomic::AtomicUsize>);

    #[async_trait::async_trait]
    impl Session for Counter {
        async fn mail(
            &mut self,
            _: Option<&str>,
            _: &super::MailOptions,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn rcpt(&mut self, _: &str) -> Result<(), BackendError> {
            Ok(())
        }

        async fn data(
            &mut self,
            _: &mut (dyn tokio::io::AsyncRead + Send + Unpin),
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn reset(&mut self) {}

        async fn logout(&mut self) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn logout_once() {
        let count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        SessionGuard::new(Counter(count.clone())).logout().await;
        pretty_assertions::assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn logout_on_drop() {
        let count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        drop(SessionGuard::new(Counter(count.clone())));

        for _ in 0..100 {
            if count.load(std::sync::atomic::Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        pretty_assertions::assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
