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
    backend::{ConnectionState, SessionGuard},
    Backend, BackendError, MailOptions, Session,
};
use smtpsub_common::{auth::Credentials, CodeID, Reply, Stage};
use smtpsub_config::Config;
use smtpsub_protocol::{
    AcceptArgs, AuthArgs, AuthError, CallbackWrap, EhloArgs, Error, HeloArgs, MailFromArgs,
    ParseArgsError, RcptToArgs, ReceiverContext, TlsArgs, Verb,
};
use tokio_rustls::rustls;

/// The envelope of the transaction in progress.
#[derive(Debug)]
pub(super) struct Envelope {
    pub(super) reverse_path: Option<String>,
    pub(super) forward_paths: Vec<String>,
    pub(super) options: MailOptions,
}

/// Produce the replies of a submission session, and forward the accepted commands
/// to the [`Backend`].
pub struct Handler<B: Backend> {
    pub(super) config: std::sync::Arc<Config>,
    pub(super) rustls_config: Option<std::sync::Arc<rustls::ServerConfig>>,
    pub(super) backend: std::sync::Arc<B>,
    //
    pub(super) stage: Stage,
    /// The last greeting was `EHLO`.
    pub(super) extended: bool,
    pub(super) state: ConnectionState,
    pub(super) authenticated: bool,
    pub(super) session: Option<SessionGuard<B::Session>>,
    pub(super) envelope: Option<Envelope>,
}

impl<B: Backend> Handler<B> {
    /// Create a handler for one connection.
    ///
    /// `STARTTLS` is refused if `rustls_config` is `None`.
    #[must_use]
    pub fn new(
        config: std::sync::Arc<Config>,
        rustls_config: Option<std::sync::Arc<rustls::ServerConfig>>,
        backend: std::sync::Arc<B>,
    ) -> Self {
        Self {
            config,
            rustls_config,
            backend,
            stage: Stage::Connect,
            extended: false,
            state: ConnectionState::default(),
            authenticated: false,
            session: None,
            envelope: None,
        }
    }

    #[allow(clippy::expect_used)]
    pub(super) fn reply_in_config(&self, code: CodeID) -> Reply {
        self.config
            .server
            .smtp
            .codes
            .get(&code)
            .expect("config ill formed")
            .clone()
    }

    pub(super) fn reply_or_code_in_config(
        &self,
        code_or_reply: either::Either<CodeID, Reply>,
    ) -> Reply {
        match code_or_reply {
            either::Left(code) => self.reply_in_config(code),
            either::Right(reply) => reply,
        }
    }

    /// Translate a refusal of the backend, `default` being used for [`BackendError::Other`].
    pub(super) fn backend_error_reply(&self, error: BackendError, default: CodeID) -> Reply {
        let code_or_reply = match error {
            BackendError::Reply(reply) => either::Right(reply),
            BackendError::AuthRequired => either::Left(CodeID::AuthRequired),
            BackendError::Other(error) => {
                tracing::warn!(%error, "Backend failure.");
                either::Left(default)
            }
        };
        self.reply_or_code_in_config(code_or_reply)
    }

    /// Discard the envelope in progress, the backend being notified if a session is opened.
    pub(super) async fn reset_envelope(&mut self) {
        if let Some(envelope) = self.envelope.take() {
            tracing::debug!(?envelope, "Envelope discarded.");
        }
        if let Some(session) = self.session.as_mut().and_then(SessionGuard::get_mut) {
            session.reset().await;
        }
        if self.stage.in_transaction() {
            self.stage = Stage::Helo;
        }
    }

    /// Close the backend session, if any.
    pub(super) async fn logout(&mut self) {
        self.authenticated = false;
        if let Some(session) = self.session.take() {
            session.logout().await;
        }
    }
}

#[async_trait::async_trait]
impl<B: Backend> smtpsub_protocol::ReceiverHandler for Handler<B> {
    fn get_stage(&self) -> Stage {
        self.stage
    }

    fn generate_sasl_callback(&self) -> CallbackWrap {
        self.generate_sasl_callback_inner()
    }

    async fn on_accept(&mut self, ctx: &mut ReceiverContext, args: AcceptArgs) -> Reply {
        self.on_accept_inner(ctx, &args)
    }

    async fn on_starttls(&mut self, ctx: &mut ReceiverContext) -> Reply {
        self.on_starttls_inner(ctx)
    }

    async fn on_post_tls_handshake(&mut self, args: TlsArgs) {
        self.on_post_tls_handshake_inner(args).await;
    }

    async fn on_auth(&mut self, ctx: &mut ReceiverContext, args: AuthArgs) -> Option<Reply> {
        self.on_auth_inner(ctx, args)
    }

    async fn on_post_auth(
        &mut self,
        ctx: &mut ReceiverContext,
        result: Result<Credentials, AuthError>,
    ) -> Reply {
        self.on_post_auth_inner(ctx, result).await
    }

    async fn on_helo(&mut self, ctx: &mut ReceiverContext, args: HeloArgs) -> Reply {
        self.on_helo_inner(ctx, args).await
    }

    async fn on_ehlo(&mut self, ctx: &mut ReceiverContext, args: EhloArgs) -> Reply {
        self.on_ehlo_inner(ctx, args).await
    }

    async fn on_mail_from(&mut self, ctx: &mut ReceiverContext, args: MailFromArgs) -> Reply {
        self.on_mail_from_inner(ctx, args).await
    }

    async fn on_rcpt_to(&mut self, ctx: &mut ReceiverContext, args: RcptToArgs) -> Reply {
        self.on_rcpt_to_inner(ctx, args).await
    }

    async fn on_data(&mut self, _: &mut ReceiverContext) -> Reply {
        self.reply_in_config(CodeID::DataStart)
    }

    async fn on_message(
        &mut self,
        ctx: &mut ReceiverContext,
        stream: impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + Send + Unpin,
    ) -> Reply {
        self.on_message_inner(ctx, stream).await
    }

    async fn on_rset(&mut self) -> Reply {
        self.reset_envelope().await;
        self.reply_in_config(CodeID::Ok)
    }

    async fn on_noop(&mut self) -> Reply {
        self.reply_in_config(CodeID::Ok)
    }

    async fn on_quit(&mut self) -> Reply {
        self.logout().await;
        self.reply_in_config(CodeID::Closing)
    }

    async fn on_unknown(&mut self, buffer: Vec<u8>) -> Reply {
        self.on_unknown_inner(&buffer)
    }

    async fn on_bad_sequence(&mut self, (verb, stage): (Verb, Stage)) -> Reply {
        tracing::debug!(?verb, %stage, "Command out of sequence.");
        self.reply_in_config(CodeID::BadSequence)
    }

    async fn on_args_error(&mut self, error: ParseArgsError) -> Reply {
        self.on_args_error_inner(&error)
    }
}
