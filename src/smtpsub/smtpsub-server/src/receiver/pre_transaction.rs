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

use super::{handler::Handler, rsasl_callback::CredentialsCallback};
use crate::{backend::SessionGuard, Backend, BackendError};
use smtpsub_common::{auth::Credentials, ClientName, CodeID, Reply, Stage};
use smtpsub_protocol::{
    AcceptArgs, AuthArgs, AuthError, CallbackWrap, EhloArgs, HeloArgs, ReceiverContext, TlsArgs,
};

impl<B: Backend> Handler<B> {
    pub(super) fn generate_sasl_callback_inner(&self) -> CallbackWrap {
        CallbackWrap(Box::new(CredentialsCallback))
    }

    pub(super) fn on_accept_inner(&mut self, _: &mut ReceiverContext, args: &AcceptArgs) -> Reply {
        self.state.client_addr = args.client_addr;
        self.state.server_addr = args.server_addr;
        self.stage = Stage::Connect;

        self.reply_in_config(CodeID::Greetings)
    }

    pub(super) fn on_starttls_inner(&mut self, ctx: &mut ReceiverContext) -> Reply {
        let code = if !self.extended {
            CodeID::BadSequence
        } else if self.state.is_secured() {
            CodeID::AlreadyUnderTLS
        } else {
            match (&self.rustls_config, &self.config.server.tls) {
                (Some(rustls_config), Some(tls)) => {
                    ctx.upgrade_tls(rustls_config.clone(), tls.handshake_timeout);
                    CodeID::TlsGoAhead
                }
                _ => CodeID::TlsNotAvailable,
            }
        };

        self.reply_in_config(code)
    }

    pub(super) async fn on_post_tls_handshake_inner(&mut self, args: TlsArgs) {
        tracing::info!(
            sni = ?args.sni,
            protocol_version = ?args.protocol_version,
            cipher_suite = ?args.cipher_suite,
            "Connection secured.",
        );

        self.reset_envelope().await;
        self.logout().await;

        self.state.client_name = None;
        self.state.tls = Some(args);
        self.stage = Stage::Connect;
        self.extended = false;
    }

    pub(super) fn on_auth_inner(
        &mut self,
        ctx: &mut ReceiverContext,
        args: AuthArgs,
    ) -> Option<Reply> {
        if self.authenticated {
            return Some(self.reply_in_config(CodeID::AlreadyAuthenticated));
        }

        if !self.state.is_secured()
            && args.mechanism.must_be_under_tls()
            && !self.config.server.smtp.allow_insecure_auth
        {
            tracing::warn!(
                mechanism = %args.mechanism,
                "Authentication refused on a clear text channel."
            );
            return Some(self.reply_in_config(CodeID::AuthMechanismMustBeEncrypted));
        }

        ctx.authenticate(args.mechanism, args.initial_response);
        None
    }

    pub(super) async fn on_post_auth_inner(
        &mut self,
        _: &mut ReceiverContext,
        result: Result<Credentials, AuthError>,
    ) -> Reply {
        let code = match result {
            Ok(credentials) => return self.login(credentials).await,
            Err(AuthError::ClientMustNotStart) => CodeID::AuthClientMustNotStart,
            Err(AuthError::Canceled) => CodeID::AuthClientCanceled,
            Err(AuthError::Base64 { .. }) => CodeID::AuthErrorDecode64,
            Err(AuthError::LineTooLong(_)) => CodeID::LineTooLong,
            Err(AuthError::ValidationError(error)) => {
                tracing::info!(%error, "Authentication failed.");
                CodeID::AuthInvalidCredentials
            }
            Err(AuthError::SessionError(error)) => {
                tracing::info!(%error, "Authentication failed.");
                CodeID::AuthInvalidCredentials
            }
            Err(error @ (AuthError::ConfigError(_) | AuthError::IO(_))) => {
                tracing::warn!(%error, "Authentication aborted.");
                CodeID::Failure
            }
        };

        self.reply_in_config(code)
    }

    async fn login(&mut self, credentials: Credentials) -> Reply {
        match self.backend.login(&self.state, &credentials).await {
            Ok(session) => {
                tracing::info!(authid = %credentials.authid, "Authentication succeeded.");

                self.logout().await;
                self.session = Some(SessionGuard::new(session));
                self.authenticated = true;

                self.reply_in_config(CodeID::AuthSucceeded)
            }
            Err(error) => {
                tracing::info!(authid = %credentials.authid, %error, "Authentication rejected.");

                match error {
                    BackendError::Reply(reply) => reply,
                    BackendError::AuthRequired | BackendError::Other(_) => {
                        self.reply_in_config(CodeID::AuthInvalidCredentials)
                    }
                }
            }
        }
    }

    async fn generic_helo(&mut self, client_name: ClientName, default: CodeID) -> Reply {
        tracing::debug!(%client_name, "Client greeted.");

        self.reset_envelope().await;
        self.state.client_name = Some(client_name);
        self.stage = Stage::Helo;

        self.reply_in_config(default)
    }

    pub(super) async fn on_helo_inner(&mut self, _: &mut ReceiverContext, args: HeloArgs) -> Reply {
        self.extended = false;
        self.generic_helo(ClientName::Domain(args.client_name), CodeID::Helo)
            .await
    }

    pub(super) async fn on_ehlo_inner(&mut self, _: &mut ReceiverContext, args: EhloArgs) -> Reply {
        let code = if self.state.is_secured() {
            CodeID::EhloSecured
        } else {
            CodeID::EhloPlain
        };
        self.extended = true;
        self.generic_helo(args.client_name, code).await
    }
}
