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
    receiver::ReceiverContext, AcceptArgs, AuthArgs, AuthError, CallbackWrap, EhloArgs, Error,
    HeloArgs, MailFromArgs, ParseArgsError, RcptToArgs, TlsArgs, Verb,
};
use smtpsub_common::{auth::Credentials, Reply, Stage};

/// Trait to implement to handle the SMTP commands in pair with the [`Receiver`](crate::Receiver).
///
/// The [`Receiver`](crate::Receiver) only checks the command is legal at the current
/// [`Stage`], the handler produces every reply and updates the stage.
#[async_trait::async_trait]
pub trait ReceiverHandler {
    /// The [`Receiver`](crate::Receiver) does not store the context.
    /// This function is called after each command to get the context stage.
    fn get_stage(&self) -> Stage;

    /// Create an instance capable to handle the SASL handshake.
    fn generate_sasl_callback(&self) -> CallbackWrap;

    /// Called when the client connects to the server.
    async fn on_accept(&mut self, ctx: &mut ReceiverContext, args: AcceptArgs) -> Reply;

    /// Called after receiving a [`Verb::StartTls`] command.
    async fn on_starttls(&mut self, ctx: &mut ReceiverContext) -> Reply;

    /// Called after a successful TLS handshake, no reply is sent to the client
    /// which must greet the server again.
    async fn on_post_tls_handshake(&mut self, args: TlsArgs);

    /// Called after receiving a [`Verb::Auth`] command.
    ///
    /// Return `None` after calling [`ReceiverContext::authenticate`].
    async fn on_auth(&mut self, ctx: &mut ReceiverContext, args: AuthArgs) -> Option<Reply>;

    /// Called at the end of the SASL handshake.
    async fn on_post_auth(
        &mut self,
        ctx: &mut ReceiverContext,
        result: Result<Credentials, AuthError>,
    ) -> Reply;

    /// Called after receiving a [`Verb::Helo`] command.
    async fn on_helo(&mut self, ctx: &mut ReceiverContext, args: HeloArgs) -> Reply;

    /// Called after receiving a [`Verb::Ehlo`] command.
    async fn on_ehlo(&mut self, ctx: &mut ReceiverContext, args: EhloArgs) -> Reply;

    /// Called after receiving a [`Verb::MailFrom`] command.
    async fn on_mail_from(&mut self, ctx: &mut ReceiverContext, args: MailFromArgs) -> Reply;

    /// Called after receiving a [`Verb::RcptTo`] command.
    async fn on_rcpt_to(&mut self, ctx: &mut ReceiverContext, args: RcptToArgs) -> Reply;

    /// Called after receiving a [`Verb::Data`] command.
    /// The body is read only if the reply is a `354`.
    async fn on_data(&mut self, ctx: &mut ReceiverContext) -> Reply;

    /// Called after the reply `354` to [`Verb::Data`].
    /// The stream is the body of the message, with dot-stuffing handled.
    /// The stream return `None` when the message is finished (`.<CRLF>`), and
    /// ends after its first error.
    async fn on_message(
        &mut self,
        ctx: &mut ReceiverContext,
        stream: impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + Send + Unpin,
    ) -> Reply;

    /// Called after receiving a [`Verb::Rset`] command.
    async fn on_rset(&mut self) -> Reply;

    /// Called after receiving a [`Verb::Noop`] command.
    async fn on_noop(&mut self) -> Reply;

    /// Called after receiving a [`Verb::Quit`] command.
    async fn on_quit(&mut self) -> Reply;

    /// Called after receiving an unknown command (unrecognized or unimplemented).
    async fn on_unknown(&mut self, buffer: Vec<u8>) -> Reply;

    /// Called when the stage of the transaction (obtained with [`get_stage`](Self::get_stage))
    /// and the command are not compatible.
    async fn on_bad_sequence(&mut self, _: (Verb, Stage)) -> Reply;

    /// Called when an argument of a command is invalid.
    async fn on_args_error(&mut self, _: ParseArgsError) -> Reply;
}
