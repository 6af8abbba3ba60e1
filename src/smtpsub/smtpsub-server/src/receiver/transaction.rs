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

use super::handler::{Envelope, Handler};
use crate::{backend::SessionGuard, Backend, MailOptions, MessageReader, Session};
use smtpsub_common::{CodeID, Reply, Stage};
use smtpsub_protocol::{Error, MailFromArgs, ParseArgsError, RcptToArgs, ReceiverContext};

/// Commands known by the server but not implemented.
#[derive(strum::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
enum Unimplemented {
    Vrfy,
    Expn,
    Help,
    Turn,
    Etrn,
    Bdat,
}

/// Verbs whose arguments did not match the expected syntax.
#[derive(strum::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
enum MalformedVerb {
    Helo,
    Ehlo,
    Mail,
    Rcpt,
    Auth,
    Data,
    Rset,
    Noop,
    Quit,
    Starttls,
}

impl<B: Backend> Handler<B> {
    pub(super) async fn on_mail_from_inner(
        &mut self,
        _: &mut ReceiverContext,
        args: MailFromArgs,
    ) -> Reply {
        if self.session.is_none() {
            match self.backend.anonymous_login(&self.state).await {
                Ok(session) => self.session = Some(SessionGuard::new(session)),
                Err(error) => {
                    tracing::info!(%error, "Anonymous session refused.");
                    return self.backend_error_reply(error, CodeID::AuthRequired);
                }
            }
        }

        let options = MailOptions::from(&args);
        if options
            .size
            .map_or(false, |size| size > self.config.server.smtp.message_size_limit)
        {
            tracing::info!(size = ?options.size, "Declared message size over the limit.");
            return self.reply_in_config(CodeID::MessageSizeExceeded);
        }

        let Some(session) = self.session.as_mut().and_then(SessionGuard::get_mut) else {
            return self.reply_in_config(CodeID::AuthRequired);
        };

        match session.mail(args.reverse_path.as_deref(), &options).await {
            Ok(()) => {
                tracing::info!(reverse_path = ?args.reverse_path, "Mail from accepted.");

                self.envelope = Some(Envelope {
                    reverse_path: args.reverse_path,
                    forward_paths: vec![],
                    options,
                });
                self.stage = Stage::MailFrom;
                self.reply_in_config(CodeID::Ok)
            }
            Err(error) => self.backend_error_reply(error, CodeID::Denied),
        }
    }

    pub(super) async fn on_rcpt_to_inner(
        &mut self,
        _: &mut ReceiverContext,
        args: RcptToArgs,
    ) -> Reply {
        let rcpt_count = self
            .envelope
            .as_ref()
            .map_or(0, |envelope| envelope.forward_paths.len());

        if rcpt_count >= self.config.server.smtp.rcpt_count_max {
            tracing::info!(rcpt_count, "Too many recipients.");
            return self.reply_in_config(CodeID::TooManyRecipients);
        }

        let Some(session) = self.session.as_mut().and_then(SessionGuard::get_mut) else {
            return self.reply_in_config(CodeID::BadSequence);
        };

        match session.rcpt(&args.forward_path).await {
            Ok(()) => {
                tracing::info!(forward_path = %args.forward_path, "Rcpt to accepted.");

                if let Some(envelope) = self.envelope.as_mut() {
                    envelope.forward_paths.push(args.forward_path);
                }
                self.stage = Stage::RcptTo;
                self.reply_in_config(CodeID::Ok)
            }
            Err(error) => self.backend_error_reply(error, CodeID::Denied),
        }
    }

    pub(super) async fn on_message_inner(
        &mut self,
        _: &mut ReceiverContext,
        stream: impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + Send + Unpin,
    ) -> Reply {
        let mut reader = MessageReader::new(stream);

        let result = match self.session.as_mut().and_then(SessionGuard::get_mut) {
            Some(session) => Some(session.data(&mut reader).await),
            None => None,
        };
        reader.consume_remaining().await;

        let reply = match (reader.take_error(), result) {
            (Some(Error::MessageSizeExceeded { expected, got }), _) => {
                tracing::warn!(expected, got, "Message aborted, size over the limit.");
                self.reply_in_config(CodeID::MessageSizeExceeded)
            }
            (Some(Error::BufferTooLong { expected, got }), _) => {
                tracing::warn!(expected, got, "Message aborted, line too long.");
                self.reply_in_config(CodeID::LineTooLong)
            }
            (Some(error), _) => {
                tracing::warn!(%error, "Message aborted.");
                self.reply_in_config(CodeID::Failure)
            }
            (None, None) => self.reply_in_config(CodeID::BadSequence),
            (None, Some(Ok(()))) => {
                tracing::info!(
                    size = reader.size(),
                    envelope = ?self.envelope,
                    "Message accepted."
                );
                self.reply_in_config(CodeID::Ok)
            }
            (None, Some(Err(error))) => self.backend_error_reply(error, CodeID::Denied),
        };

        self.reset_envelope().await;
        reply
    }

    pub(super) fn on_unknown_inner(&self, buffer: &[u8]) -> Reply {
        let verb = buffer
            .split(|c| c.is_ascii_whitespace())
            .next()
            .and_then(|verb| std::str::from_utf8(verb).ok())
            .map(str::to_ascii_uppercase)
            .unwrap_or_default();

        let code = if verb.parse::<Unimplemented>().is_ok() {
            CodeID::Unimplemented
        } else if verb.parse::<MalformedVerb>().is_ok() {
            CodeID::SyntaxErrorParams
        } else {
            CodeID::UnrecognizedCommand
        };

        tracing::debug!(
            command = ?String::from_utf8_lossy(buffer),
            %code,
            "Command not handled."
        );
        self.reply_in_config(code)
    }

    pub(super) fn on_args_error_inner(&self, error: &ParseArgsError) -> Reply {
        tracing::debug!(%error, "Invalid arguments.");

        self.reply_in_config(match error {
            ParseArgsError::BufferTooLong { .. } => CodeID::LineTooLong,
            ParseArgsError::UnsupportedMechanism(_) => CodeID::AuthMechNotSupported,
            ParseArgsError::UnsupportedParameter(_) => CodeID::ParameterUnimplemented,
            ParseArgsError::InvalidUtf8(_)
            | ParseArgsError::BadTypeAddr(_)
            | ParseArgsError::InvalidArgs => CodeID::SyntaxErrorParams,
        })
    }
}
