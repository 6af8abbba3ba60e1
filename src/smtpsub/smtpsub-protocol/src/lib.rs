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

//! smtpsub protocol implementation
//!
//! The line oriented [`Reader`] and [`Writer`] shared by both sides of the harness,
//! and the [`Receiver`] driving the state machine of a submission server.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::indexing_slicing)] // issue with async_stream

mod command;
mod dot_stuffer;
mod error;
mod reader;
mod receiver;
mod receiver_handler;
mod smtp_sasl;
mod writer;

pub use command::{
    AcceptArgs, AuthArgs, Command, EhloArgs, HeloArgs, MailFromArgs, MimeBodyType,
    ParseArgsError, RcptToArgs, TlsArgs, UnparsedArgs, Verb,
};
pub use dot_stuffer::DotStuffer;
pub use error::Error;
pub use reader::{Reader, COMMAND_LINE_MAX, MESSAGE_LINE_MAX, REPLY_LINE_MAX};
pub use receiver::{Receiver, ReceiverContext};
pub use receiver_handler::ReceiverHandler;
pub use smtp_sasl::{AuthError, CallbackWrap, CredentialsValidation};
pub use writer::Writer;

pub use tokio_rustls;
pub use tokio_rustls::rustls;
