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

//! smtpsub server
//!
//! The [`Handler`] producing the replies of a submission session, the [`Backend`]
//! contract it forwards the accepted envelopes to, and the TCP [`Server`].

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::module_name_repetitions)]

mod backend;
mod logging_backend;
mod server;

mod receiver {
    pub mod handler;
    pub mod message_reader;
    mod pre_transaction;
    mod rsasl_callback;
    mod transaction;
}

pub use backend::{Backend, BackendError, ConnectionState, MailOptions, Session};
pub use logging_backend::{LoggingBackend, LoggingSession};
pub use receiver::handler::Handler;
pub use receiver::message_reader::MessageReader;
pub use server::{serve_connection, socket_bind_anyhow, Server};
