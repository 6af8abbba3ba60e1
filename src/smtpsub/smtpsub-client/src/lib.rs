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

//! smtpsub client
//!
//! A [`Client`] walking the submission conversation against a server, verifying every
//! reply, and [`send_mail`] running the whole exchange from the configuration.

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

mod client;
mod data_writer;
mod error;
mod stream;

pub use client::{Client, Credentials, Envelope, TlsState};
pub use data_writer::DataWriter;
pub use error::Error;

use smtpsub_config::{field::FieldClient, get_rustls_client_config};

/// Connect to `config.addr` and submit `envelope`, with `STARTTLS` and `AUTH PLAIN`
/// as configured.
///
/// # Errors
///
/// * the envelope has no forward path
/// * the TLS configuration is invalid
/// * see [`Client::connect`] and [`Client::send_mail`]
#[tracing::instrument(name = "send-mail", skip_all, fields(addr = %config.addr))]
pub async fn send_mail(config: &FieldClient, envelope: &Envelope) -> Result<(), Error> {
    if envelope.forward_paths.is_empty() {
        return Err(Error::NoRecipient);
    }

    let starttls = if config.tls.starttls {
        Some((
            std::sync::Arc::new(
                get_rustls_client_config(&config.tls).map_err(|e| Error::Tls(e.to_string()))?,
            ),
            config.tls.server_name.as_str(),
        ))
    } else {
        None
    };

    let credentials = config.credentials.as_ref().map(|credentials| Credentials {
        authzid: credentials.authzid.clone(),
        authcid: credentials.authcid.clone(),
        passwd: credentials.passwd.clone(),
    });

    let mut client = Client::connect(config).await?;
    client
        .send_mail(starttls, credentials.as_ref(), envelope)
        .await
}
