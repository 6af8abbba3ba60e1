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

//! smtpsub common definition

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
#![allow(clippy::missing_const_for_fn)] // see https://github.com/rust-lang/rust-clippy/issues/9271

/// Default submission port of the harness.
pub const SUBMISSION_PORT: u16 = 1025;

mod types {
    pub mod client_name;
    pub mod code_id;
    pub mod reply;
    pub mod reply_code;
}

pub use types::{client_name::ClientName, code_id::CodeID, reply::Reply, reply_code::ReplyCode};

/// Authentication primitives (SASL).
pub mod auth {
    mod credentials;
    mod mechanism;

    pub use credentials::{Credentials, Error};
    pub use mechanism::Mechanism;
}

mod stage;
pub use stage::Stage;
