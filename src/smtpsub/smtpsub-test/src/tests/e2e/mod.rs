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

mod duplex;
mod lettre_interop;
mod tcp;

use smtpsub_client::{Credentials, Envelope};

fn credentials() -> Credentials {
    Credentials {
        authzid: String::new(),
        authcid: "username".to_string(),
        passwd: "password".to_string(),
    }
}

fn envelope(body: &[u8]) -> Envelope {
    Envelope {
        reverse_path: "john@doe".to_string(),
        forward_paths: vec!["aa@bb".to_string(), "bb@bb".to_string()],
        body: body.to_vec(),
    }
}
