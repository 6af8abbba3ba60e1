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

mod auth;
mod e2e;
mod timeout;
mod unknown;

const GREETINGS: &str = "220 testserver.com Service ready\r\n";
const EHLO_PLAIN: &str = "250-testserver.com\r\n250-AUTH PLAIN\r\n250 SIZE 1048576\r\n";
const OK: &str = "250 Ok\r\n";
const DATA_START: &str = "354 Start mail input; end with <CRLF>.<CRLF>\r\n";
const CLOSING: &str = "221 Service closing transmission channel\r\n";
const BAD_SEQUENCE: &str = "503 Bad sequence of commands\r\n";
const SYNTAX_ERROR: &str = "501 Syntax error in parameters or arguments\r\n";
const AUTH_REQUIRED: &str = "530 5.7.0 Authentication required\r\n";
const AUTH_SUCCEEDED: &str = "235 2.7.0 Authentication succeeded\r\n";
const AUTH_INVALID: &str = "535 5.7.8 Authentication credentials invalid\r\n";

/// `\0username\0password`
const AUTH_PLAIN: &str = "AUTH PLAIN AHVzZXJuYW1lAHBhc3N3b3Jk\r\n";

fn login() -> crate::recorder::Event {
    crate::recorder::Event::Login {
        authzid: None,
        authid: "username".to_string(),
    }
}

fn mail(reverse_path: &str) -> crate::recorder::Event {
    crate::recorder::Event::Mail {
        reverse_path: Some(reverse_path.to_string()),
        options: smtpsub_server::MailOptions::default(),
    }
}

fn rcpt(forward_path: &str) -> crate::recorder::Event {
    crate::recorder::Event::Rcpt(forward_path.to_string())
}

const EHLO_TLS: &str = "250-testserver.com\r\n250 STARTTLS\r\n";
const EHLO_SECURED: &str = "250-testserver.com\r\n250-AUTH PLAIN\r\n250 SIZE 1048576\r\n";
const TLS_GO_AHEAD: &str = "220 2.0.0 Ready to start TLS\r\n";

/// [`crate::config::with_tls`] with `AUTH` allowed on a clear text channel.
fn with_tls_insecure_auth() -> smtpsub_config::Config {
    let mut config = crate::config::with_tls();
    config.server.smtp.allow_insecure_auth = true;
    config.ensure().unwrap()
}
