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

use crate::Config;

#[test]
fn parse() {
    let toml = include_str!("../../../../../../demos/config/tls.toml").replace(
        "src/smtpsub/smtpsub-test",
        concat!(env!("CARGO_MANIFEST_DIR"), "/../smtpsub-test"),
    );
    let config = Config::from_toml(&toml).unwrap();

    let tls = config.server.tls.as_ref().unwrap();
    pretty_assertions::assert_eq!(tls.handshake_timeout, std::time::Duration::from_millis(200));
    pretty_assertions::assert_eq!(tls.certificate.inner.len(), 1);
    crate::get_rustls_config(tls).unwrap();

    pretty_assertions::assert_eq!(config.server.smtp.message_size_limit, 20_000_000);
    pretty_assertions::assert_eq!(config.server.smtp.rcpt_count_max, 25);
    assert!(!config.server.smtp.allow_insecure_auth);
    pretty_assertions::assert_eq!(config.server.accounts.len(), 1);
    pretty_assertions::assert_eq!(config.server.accounts[0].username, "alice");

    pretty_assertions::assert_eq!(
        config.server.smtp.codes[&smtpsub_common::CodeID::EhloPlain].to_string(),
        "250-testserver.com\r\n250 STARTTLS\r\n"
    );

    pretty_assertions::assert_eq!(config.client.tls.server_name, "testserver.com");
    crate::get_rustls_client_config(&config.client.tls).unwrap();

    let credentials = config.client.credentials.as_ref().unwrap();
    pretty_assertions::assert_eq!(credentials.authzid, "");
    pretty_assertions::assert_eq!(credentials.authcid, "alice");
    pretty_assertions::assert_eq!(
        config.client.envelope.forward_paths,
        ["bob@testserver.com", "carol@testserver.com"]
    );
    pretty_assertions::assert_eq!(
        config.client.envelope.body,
        "From: alice@testserver.com\r\nSubject: hello\r\n\r\n.a line starting with a dot\r\n"
    );
}
