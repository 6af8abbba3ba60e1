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

use smtpsub_config::{
    field::{FieldClient, FieldClientTls, FieldServer, FieldServerTls, SecretFile},
    get_rustls_client_config, Config,
};
use smtpsub_protocol::rustls;

/// Self-signed certificate of `testserver.com`.
pub const CERTIFICATE: &str = include_str!("template/certs/certificate.crt");
/// Private key of [`CERTIFICATE`].
pub const PRIVATE_KEY: &str = include_str!("template/certs/private_key.pkcs8.key");

/// Get a config for local test, without TLS.
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn local_test() -> Config {
    Config {
        server: FieldServer {
            name: "testserver.com".to_string(),
            ..FieldServer::default()
        },
        ..Config::default()
    }
    .ensure()
    .unwrap()
}

/// TLS parameters of the server, using the fixtures.
///
/// # Panics
///
/// * the fixtures cannot be parsed
#[must_use]
pub fn tls_parameters() -> FieldServerTls {
    let certificate = rustls_pemfile::certs(&mut CERTIFICATE.as_bytes())
        .unwrap()
        .into_iter()
        .map(rustls::Certificate)
        .collect();

    let private_key = rustls_pemfile::pkcs8_private_keys(&mut PRIVATE_KEY.as_bytes())
        .unwrap()
        .into_iter()
        .next()
        .map(rustls::PrivateKey)
        .unwrap();

    FieldServerTls {
        handshake_timeout: std::time::Duration::from_secs(1),
        certificate: SecretFile {
            inner: certificate,
            path: "template/certs/certificate.crt".into(),
        },
        private_key: SecretFile {
            inner: private_key,
            path: "template/certs/private_key.pkcs8.key".into(),
        },
    }
}

/// Same as [`local_test`] with `STARTTLS` available, and `AUTH` refused on a
/// clear text channel.
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn with_tls() -> Config {
    let mut config = local_test();
    config.server.tls = Some(tls_parameters());
    config.server.smtp.allow_insecure_auth = false;
    config.ensure().unwrap()
}

/// Client side TLS parameters, accepting the self-signed certificate of the fixtures.
#[must_use]
pub fn client_tls_parameters() -> FieldClientTls {
    FieldClientTls {
        starttls: true,
        server_name: "testserver.com".to_string(),
        insecure_skip_verify: true,
        root_certificate: None,
    }
}

/// See [`client_tls_parameters`].
///
/// # Panics
///
/// * the configuration cannot be built
#[must_use]
pub fn client_tls() -> rustls::ClientConfig {
    get_rustls_client_config(&client_tls_parameters()).unwrap()
}

/// Client configuration submitting to `addr` with `STARTTLS` and the default credentials.
#[must_use]
pub fn local_client(addr: std::net::SocketAddr) -> FieldClient {
    FieldClient {
        addr: addr.to_string(),
        client_name: "client.com".to_string(),
        dial_timeout: std::time::Duration::from_secs(2),
        read_timeout: std::time::Duration::from_secs(2),
        write_timeout: std::time::Duration::from_secs(2),
        tls: client_tls_parameters(),
        ..FieldClient::default()
    }
}
