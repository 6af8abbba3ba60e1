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

use super::tcp::Running;
use crate::recorder::{Event, RecordingBackend};
use lettre::{
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{Tls, TlsParameters},
        extension::ClientId,
    },
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};

fn transport(
    addr: std::net::SocketAddr,
    password: &str,
) -> AsyncSmtpTransport<Tokio1Executor> {
    let tls = TlsParameters::builder("testserver.com".to_string())
        .dangerous_accept_invalid_certs(true)
        .build_rustls()
        .unwrap();

    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(addr.ip().to_string())
        .hello_name(ClientId::Domain("client.com".to_string()))
        .port(addr.port())
        .tls(Tls::Required(tls))
        .credentials(Credentials::new(
            "username".to_string(),
            password.to_string(),
        ))
        .authentication(vec![Mechanism::Plain])
        .build()
}

fn envelope() -> lettre::address::Envelope {
    lettre::address::Envelope::new(
        Some("john@doe.com".parse().unwrap()),
        vec!["aa@bb.com".parse().unwrap()],
    )
    .unwrap()
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn lettre_submission() {
    let backend = RecordingBackend::new();
    let server = Running::start(&backend);

    let response = transport(server.addr, "password")
        .send_raw(
            &envelope(),
            b"Subject: lettre\r\n\r\n.Hello from lettre\r\n",
        )
        .await
        .unwrap();
    pretty_assertions::assert_eq!(response.code().to_string(), "250");

    server.stop().await;

    let bodies = backend.bodies();
    pretty_assertions::assert_eq!(bodies.len(), 1);
    let body = String::from_utf8(bodies[0].clone()).unwrap();
    assert!(body.starts_with("Subject: lettre\r\n\r\n.Hello from lettre\r\n"), "{body}");

    assert!(backend.events().contains(&Event::Rcpt("aa@bb.com".to_string())));
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn lettre_invalid_credentials() {
    let backend = RecordingBackend::new();
    let server = Running::start(&backend);

    let error = transport(server.addr, "bad")
        .send_raw(&envelope(), b"Subject: lettre\r\n\r\nHello\r\n")
        .await
        .unwrap_err();
    assert!(error.is_permanent(), "{error}");

    server.stop().await;
    assert!(backend.bodies().is_empty());
}
