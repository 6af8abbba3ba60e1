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

use super::{credentials, envelope};
use crate::{
    config::{client_tls, local_client, local_test, with_tls},
    receiver::{accept_args, server_tls},
    recorder::{Event, RecordingBackend},
};
use smtpsub_client::{Client, Envelope, Error};
use smtpsub_config::{field::FieldClient, Config};
use smtpsub_server::{serve_connection, Handler, MailOptions};

/// Run the client against a session of the server over an in-memory stream,
/// `AUTH` being allowed by the client on a clear text channel when `starttls` is not set.
async fn submit(
    config: Config,
    backend: &RecordingBackend,
    starttls: bool,
    envelope: &Envelope,
) -> Result<(), Error> {
    let client_config = FieldClient {
        allow_insecure_auth: !starttls,
        ..local_client("127.0.0.1:587".parse().unwrap())
    };
    submit_with(config, backend, &client_config, starttls, envelope).await
}

async fn submit_with(
    config: Config,
    backend: &RecordingBackend,
    client_config: &FieldClient,
    starttls: bool,
    envelope: &Envelope,
) -> Result<(), Error> {
    let config = std::sync::Arc::new(config);
    let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);

    let session = tokio::spawn({
        let backend = std::sync::Arc::new(backend.clone());
        async move {
            let handler = Handler::new(config.clone(), server_tls(&config), backend);
            serve_connection(handler, server_stream, &config.server.smtp, accept_args()).await
        }
    });

    let result = async {
        let mut client = Client::new(client_stream, client_config).await?;
        client
            .send_mail(
                starttls.then(|| (std::sync::Arc::new(client_tls()), "testserver.com")),
                Some(&credentials()),
                envelope,
            )
            .await
    }
    .await;

    session.await.unwrap().unwrap();
    result
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn submission() {
    let backend = RecordingBackend::new();
    let body = b"Subject: test\r\n\r\nHello World\r\n";

    submit(with_tls(), &backend, true, &envelope(body))
        .await
        .unwrap();

    pretty_assertions::assert_eq!(
        backend.events(),
        vec![
            Event::Login {
                authzid: None,
                authid: "username".to_string()
            },
            Event::Mail {
                reverse_path: Some("john@doe".to_string()),
                options: MailOptions {
                    size: Some(body.len()),
                    body: None
                }
            },
            Event::Rcpt("aa@bb".to_string()),
            Event::Rcpt("bb@bb".to_string()),
            Event::Data(body.to_vec()),
            Event::Reset,
            Event::Logout,
        ]
    );
}

#[rstest::rstest]
#[case::simple(b"Hello\r\n")]
#[case::leading_dots(b".leading\r\n..double\r\n")]
#[case::lone_dot(b"before\r\n.\r\nafter\r\n")]
#[case::terminator_inside(b"a\r\n.\r\n\r\n.\r\n")]
#[case::bare_line_feed(b"foo\n.bar\r\n")]
#[case::empty(b"")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn body_round_trip(#[case] body: &[u8]) {
    let backend = RecordingBackend::new();

    submit(with_tls(), &backend, true, &envelope(body))
        .await
        .unwrap();

    pretty_assertions::assert_eq!(backend.bodies(), vec![body.to_vec()]);
}

#[tokio::test]
async fn unterminated_body_is_completed() {
    let backend = RecordingBackend::new();

    submit(local_test(), &backend, false, &envelope(b"no new line"))
        .await
        .unwrap();

    pretty_assertions::assert_eq!(backend.bodies(), vec![b"no new line\r\n".to_vec()]);
}

#[tokio::test]
async fn clear_text_refused_by_the_client() {
    let backend = RecordingBackend::new();

    let mut config = with_tls();
    config.server.smtp.allow_insecure_auth = true;
    let config = config.ensure().unwrap();

    let client_config = local_client("127.0.0.1:587".parse().unwrap());
    let error = submit_with(
        config,
        &backend,
        &client_config,
        false,
        &envelope(b"Hello\r\n"),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, Error::InsecureAuth), "{error}");
    assert!(backend.events().is_empty());
}

#[tokio::test]
async fn oversized_message() {
    let backend = RecordingBackend::new();

    let mut config = local_test();
    config.server.smtp.message_size_limit = 10;
    let config = config.ensure().unwrap();

    let error = submit(config, &backend, false, &envelope(b"0123456789ABC\r\n"))
        .await
        .unwrap_err();

    pretty_assertions::assert_eq!(error.code(), Some(552));
    assert!(
        matches!(
            &error,
            Error::Reply { enhanced: Some(enhanced), text, .. }
                if enhanced == "5.3.4" && text == "Message size exceeds fixed maximum message size"
        ),
        "{error}"
    );
    pretty_assertions::assert_eq!(
        backend.events_without_logout(),
        vec![Event::Login {
            authzid: None,
            authid: "username".to_string()
        }]
    );
}

#[tokio::test]
async fn refused_recipient() {
    let backend = RecordingBackend::new()
        .with_rejected_rcpt("bb@bb", "550 5.1.1 Mailbox unavailable\r\n".parse().unwrap());

    let error = submit(local_test(), &backend, false, &envelope(b"Hello\r\n"))
        .await
        .unwrap_err();

    pretty_assertions::assert_eq!(
        error.to_string(),
        "550 5.1.1 Mailbox unavailable"
    );
    assert!(backend.bodies().is_empty());
}
