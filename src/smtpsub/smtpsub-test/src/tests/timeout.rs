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

use super::{login, mail, rcpt, AUTH_PLAIN, AUTH_SUCCEEDED, DATA_START, EHLO_PLAIN, GREETINGS, OK};
use crate::{
    config::local_test,
    receiver::accept_args,
    recorder::{Event, RecordingBackend},
    run_test,
};
use smtpsub_server::{serve_connection, Handler};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const READ_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(200);

/// Serve one connection with a short read timeout, the other end of the stream is returned.
fn spawn_session(
    backend: &RecordingBackend,
) -> (
    tokio::io::DuplexStream,
    tokio::task::JoinHandle<std::io::Result<()>>,
) {
    let mut config = local_test();
    config.server.smtp.read_timeout = READ_TIMEOUT;
    let config = std::sync::Arc::new(config.ensure().unwrap());
    let backend = std::sync::Arc::new(backend.clone());

    let (client, server) = tokio::io::duplex(4096);
    let session = tokio::spawn(async move {
        let handler = Handler::new(config.clone(), None, backend);
        serve_connection(handler, server, &config.server.smtp, accept_args()).await
    });

    (client, session)
}

#[test_log::test(tokio::test)]
async fn idle_client() {
    let backend = RecordingBackend::new();
    let (client, session) = spawn_session(&backend);
    let (mut read, mut write) = tokio::io::split(client);

    write.write_all(b"EHLO client.com\r\n").await.unwrap();

    let error = session.await.unwrap().unwrap_err();
    pretty_assertions::assert_eq!(error.kind(), std::io::ErrorKind::TimedOut);

    let mut output = Vec::new();
    read.read_to_end(&mut output).await.unwrap();
    pretty_assertions::assert_eq!(
        String::from_utf8(output).unwrap(),
        [GREETINGS, EHLO_PLAIN].concat()
    );
}

#[test_log::test(tokio::test)]
async fn idle_in_the_middle_of_a_message() {
    let backend = RecordingBackend::new();
    let (client, session) = spawn_session(&backend);
    let (mut read, mut write) = tokio::io::split(client);

    write
        .write_all(
            [
                "EHLO client.com\r\n",
                AUTH_PLAIN,
                "MAIL FROM:<john@doe>\r\n",
                "RCPT TO:<aa@bb>\r\n",
                "DATA\r\n",
                "Subject: unfinished\r\n",
                "half a li",
            ]
            .concat()
            .as_bytes(),
        )
        .await
        .unwrap();

    session.await.unwrap().unwrap_err();

    let mut output = Vec::new();
    read.read_to_end(&mut output).await.unwrap();
    pretty_assertions::assert_eq!(
        String::from_utf8(output).unwrap(),
        [GREETINGS, EHLO_PLAIN, AUTH_SUCCEEDED, OK, OK, DATA_START].concat()
    );

    pretty_assertions::assert_eq!(
        backend.events_without_logout(),
        vec![login(), mail("john@doe"), rcpt("aa@bb"), Event::Reset]
    );
}

#[test_log::test(tokio::test)]
async fn closed_in_the_middle_of_a_message() {
    let backend = RecordingBackend::new();

    let error = run_test!(
        input = [
            "EHLO client.com\r\n",
            AUTH_PLAIN,
            "MAIL FROM:<john@doe>\r\n",
            "RCPT TO:<aa@bb>\r\n",
            "DATA\r\n",
            "Subject: unfinished\r\n",
        ],
        expected = [GREETINGS, EHLO_PLAIN, AUTH_SUCCEEDED, OK, OK, DATA_START],
        backend = backend.clone(),
    )
    .unwrap_err();

    pretty_assertions::assert_eq!(error.kind(), std::io::ErrorKind::UnexpectedEof);
    assert!(backend.bodies().is_empty());
}

run_test! {
    fn closed_without_quit,
    input = ["EHLO client.com\r\n", AUTH_PLAIN],
    expected = [GREETINGS, EHLO_PLAIN, AUTH_SUCCEEDED],
}
