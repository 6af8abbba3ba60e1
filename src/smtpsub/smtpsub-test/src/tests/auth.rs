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

use super::{
    login, AUTH_INVALID, AUTH_PLAIN, AUTH_REQUIRED, AUTH_SUCCEEDED, BAD_SEQUENCE, CLOSING,
    EHLO_PLAIN, EHLO_TLS, GREETINGS, OK, SYNTAX_ERROR,
};
use crate::{
    config::with_tls,
    recorder::{Event, RecordingBackend},
    run_test,
};

run_test! {
    fn initial_response,
    input = ["EHLO client.com\r\n", AUTH_PLAIN, "MAIL FROM:<john@doe>\r\n", "QUIT\r\n"],
    expected = [GREETINGS, EHLO_PLAIN, AUTH_SUCCEEDED, OK, CLOSING],
}

run_test! {
    fn challenge_then_response,
    input = [
        "EHLO client.com\r\n",
        "AUTH PLAIN\r\n",
        "AHVzZXJuYW1lAHBhc3N3b3Jk\r\n",
        "QUIT\r\n",
    ],
    expected = [GREETINGS, EHLO_PLAIN, "334 \r\n", AUTH_SUCCEEDED, CLOSING],
}

run_test! {
    fn mechanism_is_case_insensitive,
    input = ["EHLO client.com\r\n", "AUTH plain AHVzZXJuYW1lAHBhc3N3b3Jk\r\n", "QUIT\r\n"],
    expected = [GREETINGS, EHLO_PLAIN, AUTH_SUCCEEDED, CLOSING],
}

run_test! {
    fn canceled_by_the_client,
    input = ["EHLO client.com\r\n", "AUTH PLAIN\r\n", "*\r\n", "MAIL FROM:<john@doe>\r\n", "QUIT\r\n"],
    expected = [
        GREETINGS,
        EHLO_PLAIN,
        "334 \r\n",
        "501 Authentication canceled by client\r\n",
        AUTH_REQUIRED,
        CLOSING,
    ],
}

run_test! {
    fn invalid_base64,
    input = ["EHLO client.com\r\n", "AUTH PLAIN !!!\r\n", "QUIT\r\n"],
    expected = [GREETINGS, EHLO_PLAIN, "501 5.5.2 Invalid, not base64\r\n", CLOSING],
}

run_test! {
    fn invalid_base64_after_challenge,
    input = ["EHLO client.com\r\n", "AUTH PLAIN\r\n", "not base64!\r\n", "QUIT\r\n"],
    expected = [
        GREETINGS,
        EHLO_PLAIN,
        "334 \r\n",
        "501 5.5.2 Invalid, not base64\r\n",
        CLOSING,
    ],
}

#[rstest::rstest]
#[case::login("AUTH LOGIN\r\n")]
#[case::cram_md5("AUTH CRAM-MD5\r\n")]
#[case::anonymous("AUTH ANONYMOUS\r\n")]
#[case::unknown("AUTH FOO\r\n")]
#[tokio::test]
async fn mechanism_not_supported(#[case] command: &str) {
    run_test!(
        input = ["EHLO client.com\r\n", command, "QUIT\r\n"],
        expected = [
            GREETINGS,
            EHLO_PLAIN,
            "504 5.5.4 Mechanism is not supported\r\n",
            CLOSING
        ],
    )
    .unwrap();
}

run_test! {
    fn missing_mechanism,
    input = ["EHLO client.com\r\n", "AUTH\r\n", "QUIT\r\n"],
    expected = [GREETINGS, EHLO_PLAIN, SYNTAX_ERROR, CLOSING],
}

run_test! {
    fn before_greeting,
    input = [AUTH_PLAIN, "QUIT\r\n"],
    expected = [GREETINGS, BAD_SEQUENCE, CLOSING],
}

run_test! {
    fn already_authenticated,
    input = ["EHLO client.com\r\n", AUTH_PLAIN, AUTH_PLAIN, "QUIT\r\n"],
    expected = [
        GREETINGS,
        EHLO_PLAIN,
        AUTH_SUCCEEDED,
        "503 5.5.1 Error: already authenticated\r\n",
        CLOSING,
    ],
}

#[test_log::test(tokio::test)]
async fn invalid_credentials() {
    let backend = RecordingBackend::new();

    run_test!(
        input = [
            "EHLO client.com\r\n",
            // \0username\0bad
            "AUTH PLAIN AHVzZXJuYW1lAGJhZA==\r\n",
            "MAIL FROM:<john@doe>\r\n",
            AUTH_PLAIN,
            "QUIT\r\n",
        ],
        expected = [
            GREETINGS,
            EHLO_PLAIN,
            AUTH_INVALID,
            AUTH_REQUIRED,
            AUTH_SUCCEEDED,
            CLOSING,
        ],
        backend = backend.clone(),
    )
    .unwrap();

    pretty_assertions::assert_eq!(backend.events(), vec![login(), Event::Logout]);
}

run_test! {
    fn missing_password,
    // \0username
    input = ["EHLO client.com\r\n", "AUTH PLAIN AHVzZXJuYW1l\r\n", "QUIT\r\n"],
    expected = [GREETINGS, EHLO_PLAIN, AUTH_INVALID, CLOSING],
}

run_test! {
    fn refused_on_clear_text_channel,
    input = ["EHLO client.com\r\n", AUTH_PLAIN, "MAIL FROM:<john@doe>\r\n", "QUIT\r\n"],
    expected = [
        GREETINGS,
        EHLO_TLS,
        "538 5.7.11 Encryption required for requested authentication mechanism\r\n",
        AUTH_REQUIRED,
        CLOSING,
    ],
    config = with_tls(),
}

run_test! {
    fn authorization_identity,
    // admin\0username\0password
    input = ["EHLO client.com\r\n", "AUTH PLAIN YWRtaW4AdXNlcm5hbWUAcGFzc3dvcmQ=\r\n", "QUIT\r\n"],
    expected = [GREETINGS, EHLO_PLAIN, AUTH_SUCCEEDED, CLOSING],
}
