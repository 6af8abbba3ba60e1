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

use crate::{
    config::field::{
        FieldAccount, FieldClient, FieldClientCredentials, FieldClientEnvelope, FieldClientTls,
        FieldLogs, FieldServer, FieldServerSMTP, FieldServerTls,
    },
    Config,
};
use smtpsub_common::{CodeID, Reply};

impl Default for Config {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self::ensure(Self {
            version_requirement: semver::VersionReq::parse(">=0.1.0, <1.0.0")
                .expect("valid version requirement"),
            server: FieldServer::default(),
            client: FieldClient::default(),
        })
        .expect("default configuration is valid")
    }
}

impl Default for FieldServer {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            addr: Self::default_addr(),
            logs: FieldLogs::default(),
            smtp: FieldServerSMTP::default(),
            tls: None,
            accounts: Self::default_accounts(),
        }
    }
}

impl FieldServer {
    pub(crate) fn default_name() -> String {
        "localhost".to_string()
    }

    pub(crate) fn default_addr() -> std::net::SocketAddr {
        std::net::SocketAddr::from((
            std::net::Ipv4Addr::LOCALHOST,
            smtpsub_common::SUBMISSION_PORT,
        ))
    }

    pub(crate) fn default_accounts() -> Vec<FieldAccount> {
        vec![FieldAccount {
            username: "username".to_string(),
            password: "password".to_string(),
        }]
    }
}

impl Default for FieldLogs {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl FieldLogs {
    #[allow(clippy::expect_used)]
    pub(crate) fn default_level() -> Vec<tracing_subscriber::filter::Directive> {
        ["warn", "smtpsub=info"]
            .into_iter()
            .map(|d| d.parse().expect("hardcoded value is valid"))
            .collect()
    }
}

impl Default for FieldServerSMTP {
    fn default() -> Self {
        Self {
            read_timeout: Self::default_read_timeout(),
            write_timeout: Self::default_write_timeout(),
            message_size_limit: Self::default_message_size_limit(),
            rcpt_count_max: Self::default_rcpt_count_max(),
            allow_insecure_auth: Self::default_allow_insecure_auth(),
            codes: Self::default_smtp_codes(),
        }
    }
}

impl FieldServerSMTP {
    pub(crate) const fn default_read_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(60)
    }

    pub(crate) const fn default_write_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(60)
    }

    pub(crate) const fn default_message_size_limit() -> usize {
        1024 * 1024
    }

    pub(crate) const fn default_rcpt_count_max() -> usize {
        50
    }

    pub(crate) const fn default_allow_insecure_auth() -> bool {
        true
    }

    #[allow(clippy::expect_used)]
    pub(crate) fn default_smtp_codes() -> std::collections::BTreeMap<CodeID, Reply> {
        let codes = [
            (CodeID::Greetings, "220 {domain} Service ready\r\n"),
            (CodeID::Closing, "221 Service closing transmission channel\r\n"),
            (CodeID::Helo, "250 Ok\r\n"),
            (
                CodeID::DataStart,
                "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            ),
            (CodeID::Ok, "250 Ok\r\n"),
            (
                CodeID::Denied,
                "554 permanent problems with the remote server\r\n",
            ),
            (
                CodeID::Failure,
                "451 Requested action aborted: local error in processing\r\n",
            ),
            (
                CodeID::UnrecognizedCommand,
                "500 Syntax error command unrecognized\r\n",
            ),
            (CodeID::LineTooLong, "500 5.5.2 Line too long\r\n"),
            (
                CodeID::SyntaxErrorParams,
                "501 Syntax error in parameters or arguments\r\n",
            ),
            (
                CodeID::ParameterUnimplemented,
                "504 Command parameter not implemented\r\n",
            ),
            (CodeID::Unimplemented, "502 Command not implemented\r\n"),
            (CodeID::BadSequence, "503 Bad sequence of commands\r\n"),
            (
                CodeID::MessageSizeExceeded,
                "552 5.3.4 Message size exceeds fixed maximum message size\r\n",
            ),
            (
                CodeID::TooManyRecipients,
                "452 Requested action not taken: too many recipients\r\n",
            ),
            (CodeID::TlsGoAhead, "220 2.0.0 Ready to start TLS\r\n"),
            (
                CodeID::TlsNotAvailable,
                "454 TLS not available due to temporary reason\r\n",
            ),
            (
                CodeID::AlreadyUnderTLS,
                "554 5.5.1 Error: TLS already active\r\n",
            ),
            (
                CodeID::AuthSucceeded,
                "235 2.7.0 Authentication succeeded\r\n",
            ),
            (
                CodeID::AuthMechNotSupported,
                "504 5.5.4 Mechanism is not supported\r\n",
            ),
            (
                CodeID::AuthClientMustNotStart,
                "501 5.7.0 Client must not start with this mechanism\r\n",
            ),
            (
                CodeID::AuthMechanismMustBeEncrypted,
                "538 5.7.11 Encryption required for requested authentication mechanism\r\n",
            ),
            (
                CodeID::AuthInvalidCredentials,
                "535 5.7.8 Authentication credentials invalid\r\n",
            ),
            (
                CodeID::AuthRequired,
                "530 5.7.0 Authentication required\r\n",
            ),
            (
                CodeID::AuthClientCanceled,
                "501 Authentication canceled by client\r\n",
            ),
            (CodeID::AuthErrorDecode64, "501 5.5.2 Invalid, not base64\r\n"),
            (
                CodeID::AlreadyAuthenticated,
                "503 5.5.1 Error: already authenticated\r\n",
            ),
        ];

        codes
            .into_iter()
            .map(|(code, reply)| (code, reply.parse().expect("hardcoded value is valid")))
            .collect()
    }
}

impl FieldServerTls {
    pub(crate) const fn default_handshake_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(2)
    }
}

impl Default for FieldClient {
    fn default() -> Self {
        Self {
            addr: Self::default_addr(),
            client_name: Self::default_client_name(),
            dial_timeout: Self::default_dial_timeout(),
            read_timeout: Self::default_read_timeout(),
            write_timeout: Self::default_write_timeout(),
            logs: FieldLogs::default(),
            tls: FieldClientTls::default(),
            allow_insecure_auth: false,
            credentials: Self::default_credentials(),
            envelope: FieldClientEnvelope::default(),
        }
    }
}

impl FieldClient {
    pub(crate) fn default_addr() -> String {
        format!("127.0.0.1:{}", smtpsub_common::SUBMISSION_PORT)
    }

    pub(crate) fn default_client_name() -> String {
        "localhost".to_string()
    }

    pub(crate) const fn default_dial_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }

    pub(crate) const fn default_read_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(60)
    }

    pub(crate) const fn default_write_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(60)
    }

    #[allow(clippy::unnecessary_wraps)]
    pub(crate) fn default_credentials() -> Option<FieldClientCredentials> {
        Some(FieldClientCredentials {
            authzid: String::new(),
            authcid: "username".to_string(),
            passwd: "password".to_string(),
        })
    }
}

impl Default for FieldClientTls {
    fn default() -> Self {
        Self {
            starttls: Self::default_starttls(),
            server_name: Self::default_server_name(),
            insecure_skip_verify: false,
            root_certificate: None,
        }
    }
}

impl FieldClientTls {
    pub(crate) const fn default_starttls() -> bool {
        true
    }

    pub(crate) fn default_server_name() -> String {
        "localhost".to_string()
    }
}

impl Default for FieldClientEnvelope {
    fn default() -> Self {
        Self {
            reverse_path: Self::default_reverse_path(),
            forward_paths: Self::default_forward_paths(),
            body: Self::default_body(),
        }
    }
}

impl FieldClientEnvelope {
    pub(crate) fn default_reverse_path() -> String {
        "sender@example.com".to_string()
    }

    pub(crate) fn default_forward_paths() -> Vec<String> {
        vec!["recipient@example.com".to_string()]
    }

    pub(crate) fn default_body() -> String {
        "Subject: smtpsub\r\n\r\nHello World\r\n".to_string()
    }
}
