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

use smtpsub_common::{CodeID, Reply};

/// This structure contains all the field to configure the harness, the server and the client
/// side. See [`crate::Config::from_toml`].
///
/// All field are optional and defaulted if missing, except `version_requirement`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Version requirement to parse this configuration file.
    pub version_requirement: semver::VersionReq,
    /// see [`field::FieldServer`]
    #[serde(default)]
    pub server: field::FieldServer,
    /// see [`field::FieldClient`]
    #[serde(default)]
    pub client: field::FieldClient,
}

/// The inner field of the configuration.
#[allow(clippy::module_name_repetitions)]
pub mod field {
    use super::{CodeID, Reply};

    /// The field related to the receiving side.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServer {
        /// Domain announced in the greeting and the `EHLO` reply.
        ///
        /// default: `localhost`
        #[serde(default = "FieldServer::default_name")]
        pub name: String,
        /// Address the listener is bound to.
        ///
        /// default: `127.0.0.1:1025`
        #[serde(default = "FieldServer::default_addr")]
        pub addr: std::net::SocketAddr,
        /// see [`FieldLogs`]
        #[serde(default)]
        pub logs: FieldLogs,
        /// see [`FieldServerSMTP`]
        #[serde(default)]
        pub smtp: FieldServerSMTP,
        /// see [`FieldServerTls`], `STARTTLS` is not advertised without it.
        #[serde(default)]
        pub tls: Option<FieldServerTls>,
        /// Accounts accepted by the logging backend.
        #[serde(default = "FieldServer::default_accounts")]
        pub accounts: Vec<FieldAccount>,
    }

    /// A pair of credentials.
    #[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldAccount {
        ///
        pub username: String,
        ///
        pub password: String,
    }

    impl std::fmt::Debug for FieldAccount {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FieldAccount")
                .field("username", &self.username)
                .finish_non_exhaustive()
        }
    }

    /// Logging policy of a binary.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldLogs {
        /// Customize the log level of the different part of the program.
        ///
        /// See <https://docs.rs/tracing-subscriber/0.3.15/tracing_subscriber/filter/struct.EnvFilter.html>
        #[serde(
            default = "FieldLogs::default_level",
            serialize_with = "crate::parser::tracing_directive::serialize",
            deserialize_with = "crate::parser::tracing_directive::deserialize"
        )]
        pub level: Vec<tracing_subscriber::filter::Directive>,
    }

    /// Configuration of the SMTP session engine.
    #[serde_with::serde_as]
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSMTP {
        /// Every read on the connection must complete before this delay,
        /// the connection is closed without reply otherwise.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldServerSMTP::default_read_timeout")]
        pub read_timeout: std::time::Duration,
        /// Every write on the connection must complete before this delay.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldServerSMTP::default_write_timeout")]
        pub write_timeout: std::time::Duration,
        /// Maximum size in bytes of the (unstuffed) message, producing a [`CodeID::MessageSizeExceeded`].
        #[serde(default = "FieldServerSMTP::default_message_size_limit")]
        pub message_size_limit: usize,
        /// Maximum number of recipients received in the envelop, extra recipient will produce an [`CodeID::TooManyRecipients`].
        #[serde(default = "FieldServerSMTP::default_rcpt_count_max")]
        pub rcpt_count_max: usize,
        /// Accept `AUTH` on a clear text channel.
        #[serde(default = "FieldServerSMTP::default_allow_insecure_auth")]
        pub allow_insecure_auth: bool,
        /// Dictionary of the reply sent by the server during the SMTP transaction.
        #[serde(default)]
        #[serde_as(as = "std::collections::BTreeMap<serde_with::DisplayFromStr, _>")]
        pub codes: std::collections::BTreeMap<CodeID, Reply>,
    }

    #[doc(hidden)]
    #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
    #[serde(transparent, deny_unknown_fields)]
    pub struct SecretFile<T> {
        #[serde(skip_serializing)]
        pub inner: T,
        pub path: std::path::PathBuf,
    }

    /// The TLS parameter of the receiving side.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerTls {
        /// Timeout for the TLS handshake, the connection is dropped silently after it.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldServerTls::default_handshake_timeout")]
        pub handshake_timeout: std::time::Duration,
        /// Certificate chain to use for the TLS connection (PEM).
        pub certificate: SecretFile<Vec<rustls::Certificate>>,
        /// Private key to use for the TLS connection (PEM).
        pub private_key: SecretFile<rustls::PrivateKey>,
    }

    /// The field related to the submitting side.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldClient {
        /// Address to dial (`host:port`).
        #[serde(default = "FieldClient::default_addr")]
        pub addr: String,
        /// Name announced in `EHLO`.
        #[serde(default = "FieldClient::default_client_name")]
        pub client_name: String,
        /// Delay to establish the TCP connection and receive the banner.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldClient::default_dial_timeout")]
        pub dial_timeout: std::time::Duration,
        ///
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldClient::default_read_timeout")]
        pub read_timeout: std::time::Duration,
        ///
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldClient::default_write_timeout")]
        pub write_timeout: std::time::Duration,
        /// Send the credentials on a clear text channel.
        #[serde(default)]
        pub allow_insecure_auth: bool,
        /// see [`FieldLogs`]
        #[serde(default)]
        pub logs: FieldLogs,
        /// see [`FieldClientTls`]
        #[serde(default)]
        pub tls: FieldClientTls,
        /// Credentials used with `AUTH PLAIN`, the step is skipped if missing.
        #[serde(default = "FieldClient::default_credentials")]
        pub credentials: Option<FieldClientCredentials>,
        /// see [`FieldClientEnvelope`]
        #[serde(default)]
        pub envelope: FieldClientEnvelope,
    }

    /// TLS policy of the submitting side.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldClientTls {
        /// Issue `STARTTLS` after the first `EHLO`.
        #[serde(default = "FieldClientTls::default_starttls")]
        pub starttls: bool,
        /// Name sent in the SNI extension and verified against the certificate.
        #[serde(default = "FieldClientTls::default_server_name")]
        pub server_name: String,
        /// Accept any certificate, for test purposes only.
        #[serde(default)]
        pub insecure_skip_verify: bool,
        /// Trust anchors (PEM), used when the verification is enabled.
        #[serde(default)]
        pub root_certificate: Option<SecretFile<Vec<rustls::Certificate>>>,
    }

    /// Credentials of `AUTH PLAIN`: `\0authzid\0authcid\0passwd`.
    #[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldClientCredentials {
        ///
        #[serde(default)]
        pub authzid: String,
        ///
        pub authcid: String,
        ///
        pub passwd: String,
    }

    impl std::fmt::Debug for FieldClientCredentials {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FieldClientCredentials")
                .field("authzid", &self.authzid)
                .field("authcid", &self.authcid)
                .finish_non_exhaustive()
        }
    }

    /// The message submitted by the client binary.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldClientEnvelope {
        /// Empty for a null reverse path.
        #[serde(default = "FieldClientEnvelope::default_reverse_path")]
        pub reverse_path: String,
        ///
        #[serde(default = "FieldClientEnvelope::default_forward_paths")]
        pub forward_paths: Vec<String>,
        /// Body of the message, sent dot-stuffed.
        #[serde(default = "FieldClientEnvelope::default_body")]
        pub body: String,
    }
}
