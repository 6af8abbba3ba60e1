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

/// Identifier of every reply the server can send, the text being resolved
/// through the configuration.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    serde::Deserialize,
    serde::Serialize,
    strum::EnumString,
    strum::EnumVariantNames,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
#[must_use]
pub enum CodeID {
    //
    // Specials Messages
    //
    /// First message sent by the server
    Greetings,
    ///
    Closing,
    ///
    Helo,
    /// Reply to `EHLO` on a clear text channel, generated from the configuration.
    EhloPlain,
    /// Reply to `EHLO` on a TLS channel, generated from the configuration.
    EhloSecured,
    ///
    DataStart,
    //
    // SessionStatus
    //
    /// Accepted
    Ok,
    /// Default reply of a backend refusal.
    Denied,
    ///
    Failure,
    //
    // Parsing Command
    //
    ///
    UnrecognizedCommand,
    /// Command or body line over the maximum length.
    LineTooLong,
    ///
    SyntaxErrorParams,
    ///
    ParameterUnimplemented,
    ///
    Unimplemented,
    ///
    BadSequence,
    ///
    MessageSizeExceeded,
    ///
    TooManyRecipients,
    //
    // TLS extension
    //
    /// The tls handshake can start (STARTTLS)
    TlsGoAhead,
    ///
    TlsNotAvailable,
    ///
    AlreadyUnderTLS,
    //
    // Auth extension
    //
    ///
    AuthSucceeded,
    ///
    AuthMechNotSupported,
    ///
    AuthClientMustNotStart,
    /// `AUTH` on a clear text channel while insecure authentication is disabled.
    AuthMechanismMustBeEncrypted,
    ///
    AuthInvalidCredentials,
    /// The client tried to open a transaction without being authenticated.
    AuthRequired,
    ///
    AuthClientCanceled,
    ///
    AuthErrorDecode64,
    ///
    AlreadyAuthenticated,
}

impl CodeID {
    /// Codes produced by the configuration itself and absent from the defaults.
    pub const GENERATED: [Self; 2] = [Self::EhloPlain, Self::EhloSecured];
}
