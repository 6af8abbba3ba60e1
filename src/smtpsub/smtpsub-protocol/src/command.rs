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

use smtpsub_common::{auth::Mechanism, ClientName};

/// Buffer received from the client.
pub struct UnparsedArgs(pub Vec<u8>);
/// A command received from the client, and its unparsed arguments.
pub type Command<Verb, Args> = (Verb, Args);

/// Information received from the client at the connection TCP/IP.
#[derive(Debug, Clone)]
pub struct AcceptArgs {
    /// Peer address of the connection.
    pub client_addr: std::net::SocketAddr,
    /// Address of the server which accepted the connection.
    pub server_addr: std::net::SocketAddr,
}

/// Properties of the TLS session, available after a successful handshake.
#[derive(Debug, Clone)]
pub struct TlsArgs {
    /// Server name indication sent by the client.
    pub sni: Option<String>,
    /// Negotiated protocol version.
    pub protocol_version: tokio_rustls::rustls::ProtocolVersion,
    /// Negotiated cipher suite.
    pub cipher_suite: tokio_rustls::rustls::CipherSuite,
    /// Certificate chain presented by the client, if any.
    pub peer_certificates: Option<Vec<tokio_rustls::rustls::Certificate>>,
}

/// Information received from the client at the HELO command.
pub struct HeloArgs {
    /// Name of the client.
    pub client_name: String,
}

/// Information received from the client at the EHLO command.
pub struct EhloArgs {
    /// Name of the client.
    pub client_name: ClientName,
}

/// Value of the `BODY=` parameter of `MAIL FROM`, see RFC6152.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, strum::EnumString, strum::Display, strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum MimeBodyType {
    ///
    #[strum(serialize = "7BIT")]
    SevenBit,
    ///
    #[strum(serialize = "8BITMIME")]
    EightBitMime,
}

/// Information received from the client at the MAIL FROM command.
pub struct MailFromArgs {
    /// Sender address, `None` for the null reverse path `<>`.
    pub reverse_path: Option<String>,
    /// Size of the message declared with `SIZE=`, see RFC1870.
    pub size: Option<usize>,
    /// Body type declared with `BODY=`.
    pub body: Option<MimeBodyType>,
}

/// Information received from the client at the RCPT TO command.
pub struct RcptToArgs {
    /// Recipient address.
    pub forward_path: String,
}

/// Information received from the client at the AUTH command.
pub struct AuthArgs {
    /// Authentication mechanism.
    pub mechanism: Mechanism,
    /// First buffer of the challenge, optionally issued by the server.
    /// [`base64`] encoded buffer.
    pub initial_response: Option<Vec<u8>>,
}

/// Error while parsing the arguments of a command.
#[derive(Debug, thiserror::Error)]
pub enum ParseArgsError {
    /// Non-UTF8 buffer.
    #[error("{0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// Invalid IP address.
    #[error("{0}")]
    BadTypeAddr(#[from] std::net::AddrParseError),
    /// The mechanism requested with `AUTH` is not supported.
    #[error("mechanism not supported: `{0}`")]
    UnsupportedMechanism(String),
    /// An ESMTP parameter is not supported.
    #[error("parameter not supported: `{0}`")]
    UnsupportedParameter(String),
    /// The command line is longer than the limit.
    #[error("buffer is not supposed to be longer than {expected} bytes but got {got}")]
    BufferTooLong {
        /// Maximum size expected.
        expected: usize,
        /// Actual size.
        got: usize,
    },
    /// Other syntax error.
    #[error("invalid arguments")]
    InvalidArgs,
}

fn strip_crlf(value: &[u8]) -> Result<&[u8], ParseArgsError> {
    value
        .strip_suffix(b"\r\n")
        .ok_or(ParseArgsError::InvalidArgs)
}

// NOTE: from [`[u8]::trim_ascii_start`]
const fn trim_ascii_start(slice: &[u8]) -> &[u8] {
    let mut bytes = slice;
    while let [first, rest @ ..] = bytes {
        if first.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}

const fn trim_ascii_end(slice: &[u8]) -> &[u8] {
    let mut bytes = slice;
    while let [rest @ .., last] = bytes {
        if last.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}

fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain.len() <= 255
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label
                    .bytes()
                    .all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_')
        })
}

/// Split `<path> [params...]` into the content of the path and the parameters.
fn parse_path_and_params(value: &[u8]) -> Result<(String, Vec<String>), ParseArgsError> {
    let value = trim_ascii_end(trim_ascii_start(strip_crlf(value)?));

    let value = value.strip_prefix(b"<").ok_or(ParseArgsError::InvalidArgs)?;
    let end = value
        .iter()
        .position(|c| *c == b'>')
        .ok_or(ParseArgsError::InvalidArgs)?;
    let (path, params) = (&value[..end], &value[end + 1..]);

    if path
        .iter()
        .any(|c| c.is_ascii_whitespace() || c.is_ascii_control() || *c == b'<')
    {
        return Err(ParseArgsError::InvalidArgs);
    }
    if !params.is_empty() && !params[0].is_ascii_whitespace() {
        return Err(ParseArgsError::InvalidArgs);
    }

    let params = String::from_utf8(params.to_vec())?
        .split_ascii_whitespace()
        .map(str::to_string)
        .collect();

    Ok((String::from_utf8(path.to_vec())?, params))
}

impl TryFrom<UnparsedArgs> for HeloArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let client_name =
            String::from_utf8(trim_ascii_end(trim_ascii_start(strip_crlf(&value.0)?)).to_vec())?;

        if client_name.is_empty() || client_name.contains(char::is_whitespace) {
            return Err(ParseArgsError::InvalidArgs);
        }

        Ok(Self { client_name })
    }
}

impl TryFrom<UnparsedArgs> for EhloArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let value =
            String::from_utf8(trim_ascii_end(trim_ascii_start(strip_crlf(&value.0)?)).to_vec())?;

        let client_name = match &value {
            ipv6 if ipv6.to_lowercase().starts_with("[ipv6:") && ipv6.ends_with(']') => {
                ClientName::Ip6(ipv6["[IPv6:".len()..ipv6.len() - 1].parse::<std::net::Ipv6Addr>()?)
            }
            ipv4 if ipv4.starts_with('[') && ipv4.ends_with(']') => {
                ClientName::Ip4(ipv4[1..ipv4.len() - 1].parse::<std::net::Ipv4Addr>()?)
            }
            domain if is_valid_domain(domain) => ClientName::Domain(domain.to_string()),
            _ => return Err(ParseArgsError::InvalidArgs),
        };

        Ok(Self { client_name })
    }
}

impl TryFrom<UnparsedArgs> for AuthArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let value = trim_ascii_end(strip_crlf(&value.0)?);

        let (mechanism, initial_response) = if let Some((idx, _)) = value
            .iter()
            .copied()
            .enumerate()
            .find(|(_, c)| c.is_ascii_whitespace())
        {
            let (mechanism, initial_response) = value.split_at(idx);
            (
                mechanism.to_vec(),
                Some(trim_ascii_start(initial_response).to_vec()),
            )
        } else {
            (value.to_vec(), None)
        };

        if mechanism.is_empty() {
            return Err(ParseArgsError::InvalidArgs);
        }

        let mechanism = String::from_utf8(mechanism)?;
        let mechanism = mechanism
            .parse()
            .map_err(|_| ParseArgsError::UnsupportedMechanism(mechanism))?;

        Ok(Self {
            mechanism,
            initial_response,
        })
    }
}

impl TryFrom<UnparsedArgs> for MailFromArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let (reverse_path, params) = parse_path_and_params(&value.0)?;

        let mut args = Self {
            reverse_path: if reverse_path.is_empty() {
                None
            } else {
                Some(reverse_path)
            },
            size: None,
            body: None,
        };

        for param in params {
            let (key, value) = param.split_once('=').unwrap_or((param.as_str(), ""));
            match key.to_ascii_uppercase().as_str() {
                "SIZE" if args.size.is_none() => {
                    args.size = Some(value.parse().map_err(|_| ParseArgsError::InvalidArgs)?);
                }
                "BODY" if args.body.is_none() => {
                    args.body = Some(value.parse().map_err(|_| ParseArgsError::InvalidArgs)?);
                }
                "SIZE" | "BODY" => return Err(ParseArgsError::InvalidArgs),
                _ => return Err(ParseArgsError::UnsupportedParameter(param)),
            }
        }

        Ok(args)
    }
}

impl TryFrom<UnparsedArgs> for RcptToArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let (forward_path, params) = parse_path_and_params(&value.0)?;

        if forward_path.is_empty() {
            return Err(ParseArgsError::InvalidArgs);
        }
        if let Some(param) = params.into_iter().next() {
            return Err(ParseArgsError::UnsupportedParameter(param));
        }

        Ok(Self { forward_path })
    }
}

/// SMTP Command.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::AsRefStr,
    strum::EnumString,
    strum::EnumVariantNames,
)]
pub enum Verb {
    /// Used to identify the SMTP client to the SMTP server. (historical)
    #[strum(serialize = "HELO ")]
    Helo,
    /// Used to identify the SMTP client to the SMTP server and request smtp extensions.
    #[strum(serialize = "EHLO ")]
    Ehlo,
    /// This command is used to initiate a mail transaction in which the mail
    /// data is delivered to an SMTP server.
    #[strum(serialize = "MAIL FROM:")]
    MailFrom,
    /// This command is used to identify an individual recipient of the mail
    /// data; multiple recipients are specified by multiple uses of this
    /// command.
    #[strum(serialize = "RCPT TO:")]
    RcptTo,
    /// This command causes the mail data to be appended to the mail data
    /// buffer.
    #[strum(serialize = "DATA\r\n")]
    Data,
    /// This command specifies that the receiver MUST send a "221 OK" reply,
    /// and then close the transmission channel.
    #[strum(serialize = "QUIT\r\n")]
    Quit,
    /// This command specifies that the current mail transaction will be
    /// aborted. Any stored sender, recipients, and mail data MUST be
    /// discarded.
    #[strum(serialize = "RSET\r\n")]
    Rset,
    /// This command does not affect any parameters or previously entered
    /// commands.
    #[strum(serialize = "NOOP\r\n")]
    Noop,
    /// See "Transport Layer Security"
    /// <https://datatracker.ietf.org/doc/html/rfc3207>
    #[strum(serialize = "STARTTLS\r\n")]
    StartTls,
    /// Authentication with SASL protocol
    /// <https://datatracker.ietf.org/doc/html/rfc4954>
    #[strum(serialize = "AUTH ")]
    Auth,
    /// Any other buffer received while expecting a command is considered an
    /// unknown.
    Unknown,
}

impl Verb {
    /// Split a command line into its verb and its arguments.
    #[must_use]
    pub fn parse_line(line: &[u8]) -> Command<Self, UnparsedArgs> {
        <Self as strum::VariantNames>::VARIANTS
            .iter()
            .zip(Self::ALL)
            .find(|(i, verb)| {
                *verb != Self::Unknown
                    && line.len() >= i.len()
                    && line[..i.len()].eq_ignore_ascii_case(i.as_bytes())
            })
            .map_or_else(
                || (Self::Unknown, UnparsedArgs(line.to_vec())),
                |(prefix, verb)| (verb, UnparsedArgs(line[prefix.len()..].to_vec())),
            )
    }

    const ALL: [Self; 11] = [
        Self::Helo,
        Self::Ehlo,
        Self::MailFrom,
        Self::RcptTo,
        Self::Data,
        Self::Quit,
        Self::Rset,
        Self::Noop,
        Self::StartTls,
        Self::Auth,
        Self::Unknown,
    ];
}
