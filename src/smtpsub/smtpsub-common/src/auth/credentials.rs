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

use super::Mechanism;

/// Error while extracting the credentials of a SASL exchange.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A property required by the mechanism was not provided by the client.
    #[error("missing required field")]
    MissingField,
    /// The password is not valid UTF-8.
    #[error("field is not utf8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// The mechanism is not handled.
    #[error("mechanism unsupported: `{0}`")]
    UnsupportedMechanism(String),
}

/// The credentials send by the client, not necessarily the right one
#[derive(Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Credentials {
    /// Authorization identity, the identity to act as (empty means "same as `authid`").
    pub authzid: Option<String>,
    /// Authentication identity.
    pub authid: String,
    ///
    pub authpass: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("authzid", &self.authzid)
            .field("authid", &self.authid)
            .field("authpass", &"***")
            .finish()
    }
}

impl TryFrom<(&rsasl::callback::SessionData, &rsasl::callback::Context<'_>)> for Credentials {
    type Error = Error;

    fn try_from(
        (session_data, context): (&rsasl::callback::SessionData, &rsasl::callback::Context<'_>),
    ) -> Result<Self, Self::Error> {
        let mechanism = session_data.mechanism().mechanism.as_str();
        if mechanism != Mechanism::Plain.as_ref() {
            return Err(Error::UnsupportedMechanism(mechanism.to_string()));
        }

        Ok(Self {
            authzid: context
                .get_ref::<rsasl::property::AuthzId>()
                .filter(|authzid| !authzid.is_empty())
                .map(str::to_string),
            authid: context
                .get_ref::<rsasl::property::AuthId>()
                .ok_or(Error::MissingField)?
                .to_string(),
            authpass: std::str::from_utf8(
                context
                    .get_ref::<rsasl::property::Password>()
                    .ok_or(Error::MissingField)?,
            )?
            .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Credentials;

    #[test]
    fn debug_hides_password() {
        let credentials = Credentials {
            authzid: None,
            authid: "username".to_string(),
            authpass: "password".to_string(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("username"));
        assert!(!debug.contains("password\""));
    }
}
