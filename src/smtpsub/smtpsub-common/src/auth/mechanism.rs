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

/// List of supported SASL Mechanism
/// See <https://www.iana.org/assignments/sasl-mechanisms/sasl-mechanisms.xhtml>
#[derive(
    Debug,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    PartialOrd,
    Ord,
    strum::EnumIter,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "SCREAMING-KEBAB-CASE", ascii_case_insensitive)]
pub enum Mechanism {
    /// See <https://datatracker.ietf.org/doc/html/rfc4616>
    Plain,
}

impl serde::Serialize for Mechanism {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_ref())
    }
}

impl<'de> serde::Deserialize<'de> for Mechanism {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        <String as serde::Deserialize>::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

impl Mechanism {
    /// Does this mechanism must be under TLS (STARTTLS or Tunnel)
    #[must_use]
    pub const fn must_be_under_tls(self) -> bool {
        match self {
            Self::Plain => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Mechanism;

    #[rstest::rstest]
    #[case("PLAIN")]
    #[case("plain")]
    #[case("Plain")]
    fn parse(#[case] input: &str) {
        pretty_assertions::assert_eq!(input.parse::<Mechanism>().unwrap(), Mechanism::Plain);
    }

    #[test]
    fn to_str() {
        assert_eq!(Mechanism::Plain.to_string(), "PLAIN");
    }

    #[test]
    fn serialize() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct S {
            v: Mechanism,
        }

        for i in <Mechanism as strum::IntoEnumIterator>::iter() {
            let s = serde_json::to_string(&S { v: i }).unwrap();
            let s = serde_json::from_str::<S>(&s).unwrap();
            assert_eq!(s.v, i);
        }
    }

    #[rstest::rstest]
    #[case("LOGIN")]
    #[case("CRAM-MD5")]
    #[case("foobar")]
    fn unsupported(#[case] input: &str) {
        assert!(input.parse::<Mechanism>().is_err());
    }
}
