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

/// Codes as the start of each lines of a reply
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum ReplyCode {
    /// simple Reply Code as defined in RFC5321
    Code {
        // https://datatracker.ietf.org/doc/html/rfc5321#section-4.2
        /// code base
        code: u16,
    },
    /// enhanced codes
    Enhanced {
        /// code base
        code: u16,
        /// enhanced status code (`class.subject.detail`), see RFC3463
        enhanced: String,
    },
}

impl ReplyCode {
    ///
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.value() / 100 >= 4
    }

    /// The reply is a `2yz` code.
    #[must_use]
    pub fn is_positive_completion(&self) -> bool {
        self.value() / 100 == 2
    }

    /// The reply is a `3yz` code.
    #[must_use]
    pub fn is_positive_intermediate(&self) -> bool {
        self.value() / 100 == 3
    }

    /// Return the underlying value of the reply code
    #[must_use]
    pub fn value(&self) -> u16 {
        match self {
            Self::Code { code, .. } | Self::Enhanced { code, .. } => *code,
        }
    }

    /// Return the enhanced value of the reply code
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Enhanced { enhanced, .. } => Some(enhanced),
            Self::Code { .. } => None,
        }
    }

    fn parse_enhanced(word: &str) -> Option<String> {
        let mut digits = word.splitn(3, '.').map(str::parse::<u16>);
        let (a, b, c) = (
            digits.next()?.ok()?,
            digits.next()?.ok()?,
            digits.next()?.ok()?,
        );
        Some(format!("{a}.{b}.{c}"))
    }

    /// Split one line of a reply into its code, whether it is the last line, and its text.
    pub(super) fn from_line(line: &str) -> anyhow::Result<(Self, bool, String)> {
        let code = line
            .get(..3)
            .filter(|code| code.bytes().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| anyhow::anyhow!("cannot parse {line:?}: missing reply code"))?
            .parse::<u16>()?;

        let is_last = match line.get(3..4) {
            None | Some(" ") => true,
            Some("-") => false,
            Some(_) => anyhow::bail!("cannot parse {line:?}: invalid separator"),
        };
        let rest = line.get(4..).unwrap_or_default();

        let (word, after) = rest.split_once(' ').unwrap_or((rest, ""));
        Ok(match Self::parse_enhanced(word) {
            Some(enhanced) => (Self::Enhanced { code, enhanced }, is_last, after.to_string()),
            None => (Self::Code { code }, is_last, rest.to_string()),
        })
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code { code } => f.write_fmt(format_args!("{code}")),
            Self::Enhanced { code, enhanced } => f.write_fmt(format_args!("{code} {enhanced}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ReplyCode;

    #[rstest::rstest]
    #[case("250", (&ReplyCode::Code { code: 250 }, true, ""), "250")]
    #[case(
        "504 5.5.4 Mechanism is not supported",
        (&ReplyCode::Enhanced { code: 504, enhanced: "5.5.4".to_string() }, true, "Mechanism is not supported"),
        "504 5.5.4",
    )]
    #[case(
        "250-2.0.0 ",
        (&ReplyCode::Enhanced { code: 250, enhanced: "2.0.0".to_string() }, false, ""),
        "250 2.0.0",
    )]
    #[case(
        "250-testserver.com",
        (&ReplyCode::Code { code: 250 }, false, "testserver.com"),
        "250",
    )]
    #[case(
        "250 SIZE 1048576",
        (&ReplyCode::Code { code: 250 }, true, "SIZE 1048576"),
        "250",
    )]
    fn parse_line(
        #[case] input: &str,
        #[case] expected: (&ReplyCode, bool, &str),
        #[case] to_string: &str,
    ) {
        let (code, is_last, text) = ReplyCode::from_line(input).unwrap();
        pretty_assertions::assert_eq!(code, *expected.0);
        pretty_assertions::assert_eq!(is_last, expected.1);
        pretty_assertions::assert_eq!(text, expected.2);
        pretty_assertions::assert_eq!(code.to_string(), to_string);
    }

    #[rstest::rstest]
    #[case("")]
    #[case("25")]
    #[case("abc hello")]
    #[case("250*hello")]
    fn invalid_line(#[case] input: &str) {
        assert!(ReplyCode::from_line(input).is_err());
    }

    #[test]
    fn classes() {
        let code = ReplyCode::Code { code: 354 };
        assert!(code.is_positive_intermediate());
        assert!(!code.is_positive_completion());
        assert!(!code.is_error());
        assert!(ReplyCode::Code { code: 452 }.is_error());
        assert_eq!(ReplyCode::Code { code: 235 }.details(), None);
    }
}
