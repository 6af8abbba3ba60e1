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

/// Progression of a SMTP transaction on the receiving side.
///
/// Authentication is orthogonal to the stage: it is tracked by the handler.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Greeting sent, waiting for `HELO` / `EHLO`.
    /// This is also the stage right after a successful `STARTTLS`.
    Connect,
    /// `HELO` / `EHLO` received, no transaction in progress.
    Helo,
    /// A reverse path has been accepted.
    MailFrom,
    /// At least one forward path has been accepted.
    RcptTo,
}

impl Stage {
    /// Is a mail transaction (envelope) in progress.
    #[must_use]
    pub const fn in_transaction(self) -> bool {
        matches!(self, Self::MailFrom | Self::RcptTo)
    }
}

#[cfg(test)]
mod tests {
    use super::Stage;

    #[rstest::rstest]
    #[case(Stage::Connect, false)]
    #[case(Stage::Helo, false)]
    #[case(Stage::MailFrom, true)]
    #[case(Stage::RcptTo, true)]
    fn transaction(#[case] stage: Stage, #[case] expected: bool) {
        pretty_assertions::assert_eq!(stage.in_transaction(), expected);
    }

    #[test]
    fn ordering() {
        assert!(Stage::Connect < Stage::Helo);
        assert!(Stage::MailFrom < Stage::RcptTo);
        assert_eq!(Stage::RcptTo.to_string(), "rcpt_to");
    }
}
