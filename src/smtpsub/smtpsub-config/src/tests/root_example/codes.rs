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

use crate::Config;
use smtpsub_common::{CodeID, ReplyCode};

#[test]
fn parse() {
    let toml = include_str!("../../../../../../demos/config/codes.toml");
    let config = Config::from_toml(toml).unwrap();

    pretty_assertions::assert_eq!(config.server.name, "my.fqdn.com");
    pretty_assertions::assert_eq!(
        config.server.smtp.codes[&CodeID::Greetings].to_string(),
        "220 my.fqdn.com ESMTP submission harness ready\r\n"
    );
    pretty_assertions::assert_eq!(
        *config.server.smtp.codes[&CodeID::Denied].code(),
        ReplyCode::Enhanced {
            code: 550,
            enhanced: "5.7.1".to_string()
        }
    );
    pretty_assertions::assert_eq!(
        config.server.smtp.codes[&CodeID::Closing].to_string(),
        "221 Service closing transmission channel\r\n"
    );
}
