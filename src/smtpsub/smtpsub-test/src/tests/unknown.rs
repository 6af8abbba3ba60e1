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

use super::{CLOSING, EHLO_PLAIN, GREETINGS, SYNTAX_ERROR};
use crate::run_test;

const UNIMPLEMENTED: &str = "502 Command not implemented\r\n";
const UNRECOGNIZED: &str = "500 Syntax error command unrecognized\r\n";

#[rstest::rstest]
#[case::vrfy("VRFY john@doe\r\n", UNIMPLEMENTED)]
#[case::expn("EXPN staff\r\n", UNIMPLEMENTED)]
#[case::help("HELP\r\n", UNIMPLEMENTED)]
#[case::bdat("BDAT 10 LAST\r\n", UNIMPLEMENTED)]
#[case::lowercase("vrfy john@doe\r\n", UNIMPLEMENTED)]
#[case::unknown("FOO bar\r\n", UNRECOGNIZED)]
#[case::empty_line("\r\n", UNRECOGNIZED)]
#[case::malformed_ehlo("EHLO\r\n", SYNTAX_ERROR)]
#[case::malformed_mail("MAIL <john@doe>\r\n", SYNTAX_ERROR)]
#[case::malformed_data("DATA now\r\n", SYNTAX_ERROR)]
#[case::malformed_starttls("STARTTLS now\r\n", SYNTAX_ERROR)]
#[tokio::test]
async fn not_handled(#[case] command: &str, #[case] reply: &str) {
    run_test!(
        input = ["EHLO client.com\r\n", command, "QUIT\r\n"],
        expected = [GREETINGS, EHLO_PLAIN, reply, CLOSING],
    )
    .unwrap();
}

run_test! {
    fn before_greeting,
    input = ["VRFY john@doe\r\n", "FOO\r\n", "EHLO client.com\r\n", "QUIT\r\n"],
    expected = [GREETINGS, UNIMPLEMENTED, UNRECOGNIZED, EHLO_PLAIN, CLOSING],
}

run_test! {
    fn unterminated_line_at_close,
    input = ["EHLO client.com\r\n", "QUI"],
    expected = [GREETINGS, EHLO_PLAIN],
}
