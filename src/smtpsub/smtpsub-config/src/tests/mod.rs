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

mod root_example {
    mod codes;
    mod minimal;
    mod tls;
}

pub const CERTIFICATE: &str =
    include_str!("../../../smtpsub-test/src/template/certs/certificate.crt");
pub const PRIVATE_KEY: &str =
    include_str!("../../../smtpsub-test/src/template/certs/private_key.pkcs8.key");

#[test]
fn version_requirement_not_fulfilled() {
    let error = crate::Config::from_toml(r#"version_requirement = ">=2.0.0""#).unwrap_err();
    assert!(error.to_string().contains("Version requirement not fulfilled"));
}

#[test]
fn unknown_field() {
    crate::Config::from_toml(
        r#"
version_requirement = ">=0.1.0"

[server]
foo = "bar"
"#,
    )
    .unwrap_err();
}

#[test]
fn zero_limit() {
    crate::Config::from_toml(
        r#"
version_requirement = ">=0.1.0"

[server.smtp]
rcpt_count_max = 0
"#,
    )
    .unwrap_err();
}

#[test]
fn server_only_without_recipient() {
    let config = crate::Config::from_toml(
        r#"
version_requirement = ">=0.1.0"

[client.envelope]
forward_paths = []
"#,
    )
    .unwrap();
    assert!(config.client.envelope.forward_paths.is_empty());
}

#[test]
fn serialize_and_parse_again() {
    let config = crate::Config::default();
    let toml = toml::to_string(&config).unwrap();
    pretty_assertions::assert_eq!(crate::Config::from_toml(&toml).unwrap(), config);
}
