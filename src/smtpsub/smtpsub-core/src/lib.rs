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

//! smtpsub executables
//!
//! `smtpsub-server` listens for submissions and logs every accepted envelope,
//! `smtpsub-client` submits one message as described by the configuration.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::doc_markdown)]
#![allow(clippy::multiple_crate_versions)]

mod args;

///
pub mod tracing_subscriber;

pub use args::{Args, ClientArgs, Commands};

/// Load the configuration at `path`, or the default one.
///
/// # Errors
///
/// * the file cannot be read
/// * the file is not a valid configuration
pub fn load_config(path: Option<&str>) -> anyhow::Result<smtpsub_config::Config> {
    use anyhow::Context;

    path.map_or_else(
        || Ok(smtpsub_config::Config::default()),
        |path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read file '{path}'"))
                .and_then(|f| {
                    smtpsub_config::Config::from_toml(&f).context("File contains format error")
                })
                .context("Cannot parse the configuration")
        },
    )
}

const REDACTED: &str = "********";

/// Render the configuration as JSON, the passwords being masked.
///
/// # Errors
///
/// * the configuration cannot be serialized
pub fn config_show(config: &smtpsub_config::Config) -> anyhow::Result<String> {
    let mut config = config.clone();
    for account in &mut config.server.accounts {
        account.password = REDACTED.to_string();
    }
    if let Some(credentials) = &mut config.client.credentials {
        credentials.passwd = REDACTED.to_string();
    }

    Ok(serde_json::to_string_pretty(&config)?)
}

/// Print the error and its causes to stderr and to the logs, then exit with `1`.
pub fn exit_with_error(bin: &str, err: &anyhow::Error) -> ! {
    let error = format!("{bin} terminating error: '{err}'");

    eprintln!("{error}");
    tracing::error!(error);
    err.chain().skip(1).for_each(|cause| {
        let reason = format!("because: {cause}");

        eprintln!("{reason}");
        tracing::error!(reason);
    });
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::{config_show, load_config};

    #[test]
    fn default_config() {
        pretty_assertions::assert_eq!(load_config(None).unwrap(), smtpsub_config::Config::default());
    }

    #[test]
    fn config_show_masks_passwords() {
        let config = smtpsub_config::Config::default();
        let shown: serde_json::Value = serde_json::from_str(&config_show(&config).unwrap()).unwrap();

        pretty_assertions::assert_eq!(shown["server"]["accounts"][0]["username"], "username");
        pretty_assertions::assert_eq!(shown["server"]["accounts"][0]["password"], "********");
        pretty_assertions::assert_eq!(shown["client"]["credentials"]["authcid"], "username");
        pretty_assertions::assert_eq!(shown["client"]["credentials"]["passwd"], "********");
        pretty_assertions::assert_eq!(shown["server"]["name"], "localhost");

        pretty_assertions::assert_eq!(config.server.accounts[0].password, "password");
    }

    #[test]
    fn missing_file() {
        let error = load_config(Some("./does-not-exist.toml")).unwrap_err();
        pretty_assertions::assert_eq!(error.to_string(), "Cannot parse the configuration");
        pretty_assertions::assert_eq!(
            error.chain().nth(1).map(ToString::to_string),
            Some("Cannot read file './does-not-exist.toml'".to_string())
        );
    }
}
