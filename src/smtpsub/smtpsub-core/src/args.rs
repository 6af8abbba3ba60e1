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

use smtpsub_config::field::FieldClient;

/// Arguments of `smtpsub-server`.
#[non_exhaustive]
#[derive(clap::Parser)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
#[clap(about, author)]
pub struct Args {
    /// Print the version and exit.
    #[clap(short, long, action)]
    pub version: bool,

    /// Path of the smtpsub configuration file (toml format)
    #[clap(short, long, action)]
    pub config: Option<String>,

    ///
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

///
#[non_exhaustive]
#[derive(clap::Subcommand)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
pub enum Commands {
    /// Show the loaded config (as serialized json format)
    ConfigShow,
}

/// Arguments of `smtpsub-client`, overriding the `client` section of the configuration.
#[non_exhaustive]
#[derive(clap::Parser)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
#[clap(about, author)]
pub struct ClientArgs {
    /// Print the version and exit.
    #[clap(short, long, action)]
    pub version: bool,

    /// Path of the smtpsub configuration file (toml format)
    #[clap(short, long, action)]
    pub config: Option<String>,

    /// Address of the server (`host:port`)
    #[clap(long, action)]
    pub addr: Option<String>,

    /// Reverse path of the envelope, empty for `<>`
    #[clap(long, action)]
    pub from: Option<String>,

    /// Forward path of the envelope, can be repeated
    #[clap(long, action = clap::ArgAction::Append)]
    pub to: Vec<String>,

    /// Body of the message
    #[clap(long, action)]
    pub body: Option<String>,
}

impl ClientArgs {
    /// Replace the fields of `config` provided on the command line.
    pub fn apply(&self, config: &mut FieldClient) {
        if let Some(addr) = &self.addr {
            config.addr = addr.clone();
        }
        if let Some(from) = &self.from {
            config.envelope.reverse_path = from.clone();
        }
        if !self.to.is_empty() {
            config.envelope.forward_paths = self.to.clone();
        }
        if let Some(body) = &self.body {
            config.envelope.body = body.clone();
        }
    }
}
