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

use smtpsub_config::field::FieldLogs;

#[cfg(debug_assertions)]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(true)
            .with_ansi(false)
    };
}

#[cfg(not(debug_assertions))]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_thread_ids(false)
            .with_target(false)
            .with_ansi(false)
    };
}

fn env_filter(logs: &FieldLogs) -> tracing_subscriber::EnvFilter {
    logs.level
        .iter()
        .fold(tracing_subscriber::EnvFilter::default(), |filter, directive| {
            filter.add_directive(directive.clone())
        })
}

/// Initialize the tracing subsystem, writing to stdout.
///
/// # Errors
///
/// * Failed to initialize the tracing subsystem, a global subscriber is already set.
pub fn initialize(logs: &FieldLogs) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(env_filter(logs))
        .with(get_fmt!().with_writer(std::io::stdout).with_ansi(true))
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))
}
