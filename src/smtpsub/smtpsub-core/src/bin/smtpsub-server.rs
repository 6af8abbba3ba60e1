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

use smtpsub::{Args, Commands};
use smtpsub_server::{socket_bind_anyhow, LoggingBackend, Server};

fn main() {
    if let Err(err) = try_main() {
        smtpsub::exit_with_error("smtpsub-server", &err);
    }
}

fn try_main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();

    if args.version {
        println!("{} v{}", clap::crate_name!(), clap::crate_version!());
        return Ok(());
    }

    let config = smtpsub::load_config(args.config.as_deref())?;

    if let Some(command) = args.command {
        match command {
            Commands::ConfigShow => {
                let stringified = smtpsub::config_show(&config)?;
                println!("Loaded configuration: {stringified}");
                return Ok(());
            }
            _ => unreachable!("unhandled `Commands` variant"),
        }
    }

    smtpsub::tracing_subscriber::initialize(&config.server.logs)?;
    tracing::info!(level = ?config.server.logs.level, "smtpsub logs initialized.");

    let socket = socket_bind_anyhow(config.server.addr)?;

    let config = std::sync::Arc::new(config);
    let backend = std::sync::Arc::new(LoggingBackend::from_config(&config));
    let server = Server::new(config, backend)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("smtpsub-server")
        .build()?
        .block_on(server.listen_and_serve(socket, async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "Failed to listen for the shutdown signal.");
                std::future::pending::<()>().await;
            }
        }))
}
