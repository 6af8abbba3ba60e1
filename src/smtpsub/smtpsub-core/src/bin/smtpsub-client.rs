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

use anyhow::Context;
use smtpsub::ClientArgs;
use smtpsub_client::{send_mail, Envelope};

fn main() {
    if let Err(err) = try_main() {
        smtpsub::exit_with_error("smtpsub-client", &err);
    }
}

fn try_main() -> anyhow::Result<()> {
    let args = <ClientArgs as clap::Parser>::parse();

    if args.version {
        println!("{} v{}", clap::crate_name!(), clap::crate_version!());
        return Ok(());
    }

    let mut config = smtpsub::load_config(args.config.as_deref())?.client;
    args.apply(&mut config);

    smtpsub::tracing_subscriber::initialize(&config.logs)?;

    let envelope = Envelope::from(&config.envelope);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(send_mail(&config, &envelope))
        .with_context(|| format!("Submission to '{}' failed", config.addr))?;

    println!(
        "Message from <{}> accepted for {} recipient(s).",
        envelope.reverse_path,
        envelope.forward_paths.len()
    );
    Ok(())
}
