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

use super::envelope;
use crate::{
    config::{local_client, with_tls},
    recorder::RecordingBackend,
};
use smtpsub_server::{socket_bind_anyhow, Server};

/// A server listening on a random port of the loopback.
pub(super) struct Running {
    pub(super) addr: std::net::SocketAddr,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Running {
    pub(super) fn start(backend: &RecordingBackend) -> Self {
        let config = std::sync::Arc::new(with_tls());
        let server = Server::new(config, std::sync::Arc::new(backend.clone())).unwrap();

        let socket = socket_bind_anyhow("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();

        let (shutdown, signal) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.listen_and_serve(socket, async move {
            let _ = signal.await;
        }));

        Self {
            addr,
            shutdown,
            handle,
        }
    }

    pub(super) async fn stop(self) {
        self.shutdown.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn send_mail() {
    let backend = RecordingBackend::new();
    let server = Running::start(&backend);

    smtpsub_client::send_mail(&local_client(server.addr), &envelope(b"Hello\r\n"))
        .await
        .unwrap();

    server.stop().await;
    pretty_assertions::assert_eq!(backend.bodies(), vec![b"Hello\r\n".to_vec()]);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_clients() {
    let backend = RecordingBackend::new();
    let server = Running::start(&backend);

    let mut clients = tokio::task::JoinSet::new();
    for i in 0..5 {
        let config = local_client(server.addr);
        clients.spawn(async move {
            smtpsub_client::send_mail(&config, &envelope(format!("message {i}\r\n").as_bytes()))
                .await
        });
    }
    while let Some(result) = clients.join_next().await {
        result.unwrap().unwrap();
    }

    server.stop().await;

    let mut bodies = backend
        .bodies()
        .into_iter()
        .map(|body| String::from_utf8(body).unwrap())
        .collect::<Vec<_>>();
    bodies.sort();
    pretty_assertions::assert_eq!(
        bodies,
        (0..5)
            .map(|i| format!("message {i}\r\n"))
            .collect::<Vec<_>>()
    );
}

#[test_log::test(tokio::test)]
async fn connection_refused() {
    let socket = socket_bind_anyhow("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();
    drop(socket);

    let error = smtpsub_client::send_mail(&local_client(addr), &envelope(b"Hello\r\n"))
        .await
        .unwrap_err();

    assert!(
        matches!(error, smtpsub_client::Error::Io(_) | smtpsub_client::Error::ConnectionClosed),
        "{error}"
    );
}
