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

use crate::field::{FieldClientTls, FieldServerTls};

struct TlsLogger;
impl rustls::KeyLog for TlsLogger {
    fn log(&self, label: &str, client_random: &[u8], secret: &[u8]) {
        tracing::trace!(label, ?client_random, ?secret);
    }
}

#[doc(hidden)]
pub fn get_rustls_config(config: &FieldServerTls) -> anyhow::Result<rustls::ServerConfig> {
    let mut tls_config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(
            config.certificate.inner.clone(),
            config.private_key.inner.clone(),
        )
        .map_err(|e| anyhow::anyhow!("cannot initialize tls config: '{e}'"))?;

    tls_config.key_log = std::sync::Arc::new(TlsLogger {});

    Ok(tls_config)
}

/// Accept every certificate presented by the server.
struct NoVerification;

impl rustls::client::ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::Certificate,
        _intermediates: &[rustls::Certificate],
        _server_name: &rustls::ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: std::time::SystemTime,
    ) -> Result<rustls::client::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::ServerCertVerified::assertion())
    }
}

#[doc(hidden)]
pub fn get_rustls_client_config(config: &FieldClientTls) -> anyhow::Result<rustls::ClientConfig> {
    let builder = rustls::ClientConfig::builder().with_safe_defaults();

    let mut tls_config = if config.insecure_skip_verify {
        builder
            .with_custom_certificate_verifier(std::sync::Arc::new(NoVerification))
            .with_no_client_auth()
    } else {
        let mut roots = rustls::RootCertStore::empty();
        for i in config
            .root_certificate
            .as_ref()
            .map(|chain| chain.inner.as_slice())
            .unwrap_or_default()
        {
            roots
                .add(i)
                .map_err(|e| anyhow::anyhow!("cannot add root certificate: '{e:?}'"))?;
        }
        anyhow::ensure!(
            !roots.is_empty(),
            "tls verification is enabled but no root certificate is configured"
        );
        builder
            .with_root_certificates(roots)
            .with_no_client_auth()
    };

    tls_config.key_log = std::sync::Arc::new(TlsLogger {});

    Ok(tls_config)
}
