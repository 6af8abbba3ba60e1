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

use crate::{field::FieldServerSMTP, Config};
use smtpsub_common::{CodeID, Reply, ReplyCode};

impl Config {
    /// Validate the limits, fill the missing replies with their default and generate the
    /// replies to `EHLO` from the server parameters.
    ///
    /// Must be called again after a manual modification of the configuration. The
    /// `{domain}` placeholder of the replies is substituted by the first call, the name
    /// of the server cannot be changed afterward.
    ///
    /// # Errors
    ///
    /// * a limit is set to 0
    /// * a reply has been overridden with an invalid value
    /// * the enhanced status of a reply does not match the class of its code
    pub fn ensure(mut self) -> anyhow::Result<Self> {
        anyhow::ensure!(
            self.server.smtp.message_size_limit != 0,
            "server.smtp.message_size_limit cannot be set to 0"
        );
        anyhow::ensure!(
            self.server.smtp.rcpt_count_max != 0,
            "server.smtp.rcpt_count_max cannot be set to 0"
        );

        let default_values = FieldServerSMTP::default_smtp_codes();
        let codes = &mut self.server.smtp.codes;

        for key in <CodeID as strum::IntoEnumIterator>::iter() {
            if CodeID::GENERATED.contains(&key) {
                continue;
            }
            let reply = codes
                .remove(&key)
                .or_else(|| default_values.get(&key).cloned())
                .ok_or_else(|| anyhow::anyhow!("missing default reply for '{key}'"))?;

            if let Some(enhanced) = reply.code().details() {
                let class = (reply.code().value() / 100).to_string();
                anyhow::ensure!(
                    enhanced.split('.').next() == Some(class.as_str()),
                    "the reply for '{key}' has an enhanced status '{enhanced}' of another class than its code {}",
                    reply.code().value()
                );
            }

            codes.insert(key, reply.replace("{domain}", &self.server.name));
        }

        let size = format!("SIZE {}", self.server.smtp.message_size_limit);
        let ehlo = |lines: Vec<Option<String>>| {
            Reply::with_lines(
                ReplyCode::Code { code: 250 },
                lines.into_iter().flatten().collect(),
            )
        };

        codes.insert(
            CodeID::EhloPlain,
            ehlo(vec![
                Some(self.server.name.clone()),
                self.server.tls.as_ref().map(|_| "STARTTLS".to_string()),
                self.server
                    .smtp
                    .allow_insecure_auth
                    .then(|| "AUTH PLAIN".to_string()),
                self.server.smtp.allow_insecure_auth.then(|| size.clone()),
            ]),
        );
        codes.insert(
            CodeID::EhloSecured,
            ehlo(vec![
                Some(self.server.name.clone()),
                Some("AUTH PLAIN".to_string()),
                Some(size),
            ]),
        );

        Ok(self)
    }
}
