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

pub fn from_path(path: &std::path::Path) -> anyhow::Result<rustls::PrivateKey> {
    anyhow::ensure!(
        path.exists(),
        format!("private key path does not exists: '{}'", path.display())
    );
    from_string(&std::fs::read_to_string(path)?)
        .map_err(|e| e.context(format!("in file '{}'", path.display())))
}

pub fn from_string(input: &str) -> anyhow::Result<rustls::PrivateKey> {
    let mut reader = std::io::BufReader::new(input.as_bytes());

    match rustls_pemfile::read_one(&mut reader)? {
        Some(
            rustls_pemfile::Item::RSAKey(i)
            | rustls_pemfile::Item::PKCS8Key(i)
            | rustls_pemfile::Item::ECKey(i),
        ) => Ok(rustls::PrivateKey(i)),
        Some(_) => Err(anyhow::anyhow!("private key is valid but not supported")),
        None => Err(anyhow::anyhow!("private key is valid but empty")),
    }
}

#[cfg(test)]
mod tests {
    use crate::field::SecretFile;

    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct S {
        v: SecretFile<rustls::PrivateKey>,
    }

    #[test]
    fn pkcs8_ok() {
        let path = std::env::temp_dir().join("smtpsub-config-parser-pkcs8");
        std::fs::write(&path, crate::tests::PRIVATE_KEY).unwrap();

        serde_json::from_str::<S>(&format!(r#"{{"v": "{}"}}"#, path.display())).unwrap();
    }

    #[test]
    fn not_good_format() {
        let path = std::env::temp_dir().join("smtpsub-config-parser-crt-as-key");
        std::fs::write(&path, crate::tests::CERTIFICATE).unwrap();

        serde_json::from_str::<S>(&format!(r#"{{"v": "{}"}}"#, path.display())).unwrap_err();
    }

    #[test]
    fn not_a_string() {
        serde_json::from_str::<S>(r#"{"v": 10}"#).unwrap_err();
    }

    #[test]
    fn not_valid_path() {
        serde_json::from_str::<S>(r#"{"v": "foobar"}"#).unwrap_err();
    }
}
