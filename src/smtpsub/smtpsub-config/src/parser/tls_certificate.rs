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

pub fn from_path(path: &std::path::Path) -> anyhow::Result<Vec<rustls::Certificate>> {
    anyhow::ensure!(
        path.exists(),
        format!("certificate path does not exists: '{}'", path.display())
    );
    from_string(&std::fs::read_to_string(path)?)
}

pub fn from_string(input: &str) -> anyhow::Result<Vec<rustls::Certificate>> {
    let mut reader = std::io::BufReader::new(input.as_bytes());

    let chain = rustls_pemfile::certs(&mut reader)?
        .into_iter()
        .map(rustls::Certificate)
        .collect::<Vec<_>>();

    anyhow::ensure!(!chain.is_empty(), "certificate path is valid but empty");
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use crate::field::SecretFile;

    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct S {
        v: SecretFile<Vec<rustls::Certificate>>,
    }

    #[test]
    fn basic() {
        let path = std::env::temp_dir().join("smtpsub-config-parser-crt");
        std::fs::write(&path, crate::tests::CERTIFICATE).unwrap();

        let s = serde_json::from_str::<S>(&format!(r#"{{"v": "{}"}}"#, path.display())).unwrap();
        assert_eq!(s.v.inner.len(), 1);
        assert_eq!(s.v.path, path);
        assert_eq!(
            serde_json::to_string(&s).unwrap(),
            format!(r#"{{"v":"{}"}}"#, path.display())
        );
    }

    #[test]
    fn empty_pem() {
        super::from_string("not a certificate").unwrap_err();
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
