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

use crate::ReplyCode;

/// SMTP message send by the server to the client as defined in RFC5321#4.2
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: ReplyCode,
    text: Vec<String>,
    folded: String,
}

impl serde::Serialize for Reply {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.folded)
    }
}

impl<'de> serde::Deserialize<'de> for Reply {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ReplyVisitor;

        impl<'de> serde::de::Visitor<'de> for ReplyVisitor {
            type Value = Reply;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a reply string or a map {code, enhanced, text}")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                <Reply as std::str::FromStr>::from_str(v).map_err(serde::de::Error::custom)
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                #[derive(serde::Deserialize)]
                #[serde(field_identifier, rename_all = "lowercase")]
                enum Field {
                    Code,
                    Enhanced,
                    Text,
                }

                let mut text: Option<String> = None;
                let mut code = None;
                let mut enhanced = None;

                while let Some(key) = map.next_key()? {
                    match key {
                        Field::Code if code.is_some() => {
                            return Err(serde::de::Error::duplicate_field("code"));
                        }
                        Field::Code => code = Some(map.next_value()?),
                        Field::Text if text.is_some() => {
                            return Err(serde::de::Error::duplicate_field("text"));
                        }
                        Field::Text => text = Some(map.next_value()?),
                        Field::Enhanced if enhanced.is_some() => {
                            return Err(serde::de::Error::duplicate_field("enhanced"));
                        }
                        Field::Enhanced => enhanced = Some(map.next_value()?),
                    }
                }
                let code = code.ok_or_else(|| serde::de::Error::missing_field("code"))?;

                Ok(Reply::new(
                    enhanced.map_or(ReplyCode::Code { code }, |enhanced| {
                        ReplyCode::Enhanced { code, enhanced }
                    }),
                    text.ok_or_else(|| serde::de::Error::missing_field("text"))?,
                ))
            }
        }

        deserializer.deserialize_any(ReplyVisitor)
    }
}

impl Reply {
    /// Create a single line reply.
    pub fn new(code: ReplyCode, text: impl Into<String>) -> Self {
        Self::with_lines(code, vec![text.into()])
    }

    /// Create a reply from its lines. An empty list produces a single empty line.
    pub fn with_lines(code: ReplyCode, mut text: Vec<String>) -> Self {
        if text.is_empty() {
            text.push(String::new());
        }
        let reply = Self {
            code,
            text,
            folded: String::new(),
        };
        Self {
            folded: reply.fold(),
            ..reply
        }
    }

    ///
    #[must_use]
    pub const fn code(&self) -> &ReplyCode {
        &self.code
    }

    /// Lines of text of the reply, without the codes.
    #[must_use]
    pub fn text(&self) -> &[String] {
        &self.text
    }

    /// Produce the wire representation: every line but the last use `<code>-`, the last one
    /// use `<code> `, each ending with `\r\n`.
    #[must_use]
    pub fn fold(&self) -> String {
        let prefix = self.code.to_string();
        let last = self.text.len().saturating_sub(1);

        self.text
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                let mut line = format!("{prefix} {line}\r\n");
                if idx != last {
                    line.replace_range(3..4, "-");
                }
                line
            })
            .collect()
    }

    /// Replace every occurrence of `from` in the text of the reply.
    pub fn replace(self, from: &str, to: &str) -> Self {
        Self::with_lines(
            self.code,
            self.text
                .into_iter()
                .map(|line| line.replace(from, to))
                .collect(),
        )
    }
}

impl std::str::FromStr for Reply {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s.lines().filter(|l| !l.is_empty()).peekable();

        let mut first_code: Option<ReplyCode> = None;
        let mut text = vec![];

        while let Some(line) = lines.next() {
            let (new_code, is_last, line) = ReplyCode::from_line(line)?;

            match &first_code {
                Some(first) if first.value() != new_code.value() => {
                    anyhow::bail!("Reply codes are not consistent")
                }
                Some(_) => {}
                None => first_code = Some(new_code),
            }
            anyhow::ensure!(
                is_last == lines.peek().is_none(),
                "Reply separators are not consistent"
            );

            text.push(line);
        }

        Ok(Self::with_lines(
            first_code.ok_or_else(|| anyhow::anyhow!("empty reply"))?,
            text,
        ))
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.folded)
    }
}

impl AsRef<str> for Reply {
    fn as_ref(&self) -> &str {
        &self.folded
    }
}
