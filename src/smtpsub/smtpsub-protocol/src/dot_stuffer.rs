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

/// Transparency procedure of the DATA phase (RFC5321#4.5.2): a dot is added
/// before every line starting with a dot.
///
/// The input can be split in chunks at any position, the state is kept between calls.
#[derive(Debug, Clone, Copy)]
pub struct DotStuffer {
    at_line_start: bool,
    saw_cr: bool,
}

impl Default for DotStuffer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl DotStuffer {
    /// Create a new instance, positioned at the start of the message.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            at_line_start: true,
            saw_cr: false,
        }
    }

    /// Advance over `b`, returning true if a dot must be inserted before it.
    #[inline]
    fn step(&mut self, b: u8) -> bool {
        let stuffed = self.at_line_start && b == b'.';
        self.at_line_start = self.saw_cr && b == b'\n';
        self.saw_cr = b == b'\r';
        stuffed
    }

    /// Append the stuffed `chunk` to `out`.
    #[inline]
    pub fn stuff(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        out.reserve(chunk.len());
        for &b in chunk {
            if self.step(b) {
                out.push(b'.');
            }
            out.push(b);
        }
    }

    /// Append the end of data indication `.\r\n` to `out`, preceded by a `\r\n`
    /// if the last line is not terminated, and reset the state.
    #[inline]
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if !self.at_line_start {
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b".\r\n");
        *self = Self::new();
    }

    /// Number of bytes [`DotStuffer::stuff_message`] produces for `body`, without
    /// the terminating `.\r\n`.
    #[must_use]
    pub fn stuffed_len(body: &[u8]) -> usize {
        let mut stuffer = Self::new();
        let mut len = body.len();
        for &b in body {
            if stuffer.step(b) {
                len += 1;
            }
        }
        if !stuffer.at_line_start {
            len += 2;
        }
        len
    }

    /// Stuff an entire message, terminator included.
    #[inline]
    #[must_use]
    pub fn stuff_message(body: &[u8]) -> Vec<u8> {
        let mut stuffer = Self::new();
        let mut out = Vec::with_capacity(body.len() + 5);
        stuffer.stuff(body, &mut out);
        stuffer.finish(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::DotStuffer;

    #[rstest::rstest]
    #[case("", ".\r\n")]
    #[case("hello\r\n", "hello\r\n.\r\n")]
    #[case("hello", "hello\r\n.\r\n")]
    #[case(".\r\n", "..\r\n.\r\n")]
    #[case("foo\r\n.bar\r\n..\r\n", "foo\r\n..bar\r\n...\r\n.\r\n")]
    #[case("a.b\r\n", "a.b\r\n.\r\n")]
    #[case("foo\n.bar\r\n", "foo\n.bar\r\n.\r\n")]
    fn stuff_message(#[case] input: &str, #[case] expected: &str) {
        pretty_assertions::assert_eq!(
            std::str::from_utf8(&DotStuffer::stuff_message(input.as_bytes())).unwrap(),
            expected
        );
        pretty_assertions::assert_eq!(
            DotStuffer::stuffed_len(input.as_bytes()),
            expected.len() - ".\r\n".len()
        );
    }

    #[test]
    fn split_across_chunks() {
        let mut stuffer = DotStuffer::new();
        let mut out = vec![];
        for chunk in [b"foo\r" as &[u8], b"\n", b".", b"bar\r\n", b"."] {
            stuffer.stuff(chunk, &mut out);
        }
        stuffer.finish(&mut out);
        pretty_assertions::assert_eq!(
            std::str::from_utf8(&out).unwrap(),
            "foo\r\n..bar\r\n..\r\n.\r\n"
        );
    }
}
