//! Percent-plus escaping used by data lines and command arguments.
//!
//! `%XX` encodes a byte as two hex digits and `+` stands for a space. The
//! encoder escapes `%`, `+` and every control byte so that encoded output
//! never contains a line terminator and decodes back to the same bytes.

const HEX: &[u8; 16] = b"0123456789ABCDEF";

fn needs_escape(byte: u8) -> bool {
    matches!(byte, b'%' | b'+') || byte < 0x20 || byte == 0x7f
}

/// Appends the escaped form of `bytes` to `out`.
pub fn escape_into(bytes: &[u8], out: &mut Vec<u8>) {
    for &byte in bytes {
        if needs_escape(byte) {
            out.push(b'%');
            out.push(HEX[usize::from(byte >> 4)]);
            out.push(HEX[usize::from(byte & 0x0f)]);
        } else {
            out.push(byte);
        }
    }
}

/// Returns the escaped form of `bytes`.
#[must_use]
pub fn escape_data(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    escape_into(bytes, &mut out);
    out
}

/// Returns the number of bytes `byte` occupies once escaped.
#[must_use]
pub fn escaped_len(byte: u8) -> usize {
    if needs_escape(byte) { 3 } else { 1 }
}

const fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Decodes percent-plus escapes.
///
/// A `%` not followed by two hex digits is kept literally.
#[must_use]
pub fn unescape(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'%' => {
                let high = bytes.get(index + 1).copied().and_then(hex_value);
                let low = bytes.get(index + 2).copied().and_then(hex_value);
                if let (Some(high), Some(low)) = (high, low) {
                    out.push((high << 4) | low);
                    index += 3;
                    continue;
                }
                out.push(b'%');
            }
            b'+' => out.push(b' '),
            byte => out.push(byte),
        }
        index += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn control_bytes_and_markers_are_escaped() {
        assert_eq!(escape_data(b"a%b+c\r\n"), b"a%25b%2Bc%0D%0A".to_vec());
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(escape_data(b"hello world"), b"hello world".to_vec());
    }

    #[test]
    fn plus_decodes_to_space() {
        assert_eq!(unescape(b"a+b"), b"a b".to_vec());
    }

    #[test]
    fn lowercase_hex_is_accepted() {
        assert_eq!(unescape(b"%0a%2b"), b"\n+".to_vec());
    }

    #[test]
    fn malformed_escapes_are_literal() {
        assert_eq!(unescape(b"100%"), b"100%".to_vec());
        assert_eq!(unescape(b"%zz1"), b"%zz1".to_vec());
        assert_eq!(unescape(b"%4"), b"%4".to_vec());
    }

    #[test]
    fn escaped_len_matches_encoder() {
        for byte in 0u8..=255 {
            assert_eq!(escape_data(&[byte]).len(), escaped_len(byte));
        }
    }

    proptest! {
        #[test]
        fn escaped_output_never_contains_line_breaks(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let encoded = escape_data(&data);
            prop_assert!(!encoded.contains(&b'\n'));
            prop_assert!(!encoded.contains(&b'\r'));
            prop_assert_eq!(unescape(&encoded), data);
        }
    }
}
