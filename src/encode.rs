use std::borrow::Cow;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped by [`percent_encode`]: everything except the RFC 3986
/// unreserved set (`ALPHA / DIGIT / "-" / "." / "_" / "~"`).
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a value the way OAuth 1.0a requires (RFC 5849, section 3.6).
///
/// Space becomes `%20` (never `+`), `~` is left untouched and hex digits are
/// uppercase.
pub fn percent_encode(value: &str) -> Cow<'_, str> {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).into()
}

/// Encode every element of a sequence with [`percent_encode`].
pub fn percent_encode_all<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| percent_encode(v.as_ref()).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_and_tilde() {
        assert_eq!(percent_encode("A B~C"), "A%20B~C");
    }

    #[test]
    fn reserved_characters() {
        assert_eq!(percent_encode("*!'()"), "%2A%21%27%28%29");
        assert_eq!(percent_encode("a+b/c=d"), "a%2Bb%2Fc%3Dd");
        assert_eq!(percent_encode("-._~"), "-._~");
    }

    #[test]
    fn multibyte() {
        assert_eq!(percent_encode("少女"), "%E5%B0%91%E5%A5%B3");
    }

    #[test]
    fn empty() {
        assert_eq!(percent_encode(""), "");
    }

    #[test]
    fn sequence() {
        assert_eq!(
            percent_encode_all(&["a b", "c&d", "e"]),
            vec!["a%20b", "c%26d", "e"]
        );
    }
}
