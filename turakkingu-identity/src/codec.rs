//! Cookie payload codec.
//!
//! The cookie carries the identity record as JSON, base64 encoded with
//! the `=` padding stripped (padding would need quoting in some cookie
//! parsers). Decoding restores the padding from the length.

use crate::error::{CodecError, CodecResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::borrow::Cow;
use turakkingu_types::{Identity, IdentityRecord};

/// Encodes an identity into a cookie-safe value.
pub fn encode_cookie(identity: &Identity) -> CodecResult<String> {
    let json = serde_json::to_string(identity)?;
    Ok(STANDARD.encode(json).trim_end_matches('=').to_string())
}

/// Decodes a cookie value back into a validated identity.
pub fn decode_cookie(value: &str) -> CodecResult<Identity> {
    let padded = restore_padding(value.trim())?;
    let bytes = STANDARD.decode(padded.as_bytes())?;
    let record: IdentityRecord = serde_json::from_slice(&bytes)?;
    Ok(Identity::try_from(record)?)
}

/// Pads stripped base64 back to a multiple of four.
///
/// A remainder of 1 can never come from stripping padding and is
/// rejected outright.
pub fn restore_padding(value: &str) -> CodecResult<Cow<'_, str>> {
    match value.len() % 4 {
        0 => Ok(Cow::Borrowed(value)),
        1 => Err(CodecError::InvalidLength(value.len())),
        rem => Ok(Cow::Owned(format!("{value}{}", "=".repeat(4 - rem)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_rules() {
        assert_eq!(restore_padding("abcd").unwrap(), "abcd");
        assert_eq!(restore_padding("abcdef").unwrap(), "abcdef==");
        assert_eq!(restore_padding("abcdefg").unwrap(), "abcdefg=");
        assert!(matches!(
            restore_padding("abcde"),
            Err(CodecError::InvalidLength(5))
        ));
    }

    #[test]
    fn empty_value_is_not_an_identity() {
        assert!(decode_cookie("").is_err());
    }
}
