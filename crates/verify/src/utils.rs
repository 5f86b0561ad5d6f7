use hex::FromHexError;
use thiserror::Error;

/// An error converting between hex strings and bytes.
#[derive(Debug, Error)]
pub enum UtilsError {
    #[error("Hex decode error {0}")]
    HexDecode(#[from] FromHexError),
}

/// Converts bytes to a `0x`-prefixed hex string, for error messages and logs.
pub fn hex_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Converts a `0x`-prefixed (or bare) hex string to bytes.
pub fn hex_decode<T: AsRef<str>>(string: T) -> Result<Vec<u8>, UtilsError> {
    let s = string.as_ref().trim_start_matches("0x");
    Ok(hex::decode(s)?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encodes_and_decodes_hex() {
        let bytes = vec![0xde, 0xad, 0xbe, 0xef];
        let encoded = hex_encode(&bytes);
        assert_eq!(encoded, "0xdeadbeef");
        assert_eq!(hex_decode(encoded).unwrap(), bytes);
    }
}
