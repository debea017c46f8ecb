use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::Result;

/// Decode a base64 image payload with the standard alphabet.
///
/// Surrounding whitespace and the CR/LF line breaks MIME encoders insert are
/// ignored. Anything else outside the alphabet, and non-canonical padding, is
/// an error.
pub fn decode_base64_image(payload: &str) -> Result<Vec<u8>> {
    let joined: String = payload
        .trim()
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .collect();
    Ok(STANDARD.decode(joined)?)
}
