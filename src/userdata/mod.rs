//! User-data payload handling
//!
//! A hypervisor harness hands the fixture to the guest as a `user_data`
//! payload, which may arrive gzip compressed or base64 encoded. This
//! module unwraps those layers and feeds the resulting cloud-config text
//! to the loader.

pub mod types;

pub use types::ContentType;

use base64::Engine;
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::debug;

use crate::FixtureError;
use crate::config::{ConfigDocument, load};

/// Upper bound on nested gzip/base64 layers
const MAX_LAYERS: usize = 4;

/// Decode a raw payload down to text
///
/// Gzip and base64 layers are stripped until the payload is text of some
/// other type; the text is returned regardless of what that type is.
pub fn decode_payload(data: &[u8]) -> Result<String, FixtureError> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(FixtureError::EmptyPayload);
    }

    let mut data = data.to_vec();
    let mut layers = 0;
    loop {
        let content_type = ContentType::detect(&data);
        if matches!(content_type, ContentType::Gzip | ContentType::Base64) && layers == MAX_LAYERS {
            return Err(FixtureError::InvalidData(format!(
                "User-data is wrapped in more than {} encoding layers",
                MAX_LAYERS
            )));
        }

        match content_type {
            ContentType::Gzip => {
                debug!("Decompressing gzip user-data");
                data = decompress_gzip(&data)?;
            }
            ContentType::Base64 => {
                debug!("Decoding base64 user-data");
                data = decode_base64(&data)?;
            }
            _ => {
                return String::from_utf8(data)
                    .map_err(|e| FixtureError::InvalidData(format!("User-data is not UTF-8: {}", e)));
            }
        }
        layers += 1;
    }
}

/// Decode a payload and load it as a cloud-config document
pub fn load_userdata(data: &[u8]) -> Result<ConfigDocument, FixtureError> {
    let text = decode_payload(data)?;

    let content_type = ContentType::detect_from_text(&text);
    debug!("Detected user-data content type: {}", content_type);
    if !content_type.is_cloud_config() {
        return Err(FixtureError::NotCloudConfig(content_type));
    }

    Ok(load(&text)?)
}

/// Decompress a gzip stream
pub(crate) fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>, FixtureError> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| FixtureError::InvalidData(format!("Gzip decompression failed: {}", e)))?;
    Ok(decompressed)
}

/// Decode standard base64, ignoring embedded whitespace and line breaks
pub(crate) fn decode_base64(data: &[u8]) -> Result<Vec<u8>, FixtureError> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|e| FixtureError::InvalidData(format!("Base64 decode error: {}", e)))
}
