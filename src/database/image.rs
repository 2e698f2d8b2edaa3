use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::ApiError;

/*
Images travel as data URIs

data:image/png;base64,iVBORw0KGgo=
     ^^^^^^^^^        ^^^^^^^^^^^^
     mime type        payload
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl EncodedImage {
    pub fn from_data_uri(value: &str) -> Result<Self, ApiError> {
        let invalid = || ApiError::validation("Image must be a base64 encoded data:image URI");

        let value = value.trim();
        let (header, payload) = value.split_once(";base64,").ok_or_else(invalid)?;
        let mime_type = header.strip_prefix("data:").ok_or_else(invalid)?;

        match mime_type.strip_prefix("image/") {
            Some(format) if !format.is_empty() => (),
            _ => return Err(invalid()),
        }

        let data = STANDARD.decode(payload).map_err(|_| invalid())?;
        if data.is_empty() {
            return Err(ApiError::validation("Image must not be empty"));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    pub fn to_data_uri(mime_type: &str, data: &[u8]) -> String {
        format!("data:{mime_type};base64,{}", STANDARD.encode(data))
    }
}
