use serde::{Deserialize, Serialize};

use crate::constants::{CODE_FAST_UPLOAD, CODE_OK};

/// Envelope returned by every storage server endpoint.
///
/// The `data` field uses `serde_json::value::RawValue` to defer
/// deserialization until the caller knows which shape to expect: a boolean
/// on chunk uploads, stored-object metadata on merges and simple uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<serde_json::value::RawValue>>,
}

impl ApiResponse {
    /// Creates a response with the given code and optional data.
    pub fn new<T: Serialize>(
        code: i32,
        message: impl Into<String>,
        data: Option<&T>,
    ) -> Result<Self, serde_json::Error> {
        let raw = match data {
            Some(d) => {
                let json = serde_json::to_string(d)?;
                Some(serde_json::value::RawValue::from_string(json)?)
            }
            None => None,
        };
        Ok(Self {
            code,
            message: message.into(),
            data: raw,
        })
    }

    /// Creates a successful response carrying `data`.
    pub fn ok<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        Self::new(CODE_OK, "success", Some(data))
    }

    /// Creates a failed response without data.
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Returns `true` if the server reported success.
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }

    /// Returns `true` if the server recognised the whole file by digest.
    pub fn is_fast_upload(&self) -> bool {
        self.code == CODE_FAST_UPLOAD
    }

    /// Deserializes the data into the given type.
    pub fn parse_data<T: for<'de> Deserialize<'de>>(&self) -> Result<Option<T>, serde_json::Error> {
        match &self.data {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }

    /// Returns the data as a JSON value (`Null` when absent or malformed).
    pub fn data_value(&self) -> serde_json::Value {
        self.parse_data::<serde_json::Value>()
            .ok()
            .flatten()
            .unwrap_or(serde_json::Value::Null)
    }

    /// Returns `true` if a chunk response reports that every chunk of the
    /// file has now been received.
    pub fn all_chunks_received(&self) -> bool {
        self.is_ok() && matches!(self.parse_data::<bool>(), Ok(Some(true)))
    }

    /// Returns `true` if a name check reports the name as already used.
    pub fn name_taken(&self) -> bool {
        self.is_ok() && matches!(self.parse_data::<bool>(), Ok(Some(true)))
    }
}
