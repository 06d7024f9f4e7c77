// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wire types for the phpIPAM REST API.

use crate::ipam_errors::RegistryError;
use crate::registry::Reservation;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

/// phpIPAM returns identifiers as strings on older releases and numbers on newer ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Number(i64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::Text(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

/// Envelope shared by every phpIPAM response.
///
/// `code` is the application status, which may be non-2xx even when the HTTP
/// exchange itself succeeded. `data` is kept raw and decoded per operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Identifier of a newly created object (create responses only)
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
}

impl ApiResponse {
    /// Returns `true` for 2xx application codes.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.code)
    }

    /// Message supplied by phpIPAM, or a placeholder when absent.
    #[must_use]
    pub fn message_or_default(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "no message returned".to_string())
    }

    /// Decode `data` as a list, treating a missing payload as empty.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Decode`] if the payload is not a list of `T`.
    pub fn data_list<T: DeserializeOwned>(&self, operation: &str) -> Result<Vec<T>, RegistryError> {
        match &self.data {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|e| RegistryError::Decode {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Decode `data` as a single object.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Decode`] if the payload is missing or malformed.
    pub fn data_object<T: DeserializeOwned>(&self, operation: &str) -> Result<T, RegistryError> {
        let value = self.data.clone().ok_or_else(|| RegistryError::Decode {
            operation: operation.to_string(),
            reason: "response has no data".to_string(),
        })?;
        serde_json::from_value(value).map_err(|e| RegistryError::Decode {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Payload of a successful `POST user/`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthData {
    #[serde(default)]
    pub token: String,
    pub expires: String,
}

/// Subnet object as returned by `GET subnets/cidr/<cidr>/`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub subnet: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub section_id: Option<String>,
}

/// Address object as returned by `GET addresses/search/<ip>/`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub ip: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl From<AddressRecord> for Reservation {
    fn from(record: AddressRecord) -> Self {
        Reservation {
            address: record.ip,
            subnet_id: record.subnet_id.unwrap_or_default(),
            record_id: record.id,
            hostname: record.hostname,
        }
    }
}

/// Body of `POST addresses/`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressRequest<'a> {
    pub ip: &'a str,
    pub hostname: &'a str,
    pub subnet_id: &'a str,
    pub note: &'a str,
}

/// Body of `PATCH addresses/<id>/`.
#[derive(Debug, Clone, Serialize)]
pub struct PatchAddressRequest<'a> {
    pub hostname: &'a str,
    pub note: &'a str,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
