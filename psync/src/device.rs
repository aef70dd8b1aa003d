//! HTTP implementation of the device client, for printers exposing their
//! address book as a JSON collection behind basic auth.
//!
//! The wire format is deliberately thin glue: the reconciliation core only
//! sees [`DeviceUser`] records, with the JSON object key order preserved so
//! the removal-log schema matches what the device reports.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use psync_core::contract::{
    DeviceClient, DeviceConnection, DeviceField, DeviceSession, DeviceUser, NewDeviceUser,
};
use psync_core::error::DeviceError;

pub struct HttpDeviceClient {
    http: reqwest::Client,
}

impl HttpDeviceClient {
    pub fn new(timeout: std::time::Duration) -> Result<Self, DeviceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeviceError::Connection(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl DeviceClient for HttpDeviceClient {
    async fn open(
        &self,
        device: &DeviceConnection,
    ) -> Result<Box<dyn DeviceSession>, DeviceError> {
        let base = device.address.trim_end_matches('/').to_string();
        let probe = format!("{base}/addressbook");
        let response = self
            .http
            .get(&probe)
            .basic_auth(&device.username, Some(&device.password))
            .send()
            .await
            .map_err(|e| DeviceError::Connection(format!("failed to reach {probe}: {e}")))?;
        if !response.status().is_success() {
            return Err(DeviceError::Connection(format!(
                "{probe} returned {}",
                response.status()
            )));
        }

        Ok(Box::new(HttpDeviceSession {
            http: self.http.clone(),
            base,
            username: device.username.clone(),
            password: device.password.clone(),
        }))
    }
}

struct HttpDeviceSession {
    http: reqwest::Client,
    base: String,
    username: String,
    password: String,
}

impl HttpDeviceSession {
    fn users_url(&self) -> String {
        format!("{}/addressbook/users", self.base)
    }
}

#[async_trait]
impl DeviceSession for HttpDeviceSession {
    async fn list_users(&self) -> Result<Vec<DeviceUser>, DeviceError> {
        let url = self.users_url();
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| DeviceError::Operation(format!("GET {url} failed: {e}")))?;
        if !response.status().is_success() {
            return Err(DeviceError::Operation(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }

        let raw: Vec<serde_json::Map<String, Value>> = response
            .json()
            .await
            .map_err(|e| DeviceError::Operation(format!("invalid user list from {url}: {e}")))?;

        Ok(raw
            .into_iter()
            .map(|object| {
                DeviceUser::new(
                    object
                        .into_iter()
                        .map(|(name, value)| DeviceField::new(name, field_value(value)))
                        .collect(),
                )
            })
            .collect())
    }

    async fn delete_user(&self, id: &str) -> Result<(), DeviceError> {
        let url = format!("{}/{id}", self.users_url());
        let response = self
            .http
            .delete(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| DeviceError::Operation(format!("DELETE {url} failed: {e}")))?;
        if !response.status().is_success() {
            return Err(DeviceError::Operation(format!(
                "DELETE {url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn add_user<'a>(&self, user: NewDeviceUser<'a>) -> Result<(), DeviceError> {
        let url = self.users_url();
        let body = serde_json::json!({
            "id": user.user_id,
            "name": user.name,
            "displayName": user.display_name,
            "mailaddress": user.email,
        });
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| DeviceError::Operation(format!("POST {url} failed: {e}")))?;
        if !response.status().is_success() {
            return Err(DeviceError::Operation(format!(
                "POST {url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        // Basic-auth HTTP holds no server-side session state to release.
        debug!(device = %self.base, "Device session closed");
        Ok(())
    }
}

fn field_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
