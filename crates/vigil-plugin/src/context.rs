//! Per-call plugin context and datasource instance settings

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::PluginError;
use crate::http::{BasicAuth, HttpClientOptions, SigV4Options, DEFAULT_HTTP_TIMEOUT};

/// Settings of one configured datasource, as stored by the host
///
/// `json_data` carries backend-specific options the host does not interpret;
/// `decrypted_secure_json_data` carries secrets already decrypted for this
/// call. Plugins must treat both as untrusted input and validate on decode.
#[derive(Debug, Clone)]
pub struct DataSourceInstanceSettings {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub url: String,
    pub basic_auth_enabled: bool,
    pub basic_auth_user: String,
    pub json_data: serde_json::Value,
    pub decrypted_secure_json_data: HashMap<String, String>,
    /// When the host last saved these settings. Cached instances are rebuilt
    /// once this marker moves.
    pub updated: DateTime<Utc>,
}

/// Transport options as they appear inside `json_data`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawHttpSettings {
    timeout: Option<u64>,
    tls_skip_verify: bool,
    sig_v4_auth: bool,
    sig_v4_auth_type: Option<String>,
    sig_v4_region: Option<String>,
    sig_v4_service: Option<String>,
    sig_v4_profile: Option<String>,
    sig_v4_assume_role_arn: Option<String>,
    sig_v4_external_id: Option<String>,
}

impl DataSourceInstanceSettings {
    /// Decode the host-managed transport and auth options for this instance
    pub fn http_client_options(&self) -> Result<HttpClientOptions, PluginError> {
        let raw: RawHttpSettings = serde_json::from_value(self.json_data.clone())
            .map_err(|e| PluginError::InvalidSettings(e.to_string()))?;

        let basic_auth = if self.basic_auth_enabled {
            Some(BasicAuth {
                user: self.basic_auth_user.clone(),
                password: self
                    .decrypted_secure_json_data
                    .get("basicAuthPassword")
                    .cloned()
                    .unwrap_or_default(),
            })
        } else {
            None
        };

        let sig_v4 = if raw.sig_v4_auth {
            Some(SigV4Options {
                auth_type: raw.sig_v4_auth_type.unwrap_or_default(),
                region: raw.sig_v4_region.unwrap_or_default(),
                service: raw.sig_v4_service.unwrap_or_default(),
                profile: raw.sig_v4_profile.unwrap_or_default(),
                assume_role_arn: raw.sig_v4_assume_role_arn.unwrap_or_default(),
                external_id: raw.sig_v4_external_id.unwrap_or_default(),
                access_key: self
                    .decrypted_secure_json_data
                    .get("sigV4AccessKey")
                    .cloned()
                    .unwrap_or_default(),
                secret_key: self
                    .decrypted_secure_json_data
                    .get("sigV4SecretKey")
                    .cloned()
                    .unwrap_or_default(),
            })
        } else {
            None
        };

        Ok(HttpClientOptions {
            timeout: raw
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT),
            tls_skip_verify: raw.tls_skip_verify,
            headers: HashMap::new(),
            basic_auth,
            sig_v4,
        })
    }
}

/// Per-call context handed to a plugin by the host
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub org_id: i64,
    pub datasource: DataSourceInstanceSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn settings(json_data: serde_json::Value) -> DataSourceInstanceSettings {
        DataSourceInstanceSettings {
            id: 1,
            uid: "ds-test".to_string(),
            name: "Test".to_string(),
            url: "http://localhost:9090".to_string(),
            basic_auth_enabled: false,
            basic_auth_user: String::new(),
            json_data,
            decrypted_secure_json_data: HashMap::new(),
            updated: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_defaults_from_empty_settings() {
        let options = settings(serde_json::json!({}))
            .http_client_options()
            .unwrap();

        assert_eq!(options.timeout, DEFAULT_HTTP_TIMEOUT);
        assert!(!options.tls_skip_verify);
        assert!(options.basic_auth.is_none());
        assert!(options.sig_v4.is_none());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let options = settings(serde_json::json!({"timeInterval": "15s", "httpMethod": "POST"}))
            .http_client_options()
            .unwrap();
        assert!(options.sig_v4.is_none());
    }

    #[test]
    fn test_sigv4_block_is_decoded() {
        let mut instance = settings(serde_json::json!({
            "sigV4Auth": true,
            "sigV4AuthType": "keys",
            "sigV4Region": "us-east-1",
            "sigV4Service": "es"
        }));
        instance
            .decrypted_secure_json_data
            .insert("sigV4AccessKey".to_string(), "AKIA".to_string());
        instance
            .decrypted_secure_json_data
            .insert("sigV4SecretKey".to_string(), "shhh".to_string());

        let options = instance.http_client_options().unwrap();
        let sig_v4 = options.sig_v4.unwrap();
        assert_eq!(sig_v4.region, "us-east-1");
        assert_eq!(sig_v4.service, "es");
        assert_eq!(sig_v4.access_key, "AKIA");
        assert_eq!(sig_v4.secret_key, "shhh");
    }

    #[test]
    fn test_basic_auth_uses_secure_password() {
        let mut instance = settings(serde_json::json!({}));
        instance.basic_auth_enabled = true;
        instance.basic_auth_user = "admin".to_string();
        instance
            .decrypted_secure_json_data
            .insert("basicAuthPassword".to_string(), "secret".to_string());

        let options = instance.http_client_options().unwrap();
        assert_eq!(
            options.basic_auth,
            Some(BasicAuth {
                user: "admin".to_string(),
                password: "secret".to_string(),
            })
        );
    }

    #[test]
    fn test_wrong_typed_timeout_is_rejected() {
        let err = settings(serde_json::json!({"timeout": "soon"}))
            .http_client_options()
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidSettings(_)));
    }

    #[test]
    fn test_non_object_settings_are_rejected() {
        let err = settings(serde_json::json!("not an object"))
            .http_client_options()
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidSettings(_)));
    }
}
