//! Tenant configuration intake endpoints.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{info, warn};
use witness_ledger::PublicKey;

use crate::error::{ControlError, ControlResult};
use crate::types::IntakeRequest;

use super::AppState;

const API_VERSION: &str = "v1";

/// Body of `POST /config`.
#[derive(Debug, Deserialize)]
pub struct ConfigRequest {
    /// Submitted authorization keys.
    pub config: AuthConfig,
    /// Tenant identification.
    pub info: TenantInfo,
}

/// Authorization keys, also the shape returned by `GET /config`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Hex-encoded serialized public keys.
    #[serde(default, alias = "authPubKey")]
    pub authpubkey: Vec<String>,
}

/// Who is asking and for which network.
#[derive(Debug, Deserialize)]
pub struct TenantInfo {
    /// Add-on identifier.
    #[serde(default, alias = "addOnId")]
    pub addon_id: String,
    /// Tenant identifier.
    #[serde(default, alias = "tenantId")]
    pub tenant_id: String,
    /// Network name.
    #[serde(default)]
    pub net: String,
    /// Product line.
    #[serde(default)]
    pub product: String,
}

/// Connection details returned to the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Where to fetch the client SDK.
    pub sdk_url: String,
    /// Settings for the SDK.
    pub sdk_config: SdkConfig,
}

/// SDK connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Attestation endpoint for the requested network.
    pub url: String,
    /// Add-on identifier, echoed.
    pub addon_id: String,
    /// Tenant identifier, echoed.
    pub tenant_id: String,
}

/// Numeric result code carried in every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Request accepted.
    Success,
    /// Request rejected as invalid.
    Parameter,
    /// Callback queue full.
    Overloaded,
}

impl ErrorCode {
    /// Wire value.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Success => 0,
            Self::Parameter => 40_000,
            Self::Overloaded => 50_000,
        }
    }

    /// HTTP status paired with the code.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Success | Self::Parameter => StatusCode::OK,
            Self::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Map an intake failure to its code.
    #[must_use]
    pub const fn for_error(error: &ControlError) -> Self {
        match error {
            ControlError::Overloaded(_) | ControlError::Internal(_) => Self::Overloaded,
            _ => Self::Parameter,
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

/// Response envelope for `POST /config`.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    /// Always empty.
    pub action: String,
    /// Result code.
    pub error: ErrorCode,
    /// `SUCCESS` or `<NAME>: <message>`.
    pub desc: String,
    /// Descriptor on success, `null` otherwise.
    pub result: Option<Descriptor>,
    /// API version.
    pub version: &'static str,
}

impl ConfigResponse {
    fn success(descriptor: Descriptor) -> Self {
        Self {
            action: String::new(),
            error: ErrorCode::Success,
            desc: "SUCCESS".to_owned(),
            result: Some(descriptor),
            version: API_VERSION,
        }
    }

    fn failure(error: &ControlError) -> Self {
        Self {
            action: String::new(),
            error: ErrorCode::for_error(error),
            desc: format!("{}: {error}", error.name()),
            result: None,
            version: API_VERSION,
        }
    }
}

/// Empty witness configuration, a capability probe.
pub async fn get_config() -> Json<AuthConfig> {
    Json(AuthConfig::default())
}

/// Validate a tenant request, queue its callback and return the descriptor.
///
/// Responds before the callback is delivered.
pub async fn post_config(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<ConfigResponse>) {
    match accept(&state, &body).await {
        Ok(descriptor) => {
            info!(
                tenant_id = %descriptor.sdk_config.tenant_id,
                addon_id = %descriptor.sdk_config.addon_id,
                "tenant configuration accepted"
            );
            (StatusCode::OK, Json(ConfigResponse::success(descriptor)))
        }
        Err(e) => {
            let code = ErrorCode::for_error(&e);
            warn!(error = %e, code = code.code(), "tenant configuration rejected");
            (code.status(), Json(ConfigResponse::failure(&e)))
        }
    }
}

async fn accept(state: &AppState, body: &[u8]) -> ControlResult<Descriptor> {
    if body.len() > state.max_body_bytes {
        return Err(ControlError::parameter(format!(
            "body of {} bytes exceeds limit of {}",
            body.len(),
            state.max_body_bytes
        )));
    }

    let request: ConfigRequest = serde_json::from_slice(body)
        .map_err(|e| ControlError::parameter(format!("malformed body: {e}")))?;

    let url = state
        .intake
        .networks
        .get(&request.info.net)
        .ok_or_else(|| ControlError::parameter(format!("unknown net {:?}", request.info.net)))?
        .clone();

    let keys = request.config.authpubkey;
    if keys.is_empty() {
        return Err(ControlError::parameter("authpubkey can not be empty"));
    }
    for key in &keys {
        PublicKey::from_hex(key)?;
    }

    let info = request.info;
    let descriptor = Descriptor {
        sdk_url: state.intake.sdk_url.clone(),
        sdk_config: SdkConfig {
            url,
            addon_id: info.addon_id.clone(),
            tenant_id: info.tenant_id.clone(),
        },
    };

    state
        .dispatcher
        .enqueue(IntakeRequest {
            auth_pub_keys: keys,
            addon_id: info.addon_id,
            tenant_id: info.tenant_id,
            net: info.net,
            product: info.product,
        })
        .await?;

    Ok(descriptor)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::success(ErrorCode::Success, 0, StatusCode::OK)]
    #[case::parameter(ErrorCode::Parameter, 40_000, StatusCode::OK)]
    #[case::overloaded(ErrorCode::Overloaded, 50_000, StatusCode::SERVICE_UNAVAILABLE)]
    fn codes(#[case] code: ErrorCode, #[case] wire: u32, #[case] status: StatusCode) {
        assert_eq!(code.code(), wire);
        assert_eq!(code.status(), status);
        assert_eq!(serde_json::to_value(code).unwrap(), serde_json::json!(wire));
    }

    #[test]
    fn failure_envelope() {
        let err = ControlError::parameter("unknown net \"moon\"");
        let json = serde_json::to_value(ConfigResponse::failure(&err)).unwrap();

        assert_eq!(json["action"], "");
        assert_eq!(json["error"], 40_000);
        assert_eq!(
            json["desc"],
            "PARAMETER ERROR: invalid parameter: unknown net \"moon\""
        );
        assert!(json["result"].is_null());
        assert_eq!(json["version"], "v1");
    }

    #[test]
    fn request_accepts_camel_case_aliases() {
        let body = r#"{
            "config": {"authPubKey": ["02aa"]},
            "info": {"addOnId": "a1", "tenantId": "t1", "net": "test", "product": "main"}
        }"#;
        let request: ConfigRequest = serde_json::from_str(body).unwrap();

        assert_eq!(request.config.authpubkey, vec!["02aa".to_owned()]);
        assert_eq!(request.info.addon_id, "a1");
        assert_eq!(request.info.tenant_id, "t1");
        assert_eq!(request.info.product, "main");
    }

    #[test]
    fn overload_maps_to_service_unavailable() {
        let err = ControlError::Overloaded("callback queue is full".to_owned());
        assert_eq!(ErrorCode::for_error(&err), ErrorCode::Overloaded);
        assert_eq!(
            ErrorCode::for_error(&ControlError::parameter("x")),
            ErrorCode::Parameter
        );
    }
}
