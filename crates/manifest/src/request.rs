//! Deployment request model
//!
//! Mirrors the JSON body sent by the frontend (camelCase keys). Ports and
//! storage sizes are accepted either as JSON numbers or numeric strings.

use serde::{de, Deserialize, Deserializer, Serialize};

/// Everything needed to render one application's manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    /// Target namespace, also the base for every derived name
    pub namespace: String,

    /// Emit a Namespace document
    #[serde(default)]
    pub create_new_namespace: bool,

    /// Recorded on the Namespace as the requester annotation
    #[serde(default)]
    pub requester_nickname: String,

    pub container_image: String,

    pub cpu_request: String,

    pub memory_request: String,

    #[serde(deserialize_with = "int_from_any")]
    pub container_port: i32,

    #[serde(default)]
    pub expose_route: bool,

    #[serde(default)]
    pub route_hostname: Option<String>,

    /// 443 turns on edge TLS termination
    #[serde(default, deserialize_with = "opt_int_from_any")]
    pub route_port: Option<i32>,

    #[serde(default)]
    pub storage_required: bool,

    #[serde(default)]
    pub storage_details: Vec<StorageRequest>,

    #[serde(default)]
    pub secrets_required: bool,

    #[serde(default)]
    pub secrets_details: Vec<DataEntry>,

    #[serde(default)]
    pub configmaps_required: bool,

    #[serde(default)]
    pub configmaps_details: Vec<DataEntry>,
}

/// One persistent volume claim mounted into the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRequest {
    pub name: String,
    pub mount_path: String,
    /// Size in GiB
    #[serde(deserialize_with = "int_from_any")]
    pub size: u32,
    pub storage_class: String,
}

/// One key of a Secret or ConfigMap and how the container consumes it
///
/// Entries sharing a `name` end up in the same object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataEntry {
    pub name: String,
    pub key: String,
    pub value: String,
    pub mount_type: MountType,
    #[serde(default)]
    pub env_name: Option<String>,
    #[serde(default)]
    pub mount_path: Option<String>,
}

impl DataEntry {
    /// Environment variable name, falling back to the key
    pub fn env_var_name(&self) -> &str {
        self.env_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountType {
    Env,
    Volume,
}

impl DeploymentRequest {
    /// Storage entries, empty unless storage was requested
    pub fn storage(&self) -> &[StorageRequest] {
        if self.storage_required {
            &self.storage_details
        } else {
            &[]
        }
    }

    /// Secret entries, empty unless secrets were requested
    pub fn secrets(&self) -> &[DataEntry] {
        if self.secrets_required {
            &self.secrets_details
        } else {
            &[]
        }
    }

    /// ConfigMap entries, empty unless configmaps were requested
    pub fn configmaps(&self) -> &[DataEntry] {
        if self.configmaps_required {
            &self.configmaps_details
        } else {
            &[]
        }
    }

    /// Route hostname when a route was asked for and a non-empty host given
    ///
    /// Returned as supplied so validation sees any stray whitespace.
    pub fn route_host(&self) -> Option<&str> {
        if !self.expose_route {
            return None;
        }
        self.route_hostname
            .as_deref()
            .filter(|host| !host.is_empty())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrText {
    Int(i64),
    Text(String),
}

impl IntOrText {
    fn into_int<T: TryFrom<i64>, E: de::Error>(self) -> Result<T, E> {
        let n = match self {
            Self::Int(n) => n,
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("expected an integer, got {text:?}")))?,
        };
        T::try_from(n).map_err(|_| E::custom(format!("{n} is out of range")))
    }
}

fn int_from_any<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    IntOrText::deserialize(deserializer)?.into_int()
}

fn opt_int_from_any<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    match Option::<IntOrText>::deserialize(deserializer)? {
        Some(IntOrText::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(value) => value.into_int().map(Some),
        None => Ok(None),
    }
}
