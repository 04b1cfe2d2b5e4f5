//! Namespace and storage-class discovery
//!
//! Parses `oc get <kind> -o json` output into the summaries shown by the UI.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::storage::v1::StorageClass;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::ClusterError;
use super::executor::ResourceKind;

/// Namespaces hidden from discovery
pub const SYSTEM_NAMESPACE_PREFIXES: [&str; 2] = ["openshift-", "kube-"];

pub const DEFAULT_CLASS_ANNOTATION: &str = "storageclass.kubernetes.io/is-default-class";

const UNKNOWN_PHASE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceSummary {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageClassSummary {
    pub name: String,
    pub provisioner: String,
    pub is_default: bool,
}

/// Discovery result, cached per kind
#[derive(Debug, Clone)]
pub enum Discovery {
    Namespaces(Arc<Vec<NamespaceSummary>>),
    StorageClasses(Arc<Vec<StorageClassSummary>>),
}

impl Discovery {
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Namespaces(_) => ResourceKind::Namespaces,
            Self::StorageClasses(_) => ResourceKind::StorageClasses,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Namespaces(items) => items.len(),
            Self::StorageClasses(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Deserialize)]
struct ResourceList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

fn parse_items<T: DeserializeOwned>(kind: ResourceKind, json: &str) -> Result<Vec<T>, ClusterError> {
    serde_json::from_str::<ResourceList<T>>(json)
        .map(|list| list.items)
        .map_err(|e| ClusterError::Parse {
            kind: kind.key(),
            message: e.to_string(),
        })
}

fn is_system_namespace(name: &str) -> bool {
    SYSTEM_NAMESPACE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// User namespaces from a namespace listing, in cluster order
pub fn parse_namespaces(json: &str) -> Result<Vec<NamespaceSummary>, ClusterError> {
    let items: Vec<Namespace> = parse_items(ResourceKind::Namespaces, json)?;
    Ok(items
        .into_iter()
        .filter_map(|namespace| {
            let name = namespace.metadata.name?;
            if is_system_namespace(&name) {
                return None;
            }
            let status = namespace
                .status
                .and_then(|status| status.phase)
                .unwrap_or_else(|| UNKNOWN_PHASE.to_string());
            Some(NamespaceSummary {
                name,
                status,
                created: namespace.metadata.creation_timestamp.map(|time| time.0),
            })
        })
        .collect())
}

/// Storage classes; any class carrying the default-class annotation is marked default
pub fn parse_storage_classes(json: &str) -> Result<Vec<StorageClassSummary>, ClusterError> {
    let items: Vec<StorageClass> = parse_items(ResourceKind::StorageClasses, json)?;
    Ok(items
        .into_iter()
        .filter_map(|class| {
            let is_default = class
                .metadata
                .annotations
                .as_ref()
                .is_some_and(|annotations| annotations.contains_key(DEFAULT_CLASS_ANNOTATION));
            Some(StorageClassSummary {
                name: class.metadata.name?,
                provisioner: class.provisioner,
                is_default,
            })
        })
        .collect())
}
