//! OpenShift Route (`route.openshift.io/v1`)
//!
//! Not part of the upstream Kubernetes API, so it is modelled here with just
//! the fields the builder emits.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};

pub const ROUTE_API_VERSION: &str = "route.openshift.io/v1";
pub const ROUTE_KIND: &str = "Route";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: RouteSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub to: RouteTarget,
    pub port: RoutePort,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

/// The Service traffic is sent to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    pub target_port: IntOrString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    pub termination: TlsTermination,
}

/// Only edge termination is generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsTermination {
    Edge,
}

impl Route {
    /// Route exposing `service` on `host`, forwarding to `target_port`
    pub fn new(metadata: ObjectMeta, service: &str, host: &str, target_port: i32) -> Self {
        Self {
            api_version: ROUTE_API_VERSION.to_string(),
            kind: ROUTE_KIND.to_string(),
            metadata,
            spec: RouteSpec {
                to: RouteTarget {
                    kind: "Service".to_string(),
                    name: service.to_string(),
                },
                port: RoutePort {
                    target_port: IntOrString::Int(target_port),
                },
                host: host.to_string(),
                tls: None,
            },
        }
    }

    #[must_use]
    pub fn with_tls(mut self, termination: TlsTermination) -> Self {
        self.spec.tls = Some(TlsConfig { termination });
        self
    }
}
