//! Manifest generation for okd-deployer
//!
//! Turns a [`DeploymentRequest`] into an ordered [`ManifestSet`]:
//! Namespace, Deployment, Service, PVCs, ConfigMaps, Secrets and Route.
//! Pure: no I/O and no cluster access.

pub mod builder;
pub mod error;
pub mod request;
pub mod route;
pub mod set;
pub mod validate;

pub use builder::{build, render, DerivedNames};
pub use error::{ManifestError, ValidationError};
pub use request::{DataEntry, DeploymentRequest, MountType, StorageRequest};
pub use route::{Route, RouteSpec, TlsTermination};
pub use set::{Manifest, ManifestSet};
pub use validate::is_rfc1123_subdomain;
