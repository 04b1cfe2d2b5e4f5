//! Cluster access for okd-deployer
//!
//! Provides the authenticated session used to talk to an OpenShift cluster:
//! - Login through the cluster CLI, serialized and cached for an hour
//! - Namespace and storage-class discovery with a short TTL cache
//! - Applying rendered manifests

mod cache;
mod discovery;
mod error;
mod executor;
mod oc;
mod session;

pub use cache::TtlCache;
pub use discovery::{
    parse_namespaces, parse_storage_classes, Discovery, NamespaceSummary, StorageClassSummary,
    DEFAULT_CLASS_ANNOTATION, SYSTEM_NAMESPACE_PREFIXES,
};
pub use error::ClusterError;
pub use executor::{ClusterExecutor, CommandOutput, ResourceKind};
pub use oc::OcCli;
pub use session::{AuthStatus, ClusterCredentials, ClusterSession, SessionSettings, LOGIN_SUCCESS_MARKER};
