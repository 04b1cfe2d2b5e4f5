//! Ordered manifest documents and their YAML rendering

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolumeClaim, Secret, Service,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;

use crate::error::ManifestError;
use crate::route::{Route, ROUTE_KIND};

/// Separator placed between rendered documents
pub const DOCUMENT_SEPARATOR: &str = "---\n";

/// One rendered cluster object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Manifest {
    Namespace(Namespace),
    Deployment(Deployment),
    Service(Service),
    PersistentVolumeClaim(PersistentVolumeClaim),
    ConfigMap(ConfigMap),
    Secret(Secret),
    Route(Route),
}

impl Manifest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Namespace(_) => "Namespace",
            Self::Deployment(_) => "Deployment",
            Self::Service(_) => "Service",
            Self::PersistentVolumeClaim(_) => "PersistentVolumeClaim",
            Self::ConfigMap(_) => "ConfigMap",
            Self::Secret(_) => "Secret",
            Self::Route(_) => ROUTE_KIND,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Namespace(obj) => &obj.metadata,
            Self::Deployment(obj) => &obj.metadata,
            Self::Service(obj) => &obj.metadata,
            Self::PersistentVolumeClaim(obj) => &obj.metadata,
            Self::ConfigMap(obj) => &obj.metadata,
            Self::Secret(obj) => &obj.metadata,
            Self::Route(obj) => &obj.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Render as a single YAML document
    ///
    /// Strings containing a newline come out as literal block scalars.
    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Documents in apply order
///
/// Namespace, Deployment, Service, PVCs, ConfigMaps, Secrets, Route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestSet {
    documents: Vec<Manifest>,
}

impl ManifestSet {
    pub(crate) const fn new(documents: Vec<Manifest>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[Manifest] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Manifest> {
        self.documents.iter()
    }

    /// First document of `kind` named `name`
    pub fn find(&self, kind: &str, name: &str) -> Option<&Manifest> {
        self.documents
            .iter()
            .find(|doc| doc.kind() == kind && doc.name() == name)
    }

    /// All documents of `kind`, in set order
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Manifest> + 'a {
        self.documents.iter().filter(move |doc| doc.kind() == kind)
    }

    /// One multi-document YAML stream, documents separated by `---`
    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        let rendered = self
            .documents
            .iter()
            .map(Manifest::to_yaml)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rendered.join(DOCUMENT_SEPARATOR))
    }
}

impl<'a> IntoIterator for &'a ManifestSet {
    type Item = &'a Manifest;
    type IntoIter = std::slice::Iter<'a, Manifest>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}
