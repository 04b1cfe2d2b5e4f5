//! Deployment request to manifest set
//!
//! Every check runs before the set is assembled, so a request either yields
//! the complete set or a [`ValidationError`] and nothing else.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapKeySelector, ConfigMapVolumeSource, Container, ContainerPort, EnvVar,
    EnvVarSource, Namespace, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, ResourceRequirements, Secret,
    SecretKeySelector, SecretVolumeSource, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use tracing::debug;

use crate::error::{ManifestError, ValidationError};
use crate::request::{DataEntry, DeploymentRequest, MountType, StorageRequest};
use crate::route::{Route, TlsTermination};
use crate::set::{Manifest, ManifestSet};
use crate::validate::{validate_name, validate_port};

/// Annotation carrying who asked for a new namespace
pub const REQUESTER_ANNOTATION: &str = "openshift.io/requester";

/// Route port that switches on edge TLS termination
pub const HTTPS_PORT: i32 = 443;

const APP_LABEL: &str = "app";

/// Names derived from the namespace by a fixed suffix
///
/// A valid namespace does not guarantee valid derived names once the length
/// limit is reached, so each one is validated on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedNames {
    pub deployment: String,
    pub service: String,
    pub route: String,
}

impl DerivedNames {
    pub fn for_namespace(namespace: &str) -> Result<Self, ValidationError> {
        let names = Self {
            deployment: format!("{namespace}-deployment"),
            service: format!("{namespace}-service"),
            route: format!("{namespace}-route"),
        };
        validate_name("deployment name", &names.deployment)?;
        validate_name("service name", &names.service)?;
        validate_name("route name", &names.route)?;
        Ok(names)
    }
}

/// Build the full manifest set for `request`
pub fn build(request: &DeploymentRequest) -> Result<ManifestSet, ValidationError> {
    let namespace = request.namespace.as_str();
    validate_name("namespace", namespace)?;
    let names = DerivedNames::for_namespace(namespace)?;

    if request.container_image.trim().is_empty() {
        return Err(ValidationError::MissingField("containerImage".to_string()));
    }
    validate_port("containerPort", request.container_port)?;

    let namespace_doc = request
        .create_new_namespace
        .then(|| build_namespace(namespace, &request.requester_nickname));

    let mut pod = PodAssembly::default();

    let claims = request
        .storage()
        .iter()
        .map(|storage| build_claim(namespace, storage, &mut pod))
        .collect::<Result<Vec<_>, _>>()?;

    let config_maps = group_by_name(request.configmaps())
        .into_iter()
        .map(|(name, items)| build_config_map(namespace, name, &items, &mut pod))
        .collect::<Result<Vec<_>, _>>()?;

    let secrets = group_by_name(request.secrets())
        .into_iter()
        .map(|(name, items)| build_secret(namespace, name, &items, &mut pod))
        .collect::<Result<Vec<_>, _>>()?;

    let route = match request.route_host() {
        Some(host) => {
            validate_name("routeHostname", host)?;
            Some(build_route(namespace, &names, host, request))
        }
        None => None,
    };

    let deployment = pod.into_deployment(request, &names);
    let service = build_service(namespace, &names, request.container_port);

    let mut documents = Vec::with_capacity(
        3 + claims.len() + config_maps.len() + secrets.len() + usize::from(route.is_some()),
    );
    documents.extend(namespace_doc.map(Manifest::Namespace));
    documents.push(Manifest::Deployment(deployment));
    documents.push(Manifest::Service(service));
    documents.extend(claims.into_iter().map(Manifest::PersistentVolumeClaim));
    documents.extend(config_maps.into_iter().map(Manifest::ConfigMap));
    documents.extend(secrets.into_iter().map(Manifest::Secret));
    documents.extend(route.map(Manifest::Route));

    debug!(
        namespace = %namespace,
        documents = documents.len(),
        "Built manifest set"
    );

    Ok(ManifestSet::new(documents))
}

/// Build and render in one step
pub fn render(request: &DeploymentRequest) -> Result<String, ManifestError> {
    Ok(build(request)?.to_yaml()?)
}

/// Which object a pod volume points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeSource {
    Claim,
    ConfigMap,
    Secret,
}

impl VolumeSource {
    /// ConfigMap and Secret volumes are shared by every item mounted from them
    const fn is_shared(self) -> bool {
        matches!(self, Self::ConfigMap | Self::Secret)
    }
}

/// Container wiring collected while the dependent objects are built
#[derive(Debug, Default)]
struct PodAssembly {
    volumes: Vec<Volume>,
    mounts: Vec<VolumeMount>,
    env: Vec<EnvVar>,
    volume_sources: HashMap<String, VolumeSource>,
}

impl PodAssembly {
    /// Add `volume` unless a volume of the same name and shared source exists
    fn add_volume(&mut self, source: VolumeSource, volume: Volume) -> Result<(), ValidationError> {
        match self.volume_sources.get(&volume.name) {
            None => {
                self.volume_sources.insert(volume.name.clone(), source);
                self.volumes.push(volume);
                Ok(())
            }
            Some(existing) if *existing == source && source.is_shared() => Ok(()),
            Some(_) => Err(ValidationError::DuplicateVolume(volume.name)),
        }
    }

    fn mount(&mut self, name: &str, mount_path: &str, sub_path: Option<&str>) {
        self.mounts.push(VolumeMount {
            name: name.to_string(),
            mount_path: mount_path.to_string(),
            sub_path: sub_path.map(str::to_string),
            ..Default::default()
        });
    }

    fn into_deployment(self, request: &DeploymentRequest, names: &DerivedNames) -> Deployment {
        let namespace = &request.namespace;
        let labels = app_labels(namespace);

        let requests = BTreeMap::from([
            ("cpu".to_string(), Quantity(request.cpu_request.clone())),
            ("memory".to_string(), Quantity(request.memory_request.clone())),
        ]);

        let container = Container {
            name: namespace.clone(),
            image: Some(request.container_image.clone()),
            resources: Some(ResourceRequirements {
                requests: Some(requests),
                ..Default::default()
            }),
            ports: Some(vec![ContainerPort {
                container_port: request.container_port,
                ..Default::default()
            }]),
            volume_mounts: Some(self.mounts),
            env: Some(self.env),
            ..Default::default()
        };

        Deployment {
            metadata: namespaced_meta(&names.deployment, namespace),
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![container],
                        volumes: Some(self.volumes),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn app_labels(namespace: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), namespace.to_string())])
}

fn namespaced_meta(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

fn build_namespace(namespace: &str, requester: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(namespace.to_string()),
            annotations: Some(BTreeMap::from([(
                REQUESTER_ANNOTATION.to_string(),
                requester.to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn build_claim(
    namespace: &str,
    storage: &StorageRequest,
    pod: &mut PodAssembly,
) -> Result<PersistentVolumeClaim, ValidationError> {
    validate_name("storage name", &storage.name)?;
    if storage.size == 0 {
        return Err(ValidationError::InvalidStorageSize(storage.name.clone()));
    }
    if storage.mount_path.is_empty() {
        return Err(ValidationError::MissingField(format!(
            "storageDetails[{}].mountPath",
            storage.name
        )));
    }

    pod.add_volume(
        VolumeSource::Claim,
        Volume {
            name: storage.name.clone(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: storage.name.clone(),
                ..Default::default()
            }),
            ..Default::default()
        },
    )?;
    pod.mount(&storage.name, &storage.mount_path, None);

    Ok(PersistentVolumeClaim {
        metadata: namespaced_meta(&storage.name, namespace),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(format!("{}Gi", storage.size)),
                )])),
                ..Default::default()
            }),
            storage_class_name: Some(storage.storage_class.clone()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Group entries by object name, keeping first-seen order
fn group_by_name(entries: &[DataEntry]) -> IndexMap<&str, Vec<&DataEntry>> {
    let mut groups: IndexMap<&str, Vec<&DataEntry>> = IndexMap::new();
    for entry in entries {
        groups.entry(entry.name.as_str()).or_default().push(entry);
    }
    groups
}

/// The two key/value object kinds a container can consume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataKind {
    ConfigMap,
    Secret,
}

impl DataKind {
    const fn volume_source(self) -> VolumeSource {
        match self {
            Self::ConfigMap => VolumeSource::ConfigMap,
            Self::Secret => VolumeSource::Secret,
        }
    }

    const fn details_field(self) -> &'static str {
        match self {
            Self::ConfigMap => "configmapsDetails",
            Self::Secret => "secretsDetails",
        }
    }
}

/// Wire every item of one ConfigMap or Secret into the container
fn wire_items(
    pod: &mut PodAssembly,
    kind: DataKind,
    name: &str,
    items: &[&DataEntry],
) -> Result<(), ValidationError> {
    for item in items {
        match item.mount_type {
            MountType::Env => pod.env.push(env_from(kind, name, item)),
            MountType::Volume => {
                let mount_path = item
                    .mount_path
                    .as_deref()
                    .filter(|path| !path.is_empty())
                    .ok_or_else(|| {
                        ValidationError::MissingField(format!(
                            "{}[{name}/{}].mountPath",
                            kind.details_field(),
                            item.key
                        ))
                    })?;
                pod.add_volume(kind.volume_source(), volume_from(kind, name))?;
                pod.mount(name, mount_path, Some(&item.key));
            }
        }
    }
    Ok(())
}

fn env_from(kind: DataKind, name: &str, item: &DataEntry) -> EnvVar {
    let value_from = match kind {
        DataKind::Secret => EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: name.to_string().into(),
                key: item.key.clone(),
                ..Default::default()
            }),
            ..Default::default()
        },
        DataKind::ConfigMap => EnvVarSource {
            config_map_key_ref: Some(ConfigMapKeySelector {
                name: name.to_string().into(),
                key: item.key.clone(),
                ..Default::default()
            }),
            ..Default::default()
        },
    };

    EnvVar {
        name: item.env_var_name().to_string(),
        value_from: Some(value_from),
        ..Default::default()
    }
}

fn volume_from(kind: DataKind, name: &str) -> Volume {
    match kind {
        DataKind::Secret => Volume {
            name: name.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(name.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
        DataKind::ConfigMap => Volume {
            name: name.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: name.to_string().into(),
                ..Default::default()
            }),
            ..Default::default()
        },
    }
}

fn build_config_map(
    namespace: &str,
    name: &str,
    items: &[&DataEntry],
    pod: &mut PodAssembly,
) -> Result<ConfigMap, ValidationError> {
    validate_name("configmap name", name)?;
    wire_items(pod, DataKind::ConfigMap, name, items)?;

    let data = items
        .iter()
        .map(|item| (item.key.clone(), item.value.clone()))
        .collect();

    Ok(ConfigMap {
        metadata: namespaced_meta(name, namespace),
        data: Some(data),
        ..Default::default()
    })
}

fn build_secret(
    namespace: &str,
    name: &str,
    items: &[&DataEntry],
    pod: &mut PodAssembly,
) -> Result<Secret, ValidationError> {
    validate_name("secret name", name)?;
    wire_items(pod, DataKind::Secret, name, items)?;

    // ByteString serializes as base64
    let data = items
        .iter()
        .map(|item| (item.key.clone(), ByteString(item.value.as_bytes().to_vec())))
        .collect();

    Ok(Secret {
        metadata: namespaced_meta(name, namespace),
        type_: Some("Opaque".to_string()),
        data: Some(data),
        ..Default::default()
    })
}

fn build_service(namespace: &str, names: &DerivedNames, port: i32) -> Service {
    Service {
        metadata: namespaced_meta(&names.service, namespace),
        spec: Some(ServiceSpec {
            selector: Some(app_labels(namespace)),
            ports: Some(vec![ServicePort {
                protocol: Some("TCP".to_string()),
                port,
                target_port: Some(IntOrString::Int(port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn build_route(
    namespace: &str,
    names: &DerivedNames,
    host: &str,
    request: &DeploymentRequest,
) -> Route {
    let route = Route::new(
        namespaced_meta(&names.route, namespace),
        &names.service,
        host,
        request.container_port,
    );
    if request.route_port == Some(HTTPS_PORT) {
        route.with_tls(TlsTermination::Edge)
    } else {
        route
    }
}
