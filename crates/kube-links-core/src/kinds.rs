//! Registry of Kubernetes resource kinds.

use serde::{Deserialize, Serialize};

/// Abbreviations the resolver rules dispatch on.
pub mod abbr {
    pub const NAMESPACE: &str = "ns";
    pub const DEPLOYMENT: &str = "deployment";
    pub const CONFIG_MAP: &str = "configmap";
    pub const SECRET: &str = "secret";
    pub const PERSISTENT_VOLUME: &str = "pv";
    pub const PERSISTENT_VOLUME_CLAIM: &str = "pvc";
    pub const STORAGE_CLASS: &str = "sc";
}

/// One resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceKind {
    pub display_name: String,
    pub plural_display_name: String,
    /// The `kind:` value used in manifests
    pub manifest_kind: String,
    /// Short name used in resource URIs and kubectl
    pub abbreviation: String,
}

impl ResourceKind {
    pub fn new(
        display_name: impl Into<String>,
        plural_display_name: impl Into<String>,
        manifest_kind: impl Into<String>,
        abbreviation: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            plural_display_name: plural_display_name.into(),
            manifest_kind: manifest_kind.into(),
            abbreviation: abbreviation.into(),
        }
    }
}

// (display name, plural, manifest kind, abbreviation)
const BUILTIN_KINDS: &[(&str, &str, &str, &str)] = &[
    ("Endpoint", "Endpoints", "Endpoints", "endpoints"),
    ("Namespace", "Namespaces", "Namespace", abbr::NAMESPACE),
    ("Node", "Nodes", "Node", "node"),
    ("Deployment", "Deployments", "Deployment", abbr::DEPLOYMENT),
    ("ReplicaSet", "ReplicaSets", "ReplicaSet", "rs"),
    ("Replication Controller", "Replication Controllers", "ReplicationController", "rc"),
    ("Job", "Jobs", "Job", "job"),
    ("CronJob", "CronJobs", "CronJob", "cronjob"),
    ("Pod", "Pods", "Pod", "pod"),
    ("Custom Resource", "Custom Resources", "CustomResourceDefinition", "crd"),
    ("Service", "Services", "Service", "service"),
    ("ConfigMap", "ConfigMaps", "ConfigMap", abbr::CONFIG_MAP),
    ("Secret", "Secrets", "Secret", abbr::SECRET),
    ("Ingress", "Ingress", "Ingress", "ingress"),
    ("Persistent Volume", "Persistent Volumes", "PersistentVolume", abbr::PERSISTENT_VOLUME),
    (
        "Persistent Volume Claim",
        "Persistent Volume Claims",
        "PersistentVolumeClaim",
        abbr::PERSISTENT_VOLUME_CLAIM,
    ),
    ("Storage Class", "Storage Classes", "StorageClass", abbr::STORAGE_CLASS),
    ("StatefulSet", "StatefulSets", "StatefulSet", "statefulset"),
    ("DaemonSet", "DaemonSets", "DaemonSet", "daemonset"),
    ("Service Account", "Service Accounts", "ServiceAccount", "serviceaccount"),
    ("Role", "Roles", "Role", "role"),
    ("Role Binding", "Role Bindings", "RoleBinding", "rolebinding"),
    ("Cluster Role", "Cluster Roles", "ClusterRole", "clusterrole"),
    (
        "Cluster Role Binding",
        "Cluster Role Bindings",
        "ClusterRoleBinding",
        "clusterrolebinding",
    ),
    ("Network Policy", "Network Policies", "NetworkPolicy", "networkpolicy"),
    (
        "Horizontal Pod Autoscaler",
        "Horizontal Pod Autoscalers",
        "HorizontalPodAutoscaler",
        "hpa",
    ),
];

/// Lookup table from manifest kinds to abbreviations.
///
/// Extra kinds are consulted before the built-in ones, so configuration can
/// override a built-in abbreviation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindRegistry {
    kinds: Vec<ResourceKind>,
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KindRegistry {
    /// The core Kubernetes kinds.
    pub fn builtin() -> Self {
        let kinds = BUILTIN_KINDS
            .iter()
            .map(|(display, plural, manifest, abbreviation)| {
                ResourceKind::new(*display, *plural, *manifest, *abbreviation)
            })
            .collect();
        Self { kinds }
    }

    /// An empty registry. Every kind lookup fails.
    pub fn empty() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Add kinds that take precedence over those already registered.
    pub fn with_extra(mut self, extra: impl IntoIterator<Item = ResourceKind>) -> Self {
        let mut kinds: Vec<_> = extra.into_iter().collect();
        kinds.append(&mut self.kinds);
        self.kinds = kinds;
        self
    }

    pub fn find_kind(&self, manifest_kind: &str) -> Option<&ResourceKind> {
        self.kinds.iter().find(|k| k.manifest_kind == manifest_kind)
    }

    pub fn find_kind_by_abbreviation(&self, abbreviation: &str) -> Option<&ResourceKind> {
        self.kinds.iter().find(|k| k.abbreviation == abbreviation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceKind> {
        self.kinds.iter()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
