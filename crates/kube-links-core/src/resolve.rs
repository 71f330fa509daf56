//! Decide which leaves reference other resources.

use kube_manifest_tree::{NodeId, SyntaxTree, navigate};
use tracing::trace;

use crate::config::LinkConfig;
use crate::kinds::{KindRegistry, abbr};
use crate::target::{self, TargetId, TargetIdentityCache};

/// Maps leaves to link targets.
///
/// Universal rules are tried first, then the rules for the kind of the
/// manifest the leaf sits in. The first rule whose key and enclosing key
/// match decides the outcome, even when it cannot produce a target.
#[derive(Debug, Clone, Copy)]
pub struct LinkResolver<'a> {
    config: &'a LinkConfig,
    kinds: &'a KindRegistry,
}

impl<'a> LinkResolver<'a> {
    pub fn new(config: &'a LinkConfig, kinds: &'a KindRegistry) -> Self {
        Self { config, kinds }
    }

    /// Resolve `leaf` and intern the result into `targets`.
    ///
    /// `source_kind` is the abbreviation of the manifest's kind, if known.
    pub fn resolve(
        &self,
        tree: &SyntaxTree,
        source_kind: Option<&str>,
        leaf: NodeId,
        targets: &mut TargetIdentityCache,
    ) -> Option<TargetId> {
        let uri = self.target_uri(tree, source_kind, leaf)?;
        Some(targets.intern(&uri))
    }

    /// The target URI for `leaf`, before interning.
    pub fn target_uri(
        &self,
        tree: &SyntaxTree,
        source_kind: Option<&str>,
        leaf: NodeId,
    ) -> Option<String> {
        let key = navigate::key(tree, leaf)?;
        // Nulls have empty text as well
        let value = navigate::value_text(tree, leaf).filter(|value| !value.is_empty())?;
        let parent = navigate::parent_key(tree, leaf);

        match (key, parent) {
            ("release", Some("labels")) => return target::helm_uri(self.config, value),
            ("namespace", Some("metadata")) => {
                return self.resource(abbr::NAMESPACE, value, None);
            }
            ("name", Some("ownerReferences")) => return self.owner(tree, leaf, value),
            _ => {}
        }

        match source_kind? {
            abbr::DEPLOYMENT => match (key, parent) {
                ("claimName", Some("persistentVolumeClaim")) => {
                    self.resource(abbr::PERSISTENT_VOLUME_CLAIM, value, None)
                }
                ("name", Some("configMap")) => self.resource(abbr::CONFIG_MAP, value, None),
                ("name", Some("secretKeyRef")) => self.resource(abbr::SECRET, value, None),
                _ => None,
            },
            abbr::PERSISTENT_VOLUME => match (key, parent) {
                ("storageClassName", _) => self.resource(abbr::STORAGE_CLASS, value, None),
                ("name", Some("claimRef")) => {
                    let namespace = navigate::sibling(tree, leaf, "namespace");
                    self.resource(abbr::PERSISTENT_VOLUME_CLAIM, value, namespace)
                }
                _ => None,
            },
            abbr::PERSISTENT_VOLUME_CLAIM => match key {
                "storageClassName" => self.resource(abbr::STORAGE_CLASS, value, None),
                "volumeName" => self.resource(abbr::PERSISTENT_VOLUME, value, None),
                _ => None,
            },
            _ => None,
        }
    }

    fn owner(&self, tree: &SyntaxTree, leaf: NodeId, name: &str) -> Option<String> {
        let Some(kind) = navigate::sibling(tree, leaf, "kind") else {
            trace!(owner = name, "owner reference without a kind");
            return None;
        };
        let Some(resource) = self.kinds.find_kind(kind) else {
            trace!(owner = name, kind, "owner kind not in registry");
            return None;
        };
        let namespace = navigate::find_namespace(tree, leaf);
        self.resource(&resource.abbreviation, name, namespace)
    }

    fn resource(&self, abbreviation: &str, name: &str, namespace: Option<&str>) -> Option<String> {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        target::resource_uri(self.config, abbreviation, name, namespace)
    }
}

/// Abbreviation of the kind declared by the manifest rooted at `root`.
pub fn manifest_kind<'k>(
    tree: &SyntaxTree,
    root: NodeId,
    kinds: &'k KindRegistry,
) -> Option<&'k str> {
    let kind = navigate::property_value(tree, root, "kind")?;
    let kind = tree.kind(kind).text()?;
    kinds.find_kind(kind).map(|k| k.abbreviation.as_str())
}
