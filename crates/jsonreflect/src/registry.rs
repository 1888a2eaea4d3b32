//! Call-scoped definition table.
//!
//! The registry caches one walked body per type identity, records every use
//! site of each composite type and decides which types are hoisted into the
//! definitions table. During the walk, nested composites are represented by
//! placeholder references keyed by identity; [`DefinitionRegistry::resolve`]
//! later turns each placeholder into either a reference to the assigned
//! definition name or the inlined body.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use jsonreflect_core::{
    AdditionalProperties, DefinitionEntry, NodeKind, ObjectShape, SchemaNode, TypeIdentity,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReflectError, Result};
use crate::naming::NameResolver;

/// Use site label prefix of reflected roots
pub const ROOT_SITE: &str = "#root";

/// When a named composite type is promoted to a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HoistPolicy {
    /// Hoist every named composite used anywhere besides a document root
    #[default]
    Named,
    /// Hoist only composites used from two or more distinct sites
    Shared,
}

/// `#root0` is a root; `#root0[]` is an element of one
fn is_root_site(site: &str) -> bool {
    site.strip_prefix(ROOT_SITE)
        .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
}

#[derive(Debug, Clone)]
struct Slot {
    identity: TypeIdentity,
    /// `None` while the type is being walked
    body: Option<SchemaNode>,
    /// Named composite eligible for hoisting
    candidate: bool,
    sites: BTreeSet<String>,
    cycle_target: bool,
}

/// Deduplication table for one reflect call, or for several calls when the
/// caller shares it explicitly.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    policy: HoistPolicy,
    /// Keyed by identity key, in discovery order
    slots: IndexMap<String, Slot>,
    /// Assigned definition names
    names: BTreeMap<String, TypeIdentity>,
    /// Identity key to assigned name
    assigned: BTreeMap<String, String>,
}

impl DefinitionRegistry {
    #[must_use]
    pub fn new(policy: HoistPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn policy(&self) -> HoistPolicy {
        self.policy
    }

    /// Number of distinct composite types seen
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Open a slot for a type about to be walked
    pub fn begin(&mut self, identity: TypeIdentity, candidate: bool) {
        self.slots.entry(identity.key()).or_insert_with(|| Slot {
            identity,
            body: None,
            candidate,
            sites: BTreeSet::new(),
            cycle_target: false,
        });
    }

    /// Store the walked body. Later completions of the same key are ignored.
    pub fn complete(&mut self, key: &str, body: SchemaNode, candidate: bool) {
        if let Some(slot) = self.slots.get_mut(key)
            && slot.body.is_none()
        {
            slot.body = Some(body);
            slot.candidate = candidate;
        }
    }

    /// Completed body of `key`
    #[must_use]
    pub fn cached(&self, key: &str) -> Option<&SchemaNode> {
        self.slots.get(key).and_then(|slot| slot.body.as_ref())
    }

    /// Record a use of `key` from `site`. Recording the same site twice has no
    /// effect.
    pub fn record_use(&mut self, key: &str, site: &str) {
        if let Some(slot) = self.slots.get_mut(key) {
            slot.sites.insert(site.to_string());
        }
    }

    pub fn mark_cycle(&mut self, key: &str) {
        if let Some(slot) = self.slots.get_mut(key) {
            slot.cycle_target = true;
        }
    }

    #[must_use]
    pub fn is_cycle_target(&self, key: &str) -> bool {
        self.slots.get(key).is_some_and(|slot| slot.cycle_target)
    }

    #[must_use]
    pub fn is_candidate(&self, key: &str) -> bool {
        self.slots.get(key).is_some_and(|slot| slot.candidate)
    }

    /// Distinct use sites recorded for `key`
    #[must_use]
    pub fn use_count(&self, key: &str) -> usize {
        self.slots.get(key).map_or(0, |slot| slot.sites.len())
    }

    #[must_use]
    pub fn is_hoisted(&self, key: &str) -> bool {
        self.slots.get(key).is_some_and(|slot| self.hoists(slot))
    }

    fn hoists(&self, slot: &Slot) -> bool {
        if slot.cycle_target {
            return true;
        }
        if !slot.candidate {
            return false;
        }
        match self.policy {
            HoistPolicy::Named => slot.sites.iter().any(|site| !is_root_site(site)),
            HoistPolicy::Shared => slot.sites.len() >= 2,
        }
    }

    /// Assigned definition name of `key`
    #[must_use]
    pub fn name_of(&self, key: &str) -> Option<&str> {
        self.assigned.get(key).map(String::as_str)
    }

    /// Name every hoisted type, in discovery order. Names already assigned
    /// (by an earlier call on a shared registry) are kept.
    pub fn assign_names(&mut self, resolver: &NameResolver) -> Result<()> {
        let pending: Vec<(String, TypeIdentity)> = self
            .slots
            .iter()
            .filter(|(key, slot)| self.hoists(slot) && !self.assigned.contains_key(*key))
            .map(|(key, slot)| (key.clone(), slot.identity.clone()))
            .collect();

        for (key, identity) in pending {
            if !identity.is_named() {
                return Err(ReflectError::CycleWithoutResolution { identity: key });
            }
            let name = resolver.resolve(&identity, &self.names)?;
            debug!(%identity, %name, "hoisted definition");
            self.names.insert(name.clone(), identity);
            self.assigned.insert(key, name);
        }
        Ok(())
    }

    /// Replace placeholders in `node` with references to assigned names or
    /// with the inlined bodies of types that were not hoisted. References
    /// that do not name a known type are left untouched.
    pub fn resolve(&self, node: &SchemaNode) -> Result<SchemaNode> {
        self.resolve_node(node, &mut Vec::new())
    }

    fn resolve_node(&self, node: &SchemaNode, inlining: &mut Vec<String>) -> Result<SchemaNode> {
        let kind = match &node.kind {
            NodeKind::Reference(key) => {
                let Some(slot) = self.slots.get(key) else {
                    return Ok(node.clone());
                };
                if let Some(name) = self.name_of(key) {
                    return Ok(SchemaNode {
                        kind: NodeKind::Reference(name.to_string()),
                        annotations: node.annotations.clone(),
                    });
                }
                let unresolved = || ReflectError::CycleWithoutResolution {
                    identity: slot.identity.to_string(),
                };
                if inlining.contains(key) {
                    return Err(unresolved());
                }
                let body = slot.body.as_ref().ok_or_else(unresolved)?;
                inlining.push(key.clone());
                let mut inlined = self.resolve_node(body, inlining)?;
                inlining.pop();
                inlined.annotations.merge(&node.annotations);
                return Ok(inlined);
            }
            NodeKind::Array(items) => NodeKind::Array(Box::new(self.resolve_node(items, inlining)?)),
            NodeKind::Object(shape) => {
                let mut properties = IndexMap::with_capacity(shape.properties.len());
                for (name, property) in &shape.properties {
                    properties.insert(name.clone(), self.resolve_node(property, inlining)?);
                }
                let additional_properties = match &shape.additional_properties {
                    AdditionalProperties::Schema(value) => {
                        AdditionalProperties::Schema(Box::new(self.resolve_node(value, inlining)?))
                    }
                    other => other.clone(),
                };
                NodeKind::Object(ObjectShape {
                    properties,
                    required: shape.required.clone(),
                    additional_properties,
                })
            }
            NodeKind::Union(alternatives) => NodeKind::Union(
                alternatives
                    .iter()
                    .map(|alt| self.resolve_node(alt, inlining))
                    .collect::<Result<_>>()?,
            ),
            NodeKind::Any | NodeKind::Primitive(_) | NodeKind::Enum(_) => node.kind.clone(),
        };
        Ok(SchemaNode {
            kind,
            annotations: node.annotations.clone(),
        })
    }

    /// Resolved definition entries for every named, hoisted type
    pub fn definitions(&self) -> Result<BTreeMap<String, DefinitionEntry>> {
        let mut out = BTreeMap::new();
        for (key, name) in &self.assigned {
            let Some(slot) = self.slots.get(key) else {
                continue;
            };
            let body = slot
                .body
                .as_ref()
                .ok_or_else(|| ReflectError::CycleWithoutResolution {
                    identity: slot.identity.to_string(),
                })?;
            let node = self.resolve_node(body, &mut vec![key.clone()])?;
            out.insert(
                name.clone(),
                DefinitionEntry {
                    name: name.clone(),
                    node,
                    source: slot.identity.clone(),
                },
            );
        }
        Ok(out)
    }
}
