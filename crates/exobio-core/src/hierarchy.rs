//! Hierarchy reconstruction: one system's flat body list into a rooted tree
//!
//! The catalog sometimes reports a body's parent chain without giving the
//! body itself a stable id. Reconstruction first indexes every identified
//! body, then matches the leftover parent references to unidentified bodies
//! by node kind. That matching is best-effort: when several same-kind
//! references and several same-kind unidentified bodies coexist, the
//! assignment is internally consistent but not guaranteed to recover the
//! catalog's true ids. Barycentres never appear in the body list; they are
//! materialized from the references that name them.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{Error, Result};
use crate::types::{CelestialBody, NodeKind, StarSystemRecord};

/// Sentinel id of the synthetic root node
pub const ROOT_ID: i32 = -1;

/// One node of a system map: a body, a synthetic barycentre, or the root
#[derive(Debug, Clone)]
pub struct SystemNode {
    pub id: i32,
    pub kind: NodeKind,
    /// The wrapped body, with its inferred id filled in. None for
    /// barycentres and the root.
    pub body: Option<CelestialBody>,
    parent: Option<i32>,
    children: BTreeSet<i32>,
}

impl SystemNode {
    fn from_body(body: CelestialBody) -> Result<Self> {
        let id = body.body_id.ok_or_else(|| {
            Error::internal(format!("body {} has no id at node creation", body.name))
        })?;

        Ok(Self {
            id,
            kind: body.node_kind(),
            body: Some(body),
            parent: None,
            children: BTreeSet::new(),
        })
    }

    fn barycentre(id: i32) -> Self {
        Self {
            id,
            kind: NodeKind::Barycentre,
            body: None,
            parent: None,
            children: BTreeSet::new(),
        }
    }

    fn root() -> Self {
        Self {
            id: ROOT_ID,
            kind: NodeKind::System,
            body: None,
            parent: None,
            children: BTreeSet::new(),
        }
    }

    pub fn parent_id(&self) -> Option<i32> {
        self.parent
    }

    /// Child ids, ascending
    pub fn child_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.children.iter().copied()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// A fully built system map: an arena of nodes addressed by id, rooted at
/// [`ROOT_ID`]. Built in one pass; rebuilt from scratch if rerun.
#[derive(Debug)]
pub struct SystemMap {
    system_name: String,
    nodes: HashMap<i32, SystemNode>,
}

impl SystemMap {
    /// Reconstruct the body hierarchy of one system.
    ///
    /// Fails on an empty (or unfetched) body list, a duplicate body id, a
    /// parent reference to an unknown id, or a reference whose declared kind
    /// disagrees with the referenced node. No partial map is returned.
    pub fn build(record: &StarSystemRecord) -> Result<SystemMap> {
        let system = record.name.clone();

        let bodies = match &record.bodies {
            Some(bodies) if !bodies.is_empty() => bodies.clone(),
            _ => return Err(Error::EmptySystem(system)),
        };

        let mut nodes: HashMap<i32, SystemNode> = HashMap::new();

        // Index every body that already carries an id
        for body in &bodies {
            if let Some(id) = body.body_id {
                if nodes.contains_key(&id) {
                    return Err(Error::DuplicateBodyId {
                        system: system.clone(),
                        id,
                    });
                }
                nodes.insert(id, SystemNode::from_body(body.clone())?);
            }
        }

        // Collect unresolved star/planet references; materialize barycentres.
        // First kind wins if one id is referenced with conflicting kinds.
        let mut pending: BTreeMap<i32, NodeKind> = BTreeMap::new();
        for body in &bodies {
            for parent in &body.parents {
                if parent.kind == NodeKind::Barycentre {
                    nodes
                        .entry(parent.id)
                        .or_insert_with(|| SystemNode::barycentre(parent.id));
                } else {
                    pending.entry(parent.id).or_insert(parent.kind);
                }
            }
        }

        // References to already-identified bodies are resolved, not missing
        for body in &bodies {
            if let Some(id) = body.body_id {
                pending.remove(&id);
            }
        }

        // Assign ids to the rest, in original list order: consume the first
        // same-kind pending reference (ascending id), else max-so-far + 1.
        // Best-effort when the same kind appears on both sides more than once.
        let mut max_id = bodies.iter().filter_map(|b| b.body_id).max().unwrap_or(0);
        let mut identified: Vec<(i32, &CelestialBody)> = Vec::with_capacity(bodies.len());

        for body in &bodies {
            let id = match body.body_id {
                Some(id) => id,
                None => {
                    let kind = body.node_kind();
                    let claimed = pending
                        .iter()
                        .find(|(_, k)| **k == kind)
                        .map(|(id, _)| *id);

                    let id = match claimed {
                        Some(id) => {
                            pending.remove(&id);
                            id
                        }
                        None => max_id + 1,
                    };

                    max_id = max_id.max(id);

                    let mut assigned = body.clone();
                    assigned.body_id = Some(id);
                    nodes.entry(id).or_insert(SystemNode::from_body(assigned)?);
                    id
                }
            };

            identified.push((id, body));
        }

        // Walk every body's parent chain nearest-first, asserting each link
        for (id, body) in &identified {
            let mut current = *id;

            for parent in &body.parents {
                let parent_node = nodes.get(&parent.id).ok_or_else(|| Error::UnknownBodyId {
                    system: system.clone(),
                    id: parent.id,
                })?;

                if parent_node.kind != parent.kind {
                    return Err(Error::NodeKindMismatch {
                        system: system.clone(),
                        id: parent.id,
                        expected: parent.kind,
                        found: parent_node.kind,
                    });
                }

                Self::link(&mut nodes, current, parent.id);
                current = parent.id;
            }
        }

        // Whatever has no parent yet hangs off the synthetic root
        let orphans: Vec<i32> = nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| *id)
            .collect();

        nodes.insert(ROOT_ID, SystemNode::root());
        for id in orphans {
            Self::link(&mut nodes, id, ROOT_ID);
        }

        Ok(SystemMap {
            system_name: system,
            nodes,
        })
    }

    fn link(nodes: &mut HashMap<i32, SystemNode>, child: i32, parent: i32) {
        if let Some(parent_node) = nodes.get_mut(&parent) {
            parent_node.children.insert(child);
        }
        if let Some(child_node) = nodes.get_mut(&child) {
            child_node.parent = Some(parent);
        }
    }

    pub fn system_name(&self) -> &str {
        &self.system_name
    }

    pub fn root(&self) -> &SystemNode {
        // The root is inserted unconditionally in build()
        &self.nodes[&ROOT_ID]
    }

    pub fn node(&self, id: i32) -> Option<&SystemNode> {
        self.nodes.get(&id)
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SystemNode> {
        self.nodes.values()
    }

    pub fn children(&self, id: i32) -> impl Iterator<Item = &SystemNode> {
        self.nodes
            .get(&id)
            .into_iter()
            .flat_map(move |n| n.children.iter().filter_map(move |c| self.nodes.get(c)))
    }

    /// Ancestor chain from a node's parent up to the root
    pub fn ancestors(&self, id: i32) -> Vec<&SystemNode> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);

        while let Some(parent_id) = current {
            match self.nodes.get(&parent_id) {
                Some(node) => {
                    chain.push(node);
                    current = node.parent;
                }
                None => break,
            }
        }

        chain
    }
}
