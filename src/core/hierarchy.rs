//! Hierarchy resolution
//!
//! Level and paths describe where a node sits relative to its parent's
//! *current* snapshot. They are computed when a version is written and
//! refreshed for descendants when a parent's current snapshot moves.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::core::config::HierarchyConfig;
use crate::core::entity::EntityFamily;
use crate::core::error::{Result, TemporalError};
use crate::core::identity::{BusinessCode, TenantId};
use crate::core::store::{self, HierarchyNode};
use crate::core::version::Hierarchy;

/// Outcome of resolving a parent reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Normalized parent code, `None` for roots
    pub parent: Option<BusinessCode>,
    pub hierarchy: Hierarchy,
}

/// Computes structural placement against the stored parent snapshots
#[derive(Debug, Clone, Copy)]
pub struct HierarchyResolver<'a> {
    config: &'a HierarchyConfig,
}

impl<'a> HierarchyResolver<'a> {
    pub fn new(config: &'a HierarchyConfig) -> Self {
        Self { config }
    }

    pub fn max_depth(&self) -> u32 {
        self.config.max_depth
    }

    /// Normalized parent code, or `None` when `parent_ref` means "root"
    pub fn parent_code(&self, parent_ref: Option<&str>) -> Result<Option<BusinessCode>> {
        match parent_ref {
            Some(raw) if !self.config.is_root_reference(Some(raw)) => Ok(Some(raw.parse()?)),
            _ => Ok(None),
        }
    }

    /// Resolve `parent_ref` for a node of `family` named `name`
    pub fn resolve(
        &self,
        conn: &Connection,
        family: EntityFamily,
        tenant: &TenantId,
        code: &BusinessCode,
        parent_ref: Option<&str>,
        name: &str,
    ) -> Result<Placement> {
        let name = name.trim();
        let is_root = self.config.is_root_reference(parent_ref);

        let parent_family = match family.parent_family() {
            Some(pf) => pf,
            None if is_root => {
                return Ok(Placement {
                    parent: None,
                    hierarchy: Hierarchy::root(code.as_str(), name),
                })
            }
            None => {
                return Err(TemporalError::validation(format!(
                    "a {} cannot have a parent",
                    family
                )))
            }
        };

        if is_root {
            if family.requires_parent() {
                return Err(TemporalError::validation(format!(
                    "a {} requires a parent {}",
                    family, parent_family
                )));
            }
            return Ok(Placement {
                parent: None,
                hierarchy: Hierarchy::root(code.as_str(), name),
            });
        }

        let Some(parent) = self.parent_code(parent_ref)? else {
            return Err(TemporalError::validation(format!(
                "a {} requires a parent {}",
                family, parent_family
            )));
        };
        let nests_in_itself = parent_family == family;
        if nests_in_itself && &parent == code {
            return Err(TemporalError::HierarchyCycle {
                code: code.to_string(),
                parent: parent.to_string(),
            });
        }

        let node = store::current_node(conn, parent_family, tenant, &parent)?.ok_or_else(|| {
            TemporalError::ParentNotFound {
                family: parent_family,
                code: parent.to_string(),
            }
        })?;

        if nests_in_itself && node.hierarchy.codes().any(|c| c == code.as_str()) {
            return Err(TemporalError::HierarchyCycle {
                code: code.to_string(),
                parent: parent.to_string(),
            });
        }

        if node.hierarchy.level >= self.config.max_depth {
            return Err(TemporalError::DepthExceeded {
                parent: parent.to_string(),
                level: node.hierarchy.level,
                max: self.config.max_depth,
            });
        }

        Ok(Placement {
            hierarchy: Hierarchy::child_of(&node.hierarchy, code.as_str(), name),
            parent: Some(parent),
        })
    }

    /// Re-derive level and paths of every version hanging below `code`
    ///
    /// Descends through child families breadth first. Every non-deleted
    /// version naming a node as parent is rewritten from that node's current
    /// snapshot; only current versions are descended into. Returns the number
    /// of versions rewritten.
    pub fn refresh_descendants(
        &self,
        conn: &Connection,
        family: EntityFamily,
        tenant: &TenantId,
        code: &BusinessCode,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let Some(root) = store::current_node(conn, family, tenant, code)? else {
            debug!(%family, %tenant, %code, "no current snapshot; descendants left as they are");
            return Ok(0);
        };

        let mut visited: HashSet<(EntityFamily, BusinessCode)> = HashSet::new();
        visited.insert((family, code.clone()));
        let mut queue: VecDeque<(EntityFamily, HierarchyNode)> = VecDeque::new();
        queue.push_back((family, root));
        let mut rewritten = 0;

        while let Some((node_family, node)) = queue.pop_front() {
            for child_family in node_family.child_families() {
                for child in store::child_nodes(conn, child_family, tenant, &node.code)? {
                    let refreshed = self.child_of(child_family, &node, &child)?;
                    if refreshed != child.hierarchy {
                        store::update_hierarchy(
                            conn,
                            child_family,
                            child.record_id,
                            &refreshed,
                            now,
                        )?;
                        rewritten += 1;
                    }
                    if child.is_current && visited.insert((child_family, child.code.clone())) {
                        queue.push_back((
                            child_family,
                            HierarchyNode {
                                hierarchy: refreshed,
                                ..child
                            },
                        ));
                    }
                }
            }
        }

        if rewritten > 0 {
            info!(%family, %tenant, %code, rewritten, "refreshed descendant paths");
        }
        Ok(rewritten)
    }

    fn child_of(
        &self,
        child_family: EntityFamily,
        parent: &HierarchyNode,
        child: &HierarchyNode,
    ) -> Result<Hierarchy> {
        if child_family.parent_family() == Some(child_family)
            && parent.hierarchy.codes().any(|c| c == child.code.as_str())
        {
            return Err(TemporalError::HierarchyCycle {
                code: child.code.to_string(),
                parent: parent.code.to_string(),
            });
        }
        if parent.hierarchy.level >= self.config.max_depth {
            return Err(TemporalError::DepthExceeded {
                parent: parent.code.to_string(),
                level: parent.hierarchy.level,
                max: self.config.max_depth,
            });
        }
        Ok(Hierarchy::child_of(
            &parent.hierarchy,
            child.code.as_str(),
            &child.name,
        ))
    }

    /// Current-snapshot tree below `root`, at most `max_depth` edges deep
    pub fn subtree(
        &self,
        conn: &Connection,
        family: EntityFamily,
        tenant: &TenantId,
        root: &BusinessCode,
        max_depth: Option<u32>,
    ) -> Result<Vec<HierarchyNode>> {
        if family.parent_family() != Some(family) {
            return Err(TemporalError::validation(format!(
                "a {} does not nest within itself; no subtree to walk",
                family
            )));
        }
        let depth = max_depth
            .unwrap_or(self.config.max_depth)
            .min(self.config.max_depth);
        let nodes = store::subtree(conn, family, tenant, root, depth)?;
        if nodes.is_empty() {
            return Err(TemporalError::RecordNotFound(format!(
                "{} {} has no current version",
                family, root
            )));
        }
        Ok(nodes)
    }
}
