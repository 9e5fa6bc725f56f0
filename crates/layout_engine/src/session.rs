//! Layout sessions and ownership transfer
//!
//! An owning constraints container runs one solver session for itself and
//! for every descendant that shared its layout with it. The protocol:
//!
//! - a container with `share_layout` set whose parent is a constraints
//!   container is [`Ownership::TransferPending`]; its relayout and refresh
//!   requests go to the parent
//! - while building its table the parent asks each such child to transfer;
//!   an accepting child drops its own session and becomes
//!   [`Ownership::Transferred`], forwarding future requests to the owner
//! - a child that can no longer transfer falls back to
//!   [`Ownership::Unshared`] and solves its own layout
//!
//! A refresh re-solves the session for the owner's current size and writes
//! positions and bounds back, made relative to each component's parent.

use crate::component::Ownership;
use crate::solver::{LayoutManager, SolverFailure};
use crate::table::LayoutTable;
use crate::{LayoutError, Result, Scene};
use perf::PerfTimer;
use scene_model::{BoxChange, NodeId};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace, warn};

impl Scene {
    /// Whether `container` would hand its layout to its parent
    pub fn will_transfer(&self, container: NodeId) -> Result<bool> {
        let component = self.get(container)?;
        let Some(layout) = component.layout() else {
            return Ok(false);
        };
        if !layout.share_layout() {
            return Ok(false);
        }
        match component.parent() {
            Some(parent) => Ok(self.get(parent)?.is_constraints_container()),
            None => Ok(false),
        }
    }

    /// Offer `container`'s layout to `owner`; returns whether it accepted.
    ///
    /// On acceptance the container drops its own session and tables. Only
    /// the session that positions the container's parent may take it over.
    pub fn transfer_layout_ownership(&mut self, container: NodeId, owner: NodeId) -> Result<bool> {
        let will = self.will_transfer(container)?;
        let eligible = self.get(container)?.parent() == Some(owner)
            || self.layout_owner_of(container)? == Some(owner);
        if will && !eligible {
            debug!(
                container = %self.get(container)?.id(),
                owner = %owner,
                "Ownership transfer refused, owner does not position the parent"
            );
            return Ok(false);
        }

        let component = self.get_mut(container)?;
        let id = component.id().to_string();
        let Some(layout) = component.layout_mut() else {
            return Ok(false);
        };

        if will {
            if layout.ownership != (Ownership::Transferred { owner }) {
                trace!(container = %id, owner = %owner, "Layout ownership transferred");
            }
            layout.manager = None;
            layout.table = LayoutTable::default();
            layout.dirty = false;
            layout.ownership = Ownership::Transferred { owner };
            return Ok(true);
        }

        if layout.ownership != Ownership::Unshared {
            debug!(container = %id, "Ownership transfer declined, solving locally");
            layout.invalidate();
            layout.ownership = Ownership::Unshared;
        }
        Ok(false)
    }

    /// Current ownership state of a constraints container
    pub fn ownership(&self, container: NodeId) -> Result<Ownership> {
        Ok(self.layout(container)?.ownership())
    }

    /// The container whose session positions `node`, if any
    pub fn layout_owner_of(&self, node: NodeId) -> Result<Option<NodeId>> {
        match self.get(node)?.parent() {
            Some(parent) => self.session_owner(parent),
            None => Ok(None),
        }
    }

    fn session_owner(&self, container: NodeId) -> Result<Option<NodeId>> {
        let component = self.get(container)?;
        let Some(layout) = component.layout() else {
            return Ok(None);
        };
        match layout.ownership() {
            Ownership::Unshared => Ok(Some(container)),
            Ownership::Transferred { owner } => Ok(Some(owner)),
            Ownership::TransferPending => match component.parent() {
                Some(parent) => self.session_owner(parent),
                None => Ok(None),
            },
        }
    }

    /// Bring the ownership state in line with `share_layout` and the parent
    pub(crate) fn sync_ownership(&mut self, container: NodeId) -> Result<()> {
        let will = self.will_transfer(container)?;
        let component = self.get_mut(container)?;
        let id = component.id().to_string();
        let Some(layout) = component.layout_mut() else {
            return Ok(());
        };

        match (will, layout.ownership) {
            (true, Ownership::Unshared) => {
                layout.invalidate();
                layout.ownership = Ownership::TransferPending;
                trace!(container = %id, "Layout transfer pending");
            }
            (false, Ownership::TransferPending | Ownership::Transferred { .. }) => {
                layout.invalidate();
                layout.ownership = Ownership::Unshared;
                trace!(container = %id, "Layout ownership reclaimed");
                self.reset_descendant_ownership(container)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Descendants transferred to a stale owner wait for the next pass
    fn reset_descendant_ownership(&mut self, container: NodeId) -> Result<()> {
        let mut queue: VecDeque<NodeId> = self.get(container)?.children().collect();
        while let Some(node) = queue.pop_front() {
            let will = self.will_transfer(node)?;
            let component = self.get_mut(node)?;
            let Some(layout) = component.layout_mut() else {
                continue;
            };
            if let Ownership::Transferred { .. } = layout.ownership {
                layout.invalidate();
                layout.ownership = if will {
                    Ownership::TransferPending
                } else {
                    Ownership::Unshared
                };
                queue.extend(component.children());
            }
        }
        Ok(())
    }

    /// Drop the session of `node` and of every session it feeds into
    pub fn invalidate(&mut self, node: NodeId) -> Result<()> {
        let component = self.get_mut(node)?;
        let parent = component.parent();
        let Some(layout) = component.layout_mut() else {
            return Ok(());
        };
        layout.invalidate();
        let next = match layout.ownership {
            Ownership::Unshared => None,
            Ownership::TransferPending => parent,
            Ownership::Transferred { owner } => Some(owner),
        };
        match next {
            Some(next) => self.invalidate(next),
            None => Ok(()),
        }
    }

    /// Whether the next relayout of `container` must rebuild its session
    pub fn is_dirty(&self, container: NodeId) -> Result<bool> {
        Ok(self.layout(container)?.is_dirty())
    }

    /// Rebuild the session that positions `container`'s children and
    /// apply it. Requests on shared containers go to their owner.
    pub fn relayout(&mut self, container: NodeId) -> Result<()> {
        let ownership = self.layout(container)?.ownership();
        match ownership {
            Ownership::Transferred { owner } => return self.relayout(owner),
            Ownership::TransferPending => {
                if let Some(parent) = self.get(container)?.parent() {
                    return self.relayout(parent);
                }
                self.sync_ownership(container)?;
            }
            Ownership::Unshared => {}
        }

        let _timer = PerfTimer::relayout("relayout");
        self.init_layout(container)?;

        // Our natural size may have changed; the enclosing session
        // refreshes us through its own geometry update
        if let Some(owner) = self.layout_owner_of(container)? {
            if self.get(container)?.layout_size_hint().is_none()
                && self.replace_size_constraints(owner, container)?
            {
                self.refresh(owner)?;
            }
        }
        self.refresh(container)
    }

    /// Re-solve for the current size without rebuilding constraints.
    ///
    /// Does nothing if the container has no session yet.
    pub fn refresh(&mut self, container: NodeId) -> Result<()> {
        let ownership = self.layout(container)?.ownership();
        match ownership {
            Ownership::Transferred { owner } => return self.refresh(owner),
            Ownership::TransferPending => {
                return match self.get(container)?.parent() {
                    Some(parent) => self.refresh(parent),
                    None => Ok(()),
                };
            }
            Ownership::Unshared => {}
        }

        let _timer = PerfTimer::refresh("refresh");
        let bounds = self.get(container)?.bounds();
        let layout = self.layout_mut(container)?;
        let Some(mut manager) = layout.manager.take() else {
            return Ok(());
        };
        let mut table = std::mem::take(&mut layout.table);

        let result = self.update_geometries(&mut manager, &mut table, bounds);

        let layout = self.layout_mut(container)?;
        layout.manager = Some(manager);
        layout.table = table;
        let resized = result.map_err(|failure| self.solver_error(container, failure))?;
        let layout = self.layout_mut(container)?;
        layout.needs_refresh = false;
        let entries = layout.table.len();
        trace!(
            container = %self.get(container)?.id(),
            entries,
            nested = resized.len(),
            "Refreshed layout"
        );

        for nested in resized {
            self.refresh(nested)?;
        }
        Ok(())
    }

    /// Smallest size the container's constraints allow
    pub fn natural_size(&mut self, container: NodeId) -> Result<(f64, f64)> {
        let layout = self.layout(container)?;
        if !layout.owns_layout() {
            return Err(LayoutError::Solver {
                container: self.get(container)?.id().to_string(),
                reason: "layout is solved by an ancestor".to_string(),
            });
        }
        if layout.is_dirty() || !layout.has_manager() {
            self.init_layout(container)?;
        }
        self.session_min_size(container)
    }

    fn session_min_size(&mut self, container: NodeId) -> Result<(f64, f64)> {
        let layout = self.layout_mut(container)?;
        let Some(manager) = layout.manager.as_mut() else {
            return Ok((0.0, 0.0));
        };
        let result = manager.min_size();
        result.map_err(|failure| self.solver_error(container, failure))
    }

    /// Build table and constraints and load them into a new session.
    ///
    /// On failure the previous session (if any) is left untouched.
    fn init_layout(&mut self, owner: NodeId) -> Result<()> {
        if !self.layout(owner)?.owns_layout() {
            return Ok(());
        }

        let table = self.build_layout_table(owner)?;

        // Nested containers that solve on their own come first: their
        // natural size is the default size hint in our session
        let mut natural = HashMap::new();
        for entry in table.entries() {
            let component = self.get(entry.node)?;
            let Some(layout) = component.layout() else {
                continue;
            };
            if !layout.owns_layout() {
                continue;
            }
            let has_hint = component.layout_size_hint().is_some();
            if layout.is_dirty() || !layout.has_manager() {
                self.init_layout(entry.node)?;
            }
            if !has_hint {
                natural.insert(entry.node, self.session_min_size(entry.node)?);
            }
        }

        let generated = self.generate_constraints(owner, &table, &natural)?;
        let namespace = &self.get(owner)?.namespace;
        let (width, height) = (
            namespace.variable("layout_width"),
            namespace.variable("layout_height"),
        );
        let manager = LayoutManager::initialize(
            generated.constraints,
            generated.tracked,
            width,
            height,
            self.config.edit_strength(),
        )
        .map_err(|failure| self.solver_error(owner, failure))?;

        debug!(
            container = %self.get(owner)?.id(),
            entries = table.len(),
            constraints = manager.constraint_count(),
            "Initialized layout session"
        );
        let layout = self.layout_mut(owner)?;
        layout.manager = Some(manager);
        layout.table = table;
        layout.dirty = false;
        layout.needs_refresh = true;
        Ok(())
    }

    /// Solve and write geometry; returns nested owning containers that
    /// were resized or have an unapplied session
    fn update_geometries(
        &mut self,
        manager: &mut LayoutManager,
        table: &mut LayoutTable,
        bounds: [f64; 2],
    ) -> std::result::Result<Vec<NodeId>, SolverFailure> {
        let solution = manager.solve_for((bounds[0], bounds[1]))?;

        let mut updates = Vec::with_capacity(table.len());
        table.offsets.resize(table.entries.len() + 1, (0.0, 0.0));
        table.offsets[0] = (0.0, 0.0);
        for (i, entry) in table.entries.iter().enumerate() {
            debug_assert!(
                entry.offset_index <= i,
                "container entry must precede its children"
            );
            let Some(component) = self.nodes.get(&entry.node) else {
                continue;
            };
            let ns = &component.namespace;
            let x = solution.value(ns.variable("left"));
            let y = solution.value(ns.variable("bottom"));
            let width = solution.value(ns.variable("layout_width"));
            let height = solution.value(ns.variable("layout_height"));
            let (dx, dy) = table.offsets[entry.offset_index];
            table.offsets[i + 1] = (x, y);
            updates.push((entry.node, [x - dx, y - dy], [width, height]));
        }

        let mut resized = Vec::new();
        for (node, position, size) in updates {
            let Some(component) = self.nodes.get_mut(&node) else {
                continue;
            };
            component.geometry.set_position(position[0], position[1]);
            let changed = component.geometry.set_bounds(size[0], size[1]);
            let Some(layout) = component.layout() else {
                continue;
            };
            if !layout.owns_layout() || !layout.has_manager() {
                continue;
            }
            if changed == Some(BoxChange::Bounds) || layout.needs_refresh {
                resized.push(node);
            }
        }
        Ok(resized)
    }

    /// React to a new size hint or size policies on `node`
    pub(crate) fn size_preferences_changed(&mut self, node: NodeId) -> Result<()> {
        let shared = self
            .get(node)?
            .layout()
            .is_some_and(|layout| !layout.owns_layout());
        if shared {
            // Transferred containers contribute no size constraints
            return Ok(());
        }
        let Some(owner) = self.layout_owner_of(node)? else {
            return Ok(());
        };
        if self.replace_size_constraints(owner, node)? {
            self.refresh(owner)
        } else {
            self.invalidate(owner)
        }
    }

    /// Swap `node`'s size constraints in `owner`'s live session.
    ///
    /// Returns false when the session does not track `node`, or when `node`
    /// is a nested session whose natural size is stale; the owner then has
    /// to be rebuilt.
    fn replace_size_constraints(&mut self, owner: NodeId, node: NodeId) -> Result<bool> {
        let tracks = self
            .layout(owner)?
            .manager
            .as_ref()
            .is_some_and(|manager| manager.tracks(node));
        if !tracks {
            return Ok(false);
        }

        let component = self.get(node)?;
        let explicit = component.layout_size_hint();
        let nested = component.is_constraints_container();
        let stale = component
            .layout()
            .is_some_and(|layout| layout.is_dirty() || !layout.has_manager());
        if explicit.is_none() && nested && stale {
            return Ok(false);
        }
        let hint = match explicit {
            Some(hint) => Some(hint),
            None if nested => Some(self.session_min_size(node)?),
            None => None,
        };
        let constraints = self.size_constraints(node, hint)?;

        let Some(manager) = self.layout_mut(owner)?.manager.as_mut() else {
            return Ok(false);
        };
        let result = manager.replace_constraints(node, constraints);
        match result {
            Ok(()) => {
                trace!(node = %node, owner = %owner, "Replaced size constraints");
                Ok(true)
            }
            Err(failure) => {
                // The session is half updated; rebuild it next time
                self.layout_mut(owner)?.invalidate();
                Err(self.solver_error(owner, failure))
            }
        }
    }

    fn solver_error(&self, container: NodeId, failure: SolverFailure) -> LayoutError {
        let container = self
            .component(container)
            .map_or_else(|| container.to_string(), |c| c.id().to_string());
        let err = match failure {
            SolverFailure::Unsatisfiable(constraint) => {
                let mut variables: Vec<String> = Vec::new();
                for term in &constraint.expr().terms {
                    let label = self
                        .variable_label(term.variable)
                        .unwrap_or_else(|| format!("{:?}", term.variable));
                    if !variables.contains(&label) {
                        variables.push(label);
                    }
                }
                LayoutError::InfeasibleLayout {
                    container,
                    variables,
                }
            }
            SolverFailure::Unbounded(reason) => LayoutError::UnboundedLayout { container, reason },
            SolverFailure::Internal(reason) => LayoutError::Solver { container, reason },
        };
        warn!(error = %err, "Layout solve failed");
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Component;

    #[test]
    fn test_share_layout_without_constraints_parent_stays_unshared() {
        let mut scene = Scene::new();
        let plain = scene.insert(Component::container());
        let shared = scene.insert(Component::constraints_container().with_share_layout(true));
        scene.add(plain, shared).unwrap();
        assert!(!scene.will_transfer(shared).unwrap());
        assert_eq!(scene.ownership(shared).unwrap(), Ownership::Unshared);
    }

    #[test]
    fn test_pending_until_parent_builds() {
        let mut scene = Scene::new();
        let root = scene.insert(Component::constraints_container());
        let shared = scene.insert(Component::constraints_container().with_share_layout(true));
        scene.add(root, shared).unwrap();
        assert_eq!(scene.ownership(shared).unwrap(), Ownership::TransferPending);

        scene.relayout(root).unwrap();
        assert_eq!(
            scene.ownership(shared).unwrap(),
            Ownership::Transferred { owner: root }
        );
        assert!(!scene.layout(shared).unwrap().has_manager());
        assert!(scene.layout(root).unwrap().has_manager());
    }

    #[test]
    fn test_clearing_share_layout_reclaims_ownership() {
        let mut scene = Scene::new();
        let root = scene.insert(Component::constraints_container());
        let shared = scene.insert(Component::constraints_container().with_share_layout(true));
        scene.add(root, shared).unwrap();
        scene.relayout(root).unwrap();

        scene.set_share_layout(shared, false).unwrap();
        assert_eq!(scene.ownership(shared).unwrap(), Ownership::Unshared);
        assert!(scene.is_dirty(root).unwrap());
    }

    #[test]
    fn test_removed_child_reclaims_ownership() {
        let mut scene = Scene::new();
        let root = scene.insert(Component::constraints_container());
        let shared = scene.insert(
            Component::constraints_container()
                .with_id("shared")
                .with_share_layout(true),
        );
        scene.add(root, shared).unwrap();
        scene.relayout(root).unwrap();

        scene.remove(root, "shared").unwrap();
        assert_eq!(scene.ownership(shared).unwrap(), Ownership::Unshared);
        assert_eq!(scene.layout_owner_of(shared).unwrap(), None);
    }

    #[test]
    fn test_invalidate_walks_to_owner() {
        let mut scene = Scene::new();
        let root = scene.insert(Component::constraints_container());
        let shared = scene.insert(Component::constraints_container().with_share_layout(true));
        scene.add(root, shared).unwrap();
        scene.relayout(root).unwrap();
        assert!(!scene.is_dirty(root).unwrap());

        let leaf = scene.insert(Component::leaf());
        scene.add(shared, leaf).unwrap();
        assert!(scene.is_dirty(root).unwrap());
        assert_eq!(scene.layout_owner_of(leaf).unwrap(), Some(root));
    }

    #[test]
    fn test_refresh_without_session_is_noop() {
        let mut scene = Scene::new();
        let root = scene.insert(Component::constraints_container().with_bounds(10.0, 10.0));
        let leaf = scene.insert(Component::leaf());
        scene.add(root, leaf).unwrap();
        scene.refresh(root).unwrap();
        assert_eq!(scene.bounds(leaf).unwrap(), [0.0, 0.0]);
    }

    #[test]
    fn test_natural_size_of_shared_container_is_an_error() {
        let mut scene = Scene::new();
        let root = scene.insert(Component::constraints_container());
        let shared = scene.insert(Component::constraints_container().with_share_layout(true));
        scene.add(root, shared).unwrap();
        assert!(scene.natural_size(shared).is_err());
    }
}
