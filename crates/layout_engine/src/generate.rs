//! Constraint generation
//!
//! Turns an owner and its layout table into the flat constraint set of one
//! solver session:
//!
//! 1. hard constraints and contents constraints for the owner itself
//! 2. hard constraints for every table entry
//! 3. contents constraints for entries whose layout was transferred to the
//!    owner; size constraints (from the layout size hint) for the rest
//! 4. the owner's and each transferred container's own layout constraints,
//!    or a default fill of the container's children when it declares none
//!
//! Size constraints are kept apart, keyed by component, so that a later
//! size hint change can swap them without rebuilding the session.

use crate::config::policy_strength;
use crate::helpers::{eq, ge, le, ExpandContext, LayoutItem};
use crate::namespace::{Anchor, ConstraintsNamespace};
use crate::table::LayoutTable;
use crate::{LayoutError, Ownership, Result, Scene};
use cassowary::strength::REQUIRED;
use cassowary::{Constraint, Expression};
use scene_model::{NodeId, SizePolicy};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// The constraint set of one session
#[derive(Debug, Default)]
pub(crate) struct GeneratedConstraints {
    pub constraints: Vec<Constraint>,
    /// Size constraints, replaceable per component
    pub tracked: HashMap<NodeId, Vec<Constraint>>,
}

fn zero() -> Expression {
    Expression::from_constant(0.0)
}

fn constant(value: f64) -> Expression {
    Expression::from_constant(value)
}

impl Scene {
    pub(crate) fn generate_constraints(
        &self,
        owner: NodeId,
        table: &LayoutTable,
        natural: &HashMap<NodeId, (f64, f64)>,
    ) -> Result<GeneratedConstraints> {
        let mut generated = GeneratedConstraints::default();
        generated.constraints.extend(self.hard_constraints(owner, true)?);
        generated.constraints.extend(self.contents_constraints(owner)?);

        let mut declaring = vec![owner];
        for entry in table.entries() {
            let component = self.get(entry.node)?;
            generated
                .constraints
                .extend(self.hard_constraints(entry.node, false)?);

            let transferred = component
                .layout()
                .is_some_and(|layout| layout.ownership() == Ownership::Transferred { owner });
            if transferred {
                generated
                    .constraints
                    .extend(self.contents_constraints(entry.node)?);
                declaring.push(entry.node);
            } else {
                let hint = component
                    .layout_size_hint()
                    .or_else(|| natural.get(&entry.node).copied());
                generated
                    .tracked
                    .insert(entry.node, self.size_constraints(entry.node, hint)?);
            }
        }

        let members: HashSet<NodeId> = table.nodes().chain(std::iter::once(owner)).collect();
        for container in declaring {
            generated
                .constraints
                .extend(self.user_constraints(container, &members)?);
        }

        trace!(
            owner = %self.get(owner)?.id(),
            constraints = generated.constraints.len(),
            tracked = generated.tracked.len(),
            "Generated layout constraints"
        );
        Ok(generated)
    }

    /// Non-negative size; the owner is pinned to its own origin while
    /// everything else must stay in the positive quadrant
    pub(crate) fn hard_constraints(&self, node: NodeId, as_owner: bool) -> Result<Vec<Constraint>> {
        let ns = &self.get(node)?.namespace;
        let mut cns = vec![
            ge(ns.anchor(Anchor::Width), zero(), REQUIRED),
            ge(ns.anchor(Anchor::Height), zero(), REQUIRED),
        ];
        if as_owner {
            cns.push(eq(ns.anchor(Anchor::Left), zero(), REQUIRED));
            cns.push(eq(ns.anchor(Anchor::Bottom), zero(), REQUIRED));
        } else {
            cns.push(ge(ns.anchor(Anchor::Left), zero(), REQUIRED));
            cns.push(ge(ns.anchor(Anchor::Bottom), zero(), REQUIRED));
        }
        Ok(cns)
    }

    /// Contents box inset from the outer box by the container's padding
    pub(crate) fn contents_constraints(&self, node: NodeId) -> Result<Vec<Constraint>> {
        let component = self.get(node)?;
        let Some(layout) = component.layout() else {
            return Ok(Vec::new());
        };
        let ns = &component.namespace;
        let padding = layout.padding();
        Ok(vec![
            eq(
                ns.anchor(Anchor::ContentsLeft),
                ns.anchor(Anchor::Left) + padding.left,
                REQUIRED,
            ),
            eq(
                ns.anchor(Anchor::ContentsRight),
                ns.anchor(Anchor::Right) - padding.right,
                REQUIRED,
            ),
            eq(
                ns.anchor(Anchor::ContentsTop),
                ns.anchor(Anchor::Top) - padding.top,
                REQUIRED,
            ),
            eq(
                ns.anchor(Anchor::ContentsBottom),
                ns.anchor(Anchor::Bottom) + padding.bottom,
                REQUIRED,
            ),
        ])
    }

    /// Hug and resist constraints for a size hint
    pub(crate) fn size_constraints(
        &self,
        node: NodeId,
        hint: Option<(f64, f64)>,
    ) -> Result<Vec<Constraint>> {
        let component = self.get(node)?;
        let Some((width, height)) = hint else {
            return Ok(Vec::new());
        };
        let ns = &component.namespace;
        let policies = component.policies();
        let mut cns = Vec::new();
        let mut push = |anchor: Anchor, value: f64, hug: SizePolicy, resist: SizePolicy| {
            if let Some(strength) = policy_strength(hug) {
                cns.push(eq(ns.anchor(anchor), constant(value), strength));
            }
            if let Some(strength) = policy_strength(resist) {
                cns.push(ge(ns.anchor(anchor), constant(value), strength));
            }
        };
        push(Anchor::Width, width, policies.hug_width, policies.resist_width);
        push(Anchor::Height, height, policies.hug_height, policies.resist_height);
        Ok(cns)
    }

    /// Every direct child enclosed by, and stretched to, the contents box
    pub(crate) fn fill_constraints(&self, container: NodeId) -> Result<Vec<Constraint>> {
        let parent = &self.get(container)?.namespace;
        let stretch = policy_strength(self.config.fill_policy);
        let mut cns = Vec::new();
        for child in self.get(container)?.children() {
            let ns = &self.get(child)?.namespace;
            let edges = [
                (Anchor::Left, Anchor::ContentsLeft, true),
                (Anchor::Bottom, Anchor::ContentsBottom, true),
                (Anchor::Right, Anchor::ContentsRight, false),
                (Anchor::Top, Anchor::ContentsTop, false),
            ];
            for (edge, contents, low) in edges {
                let (inner, outer) = (ns.anchor(edge), parent.anchor(contents));
                if low {
                    cns.push(ge(inner.clone(), outer.clone(), REQUIRED));
                } else {
                    cns.push(le(inner.clone(), outer.clone(), REQUIRED));
                }
                if let Some(strength) = stretch {
                    cns.push(eq(inner, outer, strength));
                }
            }
        }
        Ok(cns)
    }

    /// The declared layout constraints of `container`, expanded
    fn user_constraints(
        &self,
        container: NodeId,
        members: &HashSet<NodeId>,
    ) -> Result<Vec<Constraint>> {
        let component = self.get(container)?;
        let items = match component.layout() {
            Some(layout) => layout.layout_constraints.evaluate(self, container),
            None => Vec::new(),
        };
        if items.is_empty() {
            return self.fill_constraints(container);
        }

        let lookup = |node: NodeId| self.member_namespace(container, node, members);
        let cx = ExpandContext {
            container: &component.namespace,
            lookup: &lookup,
            stretch: policy_strength(self.config.fill_policy),
            default_spacing: self.config.default_spacing,
        };
        let mut cns = Vec::new();
        for item in items {
            match item {
                LayoutItem::Constraint(cn) => cns.push(cn),
                LayoutItem::Helper(helper) => cns.extend(helper.expand(&cx)?),
            }
        }
        Ok(cns)
    }

    /// Namespace of a component a helper in `container` refers to
    fn member_namespace(
        &self,
        container: NodeId,
        node: NodeId,
        members: &HashSet<NodeId>,
    ) -> Result<&ConstraintsNamespace> {
        if node != container && !members.contains(&node) {
            let id = self
                .component(node)
                .map_or_else(|| node.to_string(), |c| c.id().to_string());
            return Err(LayoutError::ForeignComponent {
                container: self.get(container)?.id().to_string(),
                id,
            });
        }
        Ok(&self.get(node)?.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::vbox;
    use crate::{Component, LayoutConstraints};
    use scene_model::{Padding, SizePolicies};

    fn generate(scene: &mut Scene, owner: NodeId) -> GeneratedConstraints {
        let table = scene.build_layout_table(owner).unwrap();
        scene
            .generate_constraints(owner, &table, &HashMap::new())
            .unwrap()
    }

    #[test]
    fn test_owner_only() {
        let mut scene = Scene::new();
        let owner = scene.insert(Component::constraints_container());
        let generated = generate(&mut scene, owner);
        // 4 hard + 4 contents, no children to fill
        assert_eq!(generated.constraints.len(), 8);
        assert!(generated.tracked.is_empty());
    }

    #[test]
    fn test_default_fill_per_child() {
        let mut scene = Scene::new();
        let owner = scene.insert(Component::constraints_container());
        let child = scene.insert(Component::leaf());
        scene.add(owner, child).unwrap();
        let generated = generate(&mut scene, owner);
        // owner 8, child hard 4, fill 4 enclosure + 4 stretch
        assert_eq!(generated.constraints.len(), 20);
        assert_eq!(generated.tracked[&child].len(), 0);
    }

    #[test]
    fn test_size_constraints_follow_policies() {
        let mut scene = Scene::new();
        let leaf = scene.insert(Component::leaf().with_policies(SizePolicies {
            hug_width: SizePolicy::Ignore,
            ..SizePolicies::default()
        }));
        let cns = scene.size_constraints(leaf, Some((10.0, 20.0))).unwrap();
        assert_eq!(cns.len(), 3);
        assert!(scene.size_constraints(leaf, None).unwrap().is_empty());
    }

    #[test]
    fn test_fill_ignored_policy_keeps_enclosure() {
        let mut scene = Scene::with_config(
            crate::LayoutConfig::default().with_fill_policy(SizePolicy::Ignore),
        );
        let owner = scene.insert(Component::constraints_container());
        let child = scene.insert(Component::leaf());
        scene.add(owner, child).unwrap();
        assert_eq!(scene.fill_constraints(owner).unwrap().len(), 4);
    }

    #[test]
    fn test_contents_constraints_only_for_constraints_containers() {
        let mut scene = Scene::new();
        let leaf = scene.insert(Component::leaf());
        let container = scene.insert(
            Component::constraints_container().with_padding(Padding::uniform(4.0)),
        );
        assert!(scene.contents_constraints(leaf).unwrap().is_empty());
        assert_eq!(scene.contents_constraints(container).unwrap().len(), 4);
    }

    #[test]
    fn test_transferred_child_contributes_its_constraints() {
        let mut scene = Scene::new();
        let owner = scene.insert(Component::constraints_container());
        let shared = scene.insert(Component::constraints_container().with_share_layout(true));
        let a = scene.insert(Component::leaf().with_size_hint(10.0, 10.0));
        let b = scene.insert(Component::leaf().with_size_hint(10.0, 10.0));
        scene.add_all(shared, &[a, b]).unwrap();
        scene
            .set_layout_constraints(shared, LayoutConstraints::Items(vec![vbox([a, b]).into()]))
            .unwrap();
        scene.add(owner, shared).unwrap();

        let generated = generate(&mut scene, owner);
        assert!(!generated.tracked.contains_key(&shared));
        assert_eq!(generated.tracked[&a].len(), 4);
        assert_eq!(generated.tracked[&b].len(), 4);
    }

    #[test]
    fn test_helper_outside_table_is_foreign() {
        let mut scene = Scene::new();
        let owner = scene.insert(Component::constraints_container().with_id("owner"));
        let inside = scene.insert(Component::leaf());
        let outside = scene.insert(Component::leaf().with_id("stray"));
        scene.add(owner, inside).unwrap();
        scene
            .set_layout_constraints(
                owner,
                LayoutConstraints::Items(vec![vbox([inside, outside]).into()]),
            )
            .unwrap();

        let table = scene.build_layout_table(owner).unwrap();
        let err = scene
            .generate_constraints(owner, &table, &HashMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::ForeignComponent { ref container, ref id }
                if container == "owner" && id == "stray"
        ));
    }
}
