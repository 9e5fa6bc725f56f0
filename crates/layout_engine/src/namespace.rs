//! Per-component constraint variables
//!
//! Each component owns a [`ConstraintsNamespace`]. Variables are created
//! the first time an attribute is asked for and memoized, so every lookup
//! of `left` on the same component yields the same [`Variable`]; the solver
//! identifies terms by variable identity. Attributes can instead be bound
//! to an expression (a symbol), e.g. `right = left + layout_width`.

use cassowary::{Expression, Variable};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;

/// Named attributes every component exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Left,
    Right,
    Top,
    Bottom,
    Width,
    Height,
    HCenter,
    VCenter,
    ContentsLeft,
    ContentsRight,
    ContentsTop,
    ContentsBottom,
    ContentsWidth,
    ContentsHeight,
    ContentsHCenter,
    ContentsVCenter,
}

impl Anchor {
    pub fn name(self) -> &'static str {
        match self {
            Anchor::Left => "left",
            Anchor::Right => "right",
            Anchor::Top => "top",
            Anchor::Bottom => "bottom",
            Anchor::Width => "layout_width",
            Anchor::Height => "layout_height",
            Anchor::HCenter => "h_center",
            Anchor::VCenter => "v_center",
            Anchor::ContentsLeft => "contents_left",
            Anchor::ContentsRight => "contents_right",
            Anchor::ContentsTop => "contents_top",
            Anchor::ContentsBottom => "contents_bottom",
            Anchor::ContentsWidth => "contents_width",
            Anchor::ContentsHeight => "contents_height",
            Anchor::ContentsHCenter => "contents_h_center",
            Anchor::ContentsVCenter => "contents_v_center",
        }
    }

    /// Whether the anchor only exists on containers
    pub fn is_contents(self) -> bool {
        self.name().starts_with("contents_")
    }
}

/// Lazily materialized solver variables of one component
pub struct ConstraintsNamespace {
    ns_name: String,
    owner: String,
    variables: RefCell<IndexMap<String, Variable>>,
    symbols: RefCell<HashMap<String, Expression>>,
}

impl ConstraintsNamespace {
    /// Create a namespace; `ns_name` is the component kind, `owner` its id
    pub fn new(ns_name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            ns_name: ns_name.into(),
            owner: owner.into(),
            variables: RefCell::new(IndexMap::new()),
            symbols: RefCell::new(HashMap::new()),
        }
    }

    /// A namespace for a leaf component, with the box symbols defined
    pub fn for_component(ns_name: impl Into<String>, owner: impl Into<String>) -> Self {
        let ns = Self::new(ns_name, owner);
        add_symbolic_constraints(&ns);
        ns
    }

    /// A namespace for a container, with box and contents symbols defined
    pub fn for_container(ns_name: impl Into<String>, owner: impl Into<String>) -> Self {
        let ns = Self::for_component(ns_name, owner);
        add_symbolic_contents_constraints(&ns);
        ns
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The variable named `name`, created on first use
    pub fn variable(&self, name: &str) -> Variable {
        if let Some(var) = self.variables.borrow().get(name) {
            return *var;
        }
        let var = Variable::new();
        self.variables.borrow_mut().insert(name.to_string(), var);
        var
    }

    /// The symbol bound to `name`, or else its variable
    pub fn get(&self, name: &str) -> Expression {
        if let Some(expr) = self.symbols.borrow().get(name) {
            return expr.clone();
        }
        Expression::from(self.variable(name))
    }

    pub fn anchor(&self, anchor: Anchor) -> Expression {
        self.get(anchor.name())
    }

    /// Bind `name` to an expression instead of a fresh variable
    pub fn define(&self, name: &str, expr: Expression) {
        self.symbols.borrow_mut().insert(name.to_string(), expr);
    }

    pub fn is_symbol(&self, name: &str) -> bool {
        self.symbols.borrow().contains_key(name)
    }

    /// Solver-facing label for an attribute
    pub fn label(&self, name: &str) -> String {
        format!("{}|{}|{}", self.ns_name, self.owner, name)
    }

    /// Label of `var` if this namespace created it
    pub fn label_of(&self, var: Variable) -> Option<String> {
        self.variables
            .borrow()
            .iter()
            .find(|(_, v)| **v == var)
            .map(|(name, _)| self.label(name))
    }

    /// Every variable materialized so far, in creation order
    pub fn variables(&self) -> Vec<(String, Variable)> {
        self.variables
            .borrow()
            .iter()
            .map(|(name, var)| (name.clone(), *var))
            .collect()
    }
}

impl std::fmt::Debug for ConstraintsNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintsNamespace")
            .field("ns_name", &self.ns_name)
            .field("owner", &self.owner)
            .field("variables", &self.variables.borrow().keys().collect::<Vec<_>>())
            .field("symbols", &self.symbols.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// `right`, `top` and the centers in terms of the primary box variables
pub fn add_symbolic_constraints(ns: &ConstraintsNamespace) {
    let left = ns.get("left");
    let bottom = ns.get("bottom");
    let width = ns.get("layout_width");
    let height = ns.get("layout_height");
    ns.define("right", left.clone() + width.clone());
    ns.define("top", bottom.clone() + height.clone());
    ns.define("h_center", left + width / 2.0);
    ns.define("v_center", bottom + height / 2.0);
}

/// Contents size and centers in terms of the contents edges
pub fn add_symbolic_contents_constraints(ns: &ConstraintsNamespace) {
    let left = ns.get("contents_left");
    let right = ns.get("contents_right");
    let top = ns.get("contents_top");
    let bottom = ns.get("contents_bottom");
    let width = right - left.clone();
    let height = top - bottom.clone();
    ns.define("contents_width", width.clone());
    ns.define("contents_height", height.clone());
    ns.define("contents_h_center", left + width / 2.0);
    ns.define("contents_v_center", bottom + height / 2.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_are_memoized() {
        let ns = ConstraintsNamespace::new("Component", "a");
        assert_eq!(ns.variable("left"), ns.variable("left"));
        assert_ne!(ns.variable("left"), ns.variable("bottom"));
    }

    #[test]
    fn test_labels() {
        let ns = ConstraintsNamespace::new("Component", "plot");
        let var = ns.variable("left");
        assert_eq!(ns.label_of(var).as_deref(), Some("Component|plot|left"));
        let other = ConstraintsNamespace::new("Component", "axis");
        assert_eq!(ns.label_of(other.variable("left")), None);
    }

    #[test]
    fn test_symbols_do_not_create_variables() {
        let ns = ConstraintsNamespace::for_component("Component", "a");
        let right = ns.anchor(Anchor::Right);
        assert!(ns.is_symbol("right"));
        assert_eq!(right.terms.len(), 2);
        let names: Vec<String> = ns.variables().into_iter().map(|(n, _)| n).collect();
        assert!(!names.contains(&"right".to_string()));
        assert!(names.contains(&"layout_width".to_string()));
    }

    #[test]
    fn test_container_symbols() {
        let ns = ConstraintsNamespace::for_container("ConstraintsContainer", "root");
        assert!(ns.is_symbol("contents_width"));
        assert!(ns.is_symbol("contents_v_center"));
        assert!(!ns.is_symbol("contents_left"));
    }

    #[test]
    fn test_define_aliases_another_expression() {
        let ns = ConstraintsNamespace::for_container("ConstraintsContainer", "root");
        ns.define("gutter", ns.get("left"));
        let gutter = ns.get("gutter");
        assert_eq!(gutter.terms.len(), 1);
        assert_eq!(gutter.terms[0].variable, ns.variable("left"));
    }

    #[test]
    fn test_anchor_names() {
        assert_eq!(Anchor::Width.name(), "layout_width");
        assert!(Anchor::ContentsTop.is_contents());
        assert!(!Anchor::HCenter.is_contents());
    }
}
