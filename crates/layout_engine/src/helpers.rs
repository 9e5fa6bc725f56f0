//! Layout helper expressions
//!
//! Declarative layout intent (`vbox(a, b)`, `align(Left, a, b)`, ...) is
//! kept symbolic in a container's layout constraints and expanded into
//! primitive linear constraints only when the owning container generates
//! its constraint set. Expansion happens against the container that
//! declared the helper, so helpers keep their meaning when a shared
//! container's constraints are spliced into an ancestor's session.

use crate::config::policy_strength;
use crate::namespace::{Anchor, ConstraintsNamespace};
use crate::Result;
use cassowary::strength::REQUIRED;
use cassowary::{Constraint, Expression, RelationalOperator};
use scene_model::{NodeId, Padding, SizePolicy};

/// One entry of a container's layout constraints
#[derive(Debug, Clone)]
pub enum LayoutItem {
    /// A primitive constraint, passed to the solver as is
    Constraint(Constraint),
    /// A helper expanded at generation time
    Helper(LayoutHelper),
}

impl From<Constraint> for LayoutItem {
    fn from(cn: Constraint) -> Self {
        LayoutItem::Constraint(cn)
    }
}

impl From<LayoutHelper> for LayoutItem {
    fn from(helper: LayoutHelper) -> Self {
        LayoutItem::Helper(helper)
    }
}

impl From<LinearBox> for LayoutItem {
    fn from(b: LinearBox) -> Self {
        LayoutItem::Helper(LayoutHelper::Box(b))
    }
}

impl From<Alignment> for LayoutItem {
    fn from(a: Alignment) -> Self {
        LayoutItem::Helper(LayoutHelper::Align(a))
    }
}

#[derive(Debug, Clone)]
pub enum LayoutHelper {
    Box(LinearBox),
    Align(Alignment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Left to right
    Horizontal,
    /// Top to bottom
    Vertical,
}

/// An entry of a box helper
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxItem {
    Component(NodeId),
    /// A fixed gap replacing the default spacing at this point
    Spacer(f64),
}

impl From<NodeId> for BoxItem {
    fn from(node: NodeId) -> Self {
        BoxItem::Component(node)
    }
}

pub fn spacer(size: f64) -> BoxItem {
    BoxItem::Spacer(size)
}

/// Components chained along one axis
#[derive(Debug, Clone)]
pub struct LinearBox {
    orientation: Orientation,
    items: Vec<BoxItem>,
    spacing: Option<f64>,
    margins: Padding,
    /// Whether the chain is pinned to the container's contents box
    enclosed: bool,
}

impl LinearBox {
    fn new<I, T>(orientation: Orientation, enclosed: bool, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<BoxItem>,
    {
        Self {
            orientation,
            items: items.into_iter().map(Into::into).collect(),
            spacing: None,
            margins: Padding::default(),
            enclosed,
        }
    }

    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = Some(spacing);
        self
    }

    pub fn with_margins(mut self, margins: Padding) -> Self {
        self.margins = margins;
        self
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn components(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.items.iter().filter_map(|item| match item {
            BoxItem::Component(node) => Some(*node),
            BoxItem::Spacer(_) => None,
        })
    }

    /// Components with the gap that precedes each, plus leading and
    /// trailing space
    fn runs(&self, spacing: f64) -> (f64, Vec<(NodeId, f64)>, f64) {
        let mut leading = 0.0;
        let mut runs = Vec::new();
        let mut pending: Option<f64> = None;
        for item in &self.items {
            match *item {
                BoxItem::Spacer(size) => pending = Some(pending.unwrap_or(0.0) + size),
                BoxItem::Component(node) => {
                    if runs.is_empty() {
                        leading = pending.unwrap_or(0.0);
                        runs.push((node, 0.0));
                    } else {
                        runs.push((node, pending.unwrap_or(spacing)));
                    }
                    pending = None;
                }
            }
        }
        (leading, runs, pending.unwrap_or(0.0))
    }

    fn expand(&self, cx: &ExpandContext<'_>) -> Result<Vec<Constraint>> {
        let spacing = self.spacing.unwrap_or(cx.default_spacing);
        let (leading, runs, trailing) = self.runs(spacing);
        let mut cns = Vec::new();
        if runs.is_empty() {
            return Ok(cns);
        }

        let (start, end) = match self.orientation {
            Orientation::Horizontal => (Anchor::Left, Anchor::Right),
            Orientation::Vertical => (Anchor::Top, Anchor::Bottom),
        };

        let mut prev: Option<&ConstraintsNamespace> = None;
        for &(node, gap) in &runs {
            let ns = (cx.lookup)(node)?;
            if let Some(prev) = prev {
                let next_start = match self.orientation {
                    Orientation::Horizontal => prev.anchor(end) + gap,
                    Orientation::Vertical => prev.anchor(end) - gap,
                };
                cns.push(eq(ns.anchor(start), next_start, REQUIRED));
            }
            prev = Some(ns);
        }

        if !self.enclosed {
            return Ok(cns);
        }

        let container = cx.container;
        let m = self.margins;
        let first = (cx.lookup)(runs[0].0)?;
        let last = (cx.lookup)(runs[runs.len() - 1].0)?;
        match self.orientation {
            Orientation::Horizontal => {
                cns.push(eq(
                    first.anchor(Anchor::Left),
                    container.anchor(Anchor::ContentsLeft) + (m.left + leading),
                    REQUIRED,
                ));
                cns.push(eq(
                    last.anchor(Anchor::Right),
                    container.anchor(Anchor::ContentsRight) - (m.right + trailing),
                    REQUIRED,
                ));
            }
            Orientation::Vertical => {
                cns.push(eq(
                    first.anchor(Anchor::Top),
                    container.anchor(Anchor::ContentsTop) - (m.top + leading),
                    REQUIRED,
                ));
                cns.push(eq(
                    last.anchor(Anchor::Bottom),
                    container.anchor(Anchor::ContentsBottom) + (m.bottom + trailing),
                    REQUIRED,
                ));
            }
        }

        // Cross axis: stay inside the contents box, stretch to it if possible
        let (low, high, contents_low, contents_high, inset_low, inset_high) = match self.orientation
        {
            Orientation::Horizontal => (
                Anchor::Bottom,
                Anchor::Top,
                Anchor::ContentsBottom,
                Anchor::ContentsTop,
                m.bottom,
                m.top,
            ),
            Orientation::Vertical => (
                Anchor::Left,
                Anchor::Right,
                Anchor::ContentsLeft,
                Anchor::ContentsRight,
                m.left,
                m.right,
            ),
        };
        let low_edge = container.anchor(contents_low) + inset_low;
        let high_edge = container.anchor(contents_high) - inset_high;
        for &(node, _) in &runs {
            let ns = (cx.lookup)(node)?;
            cns.push(ge(ns.anchor(low), low_edge.clone(), REQUIRED));
            cns.push(le(ns.anchor(high), high_edge.clone(), REQUIRED));
            if let Some(stretch) = cx.stretch {
                cns.push(eq(ns.anchor(low), low_edge.clone(), stretch));
                cns.push(eq(ns.anchor(high), high_edge.clone(), stretch));
            }
        }
        Ok(cns)
    }
}

/// Stack top to bottom inside the container's contents box
pub fn vbox<I, T>(items: I) -> LinearBox
where
    I: IntoIterator<Item = T>,
    T: Into<BoxItem>,
{
    LinearBox::new(Orientation::Vertical, true, items)
}

/// Stack left to right inside the container's contents box
pub fn hbox<I, T>(items: I) -> LinearBox
where
    I: IntoIterator<Item = T>,
    T: Into<BoxItem>,
{
    LinearBox::new(Orientation::Horizontal, true, items)
}

/// Chain left to right without touching the container
pub fn horizontal<I, T>(items: I) -> LinearBox
where
    I: IntoIterator<Item = T>,
    T: Into<BoxItem>,
{
    LinearBox::new(Orientation::Horizontal, false, items)
}

/// Chain top to bottom without touching the container
pub fn vertical<I, T>(items: I) -> LinearBox
where
    I: IntoIterator<Item = T>,
    T: Into<BoxItem>,
{
    LinearBox::new(Orientation::Vertical, false, items)
}

/// Components sharing the value of one anchor
#[derive(Debug, Clone)]
pub struct Alignment {
    anchor: Anchor,
    items: Vec<NodeId>,
    policy: SizePolicy,
}

impl Alignment {
    pub fn with_policy(mut self, policy: SizePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn expand(&self, cx: &ExpandContext<'_>) -> Result<Vec<Constraint>> {
        let Some(strength) = policy_strength(self.policy) else {
            return Ok(Vec::new());
        };
        let Some((&first, rest)) = self.items.split_first() else {
            return Ok(Vec::new());
        };
        let target = (cx.lookup)(first)?.anchor(self.anchor);
        rest.iter()
            .map(|&node| -> Result<Constraint> {
                let anchor = (cx.lookup)(node)?.anchor(self.anchor);
                Ok(eq(anchor, target.clone(), strength))
            })
            .collect()
    }
}

/// Align `anchor` of every item to the first item's
pub fn align(anchor: Anchor, items: impl IntoIterator<Item = NodeId>) -> Alignment {
    Alignment {
        anchor,
        items: items.into_iter().collect(),
        policy: SizePolicy::Strong,
    }
}

impl LayoutHelper {
    /// Components the helper refers to
    pub fn components(&self) -> Vec<NodeId> {
        match self {
            LayoutHelper::Box(b) => b.components().collect(),
            LayoutHelper::Align(a) => a.items.clone(),
        }
    }

    pub(crate) fn expand(&self, cx: &ExpandContext<'_>) -> Result<Vec<Constraint>> {
        match self {
            LayoutHelper::Box(b) => b.expand(cx),
            LayoutHelper::Align(a) => a.expand(cx),
        }
    }
}

/// What a helper needs to expand
pub(crate) struct ExpandContext<'a> {
    /// Namespace of the container that declared the helper
    pub container: &'a ConstraintsNamespace,
    pub lookup: &'a dyn Fn(NodeId) -> Result<&'a ConstraintsNamespace>,
    /// Cross-axis stretch strength, `None` to skip stretching
    pub stretch: Option<f64>,
    pub default_spacing: f64,
}

pub(crate) fn eq(lhs: Expression, rhs: Expression, strength: f64) -> Constraint {
    Constraint::new(lhs - rhs, RelationalOperator::Equal, strength)
}

pub(crate) fn ge(lhs: Expression, rhs: Expression, strength: f64) -> Constraint {
    Constraint::new(lhs - rhs, RelationalOperator::GreaterOrEqual, strength)
}

pub(crate) fn le(lhs: Expression, rhs: Expression, strength: f64) -> Constraint {
    Constraint::new(lhs - rhs, RelationalOperator::LessOrEqual, strength)
}
