//! Layout configuration
//!
//! Strengths and defaults the engine uses when it emits constraints on the
//! caller's behalf. A [`LayoutConfig`] is handed to a [`crate::Scene`] at
//! construction and never changes afterwards.

use cassowary::strength;
use scene_model::SizePolicy;
use serde::{Deserialize, Serialize};

/// Engine-wide layout settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Strength at which an owning container's own width and height are
    /// suggested to its solver session. Must stay below required.
    pub container_strength: f64,
    /// Strength of the default fill equalities and of the cross-axis
    /// stretch emitted by `hbox`/`vbox`
    pub fill_policy: SizePolicy,
    /// Gap between consecutive items of a box helper that sets no spacing
    pub default_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            container_strength: strength::create(100.0, 0.0, 0.0, 1.0),
            fill_policy: SizePolicy::Medium,
            default_spacing: 0.0,
        }
    }
}

impl LayoutConfig {
    pub fn with_default_spacing(mut self, spacing: f64) -> Self {
        self.default_spacing = spacing;
        self
    }

    pub fn with_fill_policy(mut self, policy: SizePolicy) -> Self {
        self.fill_policy = policy;
        self
    }

    /// Container strength clipped into the range an edit variable accepts
    pub(crate) fn edit_strength(&self) -> f64 {
        strength::clip(self.container_strength).min(strength::create(999.0, 999.0, 999.0, 1.0))
    }
}

/// Solver strength for a policy, `None` when the policy is `Ignore`
pub fn policy_strength(policy: SizePolicy) -> Option<f64> {
    match policy {
        SizePolicy::Ignore => None,
        SizePolicy::Weak => Some(strength::WEAK),
        SizePolicy::Medium => Some(strength::MEDIUM),
        SizePolicy::Strong => Some(strength::STRONG),
        SizePolicy::Required => Some(strength::REQUIRED),
    }
}
