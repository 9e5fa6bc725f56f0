//! Sizing policies
//!
//! A component states how firmly it wants to keep its preferred size.
//! "Hug" policies pull the size toward the hint; "resist" policies keep it
//! from shrinking below the hint.

use serde::{Deserialize, Serialize};

/// How strongly a size preference is enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizePolicy {
    /// No constraint is emitted
    Ignore,
    Weak,
    Medium,
    Strong,
    /// Must hold exactly; conflicts make the layout infeasible
    Required,
}

impl SizePolicy {
    pub fn is_ignored(self) -> bool {
        self == SizePolicy::Ignore
    }
}

impl std::str::FromStr for SizePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(SizePolicy::Ignore),
            "weak" => Ok(SizePolicy::Weak),
            "medium" => Ok(SizePolicy::Medium),
            "strong" => Ok(SizePolicy::Strong),
            "required" => Ok(SizePolicy::Required),
            other => Err(format!("unknown size policy: {}", other)),
        }
    }
}

/// The four policies a component carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizePolicies {
    pub hug_width: SizePolicy,
    pub hug_height: SizePolicy,
    pub resist_width: SizePolicy,
    pub resist_height: SizePolicy,
}

impl Default for SizePolicies {
    fn default() -> Self {
        Self {
            hug_width: SizePolicy::Weak,
            hug_height: SizePolicy::Weak,
            resist_width: SizePolicy::Strong,
            resist_height: SizePolicy::Strong,
        }
    }
}

impl SizePolicies {
    /// Hug and resist both enforced at `policy`
    pub fn fixed(policy: SizePolicy) -> Self {
        Self {
            hug_width: policy,
            hug_height: policy,
            resist_width: policy,
            resist_height: policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_ordering() {
        assert!(SizePolicy::Weak < SizePolicy::Strong);
        assert!(SizePolicy::Strong < SizePolicy::Required);
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("medium".parse::<SizePolicy>(), Ok(SizePolicy::Medium));
        assert!("sometimes".parse::<SizePolicy>().is_err());
    }

    #[test]
    fn test_partial_policies_from_json() {
        let p: SizePolicies = serde_json::from_str(r#"{"hug_width":"strong"}"#).unwrap();
        assert_eq!(p.hug_width, SizePolicy::Strong);
        assert_eq!(p.resist_height, SizePolicy::Strong);
        assert_eq!(p.hug_height, SizePolicy::Weak);
    }
}
