#![forbid(unsafe_code)]

//! Mapping-rule hierarchy model.
//!
//! A hierarchy is a tree of [`MappingRule`]s. Each rule carries a nested
//! rule set; its `propertyRules` are the ordered children. Only rules of
//! type [`RuleType::Object`] are navigable branches, every other kind is a
//! leaf as far as the navigation tree is concerned.
//!
//! # Example
//!
//! ```
//! use rulenav_core::rule::{MappingRule, RuleType};
//!
//! let root = MappingRule::root("root")
//!     .child(MappingRule::object("person").with_uri_rule("person-uri"))
//!     .child(MappingRule::new("name", RuleType::Direct));
//!
//! assert_eq!(root.children().len(), 2);
//! assert_eq!(root.branches().count(), 1);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of a mapping rule.
///
/// Decoding an unknown kind is a hierarchy error. A rule that omits `type`
/// decodes as the default, [`RuleType::Direct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum RuleType {
    /// Top-level rule of a mapping.
    Root,
    /// Object rule; the only kind that nests navigable children.
    Object,
    /// Direct value mapping.
    #[default]
    Direct,
    /// Complex (transformation) value mapping.
    Complex,
    /// URI pattern rule.
    Uri,
    /// Complex URI rule.
    ComplexUri,
}

impl RuleType {
    /// Wire name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Object => "object",
            Self::Direct => "direct",
            Self::Complex => "complex",
            Self::Uri => "uri",
            Self::ComplexUri => "complexUri",
        }
    }

    /// Whether rules of this kind are navigable branches.
    #[inline]
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        matches!(self, Self::Object)
    }

    /// Whether this is the top-level rule kind.
    #[inline]
    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }
}

/// Reference to the URI rule attached to an object rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UriRuleRef {
    pub id: String,
}

/// Target type assigned by an object rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct TypeRule {
    pub type_name: String,
}

/// Schema element a rule maps onto.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MappingTarget {
    pub uri: String,
}

/// Free-form rule metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuleMetadata {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub label: Option<String>,
}

/// Nested rule set of a mapping rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct RuleSet {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub uri_rule: Option<UriRuleRef>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub type_rules: Vec<TypeRule>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub property_rules: Vec<MappingRule>,
}

/// A node of the mapping hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct MappingRule {
    id: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    rule_type: RuleType,
    rules: RuleSet,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    mapping_target: Option<MappingTarget>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    metadata: Option<RuleMetadata>,
}

impl MappingRule {
    /// Create a rule of the given kind with no children.
    #[must_use]
    pub fn new(id: impl Into<String>, rule_type: RuleType) -> Self {
        Self {
            id: id.into(),
            rule_type,
            ..Self::default()
        }
    }

    /// Create a top-level rule.
    #[must_use]
    pub fn root(id: impl Into<String>) -> Self {
        Self::new(id, RuleType::Root)
    }

    /// Create an object rule.
    #[must_use]
    pub fn object(id: impl Into<String>) -> Self {
        Self::new(id, RuleType::Object)
    }

    /// Append a property rule.
    #[must_use]
    pub fn child(mut self, rule: MappingRule) -> Self {
        self.rules.property_rules.push(rule);
        self
    }

    /// Replace the property rules.
    #[must_use]
    pub fn with_children(mut self, rules: Vec<MappingRule>) -> Self {
        self.rules.property_rules = rules;
        self
    }

    /// Attach a URI rule reference.
    #[must_use]
    pub fn with_uri_rule(mut self, id: impl Into<String>) -> Self {
        self.rules.uri_rule = Some(UriRuleRef { id: id.into() });
        self
    }

    /// Append a target type.
    #[must_use]
    pub fn with_type_rule(mut self, type_name: impl Into<String>) -> Self {
        self.rules.type_rules.push(TypeRule {
            type_name: type_name.into(),
        });
        self
    }

    /// Set the human-readable label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.metadata = Some(RuleMetadata {
            label: Some(label.into()),
        });
        self
    }

    /// Set the mapping target URI.
    #[must_use]
    pub fn with_target_uri(mut self, uri: impl Into<String>) -> Self {
        self.mapping_target = Some(MappingTarget { uri: uri.into() });
        self
    }

    /// Rule identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rule kind.
    #[must_use]
    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    /// Nested rule set.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Id of the attached URI rule, if any.
    #[must_use]
    pub fn uri_rule_id(&self) -> Option<&str> {
        self.rules.uri_rule.as_ref().map(|uri| uri.id.as_str())
    }

    /// Ordered property rules, of every kind.
    #[must_use]
    pub fn children(&self) -> &[MappingRule] {
        &self.rules.property_rules
    }

    /// Property rules that are navigable branches.
    pub fn branches(&self) -> impl Iterator<Item = &MappingRule> {
        self.children().iter().filter(|r| r.rule_type.is_branch())
    }

    /// Label from metadata, if present and non-empty.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.label.as_deref())
            .filter(|l| !l.is_empty())
    }

    /// Mapping target URI, if present and non-empty.
    #[must_use]
    pub fn target_uri(&self) -> Option<&str> {
        self.mapping_target
            .as_ref()
            .map(|t| t.uri.as_str())
            .filter(|u| !u.is_empty())
    }

    /// Display title: label, else target URI, else id.
    #[must_use]
    pub fn title(&self) -> &str {
        self.label()
            .or_else(|| self.target_uri())
            .unwrap_or(&self.id)
    }

    /// Names of the target types.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.rules.type_rules.iter().map(|t| t.type_name.as_str())
    }

    /// A rule with neither an id nor children carries nothing to render.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.rules.property_rules.is_empty()
    }

    /// Count this rule and all descendants.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.children()
            .iter()
            .fold(1usize, |acc, child| acc.saturating_add(child.node_count()))
    }

    /// Depth-first search for a rule by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&MappingRule> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }

    /// Copy of this rule without its property rules.
    pub(crate) fn shallow_clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            rule_type: self.rule_type,
            rules: RuleSet {
                uri_rule: self.rules.uri_rule.clone(),
                type_rules: self.rules.type_rules.clone(),
                property_rules: Vec::new(),
            },
            mapping_target: self.mapping_target.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Response of a hierarchy request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Hierarchy {
    pub hierarchy: Option<MappingRule>,
}

impl Hierarchy {
    /// Wrap a root rule.
    #[must_use]
    pub fn new(root: MappingRule) -> Self {
        Self {
            hierarchy: Some(root),
        }
    }

    /// The root rule, unless absent or empty.
    #[must_use]
    pub fn root(&self) -> Option<&MappingRule> {
        self.hierarchy.as_ref().filter(|r| !r.is_empty())
    }

    /// Take the root rule, unless absent or empty.
    #[must_use]
    pub fn into_root(self) -> Option<MappingRule> {
        self.hierarchy.filter(|r| !r.is_empty())
    }
}
