//! Style resolution: an ordered rule list applied to a freshly built tree
//! before diffing, filling only properties not already set on a node.

use indexmap::IndexMap;

use crate::node::Node;
use crate::value::Value;

/// What a rule matches on. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selector {
    pub kind: Option<String>,
    pub key: Option<String>,
}

impl Selector {
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            key: None,
        }
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self {
            kind: None,
            key: Some(key.into()),
        }
    }

    pub fn matches(&self, node: &Node) -> bool {
        if let Some(kind) = &self.kind {
            if node.kind() != kind {
                return false;
            }
        }
        if let Some(key) = &self.key {
            if node.stable_key() != Some(key) {
                return false;
            }
        }
        true
    }
}

/// One selector with the property overrides it contributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleRule {
    pub selector: Selector,
    pub props: IndexMap<String, Value>,
}

impl StyleRule {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            props: IndexMap::new(),
        }
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }
}

/// Apply rules in order over the whole tree. Explicit node properties win;
/// rules only fill gaps.
pub fn apply_styles(node: &mut Node, rules: &[StyleRule]) {
    for rule in rules {
        if rule.selector.matches(node) {
            for (name, value) in &rule.props {
                node.fill_prop(name, value);
            }
        }
    }
    for child in node.child_nodes_mut() {
        apply_styles(child, rules);
    }
}

#[cfg(test)]
#[path = "tests/style_tests.rs"]
mod tests;
