//! The node tree: immutable-per-build descriptions of UI elements.
//!
//! Nodes are built fresh on every rebuild and never mutated in place, except
//! by the runtime itself while resolving deferred content, applying style
//! fills, or stepping animated properties. References across frames are
//! always `TargetRef`s (path + stable key), never pointers into a tree.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::event::HandlerId;
use crate::geometry::Size;
use crate::value::Value;

/// Monotonic node identity, unique per construction.
pub type NodeId = u64;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Callback producing children once the available box size is known.
#[derive(Clone)]
pub struct DeferredContent {
    resolved: bool,
    build: Rc<dyn Fn(Size) -> Vec<Node>>,
}

impl DeferredContent {
    pub fn new(build: impl Fn(Size) -> Vec<Node> + 'static) -> Self {
        Self {
            resolved: false,
            build: Rc::new(build),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn resolve(&mut self, size: Size) -> Vec<Node> {
        self.resolved = true;
        (self.build)(size)
    }
}

impl fmt::Debug for DeferredContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredContent")
            .field("resolved", &self.resolved)
            .finish()
    }
}

/// One element of the UI tree: a type tag, a property bag, named event
/// handler references, and ordered children.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    kind: String,
    key: Option<String>,
    props: IndexMap<String, Value>,
    handlers: IndexMap<String, HandlerId>,
    children: Vec<Node>,
    deferred: Option<DeferredContent>,
}

impl Node {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            kind: kind.into(),
            key: None,
            props: IndexMap::new(),
            handlers: IndexMap::new(),
            children: Vec::new(),
            deferred: None,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn handler(mut self, event: impl Into<String>, id: HandlerId) -> Self {
        self.handlers.insert(event.into(), id);
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attach a "read the available size, then build children" callback.
    pub fn deferred(mut self, build: impl Fn(Size) -> Vec<Node> + 'static) -> Self {
        self.deferred = Some(DeferredContent::new(build));
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn stable_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn props(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    pub fn prop_f32(&self, name: &str) -> Option<f32> {
        self.props.get(name).and_then(Value::as_f32)
    }

    pub fn prop_i64(&self, name: &str) -> Option<i64> {
        self.props.get(name).and_then(Value::as_i64)
    }

    pub fn prop_bool(&self, name: &str) -> Option<bool> {
        self.props.get(name).and_then(Value::as_bool)
    }

    pub fn prop_str(&self, name: &str) -> Option<&str> {
        self.props.get(name).and_then(Value::as_str)
    }

    pub fn set_prop(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.props.insert(name.into(), value.into());
    }

    /// Insert only if the property is not already set. Style fills go
    /// through here so explicit node properties always win.
    pub fn fill_prop(&mut self, name: &str, value: &Value) {
        if !self.props.contains_key(name) {
            self.props.insert(name.to_owned(), value.clone());
        }
    }

    pub fn remove_prop(&mut self, name: &str) -> Option<Value> {
        self.props.shift_remove(name)
    }

    pub fn handlers(&self) -> impl Iterator<Item = (&str, HandlerId)> {
        self.handlers.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn handler_for(&self, event: &str) -> Option<HandlerId> {
        self.handlers.get(event).copied()
    }

    pub fn child_nodes(&self) -> &[Node] {
        &self.children
    }

    pub fn child_nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn deferred_content(&self) -> Option<&DeferredContent> {
        self.deferred.as_ref()
    }

    pub fn deferred_content_mut(&mut self) -> Option<&mut DeferredContent> {
        self.deferred.as_mut()
    }

    /// Resolve a child-index path from this node. Out-of-range paths abort
    /// only this lookup.
    pub fn node_at(&self, path: &[usize]) -> Result<&Node, PathError> {
        let mut node = self;
        for (depth, &index) in path.iter().enumerate() {
            node = node
                .children
                .get(index)
                .ok_or(PathError::OutOfRange { depth, index })?;
        }
        Ok(node)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Result<&mut Node, PathError> {
        let mut node = self;
        for (depth, &index) in path.iter().enumerate() {
            node = node
                .children
                .get_mut(index)
                .ok_or(PathError::OutOfRange { depth, index })?;
        }
        Ok(node)
    }

    /// Depth-first search for a node carrying the given stable key.
    pub fn find_key(&self, key: &str) -> Option<Vec<usize>> {
        fn walk(node: &Node, key: &str, path: &mut Vec<usize>) -> bool {
            if node.key.as_deref() == Some(key) {
                return true;
            }
            for (index, child) in node.children.iter().enumerate() {
                path.push(index);
                if walk(child, key, path) {
                    return true;
                }
                path.pop();
            }
            false
        }
        let mut path = Vec::new();
        walk(self, key, &mut path).then_some(path)
    }
}

/// Structural equality: kind, key, props, and children. Node ids are fresh
/// per construction and handler ids are reissued every build, so neither
/// participates; the diff round-trip property compares with this.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.key == other.key
            && self.props == other.props
            && self.children == other.children
    }
}

/// Structural path failure. The only hard invariant in this layer: paths are
/// validated against current children before dereference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathError {
    OutOfRange { depth: usize, index: usize },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::OutOfRange { depth, index } => {
                write!(f, "child index {index} out of range at depth {depth}")
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Reference to a node that stays valid across rebuilds: a child-index path
/// plus the stable key the node carried when the reference was taken. The
/// key is authoritative on re-resolution since paths shift across rebuilds.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetRef {
    pub path: Vec<usize>,
    pub key: Option<String>,
}

impl TargetRef {
    /// Capture a reference to the node at `path` in `tree`.
    pub fn capture(tree: &Node, path: &[usize]) -> Self {
        let key = tree
            .node_at(path)
            .ok()
            .and_then(|node| node.stable_key().map(str::to_owned));
        Self {
            path: path.to_vec(),
            key,
        }
    }

    /// Re-resolve against the current tree. A target whose key no longer
    /// resolves is dropped (`None`), never an error; keyless targets fall
    /// back to plain path validity.
    pub fn resolve(&self, tree: &Node) -> Option<Vec<usize>> {
        if let Some(key) = &self.key {
            return tree.find_key(key);
        }
        tree.node_at(&self.path).ok().map(|_| self.path.clone())
    }
}

#[cfg(test)]
#[path = "tests/node_tests.rs"]
mod tests;
