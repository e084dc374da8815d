use std::any::Any;
use std::fmt;

use crate::Criterion;
use crate::NodeFilter;
use crate::ProblemSetBuilder;
use crate::ValidateError;
use crate::ValidatorRegistry;

/// How a node is addressed by a [`NodeFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity<'a> {
    /// Shares its parent's location and consumes no filter level, e.g. a
    /// container grouping the providers of a deployment.
    Inherited,
    /// The only node of its kind under its parent; addressed by node name.
    Singleton,
    /// Distinguished from its siblings by a key such as an account name.
    Keyed(&'a str),
}

impl<'a> Identity<'a> {
    pub fn key(&self) -> Option<&'a str> {
        match self {
            Identity::Keyed(key) => Some(key),
            Identity::Inherited | Identity::Singleton => None,
        }
    }

    /// Returns true if the node has a filter level of its own.
    pub fn is_addressable(&self) -> bool {
        !matches!(self, Identity::Inherited)
    }
}

/// An entity in the configuration tree.
///
/// Implementations are usually generated with `#[derive(Node)]`, which
/// collects children from the fields tagged `#[node(child)]`. A parent owns
/// its children; the way back up is a [`NodePath`].
pub trait Node: Any + fmt::Debug + Send + Sync {
    /// Stable lowercase name of this node's role, e.g. `"account"`.
    fn node_name(&self) -> &'static str;

    fn identity(&self) -> Identity<'_>;

    /// The direct children, in declaration order and then insertion order
    /// within collections.
    fn children(&self) -> NodeIterator<'_>;

    /// Whether this node satisfies the criterion for its own level.
    fn matches_locally(&self, criterion: &Criterion) -> bool {
        criterion.admits(self.node_name(), self.identity().key())
    }

    /// Paths of local files this node references.
    fn local_files(&self) -> Vec<&str> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;

    /// Run the validator registered for this node's concrete type.
    fn accept(
        &self,
        problems: &mut ProblemSetBuilder,
        validators: &ValidatorRegistry,
    ) -> Result<(), ValidateError> {
        validators.dispatch(self.as_any(), self.node_name(), problems)
    }
}

/// Iterator over the direct children of a node.
pub struct NodeIterator<'a> {
    inner: std::vec::IntoIter<&'a dyn Node>,
}

impl<'a> NodeIterator<'a> {
    pub fn new(children: Vec<&'a dyn Node>) -> Self {
        Self {
            inner: children.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl<'a> Iterator for NodeIterator<'a> {
    type Item = &'a dyn Node;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for NodeIterator<'_> {}

/// A node together with the chain of ancestors leading to it from the root.
///
/// The ancestors are borrowed, never owned, so a path is only valid while
/// the tree it was taken from is alive.
#[derive(Clone)]
pub struct NodePath<'a> {
    ancestors: Vec<&'a dyn Node>,
    node: &'a dyn Node,
}

impl<'a> NodePath<'a> {
    pub fn root(node: &'a dyn Node) -> Self {
        Self {
            ancestors: Vec::new(),
            node,
        }
    }

    /// The path to `child`, a direct child of this path's node.
    pub fn child(&self, child: &'a dyn Node) -> Self {
        let mut ancestors = Vec::with_capacity(self.ancestors.len() + 1);
        ancestors.extend_from_slice(&self.ancestors);
        ancestors.push(self.node);
        Self {
            ancestors,
            node: child,
        }
    }

    pub fn node(&self) -> &'a dyn Node {
        self.node
    }

    pub fn parent(&self) -> Option<&'a dyn Node> {
        self.ancestors.last().copied()
    }

    /// The nodes from the root down to and including this node.
    pub fn iter(&self) -> impl Iterator<Item = &'a dyn Node> + '_ {
        self.ancestors
            .iter()
            .copied()
            .chain(std::iter::once(self.node))
    }

    /// Paths to this node's direct children.
    pub fn children(&self) -> impl Iterator<Item = NodePath<'a>> + '_ {
        self.node.children().map(|child| self.child(child))
    }

    /// Number of addressable levels from the root down to this node.
    pub fn depth(&self) -> usize {
        self.iter()
            .filter(|node| node.identity().is_addressable())
            .count()
    }

    /// The filter that locates exactly this node.
    ///
    /// Nodes with [`Identity::Inherited`] get their parent's filter.
    pub fn filter(&self) -> NodeFilter {
        self.iter()
            .fold(NodeFilter::global(), |filter, node| match node.identity() {
                Identity::Inherited => filter,
                Identity::Singleton => filter.level(Criterion::node(node.node_name())),
                Identity::Keyed(key) => filter.level(Criterion::exact(node.node_name(), key)),
            })
    }

    /// Returns true if every level from the root down to this node satisfies
    /// the corresponding criterion of `filter`.
    pub fn matches(&self, filter: &NodeFilter) -> bool {
        let mut depth = 0;
        for node in self.iter() {
            if !node.identity().is_addressable() {
                continue;
            }
            match filter.get(depth) {
                Some(criterion) if !node.matches_locally(criterion) => return false,
                Some(_) => depth += 1,
                None => return true,
            }
        }
        true
    }

    pub fn downcast<T: Node>(&self) -> Option<&'a T> {
        self.node.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for NodePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodePath")
            .field("node", &self.node.node_name())
            .field("filter", &self.filter().to_string())
            .finish()
    }
}

/// Find the node addressed by `filter`.
///
/// Returns the first node, in depth-first pre-order, that matches the
/// filter and sits exactly at the filter's depth. The empty filter resolves
/// to the root.
pub fn resolve<'a>(root: &'a dyn Node, filter: &NodeFilter) -> Option<NodePath<'a>> {
    let mut stack = vec![NodePath::root(root)];
    while let Some(path) = stack.pop() {
        if !path.matches(filter) {
            continue;
        }

        let depth = path.depth();
        if depth == filter.len() {
            return Some(path);
        }
        if depth > filter.len() {
            continue;
        }

        let mut children: Vec<NodePath<'a>> = path.children().collect();
        children.reverse();
        stack.extend(children);
    }
    None
}

/// Every node of the tree in depth-first pre-order.
pub fn walk(root: &dyn Node) -> Vec<NodePath<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![NodePath::root(root)];
    while let Some(path) = stack.pop() {
        let mut children: Vec<NodePath<'_>> = path.children().collect();
        children.reverse();
        stack.extend(children);
        out.push(path);
    }
    out
}
