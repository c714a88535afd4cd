use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use tokio::sync::broadcast;

use super::builder::NodeSpec;

/// Records buffered per subscriber before it starts lagging. A lagging
/// subscriber loses records; the detection poll covers for that.
const MUTATION_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One child-list change: `added` were inserted under `target`, `removed` were
/// detached from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollBehavior {
    Auto,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollBlock {
    Start,
    Center,
    End,
    Nearest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrollRequest {
    pub node: NodeId,
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Tree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
    active: Option<NodeId>,
    scrolls: Vec<ScrollRequest>,
}

impl Tree {
    fn allocate(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                kind,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        id
    }

    fn build(&mut self, spec: NodeSpec, parent: NodeId) -> NodeId {
        match spec {
            NodeSpec::Text(content) => self.allocate(NodeKind::Text(content), parent),
            NodeSpec::Element(spec) => {
                let id = self.allocate(
                    NodeKind::Element {
                        tag: spec.tag,
                        attributes: spec.attributes,
                    },
                    parent,
                );
                let children: Vec<NodeId> = spec
                    .children
                    .into_iter()
                    .map(|child| self.build(child, id))
                    .collect();
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.children = children;
                }
                id
            }
        }
    }

    fn attributes_mut(&mut self, node: NodeId) -> Result<&mut Vec<(String, String)>> {
        match self.nodes.get_mut(&node).map(|n| &mut n.kind) {
            Some(NodeKind::Element { attributes, .. }) => Ok(attributes),
            Some(NodeKind::Text(_)) => bail!("node {node} is a text node"),
            None => bail!("unknown node {node}"),
        }
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }
}

/// In-process mirror of the host's live document.
///
/// The host adapter applies its tree changes through [`append`](Self::append)
/// and [`remove`](Self::remove); every change is broadcast as a
/// [`MutationRecord`]. Reads go through a [`DocumentView`], which holds the
/// read lock for its lifetime and must not be kept across an `.await`.
#[derive(Clone)]
pub struct Document {
    tree: Arc<RwLock<Tree>>,
    mutations: broadcast::Sender<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document whose root is an empty `<body>`.
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                kind: NodeKind::Element {
                    tag: "body".into(),
                    attributes: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            },
        );
        let (mutations, _) = broadcast::channel(MUTATION_CHANNEL_CAPACITY);

        Self {
            tree: Arc::new(RwLock::new(Tree {
                nodes,
                root,
                next_id: 1,
                active: None,
                scrolls: Vec::new(),
            })),
            mutations,
        }
    }

    pub fn body(&self) -> NodeId {
        self.read().root
    }

    pub fn view(&self) -> DocumentView<'_> {
        DocumentView { tree: self.read() }
    }

    /// Child-list records for the whole document, in the order changes happen.
    pub fn subscribe(&self) -> broadcast::Receiver<MutationRecord> {
        self.mutations.subscribe()
    }

    /// Inserts a whole subtree as the last child of `parent`.
    pub fn append(&self, parent: NodeId, spec: impl Into<NodeSpec>) -> Result<NodeId> {
        let id = {
            let mut tree = self.write();
            match tree.nodes.get(&parent).map(|n| &n.kind) {
                Some(NodeKind::Element { .. }) => {}
                Some(NodeKind::Text(_)) => bail!("cannot append under text node {parent}"),
                None => bail!("unknown parent node {parent}"),
            }
            let id = tree.build(spec.into(), parent);
            tree.nodes
                .get_mut(&parent)
                .ok_or_else(|| anyhow!("unknown parent node {parent}"))?
                .children
                .push(id);
            id
        };

        self.publish(MutationRecord {
            target: parent,
            added: vec![id],
            removed: Vec::new(),
        });
        Ok(id)
    }

    /// Detaches `node` (and its subtree) from its parent. The detached nodes keep
    /// their ids and contents but are no longer attached to the document.
    pub fn remove(&self, node: NodeId) -> Result<()> {
        let parent = {
            let mut tree = self.write();
            if node == tree.root {
                bail!("cannot remove the document root");
            }
            let parent = tree
                .nodes
                .get(&node)
                .ok_or_else(|| anyhow!("unknown node {node}"))?
                .parent
                .ok_or_else(|| anyhow!("node {node} is already detached"))?;

            if let Some(parent_node) = tree.nodes.get_mut(&parent) {
                parent_node.children.retain(|child| *child != node);
            }
            if let Some(removed) = tree.nodes.get_mut(&node) {
                removed.parent = None;
            }
            if let Some(active) = tree.active {
                if tree.contains(node, active) {
                    tree.active = None;
                }
            }
            parent
        };

        self.publish(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![node],
        });
        Ok(())
    }

    /// Frees a detached subtree. Its ids become unknown, which reads as
    /// detached everywhere. Returns how many nodes were dropped.
    pub fn collect(&self, node: NodeId) -> Result<usize> {
        let mut tree = self.write();
        if node == tree.root {
            bail!("cannot collect the document root");
        }
        let Some(entry) = tree.nodes.get(&node) else {
            return Ok(0);
        };
        if entry.parent.is_some() {
            bail!("node {node} is still attached to a parent");
        }

        let mut pending = vec![node];
        let mut dropped = 0;
        while let Some(id) = pending.pop() {
            if let Some(freed) = tree.nodes.remove(&id) {
                pending.extend(freed.children);
                dropped += 1;
            }
        }
        let Tree { nodes, scrolls, .. } = &mut *tree;
        scrolls.retain(|request| nodes.contains_key(&request.node));
        Ok(dropped)
    }

    /// Removes `node` and frees it in one step, for hosts that never reinsert.
    pub fn discard(&self, node: NodeId) -> Result<usize> {
        self.remove(node)?;
        self.collect(node)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let mut tree = self.write();
        let attributes = tree.attributes_mut(node)?;
        let name = name.to_ascii_lowercase();
        match attributes.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name, value.to_string())),
        }
        Ok(())
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<()> {
        let mut tree = self.write();
        let attributes = tree.attributes_mut(node)?;
        let name = name.to_ascii_lowercase();
        attributes.retain(|(existing, _)| *existing != name);
        Ok(())
    }

    /// Moves focus to `node` if it can take focus right now. Mirrors the DOM:
    /// a refused focus leaves the active element untouched and reports nothing,
    /// so callers verify through [`DocumentView::active_element`].
    pub fn focus(&self, node: NodeId) {
        let mut tree = self.write();
        if DocumentView::focusable_in(&tree, node) {
            tree.active = Some(node);
        }
    }

    pub fn blur(&self) {
        self.write().active = None;
    }

    pub fn scroll_into_view(
        &self,
        node: NodeId,
        behavior: ScrollBehavior,
        block: ScrollBlock,
    ) -> Result<()> {
        let mut tree = self.write();
        if !tree.is_attached(node) {
            bail!("cannot scroll detached node {node} into view");
        }
        tree.scrolls.push(ScrollRequest {
            node,
            behavior,
            block,
        });
        Ok(())
    }

    /// Scroll requests issued so far, oldest first. The host adapter drains
    /// these into the real viewport.
    pub fn take_scroll_requests(&self) -> Vec<ScrollRequest> {
        std::mem::take(&mut self.write().scrolls)
    }

    fn publish(&self, record: MutationRecord) {
        // No receivers simply means nobody is watching yet.
        let _ = self.mutations.send(record);
    }

    fn read(&self) -> RwLockReadGuard<'_, Tree> {
        match self.tree.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        match self.tree.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Read access to a [`Document`] snapshot.
pub struct DocumentView<'a> {
    tree: RwLockReadGuard<'a, Tree>,
}

impl<'a> DocumentView<'a> {
    pub fn root(&self) -> NodeId {
        self.tree.root
    }

    pub fn exists(&self, node: NodeId) -> bool {
        self.tree.nodes.contains_key(&node)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(
            self.tree.nodes.get(&node).map(|n| &n.kind),
            Some(NodeKind::Element { .. })
        )
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match self.tree.nodes.get(&node).map(|n| &n.kind) {
            Some(NodeKind::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Content of a text node; `None` for elements.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.tree.nodes.get(&node).map(|n| &n.kind) {
            Some(NodeKind::Text(content)) => Some(content.as_str()),
            _ => None,
        }
    }

    pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
        match self.tree.nodes.get(&node).map(|n| &n.kind) {
            Some(NodeKind::Element { attributes, .. }) => attributes.as_slice(),
            _ => &[],
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attributes(node)
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> + '_ {
        self.attribute(node, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).any(|c| c == class)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.nodes.get(&node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.tree
            .nodes
            .get(&node)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.tree.is_attached(node)
    }

    /// True when `node` is `ancestor` or lies inside its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.tree.contains(ancestor, node)
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.tree.active
    }

    /// Pre-order walk of the subtree below `node` (excluding `node` itself),
    /// yielding each node with its depth relative to `node`.
    pub fn descendants(&self, node: NodeId) -> Descendants<'_, 'a> {
        let stack = self
            .children(node)
            .iter()
            .rev()
            .map(|child| (*child, 1))
            .collect();
        Descendants { view: self, stack }
    }

    /// Elements carrying `class` below `scope`, in document order.
    pub fn elements_with_class(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|(node, _)| self.has_class(*node, class))
            .map(|(node, _)| node)
            .collect()
    }

    pub fn is_focusable(&self, node: NodeId) -> bool {
        Self::focusable_in(&self.tree, node)
    }

    fn focusable_in(tree: &Tree, node: NodeId) -> bool {
        let Some(NodeKind::Element { tag, attributes }) = tree.nodes.get(&node).map(|n| &n.kind)
        else {
            return false;
        };
        if !tree.is_attached(node) {
            return false;
        }

        let has = |name: &str| attributes.iter().any(|(existing, _)| existing == name);
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(NodeKind::Element { attributes, .. }) = tree.nodes.get(&id).map(|n| &n.kind)
            {
                if attributes
                    .iter()
                    .any(|(name, _)| name == "inert" || name == "hidden")
                {
                    return false;
                }
            }
            current = tree.nodes.get(&id).and_then(|n| n.parent);
        }

        match tag.as_str() {
            "button" | "input" | "select" | "textarea" if has("disabled") => false,
            "button" | "input" | "select" | "textarea" => true,
            "a" if has("href") => true,
            _ => attributes
                .iter()
                .any(|(name, value)| name == "tabindex" && value.trim().parse::<i32>().is_ok()),
        }
    }
}

pub struct Descendants<'v, 'a> {
    view: &'v DocumentView<'a>,
    stack: Vec<(NodeId, usize)>,
}

impl<'v, 'a> Iterator for Descendants<'v, 'a> {
    type Item = (NodeId, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth) = self.stack.pop()?;
        for child in self.view.children(node).iter().rev() {
            self.stack.push((*child, depth + 1));
        }
        Some((node, depth))
    }
}
