use super::node::NodeData;
use super::xname::{XAttribute, XName};
use indextree::{Arena, NodeId};

/// Mutable XML tree backed by an arena.
///
/// NodeIds are stable handles: they survive sibling insertions and
/// removals elsewhere in the tree, which lets callers group and
/// deduplicate nodes by identity rather than by content.
pub struct XmlTree {
    arena: Arena<NodeData>,
    root: Option<NodeId>,
}

impl XmlTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        let node = self.arena.get(id)?;
        if node.is_removed() {
            return None;
        }
        Some(node.get())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        let node = self.arena.get_mut(id)?;
        if node.is_removed() {
            return None;
        }
        Some(node.get_mut())
    }

    pub fn add_root(&mut self, data: NodeData) -> NodeId {
        let id = self.arena.new_node(data);
        self.root = Some(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let child = self.arena.new_node(data);
        parent.append(child, &mut self.arena);
        child
    }

    pub fn add_before(&mut self, sibling: NodeId, data: NodeData) -> NodeId {
        let new_node = self.arena.new_node(data);
        sibling.insert_before(new_node, &mut self.arena);
        new_node
    }

    pub fn add_after(&mut self, sibling: NodeId, data: NodeData) -> NodeId {
        let new_node = self.arena.new_node(data);
        sibling.insert_after(new_node, &mut self.arena);
        new_node
    }

    /// Remove a node together with its whole subtree.
    pub fn remove(&mut self, node: NodeId) {
        node.remove_subtree(&mut self.arena);
        if self.root == Some(node) {
            self.root = None;
        }
    }

    /// Remove a node, reparenting its children into its place.
    pub fn unwrap(&mut self, node: NodeId) {
        node.remove(&mut self.arena);
        if self.root == Some(node) {
            self.root = None;
        }
    }

    /// Detach `node` (with its subtree) and re-insert it immediately
    /// after `anchor`.
    pub fn move_after(&mut self, node: NodeId, anchor: NodeId) {
        node.detach(&mut self.arena);
        anchor.insert_after(node, &mut self.arena);
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node)?.parent()
    }

    pub fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node)?.previous_sibling()
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node)?.next_sibling()
    }

    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        parent.children(&self.arena)
    }

    /// Depth-first traversal including `node` itself.
    pub fn descendants(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.descendants(&self.arena)
    }

    /// Walk upward including `node` itself.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.ancestors(&self.arena)
    }

    pub fn name(&self, node: NodeId) -> Option<&XName> {
        self.get(node)?.name()
    }

    pub fn is_named(&self, node: NodeId, ns: &str, local: &str) -> bool {
        self.name(node).map(|n| n.is(ns, local)).unwrap_or(false)
    }

    /// Nearest ancestor element (excluding `node`) with the given name.
    pub fn ancestor_named(&self, node: NodeId, ns: &str, local: &str) -> Option<NodeId> {
        self.ancestors(node)
            .skip(1)
            .find(|&a| self.is_named(a, ns, local))
    }

    /// Child elements with the given name, in document order.
    pub fn children_named<'a>(
        &'a self,
        parent: NodeId,
        ns: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(parent)
            .filter(move |&c| self.is_named(c, ns, local))
    }

    /// Descendant elements (excluding `node`) with the given name, in
    /// document order.
    pub fn descendants_named<'a>(
        &'a self,
        node: NodeId,
        ns: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(node)
            .skip(1)
            .filter(move |&d| self.is_named(d, ns, local))
    }

    pub fn attribute(&self, node: NodeId, name: &XName) -> Option<&str> {
        self.get(node)?.attribute(name)
    }

    pub fn has_attribute(&self, node: NodeId, name: &XName) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &XName, value: &str) {
        if let Some(data) = self.get_mut(node) {
            if let Some(attrs) = data.attributes_mut() {
                if let Some(attr) = attrs.iter_mut().find(|a| &a.name == name) {
                    attr.value = value.to_string();
                } else {
                    attrs.push(XAttribute::new(name.clone(), value));
                }
            }
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &XName) {
        if let Some(data) = self.get_mut(node) {
            if let Some(attrs) = data.attributes_mut() {
                attrs.retain(|a| &a.name != name);
            }
        }
    }

    /// Concatenated text children of an element.
    pub fn text_of(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            if let Some(text) = self.get(child).and_then(|d| d.text_content()) {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace the text children of an element with a single text node.
    pub fn set_text(&mut self, node: NodeId, value: &str) {
        let texts: Vec<NodeId> = self
            .children(node)
            .filter(|&c| self.get(c).map(|d| !d.is_element()).unwrap_or(false))
            .collect();
        for t in texts {
            self.remove(t);
        }
        self.add_child(node, NodeData::text(value));
    }

    /// Deep-copy `source` (and its subtree) as the last child of
    /// `parent`. Returns the id of the copy.
    pub fn clone_subtree_under(&mut self, source: NodeId, parent: NodeId) -> Option<NodeId> {
        let data = self.get(source)?.clone();
        let copy = self.add_child(parent, data);
        let children: Vec<NodeId> = self.children(source).collect();
        for child in children {
            self.clone_subtree_under(child, copy);
        }
        Some(copy)
    }
}

impl Default for XmlTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::namespaces::W;

    #[test]
    fn root_and_children() {
        let mut tree = XmlTree::new();
        let root = tree.add_root(NodeData::element(W::body()));
        let a = tree.add_child(root, NodeData::element(W::p()));
        let b = tree.add_child(root, NodeData::element(W::p()));

        assert_eq!(tree.root(), Some(root));
        let children: Vec<_> = tree.children(root).collect();
        assert_eq!(children, vec![a, b]);
    }

    #[test]
    fn add_before_and_after_preserve_order() {
        let mut tree = XmlTree::new();
        let root = tree.add_root(NodeData::element(W::p()));
        let mid = tree.add_child(root, NodeData::element(W::r()));
        let first = tree.add_before(mid, NodeData::element(W::r()));
        let last = tree.add_after(mid, NodeData::element(W::r()));

        let children: Vec<_> = tree.children(root).collect();
        assert_eq!(children, vec![first, mid, last]);
    }

    #[test]
    fn unwrap_promotes_children_in_place() {
        let mut tree = XmlTree::new();
        let root = tree.add_root(NodeData::element(W::p()));
        let before = tree.add_child(root, NodeData::element(W::r()));
        let wrapper = tree.add_child(root, NodeData::element(W::ins()));
        let inner = tree.add_child(wrapper, NodeData::element(W::r()));
        let after = tree.add_child(root, NodeData::element(W::r()));

        tree.unwrap(wrapper);

        let children: Vec<_> = tree.children(root).collect();
        assert_eq!(children, vec![before, inner, after]);
        assert_eq!(tree.parent(inner), Some(root));
    }

    #[test]
    fn remove_drops_whole_subtree() {
        let mut tree = XmlTree::new();
        let root = tree.add_root(NodeData::element(W::p()));
        let wrapper = tree.add_child(root, NodeData::element(W::del()));
        let inner = tree.add_child(wrapper, NodeData::element(W::r()));

        tree.remove(wrapper);

        assert_eq!(tree.children(root).count(), 0);
        assert!(tree.get(inner).is_none());
    }

    #[test]
    fn move_after_relocates_subtree() {
        let mut tree = XmlTree::new();
        let root = tree.add_root(NodeData::element(W::p()));
        let a = tree.add_child(root, NodeData::element(W::r()));
        let b = tree.add_child(root, NodeData::element(W::ins()));
        let inner = tree.add_child(b, NodeData::element(W::r()));
        let c = tree.add_child(root, NodeData::element(W::r()));

        tree.move_after(b, c);

        let children: Vec<_> = tree.children(root).collect();
        assert_eq!(children, vec![a, c, b]);
        assert_eq!(tree.parent(inner), Some(b));
    }

    #[test]
    fn set_and_remove_attribute() {
        let mut tree = XmlTree::new();
        let root = tree.add_root(NodeData::element(W::ins()));
        tree.set_attribute(root, &W::id(), "3");
        assert_eq!(tree.attribute(root, &W::id()), Some("3"));

        tree.set_attribute(root, &W::id(), "4");
        assert_eq!(tree.attribute(root, &W::id()), Some("4"));

        tree.remove_attribute(root, &W::id());
        assert!(!tree.has_attribute(root, &W::id()));
    }

    #[test]
    fn text_of_concatenates_and_set_text_replaces() {
        let mut tree = XmlTree::new();
        let t = tree.add_root(NodeData::element(W::t()));
        tree.add_child(t, NodeData::text("Hello "));
        tree.add_child(t, NodeData::text("world"));
        assert_eq!(tree.text_of(t), "Hello world");

        tree.set_text(t, "replaced");
        assert_eq!(tree.text_of(t), "replaced");
        assert_eq!(tree.children(t).count(), 1);
    }

    #[test]
    fn ancestor_named_skips_self() {
        let mut tree = XmlTree::new();
        let root = tree.add_root(NodeData::element(W::p()));
        let ins = tree.add_child(root, NodeData::element(W::ins()));
        let run = tree.add_child(ins, NodeData::element(W::r()));

        assert_eq!(tree.ancestor_named(run, W::NS, "ins"), Some(ins));
        assert_eq!(tree.ancestor_named(ins, W::NS, "ins"), None);
    }

    #[test]
    fn clone_subtree_copies_structure() {
        let mut tree = XmlTree::new();
        let root = tree.add_root(NodeData::element(W::p()));
        let run = tree.add_child(root, NodeData::element(W::r()));
        let rpr = tree.add_child(run, NodeData::element(W::rPr()));
        tree.add_child(rpr, NodeData::element(XName::new(W::NS, "b")));

        let target = tree.add_child(root, NodeData::element(W::r()));
        let copy = tree.clone_subtree_under(rpr, target).unwrap();

        assert!(tree.is_named(copy, W::NS, "rPr"));
        let inner: Vec<_> = tree.children(copy).collect();
        assert_eq!(inner.len(), 1);
        assert!(tree.is_named(inner[0], W::NS, "b"));
    }
}
