use super::revisions::{self, IdAllocator, Revision, RevisionSettings};
use super::rewriter::{InsertSide, Rewriter};
use super::text_map::{TextMap, TextMatch};
use crate::error::{EditError, Result};
use crate::xml::namespaces::W;
use crate::xml::XmlTree;
use indextree::NodeId;

/// Public contract of the revision editor: high-level text operations
/// over one WordprocessingML document tree, every mutation recorded as
/// a tracked revision.
pub struct RevisionEditor {
    tree: XmlTree,
    settings: RevisionSettings,
    ids: IdAllocator,
}

impl RevisionEditor {
    pub fn from_tree(tree: XmlTree, settings: RevisionSettings) -> Result<Self> {
        if tree.root().is_none() {
            return Err(EditError::MalformedTree("document has no root".to_string()));
        }
        let ids = IdAllocator::seeded_from(&tree);
        Ok(Self {
            tree,
            settings,
            ids,
        })
    }

    pub fn parse(xml: &str, settings: RevisionSettings) -> Result<Self> {
        let tree = crate::xml::parser::parse(xml)?;
        Self::from_tree(tree, settings)
    }

    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    pub fn into_tree(self) -> XmlTree {
        self.tree
    }

    pub fn author(&self) -> &str {
        &self.settings.author
    }

    pub fn set_author(&mut self, author: &str) {
        self.settings.author = author.to_string();
    }

    /// Replace the `nth` occurrence of `find` with `with` as a tracked
    /// deletion plus insertion. Returns the insertion's id, or -1 when
    /// the edit was absorbed into an existing insertion envelope.
    pub fn replace(&mut self, find: &str, with: &str, nth: usize) -> Result<i32> {
        self.validate_query(find)?;
        if let Some(leaf) = self.nth_leaf_containing(find, nth) {
            let run = self.run_of(leaf)?;
            if self.run_is_simple(run) {
                return self.rewriter().simple_replace(leaf, find, with);
            }
        }
        let m = self.find_across(find, nth)?;
        self.rewriter().replace(&m, with)
    }

    /// Mark the `nth` occurrence of `find` as deleted. Returns the
    /// deletion's id, or -1 when the text was carved out of an existing
    /// insertion envelope instead.
    pub fn delete(&mut self, find: &str, nth: usize) -> Result<i32> {
        self.validate_query(find)?;
        if let Some(leaf) = self.nth_leaf_containing(find, nth) {
            let run = self.run_of(leaf)?;
            if self.run_is_simple(run) {
                return self.rewriter().simple_delete(leaf, find);
            }
        }
        let m = self.find_across(find, nth)?;
        self.rewriter().delete(&m)
    }

    pub fn insert_before(&mut self, anchor: &str, text: &str, nth: usize) -> Result<i32> {
        self.insert(anchor, text, nth, InsertSide::Before)
    }

    pub fn insert_after(&mut self, anchor: &str, text: &str, nth: usize) -> Result<i32> {
        self.insert(anchor, text, nth, InsertSide::After)
    }

    fn insert(&mut self, anchor: &str, text: &str, nth: usize, side: InsertSide) -> Result<i32> {
        self.validate_query(anchor)?;
        if let Some(leaf) = self.nth_leaf_containing(anchor, nth) {
            let run = self.run_of(leaf)?;
            if self.run_is_simple(run) {
                return self.rewriter().simple_insert(leaf, anchor, text, side);
            }
        }
        let m = self.find_across(anchor, nth)?;
        self.rewriter().insert(&m, text, side)
    }

    pub fn accept(&mut self, id: i32) -> bool {
        revisions::accept_revision(&mut self.tree, id)
    }

    pub fn reject(&mut self, id: i32) -> bool {
        revisions::reject_revision(&mut self.tree, id)
    }

    pub fn accept_all(&mut self, author: Option<&str>) -> usize {
        revisions::accept_all(&mut self.tree, author)
    }

    pub fn reject_all(&mut self, author: Option<&str>) -> usize {
        revisions::reject_all(&mut self.tree, author)
    }

    pub fn list_revisions(&self, author: Option<&str>) -> Vec<Revision> {
        revisions::list_revisions(&self.tree, author)
    }

    /// Whether `text` occurs anywhere in the visible projection.
    pub fn find(&self, text: &str) -> Result<bool> {
        Ok(self.count(text)? > 0)
    }

    /// Occurrences of `text` across all paragraphs, overlap permitted.
    pub fn count(&self, text: &str) -> Result<usize> {
        self.validate_query(text)?;
        let mut total = 0;
        for para in self.paragraphs() {
            total += TextMap::build(&self.tree, para).occurrences(text)?;
        }
        Ok(total)
    }

    /// The visible-text projection: insertion content included,
    /// deletion content skipped, paragraphs joined with newlines.
    pub fn visible_text(&self) -> String {
        let mut parts = Vec::new();
        for para in self.paragraphs() {
            parts.push(TextMap::build(&self.tree, para).text().to_string());
        }
        parts.join("\n")
    }

    fn rewriter(&mut self) -> Rewriter<'_> {
        Rewriter::new(&mut self.tree, &mut self.ids, &self.settings)
    }

    fn validate_query(&self, query: &str) -> Result<()> {
        if query.is_empty() {
            return Err(EditError::InvalidArgument("empty query".to_string()));
        }
        Ok(())
    }

    fn paragraphs(&self) -> Vec<NodeId> {
        match self.tree.root() {
            Some(root) => self.tree.descendants_named(root, W::NS, "p").collect(),
            None => Vec::new(),
        }
    }

    fn run_of(&self, leaf: NodeId) -> Result<NodeId> {
        self.tree
            .ancestor_named(leaf, W::NS, "r")
            .ok_or_else(|| EditError::MalformedTree("text span without w:r ancestor".to_string()))
    }

    /// Fast path: the `nth` visible text-span leaf whose own value
    /// contains the query (each leaf counted once).
    fn nth_leaf_containing(&self, query: &str, nth: usize) -> Option<NodeId> {
        let root = self.tree.root()?;
        let mut seen = 0;
        for leaf in self.tree.descendants_named(root, W::NS, "t") {
            if self.tree.ancestor_named(leaf, W::NS, "del").is_some() {
                continue;
            }
            if self.tree.text_of(leaf).contains(query) {
                if seen == nth {
                    return Some(leaf);
                }
                seen += 1;
            }
        }
        None
    }

    /// The simple path applies only to a run holding exactly one text
    /// span and nothing else beyond its property block; anything richer
    /// goes through the cross-boundary rewrite so siblings survive.
    fn run_is_simple(&self, run: NodeId) -> bool {
        let mut spans = 0;
        for child in self.tree.children(run) {
            let Some(name) = self.tree.name(child) else {
                continue;
            };
            if name.is(W::NS, "rPr") {
                continue;
            }
            if name.is(W::NS, "t") {
                spans += 1;
            } else {
                return false;
            }
        }
        spans == 1
    }

    /// Cross-boundary search: the `nth` occurrence over per-paragraph
    /// text maps, counted across the whole document.
    fn find_across(&self, query: &str, nth: usize) -> Result<TextMatch> {
        let mut seen = 0;
        for para in self.paragraphs() {
            let map = TextMap::build(&self.tree, para);
            let here = map.occurrences(query)?;
            if seen + here > nth {
                if let Some(m) = map.find(query, nth - seen)? {
                    return Ok(m);
                }
            }
            seen += here;
        }
        Err(EditError::TextNotFound {
            query: query.to_string(),
            occurrence: nth,
        })
    }
}
