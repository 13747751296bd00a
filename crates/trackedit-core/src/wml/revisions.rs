use crate::xml::namespaces::W;
use crate::xml::{XAttribute, XmlTree};
use chrono::{DateTime, Utc};
use indextree::NodeId;
use serde::Serialize;

/// Author and timestamp stamped onto every envelope this session emits.
#[derive(Debug, Clone)]
pub struct RevisionSettings {
    pub author: String,
    pub date_time: String,
}

impl RevisionSettings {
    pub fn for_author(author: &str) -> Self {
        Self {
            author: author.to_string(),
            date_time: now_iso(),
        }
    }
}

impl Default for RevisionSettings {
    fn default() -> Self {
        Self::for_author("Reviewer")
    }
}

pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Allocator for envelope ids, monotonically increasing within one
/// document. Ids are never reused after accept/reject.
#[derive(Debug)]
pub struct IdAllocator {
    next: i32,
}

impl IdAllocator {
    pub fn starting_at(next: i32) -> Self {
        Self { next }
    }

    /// Seed from the largest `w:id` already present so fresh ids never
    /// collide with revisions authored elsewhere.
    pub fn seeded_from(tree: &XmlTree) -> Self {
        let mut max_id = 0;
        if let Some(root) = tree.root() {
            for node in tree.descendants(root) {
                if let Some(value) = tree.attribute(node, &W::id()) {
                    if let Ok(id) = value.parse::<i32>() {
                        max_id = max_id.max(id);
                    }
                }
            }
        }
        Self { next: max_id + 1 }
    }

    pub fn fresh(&mut self) -> i32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Attributes for a new envelope. Attribute order follows ECMA-376:
/// `w:id` first, then author and date.
pub fn envelope_attrs(id: i32, author: &str, date_time: &str) -> Vec<XAttribute> {
    vec![
        XAttribute::new(W::id(), &id.to_string()),
        XAttribute::new(W::author(), author),
        XAttribute::new(W::date(), date_time),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionKind {
    Insertion,
    Deletion,
}

/// Logical view of one `w:ins` / `w:del` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Revision {
    pub id: i32,
    pub kind: RevisionKind,
    pub author: String,
    pub date: Option<DateTime<Utc>>,
    pub text: String,
}

/// All revisions in document order, projected and sorted by id.
pub fn list_revisions(tree: &XmlTree, author: Option<&str>) -> Vec<Revision> {
    let Some(root) = tree.root() else {
        return Vec::new();
    };

    let mut revisions = Vec::new();
    for node in tree.descendants(root) {
        let Some(name) = tree.name(node) else { continue };
        let kind = if name.is(W::NS, "ins") {
            RevisionKind::Insertion
        } else if name.is(W::NS, "del") {
            RevisionKind::Deletion
        } else {
            continue;
        };
        let Some(rev) = project_revision(tree, node, kind) else {
            continue;
        };
        if author.map(|a| rev.author == a).unwrap_or(true) {
            revisions.push(rev);
        }
    }

    revisions.sort_by_key(|r| r.id);
    revisions
}

fn project_revision(tree: &XmlTree, envelope: NodeId, kind: RevisionKind) -> Option<Revision> {
    let id = tree.attribute(envelope, &W::id())?.parse::<i32>().ok()?;
    let author = tree
        .attribute(envelope, &W::author())
        .unwrap_or("Unknown")
        .to_string();
    let date = tree
        .attribute(envelope, &W::date())
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc));

    let leaf_tag = match kind {
        RevisionKind::Insertion => "t",
        RevisionKind::Deletion => "delText",
    };
    let mut text = String::new();
    for leaf in tree.descendants_named(envelope, W::NS, leaf_tag) {
        text.push_str(&tree.text_of(leaf));
    }

    Some(Revision {
        id,
        kind,
        author,
        date,
        text,
    })
}

fn find_envelope(tree: &XmlTree, local: &str, id: i32) -> Option<NodeId> {
    let root = tree.root()?;
    let wanted = id.to_string();
    tree.descendants_named(root, W::NS, local)
        .find(|&node| tree.attribute(node, &W::id()) == Some(wanted.as_str()))
}

/// Accept one revision: unwrap an insertion (content survives) or drop
/// a deletion with its contents. Returns false when the id is unknown.
pub fn accept_revision(tree: &mut XmlTree, id: i32) -> bool {
    if let Some(ins) = find_envelope(tree, "ins", id) {
        tree.unwrap(ins);
        return true;
    }
    if let Some(del) = find_envelope(tree, "del", id) {
        tree.remove(del);
        return true;
    }
    false
}

/// Reject one revision: drop an insertion with its contents, or restore
/// a deletion by converting deleted-text leaves back to visible spans.
pub fn reject_revision(tree: &mut XmlTree, id: i32) -> bool {
    if let Some(ins) = find_envelope(tree, "ins", id) {
        tree.remove(ins);
        return true;
    }
    if let Some(del) = find_envelope(tree, "del", id) {
        restore_deletion(tree, del);
        return true;
    }
    false
}

fn restore_deletion(tree: &mut XmlTree, del: NodeId) {
    // delText -> t in place; renaming keeps children and every leaf
    // attribute (xml:space included).
    let leaves: Vec<NodeId> = tree.descendants_named(del, W::NS, "delText").collect();
    for leaf in leaves {
        if let Some(name) = tree.get_mut(leaf).and_then(|d| d.name_mut()) {
            *name = W::t();
        }
    }

    let runs: Vec<NodeId> = tree.descendants_named(del, W::NS, "r").collect();
    for run in runs {
        let deleted_rsid = tree.attribute(run, &W::rsidDel()).map(str::to_string);
        if let Some(value) = deleted_rsid {
            tree.set_attribute(run, &W::rsidR(), &value);
            tree.remove_attribute(run, &W::rsidDel());
        }
    }

    tree.unwrap(del);
}

/// Accept every revision (optionally one author's), most recent id
/// first so earlier locators stay valid. Returns the count applied.
pub fn accept_all(tree: &mut XmlTree, author: Option<&str>) -> usize {
    bulk(tree, author, accept_revision)
}

/// Reject every revision (optionally one author's) in descending id
/// order. Returns the count applied.
pub fn reject_all(tree: &mut XmlTree, author: Option<&str>) -> usize {
    bulk(tree, author, reject_revision)
}

fn bulk(tree: &mut XmlTree, author: Option<&str>, apply: fn(&mut XmlTree, i32) -> bool) -> usize {
    let mut revisions = list_revisions(tree, author);
    revisions.sort_by_key(|r| std::cmp::Reverse(r.id));

    let mut count = 0;
    for rev in revisions {
        if apply(tree, rev.id) {
            count += 1;
        }
    }
    count
}
