//! Tree rewriting for tracked edits.
//!
//! Every mutating operation resolves to one of three modes (replace,
//! delete, insert near anchor), each with a simple path for a match
//! confined to a lone text span and a cross-boundary path for matches
//! scattered over several spans or runs. Regions already inside a
//! `w:ins` envelope are carved out in place instead of being wrapped in
//! a contradictory `w:del`.

use super::revisions::{envelope_attrs, IdAllocator, RevisionSettings};
use super::text_map::{TextMatch, TextPosition};
use crate::error::{EditError, Result};
use crate::xml::namespaces::{W, XML};
use crate::xml::{NodeData, XName, XmlTree};
use indextree::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertSide {
    Before,
    After,
}

/// Matched characters of one leaf: char offsets `first..=last`.
#[derive(Clone, Copy, Debug)]
struct LeafGroup {
    leaf: NodeId,
    run: NodeId,
    first: usize,
    last: usize,
}

/// Maximal contiguous partition of a match by revision context.
#[derive(Clone, Debug)]
pub struct Segment {
    pub inside_insertion: bool,
    pub positions: Vec<TextPosition>,
}

pub fn classify_segments(positions: &[TextPosition]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    for pos in positions {
        match segments.last_mut() {
            Some(seg) if seg.inside_insertion == pos.inside_insertion => {
                seg.positions.push(*pos);
            }
            _ => segments.push(Segment {
                inside_insertion: pos.inside_insertion,
                positions: vec![*pos],
            }),
        }
    }
    segments
}

fn char_slice(s: &str, from: usize, to: usize) -> String {
    s.chars().skip(from).take(to.saturating_sub(from)).collect()
}

fn needs_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

pub struct Rewriter<'a> {
    tree: &'a mut XmlTree,
    ids: &'a mut IdAllocator,
    settings: &'a RevisionSettings,
}

enum SegmentPlan {
    Regular { groups: Vec<LeafGroup> },
    InsideInsertion { envelope: NodeId, groups: Vec<LeafGroup> },
}

impl<'a> Rewriter<'a> {
    pub fn new(
        tree: &'a mut XmlTree,
        ids: &'a mut IdAllocator,
        settings: &'a RevisionSettings,
    ) -> Self {
        Self {
            tree,
            ids,
            settings,
        }
    }

    // ----- simple path: match confined to a lone text span -----

    pub fn simple_replace(&mut self, leaf: NodeId, query: &str, replacement: &str) -> Result<i32> {
        let run = self.run_of(leaf)?;
        let (before, after) = self.split_around(leaf, query)?;

        if self.inside_insertion(run) {
            // The envelope already marks this text as ours; edit in place.
            let value = format!("{before}{replacement}{after}");
            self.tree.set_text(leaf, &value);
            self.stamp_preserve(leaf);
            return Ok(-1);
        }

        let sentinel = self.sentinel_before(run);
        let mut cursor = sentinel;
        if !before.is_empty() {
            cursor = self.emit_run_text(cursor, run, &before);
        }
        let (del, _) = self.emit_deletion(cursor, run, query);
        cursor = del;
        let (ins, ins_id) = self.emit_insertion(cursor, run, replacement);
        cursor = ins;
        if !after.is_empty() {
            self.emit_run_text(cursor, run, &after);
        }
        self.tree.remove(run);
        self.tree.remove(sentinel);
        Ok(ins_id)
    }

    pub fn simple_delete(&mut self, leaf: NodeId, query: &str) -> Result<i32> {
        let run = self.run_of(leaf)?;
        let (before, after) = self.split_around(leaf, query)?;

        if self.inside_insertion(run) {
            let remnant = format!("{before}{after}");
            if remnant.is_empty() {
                self.remove_leaf_cascade(leaf, run);
            } else {
                self.tree.set_text(leaf, &remnant);
                self.stamp_preserve(leaf);
            }
            return Ok(-1);
        }

        let sentinel = self.sentinel_before(run);
        let mut cursor = sentinel;
        if !before.is_empty() {
            cursor = self.emit_run_text(cursor, run, &before);
        }
        let (del, del_id) = self.emit_deletion(cursor, run, query);
        cursor = del;
        if !after.is_empty() {
            self.emit_run_text(cursor, run, &after);
        }
        self.tree.remove(run);
        self.tree.remove(sentinel);
        Ok(del_id)
    }

    pub fn simple_insert(
        &mut self,
        leaf: NodeId,
        anchor: &str,
        text: &str,
        side: InsertSide,
    ) -> Result<i32> {
        let run = self.run_of(leaf)?;
        let (before, after) = self.split_around(leaf, anchor)?;

        if self.inside_insertion(run) {
            // No envelope wrapper: the enclosing one already attributes
            // the new text. Split at the anchor and splice a bare run
            // beside it.
            let sentinel = self.sentinel_before(run);
            let mut cursor = sentinel;
            if !before.is_empty() {
                cursor = self.emit_run_text(cursor, run, &before);
            }
            match side {
                InsertSide::Before => {
                    cursor = self.emit_run_text(cursor, run, text);
                    cursor = self.emit_run_text(cursor, run, anchor);
                }
                InsertSide::After => {
                    cursor = self.emit_run_text(cursor, run, anchor);
                    cursor = self.emit_run_text(cursor, run, text);
                }
            }
            if !after.is_empty() {
                self.emit_run_text(cursor, run, &after);
            }
            self.tree.remove(run);
            self.tree.remove(sentinel);
            return Ok(-1);
        }

        let sentinel = self.sentinel_before(run);
        let mut cursor = sentinel;
        if !before.is_empty() {
            cursor = self.emit_run_text(cursor, run, &before);
        }
        let ins_id;
        match side {
            InsertSide::Before => {
                let (ins, id) = self.emit_insertion(cursor, run, text);
                ins_id = id;
                cursor = ins;
                cursor = self.emit_run_text(cursor, run, anchor);
            }
            InsertSide::After => {
                cursor = self.emit_run_text(cursor, run, anchor);
                let (ins, id) = self.emit_insertion(cursor, run, text);
                ins_id = id;
                cursor = ins;
            }
        }
        if !after.is_empty() {
            self.emit_run_text(cursor, run, &after);
        }
        self.tree.remove(run);
        self.tree.remove(sentinel);
        Ok(ins_id)
    }

    // ----- cross-boundary paths -----

    pub fn replace(&mut self, m: &TextMatch, replacement: &str) -> Result<i32> {
        if m.spans_boundary {
            return self.mixed(m, Some(replacement));
        }
        let groups = self.leaf_groups(&m.positions)?;
        if m.positions[0].inside_insertion {
            self.carve_in_insertion(&groups, Some(replacement))
        } else {
            self.rewrite_groups(&groups, Some(replacement))
        }
    }

    pub fn delete(&mut self, m: &TextMatch) -> Result<i32> {
        if m.spans_boundary {
            return self.mixed(m, None);
        }
        let groups = self.leaf_groups(&m.positions)?;
        if m.positions[0].inside_insertion {
            self.carve_in_insertion(&groups, None)
        } else {
            self.rewrite_groups(&groups, None)
        }
    }

    pub fn insert(&mut self, m: &TextMatch, text: &str, side: InsertSide) -> Result<i32> {
        let groups = self.leaf_groups(&m.positions)?;
        let (Some(&first), Some(&last)) = (groups.first(), groups.last()) else {
            return Ok(-1);
        };
        let boundary = match side {
            InsertSide::Before => first,
            InsertSide::After => last,
        };

        if m.spans_boundary {
            // The anchor itself is untouched; splice next to its
            // boundary run without rebuilding.
            return Ok(self.splice_adjacent(boundary.run, text, side));
        }

        let in_ins = m.positions[0].inside_insertion;
        self.rebuild_for_insert(&groups, text, side, in_ins)
    }

    /// Same-context rebuild: re-emit the affected runs leaf by leaf,
    /// wrapping matched slices in deletions and carrying unmatched
    /// sibling spans through verbatim. A replacement, when present, is
    /// emitted once, immediately after the last deletion wrapper.
    fn rewrite_groups(&mut self, groups: &[LeafGroup], replacement: Option<&str>) -> Result<i32> {
        let (Some(&first), Some(&last)) = (groups.first(), groups.last()) else {
            return Ok(-1);
        };
        let runs = dedup_runs(groups);
        let prop_source = first.run;
        let last_leaf = last.leaf;

        let sentinel = self.sentinel_before(runs[0]);
        let mut cursor = sentinel;
        let mut first_del_id = -1;
        let mut ins_id = -1;

        for &run in &runs {
            let children: Vec<NodeId> = self.tree.children(run).collect();
            for child in children {
                let Some(name) = self.tree.name(child) else {
                    continue;
                };
                if name.is(W::NS, "rPr") {
                    continue;
                }
                let group = if name.is(W::NS, "t") {
                    groups.iter().find(|g| g.leaf == child)
                } else {
                    None
                };
                let Some(g) = group else {
                    cursor = self.emit_run_carrying(cursor, run, child);
                    continue;
                };

                let value = self.tree.text_of(g.leaf);
                let total = value.chars().count();
                let before = char_slice(&value, 0, g.first);
                let matched = char_slice(&value, g.first, g.last + 1);
                let after = char_slice(&value, g.last + 1, total);

                if !before.is_empty() {
                    cursor = self.emit_run_text(cursor, run, &before);
                }
                let (del, del_id) = self.emit_deletion(cursor, run, &matched);
                cursor = del;
                if first_del_id < 0 {
                    first_del_id = del_id;
                }
                if child == last_leaf {
                    if let Some(rep) = replacement {
                        let (ins, id) = self.emit_insertion(cursor, prop_source, rep);
                        cursor = ins;
                        ins_id = id;
                    }
                }
                if !after.is_empty() {
                    cursor = self.emit_run_text(cursor, run, &after);
                }
            }
        }

        for &run in &runs {
            self.tree.remove(run);
        }
        self.tree.remove(sentinel);

        Ok(if replacement.is_some() {
            ins_id
        } else {
            first_del_id
        })
    }

    /// Match lying wholly inside one insertion envelope: never emit a
    /// deletion there. Carve the matched region out of the envelope
    /// and, for a replace, put the replacement where the match was.
    fn carve_in_insertion(&mut self, groups: &[LeafGroup], replacement: Option<&str>) -> Result<i32> {
        let (Some(&first), Some(&last)) = (groups.first(), groups.last()) else {
            return Ok(-1);
        };
        let envelope = self
            .tree
            .ancestor_named(first.run, W::NS, "ins")
            .ok_or_else(|| {
                EditError::MalformedTree("insertion context without w:ins ancestor".to_string())
            })?;

        let env_leaves = self.envelope_leaf_count(envelope);
        let last_total = self.tree.text_of(last.leaf).chars().count();
        let consumed_whole =
            first.first == 0 && last.last + 1 == last_total && groups.len() == env_leaves;

        if consumed_whole {
            // The whole envelope goes away; a bare replacement would
            // lose attribution, so wrap it freshly for this session.
            let mut result = -1;
            if let Some(rep) = replacement {
                let anchor = self.sentinel_before(envelope);
                let (_, id) = self.emit_insertion(anchor, first.run, rep);
                result = id;
                self.tree.remove(envelope);
                self.tree.remove(anchor);
            } else {
                self.tree.remove(envelope);
            }
            return Ok(result);
        }

        // Park the replacement at the carve point before shrinking: a
        // new span beside the first matched leaf keeps it in the right
        // spot through the truncations, inside the run whose properties
        // it should share.
        if let Some(rep) = replacement {
            let leaf = if first.first > 0 {
                self.tree.add_after(first.leaf, NodeData::element(W::t()))
            } else {
                self.tree.add_before(first.leaf, NodeData::element(W::t()))
            };
            if needs_preserve(rep) {
                self.tree.set_attribute(leaf, &XML::space(), "preserve");
            }
            self.tree.add_child(leaf, NodeData::text(rep));
        }

        self.shrink_insertion(envelope, groups);
        Ok(-1)
    }

    /// Mixed-context match: process segment by segment, then settle the
    /// replacement's position once the deletions have landed. A sentinel
    /// ahead of the first affected node survives the churn among its
    /// right siblings.
    fn mixed(&mut self, m: &TextMatch, replacement: Option<&str>) -> Result<i32> {
        let mut plans = Vec::new();
        for seg in classify_segments(&m.positions) {
            let groups = self.leaf_groups(&seg.positions)?;
            if seg.inside_insertion {
                let envelope = self
                    .tree
                    .ancestor_named(groups[0].run, W::NS, "ins")
                    .ok_or_else(|| {
                        EditError::MalformedTree(
                            "insertion context without w:ins ancestor".to_string(),
                        )
                    })?;
                plans.push(SegmentPlan::InsideInsertion { envelope, groups });
            } else {
                plans.push(SegmentPlan::Regular { groups });
            }
        }

        let (first_top, prop_source) = match plans.first() {
            Some(SegmentPlan::InsideInsertion { envelope, groups }) => match groups.first() {
                Some(g) => (*envelope, g.run),
                None => return Ok(-1),
            },
            Some(SegmentPlan::Regular { groups }) => match groups.first() {
                Some(g) => (g.run, g.run),
                None => return Ok(-1),
            },
            None => return Ok(-1),
        };
        let sentinel = self.sentinel_before(first_top);

        let parked = replacement.map(|rep| self.emit_insertion(sentinel, prop_source, rep));

        let mut first_del_id = -1;
        for plan in &plans {
            match plan {
                SegmentPlan::Regular { groups } => {
                    let del_id = self.rewrite_groups(groups, None)?;
                    if first_del_id < 0 {
                        first_del_id = del_id;
                    }
                }
                SegmentPlan::InsideInsertion { envelope, groups } => {
                    self.shrink_insertion(*envelope, groups);
                }
            }
        }

        if let Some((ins, ins_id)) = parked {
            // Walk right from the sentinel through the contiguous block
            // of deletions; the replacement belongs after the last one.
            let mut last_del = None;
            let mut sib = self.tree.next_sibling(sentinel);
            while let Some(node) = sib {
                sib = self.tree.next_sibling(node);
                if node == ins {
                    continue;
                }
                if self.tree.is_named(node, W::NS, "del") {
                    last_del = Some(node);
                } else if last_del.is_some() {
                    break;
                }
            }
            if let Some(anchor) = last_del {
                self.tree.move_after(ins, anchor);
            }
            self.tree.remove(sentinel);
            return Ok(ins_id);
        }

        self.tree.remove(sentinel);
        Ok(first_del_id)
    }

    /// Remove a matched region from inside a `w:ins` without emitting a
    /// deletion wrapper.
    fn shrink_insertion(&mut self, envelope: NodeId, groups: &[LeafGroup]) {
        let (Some(&first), Some(&last)) = (groups.first(), groups.last()) else {
            return;
        };
        let first_text = self.tree.text_of(first.leaf);
        let last_text = self.tree.text_of(last.leaf);
        let before = char_slice(&first_text, 0, first.first);
        let after = char_slice(&last_text, last.last + 1, last_text.chars().count());

        if before.is_empty() && after.is_empty() && groups.len() == self.envelope_leaf_count(envelope)
        {
            self.tree.remove(envelope);
            return;
        }

        if groups.len() == 1 {
            if before.is_empty() && after.is_empty() {
                self.remove_leaf_cascade(first.leaf, first.run);
            } else if after.is_empty() {
                self.tree.set_text(first.leaf, &before);
                self.stamp_preserve(first.leaf);
            } else if before.is_empty() {
                self.tree.set_text(first.leaf, &after);
                self.stamp_preserve(first.leaf);
            } else {
                // Middle split: keep the head here, move the tail into a
                // sibling envelope with the same author and date.
                self.tree.set_text(first.leaf, &before);
                self.stamp_preserve(first.leaf);

                let author = self
                    .tree
                    .attribute(envelope, &W::author())
                    .unwrap_or_default()
                    .to_string();
                let date = self
                    .tree
                    .attribute(envelope, &W::date())
                    .unwrap_or_default()
                    .to_string();
                let id = self.ids.fresh();
                let sibling = self.tree.add_after(
                    envelope,
                    NodeData::element_with_attrs(W::ins(), envelope_attrs(id, &author, &date)),
                );
                let shell = self.run_shell(first.run, false);
                let run = self.tree.add_child(sibling, shell);
                self.fill_run(run, first.run, W::t(), &after);
            }
            return;
        }

        if before.is_empty() {
            self.remove_leaf_cascade(first.leaf, first.run);
        } else {
            self.tree.set_text(first.leaf, &before);
            self.stamp_preserve(first.leaf);
        }
        for g in &groups[1..groups.len() - 1] {
            self.remove_leaf_cascade(g.leaf, g.run);
        }
        if after.is_empty() {
            self.remove_leaf_cascade(last.leaf, last.run);
        } else {
            self.tree.set_text(last.leaf, &after);
            self.stamp_preserve(last.leaf);
        }

        if self.envelope_leaf_count(envelope) == 0 {
            self.tree.remove(envelope);
        }
    }

    /// Rebuild the affected runs around an anchor occurrence, splicing
    /// the new text at the requested side of the matched slices.
    fn rebuild_for_insert(
        &mut self,
        groups: &[LeafGroup],
        text: &str,
        side: InsertSide,
        in_ins: bool,
    ) -> Result<i32> {
        let (Some(&first), Some(&last)) = (groups.first(), groups.last()) else {
            return Ok(-1);
        };
        let runs = dedup_runs(groups);
        let prop_source = first.run;
        let first_leaf = first.leaf;
        let last_leaf = last.leaf;

        let sentinel = self.sentinel_before(runs[0]);
        let mut cursor = sentinel;
        let mut ins_id = -1;

        for &run in &runs {
            let children: Vec<NodeId> = self.tree.children(run).collect();
            for child in children {
                let Some(name) = self.tree.name(child) else {
                    continue;
                };
                if name.is(W::NS, "rPr") {
                    continue;
                }
                let group = if name.is(W::NS, "t") {
                    groups.iter().find(|g| g.leaf == child)
                } else {
                    None
                };
                let Some(g) = group else {
                    cursor = self.emit_run_carrying(cursor, run, child);
                    continue;
                };

                let value = self.tree.text_of(g.leaf);
                let total = value.chars().count();
                let before = char_slice(&value, 0, g.first);
                let matched = char_slice(&value, g.first, g.last + 1);
                let after = char_slice(&value, g.last + 1, total);

                if !before.is_empty() {
                    cursor = self.emit_run_text(cursor, run, &before);
                }
                if side == InsertSide::Before && child == first_leaf {
                    cursor = self.emit_inserted_text(cursor, prop_source, text, in_ins, &mut ins_id);
                }
                cursor = self.emit_run_text(cursor, run, &matched);
                if side == InsertSide::After && child == last_leaf {
                    cursor = self.emit_inserted_text(cursor, prop_source, text, in_ins, &mut ins_id);
                }
                if !after.is_empty() {
                    cursor = self.emit_run_text(cursor, run, &after);
                }
            }
        }

        for &run in &runs {
            self.tree.remove(run);
        }
        self.tree.remove(sentinel);
        Ok(ins_id)
    }

    fn emit_inserted_text(
        &mut self,
        cursor: NodeId,
        prop_source: NodeId,
        text: &str,
        in_ins: bool,
        ins_id: &mut i32,
    ) -> NodeId {
        if in_ins {
            self.emit_run_text(cursor, prop_source, text)
        } else {
            let (ins, id) = self.emit_insertion(cursor, prop_source, text);
            *ins_id = id;
            ins
        }
    }

    fn splice_adjacent(&mut self, boundary_run: NodeId, text: &str, side: InsertSide) -> i32 {
        if self.inside_insertion(boundary_run) {
            let shell = self.run_shell(boundary_run, false);
            let bare = match side {
                InsertSide::Before => self.tree.add_before(boundary_run, shell),
                InsertSide::After => self.tree.add_after(boundary_run, shell),
            };
            self.fill_run(bare, boundary_run, W::t(), text);
            return -1;
        }

        let id = self.ids.fresh();
        let data = NodeData::element_with_attrs(
            W::ins(),
            envelope_attrs(id, &self.settings.author, &self.settings.date_time),
        );
        let ins = match side {
            InsertSide::Before => self.tree.add_before(boundary_run, data),
            InsertSide::After => self.tree.add_after(boundary_run, data),
        };
        let shell = self.run_shell(boundary_run, false);
        let run = self.tree.add_child(ins, shell);
        self.fill_run(run, boundary_run, W::t(), text);
        id
    }

    // ----- shared plumbing -----

    fn run_of(&self, leaf: NodeId) -> Result<NodeId> {
        self.tree
            .ancestor_named(leaf, W::NS, "r")
            .ok_or_else(|| EditError::MalformedTree("text span without w:r ancestor".to_string()))
    }

    fn inside_insertion(&self, node: NodeId) -> bool {
        self.tree.ancestor_named(node, W::NS, "ins").is_some()
    }

    fn split_around(&self, leaf: NodeId, query: &str) -> Result<(String, String)> {
        let value = self.tree.text_of(leaf);
        let at = value.find(query).ok_or_else(|| EditError::TextNotFound {
            query: query.to_string(),
            occurrence: 0,
        })?;
        Ok((
            value[..at].to_string(),
            value[at + query.len()..].to_string(),
        ))
    }

    fn leaf_groups(&self, positions: &[TextPosition]) -> Result<Vec<LeafGroup>> {
        let mut groups: Vec<LeafGroup> = Vec::new();
        for pos in positions {
            match groups.last_mut() {
                Some(g) if g.leaf == pos.leaf => g.last = pos.offset,
                _ => {
                    let run = self.run_of(pos.leaf)?;
                    groups.push(LeafGroup {
                        leaf: pos.leaf,
                        run,
                        first: pos.offset,
                        last: pos.offset,
                    });
                }
            }
        }
        Ok(groups)
    }

    fn envelope_leaf_count(&self, envelope: NodeId) -> usize {
        self.tree.descendants_named(envelope, W::NS, "t").count()
    }

    fn sentinel_before(&mut self, node: NodeId) -> NodeId {
        self.tree.add_before(node, NodeData::Comment(String::new()))
    }

    /// Shell of a new run carrying the source run's attributes; for
    /// deletion runs the revision id attribute flips to its deleted
    /// counterpart.
    fn run_shell(&self, source_run: NodeId, for_deletion: bool) -> NodeData {
        let mut attrs = self
            .tree
            .get(source_run)
            .and_then(|d| d.attributes())
            .map(|a| a.to_vec())
            .unwrap_or_default();
        if for_deletion {
            for attr in attrs.iter_mut() {
                if attr.name == W::rsidR() {
                    attr.name = W::rsidDel();
                }
            }
        }
        NodeData::element_with_attrs(W::r(), attrs)
    }

    /// Clone the source run's property block and append a text leaf.
    fn fill_run(&mut self, run: NodeId, source_run: NodeId, leaf_tag: XName, text: &str) {
        let rpr = self.tree.children_named(source_run, W::NS, "rPr").next();
        if let Some(rpr) = rpr {
            self.tree.clone_subtree_under(rpr, run);
        }
        let leaf = self.tree.add_child(run, NodeData::element(leaf_tag));
        if needs_preserve(text) {
            self.tree.set_attribute(leaf, &XML::space(), "preserve");
        }
        self.tree.add_child(leaf, NodeData::text(text));
    }

    fn emit_run_text(&mut self, cursor: NodeId, source_run: NodeId, text: &str) -> NodeId {
        let shell = self.run_shell(source_run, false);
        let run = self.tree.add_after(cursor, shell);
        self.fill_run(run, source_run, W::t(), text);
        run
    }

    /// New run carrying the source run's properties plus a verbatim
    /// deep copy of one child (an unmatched sibling span, a break, ...).
    fn emit_run_carrying(&mut self, cursor: NodeId, source_run: NodeId, child: NodeId) -> NodeId {
        let shell = self.run_shell(source_run, false);
        let run = self.tree.add_after(cursor, shell);
        let rpr = self.tree.children_named(source_run, W::NS, "rPr").next();
        if let Some(rpr) = rpr {
            self.tree.clone_subtree_under(rpr, run);
        }
        self.tree.clone_subtree_under(child, run);
        run
    }

    fn emit_deletion(&mut self, cursor: NodeId, source_run: NodeId, text: &str) -> (NodeId, i32) {
        let id = self.ids.fresh();
        let del = self.tree.add_after(
            cursor,
            NodeData::element_with_attrs(
                W::del(),
                envelope_attrs(id, &self.settings.author, &self.settings.date_time),
            ),
        );
        let shell = self.run_shell(source_run, true);
        let run = self.tree.add_child(del, shell);
        self.fill_run(run, source_run, W::delText(), text);
        (del, id)
    }

    fn emit_insertion(&mut self, cursor: NodeId, source_run: NodeId, text: &str) -> (NodeId, i32) {
        let id = self.ids.fresh();
        let ins = self.tree.add_after(
            cursor,
            NodeData::element_with_attrs(
                W::ins(),
                envelope_attrs(id, &self.settings.author, &self.settings.date_time),
            ),
        );
        let shell = self.run_shell(source_run, false);
        let run = self.tree.add_child(ins, shell);
        self.fill_run(run, source_run, W::t(), text);
        (ins, id)
    }

    fn stamp_preserve(&mut self, leaf: NodeId) {
        self.tree.set_attribute(leaf, &XML::space(), "preserve");
    }

    /// Remove a leaf; drop its run when no text spans remain, and the
    /// enclosing insertion envelope when that empties too.
    fn remove_leaf_cascade(&mut self, leaf: NodeId, run: NodeId) {
        let envelope = self.tree.ancestor_named(run, W::NS, "ins");
        self.tree.remove(leaf);
        if self.tree.children_named(run, W::NS, "t").next().is_none() {
            self.tree.remove(run);
        }
        if let Some(env) = envelope {
            if self.tree.get(env).is_some() && self.envelope_leaf_count(env) == 0 {
                self.tree.remove(env);
            }
        }
    }
}

fn dedup_runs(groups: &[LeafGroup]) -> Vec<NodeId> {
    let mut runs = Vec::new();
    for g in groups {
        if !runs.contains(&g.run) {
            runs.push(g.run);
        }
    }
    runs
}
