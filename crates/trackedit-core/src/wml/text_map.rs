use crate::error::{EditError, Result};
use crate::xml::namespaces::W;
use crate::xml::XmlTree;
use indextree::NodeId;
use memchr::memmem;

/// Origin of one visible character: the text-span leaf it came from,
/// its char offset within that leaf, and whether the leaf lies inside
/// an insertion envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextPosition {
    pub leaf: NodeId,
    pub offset: usize,
    pub inside_insertion: bool,
}

/// A located occurrence of a query string within one paragraph.
#[derive(Clone, Debug)]
pub struct TextMatch {
    /// Char index of the first matched character in the paragraph view.
    pub start: usize,
    /// Char index one past the last matched character.
    pub end: usize,
    pub text: String,
    /// One entry per matched character, in document order.
    pub positions: Vec<TextPosition>,
    /// True when the matched characters disagree on `inside_insertion`.
    pub spans_boundary: bool,
}

/// Linear view of a paragraph's visible text.
///
/// Deletion envelope content is invisible and never enters the map;
/// insertion envelope content does, flagged per character. Character
/// units are Unicode code points throughout.
pub struct TextMap {
    text: String,
    positions: Vec<TextPosition>,
    char_starts: Vec<usize>,
}

impl TextMap {
    pub fn build(tree: &XmlTree, paragraph: NodeId) -> Self {
        let mut map = Self {
            text: String::new(),
            positions: Vec::new(),
            char_starts: Vec::new(),
        };
        map.collect(tree, paragraph, false);
        map
    }

    fn collect(&mut self, tree: &XmlTree, node: NodeId, inside_insertion: bool) {
        let children: Vec<NodeId> = tree.children(node).collect();
        for child in children {
            let Some(name) = tree.name(child) else { continue };
            if name.is(W::NS, "del") {
                continue;
            }
            if name.is(W::NS, "t") {
                let value = tree.text_of(child);
                for (offset, ch) in value.chars().enumerate() {
                    self.char_starts.push(self.text.len());
                    self.text.push(ch);
                    self.positions.push(TextPosition {
                        leaf: child,
                        offset,
                        inside_insertion,
                    });
                }
                continue;
            }
            let entering = inside_insertion || name.is(W::NS, "ins");
            self.collect(tree, child, entering);
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Find the `nth` (0-based) occurrence of `query`. Overlapping
    /// occurrences are permitted: the scan advances by one character
    /// after each hit.
    pub fn find(&self, query: &str, nth: usize) -> Result<Option<TextMatch>> {
        let mut seen = 0;
        let mut result = None;
        self.scan(query, |at| {
            if seen == nth {
                result = Some(at);
                return false;
            }
            seen += 1;
            true
        })?;

        Ok(result.map(|at| self.match_at(at, query)))
    }

    /// Number of occurrences of `query`, overlap permitted.
    pub fn occurrences(&self, query: &str) -> Result<usize> {
        let mut count = 0;
        self.scan(query, |_| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    fn scan<F: FnMut(usize) -> bool>(&self, query: &str, mut visit: F) -> Result<()> {
        if query.is_empty() {
            return Err(EditError::InvalidArgument("empty query".to_string()));
        }
        let finder = memmem::Finder::new(query.as_bytes());
        let haystack = self.text.as_bytes();
        let mut from = 0;
        while let Some(rel) = finder.find(&haystack[from..]) {
            let at = from + rel;
            if !visit(at) {
                break;
            }
            let step = self.text[at..]
                .chars()
                .next()
                .map(|c| c.len_utf8())
                .unwrap_or(1);
            from = at + step;
        }
        Ok(())
    }

    fn match_at(&self, byte_at: usize, query: &str) -> TextMatch {
        let start = self
            .char_starts
            .binary_search(&byte_at)
            .unwrap_or_else(|next| next);
        let end = start + query.chars().count();
        let positions = self.positions[start..end].to_vec();
        let spans_boundary = positions
            .windows(2)
            .any(|w| w[0].inside_insertion != w[1].inside_insertion);
        TextMatch {
            start,
            end,
            text: query.to_string(),
            positions,
            spans_boundary,
        }
    }
}
