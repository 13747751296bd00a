use super::arena::XmlTree;
use super::node::NodeData;
use super::xname::{XAttribute, XName};
use crate::error::{EditError, Result};

pub fn parse(xml: &str) -> Result<XmlTree> {
    let doc = roxmltree::Document::parse_with_options(
        xml,
        roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        },
    )
    .map_err(|e| EditError::XmlParse {
        message: e.to_string(),
    })?;

    let mut tree = XmlTree::new();
    build_tree(doc.root_element(), &mut tree, None);
    Ok(tree)
}

pub fn parse_bytes(bytes: &[u8]) -> Result<XmlTree> {
    let text = std::str::from_utf8(bytes).map_err(|e| EditError::XmlParse {
        message: e.to_string(),
    })?;
    parse(text)
}

fn build_tree(node: roxmltree::Node, tree: &mut XmlTree, parent: Option<indextree::NodeId>) {
    let data = match node.node_type() {
        roxmltree::NodeType::Element => {
            let name = XName::new(
                node.tag_name().namespace().unwrap_or(""),
                node.tag_name().name(),
            );

            let mut attributes: Vec<XAttribute> = node
                .attributes()
                .map(|attr| {
                    XAttribute::new(
                        XName::new(attr.namespace().unwrap_or(""), attr.name()),
                        attr.value(),
                    )
                })
                .collect();

            // roxmltree separates namespace declarations from regular
            // attributes; fold them back in so serialization round-trips.
            for ns in node.namespaces() {
                if let Some(prefix) = ns.name() {
                    attributes.push(XAttribute::new(
                        XName::new(super::namespaces::XMLNS::NS, prefix),
                        ns.uri(),
                    ));
                } else {
                    attributes.push(XAttribute::new(XName::local("xmlns"), ns.uri()));
                }
            }

            NodeData::Element { name, attributes }
        }
        roxmltree::NodeType::Text => match node.text() {
            Some(text) => NodeData::Text(text.to_string()),
            None => return,
        },
        roxmltree::NodeType::Comment => match node.text() {
            Some(text) => NodeData::Comment(text.to_string()),
            None => return,
        },
        roxmltree::NodeType::PI => NodeData::ProcessingInstruction {
            target: node
                .pi()
                .map(|pi| pi.target.to_string())
                .unwrap_or_default(),
            data: node
                .pi()
                .and_then(|pi| pi.value.map(|s| s.to_string()))
                .unwrap_or_default(),
        },
        _ => return,
    };

    let new_id = match parent {
        Some(parent_id) => tree.add_child(parent_id, data),
        None => tree.add_root(data),
    };

    for child in node.children() {
        build_tree(child, tree, Some(new_id));
    }
}
