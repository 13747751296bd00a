use super::arena::XmlTree;
use super::node::NodeData;
use super::xname::XAttribute;
use crate::error::{EditError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashMap;
use std::io::Cursor;

pub fn serialize(tree: &XmlTree) -> Result<String> {
    let bytes = serialize_bytes(tree)?;
    String::from_utf8(bytes).map_err(|e| EditError::XmlWrite(e.to_string()))
}

pub fn serialize_bytes(tree: &XmlTree) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(|e| EditError::XmlWrite(e.to_string()))?;

    if let Some(root) = tree.root() {
        let mut prefixes = PrefixMap::new();
        if let Some(attrs) = tree.get(root).and_then(|d| d.attributes()) {
            extend_prefix_map(&mut prefixes, attrs);
        }
        write_node(tree, root, &mut writer, &prefixes)?;
    }

    Ok(writer.into_inner().into_inner())
}

/// namespace uri -> declared prefix ("" for the default namespace)
type PrefixMap = HashMap<String, String>;

fn extend_prefix_map(prefixes: &mut PrefixMap, attributes: &[XAttribute]) {
    for attr in attributes {
        match &attr.name.namespace {
            None if attr.name.local == "xmlns" => {
                prefixes.entry(attr.value.clone()).or_default();
            }
            Some(ns) if ns == super::namespaces::XMLNS::NS => {
                prefixes
                    .entry(attr.value.clone())
                    .or_insert_with(|| attr.name.local.clone());
            }
            _ => {}
        }
    }
}

fn prefix_for<'a>(namespace: &str, prefixes: &'a PrefixMap) -> &'a str {
    if namespace == super::namespaces::XMLNS::NS {
        return "xmlns";
    }
    if let Some(prefix) = prefixes.get(namespace) {
        return prefix.as_str();
    }
    well_known_prefix(namespace)
}

fn qualified_name(name: &super::xname::XName, prefixes: &PrefixMap) -> String {
    match &name.namespace {
        Some(ns) => {
            let prefix = prefix_for(ns, prefixes);
            if prefix.is_empty() {
                name.local.clone()
            } else {
                format!("{}:{}", prefix, name.local)
            }
        }
        None => name.local.clone(),
    }
}

fn write_node<W: std::io::Write>(
    tree: &XmlTree,
    node: indextree::NodeId,
    writer: &mut Writer<W>,
    prefixes: &PrefixMap,
) -> Result<()> {
    let Some(data) = tree.get(node) else {
        return Ok(());
    };

    match data {
        NodeData::Element { name, attributes } => {
            let mut scoped = prefixes.clone();
            extend_prefix_map(&mut scoped, attributes);

            let tag = qualified_name(name, &scoped);
            let mut elem = BytesStart::new(&tag);
            for attr in attributes {
                elem.push_attribute((qualified_name(&attr.name, &scoped).as_str(), attr.value.as_str()));
            }

            let children: Vec<_> = tree.children(node).collect();
            if children.is_empty() {
                writer
                    .write_event(Event::Empty(elem))
                    .map_err(|e| EditError::XmlWrite(e.to_string()))?;
            } else {
                writer
                    .write_event(Event::Start(elem))
                    .map_err(|e| EditError::XmlWrite(e.to_string()))?;
                for child in children {
                    write_node(tree, child, writer, &scoped)?;
                }
                writer
                    .write_event(Event::End(BytesEnd::new(&tag)))
                    .map_err(|e| EditError::XmlWrite(e.to_string()))?;
            }
        }
        NodeData::Text(text) => {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| EditError::XmlWrite(e.to_string()))?;
        }
        NodeData::Comment(text) => {
            writer
                .write_event(Event::Comment(BytesText::new(text)))
                .map_err(|e| EditError::XmlWrite(e.to_string()))?;
        }
        NodeData::ProcessingInstruction { target, data } => {
            let content = if data.is_empty() {
                target.clone()
            } else {
                format!("{} {}", target, data)
            };
            writer
                .write_event(Event::PI(BytesPI::new(&content)))
                .map_err(|e| EditError::XmlWrite(e.to_string()))?;
        }
    }

    Ok(())
}

fn well_known_prefix(namespace: &str) -> &'static str {
    match namespace {
        "http://schemas.openxmlformats.org/wordprocessingml/2006/main" => "w",
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships" => "r",
        "http://schemas.openxmlformats.org/markup-compatibility/2006" => "mc",
        "http://www.w3.org/2000/xmlns/" => "xmlns",
        "http://www.w3.org/XML/1998/namespace" => "xml",
        _ => "ns",
    }
}
