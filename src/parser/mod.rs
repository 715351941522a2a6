pub mod ndl;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{CatalogError, Result};

/// One element of a parsed document. Names are kept as written, prefix included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn from_start(event: &BytesStart<'_>) -> Result<Self> {
        let mut attrs = Vec::new();
        for attr in event.attributes() {
            let attr = attr.map_err(|err| CatalogError::Malformed(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }
        Ok(XmlNode {
            name: String::from_utf8_lossy(event.name().as_ref()).to_string(),
            attrs,
            text: String::new(),
            children: vec![],
        })
    }

    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Follow direct children by name, e.g. `["foaf:Agent", "foaf:name"]`.
    pub fn path(&self, names: &[&str]) -> Option<&XmlNode> {
        names
            .iter()
            .try_fold(self, |node, name| node.child(name))
    }

    /// Depth-first search for the first descendant with this exact name.
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        self.find_by(&|node| node.name == name)
    }

    /// Depth-first search ignoring namespace prefixes.
    pub fn find_local(&self, local: &str) -> Option<&XmlNode> {
        self.find_by(&|node| node.local_name() == local)
    }

    fn find_by(&self, pred: &dyn Fn(&XmlNode) -> bool) -> Option<&XmlNode> {
        for child in &self.children {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_by(pred) {
                return Some(found);
            }
        }
        None
    }
}

/// Parse a whole document into a tree rooted at an unnamed document node.
pub fn parse_tree(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlNode> = vec![XmlNode::default()];
    loop {
        match reader.read_event()? {
            Event::Start(event) => stack.push(XmlNode::from_start(&event)?),
            Event::Empty(event) => {
                let node = XmlNode::from_start(&event)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| CatalogError::Malformed("unbalanced end tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => {
                        return Err(CatalogError::Malformed("unbalanced end tag".to_string()))
                    }
                }
            }
            Event::Text(event) => {
                let text = event.unescape()?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Event::CData(event) => {
                let bytes = event.into_inner();
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&bytes));
                }
            }
            Event::Eof => break,
            _ => (),
        }
    }

    if stack.len() != 1 {
        return Err(CatalogError::Malformed(format!(
            "document ended with {} unclosed element(s)",
            stack.len() - 1
        )));
    }
    stack
        .pop()
        .ok_or_else(|| CatalogError::Malformed("empty document".to_string()))
}
