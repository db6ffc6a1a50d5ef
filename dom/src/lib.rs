pub mod error;
mod load;

use error::DomException;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Iterator;

// -----------------------------------------------------------------------------------------------

pub trait Node<'a> {
    fn node_name(&self) -> &'a str;

    fn local_name(&self) -> &'a str;

    fn node_value(&self) -> Option<&'a str>;

    fn node_type(&self) -> NodeType;

    fn parent_node(&self) -> Option<XmlNode<'a>>;

    fn child_nodes(&self) -> XmlNodeList<'a>;

    fn first_child(&self) -> Option<XmlNode<'a>>;

    fn last_child(&self) -> Option<XmlNode<'a>>;

    fn previous_sibling(&self) -> Option<XmlNode<'a>>;

    fn next_sibling(&self) -> Option<XmlNode<'a>>;

    fn attributes(&self) -> XmlNodeList<'a>;

    fn owner_document(&self) -> XmlNode<'a>;

    fn has_child(&self) -> bool;
}

// -----------------------------------------------------------------------------------------------

pub trait NodeList<'a> {
    fn item(&self, index: usize) -> Option<XmlNode<'a>>;

    fn length(&self) -> usize;
}

// -----------------------------------------------------------------------------------------------

pub trait AsStringValue {
    fn as_string_value(&self) -> String;
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Element = 1,
    Attribute = 2,
    Text = 3,
    CData = 4,
    PI = 7,
    Comment = 8,
    Document = 9,
    DocumentFragment = 11,
}

impl NodeType {
    fn accepts_children(&self) -> bool {
        matches!(
            self,
            NodeType::Element | NodeType::Document | NodeType::DocumentFragment
        )
    }

    fn has_value(&self) -> bool {
        matches!(
            self,
            NodeType::Attribute
                | NodeType::Text
                | NodeType::CData
                | NodeType::PI
                | NodeType::Comment
        )
    }
}

// -----------------------------------------------------------------------------------------------

/// Arena handle of a node. The generation detects handles to recycled slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Clone, Debug)]
struct NodeData {
    node_type: NodeType,
    name: String,
    value: Option<String>,
    parent: Option<NodeId>,
    previous_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<NodeId>,
}

impl NodeData {
    fn new(node_type: NodeType, name: &str, value: Option<&str>) -> Self {
        NodeData {
            node_type,
            name: name.to_string(),
            value: value.map(|v| v.to_string()),
            parent: None,
            previous_sibling: None,
            next_sibling: None,
            children: vec![],
            attributes: vec![],
        }
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// Detached copy of a subtree, used by `clone_node` and `import_node`.
struct Snapshot {
    node_type: NodeType,
    name: String,
    value: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<Snapshot>,
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct XmlDocument {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for XmlDocument {
    fn default() -> Self {
        XmlDocument::new()
    }
}

impl XmlDocument {
    pub fn new() -> Self {
        let mut doc = XmlDocument {
            slots: vec![],
            free: vec![],
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        doc.root = doc.alloc(NodeData::new(NodeType::Document, "#document", None));
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn document_node(&self) -> XmlNode<'_> {
        XmlNode {
            document: self,
            id: self.root,
            data: self.data(self.root).unwrap_or(&DOCUMENT_PLACEHOLDER),
        }
    }

    pub fn document_element(&self) -> Option<XmlNode<'_>> {
        self.document_node()
            .child_nodes()
            .iter()
            .find(|v| v.node_type() == NodeType::Element)
    }

    pub fn node(&self, id: NodeId) -> Option<XmlNode<'_>> {
        self.data(id).map(|data| XmlNode {
            document: self,
            id,
            data,
        })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.data(id).is_some()
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.alloc(NodeData::new(NodeType::Element, tag_name, None))
    }

    /// Creates a detached attribute; `set_attribute` is the usual way to add one to an element.
    pub fn create_attribute(&mut self, name: &str, value: &str) -> NodeId {
        self.alloc(NodeData::new(NodeType::Attribute, name, Some(value)))
    }

    pub fn create_text_node(&mut self, data: &str) -> NodeId {
        self.alloc(NodeData::new(NodeType::Text, "#text", Some(data)))
    }

    pub fn create_cdata_section(&mut self, data: &str) -> NodeId {
        self.alloc(NodeData::new(NodeType::CData, "#cdata-section", Some(data)))
    }

    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.alloc(NodeData::new(NodeType::Comment, "#comment", Some(data)))
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
        self.alloc(NodeData::new(NodeType::PI, target, Some(data)))
    }

    pub fn create_document_fragment(&mut self) -> NodeId {
        self.alloc(NodeData::new(
            NodeType::DocumentFragment,
            "#document-fragment",
            None,
        ))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> error::Result<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Inserts `child` before `reference`, or last when there is no reference. A document
    /// fragment is replaced by its children.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> error::Result<NodeId> {
        self.check_insertion(parent, child)?;

        let mut reference = reference;
        if let Some(r) = reference {
            if self.get(r)?.parent != Some(parent) {
                return Err(DomException::NotFoundErr.into());
            }

            if r == child {
                reference = self.get(child)?.next_sibling;
            }
        }

        if self.get(child)?.node_type == NodeType::DocumentFragment {
            let children = self.get(child)?.children.clone();
            for c in children {
                self.detach(c)?;
                self.attach(parent, c, reference)?;
            }
        } else {
            self.detach(child)?;
            self.attach(parent, child, reference)?;
        }

        Ok(child)
    }

    /// Replaces `old` with `new` and returns `old`.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new: NodeId,
        old: NodeId,
    ) -> error::Result<NodeId> {
        if self.get(old)?.parent != Some(parent) {
            return Err(DomException::NotFoundErr.into());
        }

        if new == old {
            return Ok(old);
        }

        self.check_insertion(parent, new)?;
        let reference = self.get(old)?.next_sibling;
        self.detach(old)?;
        self.insert_before(parent, new, reference)?;
        Ok(old)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> error::Result<NodeId> {
        if self.get(child)?.parent != Some(parent) {
            return Err(DomException::NotFoundErr.into());
        }

        self.detach(child)?;
        Ok(child)
    }

    /// Sets the value of an existing attribute or appends a new one. Returns the attribute node.
    pub fn set_attribute(
        &mut self,
        element: NodeId,
        name: &str,
        value: &str,
    ) -> error::Result<NodeId> {
        if self.get(element)?.node_type != NodeType::Element {
            return Err(DomException::InvalidNodeTypeErr.into());
        }

        if let Some(attr) = self.find_attribute(element, name) {
            self.get_mut(attr)?.value = Some(value.to_string());
            return Ok(attr);
        }

        let attr = self.create_attribute(name, value);
        self.get_mut(attr)?.parent = Some(element);
        self.get_mut(element)?.attributes.push(attr);
        Ok(attr)
    }

    /// Removes the named attribute and returns its (now detached) node.
    pub fn remove_attribute(
        &mut self,
        element: NodeId,
        name: &str,
    ) -> error::Result<Option<NodeId>> {
        let attr = match self.find_attribute(element, name) {
            Some(v) => v,
            None => return Ok(None),
        };

        self.get_mut(element)?.attributes.retain(|v| *v != attr);
        self.get_mut(attr)?.parent = None;
        Ok(Some(attr))
    }

    pub fn get_attribute(&self, element: NodeId, name: &str) -> Option<&str> {
        self.find_attribute(element, name)
            .and_then(|v| self.data(v))
            .and_then(|v| v.value.as_deref())
    }

    pub fn set_node_value(&mut self, id: NodeId, value: &str) -> error::Result<()> {
        let data = self.get_mut(id)?;
        if !data.node_type.has_value() {
            return Err(DomException::InvalidNodeTypeErr.into());
        }

        data.value = Some(value.to_string());
        Ok(())
    }

    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> error::Result<NodeId> {
        let snapshot = self.snapshot(id, deep)?;
        self.build(snapshot)
    }

    /// Copies a node of another document into this one.
    pub fn import_node(
        &mut self,
        source: &XmlDocument,
        id: NodeId,
        deep: bool,
    ) -> error::Result<NodeId> {
        let snapshot = source.snapshot(id, deep)?;
        self.build(snapshot)
    }

    /// Releases a detached subtree. Handles into it stop resolving.
    pub fn recycle(&mut self, id: NodeId) -> error::Result<()> {
        let data = self.get(id)?;
        if id == self.root || data.parent.is_some() {
            return Err(DomException::InuseErr.into());
        }

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let index = current.index as usize;
            if let Some(data) = self.slots[index].data.take() {
                pending.extend(data.children);
                pending.extend(data.attributes);
                self.slots[index].generation = self.slots[index].generation.wrapping_add(1);
                self.free.push(current.index);
            }
        }

        Ok(())
    }

    pub fn get_element_by_id(&self, element_id: &str) -> Option<XmlNode<'_>> {
        self.document_node()
            .get_elements_by_tag_name("*")
            .into_iter()
            .find(|v| v.get_attribute("id") == Some(element_id))
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = Some(data);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    data: Some(data),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|v| v.generation == id.generation)
            .and_then(|v| v.data.as_ref())
    }

    fn get(&self, id: NodeId) -> error::Result<&NodeData> {
        self.data(id).ok_or(DomException::NotFoundErr.into())
    }

    fn get_mut(&mut self, id: NodeId) -> error::Result<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|v| v.generation == id.generation)
            .and_then(|v| v.data.as_mut())
            .ok_or(DomException::NotFoundErr.into())
    }

    fn find_attribute(&self, element: NodeId, name: &str) -> Option<NodeId> {
        self.data(element)?
            .attributes
            .iter()
            .find(|&&v| self.data(v).map(|d| d.name == name).unwrap_or_default())
            .cloned()
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> error::Result<()> {
        if !self.get(parent)?.node_type.accepts_children() {
            return Err(DomException::HierarchyRequestErr.into());
        }

        if matches!(
            self.get(child)?.node_type,
            NodeType::Attribute | NodeType::Document
        ) {
            return Err(DomException::HierarchyRequestErr.into());
        }

        let mut current = Some(parent);
        while let Some(id) = current {
            if id == child {
                return Err(DomException::HierarchyRequestErr.into());
            }
            current = self.get(id)?.parent;
        }

        Ok(())
    }

    fn detach(&mut self, child: NodeId) -> error::Result<()> {
        let data = self.get(child)?;
        let parent = match data.parent {
            Some(v) => v,
            None => return Ok(()),
        };
        let (previous, next) = (data.previous_sibling, data.next_sibling);

        self.get_mut(parent)?.children.retain(|v| *v != child);
        self.link(previous, next)?;

        let data = self.get_mut(child)?;
        data.parent = None;
        data.previous_sibling = None;
        data.next_sibling = None;
        Ok(())
    }

    fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> error::Result<()> {
        let children = &self.get(parent)?.children;
        let index = match reference {
            Some(r) => children
                .iter()
                .position(|v| *v == r)
                .ok_or(error::Error::from(DomException::NotFoundErr))?,
            None => children.len(),
        };
        let previous = index.checked_sub(1).and_then(|i| children.get(i)).cloned();
        let next = children.get(index).cloned();

        self.get_mut(parent)?.children.insert(index, child);
        self.get_mut(child)?.parent = Some(parent);
        self.link(previous, Some(child))?;
        self.link(Some(child), next)?;
        Ok(())
    }

    fn link(&mut self, previous: Option<NodeId>, next: Option<NodeId>) -> error::Result<()> {
        if let Some(p) = previous {
            self.get_mut(p)?.next_sibling = next;
        }

        if let Some(n) = next {
            self.get_mut(n)?.previous_sibling = previous;
        }

        Ok(())
    }

    fn snapshot(&self, id: NodeId, deep: bool) -> error::Result<Snapshot> {
        let data = self.get(id)?;

        let mut attributes = vec![];
        for attr in &data.attributes {
            let attr = self.get(*attr)?;
            attributes.push((attr.name.clone(), attr.value.clone().unwrap_or_default()));
        }

        let mut children = vec![];
        if deep {
            for child in &data.children {
                children.push(self.snapshot(*child, deep)?);
            }
        }

        Ok(Snapshot {
            node_type: data.node_type,
            name: data.name.clone(),
            value: data.value.clone(),
            attributes,
            children,
        })
    }

    fn build(&mut self, snapshot: Snapshot) -> error::Result<NodeId> {
        if snapshot.node_type == NodeType::Document {
            return Err(DomException::HierarchyRequestErr.into());
        }

        let id = self.alloc(NodeData::new(
            snapshot.node_type,
            &snapshot.name,
            snapshot.value.as_deref(),
        ));

        for (name, value) in snapshot.attributes {
            self.set_attribute(id, &name, &value)?;
        }

        for child in snapshot.children {
            let child = self.build(child)?;
            self.append_child(id, child)?;
        }

        Ok(id)
    }
}

static DOCUMENT_PLACEHOLDER: NodeData = NodeData {
    node_type: NodeType::Document,
    name: String::new(),
    value: None,
    parent: None,
    previous_sibling: None,
    next_sibling: None,
    children: vec![],
    attributes: vec![],
};

// -----------------------------------------------------------------------------------------------

/// Read-only view of a node. Two views are equal when they denote the same node of the same
/// document.
#[derive(Clone, Copy)]
pub struct XmlNode<'a> {
    document: &'a XmlDocument,
    id: NodeId,
    data: &'a NodeData,
}

impl<'a> Node<'a> for XmlNode<'a> {
    fn node_name(&self) -> &'a str {
        &self.data.name
    }

    fn local_name(&self) -> &'a str {
        xml_nom::split_qname(&self.data.name).local_part()
    }

    fn node_value(&self) -> Option<&'a str> {
        self.data.value.as_deref()
    }

    fn node_type(&self) -> NodeType {
        self.data.node_type
    }

    fn parent_node(&self) -> Option<XmlNode<'a>> {
        self.data.parent.and_then(|v| self.document.node(v))
    }

    fn child_nodes(&self) -> XmlNodeList<'a> {
        XmlNodeList {
            document: self.document,
            ids: &self.data.children,
        }
    }

    fn first_child(&self) -> Option<XmlNode<'a>> {
        self.data.children.first().and_then(|v| self.document.node(*v))
    }

    fn last_child(&self) -> Option<XmlNode<'a>> {
        self.data.children.last().and_then(|v| self.document.node(*v))
    }

    fn previous_sibling(&self) -> Option<XmlNode<'a>> {
        self.data.previous_sibling.and_then(|v| self.document.node(v))
    }

    fn next_sibling(&self) -> Option<XmlNode<'a>> {
        self.data.next_sibling.and_then(|v| self.document.node(v))
    }

    fn attributes(&self) -> XmlNodeList<'a> {
        XmlNodeList {
            document: self.document,
            ids: &self.data.attributes,
        }
    }

    fn owner_document(&self) -> XmlNode<'a> {
        self.document.document_node()
    }

    fn has_child(&self) -> bool {
        !self.data.children.is_empty()
    }
}

impl<'a> XmlNode<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a XmlDocument {
        self.document
    }

    pub fn get_attribute(&self, name: &str) -> Option<&'a str> {
        self.get_attribute_node(name).and_then(|v| v.node_value())
    }

    pub fn get_attribute_node(&self, name: &str) -> Option<XmlNode<'a>> {
        self.attributes().iter().find(|v| v.node_name() == name)
    }

    /// Elements below this node in document order, `*` matching any name.
    pub fn get_elements_by_tag_name(&self, tag_name: &str) -> Vec<XmlNode<'a>> {
        let mut elems = vec![];
        self.collect_elements(tag_name, &mut elems);
        elems
    }

    fn collect_elements(&self, tag_name: &str, elems: &mut Vec<XmlNode<'a>>) {
        for child in self.child_nodes().iter() {
            if child.node_type() == NodeType::Element {
                if tag_name == "*" || child.node_name() == tag_name {
                    elems.push(child);
                }
                child.collect_elements(tag_name, elems);
            }
        }
    }

    fn write_text(&self, buf: &mut String) {
        match self.node_type() {
            NodeType::Text | NodeType::CData => {
                buf.push_str(self.node_value().unwrap_or_default());
            }
            NodeType::Element | NodeType::Document | NodeType::DocumentFragment => {
                for child in self.child_nodes().iter() {
                    child.write_text(buf);
                }
            }
            _ => {}
        }
    }
}

impl<'a> AsStringValue for XmlNode<'a> {
    fn as_string_value(&self) -> String {
        match self.node_type() {
            NodeType::Element | NodeType::Document | NodeType::DocumentFragment => {
                let mut buf = String::new();
                self.write_text(&mut buf);
                buf
            }
            _ => self.node_value().unwrap_or_default().to_string(),
        }
    }
}

impl<'a> PartialEq for XmlNode<'a> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.document, other.document) && self.id == other.id
    }
}

impl<'a> Eq for XmlNode<'a> {}

impl<'a> Hash for XmlNode<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<'a> fmt::Debug for XmlNode<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("XmlNode")
            .field("id", &self.id)
            .field("node_type", &self.data.node_type)
            .field("name", &self.data.name)
            .finish()
    }
}

impl<'a> fmt::Display for XmlNode<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.node_type() {
            NodeType::Element => {
                write!(f, "<{}", self.node_name())?;
                for attr in self.attributes().iter() {
                    write!(f, " {}", attr)?;
                }
                write!(f, ">")?;
                for child in self.child_nodes().iter() {
                    write!(f, "{}", child)?;
                }
                write!(f, "</{}>", self.node_name())
            }
            NodeType::Attribute => write!(
                f,
                "{}=\"{}\"",
                self.node_name(),
                escape(self.node_value().unwrap_or_default(), true)
            ),
            NodeType::Text => write!(f, "{}", escape(self.node_value().unwrap_or_default(), false)),
            NodeType::CData => write!(f, "<![CDATA[{}]]>", self.node_value().unwrap_or_default()),
            NodeType::Comment => write!(f, "<!--{}-->", self.node_value().unwrap_or_default()),
            NodeType::PI => match self.node_value() {
                Some(v) if !v.is_empty() => write!(f, "<?{} {}?>", self.node_name(), v),
                _ => write!(f, "<?{}?>", self.node_name()),
            },
            NodeType::Document | NodeType::DocumentFragment => {
                for child in self.child_nodes().iter() {
                    write!(f, "{}", child)?;
                }
                Ok(())
            }
        }
    }
}

fn escape(value: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
pub struct XmlNodeList<'a> {
    document: &'a XmlDocument,
    ids: &'a [NodeId],
}

impl<'a> NodeList<'a> for XmlNodeList<'a> {
    fn item(&self, index: usize) -> Option<XmlNode<'a>> {
        self.ids.get(index).and_then(|v| self.document.node(*v))
    }

    fn length(&self) -> usize {
        self.ids.len()
    }
}

impl<'a> XmlNodeList<'a> {
    pub fn iter(&self) -> XmlNodeIter<'a> {
        XmlNodeIter {
            nodes: *self,
            index: 0,
        }
    }
}

// -----------------------------------------------------------------------------------------------

pub struct XmlNodeIter<'a> {
    nodes: XmlNodeList<'a>,
    index: usize,
}

impl<'a> Iterator for XmlNodeIter<'a> {
    type Item = XmlNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.nodes.item(self.index);
        self.index += 1;
        item
    }
}

// -----------------------------------------------------------------------------------------------
