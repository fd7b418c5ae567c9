//! Document tree types and read-only queries.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::names::{attr, tag, ANDROID_NS, ANDROID_PREFIX, XMLNS_NS};

/// A namespace-qualified attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QName {
    /// Prefix as written in the source (`android` in `android:name`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Local part (`name` in `android:name`).
    pub local: String,

    /// Resolved namespace URI, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl QName {
    /// An attribute name in the android namespace.
    pub fn android(prefix: &str, local: &str) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
            local: local.to_string(),
            namespace: Some(ANDROID_NS.to_string()),
        }
    }

    /// Name as written in markup (`prefix:local` or `local`).
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.local),
            None => self.local.clone(),
        }
    }

    /// Whether this name is `local` in namespace `ns`.
    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(ns) && self.local == local
    }

    /// Two names denote the same attribute slot.
    pub fn same_slot(&self, other: &QName) -> bool {
        match (&self.namespace, &other.namespace) {
            (Some(a), Some(b)) => a == b && self.local == other.local,
            (None, None) => self.local == other.local && self.prefix == other.prefix,
            _ => false,
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// One attribute of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub(crate) name: QName,
    /// Value exactly as written between the quotes (still escaped).
    pub(crate) raw_value: String,
}

impl Attribute {
    /// Attribute name.
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Value as written in the source, entities not expanded.
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    /// Value with entities expanded. Falls back to the raw text when it
    /// contains an entity quick-xml cannot expand.
    pub fn value(&self) -> Cow<'_, str> {
        quick_xml::escape::unescape(&self.raw_value).unwrap_or(Cow::Borrowed(&self.raw_value))
    }
}

/// Position of an element as child indices from the root element.
///
/// The root element is the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementPath(pub Vec<usize>);

impl ElementPath {
    /// The root element.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`-th child node of this element.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for i in &self.0 {
            write!(f, "/{}", i)?;
        }
        Ok(())
    }
}

/// A node in the tree. Everything that is not an element is kept as the
/// exact source text (whitespace, comments, CDATA, entity references, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Raw(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Raw(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Raw(_) => None,
        }
    }
}

/// An element with its attributes, children and source markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub(crate) name: String,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) children: Vec<Node>,
    /// `<name ...>` or `<name .../>` exactly as in the source, kept in sync
    /// with `attributes` when they are edited.
    pub(crate) start_tag: String,
    /// `</name>`; `None` for self-closing elements.
    pub(crate) end_tag: Option<String>,
}

impl Element {
    /// Tag name as written (`activity`, `dist:module`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag name without prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Child elements with their index in [`Element::children`].
    pub fn child_elements(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_element().map(|e| (i, e)))
    }

    /// Whether any child element has the given local name.
    pub fn has_child(&self, local_name: &str) -> bool {
        self.child_elements()
            .any(|(_, e)| e.local_name() == local_name)
    }

    /// Look up an attribute by namespace and local name.
    pub fn attribute(&self, ns: &str, local: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name.is(ns, local))
    }

    /// Look up an attribute in the android namespace.
    pub fn android_attribute(&self, local: &str) -> Option<&Attribute> {
        self.attribute(ANDROID_NS, local)
    }

    /// Whether the element was written as `<name/>`.
    pub fn is_self_closing(&self) -> bool {
        self.end_tag.is_none()
    }

    /// Start tag markup as it will be serialized.
    pub fn start_tag(&self) -> &str {
        &self.start_tag
    }
}

/// Kinds of application components the rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Activity,
    Service,
    Receiver,
}

impl ComponentKind {
    /// Map an element tag, as written, to a component kind. Prefixed tags
    /// (`<dist:activity>`) belong to other namespaces and never match.
    pub fn from_tag(name: &str) -> Option<Self> {
        match name {
            tag::ACTIVITY => Some(Self::Activity),
            tag::SERVICE => Some(Self::Service),
            tag::RECEIVER => Some(Self::Receiver),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => tag::ACTIVITY,
            Self::Service => tag::SERVICE,
            Self::Receiver => tag::RECEIVER,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An activity, service or receiver directly under `<application>`.
#[derive(Debug, Clone)]
pub struct ComponentNode<'a> {
    pub kind: ComponentKind,
    pub element: &'a Element,
    pub path: ElementPath,
}

impl<'a> ComponentNode<'a> {
    /// Declared `android:name`, if any.
    pub fn declared_name(&self) -> Option<Cow<'a, str>> {
        self.element.android_attribute(attr::NAME).map(|a| a.value())
    }

    /// Name for messages: `android:name`, or the tag when undeclared.
    pub fn display_name(&self) -> String {
        self.declared_name()
            .map(|n| n.into_owned())
            .unwrap_or_else(|| self.kind.as_str().to_string())
    }

    /// True iff the component owns at least one `<intent-filter>`.
    pub fn has_intent_filter(&self) -> bool {
        self.element.has_child(tag::INTENT_FILTER)
    }

    /// Whether `android:exported` is declared, whatever its value.
    pub fn declares_exported(&self) -> bool {
        self.element.android_attribute(attr::EXPORTED).is_some()
    }
}

/// A parsed manifest document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    /// Top-level nodes: prolog, the root element, trailing misc.
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: usize,
}

impl ManifestDocument {
    /// Parse a document from XML text.
    pub fn parse(xml: &str) -> Result<Self, crate::ManifestError> {
        crate::reader::parse_document(xml)
    }

    /// Parse a document from raw bytes, which must be UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::ManifestError> {
        let xml = std::str::from_utf8(bytes).map_err(|e| crate::ManifestError::Utf8 {
            context: format!("byte {}", e.valid_up_to()),
        })?;
        Self::parse(xml)
    }

    /// The root element.
    pub fn root(&self) -> &Element {
        match &self.nodes[self.root] {
            Node::Element(e) => e,
            Node::Raw(_) => unreachable!("root index always points at an element"),
        }
    }

    pub(crate) fn root_mut(&mut self) -> &mut Element {
        match &mut self.nodes[self.root] {
            Node::Element(e) => e,
            Node::Raw(_) => unreachable!("root index always points at an element"),
        }
    }

    /// Element at `path`, if the path is valid.
    pub fn element(&self, path: &ElementPath) -> Option<&Element> {
        let mut current = self.root();
        for &i in &path.0 {
            current = current.children.get(i)?.as_element()?;
        }
        Some(current)
    }

    pub(crate) fn element_mut(&mut self, path: &ElementPath) -> Option<&mut Element> {
        let mut current = self.root_mut();
        for &i in &path.0 {
            current = current.children.get_mut(i)?.as_element_mut()?;
        }
        Some(current)
    }

    /// The first `<application>` child of the root.
    pub fn application(&self) -> Option<(ElementPath, &Element)> {
        self.root()
            .child_elements()
            .find(|(_, e)| e.local_name() == tag::APPLICATION)
            .map(|(i, e)| (ElementPath(vec![i]), e))
    }

    /// The first `<uses-sdk>` child of the root.
    pub fn uses_sdk(&self) -> Option<(ElementPath, &Element)> {
        self.root()
            .child_elements()
            .find(|(_, e)| e.local_name() == tag::USES_SDK)
            .map(|(i, e)| (ElementPath(vec![i]), e))
    }

    /// Activities, services and receivers under every `<application>`.
    ///
    /// When the root itself is `<application>` (a manifest fragment), its
    /// direct children are used.
    pub fn components(&self) -> Vec<ComponentNode<'_>> {
        let root = self.root();
        let applications: Vec<(ElementPath, &Element)> = if root.local_name() == tag::APPLICATION {
            vec![(ElementPath::root(), root)]
        } else {
            root.child_elements()
                .filter(|(_, e)| e.local_name() == tag::APPLICATION)
                .map(|(i, e)| (ElementPath(vec![i]), e))
                .collect()
        };

        let mut components = Vec::new();
        for (path, app) in applications {
            for (index, child) in app.child_elements() {
                if let Some(kind) = ComponentKind::from_tag(child.name()) {
                    components.push(ComponentNode {
                        kind,
                        element: child,
                        path: path.child(index),
                    });
                }
            }
        }
        components
    }

    /// Prefix the document binds to `namespace` on its root element.
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.root()
            .attributes
            .iter()
            .find(|a| a.name.namespace.as_deref() == Some(XMLNS_NS) && a.raw_value == namespace)
            .map(|a| a.name.local.as_str())
    }

    /// Prefix to use for new android attributes.
    pub fn android_prefix(&self) -> String {
        self.prefix_for(ANDROID_NS)
            .unwrap_or(ANDROID_PREFIX)
            .to_string()
    }

    /// Serialize back to XML text.
    pub fn to_xml_string(&self) -> String {
        crate::writer::write_document(self)
    }
}
