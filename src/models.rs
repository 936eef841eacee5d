//! Data types exchanged with the browser client

use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use validator::Validate;

/// Kind of a node in an HDF5 container
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeKind {
    /// A group, which may contain further nodes
    Group,
    /// A typed, multi-dimensional array
    Dataset,
}

/// A named attribute attached to a node
///
/// Serialised as a `[name, value]` pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Attribute value
    pub value: serde_json::Value,
}

impl Attribute {
    /// Return a new Attribute object.
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Serialize for Attribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.name)?;
        tuple.serialize_element(&self.value)?;
        tuple.end()
    }
}

/// One group or dataset within an HDF5 container
///
/// The browser client indexes nodes positionally, so a node is serialised as the array
/// `[path, kind, attributes, has_children, element_type, shape]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Full path of the node, unique within a file
    pub path: String,
    /// Group or dataset
    pub kind: NodeKind,
    /// Attributes in the order the container reports them
    pub attributes: Vec<Attribute>,
    /// Whether a group has any members. Always false for datasets.
    pub has_children: bool,
    /// Element type name of a dataset, or "Group size" for groups
    pub element_type: String,
    /// Dimensions of a dataset, e.g. "[2, 3]", or the member count of a group
    pub shape: String,
}

/// Element type reported for groups.
pub const GROUP_ELEMENT_TYPE: &str = "Group size";

impl Node {
    /// Return a Node describing a group with `len` members.
    pub fn group(path: impl Into<String>, attributes: Vec<Attribute>, len: usize) -> Self {
        Node {
            path: path.into(),
            kind: NodeKind::Group,
            attributes,
            has_children: len != 0,
            element_type: GROUP_ELEMENT_TYPE.to_string(),
            shape: len.to_string(),
        }
    }

    /// Return a Node describing a dataset.
    pub fn dataset(
        path: impl Into<String>,
        attributes: Vec<Attribute>,
        element_type: impl Into<String>,
        shape: &[usize],
    ) -> Self {
        Node {
            path: path.into(),
            kind: NodeKind::Dataset,
            attributes,
            has_children: false,
            element_type: element_type.into(),
            shape: format_shape(shape),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(6)?;
        tuple.serialize_element(&self.path)?;
        tuple.serialize_element(&self.kind)?;
        tuple.serialize_element(&self.attributes)?;
        tuple.serialize_element(&self.has_children)?;
        tuple.serialize_element(&self.element_type)?;
        tuple.serialize_element(&self.shape)?;
        tuple.end()
    }
}

/// Format a shape as a bracketed, comma separated list, e.g. `[2, 3]`.
pub fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|dim| dim.to_string()).collect();
    format!("[{}]", dims.join(", "))
}

/// Result of expanding a node of the tree
#[derive(Clone, Debug, PartialEq)]
pub enum Children {
    /// Immediate members of the expanded node
    Items(Vec<Node>),
    /// No members were found. Serialised as `[["1"]]`, which the browser client expects.
    Placeholder,
}

impl Serialize for Children {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Items(items) => items.serialize(serializer),
            Self::Placeholder => [["1"]].serialize(serializer),
        }
    }
}

/// Form data for the remote file browser
#[derive(Debug, Deserialize, Validate)]
pub struct BrowseForm {
    /// Directory to list
    #[serde(default = "default_dir")]
    pub dir: String,
}

fn default_dir() -> String {
    "./".to_string()
}

/// Form data identifying a file
#[derive(Debug, Deserialize, Validate)]
pub struct FileForm {
    /// Path of the HDF5 file
    #[validate(length(min = 1, message = "filepath must not be empty"))]
    pub filepath: String,
}

/// Form data identifying a node within a file
#[derive(Debug, Deserialize, Validate)]
pub struct NodeForm {
    /// Path of the HDF5 file
    #[validate(length(min = 1, message = "filepath must not be empty"))]
    pub filepath: String,
    /// Full path of the node within the file
    #[validate(length(min = 1, message = "node must not be empty"))]
    pub node: String,
}

/// Response to loading a file
#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub filepath: String,
    pub hf_name: String,
    pub hf_root_items: Vec<Node>,
    /// Initial tree expansion state, always `[["0"]]`
    pub hf_new_items: [[&'static str; 1]; 1],
    pub root_properties: Node,
}

/// Response to expanding a node of the tree
#[derive(Debug, Serialize)]
pub struct TreeUpdateResponse {
    pub filepath: String,
    pub hf_new_items: Children,
}
