//! Access to hierarchical containers.
//!
//! The rest of the crate only talks to a container through the [Container] trait, which exposes
//! the few calls the viewer needs: list the members of a group, summarise an object, read its
//! attributes and materialise a dataset's value. [Hdf5Container] implements the trait on top of
//! the [hdf5] crate.

use crate::error::NuvolaError;
use crate::models::Attribute;

use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{H5Type, LinkType, LocationToken, LocationType};
use ndarray::ArrayD;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use tracing::{event, Level};

/// Path of the root group.
pub const ROOT: &str = "/";

/// Longest fixed-length string, in bytes, that can be read.
pub const MAX_FIXED_STRING: usize = 4096;

/// Element type of a dataset or attribute
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DType {
    /// Signed integer of the given width in bits
    Int(usize),
    /// Unsigned integer of the given width in bits
    Uint(usize),
    /// Floating point number of the given width in bits
    Float(usize),
    /// Boolean
    Bool,
    /// Fixed-length ASCII string of the given length in bytes
    FixedAscii(usize),
    /// Fixed-length UTF-8 string of the given length in bytes
    FixedUnicode(usize),
    /// Variable-length ASCII string
    VarLenAscii,
    /// Variable-length UTF-8 string
    VarLenUnicode,
    /// Anything else (compound, enum, array, ...)
    Other(String),
}

impl DType {
    /// Whether the type is a variable-length string.
    pub fn is_var_len_string(&self) -> bool {
        matches!(self, Self::VarLenAscii | Self::VarLenUnicode)
    }
}

impl From<&TypeDescriptor> for DType {
    fn from(descriptor: &TypeDescriptor) -> Self {
        match descriptor {
            TypeDescriptor::Integer(size) => Self::Int(*size as usize * 8),
            TypeDescriptor::Unsigned(size) => Self::Uint(*size as usize * 8),
            TypeDescriptor::Float(size) => Self::Float(*size as usize * 8),
            TypeDescriptor::Boolean => Self::Bool,
            TypeDescriptor::FixedAscii(len) => Self::FixedAscii(*len),
            TypeDescriptor::FixedUnicode(len) => Self::FixedUnicode(*len),
            TypeDescriptor::VarLenAscii => Self::VarLenAscii,
            TypeDescriptor::VarLenUnicode => Self::VarLenUnicode,
            TypeDescriptor::Enum(_) => Self::Other("enum".to_string()),
            TypeDescriptor::Compound(_) => Self::Other("compound".to_string()),
            TypeDescriptor::FixedArray(..) => Self::Other("array".to_string()),
            TypeDescriptor::VarLenArray(_) => Self::Other("vlen".to_string()),
            #[allow(unreachable_patterns)]
            _ => Self::Other("unknown".to_string()),
        }
    }
}

/// NumPy style type names.
impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Float(bits) => write!(f, "float{bits}"),
            Self::Bool => write!(f, "bool"),
            Self::FixedAscii(len) | Self::FixedUnicode(len) => write!(f, "|S{len}"),
            Self::VarLenAscii | Self::VarLenUnicode => write!(f, "object"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Summary of one object in a container
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectSummary {
    /// A group with `len` members
    Group { len: usize },
    /// A dataset
    Dataset { dtype: DType, shape: Vec<usize> },
    /// An object the viewer does not display, such as a named datatype
    Other,
}

/// The materialised value of a dataset
#[derive(Clone, Debug, PartialEq)]
pub enum NodeValue {
    /// Signed integers of any width
    Integer(ArrayD<i64>),
    /// Unsigned integers of any width
    Unsigned(ArrayD<u64>),
    /// Floats, and booleans as 0.0/1.0
    Numeric(ArrayD<f64>),
    /// Strings
    Text(ArrayD<String>),
}

impl NodeValue {
    /// Number of dimensions of the value.
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Shape of the value.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Integer(array) => array.shape(),
            Self::Unsigned(array) => array.shape(),
            Self::Numeric(array) => array.shape(),
            Self::Text(array) => array.shape(),
        }
    }

    /// The value as floats, for plotting. Integers above 2^53 are rounded. Text gives `None`.
    pub fn to_f64(&self) -> Option<Cow<'_, ArrayD<f64>>> {
        match self {
            Self::Integer(array) => Some(Cow::Owned(array.mapv(|v| v as f64))),
            Self::Unsigned(array) => Some(Cow::Owned(array.mapv(|v| v as f64))),
            Self::Numeric(array) => Some(Cow::Borrowed(array)),
            Self::Text(_) => None,
        }
    }
}

/// How a member is linked into its group
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    /// A direct link to an object. An object may have several.
    Hard,
    /// A link by path within the same container, which may dangle
    Soft,
    /// A link into another file, which may dangle
    External,
}

impl From<LinkType> for LinkKind {
    fn from(link_type: LinkType) -> Self {
        match link_type {
            LinkType::Hard => Self::Hard,
            LinkType::Soft => Self::Soft,
            LinkType::External => Self::External,
        }
    }
}

/// A named member of a group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub link: LinkKind,
}

impl Member {
    pub fn new(name: impl Into<String>, link: LinkKind) -> Self {
        Self {
            name: name.into(),
            link,
        }
    }
}

/// An open hierarchical container.
///
/// Object paths are absolute, e.g. `/entry/data`. The root group is [ROOT].
pub trait Container {
    /// Identity of an object. Every hard link to the same object gives an equal id.
    type ObjectId: PartialEq;

    /// File name of the container without its directory.
    fn file_name(&self) -> String;

    /// Members of the group at `group`, in the container's native order.
    ///
    /// Links are listed whether or not their target exists.
    fn members(&self, group: &str) -> Result<Vec<Member>, NuvolaError>;

    /// Identity of the object at `path`, after following links.
    fn object_id(&self, path: &str) -> Result<Self::ObjectId, NuvolaError>;

    /// Summary of the object at `path`.
    fn summary(&self, path: &str) -> Result<ObjectSummary, NuvolaError>;

    /// Attributes of the object at `path`, in the container's native order.
    fn attributes(&self, path: &str) -> Result<Vec<Attribute>, NuvolaError>;

    /// Read the whole value of the dataset at `path` into memory.
    fn read(&self, path: &str) -> Result<NodeValue, NuvolaError>;
}

/// Join a member name onto a group path.
pub fn join(group: &str, name: &str) -> String {
    if group.ends_with('/') {
        format!("{group}{name}")
    } else {
        format!("{group}/{name}")
    }
}

/// Returns the last segment of an object path, used as a display title.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// An HDF5 file opened read-only
#[derive(Debug)]
pub struct Hdf5Container {
    file: hdf5::File,
}

/// Open the HDF5 file at `path` for reading.
///
/// # Arguments
///
/// * `path`: Path of the file on the local filesystem
pub fn open(path: &str) -> Result<Hdf5Container, NuvolaError> {
    let file = hdf5::File::open(path).map_err(|source| NuvolaError::OpenFile {
        path: path.to_string(),
        source,
    })?;
    Ok(Hdf5Container { file })
}

impl Hdf5Container {
    /// Returns the type of the object at `path`, or NodeNotFound.
    ///
    /// A link whose target cannot be resolved counts as not found.
    fn loc_type(&self, path: &str) -> Result<LocationType, NuvolaError> {
        let not_found = || NuvolaError::NodeNotFound {
            path: path.to_string(),
        };
        if path != ROOT && !self.file.link_exists(path) {
            return Err(not_found());
        }
        self.file.loc_type_by_name(path).map_err(|err| {
            event!(Level::DEBUG, "cannot resolve {}: {}", path, err);
            not_found()
        })
    }
}

impl Container for Hdf5Container {
    type ObjectId = (u64, LocationToken);

    fn file_name(&self) -> String {
        let filename = self.file.filename();
        Path::new(&filename)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(filename)
    }

    fn members(&self, group: &str) -> Result<Vec<Member>, NuvolaError> {
        let members = self.file.group(group)?.iter_visit_default(
            Vec::new(),
            |_, name, info, members: &mut Vec<Member>| {
                members.push(Member::new(name, info.link_type.into()));
                true
            },
        )?;
        Ok(members)
    }

    fn object_id(&self, path: &str) -> Result<Self::ObjectId, NuvolaError> {
        self.loc_type(path)?;
        let info = self.file.loc_info_by_name(path)?;
        Ok((info.fileno, info.token))
    }

    fn summary(&self, path: &str) -> Result<ObjectSummary, NuvolaError> {
        let summary = match self.loc_type(path)? {
            LocationType::Group => ObjectSummary::Group {
                len: self.file.group(path)?.len() as usize,
            },
            LocationType::Dataset => {
                let dataset = self.file.dataset(path)?;
                ObjectSummary::Dataset {
                    dtype: DType::from(&dataset.dtype()?.to_descriptor()?),
                    shape: dataset.shape(),
                }
            }
            _ => ObjectSummary::Other,
        };
        Ok(summary)
    }

    fn attributes(&self, path: &str) -> Result<Vec<Attribute>, NuvolaError> {
        match self.loc_type(path)? {
            LocationType::Group => read_attributes(&*self.file.group(path)?),
            LocationType::Dataset => read_attributes(&*self.file.dataset(path)?),
            _ => Ok(vec![]),
        }
    }

    fn read(&self, path: &str) -> Result<NodeValue, NuvolaError> {
        if !matches!(self.loc_type(path)?, LocationType::Dataset) {
            return Err(NuvolaError::NotADataset {
                path: path.to_string(),
            });
        }
        let dataset = self.file.dataset(path)?;
        let dtype = DType::from(&dataset.dtype()?.to_descriptor()?);
        let value = match dtype {
            DType::Bool => NodeValue::Numeric(
                dataset
                    .read_dyn::<bool>()?
                    .mapv(|b| if b { 1.0 } else { 0.0 }),
            ),
            DType::Int(_) => NodeValue::Integer(dataset.read_dyn::<i64>()?),
            DType::Uint(_) => NodeValue::Unsigned(dataset.read_dyn::<u64>()?),
            DType::Float(_) => NodeValue::Numeric(dataset.read_dyn::<f64>()?),
            dtype => match string_reader(&dtype) {
                Some(read) => NodeValue::Text(read(&*dataset)?),
                None => {
                    return Err(NuvolaError::UnsupportedType {
                        path: path.to_string(),
                        dtype: dtype.to_string(),
                    })
                }
            },
        };
        Ok(value)
    }
}

/// Reads every element of a dataset or attribute as a string.
type StringReader = fn(&hdf5::Container) -> hdf5::Result<ArrayD<String>>;

fn read_strings<S: H5Type + AsRef<str>>(
    container: &hdf5::Container,
) -> hdf5::Result<ArrayD<String>> {
    Ok(container
        .read_dyn::<S>()?
        .map(|s| AsRef::<str>::as_ref(s).to_owned()))
}

/// Returns a reader for string types, or `None` for other types.
///
/// Fixed-length strings are read into the smallest fixed-length buffer that holds them, so the
/// memory type stays fixed-length. Strings longer than [MAX_FIXED_STRING] are not read.
fn string_reader(dtype: &DType) -> Option<StringReader> {
    let reader: StringReader = match *dtype {
        DType::VarLenAscii => read_strings::<VarLenAscii>,
        DType::VarLenUnicode => read_strings::<VarLenUnicode>,
        DType::FixedAscii(len) => match len {
            0..=16 => read_strings::<FixedAscii<16>>,
            17..=64 => read_strings::<FixedAscii<64>>,
            65..=256 => read_strings::<FixedAscii<256>>,
            257..=1024 => read_strings::<FixedAscii<1024>>,
            1025..=MAX_FIXED_STRING => read_strings::<FixedAscii<MAX_FIXED_STRING>>,
            _ => return None,
        },
        DType::FixedUnicode(len) => match len {
            0..=16 => read_strings::<FixedUnicode<16>>,
            17..=64 => read_strings::<FixedUnicode<64>>,
            65..=256 => read_strings::<FixedUnicode<256>>,
            257..=1024 => read_strings::<FixedUnicode<1024>>,
            1025..=MAX_FIXED_STRING => read_strings::<FixedUnicode<MAX_FIXED_STRING>>,
            _ => return None,
        },
        _ => return None,
    };
    Some(reader)
}

/// Read all attributes of an HDF5 object.
///
/// Attributes that cannot be read are reported as a placeholder string naming their type.
fn read_attributes(location: &hdf5::Location) -> Result<Vec<Attribute>, NuvolaError> {
    let mut attributes = Vec::new();
    for name in location.attr_names()? {
        let attr = location.attr(&name)?;
        let dtype = DType::from(&attr.dtype()?.to_descriptor()?);
        let value = read_attribute_value(&attr, &dtype).unwrap_or_else(|err| {
            event!(
                Level::WARN,
                "cannot read attribute {} of {}: {}",
                name,
                location.name(),
                err
            );
            serde_json::Value::String(format!("<{dtype}>"))
        });
        attributes.push(Attribute { name, value });
    }
    Ok(attributes)
}

/// Convert an attribute's value to JSON.
///
/// Scalars become a single JSON value, anything else a flat JSON array.
fn read_attribute_value(
    attr: &hdf5::Attribute,
    dtype: &DType,
) -> Result<serde_json::Value, NuvolaError> {
    use serde_json::Value;

    let values: Vec<Value> = match dtype {
        DType::Int(_) => attr.read_raw::<i64>()?.into_iter().map(Value::from).collect(),
        DType::Uint(_) => attr.read_raw::<u64>()?.into_iter().map(Value::from).collect(),
        DType::Float(_) => attr
            .read_raw::<f64>()?
            .into_iter()
            .map(|f| serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number))
            .collect(),
        DType::Bool => attr.read_raw::<bool>()?.into_iter().map(Value::from).collect(),
        DType::Other(_) => return Ok(Value::String(format!("<{dtype}>"))),
        _ => match string_reader(dtype) {
            Some(read) => {
                let container: &hdf5::Container = attr;
                read(container)?
                    .iter()
                    .map(|s| Value::from(s.as_str()))
                    .collect()
            }
            None => return Ok(Value::String(format!("<{dtype}>"))),
        },
    };
    if attr.ndim() == 0 {
        Ok(values.into_iter().next().unwrap_or(Value::Null))
    } else {
        Ok(Value::Array(values))
    }
}
