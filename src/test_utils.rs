use crate::container::{
    base_name, join, Container, DType, LinkKind, Member, NodeValue, ObjectSummary, ROOT,
};
use crate::error::NuvolaError;
use crate::models::Attribute;

use hdf5::types::{FixedAscii, FixedUnicode, VarLenUnicode};
use ndarray::{arr1, arr2};
use std::collections::BTreeMap;

/// Links deeper than this are treated as unresolvable.
const MAX_LINK_DEPTH: usize = 16;

enum MemoryObject {
    Group,
    Dataset { dtype: DType, value: NodeValue },
    Link { kind: LinkKind, target: String },
}

/// An in-memory [Container] for tests.
///
/// Members are listed in lexicographic order of their names. Links of every kind are stored by
/// target path and resolved on access, so a link to a missing path dangles. The id of an object
/// is its path with every link resolved.
pub(crate) struct MemoryContainer {
    name: String,
    objects: BTreeMap<String, (MemoryObject, Vec<Attribute>)>,
}

impl MemoryContainer {
    /// Create a container holding only a root group.
    pub(crate) fn new(name: &str) -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(ROOT.to_string(), (MemoryObject::Group, vec![]));
        Self {
            name: name.to_string(),
            objects,
        }
    }

    /// Add a group. Its parent must already exist.
    pub(crate) fn group(mut self, path: &str) -> Self {
        self.objects
            .insert(path.to_string(), (MemoryObject::Group, vec![]));
        self
    }

    /// Add a dataset. Its parent must already exist.
    pub(crate) fn dataset(mut self, path: &str, dtype: DType, value: NodeValue) -> Self {
        self.objects.insert(
            path.to_string(),
            (MemoryObject::Dataset { dtype, value }, vec![]),
        );
        self
    }

    /// Add a link at `path` to the absolute path `target`, which need not exist.
    pub(crate) fn link(mut self, path: &str, kind: LinkKind, target: &str) -> Self {
        let link = MemoryObject::Link {
            kind,
            target: target.to_string(),
        };
        self.objects.insert(path.to_string(), (link, vec![]));
        self
    }

    /// Add an attribute to an existing object.
    pub(crate) fn attribute(
        mut self,
        path: &str,
        name: &str,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        let (_, attributes) = self.objects.get_mut(path).expect("object exists");
        attributes.push(Attribute::new(name, value));
        self
    }

    /// Follow links in every segment of `path` and return the stored path of the object.
    fn resolve(&self, path: &str) -> Result<String, NuvolaError> {
        self.resolve_within(path, 0)
    }

    fn resolve_within(&self, path: &str, depth: usize) -> Result<String, NuvolaError> {
        let not_found = || NuvolaError::NodeNotFound {
            path: path.to_string(),
        };
        if depth > MAX_LINK_DEPTH {
            return Err(not_found());
        }
        let mut current = ROOT.to_string();
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            let candidate = join(&current, segment);
            current = match self.objects.get(&candidate) {
                Some((MemoryObject::Link { target, .. }, _)) => self
                    .resolve_within(target, depth + 1)
                    .map_err(|_| not_found())?,
                Some(_) => candidate,
                None => return Err(not_found()),
            };
        }
        Ok(current)
    }

    fn get(&self, path: &str) -> Result<&(MemoryObject, Vec<Attribute>), NuvolaError> {
        let resolved = self.resolve(path)?;
        self.objects
            .get(&resolved)
            .ok_or_else(|| NuvolaError::NodeNotFound {
                path: path.to_string(),
            })
    }

    fn parent(path: &str) -> &str {
        match path.rfind('/') {
            Some(0) => ROOT,
            Some(index) => &path[..index],
            None => ROOT,
        }
    }
}

impl Container for MemoryContainer {
    type ObjectId = String;

    fn file_name(&self) -> String {
        self.name.clone()
    }

    fn members(&self, group: &str) -> Result<Vec<Member>, NuvolaError> {
        let group = self.resolve(group)?;
        Ok(self
            .objects
            .iter()
            .filter(|(path, _)| path.as_str() != ROOT && Self::parent(path) == group)
            .map(|(path, (object, _))| {
                let link = match object {
                    MemoryObject::Link { kind, .. } => *kind,
                    _ => LinkKind::Hard,
                };
                Member::new(base_name(path), link)
            })
            .collect())
    }

    fn object_id(&self, path: &str) -> Result<String, NuvolaError> {
        self.resolve(path)
    }

    fn summary(&self, path: &str) -> Result<ObjectSummary, NuvolaError> {
        let summary = match &self.get(path)?.0 {
            MemoryObject::Group => ObjectSummary::Group {
                len: self.members(path)?.len(),
            },
            MemoryObject::Dataset { dtype, value } => ObjectSummary::Dataset {
                dtype: dtype.clone(),
                shape: value.shape().to_vec(),
            },
            MemoryObject::Link { .. } => ObjectSummary::Other,
        };
        Ok(summary)
    }

    fn attributes(&self, path: &str) -> Result<Vec<Attribute>, NuvolaError> {
        Ok(self.get(path)?.1.clone())
    }

    fn read(&self, path: &str) -> Result<NodeValue, NuvolaError> {
        match &self.get(path)?.0 {
            MemoryObject::Dataset { value, .. } => Ok(value.clone()),
            _ => Err(NuvolaError::NotADataset {
                path: path.to_string(),
            }),
        }
    }
}

/// Write a small HDF5 file and return its directory and path.
///
/// The file holds `/count`, `/empty`, `/entry/data` (2x3 float64), `/entry/flags`,
/// `/entry/names` (fixed-length strings) and `/title`.
pub(crate) fn write_hdf5_file() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.h5");
    let file = hdf5::File::create(&path).unwrap();

    let created: VarLenUnicode = "2020".parse().unwrap();
    file.new_attr::<VarLenUnicode>()
        .shape(())
        .create("created")
        .unwrap()
        .write_scalar(&created)
        .unwrap();
    file.new_attr::<i32>()
        .shape([3])
        .create("version")
        .unwrap()
        .write(&arr1(&[1, 2, 3]))
        .unwrap();

    let entry = file.create_group("entry").unwrap();
    let data = entry.new_dataset::<f64>().shape([2, 3]).create("data").unwrap();
    data.write(&arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])).unwrap();
    data.new_attr::<f64>()
        .shape(())
        .create("scale")
        .unwrap()
        .write_scalar(&0.5)
        .unwrap();

    let flags = entry.new_dataset::<bool>().shape([2]).create("flags").unwrap();
    flags.write(&arr1(&[true, false])).unwrap();

    let names = entry
        .new_dataset::<FixedAscii<8>>()
        .shape([2])
        .create("names")
        .unwrap();
    names
        .write(&arr1(&[
            FixedAscii::<8>::from_ascii(b"alpha").unwrap(),
            FixedAscii::<8>::from_ascii(b"beta").unwrap(),
        ]))
        .unwrap();
    let label: FixedUnicode<16> = "n\u{e9}v".parse().unwrap();
    names
        .new_attr::<FixedUnicode<16>>()
        .shape(())
        .create("label")
        .unwrap()
        .write_scalar(&label)
        .unwrap();

    let title = file
        .new_dataset::<VarLenUnicode>()
        .shape(())
        .create("title")
        .unwrap();
    let value: VarLenUnicode = "hello".parse().unwrap();
    title.write_scalar(&value).unwrap();

    let count = file.new_dataset::<u16>().shape(()).create("count").unwrap();
    count.write_scalar(&7_u16).unwrap();

    file.create_group("empty").unwrap();

    let path = path.to_string_lossy().into_owned();
    (dir, path)
}

/// Write an HDF5 file whose links form cycles or dangle, and return its directory and path.
///
/// ```text
/// /a            group
/// /a/b          group
/// /a/b/back     hard link to /a
/// /a/b/x        float64 [2]
/// /a/gone       soft link to /nowhere
/// /a/up         soft link to /a
/// /ext          external link to /data in missing.h5
/// ```
pub(crate) fn write_linked_hdf5_file() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("linked.h5");
    let file = hdf5::File::create(&path).unwrap();

    let a = file.create_group("a").unwrap();
    let b = a.create_group("b").unwrap();
    b.new_dataset::<f64>()
        .shape([2])
        .create("x")
        .unwrap()
        .write(&arr1(&[1.0, 2.0]))
        .unwrap();
    b.link_hard("/a", "back").unwrap();
    a.link_soft("/nowhere", "gone").unwrap();
    a.link_soft("/a", "up").unwrap();
    file.link_external("missing.h5", "/data", "ext").unwrap();

    let path = path.to_string_lossy().into_owned();
    (dir, path)
}
