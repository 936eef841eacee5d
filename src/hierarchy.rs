//! Walking the tree of groups and datasets in a container.

use crate::container::{self, Container, LinkKind, ObjectSummary, ROOT};
use crate::error::NuvolaError;
use crate::models::{Children, Node, NodeKind};

use tracing::{event, Level};

/// Element type reported for variable-length string datasets.
pub const STRING_ELEMENT_TYPE: &str = "string";

/// Describe the object at `path`, or `None` if the viewer does not display it.
pub fn describe<C: Container + ?Sized>(
    container: &C,
    path: &str,
) -> Result<Option<Node>, NuvolaError> {
    let node = match container.summary(path)? {
        ObjectSummary::Group { len } => Node::group(path, container.attributes(path)?, len),
        ObjectSummary::Dataset { dtype, shape } => {
            let element_type = if dtype.is_var_len_string() {
                STRING_ELEMENT_TYPE.to_string()
            } else {
                dtype.to_string()
            };
            Node::dataset(path, container.attributes(path)?, element_type, &shape)
        }
        ObjectSummary::Other => return Ok(None),
    };
    Ok(Some(node))
}

/// Like [describe], but an object that cannot be described is logged and skipped.
fn describe_or_skip<C: Container + ?Sized>(container: &C, path: &str) -> Option<Node> {
    describe(container, path).unwrap_or_else(|err| {
        event!(Level::WARN, "skipping {}: {}", path, err);
        None
    })
}

/// Describe the immediate members of the group at `group`.
///
/// Soft and external links are followed. Members whose target cannot be resolved are skipped.
///
/// # Arguments
///
/// * `container`: The open container
/// * `group`: Path of the group
pub fn items<C: Container + ?Sized>(container: &C, group: &str) -> Result<Vec<Node>, NuvolaError> {
    Ok(container
        .members(group)?
        .into_iter()
        .filter_map(|member| describe_or_skip(container, &container::join(group, &member.name)))
        .collect())
}

/// Describe every object below the root, depth-first and pre-order.
///
/// Members of each group are visited in the container's native order. Only hard links are
/// followed and each object is listed once, under the first path that reaches it, so cycles
/// end. The root itself is not included.
pub fn enumerate<C: Container + ?Sized>(container: &C) -> Result<Vec<Node>, NuvolaError> {
    let mut walk = Walk {
        nodes: Vec::new(),
        visited: vec![container.object_id(ROOT)?],
    };
    visit(container, ROOT, &mut walk)?;
    Ok(walk.nodes)
}

struct Walk<Id> {
    nodes: Vec<Node>,
    visited: Vec<Id>,
}

fn visit<C: Container + ?Sized>(
    container: &C,
    group: &str,
    walk: &mut Walk<C::ObjectId>,
) -> Result<(), NuvolaError> {
    for member in container.members(group)? {
        if member.link != LinkKind::Hard {
            continue;
        }
        let path = container::join(group, &member.name);
        let id = match container.object_id(&path) {
            Ok(id) => id,
            Err(err) => {
                event!(Level::WARN, "skipping {}: {}", path, err);
                continue;
            }
        };
        if walk.visited.contains(&id) {
            continue;
        }
        walk.visited.push(id);
        if let Some(node) = describe_or_skip(container, &path) {
            let is_group = node.kind == NodeKind::Group;
            walk.nodes.push(node);
            if is_group {
                visit(container, &path, walk)?;
            }
        }
    }
    Ok(())
}

/// Returns the immediate members of the node at `path`.
///
/// The whole container is walked to find the node. When no node has exactly this path, or the
/// node has no members, [Children::Placeholder] is returned rather than an error.
pub fn children_of<C: Container + ?Sized>(
    container: &C,
    path: &str,
) -> Result<Children, NuvolaError> {
    let target = enumerate(container)?
        .into_iter()
        .find(|node| node.path == path);
    match target {
        Some(node) if node.has_children => Ok(Children::Items(items(container, &node.path)?)),
        _ => Ok(Children::Placeholder),
    }
}
