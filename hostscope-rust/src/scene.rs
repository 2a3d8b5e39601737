//! Scene hierarchy lookups

use crate::host::{HostScene, ObjectRef};
use crate::Result;
use std::fmt::Write;

/// First object named `name`, depth-first over the active scene's roots
pub fn find_game_object<H: HostScene + ?Sized>(host: &H, name: &str) -> Result<Option<ObjectRef>> {
    for root in host.root_objects()? {
        if let Some(found) = find_in_hierarchy(host, root, name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// First object named `name` in the hierarchy under (and including) `root`
pub fn find_in_hierarchy<H: HostScene + ?Sized>(host: &H, root: ObjectRef, name: &str) -> Result<Option<ObjectRef>> {
    if host.object_name(root)? == name {
        return Ok(Some(root));
    }
    for child in host.child_objects(root)? {
        if let Some(found) = find_in_hierarchy(host, child, name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// List the component types attached to `object`
pub fn describe_components<H: HostScene + ?Sized>(host: &H, object: ObjectRef) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "\"{}\" has the following components:", host.object_name(object)?);
    for component in host.components(object)? {
        let _ = writeln!(out, "- {}", host.type_of(component)?.name());
    }
    Ok(out)
}
