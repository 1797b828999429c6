//! Accessors for arguments, properties and child values of KDL nodes.

use kdl::KdlNode;

pub(crate) fn first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

pub(crate) fn first_bool_arg(node: &KdlNode) -> Option<bool> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_bool())
}

pub(crate) fn all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

pub(crate) fn string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

/// Value of `name` given either as a property (`name="x"`) or as a child
/// node (`name "x"`).
pub(crate) fn string_prop_or_child(node: &KdlNode, name: &str) -> Option<String> {
    string_prop(node, name).or_else(|| {
        node.children()?
            .nodes()
            .iter()
            .find(|c| c.name().value() == name)
            .and_then(first_string_arg)
    })
}
