//! Derives the relationship paths the remote endpoint must materialize.

use tracing::debug;

use crate::descriptor::{FilterDescriptor, NodeKind};

/// Collects the dotted path of every relationship node with nested filters.
///
/// Paths are returned in first-seen order without duplicates. A relationship
/// used only as a presence check contributes nothing. Malformed nodes are
/// skipped; serialization reports them.
///
/// ```
/// use crudquery_core::{derive_includes, FilterDescriptor, Operator};
///
/// let filters = vec![FilterDescriptor::related(
///     "Region",
///     vec![FilterDescriptor::related(
///         "Pais",
///         vec![FilterDescriptor::leaf("Nombre", Operator::Equals, "Chile")],
///     )],
/// )];
/// assert_eq!(derive_includes(&filters), vec!["Region", "Region.Pais"]);
/// ```
pub fn derive_includes(filters: &[FilterDescriptor]) -> Vec<String> {
    let mut paths = Vec::new();
    for filter in filters {
        collect(filter, None, &mut paths);
    }
    if !paths.is_empty() {
        debug!(?paths, "derived include paths");
    }
    paths
}

fn collect(node: &FilterDescriptor, prefix: Option<&str>, paths: &mut Vec<String>) {
    match node.kind() {
        Ok(NodeKind::Relationship { path, nested, .. }) => {
            if nested.iter().all(FilterDescriptor::is_vacuous) {
                return;
            }
            let full = match prefix {
                Some(prefix) => format!("{prefix}.{path}"),
                None => path.into_owned(),
            };
            if !paths.contains(&full) {
                paths.push(full.clone());
            }
            for child in nested {
                collect(child, Some(&full), paths);
            }
        }
        Ok(NodeKind::Group { children, .. }) => {
            for child in children {
                collect(child, prefix, paths);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operator;

    fn nombre(value: &str) -> FilterDescriptor {
        FilterDescriptor::leaf("Nombre", Operator::Equals, value)
    }

    #[test]
    fn test_single_relationship() {
        let filters = vec![FilterDescriptor::related("Region", vec![nombre("Norte")])];
        assert_eq!(derive_includes(&filters), vec!["Region"]);
    }

    #[test]
    fn test_presence_only_relationship_is_excluded() {
        let filters = vec![
            FilterDescriptor::related("Region", vec![]),
            FilterDescriptor::related("Categoria", vec![FilterDescriptor::and(vec![])]),
        ];
        assert!(derive_includes(&filters).is_empty());
    }

    #[test]
    fn test_groups_are_walked_without_contributing() {
        let filters = vec![FilterDescriptor::or(vec![
            nombre("x"),
            FilterDescriptor::and(vec![FilterDescriptor::any("Etiquetas", vec![nombre("a")])]),
            FilterDescriptor::related("Region", vec![nombre("b")]),
        ])];
        assert_eq!(derive_includes(&filters), vec!["Etiquetas", "Region"]);
    }

    #[test]
    fn test_duplicates_keep_first_position() {
        let filters = vec![
            FilterDescriptor::related("Region", vec![nombre("a")]),
            FilterDescriptor::related("Proveedor", vec![nombre("b")]),
            FilterDescriptor::related("Region", vec![nombre("c")]),
        ];
        assert_eq!(derive_includes(&filters), vec!["Region", "Proveedor"]);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let filters = vec![
            FilterDescriptor::related(
                "Region",
                vec![FilterDescriptor::related("Pais", vec![nombre("Chile")])],
            ),
            FilterDescriptor::related("Region", vec![nombre("Norte")]),
        ];
        let first = derive_includes(&filters);
        let second = derive_includes(&filters);
        assert_eq!(first, second);
        assert_eq!(first, vec!["Region", "Region.Pais"]);
    }
}
