//! Positional addressing over nested documents
//!
//! A document is a slice of top-level elements. A path is the sequence of
//! child indexes leading from the document to an element, so `[0, 2, 0]` is
//! the first child of the third child of the first top-level element. The
//! empty path addresses the document itself, which is not an element.

use crate::models::element::element_children;
use serde_json::Value;

pub type DocumentPath = Vec<usize>;

/// Element at `path`, or `None` for the empty path and for out-of-bounds paths
pub fn node_at<'a>(document: &'a [Value], path: &[usize]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = document.get(*first)?;
    for index in rest {
        current = element_children(current).get(*index)?;
    }
    Some(current)
}

/// Every element matching `predicate`, in document (pre-)order, with its path
pub fn descendants_matching<'a, F>(document: &'a [Value], predicate: F) -> Vec<(DocumentPath, &'a Value)>
where
    F: Fn(&Value) -> bool,
{
    let mut found = Vec::new();
    let mut path = Vec::new();
    for (index, element) in document.iter().enumerate() {
        path.push(index);
        walk(element, &mut path, &predicate, &mut found);
        path.pop();
    }
    found
}

fn walk<'a, F>(
    element: &'a Value,
    path: &mut DocumentPath,
    predicate: &F,
    found: &mut Vec<(DocumentPath, &'a Value)>,
) where
    F: Fn(&Value) -> bool,
{
    if predicate(element) {
        found.push((path.clone(), element));
    }

    for (index, child) in element_children(element).iter().enumerate() {
        path.push(index);
        walk(child, path, predicate, found);
        path.pop();
    }
}

/// Path `levels` steps above `path`, or `None` if that would leave the document
pub fn ancestor_path(path: &[usize], levels: usize) -> Option<&[usize]> {
    path.len().checked_sub(levels).map(|len| &path[..len])
}
