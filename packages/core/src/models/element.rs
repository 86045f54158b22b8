//! Rich-content element vocabulary
//!
//! Elements are the nested JSON fragments produced by the editing surface.
//! An element is an object with a `type`, an optional `id`, and `children`;
//! a text leaf is an object with a `text` field. This module only inspects
//! that shape, it never defines the full editor schema.

use serde_json::Value;

pub const ELEMENT_TITLE: &str = "title";
pub const ELEMENT_P: &str = "p";
pub const ELEMENT_UL: &str = "ul";
pub const ELEMENT_OL: &str = "ol";
pub const ELEMENT_LI: &str = "li";
/// Content line of a list item; carries the node id
pub const ELEMENT_LIC: &str = "lic";
pub const ELEMENT_TAG: &str = "tag";
pub const ELEMENT_BIDIRECTIONAL_LINK_CONTENT: &str = "bidirectional_link_content";

pub fn element_type(element: &Value) -> Option<&str> {
    element.get("type").and_then(Value::as_str)
}

pub fn element_id(element: &Value) -> Option<&str> {
    element.get("id").and_then(Value::as_str)
}

/// Child elements, or an empty slice for text leaves
pub fn element_children(element: &Value) -> &[Value] {
    element
        .get("children")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn is_type(element: &Value, ty: &str) -> bool {
    element_type(element) == Some(ty)
}

pub fn is_title_element(element: &Value) -> bool {
    is_type(element, ELEMENT_TITLE)
}

/// Bulleted or numbered list container
pub fn is_list_element(element: &Value) -> bool {
    is_type(element, ELEMENT_UL) || is_type(element, ELEMENT_OL)
}

pub fn is_list_item_element(element: &Value) -> bool {
    is_type(element, ELEMENT_LI)
}

pub fn is_list_content_element(element: &Value) -> bool {
    is_type(element, ELEMENT_LIC)
}

pub fn is_tag_element(element: &Value) -> bool {
    is_type(element, ELEMENT_TAG)
}

/// Plain string of an element, concatenating every text leaf
pub fn node_string(element: &Value) -> String {
    let mut out = String::new();
    push_string(element, &mut out, false);
    out
}

pub fn fragment_string(fragment: &[Value]) -> String {
    let mut out = String::new();
    for element in fragment {
        push_string(element, &mut out, false);
    }
    out
}

/// Like [`fragment_string`], but inline tags render as `#name`
pub fn fragment_display_string(fragment: &[Value]) -> String {
    let mut out = String::new();
    for element in fragment {
        push_string(element, &mut out, true);
    }
    out
}

fn push_string(element: &Value, out: &mut String, render_tags: bool) {
    if let Some(text) = element.get("text").and_then(Value::as_str) {
        out.push_str(text);
        return;
    }

    if render_tags && is_tag_element(element) {
        out.push('#');
        if let Some(name) = element.get("name").and_then(Value::as_str) {
            out.push_str(name);
        }
        return;
    }

    for child in element_children(element) {
        push_string(child, out, render_tags);
    }
}

/// Tag names referenced anywhere in `fragment`, first occurrence order, no duplicates
pub fn extract_tags(fragment: &[Value]) -> Vec<String> {
    let mut tags = Vec::new();
    for element in fragment {
        collect_tags(element, &mut tags);
    }
    tags
}

fn collect_tags(element: &Value, tags: &mut Vec<String>) {
    if is_tag_element(element) {
        if let Some(name) = element.get("name").and_then(Value::as_str) {
            if !name.is_empty() && !tags.iter().any(|t| t == name) {
                tags.push(name.to_string());
            }
        }
    }

    for child in element_children(element) {
        collect_tags(child, tags);
    }
}

/// Whether `fragment` contains a bidirectional link pointing at `target_id`
pub fn links_to(fragment: &[Value], target_id: &str) -> bool {
    fragment.iter().any(|element| element_links_to(element, target_id))
}

fn element_links_to(element: &Value, target_id: &str) -> bool {
    if is_type(element, ELEMENT_BIDIRECTIONAL_LINK_CONTENT)
        && element.get("linkId").and_then(Value::as_str) == Some(target_id)
    {
        return true;
    }

    element_children(element)
        .iter()
        .any(|child| element_links_to(child, target_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_string_concatenates_leaves() {
        let el = json!({
            "type": "p",
            "children": [
                {"text": "Hello "},
                {"type": "tag", "name": "work", "children": [{"text": ""}]},
                {"text": "world"}
            ]
        });

        assert_eq!(node_string(&el), "Hello world");
        assert_eq!(fragment_display_string(&[el]), "Hello #workworld");
    }

    #[test]
    fn test_extract_tags_nested_and_deduplicated() {
        let fragment = vec![
            json!({"text": "a"}),
            json!({"type": "tag", "name": "project", "children": [{"text": ""}]}),
            json!({
                "type": "p",
                "children": [
                    {"type": "tag", "name": "later", "children": []},
                    {"type": "tag", "name": "project", "children": []}
                ]
            }),
        ];

        assert_eq!(extract_tags(&fragment), vec!["project", "later"]);
    }

    #[test]
    fn test_extract_tags_skips_unnamed() {
        let fragment = vec![json!({"type": "tag", "children": []})];
        assert!(extract_tags(&fragment).is_empty());
    }

    #[test]
    fn test_links_to_matches_nested_link() {
        let fragment = vec![json!({
            "type": "p",
            "children": [
                {"text": "see "},
                {"type": "bidirectional_link_content", "linkId": "target", "children": [{"text": ""}]}
            ]
        })];

        assert!(links_to(&fragment, "target"));
        assert!(!links_to(&fragment, "other"));
    }

    #[test]
    fn test_list_predicates() {
        assert!(is_list_element(&json!({"type": "ul"})));
        assert!(is_list_element(&json!({"type": "ol"})));
        assert!(!is_list_element(&json!({"type": "li"})));
        assert!(is_list_item_element(&json!({"type": "li"})));
        assert!(is_list_content_element(&json!({"type": "lic"})));
        assert!(element_children(&json!({"text": "leaf"})).is_empty());
    }
}
