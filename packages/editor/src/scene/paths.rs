//! Locate objects and components in the live scene document.
//!
//! Paths are resolved by id against the current text right before each
//! write, so earlier edits never leave them stale.

use composer_jsonc::{JsonPath, JsoncDocument, Node, NodeKind, PathSegment};

use crate::ids::{ComponentId, ObjectId};

/// Path of the object with `id`, e.g. `objects[0].children[2]`
pub fn object_path(document: &JsoncDocument, id: &ObjectId) -> Option<JsonPath> {
    find_object(document.root(), JsonPath::root().key("objects"), id)
}

/// Path of a component inside its object's `components` array
pub fn component_path(document: &JsoncDocument, object: &ObjectId, component: &ComponentId) -> Option<JsonPath> {
    let object_path = object_path(document, object)?;
    let components_path = object_path.key("components");
    let components = document.root().resolve(components_path.segments())?;
    let index = position_by_id(components, component.as_str())?;
    Some(components_path.index(index))
}

/// Path of the array holding the children of `parent` (or the roots)
pub fn children_path(document: &JsoncDocument, parent: Option<&ObjectId>) -> Option<JsonPath> {
    match parent {
        Some(parent) => Some(object_path(document, parent)?.key("children")),
        None => Some(JsonPath::root().key("objects")),
    }
}

fn find_object(root: &Node, array_path: JsonPath, id: &ObjectId) -> Option<JsonPath> {
    let array = root.resolve(array_path.segments())?;
    let NodeKind::Array(elements) = &array.kind else {
        return None;
    };

    for (index, element) in elements.iter().enumerate() {
        let path = array_path.clone().index(index);
        if id_of(&element.value) == Some(id.as_str()) {
            return Some(path);
        }
        if element.value.get(&PathSegment::from("children")).is_some() {
            if let Some(found) = find_object(root, path.key("children"), id) {
                return Some(found);
            }
        }
    }
    None
}

/// Index of the element of `array` whose `id` member is `id`
pub(crate) fn position_by_id(array: &Node, id: &str) -> Option<usize> {
    match &array.kind {
        NodeKind::Array(elements) => elements.iter().position(|element| id_of(&element.value) == Some(id)),
        _ => None,
    }
}

fn id_of(node: &Node) -> Option<&str> {
    match &node.member("id")?.1.value.kind {
        NodeKind::String(id) => Some(id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
  "objects": [
    { "id": "root", "name": "Root", "children": [
      { "id": "child", "name": "Child", "components": [
        { "type": "camera", "id": "cam" },
        { "type": "mesh", "id": "mesh" }
      ] }
    ] },
    { "id": "other", "name": "Other" }
  ]
}"#;

    #[test]
    fn test_object_paths() {
        let document = JsoncDocument::parse(SCENE).unwrap();
        assert_eq!(
            object_path(&document, &"child".into()).map(|p| p.to_string()),
            Some("objects[0].children[0]".to_string())
        );
        assert_eq!(
            object_path(&document, &"other".into()).map(|p| p.to_string()),
            Some("objects[1]".to_string())
        );
        assert_eq!(object_path(&document, &"missing".into()), None);
    }

    #[test]
    fn test_component_and_children_paths() {
        let document = JsoncDocument::parse(SCENE).unwrap();
        assert_eq!(
            component_path(&document, &"child".into(), &"mesh".into()).map(|p| p.to_string()),
            Some("objects[0].children[0].components[1]".to_string())
        );
        assert_eq!(
            children_path(&document, Some(&"other".into())).map(|p| p.to_string()),
            Some("objects[1].children".to_string())
        );
    }
}
