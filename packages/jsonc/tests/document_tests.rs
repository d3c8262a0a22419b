//! Formatting-preservation and indexing properties of path-addressed edits

use composer_jsonc::{DocumentError, JsonPath, JsoncDocument};
use serde_json::json;

const SCENE: &str = r#"{
  // Scene file, edited by hand as well as by the editor
  "config": {
    "clearColor": { "r": 0, "g": 0, "b": 0 }, /* black */
  },
  "objects": [
    {
      "id": "cube",
      "name": "Cube", // display name
      "transform": {
        "position": { "x": 1, "y": 2, "z": 3 },
        "rotation": { "x": 0, "y": 0, "z": 0 },
        "scale": { "x": 1, "y": 1, "z": 1 }
      },
      "components": []
    }
  ]
}
"#;

fn path(s: &str) -> JsonPath {
    s.parse().unwrap()
}

/// Text of everything before the `objects` member: never touched below
fn header(text: &str) -> &str {
    &text[..text.find("\"objects\"").unwrap()]
}

#[test]
fn test_untouched_regions_are_byte_identical() {
    let mut doc = JsoncDocument::parse(SCENE).unwrap();

    doc.set(&path("objects[0].transform.position"), &json!({ "x": 10, "y": 20, "z": 30 }))
        .unwrap();
    doc.set(&path("objects[0].name"), "Renamed").unwrap();
    doc.insert(&path("objects[0].components[0]"), &json!({ "type": "camera" }))
        .unwrap();
    doc.delete(&path("objects[0].components[0]")).unwrap();

    let text = doc.to_string();
    assert_eq!(header(&text), header(SCENE));
    assert!(text.contains("\"name\": \"Renamed\", // display name"));
    assert!(text.contains("\"rotation\": { \"x\": 0, \"y\": 0, \"z\": 0 },"));
    assert!(text.ends_with("  ]\n}\n"));

    let value = doc.json();
    assert_eq!(value["objects"][0]["transform"]["position"], json!({ "x": 10, "y": 20, "z": 30 }));
    assert_eq!(value["objects"][0]["components"], json!([]));
}

#[test]
fn test_array_insertion_shifts_later_elements() {
    for i in 0..=3 {
        let mut doc = JsoncDocument::parse("{\n  \"list\": [\n    0,\n    1,\n    2\n  ]\n}").unwrap();
        doc.insert(&JsonPath::root().key("list").index(i), "new").unwrap();

        let list = doc.json()["list"].as_array().unwrap().clone();
        assert_eq!(list.len(), 4);
        assert_eq!(list[i], json!("new"));
        for (old_index, old_value) in [0, 1, 2].into_iter().enumerate() {
            let expected = if old_index >= i { old_index + 1 } else { old_index };
            assert_eq!(list[expected], json!(old_value));
        }
    }
}

#[test]
fn test_insert_then_delete_restores_text() {
    let mut doc = JsoncDocument::parse(SCENE).unwrap();
    doc.insert(
        &path("objects[1]"),
        &json!({ "id": "light", "name": "Light", "components": [] }),
    )
    .unwrap();
    assert_eq!(doc.json()["objects"].as_array().unwrap().len(), 2);

    doc.delete(&path("objects[1]")).unwrap();
    assert_eq!(doc.to_string(), SCENE);
}

#[test]
fn test_errors_leave_document_untouched() {
    let mut doc = JsoncDocument::parse(SCENE).unwrap();
    assert!(matches!(
        doc.set(&path("objects[4].name"), "x"),
        Err(DocumentError::PathNotFound { .. })
    ));
    assert!(matches!(
        doc.delete(&path("objects[0].missing")),
        Err(DocumentError::PathNotFound { .. })
    ));
    assert_eq!(doc.to_string(), SCENE);
}

#[test]
fn test_new_members_follow_detected_indent() {
    let mut doc = JsoncDocument::parse("{\n    \"a\": {\n        \"b\": 1\n    }\n}").unwrap();
    doc.set(&path("c"), &json!({ "d": true })).unwrap();
    assert_eq!(
        doc.to_string(),
        "{\n    \"a\": {\n        \"b\": 1\n    },\n    \"c\": {\n        \"d\": true\n    }\n}"
    );
}

#[test]
fn test_append_keeps_trailing_block_comment_with_its_value() {
    let mut doc = JsoncDocument::parse(r#"{"a": 1 /* keep */}"#).unwrap();
    doc.set(&path("b"), &2).unwrap();
    assert_eq!(doc.as_str(), r#"{"a": 1 /* keep */, "b": 2}"#);
    assert_eq!(doc.json(), json!({ "a": 1, "b": 2 }));

    let mut doc = JsoncDocument::parse(r#"[1, /* one */]"#).unwrap();
    doc.set(&path("[1]"), &2).unwrap();
    assert_eq!(doc.as_str(), r#"[1, /* one */ 2,]"#);

    let source = "{\n  \"a\": 1 /* keep */\n}\n";
    let mut doc = JsoncDocument::parse(source).unwrap();
    doc.set(&path("b"), &2).unwrap();
    assert_eq!(doc.as_str(), "{\n  \"a\": 1, /* keep */\n  \"b\": 2\n}\n");

    doc.delete(&path("b")).unwrap();
    assert_eq!(doc.as_str(), source);
}
