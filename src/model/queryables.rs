//! Per-collection queryables schema.

use serde_json::{json, Map, Value};
use url::Url;

use super::Collection;

/// JSON schema of the properties a collection can be filtered on.
///
/// Each summary becomes a string enum of its observed values. `datetime`
/// is bounded by the temporal extent, `bbox` is always offered.
pub fn queryables(collection: &Collection, base_url: &Url) -> Value {
    let mut properties = Map::new();
    for (name, values) in &collection.summaries {
        let values = match values {
            Value::Array(v) => Value::Array(v.clone()),
            other => json!([other]),
        };
        properties.insert(
            name.clone(),
            json!({"title": title_case(name), "type": "string", "enum": values}),
        );
    }

    let (start, end) = collection.extent.interval();
    properties.insert(
        "datetime".into(),
        json!({"type": "datetime", "minimum": start, "maximum": end}),
    );
    properties.insert(
        "bbox".into(),
        json!({
            "description": "bounding box for the collection",
            "type": "array",
            "minItems": 4,
            "maxItems": 6,
            "items": {"type": "number"}
        }),
    );

    json!({
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "$id": format!("{}/collections/{}/queryables", base_url.as_str().trim_end_matches('/'), collection.id),
        "type": "object",
        "title": format!("Queryables for {}", collection.id),
        "description": format!("Queryable names and values for the {} collection", collection.id),
        "properties": properties,
    })
}

/// `product_type` → `Product Type`
fn title_case(name: &str) -> String {
    name.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelSettings;
    use crate::storage::Document;

    #[test]
    fn test_summaries_become_enums() {
        let doc = Document::new(
            "c1",
            "collections",
            json!({
                "summaries": {"product_type": ["GRD", "SLC"], "mission": "S1"},
                "extent": {"temporal": {"gte": "2020-01-01T00:00:00Z", "lte": "2021-01-01T00:00:00Z"}}
            }),
        );
        let collection = Collection::from_document(&doc, &ModelSettings::default());
        let base = Url::parse("https://api.example").unwrap();
        let schema = queryables(&collection, &base);

        assert_eq!(schema["$id"], "https://api.example/collections/c1/queryables");
        let props = &schema["properties"];
        assert_eq!(props["product_type"]["title"], "Product Type");
        assert_eq!(props["product_type"]["enum"], json!(["GRD", "SLC"]));
        assert_eq!(props["mission"]["enum"], json!(["S1"]));
        assert_eq!(props["datetime"]["minimum"], "2020-01-01T00:00:00Z");
        assert_eq!(props["bbox"]["minItems"], 4);
    }

    #[test]
    fn test_open_extent() {
        let collection = Collection::from_document(&Document::new("c2", "x", json!({})), &ModelSettings::default());
        let schema = queryables(&collection, &Url::parse("https://api.example/").unwrap());
        assert_eq!(schema["properties"]["datetime"]["maximum"], Value::Null);
        assert_eq!(title_case("cloud_COVER"), "Cloud Cover");
    }
}
