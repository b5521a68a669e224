/// Pre-extracted element lists, for callers that already walked their own
/// accessibility tree.
use serde::{Deserialize, Serialize};

use crate::perception::types::{
    coordinate, trailing_component, Bounds, ElementDescriptor, ElementMap, ElementOrigin,
    Extraction,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementEntry {
    #[serde(rename = "className")]
    pub class_name: String,
    /// Caller-side identifier; a string or a number.
    pub elid: Option<serde_json::Value>,
    pub bounds: Option<String>,
    pub x1: Option<f64>,
    pub y1: Option<f64>,
    pub x2: Option<f64>,
    pub y2: Option<f64>,
    pub text: Option<String>,
    pub resourceid: Option<String>,
    pub contentdesc: Option<String>,
    pub clickable: Option<bool>,
    pub password: Option<bool>,
}

impl ElementEntry {
    fn caller_id(&self) -> Option<String> {
        match self.elid.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn resolved_bounds(&self) -> Option<Bounds> {
        if let Some(b) = self.bounds.as_deref().and_then(Bounds::parse) {
            return Some(b);
        }
        match (self.x1, self.y1, self.x2, self.y2) {
            (Some(x1), Some(y1), Some(x2), Some(y2)) => Some(Bounds::new(
                coordinate(x1)?,
                coordinate(y1)?,
                coordinate(x2)?,
                coordinate(y2)?,
            )),
            _ => None,
        }
    }

    fn descriptor(&self) -> ElementDescriptor {
        ElementDescriptor {
            text: self.text.clone().unwrap_or_default(),
            resource_id: self.resourceid.clone().unwrap_or_default(),
            element_type: trailing_component(&self.class_name).to_string(),
            bounds: self
                .resolved_bounds()
                .map(|b| b.to_string())
                .unwrap_or_default(),
            class: self.class_name.clone(),
            content_desc: self.contentdesc.clone().unwrap_or_default(),
            enabled: self.clickable.unwrap_or(true),
            password: self.password.unwrap_or(false),
        }
    }
}

/// First free key among `wanted`, `wanted_<position>`, `wanted_<position>_2`, ...
fn unique_id(elements: &ElementMap, wanted: String, position: usize) -> String {
    if !elements.contains_key(&wanted) {
        return wanted;
    }
    tracing::debug!(elid = %wanted, position, "duplicate element id");
    let base = format!("{wanted}_{position}");
    let mut candidate = base.clone();
    let mut n = 1;
    while elements.contains_key(&candidate) {
        n += 1;
        candidate = format!("{base}_{n}");
    }
    candidate
}

/// Every entry is kept; the caller already did the selecting.
///
/// A flat list says nothing about the screen it came from, so no reference
/// frame is inferred and annotation draws the boxes as given.
pub fn extract(entries: &[ElementEntry]) -> Extraction {
    let mut elements = ElementMap::new();

    for (index, entry) in entries.iter().enumerate() {
        let position = index + 1;
        let wanted = entry.caller_id().unwrap_or_else(|| position.to_string());
        let id = unique_id(&elements, wanted, position);
        elements.insert(id, entry.descriptor());
    }

    Extraction {
        elements,
        frame: None,
        origin: ElementOrigin::ActionableElements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(json: serde_json::Value) -> Vec<ElementEntry> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn maps_entries_to_descriptors() {
        let list = entries(serde_json::json!([
            {
                "className": "android.widget.EditText",
                "elid": "el-42",
                "bounds": "[0,100][500,200]",
                "text": "Jane",
                "resourceid": "com.app:id/name",
                "contentdesc": "Full name",
                "clickable": true
            },
            {
                "className": "android.widget.EditText",
                "x1": 0, "y1": 220, "x2": 500, "y2": 320,
                "clickable": false
            }
        ]));
        let extraction = extract(&list);
        let ids: Vec<&str> = extraction.elements.keys().map(String::as_str).collect();
        assert_eq!(ids, ["el-42", "2"]);

        let first = &extraction.elements["el-42"];
        assert_eq!(first.element_type, "EditText");
        assert_eq!(first.class, "android.widget.EditText");
        assert_eq!(first.text, "Jane");
        assert_eq!(first.resource_id, "com.app:id/name");
        assert_eq!(first.content_desc, "Full name");
        assert!(first.enabled);

        let second = &extraction.elements["2"];
        assert_eq!(second.bounds, "[0,220][500,320]");
        assert!(!second.enabled);
        assert_eq!(extraction.origin, ElementOrigin::ActionableElements);
    }

    #[test]
    fn numeric_and_duplicate_ids() {
        let list = entries(serde_json::json!([
            {"className": "EditText", "elid": 7},
            {"className": "EditText", "elid": "7"},
            {"className": "EditText"}
        ]));
        let ids: Vec<String> = extract(&list).elements.keys().cloned().collect();
        assert_eq!(ids, ["7", "7_2", "3"]);
    }

    #[test]
    fn missing_bounds_are_empty() {
        let list = entries(serde_json::json!([{"className": "EditText", "x1": 5}]));
        let extraction = extract(&list);
        assert_eq!(extraction.elements["1"].bounds, "");
        assert!(extraction.frame.is_none());
    }

    #[test]
    fn position_ids_do_not_replace_caller_ids() {
        let list = entries(serde_json::json!([
            {"className": "EditText", "elid": "2", "text": "first"},
            {"className": "EditText", "text": "second"},
            {"className": "EditText", "elid": "2_2", "text": "third"}
        ]));
        let extraction = extract(&list);
        let ids: Vec<&str> = extraction.elements.keys().map(String::as_str).collect();
        assert_eq!(ids, ["2", "2_2", "2_2_3"]);
        let texts: Vec<&str> = extraction.elements.values().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn no_frame_is_inferred() {
        let list = entries(serde_json::json!([
            {"className": "EditText", "bounds": "[0,0][300,100]"},
            {"className": "EditText", "bounds": "[10,900][720,1000]"}
        ]));
        assert!(extract(&list).frame.is_none());
    }

    #[test]
    fn oversized_coordinates_are_clamped() {
        let list = entries(serde_json::json!([
            {"className": "EditText", "x1": 0, "y1": 0, "x2": 1e19, "y2": 50}
        ]));
        assert_eq!(
            extract(&list).elements["1"].bounds,
            format!("[0,0][{},50]", crate::perception::types::COORD_LIMIT)
        );
    }
}
