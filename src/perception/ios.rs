/// iOS hierarchy extraction (XCUITest / Appium page source).
use crate::perception::extractor::XmlNode;
use crate::perception::types::{
    coordinate, Bounds, ElementDescriptor, COORD_LIMIT, ElementMap, ElementOrigin, Extraction, ExtractionPolicy,
    ReferenceFrame,
};

/// Every XCUITest element tag starts with this.
pub const TYPE_PREFIX: &str = "XCUIElementType";

const SECURE_MARKER: &str = "SecureTextField";

const INPUT_KINDS: &[&str] = &["TextField", "SecureTextField", "TextView", "SearchField"];

/// Extra kinds kept under [`ExtractionPolicy::AllClickable`].
const TAPPABLE_KINDS: &[&str] = &[
    "Button",
    "Link",
    "Switch",
    "Cell",
    "Slider",
    "Picker",
    "PickerWheel",
    "SegmentedControl",
    "Stepper",
];

pub fn extract(nodes: &[XmlNode], policy: ExtractionPolicy) -> Extraction {
    let mut elements = ElementMap::new();

    for node in nodes.iter().filter(|n| n.tag.contains(TYPE_PREFIX)) {
        if !is_selected(node, policy) {
            continue;
        }
        if node.attr("enabled") == "false" || node.attr("visible") == "false" {
            continue;
        }
        let id = (elements.len() + 1).to_string();
        elements.insert(id, descriptor(node));
    }

    Extraction {
        elements,
        frame: reference_frame(nodes),
        origin: ElementOrigin::Hierarchy,
    }
}

fn is_selected(node: &XmlNode, policy: ExtractionPolicy) -> bool {
    if INPUT_KINDS.iter().any(|kind| node.tag.contains(kind)) {
        return true;
    }
    policy == ExtractionPolicy::AllClickable && TAPPABLE_KINDS.contains(&short_type(&node.tag))
}

fn short_type(tag: &str) -> &str {
    tag.strip_prefix(TYPE_PREFIX).unwrap_or(tag)
}

/// Numeric attribute, 0 when missing or not a number.
fn coord(node: &XmlNode, key: &str) -> i64 {
    node.attr(key)
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(coordinate)
        .unwrap_or(0)
}

fn node_bounds(node: &XmlNode) -> Bounds {
    let x = coord(node, "x");
    let y = coord(node, "y");
    let far = |origin: i64, extent: i64| origin.saturating_add(extent).clamp(-COORD_LIMIT, COORD_LIMIT);
    Bounds::new(x, y, far(x, coord(node, "width")), far(y, coord(node, "height")))
}

fn first_non_empty<'a>(node: &'a XmlNode, keys: &[&str]) -> &'a str {
    keys.iter()
        .map(|k| node.attr(k))
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

fn descriptor(node: &XmlNode) -> ElementDescriptor {
    ElementDescriptor {
        text: first_non_empty(node, &["value", "label"]).to_string(),
        resource_id: first_non_empty(node, &["identifier", "name"]).to_string(),
        element_type: short_type(&node.tag).to_string(),
        bounds: node_bounds(node).to_string(),
        class: node.tag.clone(),
        content_desc: node.attr("label").to_string(),
        enabled: node.attr("enabled") != "false",
        password: node.tag.contains(SECURE_MARKER),
    }
}

/// The application element normally comes first and spans the screen.
fn reference_frame(nodes: &[XmlNode]) -> Option<ReferenceFrame> {
    nodes
        .iter()
        .filter(|n| n.tag.contains(TYPE_PREFIX) && n.has_attr("width") && n.has_attr("height"))
        .find_map(|n| {
            let b = node_bounds(n);
            ReferenceFrame::new(b.x2, b.y2)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::extractor::parse_nodes;

    const SIGNUP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AppiumAUT>
  <XCUIElementTypeApplication type="XCUIElementTypeApplication" name="Shop" x="0" y="0" width="390" height="844" enabled="true" visible="true">
    <XCUIElementTypeStaticText name="Create account" label="Create account" x="20" y="60" width="200" height="30"/>
    <XCUIElementTypeTextField name="email_field" label="Email" value="jane@example.com" x="20" y="120" width="350" height="44" enabled="true" visible="true"/>
    <XCUIElementTypeSecureTextField name="password_field" label="Password" x="20" y="180" width="350" height="44" enabled="true" visible="true"/>
    <XCUIElementTypeSearchField name="search" x="20" y="240" width="350" height="44" enabled="true" visible="false"/>
    <XCUIElementTypeTextView identifier="bio" name="bio_name" x="20.4" y="300" width="abc" height="100" enabled="true" visible="true"/>
    <XCUIElementTypeButton name="Sign up" label="Sign up" x="20" y="420" width="350" height="50" enabled="true" visible="true"/>
  </XCUIElementTypeApplication>
</AppiumAUT>"#;

    fn run(policy: ExtractionPolicy) -> Extraction {
        extract(&parse_nodes(SIGNUP).unwrap(), policy)
    }

    #[test]
    fn keeps_visible_enabled_inputs() {
        let extraction = run(ExtractionPolicy::InputFieldsOnly);
        let types: Vec<&str> = extraction
            .elements
            .values()
            .map(|e| e.element_type.as_str())
            .collect();
        assert_eq!(types, ["TextField", "SecureTextField", "TextView"]);
    }

    #[test]
    fn bounds_are_origin_plus_size() {
        let extraction = run(ExtractionPolicy::InputFieldsOnly);
        assert_eq!(extraction.elements["1"].bounds, "[20,120][370,164]");
        assert_eq!(extraction.elements["2"].bounds, "[20,180][370,224]");
        // non-numeric width counts as zero
        assert_eq!(extraction.elements["3"].bounds, "[20,300][20,400]");
    }

    #[test]
    fn attributes_are_mapped() {
        let extraction = run(ExtractionPolicy::InputFieldsOnly);
        let email = &extraction.elements["1"];
        assert_eq!(email.text, "jane@example.com");
        assert_eq!(email.resource_id, "email_field");
        assert_eq!(email.content_desc, "Email");
        assert_eq!(email.class, "XCUIElementTypeTextField");
        assert!(!email.password);

        let password = &extraction.elements["2"];
        assert_eq!(password.text, "Password");
        assert!(password.password);

        assert_eq!(extraction.elements["3"].resource_id, "bio");
    }

    #[test]
    fn all_clickable_adds_buttons() {
        let extraction = run(ExtractionPolicy::AllClickable);
        assert_eq!(extraction.elements.len(), 4);
        assert_eq!(extraction.elements["4"].element_type, "Button");
    }

    #[test]
    fn frame_is_the_application_extent() {
        assert_eq!(
            run(ExtractionPolicy::InputFieldsOnly).frame,
            Some(ReferenceFrame { width: 390, height: 844 })
        );
    }

    #[test]
    fn oversized_extent_is_clamped() {
        let markup = r#"<AppiumAUT>
  <XCUIElementTypeTextField name="huge" x="10" y="20" width="1e19" height="-1e400" enabled="true"/>
</AppiumAUT>"#;
        let extraction = extract(&parse_nodes(markup).unwrap(), ExtractionPolicy::InputFieldsOnly);
        // -1e400 is not finite, so it counts as zero
        assert_eq!(
            extraction.elements["1"].bounds,
            format!("[10,20][{COORD_LIMIT},20]")
        );
    }
}
