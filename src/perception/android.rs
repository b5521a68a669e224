/// Android hierarchy extraction (uiautomator / Appium page source).
use crate::perception::extractor::XmlNode;
use crate::perception::types::{
    trailing_component, Bounds, ElementDescriptor, ElementMap, ElementOrigin, Extraction,
    ExtractionPolicy, ReferenceFrame,
};

/// Widget classes that accept typed input.
const INPUT_KINDS: &[&str] = &[
    "EditText",
    "AutoCompleteTextView",
    "MultiAutoCompleteTextView",
    "TextInputEditText",
];

pub fn extract(nodes: &[XmlNode], policy: ExtractionPolicy) -> Extraction {
    let mut elements = ElementMap::new();

    for node in nodes.iter().filter(|n| n.attr("clickable") == "true") {
        let kind = node_kind(node);
        if policy == ExtractionPolicy::InputFieldsOnly
            && (!INPUT_KINDS.contains(&kind) || node.attr("enabled") == "false")
        {
            continue;
        }
        let id = (elements.len() + 1).to_string();
        elements.insert(id, descriptor(node, kind));
    }

    Extraction {
        elements,
        frame: reference_frame(nodes),
        origin: ElementOrigin::Hierarchy,
    }
}

/// uiautomator dumps use a generic `<node>` tag and carry the widget class as
/// an attribute; Appium sources use the class as the tag itself.
fn node_kind(node: &XmlNode) -> &str {
    if node.tag == "node" {
        trailing_component(node.attr("class"))
    } else {
        trailing_component(&node.tag)
    }
}

fn descriptor(node: &XmlNode, kind: &str) -> ElementDescriptor {
    let class = match node.attr("class") {
        "" if node.tag != "node" => node.tag.clone(),
        other => other.to_string(),
    };
    ElementDescriptor {
        text: node.attr("text").to_string(),
        resource_id: node.attr("resource-id").to_string(),
        element_type: kind.to_string(),
        bounds: Bounds::parse(node.attr("bounds"))
            .map(|b| b.to_string())
            .unwrap_or_default(),
        class,
        content_desc: node.attr("content-desc").to_string(),
        enabled: node.attr("enabled") != "false",
        password: node.attr("password") == "true",
    }
}

/// The first node that states its extent (the root in practice) defines the
/// hierarchy's coordinate space.
fn reference_frame(nodes: &[XmlNode]) -> Option<ReferenceFrame> {
    nodes.iter().find_map(|node| {
        if let Some(bounds) = Bounds::parse(node.attr("bounds")) {
            return ReferenceFrame::from_bounds(&bounds);
        }
        let width = node.attr("width").parse::<i64>().ok()?;
        let height = node.attr("height").parse::<i64>().ok()?;
        ReferenceFrame::new(width, height)
    })
}
