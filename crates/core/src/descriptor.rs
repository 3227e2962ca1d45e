//! Node descriptors: static metadata for all registered node types.
//!
//! Descriptors carry display names, categories, colors, icons and the
//! full port list (both stream and param) for a node editor. They are a
//! separate data path from the runtime `Node::input_ports()` and
//! `output_ports()`.

use serde::Serialize;

use crate::canvas::{
    AspectRatio, InterpolationKernel, PaddingPolicy, MAX_MULTIPLE_OF, MAX_RESOLUTION,
};
use crate::dataset::{BatchResizeMethod, SortOrder};
use crate::prompt::{TemplateLibrary, NO_TEMPLATE};
use crate::types::PortType;

#[derive(Debug, Clone, Serialize)]
pub struct NodeDescriptor {
    pub node_type: String,
    pub display_name: String,
    /// "input", "image", "text"
    pub category: String,
    /// Hex color, e.g. "#F97316"
    pub accent_color: String,
    pub icon: String,
    pub inputs: Vec<PortDescriptor>,
    pub outputs: Vec<PortDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortDescriptor {
    pub name: String,
    /// Serialized by variant name: "Image", "Mask", "Int", "Str", etc.
    pub port_type: PortType,
    /// "stream" or "param"
    pub direction: String,
    pub required: bool,
    pub default_value: Option<serde_json::Value>,
    /// "enum", "slider", "path_picker", etc.
    pub ui_hint: Option<String>,
    pub enum_options: Option<Vec<String>>,
    /// Bounds for numeric params.
    pub range: Option<(i64, i64)>,
    /// Name of the param whose value decides the extra input ports.
    pub dynamic_ports_param: Option<String>,
}

/// Helper to build a stream port descriptor.
fn stream(name: &str, port_type: PortType) -> PortDescriptor {
    PortDescriptor {
        name: name.to_string(),
        port_type,
        direction: "stream".to_string(),
        required: true,
        default_value: None,
        ui_hint: None,
        enum_options: None,
        range: None,
        dynamic_ports_param: None,
    }
}

/// Helper to build a required param port descriptor.
fn param_required(name: &str, port_type: PortType) -> PortDescriptor {
    PortDescriptor {
        direction: "param".to_string(),
        ..stream(name, port_type)
    }
}

/// Helper to build an optional param port descriptor with a default value.
fn param_opt(name: &str, port_type: PortType, default: serde_json::Value) -> PortDescriptor {
    PortDescriptor {
        required: false,
        default_value: Some(default),
        ..param_required(name, port_type)
    }
}

/// Optional Str param restricted to `options`.
fn param_enum(name: &str, default: &str, options: Vec<String>) -> PortDescriptor {
    PortDescriptor {
        ui_hint: Some("enum".to_string()),
        enum_options: Some(options),
        ..param_opt(name, PortType::Str, serde_json::json!(default))
    }
}

fn param_int(name: &str, default: i64, min: i64, max: i64) -> PortDescriptor {
    PortDescriptor {
        ui_hint: Some("slider".to_string()),
        range: Some((min, max)),
        ..param_opt(name, PortType::Int, serde_json::json!(default))
    }
}

/// Returns descriptors for all registered node types.
///
/// Port data is hardcoded to match the runtime `Node` implementations with
/// their built-in defaults.
pub fn all_node_descriptors() -> Vec<NodeDescriptor> {
    vec![
        NodeDescriptor {
            node_type: "OutpaintByAspectRatio".to_string(),
            display_name: "Outpaint By Aspect Ratio".to_string(),
            category: "image".to_string(),
            accent_color: "#F97316".to_string(),
            icon: "expand".to_string(),
            inputs: vec![
                stream("image", PortType::Image),
                param_enum(
                    "target_ratio",
                    AspectRatio::Square.token(),
                    AspectRatio::tokens(),
                ),
                param_enum(
                    "padding_position",
                    PaddingPolicy::Center.name(),
                    PaddingPolicy::names(),
                ),
                param_enum(
                    "interpolation",
                    InterpolationKernel::Lanczos.name(),
                    InterpolationKernel::names(),
                ),
                param_int("feathering", 0, 0, MAX_RESOLUTION as i64),
                PortDescriptor {
                    ui_hint: Some("step:8".to_string()),
                    ..param_int("multiple_of", 8, 0, MAX_MULTIPLE_OF as i64)
                },
            ],
            outputs: vec![
                stream("image", PortType::Image),
                stream("mask", PortType::Mask),
                param_required("width", PortType::Int),
                param_required("height", PortType::Int),
            ],
        },
        NodeDescriptor {
            node_type: "PromptTemplate".to_string(),
            display_name: "Prompt Template".to_string(),
            category: "text".to_string(),
            accent_color: "#6366F1".to_string(),
            icon: "braces".to_string(),
            inputs: vec![PortDescriptor {
                required: true,
                dynamic_ports_param: Some("template".to_string()),
                ..param_enum(
                    "template",
                    NO_TEMPLATE,
                    TemplateLibrary::builtin().selectable_keys(),
                )
            }],
            outputs: vec![param_required("prompt", PortType::Str)],
        },
        NodeDescriptor {
            node_type: "LoadImageSetSorted".to_string(),
            display_name: "Load Image Dataset (Sorted by Filename)".to_string(),
            category: "input".to_string(),
            accent_color: "#A855F7".to_string(),
            icon: "images".to_string(),
            inputs: vec![
                PortDescriptor {
                    ui_hint: Some("path_picker".to_string()),
                    ..param_opt("directory", PortType::Path, serde_json::json!(""))
                },
                PortDescriptor {
                    ui_hint: Some("multiline".to_string()),
                    ..param_opt("images", PortType::Str, serde_json::json!(""))
                },
                param_enum(
                    "resize_method",
                    BatchResizeMethod::None.name(),
                    BatchResizeMethod::names(),
                ),
                param_enum("sort_order", SortOrder::Ascending.name(), SortOrder::names()),
                param_opt("natural_sort", PortType::Bool, serde_json::json!(true)),
                param_opt("case_sensitive", PortType::Bool, serde_json::json!(false)),
            ],
            outputs: vec![
                stream("image", PortType::Image),
                param_required("count", PortType::Int),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::build_default_registry;

    fn find(node_type: &str) -> NodeDescriptor {
        all_node_descriptors()
            .into_iter()
            .find(|d| d.node_type == node_type)
            .unwrap_or_else(|| panic!("{node_type} descriptor should exist"))
    }

    #[test]
    fn test_descriptors_match_registry() {
        let registry = build_default_registry();
        let mut types: Vec<String> = all_node_descriptors()
            .into_iter()
            .map(|d| d.node_type)
            .collect();
        types.sort();
        assert_eq!(types, registry.list_node_types());
    }

    #[test]
    fn test_descriptor_ports_match_runtime_ports() {
        let registry = build_default_registry();
        for desc in all_node_descriptors() {
            let node = registry
                .create(&desc.node_type, Default::default())
                .expect("node should be created");
            let runtime: Vec<(String, PortType)> = node
                .input_ports()
                .into_iter()
                .map(|p| (p.name, p.port_type))
                .collect();
            let described: Vec<(String, PortType)> = desc
                .inputs
                .iter()
                .map(|p| (p.name.clone(), p.port_type.clone()))
                .collect();
            assert_eq!(runtime, described, "inputs of {}", desc.node_type);

            let runtime: Vec<(String, PortType)> = node
                .output_ports()
                .into_iter()
                .map(|p| (p.name, p.port_type))
                .collect();
            let described: Vec<(String, PortType)> = desc
                .outputs
                .iter()
                .map(|p| (p.name.clone(), p.port_type.clone()))
                .collect();
            assert_eq!(runtime, described, "outputs of {}", desc.node_type);
        }
    }

    #[test]
    fn test_outpaint_descriptor_enums() {
        let outpaint = find("OutpaintByAspectRatio");
        let ratio = &outpaint.inputs[1];
        let options = ratio.enum_options.as_ref().unwrap();
        assert_eq!(options.len(), 13);
        assert_eq!(options[0], "1:1");
        assert_eq!(ratio.default_value, Some(serde_json::json!("1:1")));

        let kernel = &outpaint.inputs[3];
        assert_eq!(
            kernel.enum_options.as_deref(),
            Some(&["nearest", "bilinear", "bicubic", "area", "lanczos"].map(String::from)[..])
        );
        assert_eq!(outpaint.inputs[4].range, Some((0, 8192)));
        assert_eq!(outpaint.inputs[5].range, Some((0, 512)));
    }

    #[test]
    fn test_prompt_descriptor_lists_templates() {
        let prompt = find("PromptTemplate");
        let template = &prompt.inputs[0];
        assert!(template.required);
        assert_eq!(template.dynamic_ports_param.as_deref(), Some("template"));
        assert_eq!(
            template.enum_options.as_ref().unwrap(),
            &vec!["none", "character", "scene", "style", "custom"]
        );
    }

    #[test]
    fn test_descriptors_serialize() {
        let json = serde_json::to_string(&all_node_descriptors()).expect("should serialize");
        assert!(json.contains("OutpaintByAspectRatio"));
        assert!(json.contains("\"range\":[0,512]"));
        assert!(json.contains("\"port_type\":\"Mask\""));
    }

    #[test]
    fn test_directions_valid() {
        for desc in all_node_descriptors() {
            for port in desc.inputs.iter().chain(desc.outputs.iter()) {
                let expected = if matches!(port.port_type, PortType::Image | PortType::Mask) {
                    "stream"
                } else {
                    "param"
                };
                assert_eq!(
                    port.direction, expected,
                    "port '{}' of node '{}'",
                    port.name, desc.node_type
                );
            }
        }
    }
}
