use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::node::Node;

type NodeFactory =
    dyn Fn(HashMap<String, serde_json::Value>) -> Result<Box<dyn Node>> + Send + Sync;

pub struct NodeRegistry {
    factories: HashMap<String, Box<NodeFactory>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, node_type: &str, factory: F)
    where
        F: Fn(HashMap<String, serde_json::Value>) -> Result<Box<dyn Node>> + Send + Sync + 'static,
    {
        self.factories
            .insert(node_type.to_string(), Box::new(factory));
    }

    pub fn create(
        &self,
        node_type: &str,
        params: HashMap<String, serde_json::Value>,
    ) -> Result<Box<dyn Node>> {
        let factory = self
            .factories
            .get(node_type)
            .ok_or_else(|| anyhow!("unknown node type: {node_type}"))?;

        factory(params)
    }

    pub fn list_node_types(&self) -> Vec<&str> {
        let mut node_types: Vec<&str> = self.factories.keys().map(|v| v.as_str()).collect();
        node_types.sort_unstable();
        node_types
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register every node type shipped with `ezprompts-core`.
///
/// Creation params override the node's parameter defaults, so hosts can seed
/// nodes from their own configuration.
pub fn register_all_nodes(registry: &mut NodeRegistry) {
    use crate::nodes::image_set::LoadImageSetSortedNode;
    use crate::nodes::outpaint::OutpaintByAspectRatioNode;
    use crate::nodes::prompt_template::PromptTemplateNode;

    registry.register("OutpaintByAspectRatio", |params| {
        Ok(Box::new(OutpaintByAspectRatioNode::from_params(&params)?))
    });
    registry.register("PromptTemplate", |params| {
        Ok(Box::new(PromptTemplateNode::from_params(&params)))
    });
    registry.register("LoadImageSetSorted", |params| {
        Ok(Box::new(LoadImageSetSortedNode::from_params(&params)?))
    });
}

pub fn build_default_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_all_nodes(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ExecutionContext, PortDefinition};
    use crate::types::{PortData, PortType};

    struct DummyNode;

    impl Node for DummyNode {
        fn node_type(&self) -> &str {
            "dummy"
        }

        fn input_ports(&self) -> Vec<PortDefinition> {
            vec![PortDefinition {
                name: "in".to_string(),
                port_type: PortType::Str,
                required: true,
                default_value: None,
            }]
        }

        fn output_ports(&self) -> Vec<PortDefinition> {
            vec![PortDefinition {
                name: "out".to_string(),
                port_type: PortType::Str,
                required: true,
                default_value: None,
            }]
        }

        fn execute(
            &mut self,
            _inputs: &HashMap<String, PortData>,
            _ctx: &ExecutionContext,
        ) -> Result<HashMap<String, PortData>> {
            Ok(HashMap::new())
        }
    }

    #[test]
    fn test_node_registry_register_and_create() {
        let mut registry = NodeRegistry::new();
        registry.register("dummy", |_| Ok(Box::new(DummyNode)));

        let node = registry
            .create("dummy", HashMap::new())
            .expect("dummy node should be created");

        assert_eq!(node.node_type(), "dummy");
        assert_eq!(node.input_ports().len(), 1);
        assert_eq!(node.output_ports().len(), 1);
        assert_eq!(registry.list_node_types(), vec!["dummy"]);
    }

    #[test]
    fn test_node_registry_unknown_type_errors() {
        let registry = build_default_registry();

        for node_type in ["unknown", "OutpaintCrop", "LoadImageSetNodeSorted"] {
            let err = match registry.create(node_type, HashMap::new()) {
                Ok(_) => panic!("unknown node type should error"),
                Err(err) => err,
            };

            assert_eq!(err.to_string(), format!("unknown node type: {node_type}"));
        }
    }

    #[test]
    fn test_register_all_nodes_expected_set() {
        let registry = build_default_registry();
        assert_eq!(
            registry.list_node_types(),
            vec!["LoadImageSetSorted", "OutpaintByAspectRatio", "PromptTemplate"]
        );
    }

    #[test]
    fn test_outpaint_factory_applies_params() {
        let registry = build_default_registry();
        let params = HashMap::from([("target_ratio".to_string(), serde_json::json!("21:9"))]);
        let node = registry
            .create("OutpaintByAspectRatio", params)
            .expect("outpaint node should be created from params");

        let ratio = node
            .input_ports()
            .into_iter()
            .find(|p| p.name == "target_ratio")
            .expect("target_ratio port should exist");
        assert_eq!(ratio.default_value, Some(serde_json::json!("21:9")));
    }

    #[test]
    fn test_outpaint_factory_rejects_invalid_param() {
        let registry = build_default_registry();
        let params = HashMap::from([("padding_position".to_string(), serde_json::json!("middle"))]);
        let err = match registry.create("OutpaintByAspectRatio", params) {
            Ok(_) => panic!("invalid padding should fail at creation"),
            Err(err) => err,
        };

        assert_eq!(
            err.to_string(),
            "OutpaintByAspectRatio: invalid 'padding_position'"
        );
    }

    #[test]
    fn test_prompt_factory_exposes_template_ports() {
        let registry = build_default_registry();
        let params = HashMap::from([("template".to_string(), serde_json::json!("custom"))]);
        let node = registry
            .create("PromptTemplate", params)
            .expect("prompt node should be created");
        let names: Vec<String> = node.input_ports().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["template", "custom_prompt"]);
    }
}
