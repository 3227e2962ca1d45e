use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::node::{ExecutionContext, Node, PortDefinition};
use crate::prompt::{render_prompt, ParameterKind, TemplateLibrary, NO_TEMPLATE};
use crate::types::{PortData, PortType};

const NODE_TYPE: &str = "PromptTemplate";

/// Renders one of the built-in prompt templates. The selected template's
/// parameters are exposed as extra input ports.
pub struct PromptTemplateNode {
    library: TemplateLibrary,
    template: String,
}

impl PromptTemplateNode {
    pub fn new() -> Self {
        Self {
            library: TemplateLibrary::builtin(),
            template: NO_TEMPLATE.to_string(),
        }
    }

    pub fn from_params(params: &HashMap<String, serde_json::Value>) -> Self {
        let template = params
            .get("template")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(NO_TEMPLATE)
            .to_string();

        Self {
            template,
            ..Self::new()
        }
    }

    fn parameter_value(&self, name: &str, data: &PortData) -> Result<String> {
        match data {
            PortData::Str(value) => Ok(value.clone()),
            PortData::Int(value) => Ok(value.to_string()),
            _ => bail!("{NODE_TYPE}: input '{name}' must be Str or Int"),
        }
    }
}

impl Default for PromptTemplateNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for PromptTemplateNode {
    fn node_type(&self) -> &str {
        NODE_TYPE
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        let mut ports = vec![PortDefinition {
            name: "template".to_string(),
            port_type: PortType::Str,
            required: true,
            default_value: Some(serde_json::json!(NO_TEMPLATE)),
        }];

        if let Some(template) = self.library.get(&self.template) {
            for param in &template.parameters {
                let port_type = match param.kind {
                    ParameterKind::Integer { .. } => PortType::Int,
                    ParameterKind::Select { .. } | ParameterKind::Text { .. } => PortType::Str,
                };
                ports.push(PortDefinition {
                    name: param.name.clone(),
                    port_type,
                    required: false,
                    default_value: serde_json::to_value(&param.default).ok(),
                });
            }
        }

        ports
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition {
            name: "prompt".to_string(),
            port_type: PortType::Str,
            required: true,
            default_value: None,
        }]
    }

    fn execute(
        &mut self,
        inputs: &HashMap<String, PortData>,
        _ctx: &ExecutionContext,
    ) -> Result<HashMap<String, PortData>> {
        match inputs.get("template") {
            Some(PortData::Str(value)) => self.template = value.clone(),
            Some(_) => bail!("{NODE_TYPE}: input 'template' must be Str"),
            None => {}
        }

        let mut values = HashMap::new();
        if let Some(template) = self.library.get(&self.template) {
            for param in &template.parameters {
                let Some(data) = inputs.get(&param.name) else {
                    continue;
                };
                let value = self.parameter_value(&param.name, data)?;
                if let Err(err) = param.validate(&value) {
                    bail!("{NODE_TYPE}: {err}");
                }
                values.insert(param.name.clone(), value);
            }
        }

        let prompt = render_prompt(&self.library, &self.template, &values);

        Ok(HashMap::from([(
            "prompt".to_string(),
            PortData::Str(prompt),
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt_of(outputs: &HashMap<String, PortData>) -> &str {
        match outputs.get("prompt") {
            Some(PortData::Str(value)) => value,
            _ => panic!("expected prompt output"),
        }
    }

    #[test]
    fn test_ports_follow_selected_template() {
        let node = PromptTemplateNode::new();
        assert_eq!(node.input_ports().len(), 1);

        let params = HashMap::from([("template".to_string(), serde_json::json!("character"))]);
        let node = PromptTemplateNode::from_params(&params);
        let ports = node.input_ports();
        let names: Vec<&str> = ports.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "template",
                "character_type",
                "name",
                "age",
                "appearance",
                "personality",
                "special_abilities"
            ]
        );
        assert_eq!(ports[3].port_type, PortType::Int);
        assert_eq!(ports[3].default_value, Some(serde_json::json!(25)));
        assert_eq!(ports[2].default_value, Some(serde_json::json!("Aragorn")));
    }

    #[test]
    fn test_none_template_renders_empty() {
        let mut node = PromptTemplateNode::new();
        let outputs = node
            .execute(&HashMap::new(), &ExecutionContext::default())
            .unwrap();
        assert_eq!(prompt_of(&outputs), "");
    }

    #[test]
    fn test_unknown_template_renders_not_found() {
        let mut node = PromptTemplateNode::new();
        let inputs = HashMap::from([(
            "template".to_string(),
            PortData::Str("portrait".to_string()),
        )]);
        let outputs = node.execute(&inputs, &ExecutionContext::default()).unwrap();
        assert_eq!(prompt_of(&outputs), "Template not found");
    }

    #[test]
    fn test_inputs_substitute_parameters() {
        let mut node = PromptTemplateNode::new();
        let inputs = HashMap::from([
            ("template".to_string(), PortData::Str("character".to_string())),
            ("name".to_string(), PortData::Str("Mira".to_string())),
            ("age".to_string(), PortData::Int(31)),
            ("character_type".to_string(), PortData::Str("mage".to_string())),
        ]);
        let outputs = node.execute(&inputs, &ExecutionContext::default()).unwrap();
        assert_eq!(
            prompt_of(&outputs),
            "A mage character named Mira, 31 years old, with tall and strong appearance \
             and brave personality. Expert swordsman"
        );
        assert_eq!(node.input_ports().len(), 7);
    }

    #[test]
    fn test_invalid_choice_is_rejected() {
        let mut node = PromptTemplateNode::new();
        let inputs = HashMap::from([
            ("template".to_string(), PortData::Str("scene".to_string())),
            ("time_of_day".to_string(), PortData::Str("teatime".to_string())),
        ]);
        let err = node
            .execute(&inputs, &ExecutionContext::default())
            .unwrap_err();
        assert!(err.to_string().starts_with("PromptTemplate: 'teatime' is not a valid choice"));
    }

    #[test]
    fn test_out_of_range_integer_is_rejected() {
        let mut node = PromptTemplateNode::new();
        let inputs = HashMap::from([
            ("template".to_string(), PortData::Str("character".to_string())),
            ("age".to_string(), PortData::Int(0)),
        ]);
        let err = node
            .execute(&inputs, &ExecutionContext::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "PromptTemplate: 'age' must be between 1 and 1000, got 0"
        );
    }

    #[test]
    fn test_wrong_input_type_is_rejected() {
        let mut node = PromptTemplateNode::new();
        let inputs = HashMap::from([
            ("template".to_string(), PortData::Str("custom".to_string())),
            ("custom_prompt".to_string(), PortData::Bool(true)),
        ]);
        let err = node
            .execute(&inputs, &ExecutionContext::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "PromptTemplate: input 'custom_prompt' must be Str or Int"
        );
    }
}
