//! OutpaintByAspectRatio node: pads an image batch to a canonical ratio and
//! emits the matching outpaint mask.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};

use crate::canvas::{
    prepare_outpaint_canvas_with, InterpolationKernel, OutpaintParams, PaddingPolicy,
    MAX_MULTIPLE_OF, MAX_RESOLUTION,
};
use crate::node::{ExecutionContext, Node, PortDefinition};
use crate::types::{PortData, PortType};

const NODE_TYPE: &str = "OutpaintByAspectRatio";

pub struct OutpaintByAspectRatioNode {
    defaults: OutpaintParams,
}

impl OutpaintByAspectRatioNode {
    pub fn new() -> Self {
        Self::with_defaults(OutpaintParams::default())
    }

    pub fn with_defaults(defaults: OutpaintParams) -> Self {
        Self { defaults }
    }

    /// Build from creation params; any parameter port name may appear here
    /// to override its default.
    pub fn from_params(params: &HashMap<String, serde_json::Value>) -> Result<Self> {
        let mut defaults = OutpaintParams::default();

        if let Some(value) = params.get("target_ratio") {
            defaults.target_ratio = value
                .as_str()
                .with_context(|| format!("{NODE_TYPE}: param 'target_ratio' must be a string"))?
                .to_string();
        }
        if let Some(value) = params.get("padding_position") {
            let name = value.as_str().with_context(|| {
                format!("{NODE_TYPE}: param 'padding_position' must be a string")
            })?;
            defaults.padding = parse_padding(name)?;
        }
        if let Some(value) = params.get("interpolation") {
            let name = value
                .as_str()
                .with_context(|| format!("{NODE_TYPE}: param 'interpolation' must be a string"))?;
            defaults.kernel = parse_kernel(name)?;
        }
        if let Some(value) = params.get("feathering") {
            let raw = value
                .as_i64()
                .with_context(|| format!("{NODE_TYPE}: param 'feathering' must be an integer"))?;
            defaults.feathering = check_feathering(raw)?;
        }
        if let Some(value) = params.get("multiple_of") {
            let raw = value
                .as_i64()
                .with_context(|| format!("{NODE_TYPE}: param 'multiple_of' must be an integer"))?;
            defaults.multiple_of = check_multiple_of(raw)?;
        }

        Ok(Self { defaults })
    }

    fn resolve_params(&self, inputs: &HashMap<String, PortData>) -> Result<OutpaintParams> {
        let target_ratio = match inputs.get("target_ratio") {
            Some(PortData::Str(value)) => value.clone(),
            Some(_) => bail!("{NODE_TYPE}: input 'target_ratio' must be Str"),
            None => self.defaults.target_ratio.clone(),
        };

        let padding = match inputs.get("padding_position") {
            Some(PortData::Str(value)) => parse_padding(value)?,
            Some(_) => bail!("{NODE_TYPE}: input 'padding_position' must be Str"),
            None => self.defaults.padding,
        };

        let kernel = match inputs.get("interpolation") {
            Some(PortData::Str(value)) => parse_kernel(value)?,
            Some(_) => bail!("{NODE_TYPE}: input 'interpolation' must be Str"),
            None => self.defaults.kernel,
        };

        let feathering = match inputs.get("feathering") {
            Some(PortData::Int(value)) => check_feathering(*value)?,
            Some(_) => bail!("{NODE_TYPE}: input 'feathering' must be Int"),
            None => self.defaults.feathering,
        };

        let multiple_of = match inputs.get("multiple_of") {
            Some(PortData::Int(value)) => check_multiple_of(*value)?,
            Some(_) => bail!("{NODE_TYPE}: input 'multiple_of' must be Int"),
            None => self.defaults.multiple_of,
        };

        Ok(OutpaintParams {
            target_ratio,
            padding,
            kernel,
            feathering,
            multiple_of,
        })
    }
}

impl Default for OutpaintByAspectRatioNode {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_padding(name: &str) -> Result<PaddingPolicy> {
    name.parse()
        .with_context(|| format!("{NODE_TYPE}: invalid 'padding_position'"))
}

fn parse_kernel(name: &str) -> Result<InterpolationKernel> {
    name.parse()
        .with_context(|| format!("{NODE_TYPE}: invalid 'interpolation'"))
}

fn check_feathering(value: i64) -> Result<usize> {
    if !(0..=MAX_RESOLUTION as i64).contains(&value) {
        bail!("{NODE_TYPE}: feathering must be within 0..={MAX_RESOLUTION}, got {value}");
    }
    Ok(value as usize)
}

fn check_multiple_of(value: i64) -> Result<usize> {
    if !(0..=MAX_MULTIPLE_OF as i64).contains(&value) {
        bail!("{NODE_TYPE}: multiple_of must be within 0..={MAX_MULTIPLE_OF}, got {value}");
    }
    Ok(value as usize)
}

impl Node for OutpaintByAspectRatioNode {
    fn node_type(&self) -> &str {
        NODE_TYPE
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![
            PortDefinition {
                name: "image".to_string(),
                port_type: PortType::Image,
                required: true,
                default_value: None,
            },
            PortDefinition {
                name: "target_ratio".to_string(),
                port_type: PortType::Str,
                required: false,
                default_value: Some(serde_json::json!(self.defaults.target_ratio)),
            },
            PortDefinition {
                name: "padding_position".to_string(),
                port_type: PortType::Str,
                required: false,
                default_value: Some(serde_json::json!(self.defaults.padding.name())),
            },
            PortDefinition {
                name: "interpolation".to_string(),
                port_type: PortType::Str,
                required: false,
                default_value: Some(serde_json::json!(self.defaults.kernel.name())),
            },
            PortDefinition {
                name: "feathering".to_string(),
                port_type: PortType::Int,
                required: false,
                default_value: Some(serde_json::json!(self.defaults.feathering)),
            },
            PortDefinition {
                name: "multiple_of".to_string(),
                port_type: PortType::Int,
                required: false,
                default_value: Some(serde_json::json!(self.defaults.multiple_of)),
            },
        ]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![
            PortDefinition {
                name: "image".to_string(),
                port_type: PortType::Image,
                required: true,
                default_value: None,
            },
            PortDefinition {
                name: "mask".to_string(),
                port_type: PortType::Mask,
                required: true,
                default_value: None,
            },
            PortDefinition {
                name: "width".to_string(),
                port_type: PortType::Int,
                required: true,
                default_value: None,
            },
            PortDefinition {
                name: "height".to_string(),
                port_type: PortType::Int,
                required: true,
                default_value: None,
            },
        ]
    }

    fn execute(
        &mut self,
        inputs: &HashMap<String, PortData>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, PortData>> {
        let image = match inputs.get("image") {
            Some(PortData::Image(image)) => image,
            Some(_) => bail!("{NODE_TYPE}: input 'image' must be Image"),
            None => bail!("{NODE_TYPE}: missing required input 'image'"),
        };
        let params = self.resolve_params(inputs)?;

        let canvas = prepare_outpaint_canvas_with(ctx.backend.as_ref(), image.view(), &params)
            .with_context(|| format!("{NODE_TYPE}: failed to prepare canvas"))?;
        let width = canvas.width() as i64;
        let height = canvas.height() as i64;

        Ok(HashMap::from([
            ("image".to_string(), PortData::Image(canvas.image)),
            ("mask".to_string(), PortData::Mask(canvas.mask)),
            ("width".to_string(), PortData::Int(width)),
            ("height".to_string(), PortData::Int(height)),
        ]))
    }
}
