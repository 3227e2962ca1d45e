//! LoadImageSetSorted node: loads a directory of images as one batch,
//! ordered by filename.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};

use crate::dataset::{
    list_image_files, load_image_set, BatchResizeMethod, FsImageDecoder, ImageDecoder,
    LoadOptions, SortOrder,
};
use crate::node::{ExecutionContext, Node, PortDefinition};
use crate::types::{PortData, PortType};

const NODE_TYPE: &str = "LoadImageSetSorted";

pub struct LoadImageSetSortedNode {
    defaults: LoadOptions,
    decoder: Box<dyn ImageDecoder>,
}

impl LoadImageSetSortedNode {
    pub fn new() -> Self {
        Self::with_defaults(LoadOptions::default())
    }

    pub fn with_defaults(defaults: LoadOptions) -> Self {
        Self {
            defaults,
            decoder: Box::new(FsImageDecoder),
        }
    }

    pub fn with_decoder(mut self, decoder: Box<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn from_params(params: &HashMap<String, serde_json::Value>) -> Result<Self> {
        let mut defaults = LoadOptions::default();

        if let Some(value) = params.get("sort_order") {
            let name = value
                .as_str()
                .with_context(|| format!("{NODE_TYPE}: param 'sort_order' must be a string"))?;
            defaults.sort_order = name
                .parse()
                .with_context(|| format!("{NODE_TYPE}: invalid 'sort_order'"))?;
        }
        if let Some(value) = params.get("resize_method") {
            let name = value
                .as_str()
                .with_context(|| format!("{NODE_TYPE}: param 'resize_method' must be a string"))?;
            defaults.resize_method = name
                .parse()
                .with_context(|| format!("{NODE_TYPE}: invalid 'resize_method'"))?;
        }
        if let Some(value) = params.get("natural_sort") {
            defaults.natural_sort = value
                .as_bool()
                .with_context(|| format!("{NODE_TYPE}: param 'natural_sort' must be a bool"))?;
        }
        if let Some(value) = params.get("case_sensitive") {
            defaults.case_sensitive = value
                .as_bool()
                .with_context(|| format!("{NODE_TYPE}: param 'case_sensitive' must be a bool"))?;
        }

        Ok(Self::with_defaults(defaults))
    }

    fn resolve_options(&self, inputs: &HashMap<String, PortData>) -> Result<LoadOptions> {
        let sort_order: SortOrder = match inputs.get("sort_order") {
            Some(PortData::Str(value)) => value
                .parse()
                .with_context(|| format!("{NODE_TYPE}: invalid 'sort_order'"))?,
            Some(_) => bail!("{NODE_TYPE}: input 'sort_order' must be Str"),
            None => self.defaults.sort_order,
        };

        let resize_method: BatchResizeMethod = match inputs.get("resize_method") {
            Some(PortData::Str(value)) => value
                .parse()
                .with_context(|| format!("{NODE_TYPE}: invalid 'resize_method'"))?,
            Some(_) => bail!("{NODE_TYPE}: input 'resize_method' must be Str"),
            None => self.defaults.resize_method,
        };

        let natural_sort = match inputs.get("natural_sort") {
            Some(PortData::Bool(value)) => *value,
            Some(_) => bail!("{NODE_TYPE}: input 'natural_sort' must be Bool"),
            None => self.defaults.natural_sort,
        };

        let case_sensitive = match inputs.get("case_sensitive") {
            Some(PortData::Bool(value)) => *value,
            Some(_) => bail!("{NODE_TYPE}: input 'case_sensitive' must be Bool"),
            None => self.defaults.case_sensitive,
        };

        Ok(LoadOptions {
            sort_order,
            natural_sort,
            case_sensitive,
            resize_method,
        })
    }
}

impl Default for LoadImageSetSortedNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for LoadImageSetSortedNode {
    fn node_type(&self) -> &str {
        NODE_TYPE
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![
            PortDefinition {
                name: "directory".to_string(),
                port_type: PortType::Path,
                required: false,
                default_value: Some(serde_json::json!("")),
            },
            PortDefinition {
                name: "images".to_string(),
                port_type: PortType::Str,
                required: false,
                default_value: Some(serde_json::json!("")),
            },
            PortDefinition {
                name: "resize_method".to_string(),
                port_type: PortType::Str,
                required: false,
                default_value: Some(serde_json::json!(self.defaults.resize_method.name())),
            },
            PortDefinition {
                name: "sort_order".to_string(),
                port_type: PortType::Str,
                required: false,
                default_value: Some(serde_json::json!(self.defaults.sort_order.name())),
            },
            PortDefinition {
                name: "natural_sort".to_string(),
                port_type: PortType::Bool,
                required: false,
                default_value: Some(serde_json::json!(self.defaults.natural_sort)),
            },
            PortDefinition {
                name: "case_sensitive".to_string(),
                port_type: PortType::Bool,
                required: false,
                default_value: Some(serde_json::json!(self.defaults.case_sensitive)),
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
                name: "count".to_string(),
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
        let directory = match inputs.get("directory") {
            Some(PortData::Path(path)) if path.as_os_str().is_empty() => ctx.input_dir.clone(),
            Some(PortData::Path(path)) => ctx.resolve_input(&path.to_string_lossy()),
            Some(PortData::Str(value)) if value.trim().is_empty() => ctx.input_dir.clone(),
            Some(PortData::Str(value)) => ctx.resolve_input(value.trim()),
            Some(_) => bail!("{NODE_TYPE}: input 'directory' must be Path"),
            None => ctx.input_dir.clone(),
        };

        // One file name per line or comma; empty selects every image in the directory.
        let selected: Vec<String> = match inputs.get("images") {
            Some(PortData::Str(value)) => value
                .split(['\n', ','])
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            Some(_) => bail!("{NODE_TYPE}: input 'images' must be Str"),
            None => Vec::new(),
        };
        let files = if selected.is_empty() {
            list_image_files(&directory)
                .with_context(|| format!("{NODE_TYPE}: failed to list images"))?
        } else {
            selected
        };

        let options = self.resolve_options(inputs)?;
        let batch = load_image_set(&directory, &files, &options, self.decoder.as_ref())
            .with_context(|| {
                format!(
                    "{NODE_TYPE}: failed to load image set from {}",
                    directory.display()
                )
            })?;
        let count = batch.len_of(ndarray::Axis(0)) as i64;

        Ok(HashMap::from([
            ("image".to_string(), PortData::Image(batch)),
            ("count".to_string(), PortData::Int(count)),
        ]))
    }
}
