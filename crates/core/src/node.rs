use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;

use crate::canvas::{CanvasBackend, CpuBackend};
use crate::types::{PortData, PortType};

#[derive(Debug, Clone, PartialEq)]
pub struct PortDefinition {
    pub name: String,
    pub port_type: PortType,
    pub required: bool,
    pub default_value: Option<serde_json::Value>,
}

/// Per-invocation environment handed to every node.
pub struct ExecutionContext {
    /// Directory that relative dataset paths resolve against.
    pub input_dir: PathBuf,
    pub backend: Box<dyn CanvasBackend>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            backend: Box::new(CpuBackend),
        }
    }
}

impl ExecutionContext {
    pub fn with_input_dir(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            ..Self::default()
        }
    }

    /// Resolve `path` against the input directory unless it is absolute.
    pub fn resolve_input(&self, path: &str) -> PathBuf {
        let candidate = PathBuf::from(path);
        if candidate.is_absolute() {
            candidate
        } else {
            self.input_dir.join(candidate)
        }
    }
}

/// Core node trait that all nodes implement.
pub trait Node: Send + Sync {
    fn node_type(&self) -> &str;
    fn input_ports(&self) -> Vec<PortDefinition>;
    fn output_ports(&self) -> Vec<PortDefinition>;
    fn execute(
        &mut self,
        inputs: &HashMap<String, PortData>,
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, PortData>>;
}
