use std::path::PathBuf;

use ndarray::{Array3, Array4};
use serde::Serialize;

/// Image batch `[batch, height, width, channels]`, values in `[0, 1]`.
pub type ImageBatch = Array4<f32>;

/// Mask batch `[batch, height, width]`; 0 keeps, 1 generates.
pub type MaskBatch = Array3<f32>;

/// Type of a node port, as named in node descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PortType {
    Image,
    Mask,
    Int,
    Str,
    Bool,
    Path,
}

/// Data types that can flow between node ports.
#[derive(Debug, Clone, PartialEq)]
pub enum PortData {
    Image(ImageBatch),
    Mask(MaskBatch),
    Int(i64),
    Str(String),
    Bool(bool),
    Path(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_type_serializes_by_name() {
        for (port_type, name) in [
            (PortType::Image, "Image"),
            (PortType::Mask, "Mask"),
            (PortType::Path, "Path"),
        ] {
            let json = serde_json::to_string(&port_type).expect("port type should serialize");
            assert_eq!(json, format!("\"{name}\""));
        }
    }
}
