use std::fmt;

/// Element type of a host tensor. Images may arrive as f16 and are widened
/// before they reach a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F16,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "f32",
            DType::F16 => "f16",
        };
        f.write_str(name)
    }
}
