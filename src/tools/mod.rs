//! Tool normalization: validation of tool descriptors and default-argument handling.

pub mod normalize;

pub use normalize::{
    normalize_tool, normalize_tools, NormalizedFunctionTool, NormalizedTool,
    KNOWN_PLATFORM_TOOLS,
};
