//! Job script templates and keyword substitution

/// Token maps and the TinyTemplate based renderer
pub mod render;

/// Token maps for the single stack and channel pair alignment scripts
pub mod script;
