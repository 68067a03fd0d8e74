pub mod lsp_position;
pub mod position;
mod text;

// Re-export main types
pub use lsp_position::{
    lsp_position_to_offset, offset_range_to_lsp, offset_to_lsp_position, range_to_lsp,
    span_to_lsp_range,
};
pub use position::{
    Position, Range, Span, byte_to_utf16_column, clamp_offset, offset_range, offset_to_point,
    offset_to_position, point_to_offset, position_to_offset, span_to_range, utf16_to_byte_column,
};
pub use text::{Document, compute_line_starts};
