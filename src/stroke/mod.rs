pub mod brush;
pub mod pipeline;
