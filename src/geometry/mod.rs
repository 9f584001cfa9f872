pub mod mask;
pub mod path;
