pub mod bounds;
pub mod transforms;
