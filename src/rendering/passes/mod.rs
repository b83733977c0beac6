pub mod pass;
pub mod splat_pass;
