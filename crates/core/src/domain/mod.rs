pub mod inputs;
pub mod product;
