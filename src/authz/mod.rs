pub mod hierarchy;
pub mod resolver;
