pub mod browse;
pub mod lifecycle;
pub mod model;
pub mod queries;
