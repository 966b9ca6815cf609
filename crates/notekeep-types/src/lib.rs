pub mod api;
pub mod deadline;
pub mod models;
