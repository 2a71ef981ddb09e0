pub mod model;

pub use model::ModelHandle;
