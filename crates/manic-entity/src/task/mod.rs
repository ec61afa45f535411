//! Audio task domain entities.

pub mod function;
pub mod model;
pub mod status;

pub use function::AudioFunction;
pub use model::AudioTask;
pub use status::TaskStatus;
