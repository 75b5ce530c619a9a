pub mod paths;
pub mod store;

pub use paths::SessionPaths;
pub use store::*;
