mod resource_finder;

pub use resource_finder::{ResourceFile, ResourceFinder, ResourceKind};
