pub mod builder;
pub mod core;
pub mod reverse;
pub mod stats;

pub use builder::ResolverBuilder;
pub use core::Resolver;
pub use reverse::reverse_name;
