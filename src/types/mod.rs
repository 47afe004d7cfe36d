pub mod bundle;
pub mod deployment;

pub use bundle::*;
pub use deployment::*;
