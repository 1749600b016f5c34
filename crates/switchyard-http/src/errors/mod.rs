pub mod dispatch;
pub mod routing;

pub use dispatch::*;
pub use routing::*;
