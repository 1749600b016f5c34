pub mod defaults;
pub mod routing_config;
pub mod validation;

pub use defaults::*;
pub use routing_config::*;
pub use validation::*;
