pub mod factory;
pub mod group;
pub mod manager;

pub use factory::*;
pub use group::*;
pub use manager::*;
