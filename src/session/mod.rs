pub mod bootstrap;
pub mod claims;
pub mod refresh;
pub mod store;
