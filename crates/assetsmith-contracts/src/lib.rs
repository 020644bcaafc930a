pub mod analysis;
pub mod assets;
pub mod events;
pub mod models;
pub mod session;
pub mod studio;
