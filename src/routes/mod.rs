pub mod audit;
pub mod decisions;
pub mod grants;
pub mod health;
pub mod resources;
pub mod roles;
pub mod users;
