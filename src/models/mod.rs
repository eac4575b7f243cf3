pub mod audit;
pub mod custom_role;
pub mod decision;
pub mod grant;
pub mod resource;
pub mod user;
