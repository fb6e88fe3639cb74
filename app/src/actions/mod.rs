pub mod password;
pub mod place_order;
pub mod seed_admin;
pub mod token;
