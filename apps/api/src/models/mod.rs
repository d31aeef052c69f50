pub mod campaign;
pub mod profile;
