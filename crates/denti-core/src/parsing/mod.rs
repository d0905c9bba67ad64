pub mod doctor;
pub mod identity;
pub mod roles;
pub mod values;
