pub mod appointments;
pub mod extract;
