pub mod estructura;
pub mod lead;
pub mod usuario;
