pub mod estructuras;
pub mod leads;
pub mod usuarios;
