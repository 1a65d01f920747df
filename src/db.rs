pub mod estructura_repo;
pub use estructura_repo::EstructuraRepository;
pub mod usuario_repo;
pub use usuario_repo::UsuarioRepository;
pub mod lead_repo;
pub use lead_repo::LeadRepository;
