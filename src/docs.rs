// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Estructuras ---
        handlers::estructuras::create_estructura,
        handlers::estructuras::list_estructuras,
        handlers::estructuras::get_estructura,
        handlers::estructuras::list_posibles_padres,
        handlers::estructuras::rename_estructura,
        handlers::estructuras::reparent_estructura,
        handlers::estructuras::delete_estructura,

        // --- Leads ---
        handlers::leads::create_lead,
        handlers::leads::webhook_lead,
        handlers::leads::import_leads,
        handlers::leads::distribuir_leads,
        handlers::leads::evacuar_leads,
        handlers::leads::update_estado_lead,
        handlers::leads::delete_batch,
        handlers::leads::list_leads,

        // --- Usuarios ---
        handlers::usuarios::create_usuario,
        handlers::usuarios::list_usuarios,
        handlers::usuarios::update_estructura_usuario,
        handlers::usuarios::get_links,
        handlers::usuarios::recalcular_links,
        handlers::usuarios::heartbeat,
        handlers::usuarios::desconectar,
    ),
    components(
        schemas(
            // --- Estructuras ---
            models::estructura::TipoEstructura,
            models::estructura::Estructura,
            models::estructura::JerarquiaStats,
            services::estructura_service::EstructuraDetalle,
            services::estructura_service::ReporteEliminacion,
            handlers::estructuras::CreateEstructuraPayload,
            handlers::estructuras::RenameEstructuraPayload,
            handlers::estructuras::ReparentPayload,

            // --- Leads ---
            models::lead::EstadoLead,
            models::lead::Lead,
            services::distribution_service::ResultadoDistribucion,
            services::distribution_service::AsignacionPorAgente,
            services::distribution_service::ReporteDistribucion,
            services::distribution_service::ReporteEvacuacion,
            services::lead_service::ReporteImportacion,
            services::lead_service::ReporteEliminacionLote,
            handlers::leads::CreateLeadPayload,
            handlers::leads::NuevoLeadPayload,
            handlers::leads::ImportLeadsPayload,
            handlers::leads::DistribuirPayload,
            handlers::leads::EvacuarPayload,
            handlers::leads::UpdateEstadoPayload,

            // --- Usuarios ---
            models::usuario::Cargo,
            models::usuario::Usuario,
            models::usuario::UsuarioEstructuraLink,
            handlers::usuarios::CreateUsuarioPayload,
            handlers::usuarios::UpdateEstructuraPayload,
        )
    ),
    tags(
        (name = "Estructuras", description = "A árvore organizacional (hierarquia e cascatas)"),
        (name = "Leads", description = "Fila de leads, distribuição justa e evacuação"),
        (name = "Usuarios", description = "Usuários, visibilidade derivada e presença")
    )
)]
pub struct ApiDoc;
