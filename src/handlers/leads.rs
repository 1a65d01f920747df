// src/handlers/leads.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::lead::{EstadoLead, Lead},
    services::distribution_service::{ReporteDistribucion, ReporteEvacuacion},
    services::lead_service::{NuevoLead, ReporteEliminacionLote, ReporteImportacion},
};

// =============================================================================
//  ÁREA 1: ENTRADA DE LEADS (manual, webhook, importação)
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "María López")]
    pub nombre: String,

    #[validate(length(min = 5, message = "O telefone deve ter no mínimo 5 caracteres"))]
    #[schema(example = "+54 9 11 5555-0101")]
    pub telefono: String,

    #[validate(email(message = "E-mail inválido"))]
    pub email: Option<String>,

    pub estructura_id: Option<i64>,
}

impl CreateLeadPayload {
    fn como_nuevo(&self) -> NuevoLead {
        NuevoLead {
            nombre: self.nombre.clone(),
            telefono: self.telefono.clone(),
            email: self.email.clone(),
        }
    }
}

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = CreateLeadPayload,
    responses(
        (status = 201, description = "Lead criado na fila (SIN_LLAMAR, sem dono)", body = Lead),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lead = app_state
        .lead_service
        .create(&payload.como_nuevo(), payload.estructura_id)
        .await?;

    Ok((StatusCode::CREATED, Json(lead)))
}

// POST /api/webhooks/leads
// A mesma entrada do create manual; fontes externas postam aqui
#[utoipa::path(
    post,
    path = "/api/webhooks/leads",
    tag = "Leads",
    request_body = CreateLeadPayload,
    responses(
        (status = 201, description = "Lead recebido do webhook", body = Lead),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn webhook_lead(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lead = app_state
        .lead_service
        .create(&payload.como_nuevo(), payload.estructura_id)
        .await?;

    Ok((StatusCode::CREATED, Json(lead)))
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NuevoLeadPayload {
    #[validate(length(min = 1, message = "required"))]
    pub nombre: String,

    #[validate(length(min = 5, message = "O telefone deve ter no mínimo 5 caracteres"))]
    pub telefono: String,

    #[validate(email(message = "E-mail inválido"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportLeadsPayload {
    pub estructura_id: Option<i64>,

    // O CSV já chega parseado: aqui só entram as linhas
    #[validate(
        length(min = 1, message = "A importação precisa de ao menos uma linha"),
        nested
    )]
    pub leads: Vec<NuevoLeadPayload>,
}

// POST /api/leads/importar
#[utoipa::path(
    post,
    path = "/api/leads/importar",
    tag = "Leads",
    request_body = ImportLeadsPayload,
    responses(
        (status = 201, description = "Lote importado (chunk a chunk)", body = ReporteImportacion),
        (status = 400, description = "Dados inválidos"),
        (status = 500, description = "Importação interrompida em um chunk")
    )
)]
pub async fn import_leads(
    State(app_state): State<AppState>,
    Json(payload): Json<ImportLeadsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let filas: Vec<NuevoLead> = payload
        .leads
        .iter()
        .map(|l| NuevoLead {
            nombre: l.nombre.clone(),
            telefono: l.telefono.clone(),
            email: l.email.clone(),
        })
        .collect();

    let reporte = app_state
        .lead_service
        .import(&filas, payload.estructura_id)
        .await?;

    Ok((StatusCode::CREATED, Json(reporte)))
}

// =============================================================================
//  ÁREA 2: DISTRIBUIÇÃO E EVACUAÇÃO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistribuirPayload {
    // A raiz do escopo: ela + todos os descendentes
    pub estructura_id: i64,

    #[validate(range(min = 1, max = 100, message = "O teto por agente deve ficar entre 1 e 100"))]
    pub max_por_agente: Option<u32>,

    // Opt-in explícito: sem agente no escopo, vale qualquer agente online
    pub fallback_global: Option<bool>,
}

// POST /api/leads/distribuir
#[utoipa::path(
    post,
    path = "/api/leads/distribuir",
    tag = "Leads",
    request_body = DistribuirPayload,
    responses(
        (status = 200, description = "Relatório da rodada (inclui os no-ops SIN_AGENTES/SIN_LEADS)", body = ReporteDistribucion),
        (status = 404, description = "Estrutura não encontrada")
    )
)]
pub async fn distribuir_leads(
    State(app_state): State<AppState>,
    Json(payload): Json<DistribuirPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let reporte = app_state
        .distribution_service
        .distribute(
            payload.estructura_id,
            payload.max_por_agente.map(|m| m as usize),
            payload.fallback_global,
        )
        .await?;

    Ok((StatusCode::OK, Json(reporte)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvacuarPayload {
    // Empresa E país juntos, ou nenhum dos dois (varredura global)
    pub empresa_id: Option<i64>,
    pub pais_id: Option<i64>,
}

// POST /api/leads/evacuar
#[utoipa::path(
    post,
    path = "/api/leads/evacuar",
    tag = "Leads",
    request_body = EvacuarPayload,
    responses(
        (status = 200, description = "Leads devolvidos à fila, contados por estado anterior", body = ReporteEvacuacion),
        (status = 400, description = "Escopo incompleto ou com tipo errado"),
        (status = 404, description = "Estrutura do escopo não encontrada")
    )
)]
pub async fn evacuar_leads(
    State(app_state): State<AppState>,
    Json(payload): Json<EvacuarPayload>,
) -> Result<impl IntoResponse, AppError> {
    let reporte = app_state
        .distribution_service
        .evacuate(payload.empresa_id, payload.pais_id)
        .await?;

    Ok((StatusCode::OK, Json(reporte)))
}

// =============================================================================
//  ÁREA 3: CICLO DE VIDA
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEstadoPayload {
    pub estado: EstadoLead,
}

// PUT /api/leads/{id}/estado
#[utoipa::path(
    put,
    path = "/api/leads/{id}/estado",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do lead")),
    request_body = UpdateEstadoPayload,
    responses(
        (status = 200, description = "Estado atualizado", body = Lead),
        (status = 404, description = "Lead não encontrado")
    )
)]
pub async fn update_estado_lead(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEstadoPayload>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state
        .lead_service
        .update_estado(id, payload.estado)
        .await?;

    Ok((StatusCode::OK, Json(lead)))
}

// DELETE /api/leads/lotes/{batch_id}
#[utoipa::path(
    delete,
    path = "/api/leads/lotes/{batch_id}",
    tag = "Leads",
    params(("batch_id" = Uuid, Path, description = "ID do lote de importação")),
    responses(
        (status = 200, description = "Lote removido", body = ReporteEliminacionLote)
    )
)]
pub async fn delete_batch(
    State(app_state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let reporte = app_state.lead_service.delete_batch(batch_id).await?;
    Ok((StatusCode::OK, Json(reporte)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListarLeadsQuery {
    // Raiz do escopo hierárquico
    pub estructura_id: i64,
}

// GET /api/leads?estructuraId=...
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    params(ListarLeadsQuery),
    responses(
        (status = 200, description = "Leads do escopo (nó + descendentes)", body = Vec<Lead>),
        (status = 404, description = "Estrutura não encontrada")
    )
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    Query(query): Query<ListarLeadsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let leads = app_state
        .lead_service
        .list_por_alcance(query.estructura_id)
        .await?;

    Ok((StatusCode::OK, Json(leads)))
}
