// src/handlers/estructuras.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::estructura::{Estructura, TipoEstructura},
    services::estructura_service::{EstructuraDetalle, ReporteEliminacion},
};

// =============================================================================
//  ÁREA 1: CRIAÇÃO E CONSULTA
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEstructuraPayload {
    pub tipo: TipoEstructura,

    #[validate(length(min = 2, message = "O nome deve ter no mínimo 2 caracteres"))]
    #[schema(example = "División Cono Sur")]
    pub nombre: String,

    #[schema(example = "Cono Sur")]
    pub nombre_personalizado: Option<String>,

    pub parent_id: Option<i64>,
}

// POST /api/estructuras
#[utoipa::path(
    post,
    path = "/api/estructuras",
    tag = "Estructuras",
    request_body = CreateEstructuraPayload,
    responses(
        (status = 201, description = "Estrutura criada", body = Estructura),
        (status = 400, description = "Dados inválidos ou vínculo de pai inválido")
    )
)]
pub async fn create_estructura(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateEstructuraPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let estructura = app_state
        .estructura_service
        .create(
            payload.tipo,
            &payload.nombre,
            payload.nombre_personalizado.as_deref(),
            payload.parent_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(estructura)))
}

// GET /api/estructuras
#[utoipa::path(
    get,
    path = "/api/estructuras",
    tag = "Estructuras",
    responses(
        (status = 200, description = "A árvore organizacional completa", body = Vec<Estructura>)
    )
)]
pub async fn list_estructuras(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let estructuras = app_state.estructura_service.list().await?;
    Ok((StatusCode::OK, Json(estructuras)))
}

// GET /api/estructuras/{id}
#[utoipa::path(
    get,
    path = "/api/estructuras/{id}",
    tag = "Estructuras",
    params(("id" = i64, Path, description = "ID da estrutura")),
    responses(
        (status = 200, description = "Estrutura com as contagens da hierarquia", body = EstructuraDetalle),
        (status = 404, description = "Estrutura não encontrada")
    )
)]
pub async fn get_estructura(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let detalle = app_state.estructura_service.get_detalle(id).await?;
    Ok((StatusCode::OK, Json(detalle)))
}

// GET /api/estructuras/{id}/posibles-padres
#[utoipa::path(
    get,
    path = "/api/estructuras/{id}/posibles-padres",
    tag = "Estructuras",
    params(("id" = i64, Path, description = "ID da estrutura")),
    responses(
        (status = 200, description = "Candidatos válidos a novo pai", body = Vec<Estructura>),
        (status = 404, description = "Estrutura não encontrada")
    )
)]
pub async fn list_posibles_padres(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let padres = app_state.estructura_service.possible_parents(id).await?;
    Ok((StatusCode::OK, Json(padres)))
}

// =============================================================================
//  ÁREA 2: MUTAÇÕES (rename, reparent, delete)
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenameEstructuraPayload {
    #[validate(length(min = 2, message = "O nome deve ter no mínimo 2 caracteres"))]
    pub nombre: Option<String>,

    // Ausente/null limpa o nome de exibição
    pub nombre_personalizado: Option<String>,
}

// PUT /api/estructuras/{id}
#[utoipa::path(
    put,
    path = "/api/estructuras/{id}",
    tag = "Estructuras",
    params(("id" = i64, Path, description = "ID da estrutura")),
    request_body = RenameEstructuraPayload,
    responses(
        (status = 200, description = "Estrutura atualizada", body = Estructura),
        (status = 404, description = "Estrutura não encontrada")
    )
)]
pub async fn rename_estructura(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<RenameEstructuraPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let estructura = app_state
        .estructura_service
        .rename(
            id,
            payload.nombre.as_deref(),
            payload.nombre_personalizado.as_deref(),
        )
        .await?;

    Ok((StatusCode::OK, Json(estructura)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReparentPayload {
    // null = vira raiz
    pub parent_id: Option<i64>,
}

// PUT /api/estructuras/{id}/parent
#[utoipa::path(
    put,
    path = "/api/estructuras/{id}/parent",
    tag = "Estructuras",
    params(("id" = i64, Path, description = "ID da estrutura")),
    request_body = ReparentPayload,
    responses(
        (status = 200, description = "Estrutura movida; fechos afetados recalculados", body = Estructura),
        (status = 400, description = "Aresta inválida (camada ou ciclo)"),
        (status = 404, description = "Estrutura não encontrada")
    )
)]
pub async fn reparent_estructura(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ReparentPayload>,
) -> Result<impl IntoResponse, AppError> {
    let estructura = app_state
        .estructura_service
        .reparent(id, payload.parent_id)
        .await?;

    Ok((StatusCode::OK, Json(estructura)))
}

// DELETE /api/estructuras/{id}
#[utoipa::path(
    delete,
    path = "/api/estructuras/{id}",
    tag = "Estructuras",
    params(("id" = i64, Path, description = "ID da estrutura")),
    responses(
        (status = 200, description = "Estrutura removida com cascata", body = ReporteEliminacion),
        (status = 404, description = "Estrutura não encontrada")
    )
)]
pub async fn delete_estructura(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let reporte = app_state.estructura_service.delete(id).await?;
    Ok((StatusCode::OK, Json(reporte)))
}
