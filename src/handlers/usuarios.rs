// src/handlers/usuarios.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::usuario::{Cargo, Usuario, UsuarioEstructuraLink},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUsuarioPayload {
    #[validate(length(min = 2, message = "O nome deve ter no mínimo 2 caracteres"))]
    #[schema(example = "Carlos Méndez")]
    pub nombre: String,

    #[validate(email(message = "E-mail inválido"))]
    #[schema(example = "carlos@empresa.com")]
    pub email: String,

    pub cargo: Cargo,

    pub estructura_id: Option<i64>,
}

// POST /api/usuarios
#[utoipa::path(
    post,
    path = "/api/usuarios",
    tag = "Usuarios",
    request_body = CreateUsuarioPayload,
    responses(
        (status = 201, description = "Usuário criado com os vínculos derivados montados", body = Usuario),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail já em uso")
    )
)]
pub async fn create_usuario(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateUsuarioPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let usuario = app_state
        .usuario_service
        .create(
            &payload.nombre,
            &payload.email,
            payload.cargo,
            payload.estructura_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(usuario)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListarUsuariosQuery {
    // Com estrutura: o escopo hierárquico (nó + descendentes)
    pub estructura_id: Option<i64>,
}

// GET /api/usuarios
#[utoipa::path(
    get,
    path = "/api/usuarios",
    tag = "Usuarios",
    params(ListarUsuariosQuery),
    responses(
        (status = 200, description = "Usuários (todos, ou do escopo)", body = Vec<Usuario>)
    )
)]
pub async fn list_usuarios(
    State(app_state): State<AppState>,
    Query(query): Query<ListarUsuariosQuery>,
) -> Result<impl IntoResponse, AppError> {
    let usuarios = app_state.usuario_service.list(query.estructura_id).await?;
    Ok((StatusCode::OK, Json(usuarios)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEstructuraPayload {
    // null solta o usuário da estrutura
    pub estructura_id: Option<i64>,
}

// PUT /api/usuarios/{id}/estructura
#[utoipa::path(
    put,
    path = "/api/usuarios/{id}/estructura",
    tag = "Usuarios",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    request_body = UpdateEstructuraPayload,
    responses(
        (status = 200, description = "Usuário movido; visibilidade recalculada", body = Usuario),
        (status = 404, description = "Usuário ou estrutura não encontrados")
    )
)]
pub async fn update_estructura_usuario(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEstructuraPayload>,
) -> Result<impl IntoResponse, AppError> {
    let usuario = app_state
        .usuario_service
        .update_estructura(id, payload.estructura_id)
        .await?;

    Ok((StatusCode::OK, Json(usuario)))
}

// GET /api/usuarios/{id}/links
#[utoipa::path(
    get,
    path = "/api/usuarios/{id}/links",
    tag = "Usuarios",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Vínculos derivados atuais", body = Vec<UsuarioEstructuraLink>),
        (status = 404, description = "Usuário não encontrado")
    )
)]
pub async fn get_links(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let links = app_state.usuario_service.links(id).await?;
    Ok((StatusCode::OK, Json(links)))
}

// POST /api/usuarios/{id}/recalcular-links
// A rota manual de recuperação: refaz o fecho do usuário agora
#[utoipa::path(
    post,
    path = "/api/usuarios/{id}/recalcular-links",
    tag = "Usuarios",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Vínculos recalculados (substituição por inteiro)", body = Vec<UsuarioEstructuraLink>),
        (status = 404, description = "Usuário não encontrado")
    )
)]
pub async fn recalcular_links(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let links = app_state.usuario_service.recompute_links(id).await?;
    Ok((StatusCode::OK, Json(links)))
}

// =============================================================================
//  PRESENÇA (heartbeat)
// =============================================================================

// POST /api/usuarios/{id}/heartbeat
#[utoipa::path(
    post,
    path = "/api/usuarios/{id}/heartbeat",
    tag = "Usuarios",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 204, description = "Presença registrada"),
        (status = 404, description = "Usuário não encontrado")
    )
)]
pub async fn heartbeat(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.usuario_service.heartbeat(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/usuarios/{id}/desconectar
#[utoipa::path(
    post,
    path = "/api/usuarios/{id}/desconectar",
    tag = "Usuarios",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 204, description = "Usuário marcado como offline"),
        (status = 404, description = "Usuário não encontrado")
    )
)]
pub async fn desconectar(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.usuario_service.desconectar(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
