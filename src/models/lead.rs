// src/models/lead.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- ENUMS ---

// Mapeia o CREATE TYPE estado_lead do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "estado_lead", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoLead {
    SinLlamar,
    CitaProgramada,
    LlamarDespues,
    Matricula,
    Rechazado,
    NoContesta,
    Seguimiento,
}

// --- O LEAD ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,

    pub nombre: String,
    pub telefono: String,
    pub email: Option<String>,

    pub estado: EstadoLead,

    // Agente responsável. NULL = na fila de distribuição
    pub asignado_a: Option<Uuid>,

    // Estrutura que define o escopo hierárquico do lead
    pub estructura_id: Option<i64>,

    // Agrupa os leads de uma mesma importação em lote
    pub batch_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
