// src/models/usuario.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- ENUMS ---

// Mapeia o CREATE TYPE cargo_usuario do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "cargo_usuario", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cargo {
    Ceo,
    DirectorInternacional,
    DirectorZona,
    Gerente,
    JefeVentas,
    Agente,
}

impl Cargo {
    /// Cargos multi-estrutura: a visibilidade deles é o fecho herdado
    /// completo (ancestrais + descendentes) da estrutura direta, não só ela.
    pub const fn es_multi_estructura(&self) -> bool {
        matches!(self, Self::Ceo | Self::DirectorInternacional | Self::DirectorZona)
    }
}

// --- O USUÁRIO ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Usuario {
    pub id: Uuid,
    pub nombre: String,
    pub email: String,
    pub cargo: Cargo,

    // Estrutura à qual o usuário está diretamente atribuído
    pub estructura_id: Option<i64>,

    // Sinal de presença: alimentado pelo heartbeat do cliente.
    // A elegibilidade para distribuição exige en_linea + conexão recente.
    pub en_linea: bool,
    pub ultima_conexion: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- VÍNCULO DERIVADO (visibilidade efetiva) ---

// Uma linha por estrutura visível. Recalculado por inteiro (delete + insert)
// a cada mudança estrutural que afete o usuário.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioEstructuraLink {
    pub usuario_id: Uuid,
    pub estructura_id: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn somente_cargos_de_direcao_sao_multi_estructura() {
        assert!(Cargo::Ceo.es_multi_estructura());
        assert!(Cargo::DirectorInternacional.es_multi_estructura());
        assert!(Cargo::DirectorZona.es_multi_estructura());

        assert!(!Cargo::Gerente.es_multi_estructura());
        assert!(!Cargo::JefeVentas.es_multi_estructura());
        assert!(!Cargo::Agente.es_multi_estructura());
    }
}
