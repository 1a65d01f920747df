// src/models/estructura.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- ENUMS ---

// Mapeia o CREATE TYPE tipo_estructura do banco.
// Os 8 níveis são fechados e ordenados: o índice de camada (tier) substitui
// o antigo array de ordenação mantido à mão.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tipo_estructura", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoEstructura {
    Empresa,
    Paises,
    Division,
    Organizaciones,
    Filiales,
    Filial,
    Jefaturas,
    SubOrganizacion,
}

impl TipoEstructura {
    /// Índice de camada: Empresa = 0 ... SubOrganizacion = 7.
    /// Um nó só pode pendurar-se de um pai com camada estritamente menor.
    pub const fn tier(&self) -> u8 {
        match self {
            Self::Empresa => 0,
            Self::Paises => 1,
            Self::Division => 2,
            Self::Organizaciones => 3,
            Self::Filiales => 4,
            Self::Filial => 5,
            Self::Jefaturas => 6,
            Self::SubOrganizacion => 7,
        }
    }
}

// --- A ESTRUTURA (nó da árvore organizacional) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Estructura {
    pub id: i64,
    pub tipo: TipoEstructura,

    pub nombre: String,
    // Nome de exibição opcional, sobrepõe o nombre nas telas
    pub nombre_personalizado: Option<String>,

    pub parent_id: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Estructura {
    pub fn nombre_visible(&self) -> &str {
        self.nombre_personalizado.as_deref().unwrap_or(&self.nombre)
    }
}

// --- ESTATÍSTICAS DA HIERARQUIA ---

// Contagens descritivas de um nó, derivadas da árvore em memória
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JerarquiaStats {
    /// Profundidade do nó (raiz = 0)
    pub nivel: usize,
    pub ancestros: usize,
    pub descendientes: usize,
    /// Tamanho do fecho herdado (ancestrais + descendentes + o próprio nó)
    pub total_enlaces: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_sao_estritamente_crescentes_na_ordem_declarada() {
        let ordem = [
            TipoEstructura::Empresa,
            TipoEstructura::Paises,
            TipoEstructura::Division,
            TipoEstructura::Organizaciones,
            TipoEstructura::Filiales,
            TipoEstructura::Filial,
            TipoEstructura::Jefaturas,
            TipoEstructura::SubOrganizacion,
        ];

        for par in ordem.windows(2) {
            assert!(par[0].tier() < par[1].tier());
        }
        assert_eq!(TipoEstructura::Empresa.tier(), 0);
        assert_eq!(TipoEstructura::SubOrganizacion.tier(), 7);
    }
}
