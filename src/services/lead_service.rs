// src/services/lead_service.rs

use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EstructuraRepository, LeadRepository},
    models::lead::{EstadoLead, Lead},
    services::hierarchy::Jerarquia,
};

// Um chunk por round-trip: grande o bastante para importações reais,
// pequeno o bastante para o relatório de falha apontar onde parou
pub const TAMANO_CHUNK: usize = 500;

/// Linha de entrada da importação (o CSV já chega parseado do cliente)
#[derive(Debug, Clone)]
pub struct NuevoLead {
    pub nombre: String,
    pub telefono: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReporteImportacion {
    pub batch_id: Uuid,
    pub total: usize,
    pub insertados: u64,
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReporteEliminacionLote {
    pub batch_id: Uuid,
    pub eliminados: u64,
}

#[derive(Clone)]
pub struct LeadService {
    lead_repo: LeadRepository,
    estructura_repo: EstructuraRepository,
    pool: PgPool,
}

impl LeadService {
    pub fn new(
        lead_repo: LeadRepository,
        estructura_repo: EstructuraRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            lead_repo,
            estructura_repo,
            pool,
        }
    }

    async fn validar_estructura(&self, estructura_id: Option<i64>) -> Result<(), AppError> {
        if let Some(estructura_id) = estructura_id {
            let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
            if !jerarquia.contiene(estructura_id) {
                return Err(AppError::EstructuraNotFound(estructura_id));
            }
        }
        Ok(())
    }

    /// Entrada manual (ou via webhook): nasce SIN_LLAMAR e sem dono,
    /// direto na fila de distribuição.
    pub async fn create(
        &self,
        nuevo: &NuevoLead,
        estructura_id: Option<i64>,
    ) -> Result<Lead, AppError> {
        self.validar_estructura(estructura_id).await?;
        self.lead_repo
            .insert(
                &self.pool,
                &nuevo.nombre,
                &nuevo.telefono,
                nuevo.email.as_deref(),
                estructura_id,
                None,
            )
            .await
    }

    /// Importação em lote, chunk a chunk e em ordem. O chunk que falhar
    /// interrompe os restantes na hora; o que já entrou, ficou. O
    /// relatório de erro diz exatamente onde parou.
    pub async fn import(
        &self,
        filas: &[NuevoLead],
        estructura_id: Option<i64>,
    ) -> Result<ReporteImportacion, AppError> {
        self.validar_estructura(estructura_id).await?;

        let batch_id = Uuid::new_v4();
        let mut insertados = 0u64;
        let mut chunks = 0usize;

        for (i, chunk) in filas.chunks(TAMANO_CHUNK).enumerate() {
            let nombres: Vec<String> = chunk.iter().map(|f| f.nombre.clone()).collect();
            let telefonos: Vec<String> = chunk.iter().map(|f| f.telefono.clone()).collect();
            // E-mail ausente viaja como string vazia e vira NULL no banco
            let emails: Vec<String> = chunk
                .iter()
                .map(|f| f.email.clone().unwrap_or_default())
                .collect();

            match self
                .lead_repo
                .insert_chunk(
                    &self.pool,
                    &nombres,
                    &telefonos,
                    &emails,
                    estructura_id,
                    batch_id,
                )
                .await
            {
                Ok(n) => {
                    insertados += n;
                    chunks += 1;
                }
                Err(AppError::DatabaseError(causa)) => {
                    return Err(AppError::ImportacionInterrumpida {
                        chunk: i,
                        insertados,
                        causa,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Importação {}: {} leads em {} chunks",
            batch_id,
            insertados,
            chunks
        );

        Ok(ReporteImportacion {
            batch_id,
            total: filas.len(),
            insertados,
            chunks,
        })
    }

    /// Transição de estado feita pelo agente (ligou, agendou, rejeitou...)
    pub async fn update_estado(&self, id: i64, estado: EstadoLead) -> Result<Lead, AppError> {
        self.lead_repo.update_estado(&self.pool, id, estado).await
    }

    /// O único hard-delete: remove o lote de importação inteiro
    pub async fn delete_batch(&self, batch_id: Uuid) -> Result<ReporteEliminacionLote, AppError> {
        let eliminados = self.lead_repo.delete_batch(&self.pool, batch_id).await?;
        Ok(ReporteEliminacionLote {
            batch_id,
            eliminados,
        })
    }

    /// Leads do escopo hierárquico (o nó + descendentes)
    pub async fn list_por_alcance(&self, estructura_id: i64) -> Result<Vec<Lead>, AppError> {
        let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
        if !jerarquia.contiene(estructura_id) {
            return Err(AppError::EstructuraNotFound(estructura_id));
        }
        let mut alcance: Vec<i64> = jerarquia.subtree_ids(estructura_id).into_iter().collect();
        alcance.sort_unstable();
        self.lead_repo
            .find_por_estructuras(&self.pool, &alcance)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_particionam_a_importacao_sem_perder_linha() {
        let filas: Vec<NuevoLead> = (0..1234)
            .map(|i| NuevoLead {
                nombre: format!("Lead {i}"),
                telefono: format!("+54911{i:07}"),
                email: None,
            })
            .collect();

        let tamanos: Vec<usize> = filas.chunks(TAMANO_CHUNK).map(|c| c.len()).collect();
        assert_eq!(tamanos, vec![500, 500, 234]);
        assert_eq!(tamanos.iter().sum::<usize>(), filas.len());
    }
}
