// src/db/lead_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::lead::{EstadoLead, Lead},
};

const COLUNAS: &str = "id, nombre, telefono, email, estado, asignado_a, \
                       estructura_id, batch_id, created_at, updated_at";

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        nombre: &str,
        telefono: &str,
        email: Option<&str>,
        estructura_id: Option<i64>,
        batch_id: Option<Uuid>,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(&format!(
            r#"
            INSERT INTO leads (nombre, telefono, email, estructura_id, batch_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUNAS}
            "#
        ))
        .bind(nombre)
        .bind(telefono)
        .bind(email)
        .bind(estructura_id)
        .bind(batch_id)
        .fetch_one(executor)
        .await?;

        Ok(lead)
    }

    /// Insere um chunk da importação em lote de uma vez só, via UNNEST.
    /// E-mail vazio vira NULL no banco (NULLIF), assim os três arrays
    /// ficam com o mesmo tipo e o mesmo comprimento.
    pub async fn insert_chunk<'e, E>(
        &self,
        executor: E,
        nombres: &[String],
        telefonos: &[String],
        emails: &[String],
        estructura_id: Option<i64>,
        batch_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO leads (nombre, telefono, email, estructura_id, batch_id)
            SELECT t.nombre, t.telefono, NULLIF(t.email, ''), $4, $5
            FROM UNNEST($1::text[], $2::text[], $3::text[]) AS t(nombre, telefono, email)
            "#,
        )
        .bind(nombres)
        .bind(telefonos)
        .bind(emails)
        .bind(estructura_id)
        .bind(batch_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// A fila de distribuição: SIN_LLAMAR, sem dono, dentro do escopo.
    /// Ordem estável (created_at, id): o plano de distribuição depende dela.
    pub async fn find_pool<'e, E>(
        &self,
        executor: E,
        estructura_ids: &[i64],
    ) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let leads = sqlx::query_as::<_, Lead>(&format!(
            r#"
            SELECT {COLUNAS}
            FROM leads
            WHERE estado = 'SIN_LLAMAR'
              AND asignado_a IS NULL
              AND estructura_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(estructura_ids)
        .fetch_all(executor)
        .await?;

        Ok(leads)
    }

    /// Atribui os leads ao agente SOMENTE onde asignado_a ainda é NULL.
    /// É a guarda contra dupla atribuição entre rodadas concorrentes:
    /// lemos a fila sem lock, então a condição precisa estar na escrita.
    pub async fn assign_si_libre<'e, E>(
        &self,
        executor: E,
        lead_ids: &[i64],
        usuario_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET asignado_a = $2, updated_at = NOW()
            WHERE id = ANY($1)
              AND asignado_a IS NULL
            "#,
        )
        .bind(lead_ids)
        .bind(usuario_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Evacuação: limpa a atribuição dos leads SIN_LLAMAR/RECHAZADO dos
    /// agentes dados (ou de todos, se `agentes = None`). O estado fica
    /// intocado. Devolve os estados anteriores para o relatório por status.
    pub async fn clear_assignments<'e, E>(
        &self,
        executor: E,
        agentes: Option<&[Uuid]>,
    ) -> Result<Vec<EstadoLead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let estados = sqlx::query_scalar::<_, EstadoLead>(
            r#"
            UPDATE leads
            SET asignado_a = NULL, updated_at = NOW()
            WHERE estado IN ('SIN_LLAMAR', 'RECHAZADO')
              AND asignado_a IS NOT NULL
              AND ($1::uuid[] IS NULL OR asignado_a = ANY($1))
            RETURNING estado
            "#,
        )
        .bind(agentes)
        .fetch_all(executor)
        .await?;

        Ok(estados)
    }

    pub async fn update_estado<'e, E>(
        &self,
        executor: E,
        id: i64,
        estado: EstadoLead,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(&format!(
            r#"
            UPDATE leads
            SET estado = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUNAS}
            "#
        ))
        .bind(id)
        .bind(estado)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::LeadNotFound(id))?;

        Ok(lead)
    }

    /// O único hard-delete de leads do sistema: remoção do lote inteiro.
    pub async fn delete_batch<'e, E>(&self, executor: E, batch_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM leads WHERE batch_id = $1")
            .bind(batch_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_por_estructuras<'e, E>(
        &self,
        executor: E,
        estructura_ids: &[i64],
    ) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let leads = sqlx::query_as::<_, Lead>(&format!(
            r#"
            SELECT {COLUNAS}
            FROM leads
            WHERE estructura_id = ANY($1)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(estructura_ids)
        .fetch_all(executor)
        .await?;

        Ok(leads)
    }
}
