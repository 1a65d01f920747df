// src/db/usuario_repo.rs

use sqlx::{Acquire, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::usuario::{Cargo, Usuario, UsuarioEstructuraLink},
};

const COLUNAS: &str = "id, nombre, email, cargo, estructura_id, en_linea, \
                       ultima_conexion, created_at, updated_at";

#[derive(Clone)]
pub struct UsuarioRepository {
    pool: PgPool,
}

impl UsuarioRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        nombre: &str,
        email: &str,
        cargo: Cargo,
        estructura_id: Option<i64>,
    ) -> Result<Usuario, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let usuario = sqlx::query_as::<_, Usuario>(&format!(
            r#"
            INSERT INTO usuarios (nombre, email, cargo, estructura_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLUNAS}
            "#
        ))
        .bind(nombre)
        .bind(email)
        .bind(cargo)
        .bind(estructura_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Tratamento de erro de chave duplicada
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(format!(
                        "O e-mail '{}' já está em uso.",
                        email
                    ));
                }
            }
            e.into()
        })?;

        Ok(usuario)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Usuario>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_usuario =
            sqlx::query_as::<_, Usuario>(&format!("SELECT {COLUNAS} FROM usuarios WHERE id = $1"))
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(maybe_usuario)
    }

    pub async fn find_all<'e, E>(&self, executor: E) -> Result<Vec<Usuario>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let usuarios = sqlx::query_as::<_, Usuario>(&format!(
            "SELECT {COLUNAS} FROM usuarios ORDER BY nombre ASC, id ASC"
        ))
        .fetch_all(executor)
        .await?;

        Ok(usuarios)
    }

    pub async fn find_por_estructuras<'e, E>(
        &self,
        executor: E,
        estructura_ids: &[i64],
    ) -> Result<Vec<Usuario>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let usuarios = sqlx::query_as::<_, Usuario>(&format!(
            r#"
            SELECT {COLUNAS}
            FROM usuarios
            WHERE estructura_id = ANY($1)
            ORDER BY nombre ASC, id ASC
            "#
        ))
        .bind(estructura_ids)
        .fetch_all(executor)
        .await?;

        Ok(usuarios)
    }

    /// Agentes elegíveis para uma rodada de distribuição: cargo AGENTE,
    /// online e com conexão dentro da janela. `estructura_ids = None`
    /// significa sem filtro de escopo (fallback global, opt-in).
    ///
    /// A ordenação é parte do contrato: distribuição reproduzível exige
    /// fila de agentes estável.
    pub async fn find_agentes_en_linea<'e, E>(
        &self,
        executor: E,
        estructura_ids: Option<&[i64]>,
        ventana_minutos: i64,
    ) -> Result<Vec<Usuario>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let usuarios = sqlx::query_as::<_, Usuario>(&format!(
            r#"
            SELECT {COLUNAS}
            FROM usuarios
            WHERE cargo = 'AGENTE'
              AND en_linea = TRUE
              AND ultima_conexion >= NOW() - ($2 * INTERVAL '1 minute')
              AND ($1::bigint[] IS NULL OR estructura_id = ANY($1))
            ORDER BY nombre ASC, id ASC
            "#
        ))
        .bind(estructura_ids)
        .bind(ventana_minutos)
        .fetch_all(executor)
        .await?;

        Ok(usuarios)
    }

    /// Usuários cujos vínculos derivados são o fecho herdado completo
    pub async fn find_multi_estructura<'e, E>(&self, executor: E) -> Result<Vec<Usuario>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let usuarios = sqlx::query_as::<_, Usuario>(&format!(
            r#"
            SELECT {COLUNAS}
            FROM usuarios
            WHERE cargo IN ('CEO', 'DIRECTOR_INTERNACIONAL', 'DIRECTOR_ZONA')
            ORDER BY id ASC
            "#
        ))
        .fetch_all(executor)
        .await?;

        Ok(usuarios)
    }

    pub async fn update_estructura<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        estructura_id: Option<i64>,
    ) -> Result<Usuario, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let usuario = sqlx::query_as::<_, Usuario>(&format!(
            r#"
            UPDATE usuarios
            SET estructura_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUNAS}
            "#
        ))
        .bind(id)
        .bind(estructura_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::UsuarioNotFound(id))?;

        Ok(usuario)
    }

    /// Cascata de delete de estrutura: solta os usuários diretamente
    /// atribuídos e devolve quem foi afetado.
    pub async fn clear_estructura<'e, E>(
        &self,
        executor: E,
        estructura_id: i64,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE usuarios
            SET estructura_id = NULL, updated_at = NOW()
            WHERE estructura_id = $1
            RETURNING id
            "#,
        )
        .bind(estructura_id)
        .fetch_all(executor)
        .await?;

        Ok(ids)
    }

    // --- Presença (heartbeat) ---

    pub async fn marcar_heartbeat<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE usuarios
            SET en_linea = TRUE, ultima_conexion = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn marcar_desconectado<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE usuarios
            SET en_linea = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    //  VÍNCULOS DERIVADOS (visibilidade efetiva)
    // =========================================================================

    pub async fn find_links<'e, E>(
        &self,
        executor: E,
        usuario_id: Uuid,
    ) -> Result<Vec<UsuarioEstructuraLink>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let links = sqlx::query_as::<_, UsuarioEstructuraLink>(
            r#"
            SELECT usuario_id, estructura_id, created_at
            FROM usuario_estructura_links
            WHERE usuario_id = $1
            ORDER BY estructura_id ASC
            "#,
        )
        .bind(usuario_id)
        .fetch_all(executor)
        .await?;

        Ok(links)
    }

    /// Usuários que enxergam a estrutura via vínculo derivado
    pub async fn find_ids_con_link<'e, E>(
        &self,
        executor: E,
        estructura_id: i64,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT usuario_id
            FROM usuario_estructura_links
            WHERE estructura_id = $1
            "#,
        )
        .bind(estructura_id)
        .fetch_all(executor)
        .await?;

        Ok(ids)
    }

    /// Cascata de delete de estrutura: expurga os vínculos que a referenciam
    /// e devolve quem os tinha.
    pub async fn purge_links_de_estructura<'e, E>(
        &self,
        executor: E,
        estructura_id: i64,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            DELETE FROM usuario_estructura_links
            WHERE estructura_id = $1
            RETURNING usuario_id
            "#,
        )
        .bind(estructura_id)
        .fetch_all(executor)
        .await?;

        Ok(ids)
    }

    /// Substitui POR INTEIRO os vínculos do usuário (delete + insert na
    /// mesma transação). Nunca remendamos o fecho aos pedaços: remendo
    /// parcial deixa visibilidade velha para trás.
    pub async fn replace_links<'e, E>(
        &self,
        executor: E,
        usuario_id: Uuid,
        estructura_ids: &[i64],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        sqlx::query("DELETE FROM usuario_estructura_links WHERE usuario_id = $1")
            .bind(usuario_id)
            .execute(&mut *tx)
            .await?;

        if !estructura_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO usuario_estructura_links (usuario_id, estructura_id)
                SELECT $1, unnest($2::bigint[])
                "#,
            )
            .bind(usuario_id)
            .bind(estructura_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
