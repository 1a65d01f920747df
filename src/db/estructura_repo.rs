// src/db/estructura_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::estructura::{Estructura, TipoEstructura},
};

#[derive(Clone)]
pub struct EstructuraRepository {
    pool: PgPool,
}

impl EstructuraRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Busca a árvore inteira. O motor de hierarquia monta o índice em
    /// memória a partir daqui. É UM fetch por requisição, nunca um
    /// round-trip por nível.
    pub async fn find_all<'e, E>(&self, executor: E) -> Result<Vec<Estructura>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let estructuras = sqlx::query_as::<_, Estructura>(
            r#"
            SELECT id, tipo, nombre, nombre_personalizado, parent_id,
                   created_at, updated_at
            FROM estructuras
            ORDER BY id ASC
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(estructuras)
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        tipo: TipoEstructura,
        nombre: &str,
        nombre_personalizado: Option<&str>,
        parent_id: Option<i64>,
    ) -> Result<Estructura, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let estructura = sqlx::query_as::<_, Estructura>(
            r#"
            INSERT INTO estructuras (tipo, nombre, nombre_personalizado, parent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, tipo, nombre, nombre_personalizado, parent_id,
                      created_at, updated_at
            "#,
        )
        .bind(tipo)
        .bind(nombre)
        .bind(nombre_personalizado)
        .bind(parent_id)
        .fetch_one(executor)
        .await?;

        Ok(estructura)
    }

    /// Atualiza nomes. O nombre só muda se vier preenchido; o
    /// nombre_personalizado é substituído pelo valor recebido (NULL limpa).
    pub async fn rename<'e, E>(
        &self,
        executor: E,
        id: i64,
        nombre: Option<&str>,
        nombre_personalizado: Option<&str>,
    ) -> Result<Estructura, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let estructura = sqlx::query_as::<_, Estructura>(
            r#"
            UPDATE estructuras
            SET nombre = COALESCE($2, nombre),
                nombre_personalizado = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, tipo, nombre, nombre_personalizado, parent_id,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(nombre)
        .bind(nombre_personalizado)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::EstructuraNotFound(id))?;

        Ok(estructura)
    }

    /// Grava a nova aresta pai. A validação de camada/ciclo acontece ANTES,
    /// no serviço; aqui é só a escrita.
    pub async fn update_parent<'e, E>(
        &self,
        executor: E,
        id: i64,
        parent_id: Option<i64>,
    ) -> Result<Estructura, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let estructura = sqlx::query_as::<_, Estructura>(
            r#"
            UPDATE estructuras
            SET parent_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, tipo, nombre, nombre_personalizado, parent_id,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(parent_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::EstructuraNotFound(id))?;

        Ok(estructura)
    }

    /// Cascata de delete, passo 1: os filhos viram raízes.
    pub async fn clear_parent_of_children<'e, E>(
        &self,
        executor: E,
        id: i64,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE estructuras
            SET parent_id = NULL, updated_at = NOW()
            WHERE parent_id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM estructuras WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
