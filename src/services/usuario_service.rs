// src/services/usuario_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EstructuraRepository, UsuarioRepository},
    models::usuario::{Cargo, Usuario, UsuarioEstructuraLink},
    services::hierarchy::{Jerarquia, visibilidad_para},
};

#[derive(Clone)]
pub struct UsuarioService {
    usuario_repo: UsuarioRepository,
    estructura_repo: EstructuraRepository,
    pool: PgPool,
}

impl UsuarioService {
    pub fn new(
        usuario_repo: UsuarioRepository,
        estructura_repo: EstructuraRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            usuario_repo,
            estructura_repo,
            pool,
        }
    }

    /// Cria o usuário e já monta os vínculos derivados iniciais, na mesma
    /// transação: todo usuário nasce com a visibilidade correta.
    pub async fn create(
        &self,
        nombre: &str,
        email: &str,
        cargo: Cargo,
        estructura_id: Option<i64>,
    ) -> Result<Usuario, AppError> {
        let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
        if let Some(estructura_id) = estructura_id {
            if !jerarquia.contiene(estructura_id) {
                return Err(AppError::EstructuraNotFound(estructura_id));
            }
        }

        let mut tx = self.pool.begin().await?;

        let usuario = self
            .usuario_repo
            .insert(&mut *tx, nombre, email, cargo, estructura_id)
            .await?;

        let links = visibilidad_para(&jerarquia, &usuario);
        self.usuario_repo
            .replace_links(&mut *tx, usuario.id, &links)
            .await?;

        tx.commit().await?;

        Ok(usuario)
    }

    /// Move o usuário de estrutura direta e recalcula a visibilidade
    pub async fn update_estructura(
        &self,
        id: Uuid,
        estructura_id: Option<i64>,
    ) -> Result<Usuario, AppError> {
        let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
        if let Some(estructura_id) = estructura_id {
            if !jerarquia.contiene(estructura_id) {
                return Err(AppError::EstructuraNotFound(estructura_id));
            }
        }

        let mut tx = self.pool.begin().await?;

        let usuario = self
            .usuario_repo
            .update_estructura(&mut *tx, id, estructura_id)
            .await?;

        let links = visibilidad_para(&jerarquia, &usuario);
        self.usuario_repo
            .replace_links(&mut *tx, usuario.id, &links)
            .await?;

        tx.commit().await?;

        Ok(usuario)
    }

    /// Recalcula sob demanda os vínculos do usuário. É a rota de recuperação
    /// para qualquer fecho que tenha ficado velho.
    pub async fn recompute_links(
        &self,
        id: Uuid,
    ) -> Result<Vec<UsuarioEstructuraLink>, AppError> {
        let usuario = self
            .usuario_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::UsuarioNotFound(id))?;

        let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
        let links = visibilidad_para(&jerarquia, &usuario);

        self.usuario_repo
            .replace_links(&self.pool, id, &links)
            .await?;

        self.usuario_repo.find_links(&self.pool, id).await
    }

    pub async fn links(&self, id: Uuid) -> Result<Vec<UsuarioEstructuraLink>, AppError> {
        self.usuario_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::UsuarioNotFound(id))?;
        self.usuario_repo.find_links(&self.pool, id).await
    }

    /// Lista usuários; com estrutura, o filtro é o escopo hierárquico
    /// (o nó + descendentes), não só o nó.
    pub async fn list(&self, estructura_id: Option<i64>) -> Result<Vec<Usuario>, AppError> {
        match estructura_id {
            None => self.usuario_repo.find_all(&self.pool).await,
            Some(estructura_id) => {
                let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
                if !jerarquia.contiene(estructura_id) {
                    return Err(AppError::EstructuraNotFound(estructura_id));
                }
                let mut alcance: Vec<i64> =
                    jerarquia.subtree_ids(estructura_id).into_iter().collect();
                alcance.sort_unstable();
                self.usuario_repo
                    .find_por_estructuras(&self.pool, &alcance)
                    .await
            }
        }
    }

    // --- Presença ---

    pub async fn heartbeat(&self, id: Uuid) -> Result<(), AppError> {
        let filas = self.usuario_repo.marcar_heartbeat(&self.pool, id).await?;
        if filas == 0 {
            return Err(AppError::UsuarioNotFound(id));
        }
        Ok(())
    }

    pub async fn desconectar(&self, id: Uuid) -> Result<(), AppError> {
        let filas = self
            .usuario_repo
            .marcar_desconectado(&self.pool, id)
            .await?;
        if filas == 0 {
            return Err(AppError::UsuarioNotFound(id));
        }
        Ok(())
    }
}
