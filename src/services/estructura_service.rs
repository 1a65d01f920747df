// src/services/estructura_service.rs

use std::collections::HashSet;

use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EstructuraRepository, UsuarioRepository},
    models::estructura::{Estructura, JerarquiaStats, TipoEstructura},
    services::hierarchy::{Jerarquia, visibilidad_para},
};

// Detalhe de um nó para as telas de administração
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstructuraDetalle {
    pub estructura: Estructura,
    pub stats: JerarquiaStats,
}

// O que a cascata de delete desfez
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReporteEliminacion {
    pub hijos_desvinculados: u64,
    pub usuarios_desvinculados: usize,
    pub links_purgados: usize,
    pub usuarios_recalculados: usize,
}

#[derive(Clone)]
pub struct EstructuraService {
    estructura_repo: EstructuraRepository,
    usuario_repo: UsuarioRepository,
    pool: PgPool,
}

impl EstructuraService {
    pub fn new(
        estructura_repo: EstructuraRepository,
        usuario_repo: UsuarioRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            estructura_repo,
            usuario_repo,
            pool,
        }
    }

    /// Cria um nó. A aresta proposta é validada ANTES do insert: pai de
    /// camada estritamente menor, ou nenhum pai (nova raiz).
    pub async fn create(
        &self,
        tipo: TipoEstructura,
        nombre: &str,
        nombre_personalizado: Option<&str>,
        parent_id: Option<i64>,
    ) -> Result<Estructura, AppError> {
        if let Some(parent_id) = parent_id {
            let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
            let padre = jerarquia
                .get(parent_id)
                .ok_or(AppError::EstructuraNotFound(parent_id))?;
            if padre.tipo.tier() >= tipo.tier() {
                return Err(AppError::EnlaceInvalido(format!(
                    "Um nó {:?} não pode ficar sob um {:?}: a camada do pai precisa ser menor.",
                    tipo, padre.tipo
                )));
            }
        }

        self.estructura_repo
            .insert(&self.pool, tipo, nombre, nombre_personalizado, parent_id)
            .await
    }

    pub async fn list(&self) -> Result<Vec<Estructura>, AppError> {
        self.estructura_repo.find_all(&self.pool).await
    }

    pub async fn get_detalle(&self, id: i64) -> Result<EstructuraDetalle, AppError> {
        let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
        let estructura = jerarquia
            .get(id)
            .cloned()
            .ok_or(AppError::EstructuraNotFound(id))?;
        let stats = jerarquia.stats(id);
        Ok(EstructuraDetalle { estructura, stats })
    }

    /// Candidatos válidos a novo pai do nó (o que o seletor da UI mostra)
    pub async fn possible_parents(&self, id: i64) -> Result<Vec<Estructura>, AppError> {
        let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
        if !jerarquia.contiene(id) {
            return Err(AppError::EstructuraNotFound(id));
        }
        Ok(jerarquia
            .possible_parents(id)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn rename(
        &self,
        id: i64,
        nombre: Option<&str>,
        nombre_personalizado: Option<&str>,
    ) -> Result<Estructura, AppError> {
        self.estructura_repo
            .rename(&self.pool, id, nombre, nombre_personalizado)
            .await
    }

    /// Reparent validado + recálculo dos fechos afetados, tudo na MESMA
    /// transação: a janela de fecho velho fica do tamanho de um commit.
    pub async fn reparent(
        &self,
        id: i64,
        nuevo_parent_id: Option<i64>,
    ) -> Result<Estructura, AppError> {
        let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
        if !jerarquia.contiene(id) {
            return Err(AppError::EstructuraNotFound(id));
        }
        if let Some(parent_id) = nuevo_parent_id {
            if !jerarquia.contiene(parent_id) {
                return Err(AppError::EstructuraNotFound(parent_id));
            }
        }
        // Pré-condição, nunca rollback: a aresta inválida morre aqui
        if !jerarquia.is_valid_link(id, nuevo_parent_id) {
            return Err(AppError::EnlaceInvalido(format!(
                "A estrutura {} não pode ficar sob {:?}: o pai precisa ter camada menor e não pode ser descendente dela.",
                id, nuevo_parent_id
            )));
        }

        // O fecho ANTES da mudança: quem enxergava o nó pela árvore velha
        let clausura_anterior = jerarquia.inherited_closure(id);

        let mut tx = self.pool.begin().await?;

        let actualizada = self
            .estructura_repo
            .update_parent(&mut *tx, id, nuevo_parent_id)
            .await?;

        // A árvore PÓS-mudança, lida dentro da transação
        let jerarquia_nueva = Jerarquia::new(self.estructura_repo.find_all(&mut *tx).await?);
        let mut afectadas = clausura_anterior;
        afectadas.extend(jerarquia_nueva.inherited_closure(id));

        let extra: HashSet<Uuid> = self
            .usuario_repo
            .find_ids_con_link(&mut *tx, id)
            .await?
            .into_iter()
            .collect();

        let recalculados = self
            .recompute_afectados(&mut tx, &jerarquia_nueva, &afectadas, &extra)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Estrutura {} movida para {:?}; {} usuários recalculados",
            id,
            nuevo_parent_id,
            recalculados
        );

        Ok(actualizada)
    }

    /// Delete com cascata aplicativa: filhos viram raízes, usuários soltam
    /// a estrutura direta, vínculos derivados são expurgados e os fechos
    /// afetados são recalculados, tudo numa transação só.
    pub async fn delete(&self, id: i64) -> Result<ReporteEliminacion, AppError> {
        let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
        let nombre = jerarquia
            .get(id)
            .map(|e| e.nombre_visible().to_string())
            .ok_or(AppError::EstructuraNotFound(id))?;
        let clausura_anterior = jerarquia.inherited_closure(id);

        let mut tx = self.pool.begin().await?;

        let hijos = self
            .estructura_repo
            .clear_parent_of_children(&mut *tx, id)
            .await?;
        let usuarios_sueltos = self.usuario_repo.clear_estructura(&mut *tx, id).await?;
        let con_link = self
            .usuario_repo
            .purge_links_de_estructura(&mut *tx, id)
            .await?;
        self.estructura_repo.delete(&mut *tx, id).await?;

        let jerarquia_nueva = Jerarquia::new(self.estructura_repo.find_all(&mut *tx).await?);

        let mut extra: HashSet<Uuid> = usuarios_sueltos.iter().copied().collect();
        extra.extend(con_link.iter().copied());

        let recalculados = self
            .recompute_afectados(&mut tx, &jerarquia_nueva, &clausura_anterior, &extra)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Estrutura {} ({}) removida: {} filhos soltos, {} usuários desvinculados, {} links purgados",
            id,
            nombre,
            hijos,
            usuarios_sueltos.len(),
            con_link.len()
        );

        Ok(ReporteEliminacion {
            hijos_desvinculados: hijos,
            usuarios_desvinculados: usuarios_sueltos.len(),
            links_purgados: con_link.len(),
            usuarios_recalculados: recalculados,
        })
    }

    /// Recalcula (substituição por inteiro, nunca remendo) os vínculos de:
    /// - usuários multi-estrutura cuja estrutura direta caiu no conjunto
    ///   afetado, e
    /// - qualquer usuário apontado em `extra` (tinha vínculo com o nó
    ///   mexido, ou perdeu a estrutura direta na cascata).
    async fn recompute_afectados(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        jerarquia: &Jerarquia,
        afectadas: &HashSet<i64>,
        extra: &HashSet<Uuid>,
    ) -> Result<usize, AppError> {
        let multi = self.usuario_repo.find_multi_estructura(&mut **tx).await?;

        let mut hechos: HashSet<Uuid> = HashSet::new();
        for usuario in &multi {
            let tocado = extra.contains(&usuario.id)
                || usuario
                    .estructura_id
                    .is_some_and(|e| afectadas.contains(&e));
            if !tocado {
                continue;
            }
            let links = visibilidad_para(jerarquia, usuario);
            self.usuario_repo
                .replace_links(&mut **tx, usuario.id, &links)
                .await?;
            hechos.insert(usuario.id);
        }

        // Os não-multi de `extra` voltam ao vínculo direto simples
        for usuario_id in extra {
            if hechos.contains(usuario_id) {
                continue;
            }
            if let Some(usuario) = self.usuario_repo.find_by_id(&mut **tx, *usuario_id).await? {
                let links = visibilidad_para(jerarquia, &usuario);
                self.usuario_repo
                    .replace_links(&mut **tx, usuario.id, &links)
                    .await?;
                hechos.insert(usuario.id);
            }
        }

        Ok(hechos.len())
    }
}
