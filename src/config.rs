// src/config.rs

use crate::db::{EstructuraRepository, LeadRepository, UsuarioRepository};
use crate::services::distribution_service::{DistributionService, PoliticaDistribucion};
use crate::services::estructura_service::EstructuraService;
use crate::services::lead_service::LeadService;
use crate::services::usuario_service::UsuarioService;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, time::Duration};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub estructura_service: EstructuraService,
    pub usuario_service: UsuarioService,
    pub lead_service: LeadService,
    pub distribution_service: DistributionService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // Política da distribuição: env com defaults sensatos
        let politica = PoliticaDistribucion {
            max_por_agente: env_ou("MAX_LEADS_POR_AGENTE", 10),
            ventana_minutos: env_ou("VENTANA_EN_LINEA_MINUTOS", 5),
            fallback_global: env_ou("FALLBACK_AGENTES_GLOBAL", false),
        };

        // --- Monta o gráfico de dependências ---
        let estructura_repo = EstructuraRepository::new(db_pool.clone());
        let usuario_repo = UsuarioRepository::new(db_pool.clone());
        let lead_repo = LeadRepository::new(db_pool.clone());

        let estructura_service = EstructuraService::new(
            estructura_repo.clone(),
            usuario_repo.clone(),
            db_pool.clone(),
        );
        let usuario_service = UsuarioService::new(
            usuario_repo.clone(),
            estructura_repo.clone(),
            db_pool.clone(),
        );
        let lead_service =
            LeadService::new(lead_repo.clone(), estructura_repo.clone(), db_pool.clone());
        let distribution_service = DistributionService::new(
            estructura_repo,
            usuario_repo,
            lead_repo,
            db_pool.clone(),
            politica,
        );

        // Retorna Ok com o estado montado
        Ok(Self {
            db_pool,
            estructura_service,
            usuario_service,
            lead_service,
            distribution_service,
        })
    }
}

// Lê a variável de ambiente ou cai no default
fn env_ou<T: std::str::FromStr>(clave: &str, default: T) -> T {
    env::var(clave)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
