//src/main.rs

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // A árvore organizacional
    let estructura_routes = Router::new()
        .route(
            "/",
            post(handlers::estructuras::create_estructura)
                .get(handlers::estructuras::list_estructuras),
        )
        .route(
            "/{id}",
            get(handlers::estructuras::get_estructura)
                .put(handlers::estructuras::rename_estructura)
                .delete(handlers::estructuras::delete_estructura),
        )
        .route(
            "/{id}/posibles-padres",
            get(handlers::estructuras::list_posibles_padres),
        )
        .route(
            "/{id}/parent",
            put(handlers::estructuras::reparent_estructura),
        );

    // Fila de leads, distribuição e evacuação
    let lead_routes = Router::new()
        .route(
            "/",
            post(handlers::leads::create_lead).get(handlers::leads::list_leads),
        )
        .route("/importar", post(handlers::leads::import_leads))
        .route("/distribuir", post(handlers::leads::distribuir_leads))
        .route("/evacuar", post(handlers::leads::evacuar_leads))
        .route("/{id}/estado", put(handlers::leads::update_estado_lead))
        .route("/lotes/{batch_id}", delete(handlers::leads::delete_batch));

    // Usuários, visibilidade e presença
    let usuario_routes = Router::new()
        .route(
            "/",
            post(handlers::usuarios::create_usuario).get(handlers::usuarios::list_usuarios),
        )
        .route(
            "/{id}/estructura",
            put(handlers::usuarios::update_estructura_usuario),
        )
        .route("/{id}/links", get(handlers::usuarios::get_links))
        .route(
            "/{id}/recalcular-links",
            post(handlers::usuarios::recalcular_links),
        )
        .route("/{id}/heartbeat", post(handlers::usuarios::heartbeat))
        .route("/{id}/desconectar", post(handlers::usuarios::desconectar));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/estructuras", estructura_routes)
        .nest("/api/leads", lead_routes)
        .nest("/api/usuarios", usuario_routes)
        .route("/api/webhooks/leads", post(handlers::leads::webhook_lead))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
