use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Regra da casa: validações rejeitam ANTES de qualquer escrita no banco;
// no-ops lógicos (nada a distribuir, nada a evacuar) NÃO passam por aqui,
// eles são relatórios informativos, não erros.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Reparent/criação com aresta inválida (camada ou ciclo)
    #[error("Vínculo de estrutura inválido: {0}")]
    EnlaceInvalido(String),

    // Escopo de evacuação incompleto ou com tipo errado
    #[error("Escopo inválido: {0}")]
    AlcanceInvalido(String),

    #[error("Estrutura {0} não encontrada")]
    EstructuraNotFound(i64),

    #[error("Usuário {0} não encontrado")]
    UsuarioNotFound(Uuid),

    #[error("Lead {0} não encontrado")]
    LeadNotFound(i64),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    // Importação em lote: o chunk que falhou interrompe os restantes.
    // Os chunks anteriores permanecem gravados (sem rollback retroativo).
    #[error("Importação interrompida no chunk {chunk}: {insertados} leads já gravados")]
    ImportacionInterrumpida {
        chunk: usize,
        insertados: u64,
        #[source]
        causa: sqlx::Error,
    },

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::EnlaceInvalido(motivo) => {
                let body = Json(json!({ "error": motivo }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::AlcanceInvalido(motivo) => {
                let body = Json(json!({ "error": motivo }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::EstructuraNotFound(_) => {
                (StatusCode::NOT_FOUND, "Estrutura não encontrada.")
            }
            AppError::UsuarioNotFound(_) => (StatusCode::NOT_FOUND, "Usuário não encontrado."),
            AppError::LeadNotFound(_) => (StatusCode::NOT_FOUND, "Lead não encontrado."),

            AppError::UniqueConstraintViolation(detalhe) => {
                let body = Json(json!({ "error": detalhe }));
                return (StatusCode::CONFLICT, body).into_response();
            }

            AppError::ImportacionInterrumpida {
                chunk,
                insertados,
                ref causa,
            } => {
                tracing::error!("Importação falhou no chunk {}: {}", chunk, causa);
                let body = Json(json!({
                    "error": "A importação foi interrompida por falha em um chunk.",
                    "chunkComFalha": chunk,
                    "leadsGravados": insertados,
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
