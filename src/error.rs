//! Error types shared by the services, forms, geometry ingestion and report export.

use thiserror::Error;

use crate::geometry::GeometryError;
use crate::kmz::KmzError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Transport failure (connection refused, timeout, undecodable body)
    #[error("Erro ao comunicar com a API: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer from the SIGUM API, message already extracted
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Form rejected before any request was sent
    #[error("{0}")]
    Validation(String),

    #[error("Sessão não encontrada ou expirada. Faça login novamente.")]
    Unauthenticated,

    #[error("Acesso restrito a administradores.")]
    Forbidden,

    #[error("Erro ao processar o arquivo: {0}")]
    Kmz(#[from] KmzError),

    #[error("Coordenadas inválidas: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Erro ao gerar o relatório: {0}")]
    Report(String),

    #[error("Configuração inválida: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// HTTP status for API errors, `None` for everything else
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
