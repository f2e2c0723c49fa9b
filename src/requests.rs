//! Prior-viability requests (consultas prévias): read-only listing and detail.

use std::str::FromStr;

use tracing::warn;

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::models::{ConsultaPreviaDetalhe, ConsultaPreviaResumo};

const PATH: &str = "/v1/integracao/consultas-previas";

pub const DEFERIDO: &str = "DEFERIDO";
pub const INDEFERIDO: &str = "INDEFERIDO";

pub async fn fetch_consultas_previas_resumo(client: &ApiClient) -> Result<Vec<ConsultaPreviaResumo>> {
    client.get_json(&format!("{PATH}/resumo")).await.map_err(|e| {
        warn!(error = %e, "request summary load failed");
        match e {
            Error::Api { status, .. } => Error::Api {
                status,
                message: "Não foi possível carregar o resumo das consultas.".to_string(),
            },
            other => other,
        }
    })
}

pub async fn fetch_consulta_previa_by_id(client: &ApiClient, id: i64) -> Result<ConsultaPreviaDetalhe> {
    client.get_json(&format!("{PATH}/{id}")).await
}

/// Dashboard status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Todas,
    Deferido,
    Indeferido,
}

impl StatusFilter {
    fn matches(&self, situacao: &str) -> bool {
        match self {
            StatusFilter::Todas => true,
            StatusFilter::Deferido => situacao == DEFERIDO,
            StatusFilter::Indeferido => situacao == INDEFERIDO,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TODAS" | "ALL" => Ok(StatusFilter::Todas),
            DEFERIDO => Ok(StatusFilter::Deferido),
            INDEFERIDO => Ok(StatusFilter::Indeferido),
            other => Err(format!("situação desconhecida: {other} (use TODAS, DEFERIDO ou INDEFERIDO)")),
        }
    }
}

/// Status filter plus case-insensitive search on protocol, applicant and address
pub fn filter_summaries<'a>(
    list: &'a [ConsultaPreviaResumo],
    status: StatusFilter,
    term: &str,
) -> Vec<&'a ConsultaPreviaResumo> {
    let term = term.trim().to_lowercase();
    list.iter()
        .filter(|c| status.matches(&c.situacao))
        .filter(|c| {
            term.is_empty()
                || c.co_protocolo_redesim.to_lowercase().contains(&term)
                || c.nome_solicitante.to_lowercase().contains(&term)
                || c.endereco.to_lowercase().contains(&term)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub total: usize,
    pub deferidas: usize,
    pub indeferidas: usize,
}

pub fn stats(list: &[ConsultaPreviaResumo]) -> Stats {
    Stats {
        total: list.len(),
        deferidas: list.iter().filter(|c| c.situacao == DEFERIDO).count(),
        indeferidas: list.iter().filter(|c| c.situacao == INDEFERIDO).count(),
    }
}

/// Principal CNAE and the comma-joined secondary ones
pub fn activity_split(detail: &ConsultaPreviaDetalhe) -> (Option<String>, String) {
    let principal = detail
        .atividades
        .iter()
        .find(|a| a.is_atividade_principal)
        .map(|a| a.co_cnae.clone());
    let secondary: Vec<&str> = detail
        .atividades
        .iter()
        .filter(|a| !a.is_atividade_principal)
        .map(|a| a.co_cnae.as_str())
        .collect();
    let secondary = if secondary.is_empty() {
        "Não possui".to_string()
    } else {
        secondary.join(", ")
    };
    (principal, secondary)
}
