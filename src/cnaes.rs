//! CNAE catalog: `/v1/integracao/cnaes`

use reqwest::Method;
use tracing::info;

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{Cnae, CnaeInput, CnaeUpdate};

const PATH: &str = "/v1/integracao/cnaes";

pub async fn fetch_cnaes(client: &ApiClient) -> Result<Vec<Cnae>> {
    client.get_json(PATH).await
}

pub async fn fetch_cnae_by_id(client: &ApiClient, id: i64) -> Result<Cnae> {
    client.get_json(&format!("{PATH}/{id}")).await
}

pub async fn create_cnae(client: &ApiClient, input: &CnaeInput) -> Result<Cnae> {
    let created: Cnae = client.send_json(Method::POST, PATH, input).await?;
    info!(id = created.id, codigo = %created.codigo, "CNAE created");
    Ok(created)
}

pub async fn update_cnae(client: &ApiClient, id: i64, update: &CnaeUpdate) -> Result<Cnae> {
    let updated: Cnae = client.send_json(Method::PATCH, &format!("{PATH}/{id}"), update).await?;
    info!(id, "CNAE updated");
    Ok(updated)
}

pub async fn delete_cnae(client: &ApiClient, id: i64) -> Result<()> {
    client.delete(&format!("{PATH}/{id}")).await?;
    info!(id, "CNAE deleted");
    Ok(())
}

/// Case-insensitive search on code or description; an empty term keeps everything
pub fn filter_cnaes<'a>(cnaes: &'a [Cnae], term: &str) -> Vec<&'a Cnae> {
    let term = term.trim().to_lowercase();
    cnaes
        .iter()
        .filter(|c| {
            term.is_empty() || c.codigo.to_lowercase().contains(&term) || c.descricao.to_lowercase().contains(&term)
        })
        .collect()
}
