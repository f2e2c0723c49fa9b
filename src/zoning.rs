//! Zoning areas: `/v1/integracao/zoneamentos`

use reqwest::Method;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::cnaes::fetch_cnaes;
use crate::error::{Error, Result};
use crate::models::{Cnae, Zoneamento, ZoneamentoInput};

const PATH: &str = "/v1/integracao/zoneamentos";
const EDIT_LOAD_FAILED: &str = "Falha ao carregar os dados da zona ou a lista de CNAEs.";

pub async fn fetch_zoneamentos(client: &ApiClient) -> Result<Vec<Zoneamento>> {
    client.get_json(PATH).await
}

pub async fn fetch_zoneamento_by_id(client: &ApiClient, id: i64) -> Result<Zoneamento> {
    client.get_json(&format!("{PATH}/{id}")).await
}

pub async fn create_zoneamento(client: &ApiClient, input: &ZoneamentoInput) -> Result<Zoneamento> {
    let created: Zoneamento = client.send_json(Method::POST, PATH, input).await?;
    info!(id = created.id, nome = %created.nome, "zone created");
    Ok(created)
}

pub async fn update_zoneamento(client: &ApiClient, id: i64, input: &ZoneamentoInput) -> Result<Zoneamento> {
    let updated: Zoneamento = client.send_json(Method::PATCH, &format!("{PATH}/{id}"), input).await?;
    info!(id, cnaes = input.cnaes_permitidos_ids.len(), "zone updated");
    Ok(updated)
}

pub async fn delete_zoneamento(client: &ApiClient, id: i64) -> Result<()> {
    client.delete(&format!("{PATH}/{id}")).await?;
    info!(id, "zone deleted");
    Ok(())
}

/// Everything the edit screen needs
#[derive(Debug, Clone)]
pub struct ZoneEditContext {
    pub zone: Zoneamento,
    pub catalog: Vec<Cnae>,
}

/// Load the zone and the CNAE catalog side by side. Either failing fails the
/// whole load with a single message.
pub async fn load_zone_for_edit(client: &ApiClient, id: i64) -> Result<ZoneEditContext> {
    match futures::try_join!(fetch_zoneamento_by_id(client, id), fetch_cnaes(client)) {
        Ok((zone, catalog)) => Ok(ZoneEditContext { zone, catalog }),
        Err(e) => {
            warn!(id, error = %e, "zone edit load failed");
            Err(Error::Api {
                status: e.status().unwrap_or(0),
                message: EDIT_LOAD_FAILED.to_string(),
            })
        }
    }
}
