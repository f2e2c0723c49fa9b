//! User accounts: `/usuarios`

use reqwest::Method;
use tracing::info;

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{Usuario, UsuarioInput};

const PATH: &str = "/usuarios";

pub async fn fetch_usuarios(client: &ApiClient) -> Result<Vec<Usuario>> {
    client.get_json(PATH).await
}

pub async fn fetch_usuario_by_id(client: &ApiClient, id: i64) -> Result<Usuario> {
    client.get_json(&format!("{PATH}/{id}")).await
}

pub async fn create_usuario(client: &ApiClient, input: &UsuarioInput) -> Result<Usuario> {
    let created: Usuario = client.send_json(Method::POST, PATH, input).await?;
    info!(id = created.id, email = %created.email, "user created");
    Ok(created)
}

/// Full replacement (`PUT`); the password travels only when it is being changed
pub async fn update_usuario(client: &ApiClient, id: i64, input: &UsuarioInput) -> Result<Usuario> {
    let updated: Usuario = client.send_json(Method::PUT, &format!("{PATH}/{id}"), input).await?;
    info!(id, password_changed = input.senha.is_some(), "user updated");
    Ok(updated)
}

pub async fn delete_usuario(client: &ApiClient, id: i64) -> Result<()> {
    client.delete(&format!("{PATH}/{id}")).await?;
    info!(id, "user deleted");
    Ok(())
}
