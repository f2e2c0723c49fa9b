use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::models::{AuthResponse, LoginCredentials, Role, TokenClaims, Usuario};

const INVALID_CREDENTIALS: &str = "Credenciais inválidas. Por favor, verifique e tente novamente.";

/// What the CLI remembers between runs (same keys the web panel kept in localStorage)
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Session {
    #[serde(rename = "isAuthenticated", default)]
    pub is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Usuario>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        matches!(self.user.as_ref().map(|u| u.role), Some(Role::Admin))
    }
}

/// JSON file holding the `Session`
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means "never logged in"
    pub fn load(&self) -> Result<Session> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Session::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `POST /auth/login`, then persist the token and profile
pub async fn login(client: &ApiClient, store: &SessionStore, credentials: &LoginCredentials) -> Result<Session> {
    if credentials.login.trim().is_empty() || credentials.senha.is_empty() {
        return Err(Error::validation("Informe email e senha."));
    }

    let response: AuthResponse = client
        .send_json(Method::POST, "/auth/login", credentials)
        .await
        .map_err(|e| match e {
            Error::Api { status, .. } => Error::Api {
                status,
                message: INVALID_CREDENTIALS.to_string(),
            },
            other => other,
        })?;

    let session = Session {
        is_authenticated: true,
        access_token: Some(response.access_token),
        user: Some(response.usuario),
    };
    store.save(&session)?;
    info!(user = session.user.as_ref().map(|u| u.email.as_str()), "logged in");
    Ok(session)
}

pub fn logout(store: &SessionStore) -> Result<()> {
    store.clear()?;
    info!("session cleared");
    Ok(())
}

/// Guard for every protected command: the flag must be set and the token, when
/// it is a JWT, must not be past its `exp`.
pub fn require_session(store: &SessionStore) -> Result<Session> {
    let session = store.load()?;
    if !session.is_authenticated {
        return Err(Error::Unauthenticated);
    }
    if let Some(token) = &session.access_token {
        if token_expired(token, chrono::Utc::now().timestamp()) {
            return Err(Error::Unauthenticated);
        }
    }
    Ok(session)
}

pub fn require_admin(session: &Session) -> Result<()> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

/// Client carrying the session's bearer token
pub fn authenticated_client(client: ApiClient, session: &Session) -> ApiClient {
    match &session.access_token {
        Some(token) => client.with_token(token.clone()),
        None => client,
    }
}

/// Read the claims without verifying the signature (the key lives on the server)
pub fn peek_claims(token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    match decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!(error = %e, "access token is not a readable JWT");
            None
        }
    }
}

/// Opaque tokens and tokens without `exp` never count as expired
pub fn token_expired(token: &str, now: i64) -> bool {
    peek_claims(token)
        .and_then(|c| c.exp)
        .map(|exp| (exp as i64) <= now)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn jwt(exp: u64) -> String {
        encode(
            &Header::default(),
            &json!({ "sub": 1, "exp": exp }),
            &EncodingKey::from_secret(b"server-side-secret"),
        )
        .unwrap()
    }

    fn admin() -> Usuario {
        Usuario {
            id: 1,
            email: "admin@cruzmachado.pr.gov.br".to_string(),
            cpf: "12345678901".to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        assert_eq!(store.load().unwrap(), Session::default());

        let session = Session {
            is_authenticated: true,
            access_token: Some("abc".to_string()),
            user: Some(admin()),
        };
        store.save(&session).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["isAuthenticated"], true);
        assert_eq!(raw["user"]["role"], "ADMIN");
        assert_eq!(store.load().unwrap(), session);

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(!store.load().unwrap().is_authenticated);
    }

    #[test]
    fn test_guard_requires_flag() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        assert!(matches!(require_session(&store), Err(Error::Unauthenticated)));

        store
            .save(&Session {
                is_authenticated: false,
                access_token: Some("abc".to_string()),
                user: None,
            })
            .unwrap();
        assert!(matches!(require_session(&store), Err(Error::Unauthenticated)));
    }

    #[test]
    fn test_guard_rejects_expired_jwt() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut session = Session {
            is_authenticated: true,
            access_token: Some(jwt(1_000)),
            user: Some(admin()),
        };
        store.save(&session).unwrap();
        assert!(matches!(require_session(&store), Err(Error::Unauthenticated)));

        let future = (chrono::Utc::now().timestamp() + 3600) as u64;
        session.access_token = Some(jwt(future));
        store.save(&session).unwrap();
        assert!(require_session(&store).is_ok());
    }

    #[test]
    fn test_token_expiry_rules() {
        assert!(token_expired(&jwt(100), 100));
        assert!(!token_expired(&jwt(101), 100));
        // Opaque tokens are left to the server
        assert!(!token_expired("not-a-jwt", 100));
        assert_eq!(peek_claims(&jwt(5)).and_then(|c| c.exp), Some(5));
    }

    #[test]
    fn test_require_admin() {
        let mut session = Session {
            is_authenticated: true,
            access_token: None,
            user: Some(admin()),
        };
        assert!(require_admin(&session).is_ok());
        session.user.as_mut().unwrap().role = Role::Standard;
        assert!(matches!(require_admin(&session), Err(Error::Forbidden)));
        session.user = None;
        assert!(matches!(require_admin(&session), Err(Error::Forbidden)));
    }
}
