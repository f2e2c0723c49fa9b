use geojson::FeatureCollection;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Explicit `null` reads as the type's default, same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---- auth ----

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginCredentials {
    pub login: String,
    pub senha: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub access_token: String,
    pub usuario: Usuario,
}

/// Claims the client reads out of the access token (never verified locally)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<Value>,
    #[serde(default)]
    pub exp: Option<u64>,
}

// ---- CNAE ----

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Cnae {
    pub id: i64,
    pub codigo: String,
    pub descricao: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CnaeInput {
    pub codigo: String,
    pub descricao: String,
}

/// PATCH body: only the fields that changed
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CnaeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descricao: Option<String>,
}

// ---- zoning ----

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Zoneamento {
    pub id: i64,
    pub nome: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub descricao: String,
    /// Stored as the API returns it: a FeatureCollection, a Feature or a bare geometry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Value>,
    #[serde(rename = "cnaesPermitidos", default, deserialize_with = "null_as_default")]
    pub cnaes_permitidos: Vec<Cnae>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ZoneamentoInput {
    pub nome: String,
    pub descricao: String,
    #[serde(rename = "cnaesPermitidosIds")]
    pub cnaes_permitidos_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<FeatureCollection>,
}

// ---- users ----

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    // Older screens sent "USER" for the same profile
    #[serde(rename = "PADRAO", alias = "USER")]
    Standard,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Standard => "PADRAO",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "PADRAO" | "USER" => Ok(Role::Standard),
            other => Err(format!("perfil desconhecido: {other} (use ADMIN ou PADRAO)")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Usuario {
    pub id: i64,
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cpf: String,
    pub role: Role,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UsuarioInput {
    pub email: String,
    pub cpf: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub senha: Option<String>,
    pub role: Role,
}

// ---- consultas prévias ----

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ConsultaPreviaResumo {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub situacao: String,
    #[serde(deserialize_with = "null_as_default")]
    pub co_protocolo_redesim: String,
    #[serde(deserialize_with = "null_as_default")]
    pub nome_solicitante: String,
    #[serde(deserialize_with = "null_as_default")]
    pub endereco: String,
    #[serde(deserialize_with = "null_as_default")]
    pub dt_solicitacao: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cnaes: Vec<String>,
}

/// Full request as returned by `/consultas-previas/:id`.
/// Upstream leaves many fields null, so everything defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ConsultaPreviaDetalhe {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub situacao: String,
    #[serde(deserialize_with = "null_as_default")]
    pub co_protocolo_redesim: String,
    pub nu_cnpj: Option<String>,
    pub dt_solicitacao: Option<String>,
    pub co_natureza_juridica: Option<Value>,
    pub co_inscricao_municipal: Option<Value>,
    pub ds_objeto_social: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub opcoes_nome: Vec<OpcaoNome>,
    #[serde(deserialize_with = "null_as_default")]
    pub eventos: Vec<Evento>,
    #[serde(deserialize_with = "null_as_default")]
    pub solicitante: Solicitante,
    #[serde(deserialize_with = "null_as_default")]
    pub endereco: Endereco,
    #[serde(deserialize_with = "null_as_default")]
    pub atividades: Vec<Atividade>,
    #[serde(deserialize_with = "null_as_default")]
    pub socios: Vec<Socio>,
    #[serde(deserialize_with = "null_as_default")]
    pub classificacao_risco: ClassificacaoRisco,
    pub zoneamento: Option<ZoneamentoResumo>,
    #[serde(deserialize_with = "null_as_default")]
    pub questionario: Vec<Pergunta>,
    pub observacoes: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct OpcaoNome {
    #[serde(deserialize_with = "null_as_default")]
    pub ds_opcao_nome: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Evento {
    pub co_evento: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Solicitante {
    pub ds_nome: Option<String>,
    pub nu_cpf: Option<String>,
    pub ds_email: Option<String>,
    pub nu_ddd_telefone: Option<Value>,
    pub nu_telefone: Option<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_contador: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Endereco {
    pub ds_tipo_logradouro: Option<String>,
    pub ds_endereco: Option<String>,
    pub nu_numero: Option<Value>,
    pub ds_complemento: Option<String>,
    pub ds_bairro: Option<String>,
    pub co_cep: Option<Value>,
    pub co_municipio: Option<Value>,
    pub ds_ponto_referencia: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub natureza_imovel: NaturezaImovel,
    #[serde(deserialize_with = "null_as_default")]
    pub coordenadas_geograficas: Coordenadas,
    pub nu_area_total: Option<Value>,
    pub nu_area_utilizada: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct NaturezaImovel {
    pub nu_inscricao: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Coordenadas {
    pub nu_latitude: Option<Value>,
    pub nu_longitude: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Atividade {
    #[serde(deserialize_with = "null_as_default")]
    pub co_cnae: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_atividade_principal: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Socio {
    pub id: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub ds_nome: String,
    #[serde(deserialize_with = "null_as_default")]
    pub nu_cpf_cnpj: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ClassificacaoRisco {
    pub ds_tipo_risco: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ZoneamentoResumo {
    #[serde(deserialize_with = "null_as_default")]
    pub nome: String,
    pub descricao: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Pergunta {
    pub id: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub ds_pergunta: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ds_resposta: String,
}
