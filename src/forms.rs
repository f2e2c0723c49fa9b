//! Client-side validation for the create/edit forms.
//!
//! Each form turns user input into the API's input struct or fails with
//! `Error::Validation`; callers only reach the network with a validated value.

use std::path::Path;

use geojson::FeatureCollection;
use tracing::debug;

use crate::error::{Error, Result};
use crate::format::mask_cpf_input;
use crate::geometry::{collection_of, feature_of, parse_manual_polygon, to_feature_collection};
use crate::kmz::{load_kmz_file, read_kmz};
use crate::models::{CnaeInput, CnaeUpdate, Role, UsuarioInput, Zoneamento, ZoneamentoInput};

fn required(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

// ---- CNAE ----

#[derive(Debug, Clone, Default)]
pub struct CnaeForm {
    pub codigo: String,
    pub descricao: String,
}

impl CnaeForm {
    pub fn validate(&self) -> Result<CnaeInput> {
        match (required(&self.codigo), required(&self.descricao)) {
            (Some(codigo), Some(descricao)) => Ok(CnaeInput { codigo, descricao }),
            _ => Err(Error::validation("O código e a descrição do CNAE são obrigatórios.")),
        }
    }

    /// The edit screen sends both fields, both still required
    pub fn validate_update(&self) -> Result<CnaeUpdate> {
        let input = self.validate()?;
        Ok(CnaeUpdate {
            codigo: Some(input.codigo),
            descricao: Some(input.descricao),
        })
    }
}

// ---- zoning ----

/// Zone being created or edited, including its boundary.
///
/// A failed KMZ or polygon import leaves the current boundary as it was.
#[derive(Debug, Clone, Default)]
pub struct ZoneForm {
    pub nome: String,
    pub descricao: String,
    cnaes: Vec<i64>,
    area: Option<FeatureCollection>,
    original_area: Option<FeatureCollection>,
}

impl ZoneForm {
    pub fn new(nome: impl Into<String>, descricao: impl Into<String>) -> Self {
        Self {
            nome: nome.into(),
            descricao: descricao.into(),
            ..Self::default()
        }
    }

    /// Pre-fill from an existing zone; its stored area becomes the fallback boundary
    pub fn from_zone(zone: &Zoneamento) -> Result<Self> {
        let original_area = zone.area.as_ref().map(to_feature_collection).transpose()?;
        Ok(Self {
            nome: zone.nome.clone(),
            descricao: zone.descricao.clone(),
            cnaes: zone.cnaes_permitidos.iter().map(|c| c.id).collect(),
            area: None,
            original_area,
        })
    }

    pub fn cnaes(&self) -> &[i64] {
        &self.cnaes
    }

    /// Checkbox semantics: select when absent, deselect when present
    pub fn toggle_cnae(&mut self, id: i64) {
        match self.cnaes.iter().position(|&c| c == id) {
            Some(pos) => {
                self.cnaes.remove(pos);
            }
            None => self.cnaes.push(id),
        }
    }

    pub fn set_cnaes(&mut self, ids: impl IntoIterator<Item = i64>) {
        self.cnaes.clear();
        for id in ids {
            if !self.cnaes.contains(&id) {
                self.cnaes.push(id);
            }
        }
    }

    /// Boundary that would be saved: the new one, else the original
    pub fn area(&self) -> Option<&FeatureCollection> {
        self.area.as_ref().or(self.original_area.as_ref())
    }

    pub fn has_new_area(&self) -> bool {
        self.area.is_some()
    }

    pub fn attach_kmz(&mut self, bytes: &[u8]) -> Result<&FeatureCollection> {
        let fc = read_kmz(bytes)?;
        debug!(features = fc.features.len(), "KMZ attached to zone form");
        Ok(&*self.area.insert(fc))
    }

    pub fn attach_kmz_file(&mut self, path: impl AsRef<Path>) -> Result<&FeatureCollection> {
        let fc = load_kmz_file(path)?;
        Ok(&*self.area.insert(fc))
    }

    pub fn attach_manual_polygon(&mut self, text: &str) -> Result<&FeatureCollection> {
        let polygon = parse_manual_polygon(text)?;
        Ok(&*self.area.insert(collection_of(vec![feature_of(polygon)])))
    }

    pub fn validate(&self) -> Result<ZoneamentoInput> {
        let Some(nome) = required(&self.nome) else {
            return Err(Error::validation("O nome da zona é obrigatório."));
        };
        if self.cnaes.is_empty() {
            return Err(Error::validation("É necessário selecionar ao menos um CNAE."));
        }
        let Some(area) = self.area() else {
            return Err(Error::validation(
                "É obrigatório enviar um arquivo KMZ válido ou informar as coordenadas da área.",
            ));
        };
        Ok(ZoneamentoInput {
            nome,
            descricao: self.descricao.trim().to_string(),
            cnaes_permitidos_ids: self.cnaes.clone(),
            area: Some(area.clone()),
        })
    }
}

// ---- users ----

#[derive(Debug, Clone)]
pub struct UserForm {
    pub email: String,
    pub cpf: String,
    pub senha: String,
    pub role: Role,
}

impl Default for UserForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            cpf: String::new(),
            senha: String::new(),
            role: Role::Standard,
        }
    }
}

impl UserForm {
    fn identity(&self) -> Result<(String, String)> {
        let (Some(email), Some(cpf)) = (required(&self.email), required(&self.cpf)) else {
            return Err(Error::validation("Email e CPF são obrigatórios."));
        };
        if !email.contains('@') {
            return Err(Error::validation("Email inválido."));
        }
        Ok((email, mask_cpf_input(&cpf)))
    }

    /// New accounts need email, CPF and password
    pub fn validate_create(&self) -> Result<UsuarioInput> {
        if self.senha.is_empty() {
            return Err(Error::validation("Todos os campos são obrigatórios."));
        }
        let (email, cpf) = self.identity()?;
        Ok(UsuarioInput {
            email,
            cpf,
            senha: Some(self.senha.clone()),
            role: self.role,
        })
    }

    /// Edits leave the password alone unless a new one was typed
    pub fn validate_update(&self) -> Result<UsuarioInput> {
        let (email, cpf) = self.identity()?;
        Ok(UsuarioInput {
            email,
            cpf,
            senha: (!self.senha.is_empty()).then(|| self.senha.clone()),
            role: self.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cnae;
    use serde_json::json;

    const SQUARE: &str = "0,0\n1,0\n1,1\n0,1";

    #[test]
    fn test_cnae_form_requires_both_fields() {
        let mut form = CnaeForm {
            codigo: "6201-5/01".to_string(),
            descricao: "  ".to_string(),
        };
        assert!(matches!(form.validate(), Err(Error::Validation(_))));
        form.descricao = " Desenvolvimento de software ".to_string();
        let input = form.validate().unwrap();
        assert_eq!(input.descricao, "Desenvolvimento de software");
        assert_eq!(form.validate_update().unwrap().codigo.as_deref(), Some("6201-5/01"));
    }

    #[test]
    fn test_zone_form_validation_order() {
        let mut form = ZoneForm::new("", "");
        let err = form.validate().unwrap_err().to_string();
        assert!(err.contains("nome"), "{err}");

        form.nome = "Zona Industrial".to_string();
        let err = form.validate().unwrap_err().to_string();
        assert!(err.contains("CNAE"), "{err}");

        form.toggle_cnae(4);
        let err = form.validate().unwrap_err().to_string();
        assert!(err.contains("KMZ"), "{err}");
        assert!(err.contains("coordenadas"), "{err}");

        form.attach_manual_polygon(SQUARE).unwrap();
        let input = form.validate().unwrap();
        assert_eq!(input.cnaes_permitidos_ids, vec![4]);
        assert_eq!(input.area.unwrap().features.len(), 1);
    }

    #[test]
    fn test_toggle_and_set_cnaes() {
        let mut form = ZoneForm::default();
        form.toggle_cnae(1);
        form.toggle_cnae(2);
        form.toggle_cnae(1);
        assert_eq!(form.cnaes(), &[2]);
        form.set_cnaes([3, 3, 5]);
        assert_eq!(form.cnaes(), &[3, 5]);
    }

    #[test]
    fn test_failed_import_keeps_previous_area() {
        let mut form = ZoneForm::new("Zona", "");
        form.attach_manual_polygon(SQUARE).unwrap();
        let before = form.area().cloned();

        assert!(form.attach_kmz(b"definitely not a zip").is_err());
        assert!(form.attach_manual_polygon("1,1\n2,2").is_err());
        assert_eq!(form.area().cloned(), before);
    }

    #[test]
    fn test_edit_falls_back_to_original_area() {
        let zone = Zoneamento {
            id: 9,
            nome: "Zona Central".to_string(),
            descricao: "Centro".to_string(),
            area: Some(json!({
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
            })),
            cnaes_permitidos: vec![Cnae {
                id: 7,
                codigo: "4781-4/00".to_string(),
                descricao: "Vestuário".to_string(),
            }],
        };
        let form = ZoneForm::from_zone(&zone).unwrap();
        assert!(!form.has_new_area());
        let input = form.validate().unwrap();
        assert_eq!(input.cnaes_permitidos_ids, vec![7]);
        // Bare geometry from the API is saved back as a collection
        let body = serde_json::to_value(&input).unwrap();
        assert_eq!(body["area"]["type"], "FeatureCollection");
    }

    #[test]
    fn test_user_create_requires_password() {
        let mut form = UserForm {
            email: "fiscal@cruzmachado.pr.gov.br".to_string(),
            cpf: "12345678901".to_string(),
            senha: String::new(),
            role: Role::Standard,
        };
        assert!(matches!(form.validate_create(), Err(Error::Validation(_))));

        form.senha = "s3nha".to_string();
        let input = form.validate_create().unwrap();
        assert_eq!(input.cpf, "123.456.789-01");
        assert_eq!(input.senha.as_deref(), Some("s3nha"));
    }

    #[test]
    fn test_user_update_password_optional() {
        let mut form = UserForm {
            email: "fiscal@cruzmachado.pr.gov.br".to_string(),
            cpf: "123.456.789-01".to_string(),
            ..UserForm::default()
        };
        let input = form.validate_update().unwrap();
        assert!(input.senha.is_none());
        assert_eq!(input.role, Role::Standard);

        form.email = "sem-arroba".to_string();
        assert!(matches!(form.validate_update(), Err(Error::Validation(_))));
        form.email = String::new();
        assert!(matches!(form.validate_update(), Err(Error::Validation(_))));
    }
}
