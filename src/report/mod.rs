//! Printable report for a single prior-viability request.
//!
//! Layout is pure (`ReportGenerator::layout` returns draw commands per page);
//! only `render` touches the PDF backend and only `fetch_logo` the network.

pub mod fonts;
pub mod layout;
mod pdf;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::image_crate::ImageDecoder;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::Result;
use crate::format::{self, NOT_INFORMED};
use crate::models::ConsultaPreviaDetalhe;
use crate::requests::{activity_split, DEFERIDO, INDEFERIDO};

use fonts::{text_width, wrap_text, FontFace};
use layout::{colors, Block, DrawOp, Margins, Page, PageLayout, PageSize, Rgb};

pub const TITLE: &str = "Relatório de Consulta Prévia de Viabilidade";
pub const DEFAULT_MUNICIPALITY: &str = "PREFEITURA MUNICIPAL DE CRUZ MACHADO";

mod font_size {
    pub const TITLE: f32 = 20.0;
    pub const SUBTITLE: f32 = 14.0;
    pub const BODY: f32 = 10.0;
    pub const LABEL: f32 = 9.0;
    pub const HEADER: f32 = 12.0;
    pub const FOOTER: f32 = 8.0;
}

const VALUE_OFFSET: f32 = 140.0;
const FIELD_ADVANCE: f32 = 18.0;
const LINE_HEIGHT: f32 = 15.0;
const LOGO_SCALE: f32 = 0.08;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub municipality: String,
    /// PNG bytes for the letterhead logo
    pub logo: Option<Arc<Vec<u8>>>,
    pub generated_at: NaiveDateTime,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            municipality: DEFAULT_MUNICIPALITY.to_string(),
            logo: None,
            generated_at: Local::now().naive_local(),
        }
    }
}

/// Badge fill for a request status (compared upper-cased)
pub fn status_color(situacao: &str) -> Rgb {
    match situacao.to_uppercase().as_str() {
        DEFERIDO => colors::SUCCESS,
        INDEFERIDO => colors::ERROR,
        _ => colors::WARNING,
    }
}

pub fn report_file_name(protocolo: &str) -> String {
    let safe: String = protocolo
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    format!("consulta-previa-{safe}.pdf")
}

/// Pixel size of a PNG, `None` when the bytes do not decode as one
fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    PngDecoder::new(Cursor::new(bytes)).ok().map(|decoder| decoder.dimensions())
}

/// Download the letterhead logo. Any failure is logged and yields `None`.
///
/// `http` carries the request timeout; no credentials are attached.
pub async fn fetch_logo(http: &reqwest::Client, url: &str) -> Option<Arc<Vec<u8>>> {
    let response = match http.get(url).send().await.and_then(|r| r.error_for_status()) {
        Ok(r) => r,
        Err(e) => {
            warn!(url, error = %e, "Could not load report logo");
            return None;
        }
    };
    match response.bytes().await {
        Ok(bytes) if png_dimensions(&bytes).is_some() => Some(Arc::new(bytes.to_vec())),
        Ok(_) => {
            warn!(url, "Report logo is not a PNG image");
            None
        }
        Err(e) => {
            warn!(url, error = %e, "Could not load report logo");
            None
        }
    }
}

fn text(x: f32, y: f32, value: impl Into<String>, font: FontFace, size: f32, color: Rgb) -> DrawOp {
    DrawOp::Text {
        x,
        y,
        text: value.into(),
        font,
        size,
        color,
    }
}

fn non_empty(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

pub struct ReportGenerator<'a> {
    consulta: &'a ConsultaPreviaDetalhe,
    options: ReportOptions,
    size: PageSize,
    margins: Margins,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(consulta: &'a ConsultaPreviaDetalhe, options: ReportOptions) -> Self {
        Self {
            consulta,
            options,
            size: PageSize::A4,
            margins: Margins::default(),
        }
    }

    pub fn with_page_size(mut self, size: PageSize) -> Self {
        self.size = size;
        self
    }

    fn letterhead(&self) -> Vec<DrawOp> {
        let top = self.size.height - self.margins.top;
        let mut ops = Vec::with_capacity(2);
        if let Some(png) = &self.options.logo {
            if let Some((w, h)) = png_dimensions(png) {
                ops.push(DrawOp::Image {
                    x: self.margins.left,
                    y: top + 10.0,
                    width: w as f32 * LOGO_SCALE,
                    height: h as f32 * LOGO_SCALE,
                    png: Arc::clone(png),
                });
            }
        }
        ops.push(text(
            self.margins.left + 60.0,
            top + 5.0,
            self.options.municipality.clone(),
            FontFace::Bold,
            font_size::HEADER,
            colors::SECONDARY,
        ));
        ops
    }

    fn footer(&self, page: usize, total: usize) -> Vec<DrawOp> {
        let y = self.margins.bottom - 20.0;
        let generated = format!("Gerado em: {}", self.options.generated_at.format("%d/%m/%Y, %H:%M:%S"));
        let numbering = format!("Página {page} de {total}");
        let x = self.size.width - self.margins.right - text_width(&numbering, FontFace::Regular, font_size::FOOTER);
        vec![
            text(self.margins.left, y, generated, FontFace::Regular, font_size::FOOTER, colors::LIGHT_GRAY),
            text(x, y, numbering, FontFace::Regular, font_size::FOOTER, colors::LIGHT_GRAY),
        ]
    }

    fn title_block(&self) -> Block {
        let status = self.consulta.situacao.to_uppercase();
        let badge_text = text_width(&status, FontFace::Bold, font_size::BODY);
        let badge_x = self.size.width - self.margins.right - badge_text - 20.0;
        let y = -30.0;
        Block {
            need: 0.0,
            advance: 30.0,
            ops: vec![
                text(self.margins.left, y, TITLE, FontFace::Bold, font_size::TITLE, colors::SECONDARY),
                DrawOp::Rect {
                    x: badge_x,
                    y: y + 15.0,
                    width: badge_text + 20.0,
                    height: 20.0,
                    color: status_color(&status),
                },
                text(badge_x + 10.0, y + 21.0, status, FontFace::Bold, font_size::BODY, colors::WHITE),
            ],
        }
    }

    fn section_block(&self, title: &str) -> Block {
        Block {
            need: 40.0,
            advance: 65.0,
            ops: vec![
                DrawOp::Line {
                    x1: self.margins.left,
                    y1: -20.0,
                    x2: self.size.width - self.margins.right,
                    y2: -20.0,
                    thickness: 0.5,
                    color: colors::LIGHT_GRAY,
                },
                text(self.margins.left, -45.0, title, FontFace::Bold, font_size::SUBTITLE, colors::PRIMARY),
            ],
        }
    }

    fn field_ops(&self, label: &str, value: String) -> Vec<DrawOp> {
        vec![
            text(self.margins.left, 0.0, format!("{label}:"), FontFace::Bold, font_size::LABEL, colors::SECONDARY),
            text(
                self.margins.left + VALUE_OFFSET,
                0.0,
                non_empty(&value, NOT_INFORMED),
                FontFace::Regular,
                font_size::BODY,
                colors::SECONDARY,
            ),
        ]
    }

    fn field_block(&self, label: &str, value: String) -> Block {
        Block {
            need: LINE_HEIGHT,
            advance: FIELD_ADVANCE,
            ops: self.field_ops(label, value),
        }
    }

    /// Label plus a value wrapped to the value column.
    ///
    /// Kept as one block while it fits on a page; taller values break per line.
    fn wrapped_block(&self, label: &str, value: &str) -> Vec<Block> {
        let max_width = self.size.width - self.margins.left - self.margins.right - VALUE_OFFSET;
        let lines = wrap_text(value, max_width, FontFace::Regular, font_size::BODY);
        let x = self.margins.left + VALUE_OFFSET;
        let line_op = |y: f32, line: &str| text(x, y, line, FontFace::Regular, font_size::BODY, colors::SECONDARY);

        let usable = self.size.height - self.margins.top - self.margins.bottom;
        let need = (lines.len() as f32 * LINE_HEIGHT).max(LINE_HEIGHT);
        let (first, rest) = lines.split_first().map_or(("", &[][..]), |(f, r)| (f.as_str(), r));

        if need > usable {
            let mut blocks = vec![self.field_block(label, first.to_string())];
            blocks.extend(rest.iter().map(|line| Block {
                need: LINE_HEIGHT,
                advance: LINE_HEIGHT,
                ops: vec![line_op(0.0, line.as_str())],
            }));
            return blocks;
        }

        let mut ops = self.field_ops(label, first.to_string());
        let mut advance = FIELD_ADVANCE;
        for (i, line) in rest.iter().enumerate() {
            ops.push(line_op(-(FIELD_ADVANCE + i as f32 * LINE_HEIGHT), line.as_str()));
            advance += LINE_HEIGHT;
        }
        vec![Block { need, advance, ops }]
    }

    fn address_line(&self) -> String {
        let e = &self.consulta.endereco;
        let street = [e.ds_tipo_logradouro.as_deref(), e.ds_endereco.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let number = e.nu_numero.as_ref().map(|n| format::value_text(Some(n)));
        match (street.is_empty(), number) {
            (true, _) => NOT_INFORMED.to_string(),
            (false, Some(n)) if n != NOT_INFORMED => format!("{street}, {n}"),
            (false, _) => street,
        }
    }

    fn blocks(&self) -> Vec<Block> {
        let c = self.consulta;
        let (principal, secundarias) = activity_split(c);
        let mut blocks = vec![self.title_block()];

        blocks.push(self.section_block("Dados da Solicitação e Empresa"));
        blocks.push(self.field_block("Protocolo REDESIM", c.co_protocolo_redesim.clone()));
        blocks.push(self.field_block(
            "CNPJ",
            c.nu_cnpj.as_deref().map(format::cpf_cnpj).unwrap_or_default(),
        ));
        blocks.push(self.field_block("Data da Solicitação", format::datetime_br(c.dt_solicitacao.as_deref())));
        blocks.push(self.field_block("Natureza Jurídica", format::value_text(c.co_natureza_juridica.as_ref())));
        blocks.push(self.field_block("CNAE Principal", principal.unwrap_or_default()));
        blocks.extend(self.wrapped_block("CNAEs Secundários", &secundarias));
        blocks.extend(self.wrapped_block("Objeto Social", c.ds_objeto_social.as_deref().unwrap_or_default()));

        blocks.push(self.section_block("Solicitante"));
        let s = &c.solicitante;
        blocks.push(self.field_block("Nome", format::text_or_default(s.ds_nome.as_deref())));
        blocks.push(self.field_block("CPF", s.nu_cpf.as_deref().map(format::cpf_cnpj).unwrap_or_default()));
        blocks.push(self.field_block("E-mail", format::text_or_default(s.ds_email.as_deref())));

        blocks.push(self.section_block("Endereço da Atividade"));
        let e = &c.endereco;
        blocks.push(self.field_block("Endereço", self.address_line()));
        blocks.push(self.field_block("Bairro", format::text_or_default(e.ds_bairro.as_deref())));
        blocks.push(self.field_block("CEP", format::value_text(e.co_cep.as_ref())));
        blocks.push(self.field_block(
            "Inscrição Imobiliária",
            format::value_text(e.natureza_imovel.nu_inscricao.as_ref()),
        ));
        let area = match format::value_text(e.nu_area_utilizada.as_ref()) {
            v if v == NOT_INFORMED => v,
            v => format!("{v} m²"),
        };
        blocks.push(self.field_block("Área Utilizada", area));

        blocks.push(self.section_block("Quadro Societário"));
        if c.socios.is_empty() {
            blocks.push(self.field_block("Sócios", "Nenhum sócio informado.".to_string()));
        }
        for socio in &c.socios {
            blocks.push(self.field_block(
                &non_empty(&socio.ds_nome, "Sócio"),
                format!("CPF/CNPJ: {}", format::cpf_cnpj(&socio.nu_cpf_cnpj)),
            ));
        }

        blocks.push(self.section_block("Análise e Resultado"));
        blocks.push(self.field_block(
            "Classificação de Risco",
            format::text_or_default(c.classificacao_risco.ds_tipo_risco.as_deref()),
        ));
        blocks.push(self.field_block(
            "Zoneamento",
            c.zoneamento.as_ref().map(|z| z.nome.clone()).unwrap_or_default(),
        ));
        let observacoes = c
            .observacoes
            .as_deref()
            .filter(|o| !o.trim().is_empty())
            .unwrap_or("Nenhuma.");
        blocks.extend(self.wrapped_block("Observações", observacoes));
        blocks
    }

    /// Draw commands for every page, letterhead and footer included
    pub fn layout(&self) -> Vec<Page> {
        let mut pages = PageLayout::new(self.size, self.margins, self.letterhead());
        for block in self.blocks() {
            pages.place(block);
        }
        pages.finish(|page, total| self.footer(page, total))
    }

    pub fn render(&self) -> Result<Vec<u8>> {
        let pages = self.layout();
        pdf::render(TITLE, self.size, &pages)
    }
}

/// Build the PDF for `consulta`, with the logo from `logo_url` when it loads
pub async fn generate_report(
    client: &ApiClient,
    consulta: &ConsultaPreviaDetalhe,
    logo_url: Option<&str>,
) -> Result<Vec<u8>> {
    let logo = match logo_url {
        Some(url) => fetch_logo(client.http(), url).await,
        None => None,
    };
    let options = ReportOptions {
        logo,
        ..ReportOptions::default()
    };
    ReportGenerator::new(consulta, options).render()
}

/// Write the report into `dir` and return the file path
pub async fn export_report(
    client: &ApiClient,
    consulta: &ConsultaPreviaDetalhe,
    logo_url: Option<&str>,
    dir: &Path,
) -> Result<PathBuf> {
    let bytes = generate_report(client, consulta, logo_url).await?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(&consulta.co_protocolo_redesim));
    std::fs::write(&path, &bytes)?;
    info!(path = %path.display(), size = bytes.len(), "Report exported");
    Ok(path)
}

/// Solid-colour RGB PNG for tests
#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    use printpdf::image_crate::codecs::png::PngEncoder;
    use printpdf::image_crate::{ColorType, ImageEncoder};

    let pixels = vec![0x1e; (width * height * 3) as usize];
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&pixels, width, height, ColorType::Rgb8)
        .unwrap();
    png
}
