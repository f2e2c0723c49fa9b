//! Seed the CNAE catalog from a Receita Federal CSV export
//!
//! The file is `;`-delimited, has no header row and is Latin-1 encoded:
//!   "6201501";"Desenvolvimento de programas de computador sob encomenda"
//! Run: cargo run --bin seed_cnaes -- --file F.K03200$Z.D40113.CNAECSV
//! Requires a saved session (`sigum-admin login`).

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use encoding_rs_io::DecodeReaderBytesBuilder;
use tracing::{info, warn};

use sigum_admin::auth::{self, SessionStore};
use sigum_admin::client::ApiClient;
use sigum_admin::config::Config;
use sigum_admin::forms::CnaeForm;
use sigum_admin::{cnaes, logging, Result};

#[derive(Parser)]
#[command(name = "seed_cnaes")]
#[command(about = "Carrega CNAEs a partir do CSV da Receita Federal", long_about = None)]
struct Args {
    #[arg(short, long)]
    file: PathBuf,

    #[arg(short, long, env = "SIGUM_API_URL")]
    url: Option<String>,

    /// Parse and validate only, nothing is sent
    #[arg(long)]
    dry_run: bool,
}

/// Receita publishes bare digits; the panel stores `NNNN-N/NN`
fn format_codigo(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() == 7 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}/{}", &raw[0..4], &raw[4..5], &raw[5..7])
    } else {
        raw.to_string()
    }
}

fn latin1_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)?;
    let reader = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding_rs::WINDOWS_1252))
        .build(file);
    Ok(Box::new(reader))
}

/// Every row with at least two columns becomes a form; validation happens later
fn read_forms<R: Read>(reader: R) -> Result<Vec<CnaeForm>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut forms = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(line = line + 1, error = %e, "Skipping unreadable row");
                continue;
            }
        };
        if record.len() < 2 {
            continue;
        }
        forms.push(CnaeForm {
            codigo: format_codigo(record.get(0).unwrap_or_default()),
            descricao: record.get(1).unwrap_or_default().trim().to_string(),
        });
    }
    Ok(forms)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = logging::init("info", false, None);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::from_env()?.with_api_url(args.url);
    let forms = read_forms(latin1_reader(&args.file)?)?;
    println!("📥 {} linha(s) lidas de {}", forms.len(), args.file.display());

    let client = if args.dry_run {
        None
    } else {
        let session = auth::require_session(&SessionStore::new(config.session_file.clone()))?;
        Some(auth::authenticated_client(ApiClient::from_config(&config)?, &session))
    };

    let (mut created, mut invalid, mut failed) = (0usize, 0usize, 0usize);
    for form in &forms {
        let input = match form.validate() {
            Ok(input) => input,
            Err(e) => {
                warn!(codigo = form.codigo.as_str(), error = %e, "Invalid CNAE row");
                invalid += 1;
                continue;
            }
        };
        let Some(client) = &client else {
            created += 1;
            continue;
        };
        match cnaes::create_cnae(client, &input).await {
            Ok(_) => created += 1,
            Err(e) => {
                warn!(codigo = input.codigo.as_str(), error = %e, "CNAE not created");
                failed += 1;
            }
        }
    }

    info!(created, invalid, failed, "Seed finished");
    let verb = if args.dry_run { "válidos" } else { "criados" };
    println!("✅ {created} {verb}, {invalid} inválidos, {failed} com erro na API");
    Ok(())
}
