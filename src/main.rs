//! sigum-admin: command-line back office for the SIGUM zoning panel.
//!
//! Usage:
//!   sigum-admin login -e fiscal@prefeitura.gov.br -p ****
//!   sigum-admin requests list --status deferido
//!   sigum-admin requests report 42 --out ./relatorios
//!   sigum-admin zones create --name "Zona Industrial" --cnae 3 --cnae 7 --kmz zona.kmz

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;

use sigum_admin::auth::{self, SessionStore};
use sigum_admin::client::ApiClient;
use sigum_admin::config::Config;
use sigum_admin::forms::{CnaeForm, UserForm, ZoneForm};
use sigum_admin::geometry::{bounds, to_feature_collection, vertex_count};
use sigum_admin::models::{LoginCredentials, Role};
use sigum_admin::requests::{self, StatusFilter};
use sigum_admin::{cnaes, format, logging, report, users, zoning, Error, Result};

#[derive(Parser)]
#[command(name = "sigum-admin")]
#[command(about = "Administração do SIGUM: consultas prévias, zoneamento, CNAEs e usuários", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the SIGUM API
    #[arg(short, long, env = "SIGUM_API_URL", global = true)]
    url: Option<String>,

    /// JSON log lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// -v info, -vv debug
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "SIGUM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Show the logged-in user
    Whoami,
    #[command(subcommand)]
    Requests(RequestCommands),
    #[command(subcommand)]
    Zones(ZoneCommands),
    #[command(subcommand)]
    Cnaes(CnaeCommands),
    /// User accounts (administrators only)
    #[command(subcommand)]
    Users(UserCommands),
}

#[derive(Subcommand)]
enum RequestCommands {
    List {
        /// TODAS, DEFERIDO or INDEFERIDO
        #[arg(short, long, default_value = "TODAS")]
        status: StatusFilter,
        /// Protocol, applicant or address
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
    Show {
        id: i64,
    },
    /// Export the request as `consulta-previa-<protocolo>.pdf`
    Report {
        id: i64,
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum ZoneCommands {
    List,
    Show {
        id: i64,
    },
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Allowed CNAE id (repeatable)
        #[arg(short, long = "cnae", value_name = "ID")]
        cnaes: Vec<i64>,
        /// KMZ file with the zone boundary
        #[arg(long, conflicts_with = "coords")]
        kmz: Option<PathBuf>,
        /// Text file with one `lon,lat` vertex per line
        #[arg(long)]
        coords: Option<PathBuf>,
    },
    Edit {
        id: i64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Replaces the allowed CNAEs when given (repeatable)
        #[arg(short, long = "cnae", value_name = "ID")]
        cnaes: Vec<i64>,
        #[arg(long, conflicts_with = "coords")]
        kmz: Option<PathBuf>,
        #[arg(long)]
        coords: Option<PathBuf>,
    },
    Delete {
        id: i64,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CnaeCommands {
    List {
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
    Show {
        id: i64,
    },
    Create {
        #[arg(short, long)]
        codigo: String,
        #[arg(short, long)]
        descricao: String,
    },
    Edit {
        id: i64,
        #[arg(short, long)]
        codigo: Option<String>,
        #[arg(short, long)]
        descricao: Option<String>,
    },
    Delete {
        id: i64,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    List,
    Show {
        id: i64,
    },
    Create {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        cpf: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long, default_value = "PADRAO")]
        role: Role,
    },
    Edit {
        id: i64,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        cpf: Option<String>,
        /// Leave out to keep the current password
        #[arg(short, long)]
        password: Option<String>,
        #[arg(short, long)]
        role: Option<Role>,
    },
    Delete {
        id: i64,
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config.with_api_url(cli.url.clone()),
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _guard = logging::init(level, cli.log_json, config.log_dir.as_deref());
    debug!(api = %config.api_url, session = %config.session_file.display(), "configuration loaded");

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: Config) -> Result<()> {
    let store = SessionStore::new(config.session_file.clone());
    let base = ApiClient::from_config(&config)?;

    match command {
        Commands::Login { email, password } => {
            let credentials = LoginCredentials {
                login: email,
                senha: password,
            };
            let session = auth::login(&base, &store, &credentials).await?;
            if let Some(user) = &session.user {
                println!("✅ Logado como {} ({})", user.email, user.role);
            }
            println!("Sessão salva em {}", store.path().display());
        }
        Commands::Logout => {
            auth::logout(&store)?;
            println!("👋 Sessão encerrada.");
        }
        Commands::Whoami => {
            let session = auth::require_session(&store)?;
            match &session.user {
                Some(user) => println!("{} | CPF {} | {}", user.email, format::cpf_cnpj(&user.cpf), user.role),
                None => println!("Sessão ativa (usuário desconhecido)"),
            }
        }
        Commands::Requests(cmd) => {
            let session = auth::require_session(&store)?;
            let client = auth::authenticated_client(base, &session);
            run_requests(&client, &config, cmd).await?;
        }
        Commands::Zones(cmd) => {
            let session = auth::require_session(&store)?;
            let client = auth::authenticated_client(base, &session);
            run_zones(&client, cmd).await?;
        }
        Commands::Cnaes(cmd) => {
            let session = auth::require_session(&store)?;
            let client = auth::authenticated_client(base, &session);
            run_cnaes(&client, cmd).await?;
        }
        Commands::Users(cmd) => {
            let session = auth::require_session(&store)?;
            auth::require_admin(&session)?;
            let client = auth::authenticated_client(base, &session);
            run_users(&client, cmd).await?;
        }
    }
    Ok(())
}

/// Ask before destructive commands unless `--yes` was passed
fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    print!("{prompt} [s/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "s" | "sim" | "y" | "yes"))
}

async fn run_requests(client: &ApiClient, config: &Config, cmd: RequestCommands) -> Result<()> {
    match cmd {
        RequestCommands::List { status, search } => {
            let list = requests::fetch_consultas_previas_resumo(client).await?;
            let stats = requests::stats(&list);
            println!(
                "📊 Total: {} | Deferidas: {} | Indeferidas: {}",
                stats.total, stats.deferidas, stats.indeferidas
            );
            let filtered = requests::filter_summaries(&list, status, search.as_deref().unwrap_or(""));
            if filtered.is_empty() {
                println!("Nenhuma consulta encontrada.");
            }
            for c in filtered {
                println!(
                    "{:>6}  {:<14} {:<11} {:<10}  {}  |  {}",
                    c.id,
                    c.co_protocolo_redesim,
                    c.situacao,
                    format::date_br(&c.dt_solicitacao),
                    c.nome_solicitante,
                    c.endereco
                );
            }
        }
        RequestCommands::Show { id } => {
            let c = requests::fetch_consulta_previa_by_id(client, id).await?;
            let (principal, secundarias) = requests::activity_split(&c);
            println!("📄 Consulta {} | {}", c.co_protocolo_redesim, c.situacao);
            println!("  Data:            {}", format::datetime_br(c.dt_solicitacao.as_deref()));
            println!(
                "  CNPJ:            {}",
                c.nu_cnpj.as_deref().map(format::cpf_cnpj).unwrap_or_else(|| format::NOT_INFORMED.to_string())
            );
            println!("  Solicitante:     {}", format::text_or_default(c.solicitante.ds_nome.as_deref()));
            println!("  E-mail:          {}", format::text_or_default(c.solicitante.ds_email.as_deref()));
            println!("  Objeto social:   {}", format::text_or_default(c.ds_objeto_social.as_deref()));
            println!("  CNAE principal:  {}", principal.as_deref().unwrap_or(format::NOT_INFORMED));
            println!("  CNAEs secund.:   {secundarias}");
            println!(
                "  Endereço:        {} {}, {} - {}",
                format::text_or_default(c.endereco.ds_tipo_logradouro.as_deref()),
                format::text_or_default(c.endereco.ds_endereco.as_deref()),
                format::value_text(c.endereco.nu_numero.as_ref()),
                format::text_or_default(c.endereco.ds_bairro.as_deref())
            );
            println!(
                "  Zoneamento:      {}",
                c.zoneamento.as_ref().map(|z| z.nome.as_str()).unwrap_or(format::NOT_INFORMED)
            );
            println!(
                "  Risco:           {}",
                format::text_or_default(c.classificacao_risco.ds_tipo_risco.as_deref())
            );
            for socio in &c.socios {
                println!("  Sócio:           {} ({})", socio.ds_nome, format::cpf_cnpj(&socio.nu_cpf_cnpj));
            }
            for pergunta in &c.questionario {
                println!("  ? {} -> {}", pergunta.ds_pergunta, pergunta.ds_resposta);
            }
        }
        RequestCommands::Report { id, out } => {
            let c = requests::fetch_consulta_previa_by_id(client, id).await?;
            let path = report::export_report(client, &c, config.logo_url.as_deref(), &out).await?;
            println!("📄 Relatório salvo em {}", path.display());
        }
    }
    Ok(())
}

fn attach_area(form: &mut ZoneForm, kmz: Option<PathBuf>, coords: Option<PathBuf>) -> Result<()> {
    if let Some(path) = kmz {
        let fc = form.attach_kmz_file(&path)?;
        println!("🗺️  KMZ carregado: {} feição(ões)", fc.features.len());
    } else if let Some(path) = coords {
        let text = std::fs::read_to_string(&path)?;
        let fc = form.attach_manual_polygon(&text)?;
        println!("🗺️  Polígono com {} vértices", vertex_count(fc));
    }
    Ok(())
}

async fn run_zones(client: &ApiClient, cmd: ZoneCommands) -> Result<()> {
    match cmd {
        ZoneCommands::List => {
            let zones = zoning::fetch_zoneamentos(client).await?;
            if zones.is_empty() {
                println!("Nenhuma zona cadastrada.");
            }
            for z in zones {
                println!("{:>5}  {:<30} {} CNAE(s)  {}", z.id, z.nome, z.cnaes_permitidos.len(), z.descricao);
            }
        }
        ZoneCommands::Show { id } => {
            let z = zoning::fetch_zoneamento_by_id(client, id).await?;
            println!("🗺️  {} (#{})", z.nome, z.id);
            println!("  {}", format::text_or_default(Some(z.descricao.as_str())));
            match z.area.as_ref().map(to_feature_collection).transpose()? {
                Some(fc) => {
                    println!("  Área: {} feição(ões), {} vértices", fc.features.len(), vertex_count(&fc));
                    if let Some(b) = bounds(&fc) {
                        println!(
                            "  Limites: lon [{:.6}, {:.6}] lat [{:.6}, {:.6}]",
                            b.min_lon, b.max_lon, b.min_lat, b.max_lat
                        );
                    }
                }
                None => println!("  Área: não cadastrada"),
            }
            for c in &z.cnaes_permitidos {
                println!("  ✔ {} {}", c.codigo, c.descricao);
            }
        }
        ZoneCommands::Create {
            name,
            description,
            cnaes,
            kmz,
            coords,
        } => {
            let mut form = ZoneForm::new(name, description);
            form.set_cnaes(cnaes);
            attach_area(&mut form, kmz, coords)?;
            let input = form.validate()?;
            let zone = zoning::create_zoneamento(client, &input).await?;
            println!("✅ Zona criada: {} (#{})", zone.nome, zone.id);
        }
        ZoneCommands::Edit {
            id,
            name,
            description,
            cnaes,
            kmz,
            coords,
        } => {
            let ctx = zoning::load_zone_for_edit(client, id).await?;
            let mut form = ZoneForm::from_zone(&ctx.zone)?;
            if let Some(name) = name {
                form.nome = name;
            }
            if let Some(description) = description {
                form.descricao = description;
            }
            if !cnaes.is_empty() {
                let unknown: Vec<i64> = cnaes
                    .iter()
                    .copied()
                    .filter(|id| !ctx.catalog.iter().any(|c| c.id == *id))
                    .collect();
                if !unknown.is_empty() {
                    return Err(Error::validation(format!("CNAE(s) inexistente(s): {unknown:?}")));
                }
                form.set_cnaes(cnaes);
            }
            attach_area(&mut form, kmz, coords)?;
            let input = form.validate()?;
            let zone = zoning::update_zoneamento(client, id, &input).await?;
            println!("✅ Zona atualizada: {} (#{})", zone.nome, zone.id);
        }
        ZoneCommands::Delete { id, yes } => {
            if confirm(&format!("Excluir a zona #{id}?"), yes)? {
                zoning::delete_zoneamento(client, id).await?;
                println!("🗑️  Zona #{id} excluída.");
            }
        }
    }
    Ok(())
}

async fn run_cnaes(client: &ApiClient, cmd: CnaeCommands) -> Result<()> {
    match cmd {
        CnaeCommands::List { search } => {
            let all = cnaes::fetch_cnaes(client).await?;
            let shown = cnaes::filter_cnaes(&all, search.as_deref().unwrap_or(""));
            println!("{} de {} CNAE(s)", shown.len(), all.len());
            for c in shown {
                println!("{:>5}  {:<10} {}", c.id, c.codigo, c.descricao);
            }
        }
        CnaeCommands::Show { id } => {
            let c = cnaes::fetch_cnae_by_id(client, id).await?;
            println!("{} | {} | {}", c.id, c.codigo, c.descricao);
        }
        CnaeCommands::Create { codigo, descricao } => {
            let input = CnaeForm { codigo, descricao }.validate()?;
            let c = cnaes::create_cnae(client, &input).await?;
            println!("✅ CNAE criado: {} (#{})", c.codigo, c.id);
        }
        CnaeCommands::Edit { id, codigo, descricao } => {
            let current = cnaes::fetch_cnae_by_id(client, id).await?;
            let form = CnaeForm {
                codigo: codigo.unwrap_or(current.codigo),
                descricao: descricao.unwrap_or(current.descricao),
            };
            let c = cnaes::update_cnae(client, id, &form.validate_update()?).await?;
            println!("✅ CNAE atualizado: {} (#{})", c.codigo, c.id);
        }
        CnaeCommands::Delete { id, yes } => {
            if confirm(&format!("Excluir o CNAE #{id}?"), yes)? {
                cnaes::delete_cnae(client, id).await?;
                println!("🗑️  CNAE #{id} excluído.");
            }
        }
    }
    Ok(())
}

async fn run_users(client: &ApiClient, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::List => {
            for u in users::fetch_usuarios(client).await? {
                println!("{:>5}  {:<35} {:<15} {}", u.id, u.email, format::cpf_cnpj(&u.cpf), u.role);
            }
        }
        UserCommands::Show { id } => {
            let u = users::fetch_usuario_by_id(client, id).await?;
            println!("{} | {} | CPF {} | {}", u.id, u.email, format::cpf_cnpj(&u.cpf), u.role);
        }
        UserCommands::Create {
            email,
            cpf,
            password,
            role,
        } => {
            let form = UserForm {
                email,
                cpf,
                senha: password,
                role,
            };
            let u = users::create_usuario(client, &form.validate_create()?).await?;
            println!("✅ Usuário criado: {} (#{})", u.email, u.id);
        }
        UserCommands::Edit {
            id,
            email,
            cpf,
            password,
            role,
        } => {
            let current = users::fetch_usuario_by_id(client, id).await?;
            let form = UserForm {
                email: email.unwrap_or(current.email),
                cpf: cpf.unwrap_or(current.cpf),
                senha: password.unwrap_or_default(),
                role: role.unwrap_or(current.role),
            };
            let u = users::update_usuario(client, id, &form.validate_update()?).await?;
            println!("✅ Usuário atualizado: {} (#{})", u.email, u.id);
        }
        UserCommands::Delete { id, yes } => {
            if confirm(&format!("Excluir o usuário #{id}?"), yes)? {
                users::delete_usuario(client, id).await?;
                println!("🗑️  Usuário #{id} excluído.");
            }
        }
    }
    Ok(())
}
