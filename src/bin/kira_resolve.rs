use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_resolver::config::ConfigLoader;
use kira_resolver::domain::ObjectType;
use kira_resolver::error::KiraError;
use kira_resolver::fs::{absolutize, current_dir};
use kira_resolver::names::{NamesClient, NamesHttpClient, OfflineNamesClient};
use kira_resolver::output::JsonOutput;
use kira_resolver::repository::RepositoryHierarchy;
use kira_resolver::resolver::Resolver;
use kira_resolver::service::ServiceRequest;

#[derive(Parser)]
#[command(name = "kira-resolve")]
#[command(about = "Resolve run accessions to local, cache and remote locations")]
#[command(version, author)]
struct Cli {
    #[arg(required = true)]
    accessions: Vec<String>,

    #[arg(long, help = "JSON settings file (default: ~/.kira-resolver/user-settings.json)")]
    config: Option<String>,

    #[arg(long, default_value = "all", help = "Object types to resolve, e.g. all, sra, sra,vdbcache")]
    format: String,

    #[arg(long, help = "Skip the names service for accessions found locally")]
    prefer_local: bool,

    #[arg(long, help = "Resolve from local repositories only")]
    no_remote: bool,

    #[arg(long, help = "Cache into <working-dir>/<accession>/ instead of the user repository")]
    ad_caching: bool,

    #[arg(long, help = "Directory holding accession directories (default: current directory)")]
    working_dir: Option<String>,

    #[arg(long = "type", help = "Only print objects of this type, e.g. sra or vdbcache")]
    object_type: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::InvalidArgument(_)
        | KiraError::InvalidConfiguration(_)
        | KiraError::NotFound(_)
        | KiraError::TypeMismatch { .. } => 2,
        KiraError::TransportUnavailable(_)
        | KiraError::NamesHttp(_)
        | KiraError::NamesStatus { .. }
        | KiraError::NamesParse(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    let cwd = current_dir()?;
    let working_dir = match &cli.working_dir {
        Some(dir) => absolutize(&cwd, &Utf8PathBuf::from(dir)),
        None => cwd,
    };
    let mut hierarchy = RepositoryHierarchy::from_config(&config, working_dir);
    if cli.ad_caching {
        hierarchy = hierarchy.with_ad_caching(true);
    }

    let only_type = cli
        .object_type
        .as_deref()
        .map(str::parse::<ObjectType>)
        .transpose()?;

    let mut request = ServiceRequest::new();
    for id in &cli.accessions {
        request.add_id(id)?;
    }
    request.set_format(&cli.format);
    request.set_resolution_mode(cli.prefer_local || cli.no_remote, !cli.no_remote);

    let names: Box<dyn NamesClient> = if cli.no_remote {
        Box::new(OfflineNamesClient)
    } else {
        match NamesHttpClient::from_config(&config)? {
            Some(client) => Box::new(client),
            None => Box::new(OfflineNamesClient),
        }
    };

    let resolver = Resolver::new(hierarchy, names.as_ref());
    let response = request.execute(&resolver)?;
    let mut summary = response.summary();
    if let Some(object_type) = &only_type {
        summary.retain_type(object_type);
    }
    JsonOutput::print_summary(&summary).into_diagnostic()?;
    response.release();
    Ok(())
}
