use clap::Parser;
use service_core::observability::{init_tracing, otlp_endpoint_from_env, shutdown_tracing};
use std::process::ExitCode;
use tender_importer::cli::{usage_exit_code, Cli, ImportConfig};
use tender_importer::pipeline::{dry_run, run_import};
use tender_importer::store::MongoSink;
use tender_importer::{ImportError, ImportReport};

async fn run(config: ImportConfig) -> Result<ImportReport, ImportError> {
    if config.dry_run {
        return dry_run(&config.source, &config.mode);
    }

    let store = config
        .store
        .ok_or_else(|| ImportError::Config("store settings are missing".to_string()))?;

    let sink = MongoSink::connect(&store.uri, &store.database, &store.collection).await?;
    run_import(&sink, &config.source, &config.mode).await
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout, usage errors to stderr.
            let _ = e.print();
            return ExitCode::from(usage_exit_code(&e));
        }
    };

    let otlp_endpoint = otlp_endpoint_from_env();
    init_tracing("tender-importer", &cli.log_level, otlp_endpoint.as_deref());

    let result = match cli.into_config() {
        Ok(config) => {
            tracing::info!(
                file = %config.source.path.display(),
                mode = %config.mode,
                dry_run = config.dry_run,
                "Starting tender import"
            );
            run(config).await
        }
        Err(e) => Err(e),
    };

    let code = match result {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Tender import failed");
            eprintln!("Import failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    };

    shutdown_tracing();
    code
}
