use std::{io::Write, process, sync::Arc};

use modjulie::{
    application::{Builder, error::AppError},
    cache::{CacheConfig, CacheStore},
    config,
    domain::library::BuildRequest,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        library::FsLibrary,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Build(args) => run_build(settings, args).await,
    }
}

fn build_engine(settings: &config::Settings) -> Result<Builder, AppError> {
    let root = &settings.library.versions_directory;
    if !root.is_dir() {
        return Err(InfraError::configuration(format!(
            "library directory `{}` does not exist",
            root.display()
        ))
        .into());
    }

    let cache_config = CacheConfig::from(&settings.cache);
    let store = Arc::new(CacheStore::new(&cache_config));
    let library = Arc::new(FsLibrary::new(root.clone()));

    Ok(Builder::new(
        library,
        settings.library.layout.clone(),
        store,
        &cache_config,
    ))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let builder = Arc::new(build_engine(&settings)?);
    let state = HttpState::new(builder, settings.http.max_age_seconds);
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target: "modjulie::serve",
        addr = %settings.server.addr,
        library = %settings.library.versions_directory.display(),
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target: "modjulie::serve", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn run_build(settings: config::Settings, args: config::BuildArgs) -> Result<(), AppError> {
    let builder = build_engine(&settings)?;

    let version = args
        .version
        .unwrap_or_else(|| settings.library.default_version.clone());
    let modules = args
        .modules
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let mut request = BuildRequest::new(version).with_modules(modules);
    if let Some(preset) = args.preset {
        request = request.with_preset(preset);
    }

    let outcome = builder.build(&request).await?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(outcome.source.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(())
}
