use anyhow::Context;
use axum::{routing::get, Router};
use picce::{
    api::routes::create_router,
    auth::jwt::AuthService,
    cli::{
        init::{self, InitConfig, InitResult},
        output::{describe_lifetime, Output},
        Cli, Commands,
    },
    AppState, PicceConfig, PicceConfigManager, TursoClient,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Largest accepted request body; form uploads carry only text fields.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets may live in .env during development
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Some(Commands::Init {
            path,
            force,
            host,
            port,
            no_sign_up,
        }) => {
            let config = InitConfig {
                path,
                force,
                host,
                port,
                allow_sign_up: !no_sign_up,
            };
            match init::run(config, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => anyhow::bail!("init failed: {}", e),
            }
        }
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
        None => serve(&cli.config, cli.verbose).await,
    }
}

fn show_config(path: &Path, validate: bool, output: &Output) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: PicceConfig =
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;

    output.header(&format!("Configuration ({})", path.display()));
    output.kv("server", &format!("{}:{}", config.server.host, config.server.port));
    output.kv("log_level", &config.server.log_level);
    output.kv("log_json", &config.server.log_json.to_string());
    output.kv("jwt_secret_env", &config.auth.jwt_secret_env);
    output.secret_status(
        &config.auth.jwt_secret_env,
        std::env::var(&config.auth.jwt_secret_env).ok().as_deref(),
    );
    output.kv("token_expiry", &describe_lifetime(config.auth.token_expiry));
    output.kv("allow_sign_up", &config.auth.allow_sign_up.to_string());
    output.roles();
    output.kv("database", &config.database.url);

    if validate {
        output.newline();
        match config.validate() {
            Ok(()) => output.success("Configuration is valid"),
            Err(e) => {
                output.error(&e.to_string());
                anyhow::bail!("configuration is invalid");
            }
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect_database(config: &PicceConfig) -> picce::Result<TursoClient> {
    #[cfg(feature = "turso")]
    {
        if let Some((url, token)) = config.turso_credentials() {
            tracing::info!("Connecting to remote Turso database");
            return TursoClient::new_remote(url, token).await;
        }
    }

    tracing::info!(url = %config.database.url, "Opening local database");
    TursoClient::new_local(&config.database.url).await
}

async fn serve(config_path: &Path, verbose: bool) -> anyhow::Result<()> {
    let mut config_manager = PicceConfigManager::new(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let config = config_manager.config();

    let log_level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    init_tracing(log_level, config.server.log_json);

    if let Err(e) = config_manager.start_watching() {
        tracing::warn!("Config hot reload disabled: {}", e);
    }

    let turso = connect_database(&config)
        .await
        .context("failed to open database")?;

    // The signing key is fixed for the process lifetime
    let auth_service = AuthService::new(config.jwt_secret()?);

    let state = AppState {
        config_manager: Arc::new(config_manager),
        turso: Arc::new(turso),
        auth_service: Arc::new(auth_service),
    };

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(create_router(state.clone()));

    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", picce::api::ApiDoc::openapi()),
        )
    };

    let app = app
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("PICCE API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
