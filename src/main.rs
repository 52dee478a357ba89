use facequiz::api::SupabaseClient;
use facequiz::config::{Config, ImageBackend, RecordBackend};
use facequiz::db::{RecordStore, SqliteRecords, SupabaseRecords};
use facequiz::server::router::{QuizState, RouterOptions, quiz_router};
use facequiz::service::upload::WatermarkSettings;
use facequiz::storage::{ImageStore, LocalImageStore, SupabaseImageStore};
use facequiz::templates::Templates;
use facequiz::watermark::CaptionFont;
use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load().inspect_err(|e| eprintln!("fatal: {e}"))?;
    let supabase = cfg.supabase()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        supabase_url = %supabase.url,
        record_backend = ?cfg.record_backend,
        image_backend = ?cfg.image_backend,
        key_scheme = ?cfg.key_scheme,
        loglevel = %cfg.loglevel
    );

    let client = SupabaseClient::new(&supabase)?;

    let mut sqlite: Option<SqliteRecords> = None;
    let records: Arc<dyn RecordStore> = match cfg.record_backend {
        RecordBackend::Supabase => Arc::new(SupabaseRecords::new(client.clone())),
        RecordBackend::Sqlite => {
            let store = SqliteRecords::connect(&cfg.database_url).await?;
            sqlite = Some(store.clone());
            Arc::new(store)
        }
    };

    let (images, static_files) = match cfg.image_backend {
        ImageBackend::Local => (
            Arc::new(LocalImageStore::new(&cfg.upload_dir, &cfg.public_prefix)) as Arc<dyn ImageStore>,
            Some((cfg.public_prefix.clone(), cfg.upload_dir.clone())),
        ),
        ImageBackend::Supabase => (
            Arc::new(SupabaseImageStore::new(client.clone(), &cfg.storage_bucket)) as Arc<dyn ImageStore>,
            None,
        ),
    };

    match records.count_members().await {
        Ok(count) => info!(count, "record store reachable"),
        Err(e) => warn!(error = %e, "record store check failed; are the tables created?"),
    }

    let watermark = WatermarkSettings {
        font: CaptionFont::load_or_builtin(cfg.watermark.font_path.as_deref()),
        caption: cfg.watermark.text.clone(),
        angle: cfg.watermark.angle,
    };

    let state = QuizState::new(records, images, Templates::new()?, watermark, cfg.key_scheme);
    let app = quiz_router(
        state,
        RouterOptions {
            max_upload_bytes: cfg.max_upload_bytes,
            static_files,
        },
    );

    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(store) = sqlite {
        store.close().await;
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
