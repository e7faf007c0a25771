// region:    --- Imports
use bidify::config::AppConfig;
use bidify::handlers::{self, AppState};
use bidify::storage::{KeyValueStore, MemoryStore, PostgresStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    // 저장소 생성 (DATABASE_URL 이 없으면 메모리 저장소)
    let store: Arc<dyn KeyValueStore> = match &config.database_url {
        Some(database_url) => {
            let store =
                PostgresStore::connect(database_url, config.database_max_connections).await?;
            if let Err(e) = store.initialize_database(config.reset_database).await {
                error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
                return Err(e.into());
            }
            info!("{:<12} --> 데이터베이스 초기화 성공", "Main");
            Arc::new(store)
        }
        None => {
            warn!(
                "{:<12} --> DATABASE_URL 미설정: 메모리 저장소 사용 (재시작 시 데이터 유실)",
                "Main"
            );
            Arc::new(MemoryStore::new())
        }
    };

    let routes_all = handlers::routes(AppState::new(store));

    // 리스너 생성
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
