use crate::{
    app::{AppError, PreferencesSummary, SearchRequest, SearchResponse, Session},
    config::Config,
    personalization::{BoostWeights, UserProfile},
    search::{CategoryRecommendation, ItemId, SearchError, SearchHit},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::{signal, sync::RwLock};

#[derive(Clone)]
struct SharedState {
    session: Arc<RwLock<Session>>,
}

pub fn router(session: Session) -> Router {
    let shared_state = Arc::new(SharedState {
        session: Arc::new(RwLock::new(session)),
    });

    Router::new()
        .route("/api/search", post(search))
        .route("/api/personalize", post(personalize))
        .route("/api/click", post(click))
        .route("/api/reset", post(reset))
        .route("/api/preferences", get(preferences))
        .route("/api/recommendations", get(recommendations))
        .route("/api/config", get(get_config))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

async fn start_app(session: Session) -> anyhow::Result<()> {
    let listen = session.config().web.listen.clone();
    let app = router(session);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    log::info!("listening on {listen}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(session: Session) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { start_app(session).await })
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidId(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Search(SearchError::IndexNotFound | SearchError::ModelNotLoaded) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Search(_) | AppError::Preference(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let session = state.session.clone();

    tokio::task::block_in_place(move || {
        let session = session.blocking_read();
        session.search(&payload).map(Into::into).map_err(Into::into)
    })
}

#[derive(Debug, Deserialize)]
pub struct PersonalizeRequest {
    pub results: Vec<SearchHit>,

    /// Defaults to the session's click history
    #[serde(default)]
    pub click_history: Option<Vec<i64>>,

    /// Defaults to the configured boosts
    #[serde(default)]
    pub weights: Option<BoostWeights>,
}

async fn personalize(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<PersonalizeRequest>,
) -> Json<Vec<SearchHit>> {
    log::debug!("payload: {payload:?}");

    let session = state.session.read().await;
    session
        .personalize(
            &payload.results,
            payload.click_history.as_deref(),
            payload.weights,
        )
        .into()
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    pub id: ItemId,
}

#[derive(Debug, Serialize)]
pub struct ClickResponse {
    pub total_clicks: usize,
    pub profile: UserProfile,
}

async fn click(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ClickRequest>,
) -> Result<Json<ClickResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let id = payload
        .id
        .as_int()
        .ok_or_else(|| AppError::InvalidId(payload.id.to_string()))?;
    let session = state.session.clone();

    tokio::task::block_in_place(move || {
        let mut session = session.blocking_write();
        let profile = session.click(id)?;

        Ok(ClickResponse {
            total_clicks: session.click_history().len(),
            profile,
        }
        .into())
    })
}

async fn reset(
    State(state): State<Arc<SharedState>>,
) -> Result<Json<PreferencesSummary>, HttpError> {
    let session = state.session.clone();

    tokio::task::block_in_place(move || {
        let mut session = session.blocking_write();
        session.reset()?;
        Ok(session.preferences().into())
    })
}

async fn preferences(State(state): State<Arc<SharedState>>) -> Json<PreferencesSummary> {
    state.session.read().await.preferences().into()
}

async fn recommendations(
    State(state): State<Arc<SharedState>>,
) -> Json<Vec<CategoryRecommendation>> {
    state.session.read().await.recommendations().into()
}

async fn get_config(State(state): State<Arc<SharedState>>) -> Json<Config> {
    state.session.read().await.config().clone().into()
}
