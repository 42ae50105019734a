/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    notify::{LogNotifier, Notifier, WebhookNotifier},
    routes,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskboard_shared::auth::middleware::authenticate_bearer;
use taskboard_shared::tasks::TaskRules;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through the `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// State with the notifier selected by `config.notify`
    pub fn new(db: PgPool, config: Config) -> Self {
        let notifier: Arc<dyn Notifier> = match &config.notify.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
            None => Arc::new(LogNotifier),
        };

        Self {
            db,
            config: Arc::new(config),
            notifier,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    pub fn task_rules(&self) -> TaskRules {
        self.config.task_rules()
    }
}

/// Builds the complete router
///
/// ```text
/// /health                                  GET     (public)
/// /v1/auth/login                           POST    (public)
/// /v1/auth/register                        POST    (public)
/// /v1/auth/reset-password                  POST    (public)
/// /v1/auth/me                              GET
/// /v1/auth/switch-organization             POST
/// /v1/auth/change-password                 POST
/// /v1/tasks                                GET, POST
/// /v1/tasks/:id                            GET, PUT, DELETE
/// /v1/tasks/:id/status                     PUT
/// /v1/tasks/:id/assignees                  PUT
/// /v1/tasks/:id/history                    GET
/// /v1/users                                GET, POST
/// /v1/users/:id                            PUT, DELETE
/// /v1/users/:id/deactivate                 POST
/// /v1/users/:id/reset-password             POST
/// /v1/organizations                        GET, POST
/// /v1/organizations/:id                    GET
/// /v1/organizations/:id/settings           PUT
/// /v1/organizations/:id/deactivate         POST
/// ```
///
/// Everything except `/health`, login, registration and token reset runs
/// behind [`jwt_auth_layer`].
pub fn build_router(state: AppState) -> Router {
    let auth = || axum::middleware::from_fn_with_state(state.clone(), jwt_auth_layer);

    let auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route("/switch-organization", post(routes::auth::switch_organization))
        .route("/change-password", post(routes::auth::change_password))
        .route_layer(auth())
        .route("/login", post(routes::auth::login))
        .route("/register", post(routes::auth::register))
        .route("/reset-password", post(routes::auth::reset_password));

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_tasks).post(routes::tasks::create_task))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/status", put(routes::tasks::set_status))
        .route("/:id/assignees", put(routes::tasks::set_assignees))
        .route("/:id/history", get(routes::tasks::history))
        .layer(auth());

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users).post(routes::users::create_user))
        .route(
            "/:id",
            put(routes::users::update_user).delete(routes::users::purge_user),
        )
        .route("/:id/deactivate", post(routes::users::deactivate_user))
        .route("/:id/reset-password", post(routes::users::reset_password))
        .layer(auth());

    let organization_routes = Router::new()
        .route(
            "/",
            get(routes::organizations::list_organizations)
                .post(routes::organizations::create_organization),
        )
        .route("/:id", get(routes::organizations::get_organization))
        .route("/:id/settings", put(routes::organizations::update_settings))
        .route(
            "/:id/deactivate",
            post(routes::organizations::deactivate_organization),
        )
        .layer(auth());

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/users", user_routes)
        .nest("/organizations", organization_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors_layer(&state.config.api.cors_origins))
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Bearer-token middleware
///
/// Verifies the token, reloads the user and inserts the resulting
/// `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = authenticate_bearer(&state.db, state.jwt_secret(), req.headers()).await?;

    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
