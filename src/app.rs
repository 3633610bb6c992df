//! Web form
//!
//! Routes:
//! - `GET /`: the entry form, prefilled with the remembered name and a
//!   banner for the `status` query parameter
//! - `POST /submit`: records one entry, then redirects back to `/` with the
//!   outcome in `status`
//! - `GET /export.csv`: the whole tab as CSV
//! - `/static/*`: stylesheet and other assets from `static/`
//!
//! In `session` memory mode the `session` cookie is only honoured when its
//! id was issued by this server and has not expired; otherwise a new id is
//! issued with the response.

use axum::{
    Form, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::{error, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::{Config, MemoryMode};
use crate::downloader;
use crate::entry::EntryWriter;
use crate::error::SubmitError;
use crate::memory::{NameMemory, SessionNameMemory, session_is_active, start_session};
use crate::store::TableStore;

const SESSION_COOKIE: &str = "session";

pub type SharedWriter = Arc<EntryWriter<Box<dyn TableStore + Send>>>;

/// State shared by every handler
pub struct AppState {
    pub writer: SharedWriter,
    pub memory_mode: MemoryMode,
    /// Set for the `file` and `shared` memory modes
    pub name_memory: Option<Box<dyn NameMemory>>,
    pub tab: String,
}

/// Form fields posted by the entry form
#[derive(Debug, Deserialize)]
pub struct EntryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub reference: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct FormQuery {
    pub name: Option<String>,
    pub status: Option<String>,
}

/// Result of a submission, carried to the form page in the `status` query
/// parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Submitted,
    Duplicate,
    Missing,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Submitted => "submitted",
            Outcome::Duplicate => "duplicate",
            Outcome::Missing => "missing",
            Outcome::Failed => "error",
        }
    }

    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "submitted" => Some(Outcome::Submitted),
            "duplicate" => Some(Outcome::Duplicate),
            "missing" => Some(Outcome::Missing),
            "error" => Some(Outcome::Failed),
            _ => None,
        }
    }

    fn banner(&self) -> (&'static str, &'static str) {
        match self {
            Outcome::Submitted => ("success", "Entry submitted successfully!"),
            Outcome::Duplicate => ("error", "This email already exists in the sheet."),
            Outcome::Missing => ("warning", "Please fill in all fields."),
            Outcome::Failed => ("error", "Could not reach the sheet. Please try again later."),
        }
    }
}

impl AppState {
    pub fn new(config: &Config, writer: SharedWriter) -> Self {
        AppState {
            writer,
            memory_mode: config.memory.mode,
            name_memory: config.name_memory(),
            tab: config.storage.tab.clone(),
        }
    }

    /// Name to prefill, according to the configured memory mode.
    fn recall_name(&self, query: &FormQuery, jar: &CookieJar) -> Option<String> {
        match self.memory_mode {
            MemoryMode::Query => query.name.clone().filter(|n| !n.trim().is_empty()),
            MemoryMode::Session => jar
                .get(SESSION_COOKIE)
                .and_then(|cookie| SessionNameMemory::new(cookie.value()).recall()),
            MemoryMode::File | MemoryMode::Shared => {
                self.name_memory.as_ref().and_then(|memory| memory.recall())
            }
        }
    }

    /// Stores the name; returns the cookie jar to send back.
    fn remember_name(&self, name: &str, jar: CookieJar) -> CookieJar {
        let (jar, result) = match self.memory_mode {
            MemoryMode::Query => (jar, Ok(())),
            MemoryMode::Session => {
                let known = jar
                    .get(SESSION_COOKIE)
                    .map(|cookie| cookie.value().to_string())
                    .filter(|id| session_is_active(id));
                match known {
                    Some(id) => (jar, SessionNameMemory::new(id).remember(name)),
                    None => match start_session() {
                        Ok(id) => {
                            let result = SessionNameMemory::new(id.clone()).remember(name);
                            let mut cookie = Cookie::new(SESSION_COOKIE, id);
                            cookie.set_path("/");
                            cookie.set_http_only(true);
                            (jar.add(cookie), result)
                        }
                        Err(e) => (jar, Err(e)),
                    },
                }
            }
            MemoryMode::File | MemoryMode::Shared => match &self.name_memory {
                Some(memory) => (jar, memory.remember(name)),
                None => (jar, Ok(())),
            },
        };
        if let Err(e) = result {
            warn!("Could not remember submitter name: {}", e);
        }
        jar
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_form))
        .route("/submit", post(handle_submit))
        .route("/export.csv", get(export_csv))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

/// Open the configured store and serve the form until the process exits.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = config.open_store()?;
    info!("Using table {}", store.name());
    let writer: SharedWriter = Arc::new(EntryWriter::new(store, config.layout)?);

    let state = Arc::new(AppState::new(&config, writer));
    let app = router(state);

    let listener = TcpListener::bind(&config.server.bind).await?;
    info!("Listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Fill the form template with the remembered name and an outcome banner.
pub fn render_form(tab: &str, name: Option<&str>, outcome: Option<Outcome>) -> String {
    let banner = match outcome {
        Some(outcome) => {
            let (class, message) = outcome.banner();
            format!("<p class=\"banner {}\">{}</p>", class, message)
        }
        None => String::new(),
    };

    fill_template(
        include_str!("./static/form.html"),
        &[
            ("tab", &escape_html(tab)),
            ("banner", &banner),
            ("name", &escape_html(name.unwrap_or(""))),
        ],
    )
}

/// Replace each `{{key}}` in `template` with its value in one pass, so
/// substituted text is never scanned for placeholders again. Unknown keys
/// are left as they are.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

async fn serve_form(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FormQuery>,
    jar: CookieJar,
) -> Html<String> {
    let name = state.recall_name(&query, &jar);
    let outcome = query.status.as_deref().and_then(Outcome::parse);
    Html(render_form(&state.tab, name.as_deref(), outcome))
}

fn redirect_to_form(mode: MemoryMode, name: &str, outcome: Outcome) -> Redirect {
    let mut location = format!("/?status={}", outcome.as_str());
    if mode == MemoryMode::Query && !name.is_empty() {
        location.push_str("&name=");
        location.push_str(&urlencoding::encode(name));
    }
    Redirect::to(&location)
}

async fn handle_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<EntryForm>,
) -> Response {
    let name = form.name.trim().to_string();
    let email = form.email.trim().to_string();
    let reference = form.reference.trim().to_string();

    if name.is_empty() || email.is_empty() || reference.is_empty() {
        return redirect_to_form(state.memory_mode, &name, Outcome::Missing).into_response();
    }

    let jar = state.remember_name(&name, jar);

    let writer = state.writer.clone();
    let submitted_name = name.clone();
    let result =
        tokio::task::spawn_blocking(move || writer.submit(&submitted_name, &email, &reference))
            .await;

    let outcome = match result {
        Ok(Ok(_row)) => Outcome::Submitted,
        Ok(Err(SubmitError::DuplicateEmail { .. })) => Outcome::Duplicate,
        Ok(Err(e)) => {
            error!("Submission failed: {}", e);
            Outcome::Failed
        }
        Err(e) => {
            error!("Submission task failed: {}", e);
            Outcome::Failed
        }
    };

    (jar, redirect_to_form(state.memory_mode, &name, outcome)).into_response()
}

async fn export_csv(State(state): State<Arc<AppState>>) -> Response {
    let writer = state.writer.clone();
    match tokio::task::spawn_blocking(move || writer.snapshot()).await {
        Ok(Ok(table)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"outreach.csv\"",
                ),
            ],
            downloader::to_csv(&table),
        )
            .into_response(),
        Ok(Err(e)) => {
            error!("Export failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable").into_response()
        }
        Err(e) => {
            error!("Export task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Export failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn outcome_status_round_trip() {
        for outcome in [
            Outcome::Submitted,
            Outcome::Duplicate,
            Outcome::Missing,
            Outcome::Failed,
        ] {
            assert_eq!(Outcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(Outcome::parse("bogus"), None);
    }

    #[test]
    fn rendered_form_carries_name_and_banner() {
        let html = render_form("Outreach Data", Some("Ann <admin>"), Some(Outcome::Duplicate));
        assert!(html.contains("value=\"Ann &lt;admin&gt;\""));
        assert!(html.contains("This email already exists in the sheet."));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn placeholder_text_in_values_stays_literal() {
        let html = render_form("{{banner}}", Some("{{tab}}"), None);
        assert!(html.contains("{{banner}}"));
        assert!(html.contains("value=\"{{tab}}\""));
        assert!(!html.contains("class=\"banner"));

        let filled = fill_template("{{a}}-{{b}}-{{c}}", &[("a", "{{b}}"), ("b", "x")]);
        assert_eq!(filled, "{{b}}-x-{{c}}");
        assert_eq!(fill_template("open {{a", &[("a", "x")]), "open {{a");
    }

    #[test]
    fn query_mode_redirect_keeps_name() {
        let response = redirect_to_form(MemoryMode::Query, "Ann Lee", Outcome::Submitted).into_response();
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert_eq!(location, "/?status=submitted&name=Ann%20Lee");

        let response = redirect_to_form(MemoryMode::File, "Ann Lee", Outcome::Submitted).into_response();
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert_eq!(location, "/?status=submitted");
    }
}
