use axum::{extract::State, response::Html};
use minijinja::context;
use tracing::warn;

use crate::db::LEADERBOARD_LIMIT;
use crate::error::QuizError;
use crate::server::router::QuizState;
use crate::service::quiz::pick_session;

const QUIZ_LOAD_FAILED: &str = "Quiz data could not be loaded.";

/// GET / -> member gallery. A failed read shows an empty gallery.
pub async fn index(State(state): State<QuizState>) -> Result<Html<String>, QuizError> {
    let members = state.records.list_members().await.unwrap_or_else(|e| {
        warn!(error = %e, "gallery: failed to load members");
        Vec::new()
    });
    let html = state.templates.render(
        "index.html",
        context! { member_count => members.len(), members => members },
    )?;
    Ok(Html(html))
}

/// GET /quiz -> a shuffled session of up to ten members.
pub async fn quiz(State(state): State<QuizState>) -> Result<Html<String>, QuizError> {
    let loaded = state.records.list_members().await;
    let ctx = match loaded.map(|members| pick_session(members, &mut rand::thread_rng())) {
        Ok(Ok(session)) => context! { members => session },
        Ok(Err(unavailable)) => context! {
            members => Vec::<()>::new(),
            error => unavailable.to_string(),
        },
        Err(e) => {
            warn!(error = %e, "quiz: failed to load members");
            context! { members => Vec::<()>::new(), error => QUIZ_LOAD_FAILED }
        }
    };
    Ok(Html(state.templates.render("quiz.html", ctx)?))
}

/// GET /upload -> registration form.
pub async fn upload_page(State(state): State<QuizState>) -> Result<Html<String>, QuizError> {
    Ok(Html(state.templates.render("upload.html", context! {})?))
}

/// GET /leaderboard -> top scores. A failed read shows an empty board.
pub async fn leaderboard(State(state): State<QuizState>) -> Result<Html<String>, QuizError> {
    let scores = state
        .records
        .top_scores(LEADERBOARD_LIMIT)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "leaderboard: failed to load scores");
            Vec::new()
        });
    Ok(Html(
        state
            .templates
            .render("leaderboard.html", context! { scores => scores })?,
    ))
}
