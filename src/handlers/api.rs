use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::db::{Member, NewMember};
use crate::error::QuizError;
use crate::server::router::QuizState;
use crate::service::quiz::QuizSubmission;
use crate::service::upload::{PhotoPart, UploadForm, register_member};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub member: NewMember,
}

/// POST /api/upload_member -> watermark the photo, store it, record the member.
pub async fn upload_member(
    State(state): State<QuizState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, QuizError> {
    let form = read_upload_form(multipart?).await?;
    let member = register_member(
        state.records.as_ref(),
        state.images.as_ref(),
        state.watermark.clone(),
        state.key_scheme,
        form,
    )
    .await?;

    Ok(Json(UploadResponse {
        success: true,
        message: format!("{} has been registered!", member.name),
        member,
    }))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, QuizError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" => form.name = Some(field.text().await?),
            "bio" => form.bio = Some(field.text().await?),
            "photo" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.photo = Some(PhotoPart { filename, bytes });
            }
            _ => {}
        }
    }
    Ok(form)
}

/// POST /api/quiz_submit -> record one finished quiz.
pub async fn quiz_submit(
    State(state): State<QuizState>,
    payload: Result<Json<QuizSubmission>, JsonRejection>,
) -> Result<Json<Value>, QuizError> {
    let Json(submission) = payload?;
    let score = submission.into_score(Utc::now())?;
    state.records.insert_score(&score).await?;
    info!(user = %score.user_name, accuracy = score.accuracy, "score recorded");
    Ok(Json(json!({ "success": true })))
}

/// GET /api/members -> every member; a failed read yields an empty list.
pub async fn members(State(state): State<QuizState>) -> Json<Vec<Member>> {
    match state.records.list_members().await {
        Ok(members) => Json(members),
        Err(e) => {
            warn!(error = %e, "api: failed to load members");
            Json(Vec::new())
        }
    }
}
