//! Audio upload endpoints (multipart).

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use rapshare_common::{AppError, AppResult};
use rapshare_core::{AudioFile, UploadBeatInput, UploadRecordingInput};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{BeatResponse, RecordingResponse},
};

/// Fields of an upload form, before per-kind validation.
#[derive(Default)]
struct UploadForm {
    file: Option<AudioFile>,
    title: Option<String>,
    bpm: Option<String>,
    beat_id: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();

            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?
                        .to_vec();
                    form.file = Some(AudioFile {
                        name: file_name,
                        content_type,
                        data,
                    });
                }
                "title" | "bpm" | "beatId" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    if text.is_empty() || text == "null" {
                        continue;
                    }
                    match name.as_str() {
                        "title" => form.title = Some(text),
                        "bpm" => form.bpm = Some(text),
                        _ => form.beat_id = Some(text),
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn take_file(&mut self) -> AppResult<AudioFile> {
        self.file
            .take()
            .ok_or_else(|| AppError::BadRequest("Missing file field".to_string()))
    }

    fn take_title(&mut self) -> AppResult<String> {
        self.title
            .take()
            .ok_or_else(|| AppError::BadRequest("Missing title field".to_string()))
    }

    fn bpm(&self) -> AppResult<Option<i32>> {
        self.bpm
            .as_deref()
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("Invalid bpm: {s}")))
            })
            .transpose()
    }
}

/// Upload a beat.
async fn upload_beat(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<BeatResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let input = UploadBeatInput {
        bpm: form.bpm()?,
        file: form.take_file()?,
        title: form.take_title()?,
    };

    let beat = state.content_service.upload_beat(&user, input).await?;
    Ok(Json(beat.into()))
}

/// Upload a recording.
async fn upload_recording(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<RecordingResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let input = UploadRecordingInput {
        file: form.take_file()?,
        title: form.take_title()?,
        beat_id: form.beat_id.take(),
    };

    let recording = state
        .content_service
        .upload_recording(&user, input)
        .await?;
    Ok(Json(recording.into()))
}

/// Upload routes. The overall request size is capped by the server's body
/// limit layer, so axum's default 2MB cap is lifted here.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/beats", post(upload_beat))
        .route("/recordings", post(upload_recording))
        .layer(DefaultBodyLimit::disable())
}
