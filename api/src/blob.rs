//! Blob-storage collaborator: files are proxied to an external upload
//! endpoint and only the returned URL/format are ever kept.

use axum::{Json, extract::Multipart, extract::State};
use reqwest::multipart;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::{ApiResult, validation};

#[derive(Clone, Debug)]
pub struct BlobStorage {
    client: reqwest::Client,
    upload_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedBlob {
    pub url: String,
    pub format: String,
}

impl BlobStorage {
    pub fn new(upload_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: upload_url.into(),
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("BLOB_UPLOAD_URL").ok().map(Self::new)
    }

    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        folder: &str,
    ) -> Result<UploadedBlob, reqwest::Error> {
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new()
            .text("folder", folder.to_string())
            .part("file", part);
        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        response.json::<UploadedBlob>().await
    }
}

pub async fn upload(
    State(state): State<AppState>,
    mut parts: Multipart,
) -> ApiResult<Json<UploadedBlob>> {
    let Some(blob) = state.blob.as_ref() else {
        return Err(validation("blob storage is not configured"));
    };

    let mut folder = "uploads".to_string();
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = parts
        .next_field()
        .await
        .map_err(|err| validation(format!("invalid multipart payload: {}", err)))?
    {
        match field.name() {
            Some("folder") => {
                folder = field
                    .text()
                    .await
                    .map_err(|err| validation(format!("invalid folder field: {}", err)))?;
            }
            Some("file") => {
                let file_name = field
                    .file_name()
                    .unwrap_or("upload.bin")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| validation(format!("invalid file field: {}", err)))?;
                file = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }
    let Some((file_name, bytes)) = file else {
        return Err(validation("a file field is required"));
    };
    let uploaded = blob.upload(&file_name, bytes, &folder).await?;
    Ok(Json(uploaded))
}
