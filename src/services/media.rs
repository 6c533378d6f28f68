//! Armazenamento externo das fotos de perfil (Cloudinary).
//!
//! O upload é um POST assinado: os parâmetros assinados são ordenados
//! alfabeticamente, unidos com `&`, concatenados ao api secret e passados
//! por SHA-256.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::common::{error::AppError, retry::RetryPolicy};

pub const PROFILE_FOLDER: &str = "biblioverso/perfiles";
pub const PROFILE_TRANSFORMATION: &str = "c_fill,g_face,h_400,w_400";

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Publica a foto (`data:image/...`) e devolve a URL segura.
    async fn upload_profile_photo(&self, user_id: i64, data_url: &str) -> Result<String, AppError>;
}

/// Credenciais da conta Cloudinary.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout: Duration,
}

impl CloudinaryConfig {
    /// Prazo do upload: o timeout do cliente HTTP mais uma folga, para o
    /// erro do reqwest chegar antes do corte. Uma retentativa no máximo.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: 1,
            ..RetryPolicy::default()
        }
        .with_call_timeout(self.timeout + Duration::from_secs(1))
    }
}

pub struct CloudinaryStore {
    client: Client,
    config: CloudinaryConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Falha ao criar cliente HTTP: {}", e))?;
        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        format!("https://api.cloudinary.com/v1_1/{}/image/upload", self.config.cloud_name)
    }

    /// Timeouts e falhas de conexão valem retentativa.
    fn is_retryable(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }
}

pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload_profile_photo(&self, user_id: i64, data_url: &str) -> Result<String, AppError> {
        let signed = vec![
            ("folder", PROFILE_FOLDER.to_string()),
            ("overwrite", "true".to_string()),
            ("public_id", format!("usuario_{user_id}")),
            ("timestamp", Utc::now().timestamp().to_string()),
            ("transformation", PROFILE_TRANSFORMATION.to_string()),
        ];
        let signature = sign(&signed, &self.config.api_secret);

        let mut form: Vec<(&str, String)> = signed;
        form.push(("file", data_url.to_string()));
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        let response = self
            .client
            .post(self.upload_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if Self::is_retryable(&e) {
                    AppError::Unavailable(format!("cloudinary: {e}"))
                } else {
                    AppError::InternalServerError(anyhow::anyhow!("Falha no upload: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AppError::Unavailable(format!("cloudinary respondeu {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(user_id, %status, "Upload de foto recusado: {}", body);
            return Err(AppError::BadRequest("La imagen no pudo ser procesada.".to_string()));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Resposta inesperada do Cloudinary: {}", e))?;

        tracing::info!(user_id, "Foto de perfil publicada");
        Ok(uploaded.secure_url)
    }
}

/// Usado quando as credenciais do Cloudinary não estão configuradas.
pub struct DisabledMediaStore;

#[async_trait]
impl MediaStore for DisabledMediaStore {
    async fn upload_profile_photo(&self, _user_id: i64, _data_url: &str) -> Result<String, AppError> {
        Err(AppError::BadRequest(
            "La carga de fotos no está habilitada.".to_string(),
        ))
    }
}
