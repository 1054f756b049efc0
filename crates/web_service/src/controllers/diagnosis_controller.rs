use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::{post, web, HttpResponse};
use diagnosis_core::{DiagnosisRequest, ReportedSymptoms};
use futures_util::TryStreamExt;

use crate::error::{AppError, Result};
use crate::server::AppState;

const MAX_IMAGE_BYTES: usize = 16 * 1024 * 1024;
const MAX_TEXT_BYTES: usize = 64 * 1024;
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(diagnose);
}

/// Multipart fields of a diagnosis request, before validation.
#[derive(Debug, Default)]
struct DiagnoseForm {
    image: Option<(Vec<u8>, String)>,
    animal_type: Option<String>,
    symptoms: Option<String>,
}

impl DiagnoseForm {
    fn into_request(self) -> Result<DiagnosisRequest> {
        let (image_bytes, mime_type) = self
            .image
            .filter(|(bytes, _)| !bytes.is_empty())
            .ok_or_else(|| AppError::BadRequest("Image required".to_string()))?;

        let animal_type = self
            .animal_type
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::BadRequest("animalType required".to_string()))?;

        let symptoms = self
            .symptoms
            .map(|raw| ReportedSymptoms::parse_form_value(&raw))
            .unwrap_or_default();

        Ok(DiagnosisRequest::new(image_bytes, mime_type)
            .with_animal_type(animal_type)
            .with_symptoms(symptoms))
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::Multipart(err.to_string())
}

async fn read_field(field: &mut Field, name: &str, limit: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        if buf.len() + chunk.len() > limit {
            return Err(AppError::BadRequest(format!(
                "Field '{name}' exceeds {limit} bytes"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

async fn read_text(field: &mut Field, name: &str) -> Result<String> {
    let bytes = read_field(field, name, MAX_TEXT_BYTES).await?;
    String::from_utf8(bytes)
        .map_err(|_| AppError::BadRequest(format!("Field '{name}' is not valid UTF-8")))
}

async fn read_form(mut payload: Multipart) -> Result<DiagnoseForm> {
    let mut form = DiagnoseForm::default();

    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let mime_type = field
                    .content_type()
                    .map(|mime| mime.essence_str().to_string())
                    .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
                let bytes = read_field(&mut field, &name, MAX_IMAGE_BYTES).await?;
                form.image = Some((bytes, mime_type));
            }
            "animalType" => form.animal_type = Some(read_text(&mut field, &name).await?),
            "symptoms" => form.symptoms = Some(read_text(&mut field, &name).await?),
            _ => {
                log::debug!("Ignoring unknown multipart field '{}'", name);
                read_field(&mut field, &name, MAX_IMAGE_BYTES).await?;
            }
        }
    }

    Ok(form)
}

/// Diagnose an uploaded animal photo.
#[post("/diagnose")]
pub async fn diagnose(payload: Multipart, state: web::Data<AppState>) -> Result<HttpResponse> {
    let request = read_form(payload).await?.into_request()?;

    let service = state.diagnosis_service.clone();
    let result = match state.diagnosis_deadline {
        Some(deadline) => tokio::time::timeout(deadline, service.diagnose(&request))
            .await
            .map_err(|_| {
                log::error!("Diagnosis exceeded the {:?} deadline, abandoning request", deadline);
                AppError::DeadlineExceeded(deadline)
            })??,
        None => service.diagnose(&request).await?,
    };

    Ok(HttpResponse::Ok().json(result))
}
