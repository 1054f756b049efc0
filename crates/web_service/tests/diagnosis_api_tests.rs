use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::{http::header, test, web, App};
use async_trait::async_trait;
use diagnosis_core::{
    DiagnosisRequest, DiagnosisService, NoReferenceClassifier, ReferenceClassification,
    ReferenceClassifier, INVALID_ANIMAL_DISEASE, PROVENANCE_STANDALONE, PROVENANCE_WITH_REFERENCE,
};
use serde_json::{json, Value};
use vision_llm::{LLMError, ModelOutput, VisionProvider, VisionRequest};
use web_service::middleware::TracingMiddleware;
use web_service::server::{app_config, AppState};

const BOUNDARY: &str = "diagnosis-test-boundary";

enum Reply {
    Text(String),
    Fail(&'static str),
}

/// Vision model stand-in that records what it was asked.
struct StubModel {
    reply: Reply,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubModel {
    fn answering(diagnosis: Value) -> Self {
        Self {
            reply: Reply::Text(diagnosis.to_string()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &'static str) -> Self {
        Self {
            reply: Reply::Fail(message),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl VisionProvider for StubModel {
    async fn generate(&self, request: &VisionRequest<'_>) -> vision_llm::Result<ModelOutput> {
        self.calls.lock().unwrap().push((
            request.image.mime_type.to_string(),
            request.user_instruction.clone(),
        ));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Reply::Text(text) => Ok(ModelOutput {
                text: text.clone(),
                finish_reason: Some("STOP".to_string()),
            }),
            Reply::Fail(message) => Err(LLMError::Api(message.to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "stub-vision"
    }
}

struct FixedReference(ReferenceClassification);

#[async_trait]
impl ReferenceClassifier for FixedReference {
    async fn classify(&self, _request: &DiagnosisRequest) -> Option<ReferenceClassification> {
        Some(self.0.clone())
    }
}

fn mange_diagnosis() -> Value {
    json!({
        "detectedAnimal": "dog",
        "disease": "Mange",
        "confidence": 85,
        "severity": "moderate",
        "description": "Patchy alopecia with crusting.",
        "symptoms": ["Hair Loss", "Crusting"],
        "treatment": {
            "medication": "Ivermectin",
            "dosage": "As prescribed",
            "topical": "Lime sulfur dip",
            "additional": ["Wash bedding"]
        },
        "urgency": "See a vet this week",
        "allProbabilities": {"Healthy": 5, "Bacterial": 15, "Fungal": 10}
    })
}

enum Part<'a> {
    File {
        name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"photo\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn diagnose_request(parts: &[Part<'_>]) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/diagnose")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(parts))
}

fn full_form<'a>(symptoms: &'a str) -> Vec<Part<'a>> {
    vec![
        Part::File {
            name: "image",
            content_type: "image/png",
            data: b"\x89PNG fake",
        },
        Part::Text {
            name: "animalType",
            value: "dog",
        },
        Part::Text {
            name: "symptoms",
            value: symptoms,
        },
    ]
}

fn state_with(
    model: Arc<StubModel>,
    reference: Arc<dyn ReferenceClassifier>,
    deadline: Option<Duration>,
) -> web::Data<AppState> {
    let service = DiagnosisService::new(model, reference);
    web::Data::new(AppState::new(Arc::new(service)).with_deadline(deadline))
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state)
                .wrap(TracingMiddleware)
                .configure(app_config),
        )
        .await
    };
}

#[actix_web::test]
async fn test_liveness_route() {
    let model = Arc::new(StubModel::answering(mange_diagnosis()));
    let app = init_app!(state_with(model, Arc::new(NoReferenceClassifier), None));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert!(resp.status().is_success());
    let body = test::read_body(resp).await;
    assert_eq!(&body[..], b"Server is running!");
}

#[actix_web::test]
async fn test_diagnose_with_reference() {
    let model = Arc::new(StubModel::answering(mange_diagnosis()));
    let reference = Arc::new(FixedReference(ReferenceClassification {
        label: "Mange".to_string(),
        confidence_score: 70.0,
    }));
    let app = init_app!(state_with(model.clone(), reference, None));

    let req = diagnose_request(&full_form(r#"["Itching","Hair Loss"]"#)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["disease"], "Mange");
    assert_eq!(body["confidence"], 85.0);
    assert_eq!(body["treatment"]["additional"][0], "Wash bedding");
    assert_eq!(body["modelUsed"], PROVENANCE_WITH_REFERENCE);
    assert_eq!(body["cnnReference"]["disease"], "Mange");
    assert_eq!(body["cnnReference"]["confidence"], 70.0);
    assert!(body["completedAt"].is_string());
    assert!(body["analysisTime"].is_string());
    assert!(body["processingTimeMs"].is_u64());

    let calls = model.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "image/png");
    assert!(calls[0].1.contains("Itching, Hair Loss"));
}

#[actix_web::test]
async fn test_diagnose_standalone_has_null_reference() {
    let model = Arc::new(StubModel::answering(mange_diagnosis()));
    let app = init_app!(state_with(model, Arc::new(NoReferenceClassifier), None));

    let resp = test::call_service(&app, diagnose_request(&full_form("itchy")).to_request()).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["modelUsed"], PROVENANCE_STANDALONE);
    assert!(body["cnnReference"].is_null());
}

#[actix_web::test]
async fn test_unsupported_animal_sentinels() {
    let mut horse = mange_diagnosis();
    horse["detectedAnimal"] = json!("other");
    let model = Arc::new(StubModel::answering(horse));
    let app = init_app!(state_with(model, Arc::new(NoReferenceClassifier), None));

    let resp = test::call_service(&app, diagnose_request(&full_form("")).to_request()).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["disease"], INVALID_ANIMAL_DISEASE);
    assert_eq!(body["severity"], "N/A");
    assert_eq!(body["urgency"], "N/A");
}

#[actix_web::test]
async fn test_missing_image_is_bad_request() {
    let model = Arc::new(StubModel::answering(mange_diagnosis()));
    let app = init_app!(state_with(model.clone(), Arc::new(NoReferenceClassifier), None));

    let parts = [Part::Text {
        name: "animalType",
        value: "cat",
    }];
    let resp = test::call_service(&app, diagnose_request(&parts).to_request()).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Image required");
    assert_eq!(model.call_count(), 0);
}

#[actix_web::test]
async fn test_missing_animal_type_is_bad_request() {
    let model = Arc::new(StubModel::answering(mange_diagnosis()));
    let app = init_app!(state_with(model.clone(), Arc::new(NoReferenceClassifier), None));

    let parts = [Part::File {
        name: "image",
        content_type: "image/jpeg",
        data: b"jpeg",
    }];
    let resp = test::call_service(&app, diagnose_request(&parts).to_request()).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "animalType required");
    assert_eq!(model.call_count(), 0);
}

#[actix_web::test]
async fn test_model_failure_is_server_error() {
    let model = Arc::new(StubModel::failing("Gemini API error: HTTP 503"));
    let app = init_app!(state_with(model, Arc::new(NoReferenceClassifier), None));

    let resp = test::call_service(&app, diagnose_request(&full_form("[]")).to_request()).await;
    assert_eq!(resp.status(), 500);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Diagnosis service unavailable");
    assert!(body["details"].as_str().unwrap().contains("HTTP 503"));
}

#[actix_web::test]
async fn test_invalid_model_output_is_server_error() {
    let mut incomplete = mange_diagnosis();
    incomplete.as_object_mut().unwrap().remove("urgency");
    let model = Arc::new(StubModel::answering(incomplete));
    let app = init_app!(state_with(model, Arc::new(NoReferenceClassifier), None));

    let resp = test::call_service(&app, diagnose_request(&full_form("[]")).to_request()).await;
    assert_eq!(resp.status(), 500);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Diagnosis service unavailable");
    assert!(body["details"].as_str().unwrap().contains("`urgency`"));
}

#[actix_web::test]
async fn test_deadline_exceeded_is_server_error() {
    let model =
        Arc::new(StubModel::answering(mange_diagnosis()).with_delay(Duration::from_secs(5)));
    let app = init_app!(state_with(
        model,
        Arc::new(NoReferenceClassifier),
        Some(Duration::from_millis(100))
    ));

    let resp = test::call_service(&app, diagnose_request(&full_form("[]")).to_request()).await;
    assert_eq!(resp.status(), 500);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Diagnosis service unavailable");
    assert!(body["details"].as_str().unwrap().contains("did not finish"));
}

#[actix_web::test]
async fn test_trace_id_is_echoed() {
    let model = Arc::new(StubModel::answering(mange_diagnosis()));
    let app = init_app!(state_with(model, Arc::new(NoReferenceClassifier), None));

    let req = test::TestRequest::get()
        .uri("/")
        .insert_header(("X-Trace-Id", "trace-123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.headers().get("x-trace-id").and_then(|v| v.to_str().ok()),
        Some("trace-123")
    );

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert!(resp.headers().contains_key("x-trace-id"));

    // A blank incoming id is replaced by a generated one.
    let req = test::TestRequest::get()
        .uri("/")
        .insert_header(("X-Trace-Id", "   "))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let echoed = resp
        .headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(!echoed.trim().is_empty());
}
