//! # API REST
//!
//! REST API for the EMR terminology service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS, bearer tokens)
//!
//! Uses `api-shared` for request/response types and role checks, and `emr-core` for the
//! encounter workflow.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod store;

pub use error::ApiError;
pub use store::BundleStore;

use api_shared::{
    authorise, BundleRes, ComposeBundleReq, DoctorDto, ErrorRes, HealthRes, HealthService,
    ListDoctorsRes, ListPatientsRes, LoginReq, LoginRes, PatientDto, SearchRes, TranslateReq,
    TranslateRes, UploadBundleRes, ValidationErrorRes,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use emr_core::{
    ApiClient, AuthProvider, Backend, Clock, CoreConfig, Credentials, DemoAuthProvider,
    DoctorRepository, EmrError, EmrResult, EncounterDraft, EncounterForm, HttpAuthProvider,
    HttpDoctorRepository, HttpPatientRepository, MockDoctorRepository, MockPatientRepository,
    PatientRepository, RouteGroup, SystemClock, User,
};
use fhir::Bundle;
use serde::Deserialize;
use std::sync::Arc;
use terminology::ConceptTables;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub tables: Arc<ConceptTables>,
    pub auth: Arc<dyn AuthProvider>,
    pub patients: Arc<dyn PatientRepository>,
    pub doctors: Arc<dyn DoctorRepository>,
    pub bundles: Arc<BundleStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// State backed by the demo accounts and the seeded patient/doctor lists.
    pub fn demo(tables: Arc<ConceptTables>) -> Self {
        Self {
            tables,
            auth: Arc::new(DemoAuthProvider::new()),
            patients: Arc::new(MockPatientRepository::new()),
            doctors: Arc::new(MockDoctorRepository::new()),
            bundles: Arc::new(BundleStore::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// State for the backend selected by `EMR_BACKEND`.
    ///
    /// `http` routes login, token checks and the patient/doctor gateways to the upstream API at
    /// `EMR_API_BASE_URL`; the gateways authenticate with `EMR_API_TOKEN` when it is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn from_config(cfg: &CoreConfig, tables: Arc<ConceptTables>) -> EmrResult<Self> {
        let state = match cfg.backend() {
            Backend::Demo => Self::demo(tables),
            Backend::Http => {
                let client = ApiClient::new(cfg)?;
                let gateway = match cfg.api_token() {
                    Some(token) => client.with_token(token),
                    None => client.clone(),
                };
                Self {
                    auth: Arc::new(HttpAuthProvider::new(client)),
                    patients: Arc::new(HttpPatientRepository::new(gateway.clone())),
                    doctors: Arc::new(HttpDoctorRepository::new(gateway)),
                    ..Self::demo(tables)
                }
            }
        };
        tracing::info!(backend = %cfg.backend(), upstream = cfg.api_base_url(), "app state ready");
        Ok(state)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn require(&self, headers: &HeaderMap, group: RouteGroup) -> Result<User, ApiError> {
        let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        Ok(authorise(self.auth.as_ref(), header, group).await?)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        login,
        search_terminology,
        translate,
        compose_bundle,
        upload_bundle,
        get_bundle,
        list_patients,
        get_patient,
        list_doctors,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        ValidationErrorRes,
        api_shared::FieldErrorDto,
        LoginReq,
        LoginRes,
        api_shared::UserDto,
        api_shared::NavItemDto,
        SearchRes,
        api_shared::SearchHitDto,
        api_shared::ConceptDto,
        api_shared::TargetDto,
        api_shared::TargetGroupsDto,
        TranslateReq,
        TranslateRes,
        api_shared::MappingDto,
        ComposeBundleReq,
        api_shared::DiagnosisReq,
        api_shared::PrescriptionReq,
        BundleRes,
        UploadBundleRes,
        PatientDto,
        ListPatientsRes,
        DoctorDto,
        ListDoctorsRes,
    ))
)]
pub struct ApiDoc;

/// Build the application router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/terminology/search", get(search_terminology))
        .route("/terminology/translate", post(translate))
        .route("/bundles/compose", post(compose_bundle))
        .route("/bundles/upload", post(upload_bundle))
        .route("/bundles/:id", get(get_bundle))
        .route("/patients", get(list_patients))
        .route("/patients/:id", get(get_patient))
        .route("/doctors", get(list_doctors))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for load balancers and monitoring.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Signed in", body = LoginRes),
        (status = 401, description = "Invalid credentials", body = ErrorRes),
        (status = 502, description = "Upstream auth service failed", body = ErrorRes)
    )
)]
/// Sign in and receive a bearer token together with the role's navigation.
#[axum::debug_handler]
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<LoginRes>, ApiError> {
    let credentials = Credentials {
        email: req.email,
        password: req.password,
    };
    let session = state.auth.login(&credentials).await?;
    Ok(Json(session.into()))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[utoipa::path(
    get,
    path = "/terminology/search",
    params(("q" = Option<String>, Query, description = "Case-insensitive substring of the display name")),
    responses(
        (status = 200, description = "Matching concepts with their ICD-11 targets", body = SearchRes)
    )
)]
/// Search the source concepts.
///
/// An empty query returns no results; any other query is matched as given.
#[axum::debug_handler]
async fn search_terminology(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchRes> {
    let res = SearchRes::build(&state.tables, &params.q);
    tracing::debug!(query = %res.query, hits = res.results.len(), "terminology search");
    Json(res)
}

#[utoipa::path(
    post,
    path = "/terminology/translate",
    request_body = TranslateReq,
    responses(
        (status = 200, description = "Translation of the source code", body = TranslateRes)
    )
)]
/// Translate a NAMASTE code to its ICD-11 targets and raw mapping edges.
///
/// Unknown codes produce an empty translation rather than an error.
#[axum::debug_handler]
async fn translate(
    State(state): State<AppState>,
    Json(req): Json<TranslateReq>,
) -> Json<TranslateRes> {
    Json(TranslateRes::build(&state.tables, &req.namaste_code))
}

#[utoipa::path(
    post,
    path = "/bundles/compose",
    request_body = ComposeBundleReq,
    responses(
        (status = 200, description = "Composed FHIR bundle", body = BundleRes),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 403, description = "Role may not compose bundles", body = ErrorRes),
        (status = 422, description = "Encounter failed validation", body = ValidationErrorRes)
    )
)]
/// Validate an encounter form and compose its submission bundle.
#[axum::debug_handler]
async fn compose_bundle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ComposeBundleReq>,
) -> Result<Json<BundleRes>, ApiError> {
    let user = state.require(&headers, RouteGroup::Doctor).await?;

    let today = state.clock.now().date_naive();
    let draft = EncounterDraft::from_form(state.tables.clone(), EncounterForm::from(req), today)
        .map_err(|e| match e {
            EmrError::NotFound(what) => ApiError::Unprocessable(format!("Unknown {what}")),
            other => other.into(),
        })?;
    let ready = draft.finalise().map_err(|rejected| ApiError::from(rejected.error))?;
    let bundle = ready.compose(state.clock.as_ref())?;

    tracing::info!(user_id = %user.id, entries = bundle.entry.len(), "bundle composed");
    Ok(Json(BundleRes {
        success: true,
        bundle,
    }))
}

#[utoipa::path(
    post,
    path = "/bundles/upload",
    responses(
        (status = 200, description = "Bundle stored", body = UploadBundleRes),
        (status = 400, description = "Body is not a supported bundle", body = ErrorRes),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 403, description = "Role may not upload bundles", body = ErrorRes)
    )
)]
/// Accept a composed FHIR bundle of type `collection` and store it.
///
/// Malformed bodies get a 400 `{ success: false, message }` naming the failing field.
#[axum::debug_handler]
async fn upload_bundle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadBundleRes>, ApiError> {
    let user = state.require(&headers, RouteGroup::Doctor).await?;

    let text = std::str::from_utf8(&body)
        .map_err(|_| ApiError::BadRequest("Request body is not valid UTF-8".into()))?;
    let bundle = Bundle::parse(text).map_err(|e| {
        tracing::warn!(error = %e, "rejected bundle upload");
        ApiError::BadRequest(e.to_string())
    })?;

    let entries = bundle.entry.len();
    let bundle_id = state.bundles.insert(bundle).await;
    tracing::info!(user_id = %user.id, %bundle_id, entries, "bundle uploaded");

    Ok(Json(UploadBundleRes {
        success: true,
        message: "Bundle uploaded".into(),
        bundle_id,
        entries,
    }))
}

#[utoipa::path(
    get,
    path = "/bundles/{id}",
    params(("id" = String, Path, description = "Id returned by the upload")),
    responses(
        (status = 200, description = "Stored bundle", body = BundleRes),
        (status = 404, description = "No bundle with this id", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_bundle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BundleRes>, ApiError> {
    state.require(&headers, RouteGroup::Doctor).await?;
    let bundle = state
        .bundles
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("bundle {id}")))?;
    Ok(Json(BundleRes {
        success: true,
        bundle,
    }))
}

#[derive(Debug, Deserialize)]
struct PatientParams {
    q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/patients",
    params(("q" = Option<String>, Query, description = "Filter by name, email or ABHA id")),
    responses(
        (status = 200, description = "List of patients", body = ListPatientsRes),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 403, description = "Role may not list patients", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PatientParams>,
) -> Result<Json<ListPatientsRes>, ApiError> {
    state.require(&headers, RouteGroup::Doctor).await?;
    let patients = match params.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => state.patients.search(q).await?,
        _ => state.patients.list().await?,
    };
    Ok(Json(ListPatientsRes {
        patients: patients.into_iter().map(PatientDto::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = PatientDto),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<PatientDto>, ApiError> {
    state.require(&headers, RouteGroup::Doctor).await?;
    let patient = state.patients.get(&id).await?;
    Ok(Json(patient.into()))
}

#[utoipa::path(
    get,
    path = "/doctors",
    responses(
        (status = 200, description = "List of doctors", body = ListDoctorsRes),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 403, description = "Admin only", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn list_doctors(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListDoctorsRes>, ApiError> {
    state.require(&headers, RouteGroup::Admin).await?;
    let doctors = state.doctors.list().await?;
    Ok(Json(ListDoctorsRes {
        doctors: doctors.into_iter().map(DoctorDto::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use emr_core::FixedClock;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const DOCTOR: &str = "Bearer demo-token-demo-doctor-001";
    const ADMIN: &str = "Bearer demo-token-demo-admin-001";
    const PATIENT: &str = "Bearer demo-token-demo-user-001";

    fn app() -> Router {
        let tables = Arc::new(ConceptTables::embedded().unwrap());
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 11, 14, 35, 22).unwrap());
        let state = AppState::demo(tables).with_clock(Arc::new(clock));
        router(state)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, token);
        }
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn encounter() -> Value {
        json!({
            "patientId": "123",
            "encounterDate": "2026-01-11",
            "chiefComplaint": "Joint pain",
            "clinicalNotes": "Swelling in both knees",
            "diagnoses": [{ "code": "AYU001", "notes": "chronic" }],
            "prescriptions": [{
                "medication": "Ashwagandha",
                "strength": "500mg",
                "frequency": "Twice daily",
                "duration": "30 days",
                "quantity": 60
            }]
        })
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = send(&app(), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn login_returns_token_and_navigation() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "doctor@demo.com", "password": "demo123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token"], "demo-token-demo-doctor-001");
        assert_eq!(body["user"]["role"], "doctor");
        assert_eq!(body["defaultRoute"], "/app/doctor/dashboard");
        assert_eq!(body["navigation"][2]["href"], "/doctor/diagnose");

        let (status, body) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "doctor@demo.com", "password": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn search_and_translate() {
        let app = app();
        let (status, body) = send(&app, "GET", "/terminology/search?q=PRAMEHA", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert_eq!(body["results"][0]["code"], "AYU003");
        assert_eq!(body["results"][0]["targets"]["biomedicine"][0]["code"], "E14.9");

        let (_, body) = send(&app, "GET", "/terminology/search", None, None).await;
        assert_eq!(body["results"], json!([]));

        let (status, body) = send(
            &app,
            "POST",
            "/terminology/translate",
            None,
            Some(json!({ "namasteCode": "AYU004" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["targets"]["tm2"][0]["code"], "TM2-126");
        assert_eq!(body["targets"]["biomedicine"][0]["display"], "Biomedical Code");
    }

    #[tokio::test]
    async fn compose_requires_doctor_role() {
        let app = app();
        let (status, _) =
            send(&app, "POST", "/bundles/compose", None, Some(encounter())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(&app, "POST", "/bundles/compose", Some(PATIENT), Some(encounter())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) =
            send(&app, "POST", "/bundles/compose", Some(ADMIN), Some(encounter())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn compose_returns_bundle() {
        let (status, body) =
            send(&app(), "POST", "/bundles/compose", Some(DOCTOR), Some(encounter())).await;
        assert_eq!(status, StatusCode::OK);

        let bundle = &body["bundle"];
        assert_eq!(bundle["resourceType"], "Bundle");
        assert_eq!(bundle["type"], "collection");
        assert_eq!(bundle["timestamp"], "2026-01-11T14:35:22Z");

        let kinds: Vec<&str> = bundle["entry"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["resource"]["resourceType"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["Encounter", "Condition", "MedicationRequest"]);
    }

    #[tokio::test]
    async fn compose_reports_field_errors() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/bundles/compose",
            Some(DOCTOR),
            Some(json!({ "patientId": "123", "prescriptions": [{ "dosage": "1 tablet" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(
            fields,
            vec![
                "chiefComplaint",
                "clinicalNotes",
                "diagnoses",
                "prescriptions[0].medication"
            ]
        );

        let mut unknown = encounter();
        unknown["diagnoses"][0]["code"] = json!("NOPE");
        let (status, body) =
            send(&app, "POST", "/bundles/compose", Some(DOCTOR), Some(unknown)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn upload_then_fetch() {
        let app = app();
        let (_, composed) =
            send(&app, "POST", "/bundles/compose", Some(DOCTOR), Some(encounter())).await;
        let bundle = composed["bundle"].clone();

        let (status, body) =
            send(&app, "POST", "/bundles/upload", Some(DOCTOR), Some(bundle.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["entries"], 3);

        let id = body["bundleId"].as_str().unwrap();
        let (status, fetched) =
            send(&app, "GET", &format!("/bundles/{id}"), Some(DOCTOR), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["bundle"], bundle);

        let (status, _) = send(&app, "GET", "/bundles/unknown", Some(DOCTOR), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_upload_is_bad_request() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/bundles/upload",
            Some(DOCTOR),
            Some(json!({ "resourceType": "Patient" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("Bundle"));

        let req = Request::builder()
            .method("POST")
            .uri("/bundles/upload")
            .header(AUTHORIZATION, DOCTOR)
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn patient_and_doctor_gateways() {
        let app = app();
        let (status, body) = send(&app, "GET", "/patients", Some(DOCTOR), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patients"].as_array().unwrap().len(), 5);

        let (_, body) = send(&app, "GET", "/patients?q=abha-0987", Some(DOCTOR), None).await;
        assert_eq!(body["patients"][0]["name"], "Priya Sharma");

        let (status, body) = send(&app, "GET", "/patients/3", Some(DOCTOR), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["primaryDiagnosis"], "Acute Bronchitis");

        let (status, _) = send(&app, "GET", "/patients/99", Some(DOCTOR), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/doctors", Some(DOCTOR), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = send(&app, "GET", "/doctors", Some(ADMIN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["doctors"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn demo_backend_is_the_default() {
        let tables = Arc::new(ConceptTables::embedded().unwrap());
        let state = AppState::from_config(&CoreConfig::default(), tables).unwrap();
        let app = router(state);

        let (status, body) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "doctor@demo.com", "password": "demo123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token"], "demo-token-demo-doctor-001");
    }

    #[tokio::test]
    async fn http_backend_routes_auth_and_gateways_upstream() {
        use emr_core::EnvValues;
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let user = json!({
            "id": "u-7",
            "name": "Dr. Amit Patel",
            "email": "amit.patel@hospital.com",
            "role": "doctor"
        });
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "token": "jwt-abc", "user": user })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/me"))
            .and(header("authorization", "Bearer jwt-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user.clone()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/doctor/patients"))
            .and(header("authorization", "Bearer svc-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 41, "name": "Upstream Patient" }
            ])))
            .mount(&server)
            .await;

        let cfg = CoreConfig::from_env_values(EnvValues {
            api_base_url: Some(server.uri()),
            backend: Some("http".into()),
            api_token: Some("svc-token".into()),
            ..Default::default()
        })
        .unwrap();
        let tables = Arc::new(ConceptTables::embedded().unwrap());
        let app = router(AppState::from_config(&cfg, tables).unwrap());

        let (status, body) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "amit.patel@hospital.com", "password": "s3cret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token"], "jwt-abc");

        let (status, body) =
            send(&app, "GET", "/patients", Some("Bearer jwt-abc"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patients"][0]["id"], "41");
        assert_eq!(body["patients"][0]["name"], "Upstream Patient");

        let (status, _) = send(&app, "GET", "/patients", Some(DOCTOR), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
