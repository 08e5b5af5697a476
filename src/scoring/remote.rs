//! Remote predictor delegation
//!
//! Probes the external model's health endpoint with a short timeout, then
//! calls its predict endpoint with a longer one. Any failure along the way
//! falls back to the local engine; callers always get a [`Prediction`].

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::engine::{PredictionStatus, Score};
use super::features::{FeatureVector, Gender, Level};
use super::{predict_local, recommend, Prediction, PredictionRequest, PredictionSource, Probabilities};

pub const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_PREDICT_TIMEOUT_MS: u64 = 30_000;

/// Remote predictor configuration
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Base URL of the predictor; `None` disables delegation
    pub remote_base_url: Option<String>,

    /// Upper bound for the health probe
    pub health_timeout_ms: u64,

    /// Upper bound for a predict call
    pub predict_timeout_ms: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            remote_base_url: None,
            health_timeout_ms: DEFAULT_HEALTH_TIMEOUT_MS,
            predict_timeout_ms: DEFAULT_PREDICT_TIMEOUT_MS,
        }
    }
}

impl PredictorConfig {
    pub fn from_env() -> Self {
        Self {
            remote_base_url: env::var("ML_API_URL")
                .ok()
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),

            health_timeout_ms: env::var("ML_HEALTH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HEALTH_TIMEOUT_MS),

            predict_timeout_ms: env::var("ML_PREDICT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PREDICT_TIMEOUT_MS),
        }
    }

    pub fn with_remote(base_url: &str) -> Self {
        Self {
            remote_base_url: Some(base_url.trim_end_matches('/').to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("remote predictor is not configured")]
    Disabled,

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("remote predictor returned HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("remote predictor is unhealthy (status: {status}, model loaded: {model_loaded})")]
    Unhealthy { status: String, model_loaded: bool },

    #[error("remote predictor rejected the request: {0}")]
    Rejected(String),

    #[error("remote score {0} is outside [0, 100]")]
    InvalidScore(f64),
}

impl From<reqwest::Error> for PredictorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PredictorError::Timeout(err.to_string())
        } else if err.is_decode() {
            PredictorError::Parse(err.to_string())
        } else {
            PredictorError::Network(err.to_string())
        }
    }
}

/// Health endpoint payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteHealth {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}

impl RemoteHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy" && self.model_loaded
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemotePayload {
    hours_studied: f64,
    attendance: f64,
    extracurricular_activities: bool,
    sleep_hours: f64,
    previous_scores: f64,
    motivation_level: Level,
    tutoring_sessions: u32,
    teacher_quality: Level,
    physical_activity: f64,
    learning_disabilities: bool,
    gender: &'static str,
    exam_score: f64,
}

impl RemotePayload {
    fn new(request: &PredictionRequest) -> Self {
        let f = &request.features;
        Self {
            hours_studied: f.hours_studied,
            attendance: f.attendance,
            extracurricular_activities: f.extracurricular,
            sleep_hours: f.sleep_hours,
            previous_scores: f.previous_scores,
            motivation_level: Level::from_scale(f.motivation),
            tutoring_sessions: f.tutoring_sessions,
            teacher_quality: Level::from_scale(f.teacher_quality),
            physical_activity: f.physical_activity,
            learning_disabilities: f.learning_disability,
            gender: match request.gender {
                Gender::Male => "Male",
                Gender::Female => "Female",
            },
            exam_score: request.exam_score.unwrap_or(f.previous_scores),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RemoteRecommendations {
    List(Vec<String>),
    Text(String),
}

impl RemoteRecommendations {
    fn into_list(self) -> Vec<String> {
        match self {
            RemoteRecommendations::List(list) => list,
            RemoteRecommendations::Text(text) => text
                .split("\n\n")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteResponse {
    #[serde(default)]
    success: bool,
    prediction_score: Option<f64>,
    prediction_status: Option<String>,
    intervention_recommendations: Option<RemoteRecommendations>,
    probabilities: Option<Probabilities>,
    model_used: Option<String>,
    error: Option<String>,
}

/// Delegation wrapper around the remote predictor
#[derive(Debug, Clone)]
pub struct Predictor {
    config: PredictorConfig,
    http_client: reqwest::Client,
}

impl Predictor {
    pub fn new(config: PredictorConfig) -> Result<Self, PredictorError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| PredictorError::Network(e.to_string()))?;

        Ok(Self { config, http_client })
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.remote_base_url.is_some()
    }

    fn url(&self, path: &str) -> Result<String, PredictorError> {
        let base = self.config.remote_base_url.as_deref().ok_or(PredictorError::Disabled)?;
        Ok(format!("{}{}", base, path))
    }

    /// Probe the health endpoint
    pub async fn health(&self) -> Result<RemoteHealth, PredictorError> {
        let response = self.http_client
            .get(self.url("/health")?)
            .timeout(Duration::from_millis(self.config.health_timeout_ms))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PredictorError::Status(response.status().as_u16()));
        }

        response.json::<RemoteHealth>().await
            .map_err(|e| PredictorError::Parse(e.to_string()))
    }

    /// `healthy`, `unhealthy` or `disabled`
    pub async fn status_label(&self) -> &'static str {
        if !self.is_enabled() {
            return "disabled";
        }

        match self.health().await {
            Ok(health) if health.is_healthy() => "healthy",
            _ => "unhealthy",
        }
    }

    /// Predict remotely when possible, locally otherwise
    pub async fn predict(&self, request: &PredictionRequest) -> Prediction {
        if !self.is_enabled() {
            return predict_local(&request.features);
        }

        match self.predict_remote(request).await {
            Ok(prediction) => prediction,
            Err(cause) => {
                tracing::warn!("Remote predictor failed, using local scoring: {}", cause);

                let mut prediction = predict_local(&request.features);
                if prediction.source == PredictionSource::Local {
                    prediction.source = PredictionSource::LocalFallback { cause: cause.to_string() };
                }
                prediction
            }
        }
    }

    async fn predict_remote(&self, request: &PredictionRequest) -> Result<Prediction, PredictorError> {
        let health = self.health().await?;
        if !health.is_healthy() {
            return Err(PredictorError::Unhealthy {
                status: health.status,
                model_loaded: health.model_loaded,
            });
        }

        tracing::debug!("Calling remote predictor");

        let response = self.http_client
            .post(self.url("/predict")?)
            .timeout(Duration::from_millis(self.config.predict_timeout_ms))
            .json(&RemotePayload::new(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PredictorError::Status(response.status().as_u16()));
        }

        let body: RemoteResponse = response.json().await
            .map_err(|e| PredictorError::Parse(e.to_string()))?;

        convert_response(body, &request.features)
    }
}

fn convert_response(body: RemoteResponse, features: &FeatureVector) -> Result<Prediction, PredictorError> {
    if !body.success {
        return Err(PredictorError::Rejected(
            body.error.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }

    let raw = body.prediction_score
        .ok_or_else(|| PredictorError::Parse("missing predictionScore".to_string()))?;
    if !raw.is_finite() || !(0.0..=100.0).contains(&raw) {
        return Err(PredictorError::InvalidScore(raw));
    }

    let score = Score::from_value(raw);
    let reported = body.prediction_status.as_deref().and_then(PredictionStatus::parse);
    if reported != Some(score.status()) {
        tracing::warn!(
            "Remote status {:?} disagrees with score {}, using {}",
            body.prediction_status, score.value(), score.status().as_str()
        );
    }

    let recommendations = body.intervention_recommendations
        .map(RemoteRecommendations::into_list)
        .filter(|list| !list.is_empty())
        .unwrap_or_else(|| recommend::recommend(features, score.status()));

    let source = PredictionSource::Remote {
        model: body.model_used.unwrap_or_else(|| "remote-model".to_string()),
    };

    Ok(Prediction::assemble(score, recommendations, body.probabilities, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> PredictionRequest {
        PredictionRequest {
            features: FeatureVector {
                hours_studied: 5.0,
                attendance: 90.0,
                sleep_hours: 8.0,
                previous_scores: 75.0,
                motivation: 8.0,
                tutoring_sessions: 2,
                teacher_quality: 5.0,
                physical_activity: 4.0,
                extracurricular: true,
                learning_disability: false,
            },
            gender: Gender::Female,
            exam_score: None,
        }
    }

    async fn mount_health(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn predictor(server: &MockServer) -> Predictor {
        Predictor::new(PredictorConfig::with_remote(&server.uri())).unwrap()
    }

    /// Fallback output equals the local output apart from the source tag
    fn assert_matches_local(prediction: &Prediction) {
        let local = predict_local(&request().features);
        assert_eq!(prediction.prediction_score, local.prediction_score);
        assert_eq!(prediction.prediction_status, local.prediction_status);
        assert_eq!(prediction.prediction_category, local.prediction_category);
        assert_eq!(prediction.intervention_recommendations, local.intervention_recommendations);
        assert!(matches!(prediction.source, PredictionSource::LocalFallback { .. }));
    }

    #[tokio::test]
    async fn test_remote_prediction_used_when_healthy() {
        let server = MockServer::start().await;
        mount_health(&server, json!({"status": "healthy", "model_loaded": true})).await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(body_partial_json(json!({
                "motivationLevel": "High",
                "teacherQuality": "Medium",
                "gender": "Female",
                "examScore": 75.0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "predictionScore": 81.25,
                "predictionStatus": "success",
                "predictionCategory": "Berhasil",
                "interventionRecommendations": ["Keep going"],
                "modelUsed": "TensorFlow Neural Network",
                "probabilities": {"success": 0.812, "at_risk": 0.0, "fail": 0.0}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let prediction = predictor(&server).predict(&request()).await;

        assert_eq!(prediction.prediction_score, 81.3);
        assert_eq!(prediction.prediction_status, PredictionStatus::Success);
        assert_eq!(prediction.intervention_recommendations, vec!["Keep going".to_string()]);
        assert_eq!(prediction.probabilities.map(|p| p.success), Some(0.812));
        assert_eq!(
            prediction.source,
            PredictionSource::Remote { model: "TensorFlow Neural Network".to_string() }
        );
    }

    #[tokio::test]
    async fn test_unhealthy_probe_skips_predict_call() {
        let server = MockServer::start().await;
        mount_health(&server, json!({"status": "healthy", "model_loaded": false})).await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let prediction = predictor(&server).predict(&request()).await;
        assert_matches_local(&prediction);
    }

    #[tokio::test]
    async fn test_predict_timeout_falls_back() {
        let server = MockServer::start().await;
        mount_health(&server, json!({"status": "healthy", "model_loaded": true})).await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "predictionScore": 90.0}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = PredictorConfig {
            predict_timeout_ms: 200,
            ..PredictorConfig::with_remote(&server.uri())
        };
        let prediction = Predictor::new(config).unwrap().predict(&request()).await;

        assert_matches_local(&prediction);
        match prediction.source {
            PredictionSource::LocalFallback { cause } => assert!(cause.contains("timed out")),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_response_falls_back() {
        let server = MockServer::start().await;
        mount_health(&server, json!({"status": "healthy", "model_loaded": true})).await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": "Model not loaded"
            })))
            .mount(&server)
            .await;

        let prediction = predictor(&server).predict(&request()).await;
        assert_matches_local(&prediction);
    }

    #[tokio::test]
    async fn test_server_error_and_garbage_fall_back() {
        let server = MockServer::start().await;
        mount_health(&server, json!({"status": "healthy", "model_loaded": true})).await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;
        assert_matches_local(&predictor(&server).predict(&request()).await);

        let server = MockServer::start().await;
        mount_health(&server, json!({"status": "healthy", "model_loaded": true})).await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        assert_matches_local(&predictor(&server).predict(&request()).await);
    }

    #[tokio::test]
    async fn test_out_of_range_remote_score_falls_back() {
        let server = MockServer::start().await;
        mount_health(&server, json!({"status": "healthy", "model_loaded": true})).await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "predictionScore": 140.0
            })))
            .mount(&server)
            .await;

        let prediction = predictor(&server).predict(&request()).await;
        assert_matches_local(&prediction);
    }

    #[tokio::test]
    async fn test_remote_status_recomputed_from_score() {
        let server = MockServer::start().await;
        mount_health(&server, json!({"status": "healthy", "model_loaded": true})).await;

        // 72 is at_risk on the remote table, success on ours
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "predictionScore": 72.0,
                "predictionStatus": "at_risk",
                "interventionRecommendations": "First tip\n\nSecond tip"
            })))
            .mount(&server)
            .await;

        let prediction = predictor(&server).predict(&request()).await;

        assert_eq!(prediction.prediction_status, PredictionStatus::Success);
        assert_eq!(prediction.prediction_category, "Successful");
        assert_eq!(prediction.intervention_recommendations, vec!["First tip", "Second tip"]);
    }

    #[tokio::test]
    async fn test_empty_remote_recommendations_use_local_generator() {
        let server = MockServer::start().await;
        mount_health(&server, json!({"status": "healthy", "model_loaded": true})).await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "predictionScore": 45.0,
                "interventionRecommendations": []
            })))
            .mount(&server)
            .await;

        let prediction = predictor(&server).predict(&request()).await;
        let expected = recommend::recommend(&request().features, PredictionStatus::Fail);
        assert_eq!(prediction.intervention_recommendations, expected);
    }

    #[tokio::test]
    async fn test_connection_refused_falls_back() {
        let predictor = Predictor::new(PredictorConfig::with_remote("http://127.0.0.1:1")).unwrap();

        assert_matches_local(&predictor.predict(&request()).await);
        assert_eq!(predictor.status_label().await, "unhealthy");
    }

    #[tokio::test]
    async fn test_disabled_predictor_scores_locally() {
        let predictor = Predictor::new(PredictorConfig::default()).unwrap();
        let prediction = predictor.predict(&request()).await;

        assert_eq!(prediction.source, PredictionSource::Local);
        assert_eq!(predictor.status_label().await, "disabled");
        assert!(matches!(predictor.health().await, Err(PredictorError::Disabled)));
    }

    #[test]
    fn test_payload_falls_back_to_previous_score() {
        let mut req = request();
        let payload = serde_json::to_value(RemotePayload::new(&req)).unwrap();
        assert_eq!(payload["examScore"], 75.0);
        assert_eq!(payload["gender"], "Female");

        req.exam_score = Some(88.0);
        let payload = serde_json::to_value(RemotePayload::new(&req)).unwrap();
        assert_eq!(payload["examScore"], 88.0);
    }
}
