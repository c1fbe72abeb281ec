use poem_openapi::{payload::Json, Object, OpenApi};

/// Health check response
#[derive(Object, Debug)]
pub struct HealthResponse {
    /// Always "ok" when the process is serving
    pub status: String,
}

/// Liveness endpoint, deliberately outside the authorization gate
pub struct HealthApi;

#[OpenApi]
impl HealthApi {
    /// Health check
    #[oai(path = "/health", method = "get")]
    async fn health(&self) -> Json<HealthResponse> {
        Json(HealthResponse {
            status: "ok".to_string(),
        })
    }
}
