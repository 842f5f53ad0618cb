use crate::projector::{project_namespace, search_across_cluster, SearchQuery, SearchQueryError};
use crate::source::{self, PodSource};
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder, ResponseError};
use k8s_openapi::chrono::Utc;
use podglance_api::data::Cluster;
use tracing::{error, info};

pub const DEFAULT_BIND_ADDR: &str = "[::]:3000";
pub const DEFAULT_CLUSTER_NAME: &str = "K8S-Cluster";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// The name the cluster is reported with
    pub cluster_name: String,
}

impl ServerConfig {
    /// Read the configuration from `BIND_ADDR`, `PORT` and `CLUSTER_NAME`.
    ///
    /// `BIND_ADDR` wins over `PORT`, which binds to all interfaces.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("BIND_ADDR")
            .or_else(|| lookup("PORT").map(|port| format!("[::]:{port}")))
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Self {
            bind_addr,
            cluster_name: lookup("CLUSTER_NAME")
                .unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] SearchQueryError),
    #[error(transparent)]
    Source(#[from] source::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Query(_) => StatusCode::BAD_REQUEST,
            Self::Source(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}

/// Log a failed fetch, before handing it on.
fn fetch_failed(what: &'static str) -> impl Fn(source::Error) -> ApiError {
    move |err| {
        error!("Error fetching {what}: {err}");
        err.into()
    }
}

#[derive(Debug, serde::Deserialize)]
struct SearchParams {
    query: Option<String>,
}

#[get("/clusters")]
async fn get_clusters(cluster: web::Data<Cluster>) -> impl Responder {
    HttpResponse::Ok().json([cluster.get_ref()])
}

async fn get_namespaces<S: PodSource>(source: web::Data<S>) -> Result<HttpResponse, ApiError> {
    let namespaces = source
        .list_namespaces()
        .await
        .map_err(fetch_failed("namespaces"))?;
    Ok(HttpResponse::Ok().json(namespaces))
}

async fn get_pods<S: PodSource>(
    path: web::Path<(String, String)>,
    source: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let (_cluster, namespace) = path.into_inner();

    let pods = source
        .list_namespaced_pods(&namespace)
        .await
        .map_err(fetch_failed("pods"))?;

    Ok(HttpResponse::Ok().json(project_namespace(pods, Utc::now())))
}

async fn search<S: PodSource>(
    params: web::Query<SearchParams>,
    source: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let query = SearchQuery::new(params.into_inner().query.unwrap_or_default())
        .map_err(|err| {
            error!("Rejecting search: {err}");
            ApiError::from(err)
        })?;

    info!("Search query: {}", query.as_str());

    let pods = source
        .list_all_pods()
        .await
        .map_err(fetch_failed("search results"))?;

    let results = search_across_cluster(pods, &query, Utc::now());
    info!("Search found {} pods", results.len());

    Ok(HttpResponse::Ok().json(results))
}

/// Register all endpoints, reading pods from `S`.
///
/// The application must provide a `web::Data<S>` and a `web::Data<Cluster>`.
pub fn configure<S: PodSource + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(get_clusters)
        .route("/namespaces", web::get().to(get_namespaces::<S>))
        .route(
            "/clusters/{cluster}/namespaces",
            web::get().to(get_namespaces::<S>),
        )
        .route(
            "/clusters/{cluster}/namespaces/{namespace}/pods",
            web::get().to(get_pods::<S>),
        )
        .route("/clusters/{cluster}/search", web::get().to(search::<S>));
}

pub async fn run<S>(config: ServerConfig, source: S) -> anyhow::Result<()>
where
    S: PodSource + Send + Sync + 'static,
{
    let source = web::Data::new(source);
    let cluster = web::Data::new(Cluster {
        name: config.cluster_name,
    });

    HttpServer::new(move || {
        let cors = Cors::default()
            .send_wildcard()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(source.clone())
            .app_data(cluster.clone())
            .wrap(cors)
            .configure(configure::<S>)
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContainerState, Phase, RawContainerStatus, RawPod};
    use actix_web::test as actix_test;
    use podglance_api::data::{NormalizedStatus, ProjectedPod};
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockSource {
        namespaces: Vec<String>,
        pods: Vec<RawPod>,
        fail: bool,
    }

    impl MockSource {
        fn check(&self) -> Result<(), source::Error> {
            if self.fail {
                return Err(kube::Error::Api(kube::core::ErrorResponse {
                    status: "Failure".into(),
                    message: "pods is forbidden".into(),
                    reason: "Forbidden".into(),
                    code: 403,
                })
                .into());
            }
            Ok(())
        }
    }

    impl PodSource for MockSource {
        async fn list_namespaces(&self) -> Result<Vec<String>, source::Error> {
            self.check()?;
            Ok(self.namespaces.clone())
        }

        async fn list_namespaced_pods(
            &self,
            namespace: &str,
        ) -> Result<Vec<RawPod>, source::Error> {
            self.check()?;
            Ok(self
                .pods
                .iter()
                .filter(|pod| pod.namespace == namespace)
                .cloned()
                .collect())
        }

        async fn list_all_pods(&self) -> Result<Vec<RawPod>, source::Error> {
            self.check()?;
            Ok(self.pods.clone())
        }
    }

    fn cluster() -> MockSource {
        MockSource {
            namespaces: vec!["prod".into(), "staging".into()],
            pods: vec![
                RawPod::new("web-1", "prod", Phase::Running).container(
                    RawContainerStatus::new("app", ContainerState::Running).ready(true),
                ),
                RawPod::new("worker-2", "prod", Phase::Running).container(
                    RawContainerStatus::new(
                        "main",
                        ContainerState::Waiting {
                            reason: "CrashLoopBackOff".into(),
                        },
                    )
                    .restarts(7),
                ),
                RawPod::new("web-2", "staging", Phase::Succeeded),
            ],
            fail: false,
        }
    }

    macro_rules! app {
        ($source:expr) => {
            actix_test::init_service(
                App::new()
                    .app_data(web::Data::new($source))
                    .app_data(web::Data::new(Cluster {
                        name: DEFAULT_CLUSTER_NAME.into(),
                    }))
                    .configure(configure::<MockSource>),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_clusters() {
        let app = app!(cluster());

        let req = actix_test::TestRequest::get().uri("/clusters").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body, serde_json::json!([{ "name": "K8S-Cluster" }]));
    }

    #[actix_web::test]
    async fn test_namespaces() {
        let app = app!(cluster());

        for uri in ["/namespaces", "/clusters/K8S-Cluster/namespaces"] {
            let req = actix_test::TestRequest::get().uri(uri).to_request();
            let body: Vec<String> = actix_test::call_and_read_body_json(&app, req).await;
            assert_eq!(body, ["prod", "staging"]);
        }
    }

    #[actix_web::test]
    async fn test_namespace_pods() {
        let app = app!(cluster());

        let req = actix_test::TestRequest::get()
            .uri("/clusters/K8S-Cluster/namespaces/prod/pods")
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(
            body,
            serde_json::json!([
                {
                    "name": "web-1",
                    "status": "Running",
                    "ready": "1/1",
                    "restartCount": "0",
                    "age": "unknown",
                    "containerStatuses": [{ "containerName": "app", "state": "Running" }],
                },
                {
                    "name": "worker-2",
                    "status": "CrashLoopBackOff",
                    "ready": "0/1",
                    "restartCount": "7",
                    "age": "unknown",
                    "containerStatuses": [
                        { "containerName": "main", "state": "Waiting: CrashLoopBackOff" }
                    ],
                },
            ])
        );
    }

    #[actix_web::test]
    async fn test_namespace_without_pods() {
        let app = app!(cluster());

        let req = actix_test::TestRequest::get()
            .uri("/clusters/K8S-Cluster/namespaces/empty/pods")
            .to_request();
        let body: Vec<ProjectedPod> = actix_test::call_and_read_body_json(&app, req).await;

        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn test_search() {
        let app = app!(cluster());

        let req = actix_test::TestRequest::get()
            .uri("/clusters/K8S-Cluster/search?query=web")
            .to_request();
        let body: Vec<ProjectedPod> = actix_test::call_and_read_body_json(&app, req).await;

        let found: Vec<_> = body
            .iter()
            .map(|pod| (pod.name.as_str(), pod.namespace.as_deref(), pod.status))
            .collect();
        assert_eq!(
            found,
            [
                ("web-1", Some("prod"), NormalizedStatus::Running),
                ("web-2", Some("staging"), NormalizedStatus::Succeeded),
            ]
        );
        assert!(body.iter().all(|pod| pod.container_statuses.is_none()));
    }

    #[actix_web::test]
    async fn test_search_requires_query() {
        let app = app!(cluster());

        for uri in [
            "/clusters/K8S-Cluster/search",
            "/clusters/K8S-Cluster/search?query=",
        ] {
            let req = actix_test::TestRequest::get().uri(uri).to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

            let body: serde_json::Value = actix_test::read_body_json(resp).await;
            assert_eq!(
                body,
                serde_json::json!({ "error": "Query parameter is required" })
            );
        }
    }

    #[actix_web::test]
    async fn test_fetch_failure() {
        let app = app!(MockSource {
            fail: true,
            ..cluster()
        });

        for uri in [
            "/namespaces",
            "/clusters/K8S-Cluster/namespaces/prod/pods",
            "/clusters/K8S-Cluster/search?query=web",
        ] {
            let req = actix_test::TestRequest::get().uri(uri).to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body: HashMap<String, String> = actix_test::read_body_json(resp).await;
            assert!(body["error"].contains("forbidden"));
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.cluster_name, DEFAULT_CLUSTER_NAME);
    }

    #[test]
    fn test_config_from_lookup() {
        let env = HashMap::from([
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("CLUSTER_NAME", "production"),
        ]);
        let config = ServerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.cluster_name, "production");
    }

    #[test]
    fn test_config_port_fallback() {
        let config = ServerConfig::from_lookup(|key| (key == "PORT").then(|| "8080".into()));
        assert_eq!(config.bind_addr, "[::]:8080");

        let env = HashMap::from([("BIND_ADDR", "127.0.0.1:9000"), ("PORT", "8080")]);
        let config = ServerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
    }
}
