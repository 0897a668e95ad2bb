//! File upload, download and delete endpoints under one URL prefix.

use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::{EitherBody, SizedStream},
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::{Method, header},
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::sync::Arc;

use firebook_core::storage::MimeTable;
use firebook_infra::DiskStorage;
use firebook_shared::UploadResponse;

/// Where the storage endpoints live and which types they accept.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// URL prefix with a leading and without a trailing slash.
    pub url_path: String,
    pub mime_types: MimeTable,
}

/// File storage middleware factory.
///
/// Answers storage requests itself and forwards everything else:
///
/// - `GET {url_path}/{name}` streams the file, 404 when it cannot be read
/// - `POST {url_path}` stores the body, 415 for unknown types, 500 on failure
/// - `DELETE {url_path}/{name}` removes the file and always answers 204
pub struct FileStorage {
    storage: Arc<DiskStorage>,
    config: Arc<StorageConfig>,
}

impl FileStorage {
    pub fn new(storage: Arc<DiskStorage>, config: StorageConfig) -> Self {
        Self {
            storage,
            config: Arc::new(config),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for FileStorage
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = FileStorageService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(FileStorageService {
            service,
            storage: self.storage.clone(),
            config: self.config.clone(),
        }))
    }
}

pub struct FileStorageService<S> {
    service: S,
    storage: Arc<DiskStorage>,
    config: Arc<StorageConfig>,
}

#[derive(Debug, PartialEq, Eq)]
enum StorageRoute {
    Download(String),
    Upload,
    Delete(String),
}

fn route(method: &Method, path: &str, url_path: &str) -> Option<StorageRoute> {
    if path == url_path {
        return (*method == Method::POST).then_some(StorageRoute::Upload);
    }

    let name = path.strip_prefix(url_path)?.strip_prefix('/')?.to_string();
    if *method == Method::GET {
        Some(StorageRoute::Download(name))
    } else if *method == Method::DELETE {
        Some(StorageRoute::Delete(name))
    } else {
        None
    }
}

impl<S, B> Service<ServiceRequest> for FileStorageService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let Some(route) = route(req.method(), req.path(), &self.config.url_path) else {
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            });
        };

        let storage = self.storage.clone();
        let config = self.config.clone();

        Box::pin(async move {
            let response = match route {
                StorageRoute::Download(name) => download(&storage, &config, &name).await,
                StorageRoute::Upload => upload(&storage, &config, &mut req).await,
                StorageRoute::Delete(name) => delete(&storage, &name).await,
            };

            let (http_req, _payload) = req.into_parts();
            Ok(ServiceResponse::new(http_req, response).map_into_right_body())
        })
    }
}

async fn download(storage: &DiskStorage, config: &StorageConfig, name: &str) -> HttpResponse {
    match storage.open(name).await {
        Ok(file) => {
            let mime = config.mime_types.mime_for(&file.name).to_string();
            let len = file.len;
            let body = SizedStream::new(len, file.into_stream());
            HttpResponse::Ok()
                .insert_header((header::CONTENT_TYPE, mime))
                .body(body)
        }
        Err(e) => {
            tracing::debug!(name = %name, error = %e, "Stored file not readable");
            HttpResponse::NotFound().finish()
        }
    }
}

async fn upload(
    storage: &DiskStorage,
    config: &StorageConfig,
    req: &mut ServiceRequest,
) -> HttpResponse {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let Some(extension) = config.mime_types.extension_for(content_type) else {
        tracing::debug!(content_type = %content_type, "Rejected upload type");
        return HttpResponse::UnsupportedMediaType().finish();
    };
    let extension = extension.to_string();

    let payload = req.take_payload();
    let name = match storage.save(&extension, payload).await {
        Ok(name) => name,
        Err(e) => {
            tracing::error!(error = %e, "Failed to store upload");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let download_url = {
        let info = req.connection_info();
        format!(
            "{}://{}{}/{}",
            info.scheme(),
            info.host(),
            config.url_path,
            name
        )
    };

    HttpResponse::Created().json(UploadResponse { download_url })
}

async fn delete(storage: &DiskStorage, name: &str) -> HttpResponse {
    if let Err(e) = storage.remove(name).await {
        tracing::warn!(name = %name, error = %e, "Failed to remove stored file");
    }
    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use actix_web::test as actix_test;
    use actix_web::{App, http::StatusCode, web};
    use serde_json::Value;
    use tempfile::TempDir;

    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    async fn storage(dir: &TempDir) -> Arc<DiskStorage> {
        Arc::new(DiskStorage::new(dir.path().join("_storage")).await.unwrap())
    }

    macro_rules! app {
        ($storage:expr) => {
            actix_test::init_service(
                App::new()
                    .wrap(FileStorage::new(
                        $storage.clone(),
                        StorageConfig {
                            url_path: "/_storage".to_string(),
                            mime_types: MimeTable::default(),
                        },
                    ))
                    .route(
                        "/posts",
                        web::get().to(|| async { HttpResponse::Ok().body("posts") }),
                    ),
            )
            .await
        };
    }

    fn stored_files(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("_storage")).unwrap().count()
    }

    #[test]
    fn test_route_matching() {
        let route = |method: Method, path: &str| super::route(&method, path, "/_storage");

        assert_eq!(route(Method::POST, "/_storage"), Some(StorageRoute::Upload));
        assert_eq!(
            route(Method::GET, "/_storage/1.png"),
            Some(StorageRoute::Download("1.png".to_string()))
        );
        assert_eq!(
            route(Method::DELETE, "/_storage/1.png"),
            Some(StorageRoute::Delete("1.png".to_string()))
        );
        assert_eq!(route(Method::GET, "/_storage"), None);
        assert_eq!(route(Method::PUT, "/_storage/1.png"), None);
        assert_eq!(route(Method::GET, "/_storagefoo/1.png"), None);
        assert_eq!(route(Method::POST, "/posts"), None);
    }

    #[actix_web::test]
    async fn test_upload_then_download() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let app = app!(storage);

        let req = actix_test::TestRequest::post()
            .uri("/_storage")
            .insert_header((header::HOST, "localhost:5000"))
            .insert_header((header::CONTENT_TYPE, "image/png"))
            .set_payload(PNG)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = actix_test::read_body_json(resp).await;
        let url = body["downloadURL"].as_str().unwrap();
        let path = url.strip_prefix("http://localhost:5000").unwrap();
        assert!(path.starts_with("/_storage/") && path.ends_with(".png"), "{url}");

        let req = actix_test::TestRequest::get().uri(path).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(actix_test::read_body(resp).await, PNG);
    }

    #[actix_web::test]
    async fn test_unsupported_type_stores_nothing() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let app = app!(storage);

        let req = actix_test::TestRequest::post()
            .uri("/_storage")
            .insert_header((header::CONTENT_TYPE, "application/pdf"))
            .set_payload("%PDF-1.4")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let req = actix_test::TestRequest::post()
            .uri("/_storage")
            .set_payload("no type")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        assert_eq!(stored_files(&dir), 0);
    }

    #[actix_web::test]
    async fn test_traversal_is_not_found() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();
        let storage = storage(&dir).await;
        let app = app!(storage);

        for uri in [
            "/_storage/../secret.txt",
            "/_storage/../../etc/passwd",
            "/_storage/..",
            "/_storage/",
            "/_storage/a/b.png",
        ] {
            let req = actix_test::TestRequest::get().uri(uri).to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
            assert!(actix_test::read_body(resp).await.is_empty());
        }
    }

    #[actix_web::test]
    async fn test_delete_always_no_content() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        std::fs::write(storage.root().join("1.gif"), "GIF89a").unwrap();
        let app = app!(storage);

        let req = actix_test::TestRequest::delete().uri("/_storage/1.gif").to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = actix_test::TestRequest::get().uri("/_storage/1.gif").to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = actix_test::TestRequest::delete().uri("/_storage/never.gif").to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn test_unknown_extension_downloads_as_octet_stream() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        std::fs::write(storage.root().join("notes.txt"), "hello").unwrap();
        let app = app!(storage);

        let req = actix_test::TestRequest::get().uri("/_storage/notes.txt").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );
    }

    #[actix_web::test]
    async fn test_other_paths_pass_through() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let app = app!(storage);

        let req = actix_test::TestRequest::get().uri("/posts").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(resp).await, "posts");
    }

    #[actix_web::test]
    async fn test_write_failure_is_server_error() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        std::fs::remove_dir(storage.root()).unwrap();
        let app = app!(storage);

        let req = actix_test::TestRequest::post()
            .uri("/_storage")
            .insert_header((header::CONTENT_TYPE, "image/jpeg"))
            .set_payload("jpeg")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
