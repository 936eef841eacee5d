use crate::app_state::{AppState, SharedAppState};
use crate::browse::{self, accept_all};
use crate::cli::CommandLineArgs;
use crate::container::{self, base_name, Container, NodeValue};
use crate::error::NuvolaError;
use crate::hierarchy;
use crate::metrics::{self, metrics_handler};
use crate::models::{BrowseForm, FileForm, LoadResponse, NodeForm, TreeUpdateResponse};
use crate::render::{self, RenderPayload};
use crate::session::FileSession;
use crate::validated_form::ValidatedForm;

use axum::{
    extract::State,
    response::{Html, Json},
    routing::{get, post},
    Router,
};

use std::error::Error;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{event, Level};

/// The viewer page served at `/home`.
static VIEWER_PAGE: &str = include_str!("../templates/h5nuvola-demo-gui.html");

/// Returns a [axum::Router] for the viewer.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub fn router(args: &CommandLineArgs) -> Router {
    let state: SharedAppState = Arc::new(AppState::new(args));

    Router::new()
        .route("/test", get(test))
        .route("/home", get(home).post(home))
        .route("/remotebrowse", post(remote_browse))
        .route("/loadH5File", get(load_file).post(load_file))
        .route("/h5treeUpdate", post(tree_update))
        .route("/raw", post(raw))
        .route("/curve", post(curve))
        .route("/image", post(image))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .on_request(metrics::request_counter)
                    .on_response(metrics::record_response_metrics),
            ),
        )
}

/// Run HDF5 work on the blocking thread pool.
async fn blocking<T, F>(f: F) -> Result<T, NuvolaError>
where
    F: FnOnce() -> Result<T, NuvolaError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

async fn test() -> &'static str {
    "TEST"
}

async fn home() -> Html<&'static str> {
    Html(VIEWER_PAGE)
}

/// List a directory of the server's filesystem for the file browser.
///
/// Listing errors are reported in the body, with a successful status.
async fn remote_browse(
    State(state): State<SharedAppState>,
    ValidatedForm(form): ValidatedForm<BrowseForm>,
) -> Result<Html<String>, NuvolaError> {
    let html = blocking(move || {
        let html = match state.lister.list(&form.dir, accept_all, accept_all) {
            Ok(listing) => browse::file_tree_html(&form.dir, &listing),
            Err(err) => {
                event!(Level::DEBUG, "{}", err);
                let reason = err.source().map_or_else(|| err.to_string(), |s| s.to_string());
                format!("Could not load directory: {}", reason)
            }
        };
        Ok(html)
    })
    .await?;
    Ok(Html(html))
}

/// Open a file, or return its cached session.
async fn load_file(
    State(state): State<SharedAppState>,
    ValidatedForm(form): ValidatedForm<FileForm>,
) -> Result<Json<LoadResponse>, NuvolaError> {
    let response = blocking(move || {
        let filepath = form.filepath;
        let session = state.sessions.get_or_load(&filepath, || {
            event!(Level::INFO, "loading {}", filepath);
            let container = container::open(&filepath)?;
            FileSession::load(&filepath, &container)
        })?;
        metrics::CACHED_SESSIONS.set(state.sessions.len() as i64);
        Ok(session.to_response())
    })
    .await?;
    Ok(Json(response))
}

/// Expand a node of the tree.
async fn tree_update(
    ValidatedForm(form): ValidatedForm<NodeForm>,
) -> Result<Json<TreeUpdateResponse>, NuvolaError> {
    let response = blocking(move || {
        let container = container::open(&form.filepath)?;
        let children = hierarchy::children_of(&container, &form.node)?;
        Ok(TreeUpdateResponse {
            filepath: form.filepath,
            hf_new_items: children,
        })
    })
    .await?;
    Ok(Json(response))
}

/// Read a dataset and render it on the blocking thread pool.
async fn render_node<F>(
    form: NodeForm,
    to_payloads: F,
) -> Result<Json<Vec<RenderPayload>>, NuvolaError>
where
    F: FnOnce(&str, &NodeValue) -> Vec<RenderPayload> + Send + 'static,
{
    let payloads = blocking(move || {
        let container = container::open(&form.filepath)?;
        let value = container.read(&form.node)?;
        Ok(to_payloads(base_name(&form.node), &value))
    })
    .await?;
    Ok(Json(payloads))
}

/// Render a dataset as a table.
async fn raw(
    ValidatedForm(form): ValidatedForm<NodeForm>,
) -> Result<Json<Vec<RenderPayload>>, NuvolaError> {
    render_node(form, |title, value| {
        render::render_table(title, value)
            .map(RenderPayload::Table)
            .into_iter()
            .collect()
    })
    .await
}

/// Render a dataset as curves.
async fn curve(
    ValidatedForm(form): ValidatedForm<NodeForm>,
) -> Result<Json<Vec<RenderPayload>>, NuvolaError> {
    render_node(form, |title, value| {
        render::render_curve(title, value)
            .into_iter()
            .map(RenderPayload::Curve)
            .collect()
    })
    .await
}

/// Render a dataset as an image.
async fn image(
    ValidatedForm(form): ValidatedForm<NodeForm>,
) -> Result<Json<Vec<RenderPayload>>, NuvolaError> {
    render_node(form, |title, value| {
        render::render_image(title, value)
            .map(RenderPayload::Image)
            .into_iter()
            .collect()
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::{write_hdf5_file, write_linked_hdf5_file};

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use clap::Parser;
    use regex::Regex;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router() -> Router {
        router(&CommandLineArgs::parse_from(["h5nuvola"]))
    }

    fn form_request(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn encode(value: &str) -> String {
        value
            .bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                    (b as char).to_string()
                }
                _ => format!("%{:02X}", b),
            })
            .collect()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn post_node(uri: &str, filepath: &str, node: &str) -> (StatusCode, Value) {
        let body = format!("filepath={}&node={}", encode(filepath), encode(node));
        let (status, body) = send(test_router(), form_request(uri, body)).await;
        (status, serde_json::from_str(&body).unwrap())
    }

    #[tokio::test]
    async fn test_route() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert_eq!((StatusCode::OK, "TEST".to_string()), send(test_router(), request).await);
    }

    #[tokio::test]
    async fn home_page() {
        for method in [Method::GET, Method::POST] {
            let request = Request::builder()
                .method(method)
                .uri("/home")
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(test_router(), request).await;
            assert_eq!(StatusCode::OK, status);
            assert!(body.contains("<title>h5nuvola</title>"));
        }
    }

    #[tokio::test]
    async fn load_file() {
        let (_dir, path) = write_hdf5_file();
        let body = format!("filepath={}", encode(&path));
        let (status, body) = send(test_router(), form_request("/loadH5File", body)).await;
        assert_eq!(StatusCode::OK, status);
        let response: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json!(path), response["filepath"]);
        assert_eq!(json!("test.h5"), response["hf_name"]);
        assert_eq!(json!([["0"]]), response["hf_new_items"]);
        assert_eq!(
            json!([
                "test.h5",
                "group",
                [["created", "2020"], ["version", [1, 2, 3]]],
                true,
                "Group size",
                "4"
            ]),
            response["root_properties"]
        );
        assert_eq!(
            json!(["/count", "dataset", [], false, "uint16", "[]"]),
            response["hf_root_items"][0]
        );
        assert_eq!(4, response["hf_root_items"].as_array().unwrap().len());
    }

    #[tokio::test]
    async fn load_file_from_query_string() {
        let (_dir, path) = write_hdf5_file();
        let request = Request::builder()
            .uri(format!("/loadH5File?filepath={}", encode(&path)))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(test_router(), request).await;
        assert_eq!(StatusCode::OK, status);
        let response: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json!("test.h5"), response["hf_name"]);
    }

    #[tokio::test]
    async fn load_file_twice_returns_cached_session() {
        let (dir, path) = write_hdf5_file();
        let router = test_router();
        let body = format!("filepath={}", encode(&path));
        let (_, first) = send(router.clone(), form_request("/loadH5File", body.clone())).await;
        // The cached session is served even once the file is gone.
        drop(dir);
        let (status, second) = send(router, form_request("/loadH5File", body)).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.h5");
        let body = format!("filepath={}", encode(&path.to_string_lossy()));
        let (status, body) = send(test_router(), form_request("/loadH5File", body)).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        let re = Regex::new(r#""message": "could not open file .*missing.h5""#).unwrap();
        assert!(re.is_match(&body), "body: {body}");
    }

    #[tokio::test]
    async fn load_file_without_filepath() {
        let (status, body) = send(
            test_router(),
            form_request("/loadH5File", "filepath=".to_string()),
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        let re = Regex::new(r"filepath must not be empty").unwrap();
        assert!(re.is_match(&body), "body: {body}");
    }

    #[tokio::test]
    async fn tree_update() {
        let (_dir, path) = write_hdf5_file();
        let (status, response) = post_node("/h5treeUpdate", &path, "/entry").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!(path), response["filepath"]);
        assert_eq!(
            json!([
                ["/entry/data", "dataset", [["scale", 0.5]], false, "float64", "[2, 3]"],
                ["/entry/flags", "dataset", [], false, "bool", "[2]"],
                ["/entry/names", "dataset", [["label", "n\u{e9}v"]], false, "|S8", "[2]"]
            ]),
            response["hf_new_items"]
        );
    }

    #[tokio::test]
    async fn load_file_with_cyclic_and_dangling_links() {
        let (_dir, path) = write_linked_hdf5_file();
        let body = format!("filepath={}", encode(&path));
        let (status, body) = send(test_router(), form_request("/loadH5File", body)).await;
        assert_eq!(StatusCode::OK, status, "body: {body}");
        let response: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            json!([["/a", "group", [], true, "Group size", "3"]]),
            response["hf_root_items"]
        );
    }

    #[tokio::test]
    async fn tree_update_with_cyclic_and_dangling_links() {
        let (_dir, path) = write_linked_hdf5_file();
        let (status, response) = post_node("/h5treeUpdate", &path, "/a").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(
            json!([
                ["/a/b", "group", [], true, "Group size", "2"],
                ["/a/up", "group", [], true, "Group size", "3"]
            ]),
            response["hf_new_items"]
        );
        let (status, response) = post_node("/h5treeUpdate", &path, "/a/b").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!("/a/b/back"), response["hf_new_items"][0][0]);
        assert_eq!(json!("/a/b/x"), response["hf_new_items"][1][0]);
    }

    #[tokio::test]
    async fn tree_update_placeholder() {
        let (_dir, path) = write_hdf5_file();
        for node in ["/empty", "/nope", "/entry/data"] {
            let (status, response) = post_node("/h5treeUpdate", &path, node).await;
            assert_eq!(StatusCode::OK, status);
            assert_eq!(json!([["1"]]), response["hf_new_items"]);
        }
    }

    #[tokio::test]
    async fn raw_matrix() {
        let (_dir, path) = write_hdf5_file();
        let (status, response) = post_node("/raw", &path, "/entry/data").await;
        assert_eq!(StatusCode::OK, status);
        let tables = response.as_array().unwrap();
        assert_eq!(1, tables.len());
        assert_eq!(json!("table"), tables[0]["type"]);
        assert_eq!(json!("data"), tables[0]["title"]);
        assert_eq!(3, tables[0]["columns"].as_array().unwrap().len());
        assert_eq!(json!([1.0, 4.0]), tables[0]["columns"][0]["values"]);
    }

    #[tokio::test]
    async fn raw_text_scalar() {
        let (_dir, path) = write_hdf5_file();
        let (status, response) = post_node("/raw", &path, "/title").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!(["hello"]), response[0]["columns"][0]["values"]);
    }

    #[tokio::test]
    async fn raw_fixed_length_strings() {
        let (_dir, path) = write_hdf5_file();
        let (status, response) = post_node("/raw", &path, "/entry/names").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!(["alpha", "beta"]), response[0]["columns"][0]["values"]);
    }

    #[tokio::test]
    async fn raw_integer_scalar() {
        let (_dir, path) = write_hdf5_file();
        let (status, response) = post_node("/raw", &path, "/count").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!([7]), response[0]["columns"][0]["values"]);
    }

    #[tokio::test]
    async fn curve_rows() {
        let (_dir, path) = write_hdf5_file();
        let (status, response) = post_node("/curve", &path, "/entry/data").await;
        assert_eq!(StatusCode::OK, status);
        let curves = response.as_array().unwrap();
        assert_eq!(2, curves.len());
        assert_eq!(json!("curve"), curves[0]["type"]);
        assert_eq!(json!([0.0, 1.0, 2.0]), curves[0]["x"]);
        assert_eq!(json!([4.0, 5.0, 6.0]), curves[1]["y"]);
    }

    #[tokio::test]
    async fn curve_of_text_is_empty() {
        let (_dir, path) = write_hdf5_file();
        let (status, response) = post_node("/curve", &path, "/title").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!([]), response);
    }

    #[tokio::test]
    async fn image_extent() {
        let (_dir, path) = write_hdf5_file();
        let (status, response) = post_node("/image", &path, "/entry/data").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!("image"), response[0]["type"]);
        assert_eq!(json!(2), response[0]["dw"]);
        assert_eq!(json!(3), response[0]["dh"]);
    }

    #[tokio::test]
    async fn image_of_vector_is_empty() {
        let (_dir, path) = write_hdf5_file();
        let (status, response) = post_node("/image", &path, "/entry/flags").await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!([]), response);
    }

    #[tokio::test]
    async fn render_missing_node() {
        let (_dir, path) = write_hdf5_file();
        let (status, response) = post_node("/raw", &path, "/nope").await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!(json!("node /nope not found"), response["error"]["message"]);
    }

    #[tokio::test]
    async fn render_group() {
        let (_dir, path) = write_hdf5_file();
        let (status, response) = post_node("/curve", &path, "/entry").await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(json!("node /entry is not a dataset"), response["error"]["message"]);
    }

    #[tokio::test]
    async fn remote_browse() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.h5"), b"").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let body = format!("dir={}", encode(&root));
        let (status, body) = send(test_router(), form_request("/remotebrowse", body)).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(
            format!(
                concat!(
                    r#"<ul class="jqueryFileTree" style="display: none;">"#,
                    r##"<li class="directory collapsed"><a href="#" rel="{root}/sub/">sub</a></li>"##,
                    r##"<li class="file ext_h5"><a href="#" rel="{root}/a.h5">a.h5</a></li>"##,
                    "</ul>"
                ),
                root = root
            ),
            body
        );
    }

    #[tokio::test]
    async fn remote_browse_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let body = format!("dir={}", encode(&missing.to_string_lossy()));
        let (status, body) = send(test_router(), form_request("/remotebrowse", body)).await;
        assert_eq!(StatusCode::OK, status);
        assert!(body.starts_with("Could not load directory: "), "body: {body}");
    }

    #[tokio::test]
    async fn metrics_route() {
        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let (status, _) = send(test_router(), request).await;
        assert_eq!(StatusCode::OK, status);
    }
}
