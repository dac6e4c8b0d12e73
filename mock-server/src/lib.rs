use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub mod select;

pub type Document = Map<String, Value>;

/// Collection name to stored documents, in insertion order.
pub type Index = Arc<RwLock<HashMap<String, Vec<Document>>>>;

pub const SAMPLE_COLLECTION: &str = "margins";

/// Router over an index pre-loaded with the `margins` sample collection.
pub fn app() -> Router {
    router(sample_index())
}

pub fn router(index: Index) -> Router {
    Router::new()
        .route("/{collection}/select", get(select_handler))
        .with_state(index)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub fn empty_index() -> Index {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Append `docs` to `collection`, creating it if needed. Objects without an
/// `id` get a random one.
pub async fn add_documents(index: &Index, collection: &str, docs: Vec<Value>) {
    let mut guard = index.write().await;
    let stored = guard.entry(collection.to_string()).or_default();
    for doc in docs {
        let Value::Object(mut doc) = doc else {
            warn!(collection, "skipping non-object document");
            continue;
        };
        doc.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        stored.push(doc);
    }
}

pub fn sample_documents() -> Vec<Value> {
    vec![
        json!({"id": "1", "region": "north", "product": "alpha", "floor_margin_s": 1.0, "year": 1995}),
        json!({"id": "2", "region": "north", "product": "beta", "floor_margin_s": 4.5, "year": 2003}),
        json!({"id": "3", "region": "south", "product": "alpha", "floor_margin_s": 9.0, "year": 2011}),
        json!({"id": "4", "region": "south", "product": "gamma", "floor_margin_s": 4.5, "year": 2018}),
        json!({"id": "5", "region": "east", "product": "beta", "year": 1999, "tags": ["new", "promo"]}),
    ]
}

fn sample_index() -> Index {
    let docs = sample_documents()
        .into_iter()
        .filter_map(|doc| match doc {
            Value::Object(doc) => Some(doc),
            _ => None,
        })
        .collect();
    Arc::new(RwLock::new(HashMap::from([(
        SAMPLE_COLLECTION.to_string(),
        docs,
    )])))
}

async fn select_handler(
    State(index): State<Index>,
    Path(collection): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let index = index.read().await;
    let Some(docs) = index.get(&collection) else {
        warn!(collection, "unknown collection");
        return Err(error(
            StatusCode::NOT_FOUND,
            format!("no such collection: {collection}"),
        ));
    };

    info!(collection, params = params.len(), "select");
    select::execute(docs, &params)
        .map(Json)
        .map_err(|msg| error(StatusCode::BAD_REQUEST, msg))
}

fn error(status: StatusCode, msg: String) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "responseHeader": {"status": status.as_u16(), "QTime": 0},
            "error": {"msg": msg, "code": status.as_u16()},
        })),
    )
}
