use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};

use super::{CollectionSchema, PersonRecord, StoreError, VectorCollection};
use crate::config::StoreOptions;

/// 未写协议的地址（如 Weaviate Cloud 控制台给出的集群地址）默认使用 https
pub fn normalize_endpoint(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.contains("://") { url.to_owned() } else { format!("https://{url}") }
}

/// 通过 REST 接口访问 Weaviate 中的一个集合
pub struct WeaviateCollection {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    schema: CollectionSchema,
}

impl WeaviateCollection {
    pub fn new(opts: &StoreOptions, schema: CollectionSchema) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(Duration::from_secs(opts.request_timeout)).build()?;
        Ok(Self {
            client,
            endpoint: normalize_endpoint(&opts.weaviate_url),
            api_key: opts.weaviate_api_key.clone().filter(|key| !key.is_empty()),
            schema,
        })
    }

    /// 确认服务可达且凭据有效
    pub async fn ready(&self) -> Result<(), StoreError> {
        check(self.request(Method::GET, "/v1/.well-known/ready").send().await?).await?;
        check(self.request(Method::GET, "/v1/schema").send().await?).await?;
        info!("已连接向量数据库，集合 {}", self.schema.name);
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, format!("{}{}", self.endpoint, path));
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn class_definition(&self) -> Value {
        json!({
            "class": self.schema.name,
            "vectorizer": "none",
            "vectorIndexType": "hnsw",
            "vectorIndexConfig": {
                "distance": self.schema.distance,
                "efConstruction": self.schema.ef_construction,
                "maxConnections": self.schema.max_connections,
            },
            "properties": [
                { "name": "personName", "dataType": ["text"] },
            ],
        })
    }

    fn object_body(&self, record: &PersonRecord) -> Value {
        json!({
            "class": self.schema.name,
            "properties": { "personName": record.person_name },
            "vector": record.vector,
        })
    }

    fn aggregate_query(&self) -> Value {
        json!({ "query": format!("{{ Aggregate {{ {} {{ meta {{ count }} }} }} }}", self.schema.name) })
    }
}

async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(StoreError::Unauthorized { status, body })
        }
        _ => Err(StoreError::Rejected { status, body }),
    }
}

fn parse_count(class: &str, body: &Value) -> Result<u64, StoreError> {
    if let Some(errors) = body.get("errors") {
        return Err(StoreError::Decode(errors.to_string()));
    }
    body.pointer(&format!("/data/Aggregate/{class}/0/meta/count"))
        .and_then(Value::as_u64)
        .ok_or_else(|| StoreError::Decode(body.to_string()))
}

#[async_trait]
impl VectorCollection for WeaviateCollection {
    fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    async fn recreate(&self) -> Result<(), StoreError> {
        let path = format!("/v1/schema/{}", self.schema.name);
        let response = self.request(Method::DELETE, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("集合 {} 不存在，无需删除", self.schema.name);
        } else {
            check(response).await?;
            info!("已删除集合 {}", self.schema.name);
        }

        check(self.request(Method::POST, "/v1/schema").json(&self.class_definition()).send().await?)
            .await?;
        info!("已创建集合 {}", self.schema.name);
        Ok(())
    }

    async fn insert(&self, person_name: &str, vector: Vec<f32>) -> Result<(), StoreError> {
        self.schema.check_dimension(&vector)?;
        let record = PersonRecord { person_name: person_name.to_owned(), vector };
        check(self.request(Method::POST, "/v1/objects").json(&self.object_body(&record)).send().await?)
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let response =
            self.request(Method::POST, "/v1/graphql").json(&self.aggregate_query()).send().await?;
        let text = check(response).await?.text().await?;
        let body: Value =
            serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))?;
        parse_count(&self.schema.name, &body)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, header};
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    use super::*;
    use crate::store::Distance;

    fn schema() -> CollectionSchema {
        CollectionSchema {
            name: "FaceEmbedding".to_string(),
            dimension: 3,
            distance: Distance::Cosine,
            ef_construction: 128,
            max_connections: 64,
        }
    }

    fn collection_at(endpoint: &str, api_key: Option<&str>) -> WeaviateCollection {
        WeaviateCollection {
            client: Client::new(),
            endpoint: normalize_endpoint(endpoint),
            api_key: api_key.map(str::to_owned),
            schema: schema(),
        }
    }

    fn collection() -> WeaviateCollection {
        collection_at("example.weaviate.cloud/", None)
    }

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    /// 只实现用到的几个接口的 Weaviate
    #[derive(Default)]
    struct FakeWeaviate {
        classes: Vec<Value>,
        objects: Vec<Value>,
        deleted_missing: usize,
        authorization: Vec<Option<String>>,
    }

    type Shared = Arc<Mutex<FakeWeaviate>>;

    async fn delete_class(State(db): State<Shared>, Path(class): Path<String>) -> StatusCode {
        let mut db = db.lock().unwrap();
        let before = db.classes.len();
        db.classes.retain(|c| c["class"] != class.as_str());
        if db.classes.len() == before {
            db.deleted_missing += 1;
            return StatusCode::NOT_FOUND;
        }
        db.objects.retain(|o| o["class"] != class.as_str());
        StatusCode::OK
    }

    async fn create_class(State(db): State<Shared>, Json(class): Json<Value>) -> StatusCode {
        let mut db = db.lock().unwrap();
        if db.classes.iter().any(|c| c["class"] == class["class"]) {
            return StatusCode::UNPROCESSABLE_ENTITY;
        }
        db.classes.push(class);
        StatusCode::OK
    }

    async fn create_object(State(db): State<Shared>, headers: HeaderMap, Json(object): Json<Value>) -> StatusCode {
        let mut db = db.lock().unwrap();
        db.authorization.push(headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_owned));
        if !db.classes.iter().any(|c| c["class"] == object["class"]) {
            return StatusCode::UNPROCESSABLE_ENTITY;
        }
        db.objects.push(object);
        StatusCode::OK
    }

    async fn aggregate(State(db): State<Shared>, Json(query): Json<Value>) -> Json<Value> {
        assert!(query["query"].as_str().unwrap().contains("Aggregate { FaceEmbedding"));
        let count = db.lock().unwrap().objects.len();
        let aggregate = json!({ "FaceEmbedding": [{ "meta": { "count": count } }] });
        Json(json!({ "data": { "Aggregate": aggregate } }))
    }

    async fn fake_weaviate() -> (String, Shared) {
        let db = Shared::default();
        let app = Router::new()
            .route("/v1/.well-known/ready", get(|| async { StatusCode::OK }))
            .route("/v1/schema", get(|| async { Json(json!({ "classes": [] })) }).post(create_class))
            .route("/v1/schema/{class}", delete(delete_class))
            .route("/v1/objects", post(create_object))
            .route("/v1/graphql", post(aggregate))
            .with_state(db.clone());
        (serve(app).await, db)
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("abc.weaviate.cloud"), "https://abc.weaviate.cloud");
        assert_eq!(normalize_endpoint("http://127.0.0.1:8080/"), "http://127.0.0.1:8080");
        assert_eq!(normalize_endpoint(" https://x.io "), "https://x.io");
    }

    #[test]
    fn test_class_definition() {
        let class = collection().class_definition();
        assert_eq!(class["class"], "FaceEmbedding");
        assert_eq!(class["vectorizer"], "none");
        assert_eq!(class["vectorIndexConfig"]["distance"], "cosine");
        assert_eq!(class["vectorIndexConfig"]["efConstruction"], 128);
        assert_eq!(class["vectorIndexConfig"]["maxConnections"], 64);
        assert_eq!(class["properties"].as_array().unwrap().len(), 1);
        assert_eq!(class["properties"][0]["name"], "personName");
    }

    #[test]
    fn test_parse_count() {
        let body = json!({ "data": { "Aggregate": { "FaceEmbedding": [{ "meta": { "count": 42 } }] } } });
        assert_eq!(parse_count("FaceEmbedding", &body).unwrap(), 42);

        let body = json!({ "errors": [{ "message": "class not found" }] });
        assert!(matches!(parse_count("FaceEmbedding", &body), Err(StoreError::Decode(_))));
    }

    #[tokio::test]
    async fn test_insert_checks_dimension_before_sending() {
        let err = collection().insert("Alice", vec![0.0; 5]).await.unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 3, actual: 5 }));
    }

    #[tokio::test]
    async fn test_recreate_twice_leaves_empty_collection() {
        let (endpoint, db) = fake_weaviate().await;
        let collection = collection_at(&endpoint, None);
        collection.ready().await.unwrap();

        // 首次创建时集合不存在，删除返回 404
        collection.recreate().await.unwrap();
        assert_eq!(db.lock().unwrap().deleted_missing, 1);
        assert_eq!(collection.count().await.unwrap(), 0);

        collection.insert("Alice", vec![0.5, 0.25, 1.0]).await.unwrap();
        collection.insert("Alice", vec![0.0, 1.0, 0.0]).await.unwrap();
        assert_eq!(collection.count().await.unwrap(), 2);

        collection.recreate().await.unwrap();
        assert_eq!(collection.count().await.unwrap(), 0);
        collection.recreate().await.unwrap();
        assert_eq!(collection.count().await.unwrap(), 0);

        let db = db.lock().unwrap();
        assert_eq!(db.classes.len(), 1);
        assert_eq!(db.classes[0]["vectorIndexConfig"]["distance"], "cosine");
        assert_eq!(db.deleted_missing, 1);
    }

    #[tokio::test]
    async fn test_insert_sends_person_record() {
        let (endpoint, db) = fake_weaviate().await;
        let collection = collection_at(&endpoint, Some("secret"));
        collection.recreate().await.unwrap();
        collection.insert("Alice", vec![0.5, 0.25, 1.0]).await.unwrap();

        let db = db.lock().unwrap();
        assert_eq!(db.objects.len(), 1);
        assert_eq!(db.objects[0]["class"], "FaceEmbedding");
        assert_eq!(db.objects[0]["properties"], json!({ "personName": "Alice" }));
        assert_eq!(db.objects[0]["vector"], json!([0.5, 0.25, 1.0]));
        assert_eq!(db.authorization, [Some("Bearer secret".to_string())]);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_unauthorized() {
        let denied = || async { (StatusCode::UNAUTHORIZED, "anonymous access not enabled") };
        let app = Router::new()
            .route("/v1/.well-known/ready", get(|| async { StatusCode::OK }))
            .route("/v1/schema", get(denied));
        let collection = collection_at(&serve(app).await, Some("wrong"));

        let err = collection.ready().await.unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized { status: StatusCode::UNAUTHORIZED, .. }));
        assert!(err.to_string().contains("anonymous access not enabled"));
    }

    #[tokio::test]
    async fn test_rejected_schema_is_rejected() {
        let app = Router::new()
            .route("/v1/schema/{class}", delete(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/v1/schema",
                post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "invalid vectorIndexConfig") }),
            );
        let collection = collection_at(&serve(app).await, None);

        let err = collection.recreate().await.unwrap_err();
        match err {
            StoreError::Rejected { status, body } => {
                assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
                assert_eq!(body, "invalid vectorIndexConfig");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_hides_endpoint() {
        let collection = collection_at("http://127.0.0.1:9", None);
        let err = collection.ready().await.unwrap_err();
        assert!(matches!(err, StoreError::Unreachable(_)));
        assert!(!err.to_string().contains("127.0.0.1:9"));
    }
}
