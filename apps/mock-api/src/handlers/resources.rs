//! Generic REST handlers over any record collection.

use std::cmp::Ordering;

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::Value;

use firebook_core::domain::{Record, RecordExt};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Header carrying the number of matching records before slicing.
const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// Default page size when `_page` is given without `_limit`.
const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Deserialize)]
pub struct RecordPath {
    collection: String,
    id: String,
}

/// Parsed list query: equality filters plus json-server's `_` operators.
#[derive(Debug, Default, PartialEq)]
struct ListQuery {
    /// `(field, accepted values)`; a field given twice matches either value.
    filters: Vec<(String, Vec<String>)>,
    sort: Vec<(String, bool)>,
    start: Option<usize>,
    end: Option<usize>,
    limit: Option<usize>,
    page: Option<usize>,
}

impl ListQuery {
    fn parse(pairs: Vec<(String, String)>) -> Self {
        let mut query = ListQuery::default();
        let mut sort_fields = Vec::new();
        let mut orders = Vec::new();

        for (key, value) in pairs {
            match key.as_str() {
                "_sort" => sort_fields.extend(split_list(&value)),
                "_order" => orders.extend(split_list(&value)),
                "_start" => query.start = value.parse().ok(),
                "_end" => query.end = value.parse().ok(),
                "_limit" => query.limit = value.parse().ok(),
                "_page" => query.page = value.parse().ok().filter(|p| *p > 0),
                other if other.starts_with('_') => {}
                field => match query.filters.iter_mut().find(|(f, _)| f == field) {
                    Some((_, values)) => values.push(value),
                    None => query.filters.push((field.to_string(), vec![value])),
                },
            }
        }

        query.sort = sort_fields
            .into_iter()
            .enumerate()
            .map(|(i, field)| {
                let descending = orders
                    .get(i)
                    .is_some_and(|order| order.eq_ignore_ascii_case("desc"));
                (field, descending)
            })
            .collect();
        query
    }

    fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|(field, values)| {
            values
                .iter()
                .any(|expected| record.field_matches(field, expected))
        })
    }

    fn apply(&self, records: Vec<Record>) -> (usize, Vec<Record>) {
        let mut matching: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();
        let total = matching.len();

        if !self.sort.is_empty() {
            matching.sort_by(|a, b| {
                self.sort
                    .iter()
                    .map(|(field, descending)| {
                        let ordering = compare_values(a.get(field), b.get(field));
                        if *descending { ordering.reverse() } else { ordering }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        let (start, end) = match (self.page, self.start) {
            (Some(page), _) => {
                let size = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
                let start = (page - 1).saturating_mul(size);
                (start, start.saturating_add(size))
            }
            (None, start) => {
                let start = start.unwrap_or(0);
                let end = match (self.end, self.limit) {
                    (Some(end), _) => end,
                    (None, Some(limit)) => start.saturating_add(limit),
                    (None, None) => usize::MAX,
                };
                (start, end)
            }
        };

        let sliced = matching
            .into_iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect();
        (total, sliced)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Order JSON values: missing first, then numbers, then strings, then the rest.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.map(Value::to_string).cmp(&b.map(Value::to_string))),
    }
}

fn into_record(body: Value) -> AppResult<Record> {
    match body {
        Value::Object(record) => Ok(record),
        _ => Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
    }
}

fn not_found(collection: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{}/{} not found", collection, id))
}

/// GET /{collection}
pub async fn list(
    state: web::Data<AppState>,
    collection: web::Path<String>,
    query: web::Query<Vec<(String, String)>>,
) -> AppResult<HttpResponse> {
    let records = state.store.list(&collection).await?;
    let (total, records) = ListQuery::parse(query.into_inner()).apply(records);

    Ok(HttpResponse::Ok()
        .insert_header((TOTAL_COUNT_HEADER, total.to_string()))
        .json(records))
}

/// GET /{collection}/{id}
pub async fn get(
    state: web::Data<AppState>,
    path: web::Path<RecordPath>,
) -> AppResult<HttpResponse> {
    let record = state
        .store
        .find_by_id(&path.collection, &path.id)
        .await?
        .ok_or_else(|| not_found(&path.collection, &path.id))?;

    Ok(HttpResponse::Ok().json(record))
}

/// POST /{collection}
pub async fn create(
    state: web::Data<AppState>,
    collection: web::Path<String>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let record = into_record(body.into_inner())?;
    let created = state.store.create(&collection, record).await?;

    Ok(HttpResponse::Created().json(created))
}

/// PUT /{collection}/{id}
pub async fn replace(
    state: web::Data<AppState>,
    path: web::Path<RecordPath>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let record = into_record(body.into_inner())?;
    let replaced = state
        .store
        .replace(&path.collection, &path.id, record)
        .await?
        .ok_or_else(|| not_found(&path.collection, &path.id))?;

    Ok(HttpResponse::Ok().json(replaced))
}

/// PATCH /{collection}/{id}
pub async fn patch(
    state: web::Data<AppState>,
    path: web::Path<RecordPath>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let fields = into_record(body.into_inner())?;
    let patched = state
        .store
        .patch(&path.collection, &path.id, fields)
        .await?
        .ok_or_else(|| not_found(&path.collection, &path.id))?;

    Ok(HttpResponse::Ok().json(patched))
}

/// DELETE /{collection}/{id}
pub async fn delete(
    state: web::Data<AppState>,
    path: web::Path<RecordPath>,
) -> AppResult<HttpResponse> {
    state
        .store
        .delete(&path.collection, &path.id)
        .await?
        .ok_or_else(|| not_found(&path.collection, &path.id))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::test as actix_test;
    use actix_web::{App, http::StatusCode};
    use firebook_infra::InMemoryDocumentStore;
    use serde_json::json;

    use super::*;
    use crate::handlers::configure_routes;

    fn pairs(query: &[(&str, &str)]) -> Vec<(String, String)> {
        query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn posts() -> Vec<Record> {
        [
            json!({ "id": "a", "author": "u1", "postedAt": 3 }),
            json!({ "id": "b", "author": "u2", "postedAt": 1 }),
            json!({ "id": "c", "author": "u1", "postedAt": 2 }),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    fn ids(records: &[Record]) -> Vec<String> {
        records.iter().filter_map(|r| r.id_key()).collect()
    }

    #[test]
    fn test_filter_and_sort_descending() {
        let query = ListQuery::parse(pairs(&[
            ("author", "u1"),
            ("_sort", "postedAt"),
            ("_order", "desc"),
        ]));
        let (total, records) = query.apply(posts());

        assert_eq!(total, 2);
        assert_eq!(ids(&records), vec!["a", "c"]);
    }

    #[test]
    fn test_repeated_filter_matches_any_value() {
        let query = ListQuery::parse(pairs(&[("id", "a"), ("id", "b")]));
        let (_, records) = query.apply(posts());
        assert_eq!(ids(&records), vec!["a", "b"]);
    }

    #[test]
    fn test_slicing() {
        let (total, records) = ListQuery::parse(pairs(&[("_start", "1"), ("_limit", "1")])).apply(posts());
        assert_eq!(total, 3);
        assert_eq!(ids(&records), vec!["b"]);

        let (_, records) = ListQuery::parse(pairs(&[("_page", "2"), ("_limit", "2")])).apply(posts());
        assert_eq!(ids(&records), vec!["c"]);

        let (_, records) = ListQuery::parse(pairs(&[("_start", "2"), ("_end", "1")])).apply(posts());
        assert!(records.is_empty());
    }

    #[test]
    fn test_compare_values_orders_missing_first() {
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!(1)), Some(&json!("1"))), Ordering::Less);
    }

    #[actix_web::test]
    async fn test_crud_round_trip() {
        let state = AppState::new(Arc::new(InMemoryDocumentStore::new()));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/users")
            .set_json(json!({ "displayName": "Alice" }))
            .to_request();
        let created: Value = actix_test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_str().unwrap().to_string();

        let req = actix_test::TestRequest::patch()
            .uri(&format!("/users/{id}"))
            .set_json(json!({ "photoURL": "http://localhost:5000/_storage/1.png" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = actix_test::TestRequest::get().uri(&format!("/users/{id}")).to_request();
        let user: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(user["displayName"], "Alice");
        assert_eq!(user["photoURL"], "http://localhost:5000/_storage/1.png");

        let req = actix_test::TestRequest::get().uri("/users?displayName=Alice").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.headers().get(TOTAL_COUNT_HEADER).unwrap(), "1");

        let req = actix_test::TestRequest::delete().uri(&format!("/users/{id}")).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = actix_test::TestRequest::get().uri(&format!("/users/{id}")).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_rejects_non_object_bodies() {
        let state = AppState::new(Arc::new(InMemoryDocumentStore::new()));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/posts")
            .set_json(json!([1, 2, 3]))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::post()
            .uri("/posts")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{ broken")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_duplicate_id_conflicts() {
        let state = AppState::new(Arc::new(InMemoryDocumentStore::new()));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
            let req = actix_test::TestRequest::post()
                .uri("/posts")
                .set_json(json!({ "id": "p1", "author": "u1" }))
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), expected);
        }
    }
}
