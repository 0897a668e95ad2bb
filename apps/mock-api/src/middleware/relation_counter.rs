//! Keeps parent counters in step with child creates and deletes.

use actix_web::{
    Error, HttpMessage,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    error::PayloadError,
    http::Method,
    web,
};
use futures::StreamExt;
use serde_json::Value;
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use firebook_core::domain::{RecordExt, id_key};
use firebook_core::ports::DocumentStore;
use firebook_core::relation::RelationConfig;

use crate::handlers::JSON_LIMIT;

/// Relation counter middleware factory.
///
/// Wraps the REST handlers: a successful `POST /{child}` bumps the
/// referenced parent's counter, a successful `DELETE /{child}/{id}` lowers
/// it. Counter failures never change the response.
pub struct RelationCounter {
    store: Arc<dyn DocumentStore>,
    relations: Rc<Vec<RelationConfig>>,
    body_limit: usize,
}

impl RelationCounter {
    pub fn new(store: Arc<dyn DocumentStore>, relations: Vec<RelationConfig>) -> Self {
        Self {
            store,
            relations: Rc::new(relations),
            body_limit: JSON_LIMIT,
        }
    }

    /// Largest create body buffered before answering 413.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RelationCounter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RelationCounterService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RelationCounterService {
            service: Rc::new(service),
            store: self.store.clone(),
            relations: self.relations.clone(),
            body_limit: self.body_limit,
        }))
    }
}

pub struct RelationCounterService<S> {
    service: Rc<S>,
    store: Arc<dyn DocumentStore>,
    relations: Rc<Vec<RelationConfig>>,
    body_limit: usize,
}

/// What a request means for one relation.
enum CounterChange {
    Created(RelationConfig),
    Deleted(RelationConfig, String),
}

impl<S> RelationCounterService<S> {
    fn classify(&self, method: &Method, path: &str) -> Option<CounterChange> {
        let segments: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let relation = self
            .relations
            .iter()
            .find(|r| segments.first() == Some(&r.child_collection.as_str()))?
            .clone();

        match segments.as_slice() {
            [_] if *method == Method::POST => Some(CounterChange::Created(relation)),
            [_, id] if *method == Method::DELETE => {
                let id = urlencoding::decode(id).ok()?;
                Some(CounterChange::Deleted(relation, id.into_owned()))
            }
            _ => None,
        }
    }
}

impl<S, B> Service<ServiceRequest> for RelationCounterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let change = match self.classify(req.method(), req.path()) {
            // The JSON extractor rejects anything else, so there is nothing to count.
            Some(CounterChange::Created(_)) if !is_json(&req) => None,
            change => change,
        };
        let Some(change) = change else {
            let fut = self.service.call(req);
            return Box::pin(fut);
        };

        let service = self.service.clone();
        let store = self.store.clone();
        let body_limit = self.body_limit;

        Box::pin(async move {
            match change {
                CounterChange::Created(relation) => {
                    let body = buffer_body(&mut req, body_limit).await?;
                    let parent_id = serde_json::from_slice::<Value>(&body)
                        .ok()
                        .and_then(|v| v.get(&relation.parent_ref_field).and_then(id_key));
                    req.set_payload(Payload::from(body));

                    let res = service.call(req).await?;
                    if !res.status().is_success() {
                        return Ok(res);
                    }
                    match parent_id {
                        Some(parent_id) => adjust(store.as_ref(), &relation, &parent_id, 1).await,
                        None => tracing::debug!(
                            relation = %relation,
                            "Created child carries no parent reference"
                        ),
                    }
                    Ok(res)
                }
                CounterChange::Deleted(relation, child_id) => {
                    // The child is gone once the handler runs, so read the reference first.
                    let parent_id =
                        match store.find_by_id(&relation.child_collection, &child_id).await {
                            Ok(Some(child)) => {
                                let parent_id = child.key_of(&relation.parent_ref_field);
                                if parent_id.is_none() {
                                    tracing::debug!(
                                        relation = %relation,
                                        child = %child_id,
                                        "Deleted child carries no parent reference"
                                    );
                                }
                                parent_id
                            }
                            Ok(None) => {
                                tracing::debug!(
                                    relation = %relation,
                                    child = %child_id,
                                    "Deleted child not found"
                                );
                                None
                            }
                            Err(e) => {
                                tracing::warn!(
                                    relation = %relation,
                                    child = %child_id,
                                    error = %e,
                                    "Failed to look up deleted child"
                                );
                                None
                            }
                        };

                    let res = service.call(req).await?;
                    if let Some(parent_id) = parent_id
                        && res.status().is_success()
                    {
                        adjust(store.as_ref(), &relation, &parent_id, -1).await;
                    }
                    Ok(res)
                }
            }
        })
    }
}

fn is_json(req: &ServiceRequest) -> bool {
    let Ok(Some(mime)) = req.mime_type() else {
        return false;
    };
    mime.subtype() == "json" || mime.suffix().is_some_and(|s| s == "json")
}

async fn buffer_body(req: &mut ServiceRequest, limit: usize) -> Result<web::Bytes, Error> {
    let mut payload = req.take_payload();
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > limit {
            return Err(PayloadError::Overflow.into());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

async fn adjust(store: &dyn DocumentStore, relation: &RelationConfig, parent_id: &str, delta: i64) {
    match store
        .increment_field(
            &relation.parent_collection,
            parent_id,
            &relation.counter_field,
            delta,
        )
        .await
    {
        Ok(Some(count)) => tracing::debug!(
            relation = %relation,
            parent = %parent_id,
            count,
            "Counter updated"
        ),
        Ok(None) => tracing::debug!(
            relation = %relation,
            parent = %parent_id,
            "Parent not found, counter left alone"
        ),
        Err(e) => tracing::warn!(
            relation = %relation,
            parent = %parent_id,
            error = %e,
            "Failed to update counter"
        ),
    }
}
