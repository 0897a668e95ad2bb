//! Simulated network latency.

use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

use crate::config::LatencySettings;

/// Delays every request by a random duration in `[min, max]`.
///
/// Samples are skewed towards `min`: the delay is
/// `min + r² · (max - min)` for a uniform `r` in `[0, 1)`, so most
/// responses are fast with an occasional slow one.
#[derive(Debug, Clone, Copy)]
pub struct Latency {
    min: Duration,
    span: Duration,
}

impl Latency {
    /// Build the middleware; `min` is clamped to `max`.
    pub fn new(min: Duration, max: Duration) -> Self {
        let min = min.min(max);
        Self {
            min,
            span: max - min,
        }
    }

    /// Delay for a uniform sample `r` in `[0, 1)`.
    pub fn delay_for(&self, r: f64) -> Duration {
        let r = r.clamp(0.0, 1.0);
        self.min + self.span.mul_f64(r * r)
    }

    fn sample(&self) -> Duration {
        self.delay_for(rand::random::<f64>())
    }
}

impl From<LatencySettings> for Latency {
    fn from(settings: LatencySettings) -> Self {
        Self::new(settings.min, settings.max)
    }
}

impl<S, B> Transform<S, ServiceRequest> for Latency
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = LatencyService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LatencyService {
            service: Rc::new(service),
            latency: *self,
        }))
    }
}

pub struct LatencyService<S> {
    service: Rc<S>,
    latency: Latency,
}

impl<S, B> Service<ServiceRequest> for LatencyService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let delay = self.latency.sample();

        Box::pin(async move {
            tracing::trace!(delay_ms = delay.as_millis() as u64, "Delaying request");
            tokio::time::sleep(delay).await;
            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test as actix_test;
    use actix_web::{App, HttpResponse, web};
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_delay_formula() {
        let latency = Latency::new(Duration::from_millis(100), Duration::from_millis(1000));

        let close = |d: Duration, secs: f64| (d.as_secs_f64() - secs).abs() < 1e-6;

        assert_eq!(latency.delay_for(0.0), Duration::from_millis(100));
        assert!(close(latency.delay_for(0.5), 0.325));
        assert!(close(latency.delay_for(1.0), 1.0));
    }

    #[test]
    fn test_samples_stay_in_bounds() {
        let min = Duration::from_millis(10);
        let max = Duration::from_millis(40);
        let latency = Latency::new(min, max);

        for _ in 0..1000 {
            let delay = latency.sample();
            assert!(delay >= min && delay <= max, "{delay:?} out of bounds");
        }
    }

    #[test]
    fn test_inverted_bounds_collapse_to_max() {
        let latency = Latency::new(Duration::from_millis(50), Duration::from_millis(20));
        assert_eq!(latency.delay_for(0.0), Duration::from_millis(20));
        assert_eq!(latency.delay_for(0.9), Duration::from_millis(20));
    }

    #[actix_web::test]
    async fn test_requests_are_delayed() {
        let app = actix_test::init_service(
            App::new()
                .wrap(Latency::new(Duration::from_millis(30), Duration::from_millis(30)))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let started = Instant::now();
        let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;

        assert!(resp.status().is_success());
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
