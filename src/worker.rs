use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};

use crate::errors::{Error, Result};
use crate::imaging::encode_base64;
use crate::load_balancer::BackendPool;
use crate::models::{GenerationJob, GenerationMode, QueuedJob};

// Diffusion backend request body
#[derive(Debug, Serialize)]
struct DiffusionRequest<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    num_inference_steps: u32,
    guidance_scale: f32,
    width: u32,
    height: u32,
    num_images: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strength: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reference_images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DiffusionResponse {
    images: Vec<String>,
}

impl<'a> DiffusionRequest<'a> {
    fn from_job(job: &'a GenerationJob) -> Self {
        let p = &job.params;
        let img2img = job.base_image.is_some();
        Self {
            prompt: &job.prompt,
            negative_prompt: &p.negative_prompt,
            num_inference_steps: p.num_inference_steps,
            guidance_scale: p.guidance_scale,
            width: p.width,
            height: p.height,
            num_images: p.num_images,
            seed: p.seed,
            image: job.base_image.as_deref().map(encode_base64),
            strength: img2img.then_some(p.strength),
            reference_images: if img2img {
                job.reference_images.iter().map(|b| encode_base64(b)).collect()
            } else {
                Vec::new()
            },
        }
    }
}

/// Consumes queued jobs. Running jobs are capped at the pool size and each
/// backend serves one job at a time.
pub async fn generation_worker(
    mut rx: mpsc::Receiver<QueuedJob>,
    client: reqwest::Client,
    pool: Arc<BackendPool>,
) {
    let slots = Arc::new(Semaphore::new(pool.all_backends().len()));
    tracing::info!(
        "generation worker started - {} concurrent job(s)",
        pool.all_backends().len()
    );

    while let Some(queued) = rx.recv().await {
        let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
            break;
        };
        let client = client.clone();
        let pool = Arc::clone(&pool);

        tokio::spawn(async move {
            let result = run_job(&client, &pool, &queued.job).await;
            drop(permit);
            // the handler may have gone away, nothing to do then
            let _ = queued.response_tx.send(result);
        });
    }
    tracing::info!("generation queue closed, worker exiting");
}

pub async fn run_job(
    client: &reqwest::Client,
    pool: &BackendPool,
    job: &GenerationJob,
) -> Result<Vec<String>> {
    let backend = pool.require_backend()?;
    let _slot = backend.reserve().await?;
    let route = match job.mode() {
        GenerationMode::TextToImage => "txt2img",
        GenerationMode::ImageToImage => "img2img",
    };
    let url = format!("{}/{route}", backend.url);
    tracing::info!(
        "[worker] {route} on {} ({} image(s), {} steps)",
        backend.url,
        job.params.num_images,
        job.params.num_inference_steps
    );

    let res = match client.post(&url).json(&DiffusionRequest::from_job(job)).send().await {
        Ok(res) => res,
        // transport failure, stop routing here until the next health probe
        Err(e) => {
            backend.set_healthy(false);
            tracing::warn!("[worker] backend {} failed, marked unhealthy", backend.url);
            return Err(Error::Backend { url, source: e });
        }
    };

    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(Error::BackendResponse {
            url,
            reason: format!("status {status}: {}", crate::prompt::truncate(&body, 200)),
        });
    }

    let body: DiffusionResponse = res.json().await.map_err(|e| Error::BackendResponse {
        url: url.clone(),
        reason: format!("parse error: {e}"),
    })?;
    if body.images.is_empty() {
        return Err(Error::BackendResponse {
            url,
            reason: "no images returned".to_string(),
        });
    }
    Ok(body.images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerationRequest;
    use crate::params::GenerationParams;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn job(base_image: Option<Vec<u8>>) -> GenerationJob {
        let req: GenerationRequest =
            serde_json::from_value(json!({"prompt": "p", "steps": 4, "seed": 7})).unwrap();
        GenerationJob {
            prompt: "a calm bedroom".into(),
            params: GenerationParams::resolve(&req),
            base_image,
            reference_images: vec![b"refimage".to_vec()],
        }
    }

    #[test]
    fn text_to_image_body_has_no_image_fields() {
        let job = job(None);
        let body = serde_json::to_value(DiffusionRequest::from_job(&job)).unwrap();
        assert_eq!(body["num_inference_steps"], 4);
        assert_eq!(body["seed"], 7);
        assert!(body.get("image").is_none());
        assert!(body.get("strength").is_none());
        assert!(body.get("reference_images").is_none());
    }

    #[test]
    fn image_to_image_body_carries_images() {
        let job = job(Some(b"baseimage".to_vec()));
        let body = serde_json::to_value(DiffusionRequest::from_job(&job)).unwrap();
        assert_eq!(body["image"], encode_base64(b"baseimage"));
        assert_eq!(body["reference_images"][0], encode_base64(b"refimage"));
        assert!(body["strength"].as_f64().is_some());
    }

    #[tokio::test]
    async fn routes_by_mode_and_returns_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/img2img"))
            .and(body_partial_json(json!({"prompt": "a calm bedroom"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"images": ["aW1n"]})))
            .expect(1)
            .mount(&server)
            .await;

        let pool = BackendPool::new("diffusion", &server.uri()).unwrap();
        let images = run_job(&reqwest::Client::new(), &pool, &job(Some(b"baseimage".to_vec())))
            .await
            .unwrap();
        assert_eq!(images, vec!["aW1n"]);
    }

    #[tokio::test]
    async fn backend_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/txt2img"))
            .respond_with(ResponseTemplate::new(500).set_body_string("CUDA out of memory"))
            .mount(&server)
            .await;

        let pool = BackendPool::new("diffusion", &server.uri()).unwrap();
        let err = run_job(&reqwest::Client::new(), &pool, &job(None)).await.unwrap_err();
        match err {
            Error::BackendResponse { reason, .. } => assert!(reason.contains("CUDA out of memory")),
            other => panic!("unexpected error: {other}"),
        }
        // an HTTP error is not a transport failure
        assert!(pool.all_backends()[0].is_healthy());
    }

    #[tokio::test]
    async fn unreachable_backend_is_marked_unhealthy() {
        // grab a free port and release it so the connection is refused
        let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let pool = BackendPool::new("diffusion", &addr.to_string()).unwrap();
        let err = run_job(&reqwest::Client::new(), &pool, &job(None)).await.unwrap_err();
        assert!(matches!(err, Error::Backend { .. }));
        assert!(!pool.all_backends()[0].is_healthy());
    }

    #[tokio::test]
    async fn jobs_on_one_backend_run_one_at_a_time() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/txt2img"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"images": ["a"]}))
                    .set_delay(std::time::Duration::from_millis(300)),
            )
            .expect(2)
            .mount(&server)
            .await;

        // two slots in the pool but only one healthy backend
        let pool = BackendPool::new("diffusion", &format!("{},localhost:1", server.uri())).unwrap();
        pool.all_backends()[1].set_healthy(false);
        let client = reqwest::Client::new();
        let (first, second) = (job(None), job(None));

        let start = std::time::Instant::now();
        let (a, b) = tokio::join!(
            run_job(&client, &pool, &first),
            run_job(&client, &pool, &second)
        );
        assert!(a.is_ok() && b.is_ok());
        assert!(start.elapsed() >= std::time::Duration::from_millis(600));
    }

    #[tokio::test]
    async fn worker_answers_through_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/txt2img"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"images": ["a", "b"]})))
            .mount(&server)
            .await;

        let pool = Arc::new(BackendPool::new("diffusion", &server.uri()).unwrap());
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(generation_worker(rx, reqwest::Client::new(), pool));

        let (response_tx, response_rx) = tokio::sync::oneshot::channel();
        tx.send(QueuedJob { job: job(None), response_tx }).await.unwrap();
        assert_eq!(response_rx.await.unwrap().unwrap(), vec!["a", "b"]);
    }
}
