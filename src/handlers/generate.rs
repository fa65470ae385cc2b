use axum::{Json, extract::State};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;

use crate::errors::{Error, Result};
use crate::imaging::{decode_base64_image, sniff_format};
use crate::metrics::{GENERATION_LATENCY, REQUEST_TOTAL};
use crate::models::{
    GenerationJob, GenerationParameters, GenerationRequest, GenerationResponse, QueuedJob,
};
use crate::params::GenerationParams;
use crate::prompt::{build_generation_prompt, truncate, with_reference_prefix};
use crate::state::AppState;

const MAX_REFERENCE_IMAGES: usize = 6;
const COST_PER_IMAGE: f64 = 0.05;

fn decode_image(b64: &str) -> Result<Vec<u8>> {
    let bytes = decode_base64_image(b64)?;
    sniff_format(&bytes)?;
    Ok(bytes)
}

// undecodable references are skipped, not fatal
fn decode_references(images: &[String]) -> Vec<Vec<u8>> {
    if images.len() > MAX_REFERENCE_IMAGES {
        tracing::warn!(
            "{} inspiration images sent, only the first {MAX_REFERENCE_IMAGES} are used",
            images.len()
        );
    }
    images
        .iter()
        .take(MAX_REFERENCE_IMAGES)
        .enumerate()
        .filter_map(|(i, b64)| match decode_image(b64) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!("failed to decode inspiration image {}: {e}", i + 1);
                None
            }
        })
        .collect()
}

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerationRequest>,
) -> Result<Json<GenerationResponse>> {
    REQUEST_TOTAL.with_label_values(&["generate"]).inc();

    if payload.prompt.trim().is_empty() {
        return Err(Error::BadRequest("prompt must not be empty".to_string()));
    }
    let start_time = Instant::now();
    tracing::info!("generation request: {}", truncate(&payload.prompt, 100));

    let params = GenerationParams::resolve(&payload);
    let base_image = payload
        .base_image
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(decode_image)
        .transpose()?;
    let reference_images =
        decode_references(payload.inspiration_images.as_deref().unwrap_or_default());

    let mut prompt =
        build_generation_prompt(&payload.prompt, &payload.style, &payload.modifications);
    if !reference_images.is_empty() {
        prompt = with_reference_prefix(&prompt);
    }
    let prompt = truncate(&prompt, state.max_prompt_chars);

    let job = GenerationJob {
        prompt,
        params,
        base_image,
        reference_images,
    };
    let parameters = GenerationParameters {
        prompt: job.prompt.clone(),
        style: payload.style.clone(),
        mode: job.mode(),
        steps: job.params.num_inference_steps,
        guidance: job.params.guidance_scale,
        width: job.params.width,
        height: job.params.height,
        num_images: job.params.num_images,
        seed: job.params.seed,
        inspiration_count: job.reference_images.len(),
    };

    let (response_tx, response_rx) = oneshot::channel();
    state
        .jobs_tx
        .send(QueuedJob { job, response_tx })
        .await
        .map_err(|_| Error::QueueClosed)?;

    let images = response_rx.await.map_err(|_| Error::WorkerDropped)??;

    let elapsed = start_time.elapsed().as_secs_f64();
    GENERATION_LATENCY.observe(elapsed);
    tracing::info!("generated {} image(s) in {:.2}s", images.len(), elapsed);

    Ok(Json(GenerationResponse {
        cost_estimate: parameters.num_images as f64 * COST_PER_IMAGE,
        images,
        parameters,
        processing_time: elapsed,
    }))
}
