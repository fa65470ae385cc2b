//! Generation parameter resolution.
//!
//! Clients send the same knob under different names (`steps` or
//! `num_inference_steps`, `guidance` or `guidance_scale`, `image_size` or
//! `width`/`height`). The canonical name wins, then the alias, then the
//! default; the result is clamped to what the diffusion backend accepts.

use crate::models::GenerationRequest;

pub const DEFAULT_STEPS: u32 = 20;
pub const DEFAULT_GUIDANCE: f32 = 7.0;
pub const DEFAULT_IMAGE_SIZE: u32 = 1024;
pub const DEFAULT_NUM_IMAGES: u32 = 1;
pub const DEFAULT_STRENGTH: f32 = 0.8;

const STEPS_RANGE: (u32, u32) = (1, 100);
const GUIDANCE_RANGE: (f32, f32) = (0.0, 30.0);
const SIZE_RANGE: (u32, u32) = (256, 2048);
const NUM_IMAGES_RANGE: (u32, u32) = (1, 4);
// latent space is 1/8 of pixel space and patched 2x2
const SIZE_MULTIPLE: u32 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    pub strength: f32,
    pub seed: Option<u64>,
    pub negative_prompt: String,
}

impl GenerationParams {
    pub fn resolve(req: &GenerationRequest) -> Self {
        let steps = req
            .num_inference_steps
            .or(req.steps)
            .unwrap_or(DEFAULT_STEPS);
        let guidance = req
            .guidance_scale
            .or(req.guidance)
            .filter(|g| g.is_finite())
            .unwrap_or(DEFAULT_GUIDANCE);
        let size = req.image_size.unwrap_or(DEFAULT_IMAGE_SIZE);
        let strength = req
            .strength
            .filter(|s| s.is_finite())
            .unwrap_or(DEFAULT_STRENGTH);

        Self {
            num_inference_steps: steps.clamp(STEPS_RANGE.0, STEPS_RANGE.1),
            guidance_scale: guidance.clamp(GUIDANCE_RANGE.0, GUIDANCE_RANGE.1),
            width: clamp_size(req.width.unwrap_or(size)),
            height: clamp_size(req.height.unwrap_or(size)),
            num_images: req
                .num_images
                .unwrap_or(DEFAULT_NUM_IMAGES)
                .clamp(NUM_IMAGES_RANGE.0, NUM_IMAGES_RANGE.1),
            strength: strength.clamp(0.0, 1.0),
            seed: req.seed,
            negative_prompt: req.negative_prompt.clone().unwrap_or_default(),
        }
    }
}

fn clamp_size(size: u32) -> u32 {
    let size = size.clamp(SIZE_RANGE.0, SIZE_RANGE.1);
    size - size % SIZE_MULTIPLE
}
