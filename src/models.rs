use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::errors::Error;
use crate::params::GenerationParams;

fn default_style() -> String {
    "modern".to_string()
}

// Image generation request, accepts every historical parameter spelling
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub base_image: Option<String>,
    #[serde(default)]
    pub inspiration_images: Option<Vec<String>>,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub modifications: Vec<String>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub strength: Option<f32>,
    #[serde(default)]
    pub num_inference_steps: Option<u32>,
    #[serde(default)]
    pub steps: Option<u32>,
    #[serde(default)]
    pub guidance_scale: Option<f32>,
    #[serde(default)]
    pub guidance: Option<f32>,
    #[serde(default)]
    pub image_size: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub num_images: Option<u32>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    TextToImage,
    ImageToImage,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationParameters {
    pub prompt: String,
    pub style: String,
    pub mode: GenerationMode,
    pub steps: u32,
    pub guidance: f32,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    pub seed: Option<u64>,
    pub inspiration_count: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationResponse {
    pub images: Vec<String>, // base64 PNG
    pub parameters: GenerationParameters,
    pub processing_time: f64,
    pub cost_estimate: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoomAnalysisRequest {
    pub image: String, // base64, data URI allowed
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RoomAnalysisResponse {
    pub detected_room_type: String,
    pub confidence: f32,
    pub room_description: String,
    pub suggestions: Vec<String>,
    pub comment: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommentContext {
    #[default]
    RoomAnalysis,
    GeneratedImage,
}

impl CommentContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentContext::RoomAnalysis => "room_analysis",
            CommentContext::GeneratedImage => "generated_image",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CommentRequest {
    pub room_type: String,
    pub room_description: String,
    #[serde(default)]
    pub context: CommentContext,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommentResponse {
    pub comment: String,
    pub suggestions: Vec<String>,
}

// Generation job - already decoded and resolved, ready for a backend
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub prompt: String,
    pub params: GenerationParams,
    pub base_image: Option<Vec<u8>>,
    pub reference_images: Vec<Vec<u8>>,
}

impl GenerationJob {
    pub fn mode(&self) -> GenerationMode {
        if self.base_image.is_some() {
            GenerationMode::ImageToImage
        } else {
            GenerationMode::TextToImage
        }
    }
}

// Queued job - holds the job + response channel
pub struct QueuedJob {
    pub job: GenerationJob,
    pub response_tx: oneshot::Sender<Result<Vec<String>, Error>>, // base64 images
}
