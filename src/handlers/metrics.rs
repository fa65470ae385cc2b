use crate::errors::Result;

pub async fn metrics_handler() -> Result<String> {
    Ok(crate::metrics::render()?)
}
