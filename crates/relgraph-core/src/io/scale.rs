//! Image resize factor lookup (`im_scale`).

use std::path::PathBuf;

use crate::config::ImageScaleConfig;
use crate::error::{PipelineError, PipelineResult};

/// Resolves the resize factor a detector applies to an image.
pub trait ImageScale {
    fn image_scale(&self, filename: &str) -> PipelineResult<f64>;
}

/// Same scale for every image.
#[derive(Debug, Clone, Copy)]
pub struct FixedScale(pub f64);

impl ImageScale for FixedScale {
    fn image_scale(&self, _filename: &str) -> PipelineResult<f64> {
        Ok(self.0)
    }
}

/// Scale derived from the image's on-disk dimensions.
///
/// Only the header is read, so this stays cheap across a full corpus.
pub struct ImageHeaderScale {
    images_dir: PathBuf,
    target_size: f64,
    max_size: f64,
}

impl ImageHeaderScale {
    pub fn new(images_dir: PathBuf, config: &ImageScaleConfig) -> Self {
        Self {
            images_dir,
            target_size: f64::from(config.target_size),
            max_size: f64::from(config.max_size),
        }
    }

    /// Shorter side to `target_size`, unless that pushes the longer side past `max_size`.
    pub fn scale_for(&self, width: u32, height: u32) -> Option<f64> {
        let short = f64::from(width.min(height));
        let long = f64::from(width.max(height));
        if short == 0.0 {
            return None;
        }
        let scale = self.target_size / short;
        if (scale * long).round() > self.max_size {
            Some(self.max_size / long)
        } else {
            Some(scale)
        }
    }
}

impl ImageScale for ImageHeaderScale {
    fn image_scale(&self, filename: &str) -> PipelineResult<f64> {
        let path = self.images_dir.join(filename);
        let (width, height) =
            image::image_dimensions(&path).map_err(|e| PipelineError::ImageScale {
                filename: filename.to_string(),
                message: format!("cannot read dimensions of {:?}: {}", path, e),
            })?;

        self.scale_for(width, height)
            .ok_or_else(|| PipelineError::ImageScale {
                filename: filename.to_string(),
                message: format!("image has zero size ({width}x{height})"),
            })
    }
}
