//! Photometric calibration: inverse camera response and vignette correction.

use std::path::Path;

use tracing::info;

use super::CalibError;

/// Inverse response function plus optional inverse vignette map.
///
/// The response file holds 256 whitespace-separated samples of the camera
/// response G, monotonically non-decreasing; it is rescaled so the output
/// range is [0, 255]. The vignette is an image matching the calibration
/// input size, normalized by its maximum.
#[derive(Debug, Clone)]
pub struct PhotometricCalib {
    inv_response: [f32; 256],
    /// Per-pixel multiplicative correction (1 / vignette), input resolution.
    inv_vignette: Option<Vec<f32>>,
}

impl PhotometricCalib {
    pub fn from_files(
        gamma_path: &Path,
        vignette_path: Option<&Path>,
        in_width: usize,
        in_height: usize,
    ) -> Result<Self, CalibError> {
        let inv_response = load_response(gamma_path)?;
        let inv_vignette = vignette_path
            .map(|p| load_inverse_vignette(p, in_width, in_height))
            .transpose()?;

        info!(
            vignette = inv_vignette.is_some(),
            "photometric calibration loaded"
        );
        Ok(Self {
            inv_response,
            inv_vignette,
        })
    }

    /// The 256-sample inverse response, for forwarding to the engine.
    pub fn response(&self) -> &[f32; 256] {
        &self.inv_response
    }

    /// Map a raw byte value to corrected irradiance at pixel `idx`.
    #[inline]
    pub fn correct(&self, raw: u8, idx: usize) -> f32 {
        let v = self.inv_response[raw as usize];
        match &self.inv_vignette {
            Some(iv) => v * iv[idx],
            None => v,
        }
    }
}

fn load_response(path: &Path) -> Result<[f32; 256], CalibError> {
    let text = std::fs::read_to_string(path).map_err(|source| CalibError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let values: Vec<f32> = text
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|e| CalibError::Malformed {
            path: path.to_path_buf(),
            reason: format!("non-numeric response sample: {e}"),
        })?;

    if values.len() != 256 {
        return Err(CalibError::Malformed {
            path: path.to_path_buf(),
            reason: format!("expected 256 response samples, got {}", values.len()),
        });
    }
    if values.windows(2).any(|w| w[1] < w[0]) {
        return Err(CalibError::Malformed {
            path: path.to_path_buf(),
            reason: "response function is not monotonically non-decreasing".into(),
        });
    }

    let min = values[0];
    let max = values[255];
    if max <= min {
        return Err(CalibError::Malformed {
            path: path.to_path_buf(),
            reason: "response function is constant".into(),
        });
    }

    // Rescale to [0, 255].
    let mut response = [0.0f32; 256];
    for (out, v) in response.iter_mut().zip(&values) {
        *out = 255.0 * (v - min) / (max - min);
    }
    Ok(response)
}

fn load_inverse_vignette(
    path: &Path,
    in_width: usize,
    in_height: usize,
) -> Result<Vec<f32>, CalibError> {
    let img = image::open(path)
        .map_err(|source| CalibError::VignetteDecode {
            path: path.to_path_buf(),
            source,
        })?
        .into_luma16();

    let (got_w, got_h) = (img.width() as usize, img.height() as usize);
    if got_w != in_width || got_h != in_height {
        return Err(CalibError::VignetteSize {
            got_w,
            got_h,
            want_w: in_width,
            want_h: in_height,
        });
    }

    let max = img.pixels().map(|p| p.0[0]).max().unwrap_or(0);
    if max == 0 {
        return Err(CalibError::Malformed {
            path: path.to_path_buf(),
            reason: "vignette image is all zero".into(),
        });
    }

    let max = max as f32;
    Ok(img
        .pixels()
        .map(|p| {
            let v = p.0[0] as f32 / max;
            if v > 0.0 {
                1.0 / v
            } else {
                0.0
            }
        })
        .collect())
}
