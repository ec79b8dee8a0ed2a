//! Geometric undistortion from a DSO-style calibration text file.
//!
//! File layout, one line each:
//!
//! ```text
//! fx fy cx cy [k1 k2 r1 r2]     pinhole, optional radial-tangential terms
//! in_w in_h                     raw input resolution
//! crop | full | none | fx fy cx cy
//! out_w out_h                   rectified output resolution
//! ```
//!
//! Intrinsics given as values below 1.0 are interpreted as normalized by the
//! image size. A remap table (output pixel to source subpixel) is built once
//! at construction; per-frame undistortion is a bilinear resample and cannot
//! fail.

use std::path::Path;

use tracing::info;

use super::{CalibError, CalibratedImage, PhotometricCalib, RawImage};

#[derive(Debug, Clone, Copy)]
struct Pinhole {
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
}

/// Geometric + photometric calibration model, fixed for the process lifetime.
#[derive(Debug)]
pub struct Undistorter {
    in_width: usize,
    in_height: usize,
    out_width: usize,
    out_height: usize,
    /// Source subpixel for each output pixel; `None` maps outside the input.
    /// Empty when the mapping is the identity.
    remap: Vec<Option<(f32, f32)>>,
    photometric: Option<PhotometricCalib>,
}

impl Undistorter {
    /// Build the model from a calibration file plus optional photometric
    /// inputs. Any malformation is fatal here, before frame processing.
    pub fn from_files(
        calib_path: &Path,
        gamma_path: Option<&Path>,
        vignette_path: Option<&Path>,
    ) -> Result<Self, CalibError> {
        let text = std::fs::read_to_string(calib_path).map_err(|source| CalibError::Io {
            path: calib_path.to_path_buf(),
            source,
        })?;
        let mut model = Self::parse(&text, calib_path)?;

        if let Some(gamma) = gamma_path {
            model.photometric = Some(PhotometricCalib::from_files(
                gamma,
                vignette_path,
                model.in_width,
                model.in_height,
            )?);
        }

        info!(
            in_w = model.in_width,
            in_h = model.in_height,
            out_w = model.out_width,
            out_h = model.out_height,
            photometric = model.photometric.is_some(),
            "undistorter ready"
        );
        Ok(model)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, CalibError> {
        let malformed = |reason: String| CalibError::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let mut next_line = |what: &str| {
            lines
                .next()
                .ok_or_else(|| malformed(format!("missing {what} line")))
        };

        let first: Vec<f64> = parse_floats(next_line("intrinsics")?)
            .map_err(|e| malformed(format!("intrinsics: {e}")))?;
        let (intrinsics, distortion) = match first.len() {
            4 => ([first[0], first[1], first[2], first[3]], None),
            8 => (
                [first[0], first[1], first[2], first[3]],
                Some([first[4], first[5], first[6], first[7]]),
            ),
            n => return Err(malformed(format!("expected 4 or 8 intrinsics, got {n}"))),
        };

        let (in_width, in_height) = parse_dims(next_line("input size")?)
            .map_err(|e| malformed(format!("input size: {e}")))?;

        let out_spec = next_line("output calibration")?.trim().to_string();

        let (out_width, out_height) = parse_dims(next_line("output size")?)
            .map_err(|e| malformed(format!("output size: {e}")))?;

        let k_in = denormalize(intrinsics, in_width, in_height);

        let k_out = match out_spec.as_str() {
            "none" => {
                if distortion.is_some() || (in_width, in_height) != (out_width, out_height) {
                    return Err(malformed(
                        "output mode \"none\" requires matching sizes and no distortion".into(),
                    ));
                }
                None
            }
            // DSO searches for an optimal output K here; this bridge ships
            // a plain rescale of the input intrinsics instead.
            "crop" | "full" => Some(Pinhole {
                fx: k_in.fx * out_width as f64 / in_width as f64,
                fy: k_in.fy * out_height as f64 / in_height as f64,
                cx: (k_in.cx + 0.5) * out_width as f64 / in_width as f64 - 0.5,
                cy: (k_in.cy + 0.5) * out_height as f64 / in_height as f64 - 0.5,
            }),
            explicit => {
                let vals: Vec<f64> = parse_floats(explicit)
                    .map_err(|e| malformed(format!("output calibration: {e}")))?;
                if vals.len() != 4 {
                    return Err(malformed(format!(
                        "expected crop/full/none or 4 values, got {} values",
                        vals.len()
                    )));
                }
                Some(denormalize(
                    [vals[0], vals[1], vals[2], vals[3]],
                    out_width,
                    out_height,
                ))
            }
        };

        let remap = match k_out {
            None => Vec::new(),
            Some(k_out) => build_remap(
                k_in,
                distortion,
                k_out,
                in_width,
                in_height,
                out_width,
                out_height,
            ),
        };

        Ok(Self {
            in_width,
            in_height,
            out_width,
            out_height,
            remap,
            photometric: None,
        })
    }

    /// Expected raw-frame resolution.
    pub fn input_size(&self) -> (usize, usize) {
        (self.in_width, self.in_height)
    }

    /// Rectified output resolution.
    pub fn output_size(&self) -> (usize, usize) {
        (self.out_width, self.out_height)
    }

    /// The photometric inverse response, if one was loaded. Forwarded to the
    /// engine at startup and on every rebuild.
    pub fn response(&self) -> Option<&[f32; 256]> {
        self.photometric.as_ref().map(PhotometricCalib::response)
    }

    /// Undistort one raw frame. The caller guarantees the input size matches
    /// [`Undistorter::input_size`]; this is checked upstream as an explicit
    /// precondition.
    pub fn undistort(&self, raw: &RawImage) -> CalibratedImage {
        debug_assert_eq!((raw.width, raw.height), (self.in_width, self.in_height));

        // Photometric correction at input resolution.
        let corrected: Vec<f32> = match &self.photometric {
            Some(p) => raw
                .data
                .iter()
                .enumerate()
                .map(|(i, &b)| p.correct(b, i))
                .collect(),
            None => raw.data.iter().map(|&b| b as f32).collect(),
        };

        if self.remap.is_empty() {
            return CalibratedImage::new(self.out_width, self.out_height, corrected, 1.0);
        }

        let intensity = self
            .remap
            .iter()
            .map(|m| match m {
                Some((x, y)) => bilinear(&corrected, self.in_width, *x, *y),
                None => 0.0,
            })
            .collect();
        CalibratedImage::new(self.out_width, self.out_height, intensity, 1.0)
    }
}

fn parse_floats(line: &str) -> Result<Vec<f64>, std::num::ParseFloatError> {
    line.split_whitespace().map(str::parse).collect()
}

fn parse_dims(line: &str) -> Result<(usize, usize), String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(format!("expected 2 values, got {}", parts.len()));
    }
    let w = parts[0].parse().map_err(|e| format!("{e}"))?;
    let h = parts[1].parse().map_err(|e| format!("{e}"))?;
    if w == 0 || h == 0 {
        return Err("zero dimension".into());
    }
    Ok((w, h))
}

/// Intrinsics below 1.0 are relative to the image size.
fn denormalize(v: [f64; 4], width: usize, height: usize) -> Pinhole {
    if v[2] < 1.0 && v[3] < 1.0 {
        Pinhole {
            fx: v[0] * width as f64,
            fy: v[1] * height as f64,
            cx: v[2] * width as f64 - 0.5,
            cy: v[3] * height as f64 - 0.5,
        }
    } else {
        Pinhole {
            fx: v[0],
            fy: v[1],
            cx: v[2],
            cy: v[3],
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_remap(
    k_in: Pinhole,
    distortion: Option<[f64; 4]>,
    k_out: Pinhole,
    in_width: usize,
    in_height: usize,
    out_width: usize,
    out_height: usize,
) -> Vec<Option<(f32, f32)>> {
    let mut remap = Vec::with_capacity(out_width * out_height);
    for y in 0..out_height {
        for x in 0..out_width {
            // Unproject with the output model...
            let nx = (x as f64 - k_out.cx) / k_out.fx;
            let ny = (y as f64 - k_out.cy) / k_out.fy;

            // ...push through the radial-tangential model...
            let (dx, dy) = match distortion {
                Some([k1, k2, r1, r2]) => {
                    let rr = nx * nx + ny * ny;
                    let radial = 1.0 + k1 * rr + k2 * rr * rr;
                    (
                        nx * radial + 2.0 * r1 * nx * ny + r2 * (rr + 2.0 * nx * nx),
                        ny * radial + r1 * (rr + 2.0 * ny * ny) + 2.0 * r2 * nx * ny,
                    )
                }
                None => (nx, ny),
            };

            // ...and reproject with the input model.
            let ix = k_in.fx * dx + k_in.cx;
            let iy = k_in.fy * dy + k_in.cy;

            let in_bounds = ix >= 0.0
                && iy >= 0.0
                && ix < (in_width - 1) as f64
                && iy < (in_height - 1) as f64;
            remap.push(in_bounds.then_some((ix as f32, iy as f32)));
        }
    }
    remap
}

#[inline]
fn bilinear(buf: &[f32], width: usize, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let ax = x - x0 as f32;
    let ay = y - y0 as f32;
    let base = y0 * width + x0;
    let top = buf[base] * (1.0 - ax) + buf[base + 1] * ax;
    let bot = buf[base + width] * (1.0 - ax) + buf[base + width + 1] * ax;
    top * (1.0 - ay) + bot * ay
}
