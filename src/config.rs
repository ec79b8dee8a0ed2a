//! Runtime settings parsed from `key=value` argument tokens.
//!
//! The surface mirrors the classic DSO frontends: `calib=`, `vignette=`,
//! `gamma=`, `mode=`, plus a handful of boolean switches. Tokens are
//! case-sensitive, later tokens override earlier ones, and anything
//! unrecognized is logged and skipped.

use tracing::{info, warn};

/// Photometric operating mode, from the `mode=` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotometricMode {
    /// `mode=0`: full photometric model from the calibration files.
    Calibrated,
    /// `mode=1`: no photometric calibration, affine brightness optimized
    /// from scratch.
    Uncalibrated,
    /// `mode=2`: synthetic/perfect images, affine brightness fixed and a
    /// higher minimum-gradient threshold.
    PerfectImages,
}

impl Default for PhotometricMode {
    fn default() -> Self {
        Self::Calibrated
    }
}

/// Parsed runtime settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Attach the sample output subscriber (`sampleoutput=1`).
    pub use_sample_output: bool,
    /// Raise the log threshold to warnings only (`quiet=1`).
    pub quiet: bool,
    /// Disable engine-side logging (`nolog=1`).
    pub no_log: bool,
    /// Disable any display output (`nogui=1`).
    pub no_gui: bool,
    /// Force single-threaded engine operation (`nomt=1`).
    pub no_multithreading: bool,
    /// Geometric calibration file (`calib=<path>`). Required.
    pub calib: String,
    /// Vignette image (`vignette=<path>`). Optional.
    pub vignette: String,
    /// Inverse-response / gamma file (`gamma=<path>`). Optional.
    pub gamma: String,
    /// Photometric operating mode (`mode=0|1|2`).
    pub mode: PhotometricMode,
    /// Directory of mono8 images to play back (`files=<dir>`).
    pub files: String,
}

impl Settings {
    /// Parse all tokens in order. Later tokens win.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut settings = Self::default();
        for tok in tokens {
            settings.parse_token(tok.as_ref());
        }
        settings
    }

    /// Parse a single `key=value` token. Unrecognized or malformed tokens
    /// are logged and ignored, never fatal.
    pub fn parse_token(&mut self, token: &str) {
        let Some((key, value)) = token.split_once('=') else {
            warn!("could not parse argument \"{token}\"");
            return;
        };

        match key {
            "sampleoutput" => {
                if let Some(on) = parse_switch(token, value) {
                    self.use_sample_output = on;
                    if on {
                        info!("using sample output subscriber");
                    }
                }
            }
            "quiet" => {
                if let Some(on) = parse_switch(token, value) {
                    self.quiet = on;
                }
            }
            "nolog" => {
                if let Some(on) = parse_switch(token, value) {
                    self.no_log = on;
                }
            }
            "nogui" => {
                if let Some(on) = parse_switch(token, value) {
                    self.no_gui = on;
                }
            }
            "nomt" => {
                if let Some(on) = parse_switch(token, value) {
                    self.no_multithreading = on;
                }
            }
            "calib" => {
                self.calib = value.to_string();
                info!("loading calibration from {value}");
            }
            "vignette" => {
                self.vignette = value.to_string();
                info!("loading vignette from {value}");
            }
            "gamma" => {
                self.gamma = value.to_string();
                info!("loading gamma calibration from {value}");
            }
            "mode" => match value {
                "0" => {
                    self.mode = PhotometricMode::Calibrated;
                    info!("photometric mode with calibration");
                }
                "1" => {
                    self.mode = PhotometricMode::Uncalibrated;
                    info!("photometric mode without calibration");
                }
                "2" => {
                    self.mode = PhotometricMode::PerfectImages;
                    info!("photometric mode with perfect images");
                }
                _ => warn!("could not parse argument \"{token}\""),
            },
            "files" => {
                self.files = value.to_string();
                info!("playing back images from {value}");
            }
            _ => warn!("could not parse argument \"{token}\""),
        }
    }
}

fn parse_switch(token: &str, value: &str) -> Option<bool> {
    match value {
        "0" => Some(false),
        "1" => Some(true),
        _ => {
            warn!("could not parse argument \"{token}\"");
            None
        }
    }
}
