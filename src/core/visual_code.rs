/*
 * Visual-code (QR) rendering contract and its `qrcode`-backed implementation.
 *
 * `QrCodeRenderer` builds a real QR symbol for a token at the requested
 * error-correction level, letting the `qrcode` crate pick the smallest version
 * that holds it. A token too long for any version is reported as
 * `RenderError::CapacityExceeded`, which is what drives the share workflow's
 * fallback to the minimal token.
 */
use qrcode::render::unicode;
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode, Version};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCorrection {
    Low,
    Medium,
    Quartile,
    High,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::High => EcLevel::H,
        }
    }
}

/*
 * How much of the symbol is spent on data. `Dense` maximizes payload
 * capacity; `Robust` trades capacity for damage tolerance.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityMode {
    Dense,
    Robust,
}

impl CapacityMode {
    pub fn error_correction(self) -> ErrorCorrection {
        match self {
            CapacityMode::Dense => ErrorCorrection::Low,
            CapacityMode::Robust => ErrorCorrection::Quartile,
        }
    }
}

/*
 * A rendered QR symbol. `modules` is the row-major dark/light matrix of
 * `width * width` modules without quiet zone; `image` is the same symbol drawn
 * with Unicode half blocks, quiet zone included, for text front ends.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualCode {
    pub version: i16,
    pub width: usize,
    pub error_correction: ErrorCorrection,
    pub payload: String,
    pub modules: Vec<bool>,
    pub image: String,
}

impl VisualCode {
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.modules[y * self.width + x]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    CapacityExceeded {
        payload_bytes: usize,
        error_correction: ErrorCorrection,
    },
    Encoding(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::CapacityExceeded {
                payload_bytes,
                error_correction,
            } => write!(
                f,
                "Payload of {payload_bytes} bytes exceeds QR capacity at {error_correction:?} error correction"
            ),
            RenderError::Encoding(msg) => write!(f, "Could not encode QR symbol: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

pub type Result<T> = std::result::Result<T, RenderError>;

pub trait VisualCodeRendererOperations: Send + Sync {
    fn render(&self, token: &str, mode: CapacityMode) -> Result<VisualCode>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QrCodeRenderer;

impl QrCodeRenderer {
    pub fn new() -> Self {
        QrCodeRenderer
    }
}

impl VisualCodeRendererOperations for QrCodeRenderer {
    fn render(&self, token: &str, mode: CapacityMode) -> Result<VisualCode> {
        let level = mode.error_correction();
        let payload_bytes = token.len();
        let code = QrCode::with_error_correction_level(token, EcLevel::from(level)).map_err(|e| {
            log::debug!("QrCodeRenderer: Failed to encode {payload_bytes} bytes at {level:?}: {e}");
            match e {
                QrError::DataTooLong => RenderError::CapacityExceeded {
                    payload_bytes,
                    error_correction: level,
                },
                other => RenderError::Encoding(other.to_string()),
            }
        })?;

        let version = match code.version() {
            Version::Normal(v) | Version::Micro(v) => v,
        };
        let modules = code.to_colors().into_iter().map(|c| c == Color::Dark).collect();
        let image = code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build();
        log::trace!("QrCodeRenderer: {payload_bytes} bytes rendered as version {version} at {level:?}.");
        Ok(VisualCode {
            version,
            width: code.width(),
            error_correction: level,
            payload: token.to_string(),
            modules,
            image,
        })
    }
}
