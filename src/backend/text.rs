//! Text renderings of scalars shared by the JSON and XML backends.

use super::{Mismatch, Scalar, ScalarKind, ScalarRef};
use crate::fourcc::{CaseMode, FourCC};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use uuid::Uuid;

pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        value.to_string()
    }
}

fn format_f32(value: f32) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        format_float(value as f64)
    }
}

pub(crate) fn format_text(value: ScalarRef<'_>) -> String {
    match value {
        ScalarRef::Bool(b) => b.to_string(),
        ScalarRef::F32(v) => format_f32(v),
        ScalarRef::F64(v) => format_float(v),
        ScalarRef::Str(s) => s.to_string(),
        ScalarRef::Bytes(bytes) => STANDARD.encode(bytes),
        ScalarRef::FourCC(code) => code.to_text(true),
        ScalarRef::Guid(id) => id.hyphenated().to_string(),
        other => other
            .as_int()
            .map(|v| v.to_string())
            .unwrap_or_default(),
    }
}

pub(crate) fn parse_text(kind: ScalarKind, text: &str) -> Result<Scalar, Mismatch> {
    let found = || format!("text {text:?}");
    match kind {
        ScalarKind::Bool => {
            let trimmed = text.trim();
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(Scalar::Bool(true))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(Scalar::Bool(false))
            } else {
                Err(Mismatch::new(kind.name(), found()))
            }
        }
        ScalarKind::F32 => text
            .trim()
            .parse::<f32>()
            .map(Scalar::F32)
            .map_err(|_| Mismatch::new(kind.name(), found())),
        ScalarKind::F64 => text
            .trim()
            .parse::<f64>()
            .map(Scalar::F64)
            .map_err(|_| Mismatch::new(kind.name(), found())),
        ScalarKind::Str => Ok(Scalar::Str(text.to_string())),
        ScalarKind::Bytes => STANDARD
            .decode(text.trim())
            .map(Scalar::Bytes)
            .map_err(|_| Mismatch::new(kind.name(), found())),
        ScalarKind::FourCC => FourCC::parse_with(text, CaseMode::Sensitive)
            .map(Scalar::FourCC)
            .map_err(|e| Mismatch::new(kind.name(), e.to_string())),
        ScalarKind::Guid => Uuid::parse_str(text.trim())
            .map(Scalar::Guid)
            .map_err(|_| Mismatch::new(kind.name(), found())),
        _ => {
            let wide = text
                .trim()
                .parse::<i128>()
                .map_err(|_| Mismatch::new(kind.name(), found()))?;
            Scalar::from_int(kind, wide)
        }
    }
}
