//! Raw tag strings → canonical [`Metadata`].
//!
//! Both extractors reduce what they read to [`RawTags`], a map from tag name to
//! its textual rendering (`"4/1"`, `"[23/1 7/1 2122/100]"`, `"NIKON Z 6"`), and
//! hand it to [`normalize`]. Everything format-specific lives in the
//! extractors; everything about how a value looks in the manifest lives here.

use super::codes::{
    ExposureMode, ExposureProgram, Flash, MeteringMode, SceneCaptureType, WhiteBalance, parse_code,
};
use super::schema::Metadata;
use std::collections::BTreeMap;
use thiserror::Error;

/// Tag name → raw textual value, as produced by an extractor.
pub type RawTags = BTreeMap<String, String>;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid rational: {0:?}")]
pub struct InvalidRational(pub String);

fn strip_brackets(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '[' || c == ']')
}

/// Parse `"n/d"` or `"n"` (optionally bracket-wrapped) into a float.
pub fn parse_rational(raw: &str) -> Result<f64, InvalidRational> {
    let s = strip_brackets(raw);
    let invalid = || InvalidRational(raw.to_string());
    let parts: Vec<&str> = s.split('/').collect();
    let value = match parts.as_slice() {
        [n] => n.trim().parse::<f64>().map_err(|_| invalid())?,
        [n, d] => {
            let n: f64 = n.trim().parse().map_err(|_| invalid())?;
            let d: f64 = d.trim().parse().map_err(|_| invalid())?;
            if d == 0.0 {
                return Err(invalid());
            }
            n / d
        }
        _ => return Err(invalid()),
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid())
    }
}

/// Render an exposure time the way photographers read it.
///
/// ```text
/// "1/200"  → "1/200"
/// "10/300" → "1/30"
/// "3/2"    → "1.5"
/// "1.5"    → "1.5"   (no slash: verbatim)
/// ```
pub fn format_exposure(raw: &str) -> String {
    let s = strip_brackets(raw);
    if let Some((n, d)) = s.split_once('/')
        && !d.contains('/')
    {
        let n: f64 = n.trim().parse().unwrap_or(0.0);
        let d: f64 = d.trim().parse().unwrap_or(0.0);
        if n == 1.0 {
            return format!("1/{d:.0}");
        }
        if n > 0.0 && d > 0.0 {
            let value = n / d;
            if value >= 1.0 {
                return format!("{value:.1}");
            }
            return format!("1/{:.0}", d / n);
        }
    }
    s.to_string()
}

/// Format a `deg min sec` rational triple as `D deg M' S.SS" <ref>`.
///
/// The trailing reference is the letter code as recorded. The legacy numeric
/// codes `0` and `1` are spelled out as `North` and `South`.
pub fn format_gps(raw: &str, reference: &str) -> Result<String, InvalidRational> {
    let s = strip_brackets(raw);
    let parts: Vec<&str> = s.split(' ').collect();
    let [deg, min, sec] = parts.as_slice() else {
        return Err(InvalidRational(raw.to_string()));
    };
    let deg = parse_rational(deg)?;
    let min = parse_rational(min)?;
    let sec = parse_rational(sec)?;
    let suffix = match reference {
        "0" => "North",
        "1" => "South",
        other => other,
    };
    Ok(format!("{deg:.0} deg {min:.0}' {sec:.2}\" {suffix}"))
}

/// Spell out a GPS reference: `N` → `North`, full words unchanged,
/// legacy `0`/`1` → `North`/`South`, anything else verbatim.
pub fn gps_ref_word(reference: &str) -> String {
    match reference {
        "N" | "0" => "North",
        "S" | "1" => "South",
        "E" => "East",
        "W" => "West",
        other => other,
    }
    .to_string()
}

/// `"<value> m Above Sea Level"`, or `Below` when the reference is `1`/`01`.
pub fn format_altitude(raw: &str, reference: &str) -> Result<String, InvalidRational> {
    let value = parse_rational(raw)?;
    let side = match reference.trim() {
        "1" | "01" => "Below",
        _ => "Above",
    };
    Ok(format!("{value:.1} m {side} Sea Level"))
}

/// Trimmed, non-empty value of a raw tag.
fn tag<'a>(raw: &'a RawTags, key: &str) -> Option<&'a str> {
    raw.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Build the canonical record from raw tags.
pub fn normalize(raw: &RawTags) -> Metadata {
    let get = |key: &str| tag(raw, key);
    let first = |keys: &[&str]| keys.iter().find_map(|k| tag(raw, k));

    let mut meta = Metadata::default();

    if let Some(f) = first(&["FNumber", "Aperture"]).and_then(|v| parse_rational(v).ok()) {
        meta.f_number = Some(f);
        meta.aperture = Some(f);
    }

    if let Some(exposure) = first(&["ExposureTime", "ShutterSpeed"]) {
        let formatted = format_exposure(exposure);
        meta.exposure_time = Some(formatted.clone());
        meta.shutter_speed = Some(formatted);
    }

    if let Some(focal) = get("FocalLength") {
        let formatted = match parse_rational(focal) {
            Ok(f) => format!("{f:.1} mm"),
            Err(_) => focal.to_string(),
        };
        meta.focal_length_35mm = Some(formatted.replacen(".0 mm", " mm", 1));
        meta.focal_length = Some(formatted);
    }
    if let Some(film) = get("FocalLengthIn35mmFilm")
        && let Ok(f) = parse_rational(film)
    {
        meta.focal_length_35mm = Some(format!("{f:.0} mm"));
    } else if let Some(format) = get("FocalLengthIn35mmFormat") {
        meta.focal_length_35mm = Some(format.to_string());
    }

    meta.iso = first(&["ISOSpeedRatings", "RecommendedExposureIndex"])
        .and_then(|v| parse_code(v))
        .and_then(|v| u32::try_from(v).ok());

    if let Some(lens) = get("LensModel") {
        meta.lens_model = Some(lens.to_string());
        meta.lens = Some(lens.to_string());
    } else if let Some(lens) = get("Lens") {
        meta.lens = Some(lens.to_string());
    }

    meta.make = get("Make").map(String::from);
    meta.model = get("Model").map(String::from);

    if let Some(taken) = get("DateTimeOriginal") {
        meta.date_time_original = Some(taken.to_string());
        meta.create_date = Some(taken.to_string());
    } else if let Some(created) = get("CreateDate") {
        meta.create_date = Some(created.to_string());
    }

    let gps_ref = |key: &str| tag(raw, key).unwrap_or_default();
    if let Some(lat) = get("GPSLatitude")
        && let Ok(formatted) = format_gps(lat, gps_ref("GPSLatitudeRef"))
    {
        meta.gps_latitude = Some(formatted);
        meta.gps_latitude_ref = Some(gps_ref_word(gps_ref("GPSLatitudeRef")));
    }
    if let Some(lon) = get("GPSLongitude")
        && let Ok(formatted) = format_gps(lon, gps_ref("GPSLongitudeRef"))
    {
        meta.gps_longitude = Some(formatted);
        meta.gps_longitude_ref = Some(gps_ref_word(gps_ref("GPSLongitudeRef")));
    }
    if let Some(alt) = get("GPSAltitude") {
        meta.gps_altitude = format_altitude(alt, gps_ref("GPSAltitudeRef")).ok();
    }

    meta.exposure_mode = get("ExposureMode").and_then(ExposureMode::parse);
    meta.exposure_program = get("ExposureProgram").and_then(ExposureProgram::parse);
    meta.metering_mode = get("MeteringMode").and_then(MeteringMode::parse);
    meta.white_balance = get("WhiteBalance").and_then(WhiteBalance::parse);
    meta.scene_capture_type = get("SceneCaptureType").and_then(SceneCaptureType::parse);
    meta.flash = get("Flash").and_then(Flash::parse);

    meta.software = get("Software").map(String::from);
    meta.artist = get("Artist").map(String::from);
    meta.copyright = get("Copyright").map(String::from);

    meta.keywords = get("XPKeywords").map(String::from);
    meta.subject = get("XPSubject").map(String::from);
    meta.title = get("XPTitle").map(String::from);
    meta.comment = get("XPComment").map(String::from);
    meta.author = get("XPAuthor").map(String::from);

    meta
}
