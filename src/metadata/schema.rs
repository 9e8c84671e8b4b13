//! Canonical metadata record stored under `exif` in each manifest entry.
//!
//! Known fields are typed and serialized under fixed names. Anything else the
//! extractor is allowed to keep lands in [`Metadata::extra`], which flattens
//! into the same JSON object.
//!
//! Deserialization is lenient for text fields: manifests written by other
//! tools sometimes carry numbers (`"ExposureTime": 2`) or lists
//! (`"Keywords": ["a", "b"]`) where this schema expects text. Those are
//! rendered to text rather than rejecting the whole manifest.

use super::codes::{
    ExposureMode, ExposureProgram, Flash, MeteringMode, SceneCaptureType, WhiteBalance,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "FNumber", default, skip_serializing_if = "Option::is_none")]
    pub f_number: Option<f64>,
    #[serde(rename = "Aperture", default, skip_serializing_if = "Option::is_none")]
    pub aperture: Option<f64>,
    #[serde(
        rename = "ExposureTime",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub exposure_time: Option<String>,
    #[serde(
        rename = "ShutterSpeed",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub shutter_speed: Option<String>,
    #[serde(
        rename = "FocalLength",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub focal_length: Option<String>,
    #[serde(
        rename = "FocalLengthIn35mmFormat",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub focal_length_35mm: Option<String>,
    #[serde(rename = "ISO", default, skip_serializing_if = "Option::is_none")]
    pub iso: Option<u32>,
    #[serde(
        rename = "LensModel",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub lens_model: Option<String>,
    #[serde(
        rename = "Lens",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub lens: Option<String>,
    #[serde(
        rename = "Make",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub make: Option<String>,
    #[serde(
        rename = "Model",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub model: Option<String>,
    #[serde(
        rename = "DateTimeOriginal",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_time_original: Option<String>,
    #[serde(
        rename = "CreateDate",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub create_date: Option<String>,
    #[serde(
        rename = "GPSLatitude",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub gps_latitude: Option<String>,
    #[serde(
        rename = "GPSLatitudeRef",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub gps_latitude_ref: Option<String>,
    #[serde(
        rename = "GPSLongitude",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub gps_longitude: Option<String>,
    #[serde(
        rename = "GPSLongitudeRef",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub gps_longitude_ref: Option<String>,
    #[serde(
        rename = "GPSAltitude",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub gps_altitude: Option<String>,
    #[serde(rename = "ExposureMode", default, skip_serializing_if = "Option::is_none")]
    pub exposure_mode: Option<ExposureMode>,
    #[serde(rename = "ExposureProgram", default, skip_serializing_if = "Option::is_none")]
    pub exposure_program: Option<ExposureProgram>,
    #[serde(rename = "MeteringMode", default, skip_serializing_if = "Option::is_none")]
    pub metering_mode: Option<MeteringMode>,
    #[serde(rename = "WhiteBalance", default, skip_serializing_if = "Option::is_none")]
    pub white_balance: Option<WhiteBalance>,
    #[serde(
        rename = "SceneCaptureType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub scene_capture_type: Option<SceneCaptureType>,
    #[serde(rename = "Flash", default, skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
    #[serde(
        rename = "Software",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub software: Option<String>,
    #[serde(
        rename = "Artist",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub artist: Option<String>,
    #[serde(
        rename = "Copyright",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub copyright: Option<String>,
    #[serde(
        rename = "Keywords",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub keywords: Option<String>,
    #[serde(
        rename = "Subject",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub subject: Option<String>,
    #[serde(
        rename = "Title",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        rename = "Comment",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub comment: Option<String>,
    #[serde(
        rename = "Author",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<String>,
    /// Passthrough fields outside the canonical vocabulary.
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetaValue>,
}

/// Every key the typed fields serialize under.
pub const CANONICAL_KEYS: &[&str] = &[
    "FNumber",
    "Aperture",
    "ExposureTime",
    "ShutterSpeed",
    "FocalLength",
    "FocalLengthIn35mmFormat",
    "ISO",
    "LensModel",
    "Lens",
    "Make",
    "Model",
    "DateTimeOriginal",
    "CreateDate",
    "GPSLatitude",
    "GPSLatitudeRef",
    "GPSLongitude",
    "GPSLongitudeRef",
    "GPSAltitude",
    "ExposureMode",
    "ExposureProgram",
    "MeteringMode",
    "WhiteBalance",
    "SceneCaptureType",
    "Flash",
    "Software",
    "Artist",
    "Copyright",
    "Keywords",
    "Subject",
    "Title",
    "Comment",
    "Author",
];

impl Metadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A passthrough value: text, number, flag, or a list of those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Number(serde_json::Number),
    Flag(bool),
    Text(String),
    List(Vec<MetaValue>),
}

impl MetaValue {
    /// Convert a JSON value from an external tool. `null` has no passthrough form.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Flag(*b)),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(items) => Some(Self::List(
                items.iter().filter_map(Self::from_json).collect(),
            )),
            Value::Object(_) => Some(Self::Text(value.to_string())),
        }
    }

    /// Render as plain text; lists are joined with `", "`.
    pub fn to_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Flag(b) => b.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(Self::to_text)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<MetaValue>::deserialize(deserializer)?;
    Ok(value.map(|v| v.to_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_by_default() {
        assert!(Metadata::default().is_empty());
        let meta = Metadata {
            make: Some("NIKON CORPORATION".into()),
            ..Default::default()
        };
        assert!(!meta.is_empty());
    }

    #[test]
    fn serializes_flat_with_canonical_names() {
        let mut meta = Metadata {
            f_number: Some(4.0),
            aperture: Some(4.0),
            exposure_mode: Some(ExposureMode::Auto),
            gps_latitude_ref: Some("North".into()),
            ..Default::default()
        };
        meta.extra
            .insert("Rating".into(), MetaValue::Number(5.into()));

        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["FNumber"], 4.0);
        assert_eq!(value["Aperture"], 4.0);
        assert_eq!(value["ExposureMode"], "Auto");
        assert_eq!(value["GPSLatitudeRef"], "North");
        assert_eq!(value["Rating"], 5);
        assert!(value.get("Make").is_none());
    }

    #[test]
    fn unknown_keys_land_in_extra() {
        let json = r#"{"Make":"Canon","OffsetTime":"+02:00","Rating":3}"#;
        let meta: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.make.as_deref(), Some("Canon"));
        assert_eq!(
            meta.extra.get("OffsetTime"),
            Some(&MetaValue::Text("+02:00".into()))
        );
        assert_eq!(meta.extra.get("Rating"), Some(&MetaValue::Number(3.into())));
    }

    #[test]
    fn text_fields_accept_numbers_and_lists() {
        let json = r#"{"ExposureTime":2,"Keywords":["sea","dusk"]}"#;
        let meta: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.exposure_time.as_deref(), Some("2"));
        assert_eq!(meta.keywords.as_deref(), Some("sea, dusk"));
        assert!(meta.extra.is_empty());
    }

    #[test]
    fn enum_fields_read_unknown_labels() {
        let json = r#"{"MeteringMode":"Matrix","Flash":"Fired"}"#;
        let meta: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(
            meta.metering_mode,
            Some(MeteringMode::Unknown("Matrix".into()))
        );
        assert_eq!(meta.flash, Some(Flash::Fired));
    }

    #[test]
    fn from_json_drops_null_entries() {
        let value = serde_json::json!(["a", null, 2]);
        assert_eq!(
            MetaValue::from_json(&value),
            Some(MetaValue::List(vec![
                MetaValue::Text("a".into()),
                MetaValue::Number(2.into()),
            ]))
        );
        assert_eq!(MetaValue::from_json(&serde_json::Value::Null), None);
    }

    #[test]
    fn canonical_keys_cover_every_typed_field() {
        let meta = Metadata {
            f_number: Some(1.0),
            aperture: Some(1.0),
            exposure_time: Some(String::new()),
            shutter_speed: Some(String::new()),
            focal_length: Some(String::new()),
            focal_length_35mm: Some(String::new()),
            iso: Some(1),
            lens_model: Some(String::new()),
            lens: Some(String::new()),
            make: Some(String::new()),
            model: Some(String::new()),
            date_time_original: Some(String::new()),
            create_date: Some(String::new()),
            gps_latitude: Some(String::new()),
            gps_latitude_ref: Some(String::new()),
            gps_longitude: Some(String::new()),
            gps_longitude_ref: Some(String::new()),
            gps_altitude: Some(String::new()),
            exposure_mode: Some(ExposureMode::Auto),
            exposure_program: Some(ExposureProgram::Manual),
            metering_mode: Some(MeteringMode::Spot),
            white_balance: Some(WhiteBalance::Auto),
            scene_capture_type: Some(SceneCaptureType::Standard),
            flash: Some(Flash::NoFlash),
            software: Some(String::new()),
            artist: Some(String::new()),
            copyright: Some(String::new()),
            keywords: Some(String::new()),
            subject: Some(String::new()),
            title: Some(String::new()),
            comment: Some(String::new()),
            author: Some(String::new()),
            extra: BTreeMap::new(),
        };
        let value = serde_json::to_value(&meta).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), CANONICAL_KEYS.len());
        for key in CANONICAL_KEYS {
            assert!(object.contains_key(*key), "missing {key}");
        }
    }
}
