//! EXIF shooting-mode code tables.
//!
//! Each field is a small integer in the file and a fixed label in the
//! manifest. A code outside the table is kept as [`Unknown`](ExposureMode::Unknown)
//! with the raw value, which is also what is serialized, so nothing read from
//! a file is ever lost. The external tool already prints labels, so a raw
//! value that is not an integer is matched against the labels instead.

use serde::{Deserialize, Serialize};

/// Parse a raw integer code, tolerating the bracket wrapping some readers emit (`"[3]"`).
pub fn parse_code(raw: &str) -> Option<i64> {
    raw.trim_matches(|c| c == '[' || c == ']').parse().ok()
}

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($code:literal => $variant:ident = $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// Code or label outside the table, carried through verbatim.
            Unknown(String),
        }

        impl $name {
            /// Map an integer code; codes outside the table keep `raw`.
            pub fn from_code(code: i64, raw: &str) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    _ => Self::Unknown(raw.to_string()),
                }
            }

            /// Interpret a raw tag value: integer codes go through the table,
            /// anything else is matched as a label. Empty input yields `None`.
            pub fn parse(raw: &str) -> Option<Self> {
                let raw = raw.trim();
                if raw.is_empty() {
                    return None;
                }
                Some(match parse_code(raw) {
                    Some(code) => Self::from_code(code, raw),
                    None => Self::from(raw.to_string()),
                })
            }

            pub fn label(&self) -> &str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Unknown(raw) => raw,
                }
            }
        }

        impl From<String> for $name {
            fn from(label: String) -> Self {
                match label.as_str() {
                    $($label => Self::$variant,)+
                    _ => Self::Unknown(label),
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.label().to_string()
            }
        }
    };
}

code_table! {
    /// EXIF ExposureMode (0xa402).
    ExposureMode {
        0 => Auto = "Auto",
        1 => Manual = "Manual",
        2 => AutoBracket = "Auto Bracket",
    }
}

code_table! {
    /// EXIF ExposureProgram (0x8822). Code 0 ("not defined") has no label.
    ExposureProgram {
        1 => Manual = "Manual",
        2 => Normal = "Normal program",
        3 => AperturePriority = "Aperture-priority AE",
        4 => ShutterPriority = "Shutter speed priority AE",
        5 => Creative = "Creative program",
        6 => Action = "Action program",
        7 => Portrait = "Portrait mode",
        8 => Landscape = "Landscape mode",
    }
}

code_table! {
    /// EXIF MeteringMode (0x9207). Code 0 ("unknown") has no label.
    MeteringMode {
        1 => Average = "Average",
        2 => CenterWeighted = "Center-weighted average",
        3 => Spot = "Spot",
        4 => MultiSpot = "Multi-spot",
        5 => MultiSegment = "Multi-segment",
        6 => Partial = "Partial",
    }
}

code_table! {
    /// EXIF WhiteBalance (0xa403).
    WhiteBalance {
        0 => Auto = "Auto",
        1 => Manual = "Manual",
    }
}

code_table! {
    /// EXIF SceneCaptureType (0xa406).
    SceneCaptureType {
        0 => Standard = "Standard",
        1 => Landscape = "Landscape",
        2 => Portrait = "Portrait",
        3 => NightScene = "Night Scene",
    }
}

/// EXIF Flash (0x9209), collapsed to whether the flash fired.
///
/// The tag is a bitfield (fired, return light, mode, red-eye). Only bit 0 is
/// kept: 0 is "No Flash", an odd value "Fired", any other value "Off, Did not fire".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Flash {
    NoFlash,
    Fired,
    DidNotFire,
    Unknown(String),
}

impl Flash {
    pub fn from_code(code: i64) -> Self {
        if code == 0 {
            Self::NoFlash
        } else if code & 1 == 1 {
            Self::Fired
        } else {
            Self::DidNotFire
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match parse_code(raw) {
            Some(code) => Self::from_code(code),
            None => Self::from(raw.to_string()),
        })
    }

    pub fn label(&self) -> &str {
        match self {
            Self::NoFlash => "No Flash",
            Self::Fired => "Fired",
            Self::DidNotFire => "Off, Did not fire",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for Flash {
    fn from(label: String) -> Self {
        match label.as_str() {
            "No Flash" => Self::NoFlash,
            "Fired" => Self::Fired,
            "Off, Did not fire" => Self::DidNotFire,
            _ => Self::Unknown(label),
        }
    }
}

impl From<Flash> for String {
    fn from(value: Flash) -> String {
        value.label().to_string()
    }
}
