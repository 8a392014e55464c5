use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use serde::Deserialize;

use crate::formats::ImageFormatId;
use crate::images::DEFAULT_JPEG_QUALITY;

lazy_static! {
    static ref SIZE_RE: Regex = Regex::new(r"^\s*(\d+)\s*[xX]\s*(\d+)\s*$").expect("size pattern is valid");
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub default_format: ImageFormatId,
    pub default_width: u32,
    pub default_height: u32,
    pub jpeg_quality: u8,
    pub max_dimension: Option<u32>,
    /// `WIDTHxHEIGHT` sizes rendered in `default_format` at startup.
    pub prewarm: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_format: ImageFormatId::Png,
            default_width: 200,
            default_height: 200,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_dimension: None,
            prewarm: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Layer an optional `Imager.toml` under `IMAGER_*` environment
    /// variables. `IMAGER_PREWARM` takes a comma separated list.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("Imager").required(false))
            .add_source(
                config::Environment::with_prefix("IMAGER")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("prewarm"),
            )
            .build()?
            .try_deserialize()
    }

    /// Parsed `prewarm` entries. Malformed ones are logged and skipped.
    pub fn prewarm_sizes(&self) -> Vec<(u32, u32)> {
        self.prewarm
            .iter()
            .filter_map(|entry| {
                let size = parse_size(entry);
                if size.is_none() {
                    warn!("Ignoring invalid prewarm size '{}'", entry);
                }
                size
            })
            .collect()
    }
}

/// Parse `200x100` (or `200X100`) into `(width, height)`.
pub fn parse_size(value: &str) -> Option<(u32, u32)> {
    let captures = SIZE_RE.captures(value)?;
    let width = captures[1].parse().ok()?;
    let height = captures[2].parse().ok()?;
    Some((width, height))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("200x100", Some((200, 100)))]
    #[test_case(" 1 X 23 ", Some((1, 23)))]
    #[test_case("1920x1080", Some((1920, 1080)))]
    #[test_case("0x5", Some((0, 5)) ; "zero parses, validated later")]
    #[test_case("200", None)]
    #[test_case("axb", None)]
    #[test_case("-1x5", None)]
    #[test_case("99999999999x1", None ; "overflow")]
    fn test_parse_size(input: &str, expected: Option<(u32, u32)>) {
        assert_eq!(parse_size(input), expected);
    }

    #[test]
    fn test_prewarm_sizes_skip_invalid() {
        let config = AppConfig {
            prewarm: vec!["16x16".into(), "bogus".into(), "32x8".into()],
            ..AppConfig::default()
        };
        assert_eq!(config.prewarm_sizes(), vec![(16, 16), (32, 8)]);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AppConfig = serde_json::from_str(
            r#"{"default_format": "image/JPEG", "max_dimension": 4096}"#,
        )
        .unwrap();

        assert_eq!(config.default_format, ImageFormatId::Jpeg);
        assert_eq!(config.max_dimension, Some(4096));
        assert_eq!(config.default_width, 200);
        assert_eq!(config.jpeg_quality, DEFAULT_JPEG_QUALITY);
    }

    #[test]
    fn test_deserialize_rejects_unknown_format() {
        let result = serde_json::from_str::<AppConfig>(r#"{"default_format": "image/webp"}"#);
        assert!(result.is_err());
    }
}
