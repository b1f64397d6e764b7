//! Chart configuration.
//!
//! Every style struct deserializes with `#[serde(default)]`, so a partial
//! JSON object is read as "these fields over the defaults".

use std::fmt;
use std::rc::Rc;

use flame_chart_protocol::Point;
use serde::{Deserialize, Deserializer};

use crate::plugins::NodeInfo;
use crate::render::RenderEngine;

/// Custom tooltip painter: called with the hovered node (or `None` when
/// nothing is hovered), the root engine and the mouse in root coordinates.
pub type TooltipFn = Rc<dyn Fn(Option<&NodeInfo>, &mut RenderEngine, Option<Point>)>;

#[derive(Clone, Default)]
pub enum TooltipOption {
    #[default]
    Default,
    Disabled,
    Custom(TooltipFn),
}

impl TooltipOption {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

impl fmt::Debug for TooltipOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Disabled => f.write_str("Disabled"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// JSON can only say `true` or `false`; functions are attached in Rust.
fn tooltip_from_bool<'de, D>(deserializer: D) -> Result<TooltipOption, D::Error>
where
    D: Deserializer<'de>,
{
    let enabled = Option::<bool>::deserialize(deserializer)?;
    Ok(match enabled {
        Some(false) => TooltipOption::Disabled,
        _ => TooltipOption::Default,
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    #[serde(deserialize_with = "tooltip_from_bool")]
    pub tooltip: TooltipOption,
    pub time_units: String,
    pub inverted: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tooltip: TooltipOption::Default,
            time_units: "ms".to_string(),
            inverted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MainStyles {
    pub block_height: f64,
    pub block_padding_left_right: f64,
    pub block_padding_top_bottom: f64,
    pub background_color: String,
    pub font_size: f64,
    pub font_color: String,
    pub tooltip_header_font_color: String,
    pub tooltip_body_font_color: String,
    pub tooltip_background_color: String,
    pub header_height: f64,
}

impl Default for MainStyles {
    fn default() -> Self {
        Self {
            block_height: 16.0,
            block_padding_left_right: 4.0,
            block_padding_top_bottom: 4.0,
            background_color: "white".to_string(),
            font_size: 10.0,
            font_color: "black".to_string(),
            tooltip_header_font_color: "black".to_string(),
            tooltip_body_font_color: "#688f45".to_string(),
            tooltip_background_color: "white".to_string(),
            header_height: 14.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeGridStyles {
    pub color: String,
    pub font_color: String,
    pub font_size: f64,
    /// Height of the ruler panel.
    pub height: f64,
    /// Lines are at least this many pixels apart.
    pub min_line_spacing: f64,
}

impl Default for TimeGridStyles {
    fn default() -> Self {
        Self {
            color: "rgba(90, 90, 90, 0.20)".to_string(),
            font_color: "black".to_string(),
            font_size: 10.0,
            height: 18.0,
            min_line_spacing: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeframeSelectorStyles {
    pub font_color: String,
    pub overlay_color: String,
    pub graph_fill_color: String,
    pub bottom_line_color: String,
    pub knob_color: String,
    pub knob_stroke_color: String,
    pub knob_size: f64,
    pub height: f64,
    pub background_color: String,
}

impl Default for TimeframeSelectorStyles {
    fn default() -> Self {
        Self {
            font_color: "black".to_string(),
            overlay_color: "rgba(112, 112, 112, 0.5)".to_string(),
            graph_fill_color: "rgba(0, 0, 0, 0.25)".to_string(),
            bottom_line_color: "rgba(0, 0, 0, 0.25)".to_string(),
            knob_color: "rgb(131, 131, 131)".to_string(),
            knob_stroke_color: "white".to_string(),
            knob_size: 6.0,
            height: 60.0,
            background_color: "white".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Styles {
    pub main: MainStyles,
    pub time_grid: TimeGridStyles,
    pub timeframe_selector: TimeframeSelectorStyles,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub options: Options,
    pub styles: Styles,
}

impl Settings {
    /// Parse a (possibly partial) settings object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.options.time_units, "ms");
        assert!(!settings.options.inverted);
        assert_eq!(settings.styles.main.block_height, 16.0);
        assert_eq!(settings.styles.main.tooltip_body_font_color, "#688f45");
        assert_eq!(settings.styles.timeframe_selector.height, 60.0);
    }

    #[test]
    fn partial_json_merges_over_defaults() {
        let settings = Settings::from_json(
            r#"{"options":{"tooltip":false,"timeUnits":"us"},"styles":{"main":{"blockHeight":20}}}"#,
        )
        .unwrap();
        assert!(settings.options.tooltip.is_disabled());
        assert_eq!(settings.options.time_units, "us");
        assert_eq!(settings.styles.main.block_height, 20.0);
        assert_eq!(settings.styles.main.font_size, 10.0);
        assert_eq!(settings.styles.time_grid, TimeGridStyles::default());
    }

    #[test]
    fn tooltip_true_keeps_default_painter() {
        let settings = Settings::from_json(r#"{"options":{"tooltip":true}}"#).unwrap();
        assert!(matches!(settings.options.tooltip, TooltipOption::Default));
    }
}
