//! Popper configuration.
//!
//! Two layers:
//! - [`PopperOptions`]: raw, lenient input as written by a user (numbers or
//!   strings such as `"300ms"`), e.g. the `[popper]` table of a TOML file.
//! - [`PopperConfig`]: validated settings used by the popper.
//!
//! Converting never fails. Values that cannot be read fall back to their
//! default and are reported as [`ConfigWarning`]s.

use popperkit_placement::{PlacementOptions, SideRequest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated settings of one popper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopperConfig {
    /// Requested side.
    pub side: SideRequest,
    /// Gap between trigger and popper in pixels.
    pub margin: f64,
    /// Length of the entrance/exit slide in pixels.
    pub transition_distance: f64,
    /// Wait before the show transition starts (ms).
    pub enter_delay: f64,
    /// Wait before the hide transition starts (ms).
    pub exit_delay: f64,
    /// Length of the show transition (ms).
    pub show_duration: f64,
    /// Length of the hide transition (ms).
    pub hide_duration: f64,
    /// Stacking order of the popper element.
    pub z_index: i32,
    /// Half of the arrow width. Measured from the arrow element when unset.
    pub arrow_half_width: Option<f64>,
}

impl Default for PopperConfig {
    fn default() -> Self {
        Self {
            side: SideRequest::Auto,
            margin: 4.0,
            transition_distance: 10.0,
            enter_delay: 0.0,
            exit_delay: 0.0,
            show_duration: 300.0,
            hide_duration: 200.0,
            z_index: 1,
            arrow_half_width: None,
        }
    }
}

/// Timer lengths used by the transition controller, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    pub enter_delay: f64,
    pub exit_delay: f64,
    pub show_duration: f64,
    pub hide_duration: f64,
}

impl Default for Timings {
    fn default() -> Self {
        PopperConfig::default().timings()
    }
}

/// A configuration value that was replaced while loading or validating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl PopperConfig {
    /// Build a config from raw options.
    ///
    /// Unreadable values fall back to their default; the returned warnings
    /// list every replacement, including the ones made by [`validate`].
    ///
    /// [`validate`]: Self::validate
    pub fn from_options(options: &PopperOptions) -> (Self, Vec<ConfigWarning>) {
        let defaults = Self::default();
        let mut warnings = Vec::new();

        let side = match options.side.as_deref() {
            None => defaults.side,
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                warnings.push(ConfigWarning::new("side", format!("{err}, using auto")));
                SideRequest::Auto
            }),
        };

        let mut number = |field: &'static str, value: &Option<OptionValue>, default: f64| {
            let Some(value) = value else {
                return default;
            };
            value.as_number().unwrap_or_else(|| {
                warnings.push(ConfigWarning::new(
                    field,
                    format!("cannot read {value} as a number, using {default}"),
                ));
                default
            })
        };

        let margin = number("margin", &options.margin, defaults.margin);
        let transition_distance = number(
            "transition_distance",
            &options.transition_distance,
            defaults.transition_distance,
        );
        let enter_delay = number("enter_delay", &options.enter_delay, defaults.enter_delay);
        let exit_delay = number("exit_delay", &options.exit_delay, defaults.exit_delay);
        let show_duration = number("show_duration", &options.show_duration, defaults.show_duration);
        let hide_duration = number("hide_duration", &options.hide_duration, defaults.hide_duration);
        let z_index = number("z_index", &options.z_index, f64::from(defaults.z_index)).trunc() as i32;

        let arrow_half_width = options.arrow_half_width.as_ref().and_then(|value| {
            let parsed = value.as_number();
            if parsed.is_none() {
                warnings.push(ConfigWarning::new(
                    "arrow_half_width",
                    format!("cannot read {value} as a number, measuring the arrow instead"),
                ));
            }
            parsed
        });

        let mut config = Self {
            side,
            margin,
            transition_distance,
            enter_delay,
            exit_delay,
            show_duration,
            hide_duration,
            z_index,
            arrow_half_width,
        };
        warnings.extend(config.validate());
        (config, warnings)
    }

    /// Clamp every length and duration to a finite, non-negative value.
    ///
    /// Negative values become `0`; NaN or infinite values become the default.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let defaults = Self::default();
        let mut warnings = Vec::new();

        let fields: [(&'static str, &mut f64, f64); 6] = [
            ("margin", &mut self.margin, defaults.margin),
            (
                "transition_distance",
                &mut self.transition_distance,
                defaults.transition_distance,
            ),
            ("enter_delay", &mut self.enter_delay, defaults.enter_delay),
            ("exit_delay", &mut self.exit_delay, defaults.exit_delay),
            ("show_duration", &mut self.show_duration, defaults.show_duration),
            ("hide_duration", &mut self.hide_duration, defaults.hide_duration),
        ];
        for (field, value, default) in fields {
            if let Some(warning) = sanitize(field, value, default) {
                warnings.push(warning);
            }
        }

        if let Some(half) = self.arrow_half_width.as_mut() {
            if let Some(warning) = sanitize("arrow_half_width", half, 0.0) {
                warnings.push(warning);
            }
        }

        warnings
    }

    /// Options of the positioning pass.
    pub fn placement_options(&self) -> PlacementOptions {
        PlacementOptions {
            side: self.side,
            margin: self.margin,
            transition_distance: self.transition_distance,
            arrow_half_width: self.arrow_half_width,
        }
    }

    pub fn timings(&self) -> Timings {
        Timings {
            enter_delay: self.enter_delay,
            exit_delay: self.exit_delay,
            show_duration: self.show_duration,
            hide_duration: self.hide_duration,
        }
    }
}

fn sanitize(field: &'static str, value: &mut f64, default: f64) -> Option<ConfigWarning> {
    if !value.is_finite() {
        let warning = ConfigWarning::new(field, format!("{value} is not finite, using {default}"));
        *value = default;
        Some(warning)
    } else if *value < 0.0 {
        let warning = ConfigWarning::new(field, format!("{value} is negative, using 0"));
        *value = 0.0;
        Some(warning)
    } else {
        None
    }
}

// ============================================================================
// Raw options
// ============================================================================

/// A raw option value: either a number or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Number(f64),
    Text(String),
}

impl OptionValue {
    /// Read the value as a finite number.
    ///
    /// Text is read leniently: leading whitespace is skipped and the longest
    /// numeric prefix is used, so `"300ms"` reads as `300` and `"abc"` does
    /// not read at all.
    pub fn as_number(&self) -> Option<f64> {
        let number = match self {
            OptionValue::Number(n) => *n,
            OptionValue::Text(text) => parse_leading_number(text)?,
        };
        number.is_finite().then_some(number)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Number(n) => write!(f, "{n}"),
            OptionValue::Text(text) => write!(f, "{text:?}"),
        }
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Number(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

/// Longest prefix of `text` (after leading whitespace) that reads as a
/// decimal number with optional sign, fraction and exponent.
fn parse_leading_number(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - end - 1;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

/// Raw popper options, as found in a config file.
///
/// Every field is optional; numeric fields accept numbers or strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopperOptions {
    pub side: Option<String>,
    pub margin: Option<OptionValue>,
    #[serde(alias = "transitionDistance")]
    pub transition_distance: Option<OptionValue>,
    #[serde(alias = "enterDelay")]
    pub enter_delay: Option<OptionValue>,
    #[serde(alias = "exitDelay")]
    pub exit_delay: Option<OptionValue>,
    #[serde(alias = "showDuration")]
    pub show_duration: Option<OptionValue>,
    #[serde(alias = "hideDuration")]
    pub hide_duration: Option<OptionValue>,
    #[serde(alias = "zIndex")]
    pub z_index: Option<OptionValue>,
    #[serde(alias = "arrowHalfWidth")]
    pub arrow_half_width: Option<OptionValue>,
}
