//! Watermark configuration: layers, presets, and pure state transitions.
//!
//! [`WatermarkSettings`] is a plain value. Interactive callers are expected to
//! produce a brand-new settings value for every edit (the `with_*` transitions
//! below); the rendering core only ever observes the final value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Construct a color from channel values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Opaque black, used for mask-mode tiling.
    #[must_use]
    pub const fn black() -> Self {
        Self::new(0, 0, 0)
    }

    /// Format as `#RRGGBB`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Parse a hex color string in `#RGB` or `#RRGGBB` form.
///
/// # Errors
///
/// Returns [`Error::InvalidColor`] for anything else.
pub fn parse_hex_color(hex: &str) -> Result<Color> {
    let digits = hex
        .strip_prefix('#')
        .ok_or_else(|| Error::InvalidColor(hex.to_string()))?;

    let invalid = || Error::InvalidColor(hex.to_string());
    match digits.len() {
        3 => {
            let r = u8::from_str_radix(&digits[0..1], 16).map_err(|_| invalid())?;
            let g = u8::from_str_radix(&digits[1..2], 16).map_err(|_| invalid())?;
            let b = u8::from_str_radix(&digits[2..3], 16).map_err(|_| invalid())?;
            // Each digit doubles: 0xA -> 0xAA
            Ok(Color::new(r * 17, g * 17, b * 17))
        }
        6 => {
            let r = u8::from_str_radix(&digits[0..2], 16).map_err(|_| invalid())?;
            let g = u8::from_str_radix(&digits[2..4], 16).map_err(|_| invalid())?;
            let b = u8::from_str_radix(&digits[4..6], 16).map_err(|_| invalid())?;
            Ok(Color::new(r, g, b))
        }
        _ => Err(invalid()),
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_hex_color(&s).map_err(serde::de::Error::custom)
    }
}

/// The fixed set of selectable font families.
///
/// Each maps onto one of the embedded font faces (see [`crate::fonts`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontFamily {
    /// Arial (sans-serif).
    Arial,
    /// Times New Roman (serif).
    TimesNewRoman,
    /// Courier New (monospace).
    CourierNew,
    /// Georgia (serif).
    Georgia,
    /// Verdana (sans-serif).
    Verdana,
}

impl FontFamily {
    /// All selectable families, in display order.
    pub const ALL: [FontFamily; 5] = [
        FontFamily::Arial,
        FontFamily::TimesNewRoman,
        FontFamily::CourierNew,
        FontFamily::Georgia,
        FontFamily::Verdana,
    ];

    /// The family's CSS-style display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FontFamily::Arial => "Arial",
            FontFamily::TimesNewRoman => "Times New Roman",
            FontFamily::CourierNew => "Courier New",
            FontFamily::Georgia => "Georgia",
            FontFamily::Verdana => "Verdana",
        }
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FontFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace([' ', '-', '_'], "").as_str() {
            "arial" => Ok(FontFamily::Arial),
            "timesnewroman" | "times" => Ok(FontFamily::TimesNewRoman),
            "couriernew" | "courier" => Ok(FontFamily::CourierNew),
            "georgia" => Ok(FontFamily::Georgia),
            "verdana" => Ok(FontFamily::Verdana),
            _ => Err(Error::InvalidFont(s.to_string())),
        }
    }
}

/// One watermark layer's full visual specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSettings {
    /// Multi-line watermark text. Whitespace-only text disables the layer's
    /// visible output.
    pub text: String,
    /// Text fill color.
    pub color: Color,
    /// Uniform fill opacity in `[0, 1]`.
    pub opacity: f32,
    /// Font size in pixels. Drives line height (`1.2x`) and the boost-mask
    /// blur radius.
    pub font_size: f32,
    /// Per-tile rotation in degrees about the tile center.
    pub rotation: f32,
    /// Pixel gap added to each tile's bounding box on both axes.
    pub spacing: f32,
    /// Horizontal shift of the whole tiling grid.
    pub offset_x: f32,
    /// Vertical shift of the whole tiling grid.
    pub offset_y: f32,
    /// Font family for the text.
    pub font_family: FontFamily,
    /// Stroke an 8px-padded rectangle around each tile's text block.
    pub border_enabled: bool,
}

impl LayerSettings {
    /// Whether this layer produces visible output (non-whitespace text).
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Style values applied by a preset (everything except the text).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetStyle {
    /// Fill color.
    pub color: Color,
    /// Fill opacity.
    pub opacity: f32,
    /// Font size in pixels.
    pub font_size: f32,
    /// Rotation in degrees.
    pub rotation: f32,
    /// Tile spacing in pixels.
    pub spacing: f32,
    /// Font family.
    pub font_family: FontFamily,
    /// Whether the tile border is stroked.
    pub border_enabled: bool,
}

impl PresetStyle {
    fn apply(self, text: String) -> LayerSettings {
        LayerSettings {
            text,
            color: self.color,
            opacity: self.opacity,
            font_size: self.font_size,
            rotation: self.rotation,
            spacing: self.spacing,
            offset_x: 0.0,
            offset_y: 0.0,
            font_family: self.font_family,
            border_enabled: self.border_enabled,
        }
    }

    fn matches(self, layer: &LayerSettings) -> bool {
        layer.color == self.color
            && layer.opacity == self.opacity
            && layer.font_size == self.font_size
            && layer.rotation == self.rotation
            && layer.spacing == self.spacing
            && layer.font_family == self.font_family
            && layer.border_enabled == self.border_enabled
    }
}

/// Standard blue used by the Default, Subtle, and Double presets.
const PRESET_BLUE: Color = Color::new(0x17, 0x14, 0xCC);
/// Stamp red, shared with the Double preset's second layer.
const PRESET_RED: Color = Color::new(0xDC, 0x26, 0x26);

/// The "Default" single-layer preset style.
pub const PRESET_DEFAULT: PresetStyle = PresetStyle {
    color: PRESET_BLUE,
    opacity: 0.5,
    font_size: 36.0,
    rotation: 26.0,
    spacing: 100.0,
    font_family: FontFamily::Arial,
    border_enabled: false,
};

/// The "Subtle" single-layer preset style.
pub const PRESET_SUBTLE: PresetStyle = PresetStyle {
    color: PRESET_BLUE,
    opacity: 0.20,
    font_size: 36.0,
    rotation: 26.0,
    spacing: 60.0,
    font_family: FontFamily::Arial,
    border_enabled: false,
};

/// The "Stamp" single-layer preset style (bordered red).
pub const PRESET_STAMP: PresetStyle = PresetStyle {
    color: PRESET_RED,
    opacity: 0.5,
    font_size: 50.0,
    rotation: 26.0,
    spacing: 50.0,
    font_family: FontFamily::Arial,
    border_enabled: true,
};

/// The "Double" preset's first-layer style.
pub const DOUBLE_PRESET_LAYER1: PresetStyle = PresetStyle {
    color: PRESET_BLUE,
    opacity: 0.40,
    font_size: 36.0,
    rotation: 26.0,
    spacing: 100.0,
    font_family: FontFamily::Arial,
    border_enabled: false,
};

/// The "Double" preset's second-layer style.
pub const DOUBLE_PRESET_LAYER2: PresetStyle = PresetStyle {
    color: PRESET_RED,
    opacity: 0.30,
    font_size: 40.0,
    rotation: -40.0,
    spacing: 120.0,
    font_family: FontFamily::CourierNew,
    border_enabled: false,
};

/// A named one-click style bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    /// Blue diagonal text, 50% opacity.
    Default,
    /// Low-opacity blue text with tighter spacing.
    Subtle,
    /// Large bordered red text.
    Stamp,
    /// Two layers: blue diagonal plus red counter-diagonal Courier.
    Double,
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Preset::Default),
            "subtle" => Ok(Preset::Subtle),
            "stamp" => Ok(Preset::Stamp),
            "double" => Ok(Preset::Double),
            _ => Err(Error::UnsupportedFormat(format!("unknown preset: {s}"))),
        }
    }
}

/// Identify which single-layer preset a layer's style matches, if any.
#[must_use]
pub fn active_preset(layer: &LayerSettings) -> Option<Preset> {
    if PRESET_DEFAULT.matches(layer) {
        Some(Preset::Default)
    } else if PRESET_SUBTLE.matches(layer) {
        Some(Preset::Subtle)
    } else if PRESET_STAMP.matches(layer) {
        Some(Preset::Stamp)
    } else {
        None
    }
}

/// The full watermark configuration for one image.
///
/// Slot 0 (`primary`) is always populated; slot 1 (`secondary`) is optional,
/// and absence means fully disabled rather than merely empty text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSettings {
    /// The always-present first layer.
    pub primary: LayerSettings,
    /// The optional second layer.
    pub secondary: Option<LayerSettings>,
    /// Base noise amplitude applied uniformly across all pixels.
    pub noise_level: u32,
    /// Additional amplitude applied near watermark glyphs only.
    pub noise_boost: u32,
}

impl WatermarkSettings {
    /// Resolve present layers into a single ordered list.
    ///
    /// This is the only place optionality is inspected; tiling and
    /// compositing code iterate the resolved list.
    #[must_use]
    pub fn active_layers(&self) -> Vec<&LayerSettings> {
        let mut layers = vec![&self.primary];
        if let Some(second) = &self.secondary {
            layers.push(second);
        }
        layers
    }

    /// Whether any present layer has visible text.
    #[must_use]
    pub fn has_visible_text(&self) -> bool {
        self.active_layers().iter().any(|l| l.has_text())
    }

    /// Enable the second layer with derived defaults: it inherits the first
    /// layer's text and picks a contrasting preset (Default when the first
    /// layer is already Subtle, otherwise Subtle).
    #[must_use]
    pub fn with_second_layer_enabled(mut self) -> Self {
        let style = if active_preset(&self.primary) == Some(Preset::Subtle) {
            PRESET_DEFAULT
        } else {
            PRESET_SUBTLE
        };
        self.secondary = Some(style.apply(self.primary.text.clone()));
        self
    }

    /// Disable the second layer, discarding its settings.
    #[must_use]
    pub fn with_second_layer_disabled(mut self) -> Self {
        self.secondary = None;
        self
    }

    /// Apply a preset.
    ///
    /// Single-layer presets restyle the given slot in place (a preset applied
    /// to an absent slot 1 is a no-op). The Double preset sets both slots
    /// atomically, preserving the text of whichever layer was most recently
    /// edited (the second layer's text when present, else the first's).
    #[must_use]
    pub fn with_preset(mut self, preset: Preset, slot: usize) -> Self {
        match preset {
            Preset::Double => {
                let text = self
                    .secondary
                    .as_ref()
                    .map_or_else(|| self.primary.text.clone(), |l| l.text.clone());
                self.primary = DOUBLE_PRESET_LAYER1.apply(self.primary.text.clone());
                self.secondary = Some(DOUBLE_PRESET_LAYER2.apply(text));
            }
            Preset::Default | Preset::Subtle | Preset::Stamp => {
                let style = match preset {
                    Preset::Default => PRESET_DEFAULT,
                    Preset::Subtle => PRESET_SUBTLE,
                    _ => PRESET_STAMP,
                };
                match slot {
                    0 => self.primary = style.apply(self.primary.text.clone()),
                    _ => {
                        if let Some(second) = self.secondary.take() {
                            self.secondary = Some(style.apply(second.text));
                        }
                    }
                }
            }
        }
        self
    }

    /// Whether the current configuration matches the Double preset.
    #[must_use]
    pub fn is_double_preset_active(&self) -> bool {
        self.secondary.as_ref().is_some_and(|second| {
            DOUBLE_PRESET_LAYER1.matches(&self.primary) && DOUBLE_PRESET_LAYER2.matches(second)
        })
    }

    /// Load settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`] when the document does not parse.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        let date = chrono::Local::now().format("%Y-%m-%d");
        Self {
            primary: PRESET_DEFAULT.apply(format!(
                "Sent to Hotel Patagonia\nOn {date}\nFor check in only"
            )),
            secondary: None,
            noise_level: 15,
            noise_boost: 0,
        }
    }
}
