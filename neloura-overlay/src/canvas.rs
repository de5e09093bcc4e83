//! Drawing surface used by the grid renderer.
//!
//! Coordinates are CSS pixels; implementations apply the backing store
//! scale themselves.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
}

/// Host canvas operations the overlay needs.
pub trait OverlayCanvas {
    /// Resizes the backing store to `width x height` CSS pixels at `scale`
    /// device pixels per CSS pixel.
    fn resize(&mut self, width: f64, height: f64, scale: f64);
    fn clear(&mut self);
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: &str);
    fn line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: &str);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: &str);
    fn measure_text(&self, text: &str) -> TextMetrics;
    fn fill_text(&mut self, text: &str, x: f64, y: f64, align: TextAlign, color: &str);
}

/// One recorded canvas call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Resize {
        width: f64,
        height: f64,
        scale: f64,
    },
    Clear,
    StrokeRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
    },
    Line {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        color: String,
    },
    FillRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
    },
    FillText {
        text: String,
        x: f64,
        y: f64,
        align: TextAlign,
        color: String,
    },
}

/// Canvas that records commands for later replay by the host.
///
/// Text is measured with a fixed advance per character.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandCanvas {
    commands: Vec<DrawCommand>,
    char_width: f64,
    line_height: f64,
}

impl Default for CommandCanvas {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            char_width: 7.0,
            line_height: 12.0,
        }
    }
}

impl CommandCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font_metrics(mut self, char_width: f64, line_height: f64) -> Self {
        self.char_width = char_width;
        self.line_height = line_height;
        self
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Hands the recorded commands to the caller, leaving the canvas empty.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::FillText { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.commands)
    }
}

impl OverlayCanvas for CommandCanvas {
    fn resize(&mut self, width: f64, height: f64, scale: f64) {
        self.commands.push(DrawCommand::Resize {
            width,
            height,
            scale,
        });
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: &str) {
        self.commands.push(DrawCommand::StrokeRect {
            x,
            y,
            width,
            height,
            color: color.to_string(),
        });
    }

    fn line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: &str) {
        self.commands.push(DrawCommand::Line {
            x0,
            y0,
            x1,
            y1,
            color: color.to_string(),
        });
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: &str) {
        self.commands.push(DrawCommand::FillRect {
            x,
            y,
            width,
            height,
            color: color.to_string(),
        });
    }

    fn measure_text(&self, text: &str) -> TextMetrics {
        TextMetrics {
            width: text.chars().count() as f64 * self.char_width,
            height: self.line_height,
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, align: TextAlign, color: &str) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
            align,
            color: color.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_drops_previous_frame() {
        let mut canvas = CommandCanvas::new();
        canvas.line(0.0, 0.0, 1.0, 1.0, "red");
        canvas.clear();
        assert_eq!(canvas.commands(), &[DrawCommand::Clear]);
    }

    #[test]
    fn test_measure_text() {
        let canvas = CommandCanvas::new().with_font_metrics(6.0, 10.0);
        let metrics = canvas.measure_text("12:00");
        assert_eq!(metrics.width, 30.0);
        assert_eq!(metrics.height, 10.0);
    }

    #[test]
    fn test_commands_serialize_tagged() {
        let mut canvas = CommandCanvas::new();
        canvas.fill_text("+10", 1.0, 2.0, TextAlign::Center, "#fff");
        let json = canvas.to_json().unwrap();
        assert!(json.contains(r#""op":"fill_text""#));
        assert!(json.contains(r#""align":"center""#));
        assert_eq!(canvas.texts().collect::<Vec<_>>(), vec!["+10"]);
        assert_eq!(canvas.take_commands().len(), 1);
        assert!(canvas.commands().is_empty());
    }
}
