//! Input (mouse and keyboard) operations for CDP page session.

use serde_json::json;
use tracing::debug;

use crate::cdp::error::CdpError;
use crate::cdp::protocol::{KeyEventType, MouseButton, MouseEventType};

use super::core::PageSession;

/// CDP parameters for a named key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyDefinition {
    pub key: String,
    pub code: String,
    pub key_code: u32,
    /// Text inserted by the key, if any.
    pub text: Option<String>,
}

/// Look up a key name such as `Enter`, `ArrowDown` or `a`.
pub(crate) fn key_definition(name: &str) -> KeyDefinition {
    let named = |key: &str, code: &str, key_code: u32, text: Option<&str>| KeyDefinition {
        key: key.to_string(),
        code: code.to_string(),
        key_code,
        text: text.map(str::to_string),
    };

    match name.to_lowercase().as_str() {
        "enter" | "return" => named("Enter", "Enter", 13, Some("\r")),
        "escape" | "esc" => named("Escape", "Escape", 27, None),
        "tab" => named("Tab", "Tab", 9, None),
        "backspace" => named("Backspace", "Backspace", 8, None),
        "delete" => named("Delete", "Delete", 46, None),
        "space" | " " => named(" ", "Space", 32, Some(" ")),
        "arrowleft" | "left" => named("ArrowLeft", "ArrowLeft", 37, None),
        "arrowup" | "up" => named("ArrowUp", "ArrowUp", 38, None),
        "arrowright" | "right" => named("ArrowRight", "ArrowRight", 39, None),
        "arrowdown" | "down" => named("ArrowDown", "ArrowDown", 40, None),
        "home" => named("Home", "Home", 36, None),
        "end" => named("End", "End", 35, None),
        "pageup" => named("PageUp", "PageUp", 33, None),
        "pagedown" => named("PageDown", "PageDown", 34, None),
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => {
                    let upper = c.to_ascii_uppercase();
                    let code = if c.is_ascii_digit() {
                        format!("Digit{}", c)
                    } else {
                        format!("Key{}", upper)
                    };
                    KeyDefinition {
                        key: c.to_string(),
                        code,
                        key_code: upper as u32,
                        text: Some(c.to_string()),
                    }
                }
                _ => named(name, name, 0, None),
            }
        }
    }
}

impl PageSession {
    /// Click at coordinates.
    pub async fn click(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.mouse_move(x, y).await?;

        for event in [MouseEventType::MousePressed, MouseEventType::MouseReleased] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event,
                    "x": x,
                    "y": y,
                    "button": MouseButton::Left,
                    "clickCount": 1,
                })),
            )
            .await?;
        }

        debug!("Clicked at ({}, {})", x, y);
        Ok(())
    }

    /// Move mouse to coordinates.
    pub async fn mouse_move(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseMoved,
                "x": x,
                "y": y,
                "button": MouseButton::None,
            })),
        )
        .await?;
        Ok(())
    }

    /// Dispatch a wheel event at `(x, y)`.
    pub async fn scroll(&self, x: f64, y: f64, delta_x: f64, delta_y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseWheel,
                "x": x,
                "y": y,
                "deltaX": delta_x,
                "deltaY": delta_y,
            })),
        )
        .await?;
        Ok(())
    }

    /// Insert text at the current focus.
    pub async fn insert_text(&self, text: &str) -> Result<(), CdpError> {
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        debug!("Typed {} characters", text.chars().count());
        Ok(())
    }

    /// Press a key or a combination such as `Control+a`.
    pub async fn press_key_combo(&self, combo: &str) -> Result<(), CdpError> {
        let parts: Vec<&str> = combo.split('+').map(str::trim).collect();
        let (key, modifier_names) = match parts.split_last() {
            Some((key, rest)) if !key.is_empty() => (*key, rest),
            // "+" itself, or a trailing '+'
            _ => ("+", &parts[..0]),
        };
        let modifiers = Self::get_modifiers(modifier_names);
        let def = key_definition(key);

        // Chords must not insert text.
        let text = if modifiers & !8 == 0 { def.text.clone() } else { None };
        let down_type = if text.is_some() {
            KeyEventType::KeyDown
        } else {
            KeyEventType::RawKeyDown
        };

        let mut down = json!({
            "type": down_type,
            "key": def.key,
            "code": def.code,
            "windowsVirtualKeyCode": def.key_code,
            "modifiers": modifiers,
        });
        if let Some(t) = text {
            down["text"] = json!(t);
        }
        self.call("Input.dispatchKeyEvent", Some(down)).await?;

        self.call(
            "Input.dispatchKeyEvent",
            Some(json!({
                "type": KeyEventType::KeyUp,
                "key": def.key,
                "code": def.code,
                "windowsVirtualKeyCode": def.key_code,
                "modifiers": modifiers,
            })),
        )
        .await?;

        debug!("Pressed {}", combo);
        Ok(())
    }

    /// Get modifier flags from modifier names.
    pub(crate) fn get_modifiers(modifiers: &[&str]) -> i32 {
        let mut flags = 0;
        for m in modifiers {
            match m.to_lowercase().as_str() {
                "alt" | "option" => flags |= 1,
                "control" | "ctrl" => flags |= 2,
                "meta" | "command" | "cmd" => flags |= 4,
                "shift" => flags |= 8,
                _ => {}
            }
        }
        flags
    }
}
