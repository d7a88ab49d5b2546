//! Scripted input for headless runs.
//!
//! One event per argument, `<frame>:<action>`:
//! `12:drag=40,-8`, `30:resize=640x480`, `5:key=w`, `90:stop`.

use pathtrace_common::Resolution;
use pathtrace_input::Key;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptAction {
    /// Press the drag button, move by (dx, dy) pixels, release after the frame.
    Drag { dx: f64, dy: f64 },
    /// Change the host framebuffer size.
    Resize(Resolution),
    /// Press and release a key.
    Key(Key),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptEvent {
    /// Applied before this frame's update (1-based).
    pub frame: u64,
    pub action: ScriptAction,
}

pub fn parse_key(name: &str) -> Option<Key> {
    let key = match name.to_ascii_lowercase().as_str() {
        "w" => Key::W,
        "a" => Key::A,
        "s" => Key::S,
        "d" => Key::D,
        "q" => Key::Q,
        "e" => Key::E,
        "[" => Key::BracketLeft,
        "]" => Key::BracketRight,
        "-" => Key::Minus,
        "=" => Key::Equal,
        "esc" | "escape" => Key::Escape,
        _ => return None,
    };
    Some(key)
}

fn parse_resolution(text: &str) -> Result<Resolution, String> {
    let (w, h) = text
        .split_once('x')
        .ok_or_else(|| format!("expected WxH, got {text:?}"))?;
    let width = w.trim().parse().map_err(|e| format!("width {w:?}: {e}"))?;
    let height = h.trim().parse().map_err(|e| format!("height {h:?}: {e}"))?;
    Ok(Resolution::new(width, height))
}

fn parse_drag(text: &str) -> Result<ScriptAction, String> {
    let (dx, dy) = text
        .split_once(',')
        .ok_or_else(|| format!("expected dx,dy, got {text:?}"))?;
    let dx = dx.trim().parse().map_err(|e| format!("dx {dx:?}: {e}"))?;
    let dy = dy.trim().parse().map_err(|e| format!("dy {dy:?}: {e}"))?;
    Ok(ScriptAction::Drag { dx, dy })
}

impl FromStr for ScriptEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (frame, action) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <frame>:<action>, got {s:?}"))?;
        let frame: u64 = frame
            .trim()
            .parse()
            .map_err(|e| format!("frame {frame:?}: {e}"))?;
        if frame == 0 {
            return Err("frames are numbered from 1".into());
        }

        let action = match action.trim().split_once('=') {
            Some(("drag", value)) => parse_drag(value)?,
            Some(("resize", value)) => ScriptAction::Resize(parse_resolution(value)?),
            Some(("key", value)) => ScriptAction::Key(
                parse_key(value.trim()).ok_or_else(|| format!("unknown key {value:?}"))?,
            ),
            None if action.trim() == "stop" => ScriptAction::Stop,
            _ => return Err(format!("unknown action {action:?}")),
        };
        Ok(ScriptEvent { frame, action })
    }
}
