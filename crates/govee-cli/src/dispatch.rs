//! Text command dispatch shared by the console and the MQTT bridge.
//!
//! A command is a name with an optional numeric index (`color3`,
//! `version2`) plus a data string. Every command answers with a JSON object
//! keyed by the command's result name, for example `{"Power": true}`, or
//! `{"ERROR": "..."}` when it fails.
//!
//! | Command | Data | Result |
//! |---------|------|--------|
//! | `power` | `on`, `off`, `toggle`, `1`, `0` or empty | `Power` |
//! | `dimmer` | level (0-1, or percent above 1) or empty | `Dimmer` |
//! | `mode` | | `Mode` |
//! | `version[1-3]` | | `Version` |
//! | `mac` | | `MAC` |
//! | `restart` | reason or empty | `Restart` |
//! | `status` | | every read-only value |
//! | `scene` | code (decimal or `0x..`) or name | `Scene` |
//! | `scenes` | | `Scenes` |
//! | `brightness[n]` | level or empty | `Brightness` |
//! | `color[n]` | color or empty | `Color` |
//! | `peek` | `reg` or `start:end` (hex) | `Peek` |
//! | `poke` | `reg data` (hex) | `Poke` |
//! | `multi` | hex | `Multi` |
//! | `raw` | hex | `Raw` |
//! | `asm` | assembler line | `ASM` |
//! | `state` | | `State` |
//!
//! The index of `brightness` and `color` selects one segment; without it
//! every segment is addressed.

use std::future::Future;
use std::time::Duration;

use govee_core::cache::{segment_slot, slot_location};
use govee_core::scenes::SceneQuery;
use govee_core::{Error as LightError, Light, Mode, Register, Rgb, SegmentMask};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use crate::asm::assemble;
use crate::color::{format_color, fuzzy_int, parse_color, parse_level};

/// Default time a single command may take.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
enum CommandError {
    #[error("Timeout")]
    Timeout,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Light(LightError),
}

impl From<LightError> for CommandError {
    fn from(e: LightError) -> Self {
        match e {
            LightError::Superseded { .. } | LightError::Timeout { .. } => CommandError::Timeout,
            other => CommandError::Light(other),
        }
    }
}

type CommandResult = Result<Value, CommandError>;

/// Split `color3` into `("color", Some(3))`.
///
/// Anything after the index is ignored.
pub fn split_command(command: &str) -> Option<(String, Option<u32>)> {
    let command = command.trim().to_lowercase();
    let name: String = command
        .chars()
        .take_while(|c| c.is_ascii_lowercase())
        .collect();
    if name.is_empty() {
        return None;
    }
    let digits: String = command[name.len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    Some((name, digits.parse().ok()))
}

/// Run one command against `light`.
///
/// Each light operation may take up to `limit`; an operation that exceeds
/// it, or whose reply is lost, reports `{"ERROR": "Timeout"}`.
pub async fn handle_command(light: &Light, command: &str, data: &str, limit: Duration) -> Value {
    debug!("Command {} {:?}", command, data);

    let Some((name, index)) = split_command(command) else {
        return json!({ "ERROR": format!("Invalid command: {command}") });
    };

    let dispatcher = Dispatcher { light, limit };
    match dispatcher.run(&name, index, data).await {
        Ok(Value::Null) => json!({ "ERROR": format!("Unknown command: {command}") }),
        Ok(value) => value,
        Err(e) => json!({ "ERROR": e.to_string() }),
    }
}

struct Dispatcher<'a> {
    light: &'a Light,
    limit: Duration,
}

impl Dispatcher<'_> {
    async fn call<T>(
        &self,
        operation: impl Future<Output = govee_core::Result<T>>,
    ) -> Result<T, CommandError> {
        Ok(timeout(self.limit, operation)
            .await
            .map_err(|_| CommandError::Timeout)??)
    }

    /// Re-read a register so cached getters see a value just written.
    async fn refresh(&self, register: Register) -> Result<(), CommandError> {
        self.call(self.light.read(register)).await?;
        Ok(())
    }

    /// Re-read the mode and the buffer sub-registers holding `mask`.
    async fn refresh_segments(&self, mask: SegmentMask) -> Result<(), CommandError> {
        self.refresh(Register::MODE).await?;
        let mut registers: Vec<Register> = mask
            .indices()
            .map(|index| slot_location(segment_slot(index)).0)
            .collect();
        registers.dedup();
        for register in registers {
            self.refresh(register).await?;
        }
        Ok(())
    }

    /// `Ok(Value::Null)` means the command is unknown.
    async fn run(&self, name: &str, index: Option<u32>, data: &str) -> CommandResult {
        match name {
            "power" => self.power(data).await,
            "dimmer" => self.dimmer(data).await,
            "mode" => Ok(json!({ "Mode": self.mode().await? })),
            "version" => self.version(index).await,
            "mac" => Ok(json!({ "MAC": self.call(self.light.get_mac()).await? })),
            "restart" => self.restart(data).await,
            "status" => match index {
                None | Some(0) => self.status().await,
                Some(_) => Ok(Value::Null),
            },
            "scene" => self.scene(data).await,
            "scenes" => {
                let summary = serde_json::to_value(self.light.scenes().summary())
                    .map_err(|e| CommandError::Invalid(e.to_string()))?;
                Ok(json!({ "Scenes": summary }))
            }
            "brightness" => self.brightness(index, data).await,
            "color" => self.color(index, data).await,
            "peek" => self.peek(data).await,
            "poke" => self.poke(data).await,
            "multi" => self.multi(data).await,
            "raw" => self.raw(data).await,
            "asm" => self.asm(data).await,
            "state" => Ok(json!({ "State": self.state() })),
            _ => Ok(Value::Null),
        }
    }

    async fn power(&self, data: &str) -> CommandResult {
        let on = match data.trim().to_lowercase().as_str() {
            "" => None,
            "toggle" => Some(!self.call(self.light.get_power()).await?),
            "0" | "off" | "false" => Some(false),
            "1" | "on" | "true" => Some(true),
            _ => {
                return Err(CommandError::Invalid(format!(
                    "Invalid power value: {data}"
                )));
            }
        };
        if let Some(on) = on {
            self.call(self.light.set_power(on)).await?;
            self.refresh(Register::POWER).await?;
        }
        Ok(json!({ "Power": self.call(self.light.get_power()).await? }))
    }

    async fn dimmer(&self, data: &str) -> CommandResult {
        let data = data.trim();
        if !data.is_empty() {
            let level = parse_level(data)
                .ok_or_else(|| CommandError::Invalid(format!("Invalid dimmer value: {data}")))?;
            self.call(self.light.set_dimmer(level)).await?;
            self.refresh(Register::DIMMER).await?;
        }
        let level = self.call(self.light.get_dimmer()).await?;
        Ok(json!({ "Dimmer": round_level(level) }))
    }

    async fn mode(&self) -> Result<Value, CommandError> {
        Ok(mode_json(&self.call(self.light.get_mode()).await?))
    }

    async fn versions(&self) -> Result<Value, CommandError> {
        Ok(json!([
            self.call(self.light.get_version()).await?,
            self.call(self.light.get_hw_version()).await?,
            self.call(self.light.get_fw_version()).await?,
        ]))
    }

    async fn version(&self, index: Option<u32>) -> CommandResult {
        let version = match index {
            Some(1) => json!(self.call(self.light.get_version()).await?),
            Some(2) => json!(self.call(self.light.get_hw_version()).await?),
            Some(3) => json!(self.call(self.light.get_fw_version()).await?),
            _ => self.versions().await?,
        };
        Ok(json!({ "Version": version }))
    }

    async fn restart(&self, data: &str) -> CommandResult {
        let data = data.trim();
        if !data.is_empty() {
            let reason = fuzzy_int(data)
                .and_then(|r| u8::try_from(r).ok())
                .ok_or_else(|| CommandError::Invalid("Invalid reason".to_string()))?;
            self.call(self.light.restart(reason)).await?;
        }
        Ok(json!({ "Restart": self.call(self.light.get_restart_reason()).await? }))
    }

    async fn status(&self) -> CommandResult {
        Ok(json!({
            "Power": self.call(self.light.get_power()).await?,
            "Dimmer": round_level(self.call(self.light.get_dimmer()).await?),
            "Mode": self.mode().await?,
            "Version": self.versions().await?,
            "MAC": self.call(self.light.get_mac()).await?,
            "Restart": self.call(self.light.get_restart_reason()).await?,
        }))
    }

    async fn scene(&self, data: &str) -> CommandResult {
        let data = data.trim().to_lowercase();
        if !data.is_empty() {
            let query = match fuzzy_int(&data).and_then(|code| u16::try_from(code).ok()) {
                Some(code) => SceneQuery::Code(code),
                None => SceneQuery::Name(data.clone()),
            };
            match self.call(self.light.set_scene(query)).await {
                Err(CommandError::Light(LightError::UnknownScene(_))) => {
                    return Err(CommandError::Invalid(format!("Invalid scene: {data}")));
                }
                other => other?,
            }
            self.refresh(Register::MODE).await?;
        }

        if let Some(scene) = self.call(self.light.get_scene()).await? {
            return Ok(json!({
                "Scene": {
                    "name": scene.title,
                    "category": scene.category,
                    "code": scene.summary(),
                }
            }));
        }
        match self.call(self.light.get_mode()).await? {
            Mode::Scene { code, name } => Ok(json!({ "Scene": { "name": name, "code": code } })),
            _ => Ok(json!({ "Scene": null })),
        }
    }

    async fn brightness(&self, index: Option<u32>, data: &str) -> CommandResult {
        let data = data.trim();
        if !data.is_empty() {
            let level = parse_level(data).ok_or_else(|| {
                CommandError::Invalid(format!("Invalid brightness value: {data}"))
            })?;
            let mask = segment_mask(index)?;
            self.call(self.light.set_brightness(level, mask)).await?;
            self.refresh_segments(mask).await?;
            return Ok(json!({ "Brightness": round_level(level) }));
        }

        match index {
            Some(_) => {
                let segments = self
                    .call(self.light.get_segments(segment_mask(index)?))
                    .await?;
                let level = segments.first().map(|s| round_level(s.brightness_fraction()));
                Ok(json!({ "Brightness": level }))
            }
            None => match self.call(self.light.get_mode()).await? {
                Mode::SolidColor { color } => {
                    Ok(json!({ "Brightness": round_level(color.brightness_fraction()) }))
                }
                _ => Ok(json!({ "Brightness": null })),
            },
        }
    }

    async fn color(&self, index: Option<u32>, data: &str) -> CommandResult {
        let data = data.trim();
        if !data.is_empty() {
            let channels = parse_color(data)
                .ok_or_else(|| CommandError::Invalid(format!("Invalid color: {data:?}")))?;
            let rgb = Rgb::try_from(channels).map_err(LightError::from)?;
            let mask = segment_mask(index)?;
            self.call(self.light.set_color(rgb, mask)).await?;
            self.refresh_segments(mask).await?;
            return Ok(json!({ "Color": format_color(rgb.r, rgb.g, rgb.b) }));
        }

        match index {
            Some(_) => {
                let segments = self
                    .call(self.light.get_segments(segment_mask(index)?))
                    .await?;
                let color = segments.first().map(|s| format_color(s.r, s.g, s.b));
                Ok(json!({ "Color": color }))
            }
            None => match self.call(self.light.get_mode()).await? {
                Mode::SolidColor { color } => {
                    Ok(json!({ "Color": format_color(color.r, color.g, color.b) }))
                }
                _ => Ok(json!({ "Color": null })),
            },
        }
    }

    async fn peek(&self, data: &str) -> CommandResult {
        let data = data.trim();
        if let Some((start, end)) = data.split_once(':') {
            let (start, end) = match (parse_register(start), parse_register(end)) {
                (Some(start), Some(end)) => (start, end),
                _ => return Err(CommandError::Invalid("Invalid range".to_string())),
            };

            let mut peeks = Vec::new();
            for packed in start..=end {
                match self.call(self.light.read(Register::from_packed(packed))).await {
                    Ok(value) => peeks.push(hex::encode(&value[..])),
                    Err(CommandError::Timeout) => {
                        return Ok(json!({ "ERROR": "Timeout", "Peek": peeks }));
                    }
                    Err(e) => return Err(e),
                }
            }
            return Ok(json!({ "Peek": peeks }));
        }

        let packed =
            parse_register(data).ok_or_else(|| CommandError::Invalid("Invalid register".into()))?;
        let value = self.call(self.light.read(Register::from_packed(packed))).await?;
        Ok(json!({ "Peek": hex::encode(&value[..]) }))
    }

    async fn poke(&self, data: &str) -> CommandResult {
        let (register, bytes) = data
            .trim()
            .split_once(' ')
            .ok_or_else(|| CommandError::Invalid("Missing data".to_string()))?;
        let packed = parse_register(register)
            .ok_or_else(|| CommandError::Invalid("Invalid register".to_string()))?;
        let bytes = parse_hex(bytes)?;
        self.call(self.light.write(Register::from_packed(packed), &bytes))
            .await?;
        Ok(json!({ "Poke": null }))
    }

    async fn multi(&self, data: &str) -> CommandResult {
        let bytes = parse_hex(data)?;
        if bytes.is_empty() {
            return Err(CommandError::Invalid("Invalid data".to_string()));
        }
        self.call(self.light.multi(&bytes)).await?;
        Ok(json!({ "Multi": null }))
    }

    async fn raw(&self, data: &str) -> CommandResult {
        let bytes = parse_hex(data)?;
        match self.call(self.light.send_raw(&bytes)).await {
            Err(CommandError::Light(LightError::Frame(_))) => {
                Err(CommandError::Invalid("Invalid data".to_string()))
            }
            other => other.map(|()| json!({ "Raw": null })),
        }
    }

    async fn asm(&self, data: &str) -> CommandResult {
        let frames = assemble(data).map_err(|e| CommandError::Invalid(e.to_string()))?;
        for frame in frames {
            self.call(self.light.send_raw(&frame)).await?;
        }
        Ok(json!({ "ASM": null }))
    }

    fn state(&self) -> Value {
        let state: Map<String, Value> = self
            .light
            .state()
            .into_iter()
            .map(|(register, value)| (register.to_string(), json!(hex::encode(&value[..]))))
            .collect();
        Value::Object(state)
    }
}

fn segment_mask(index: Option<u32>) -> Result<SegmentMask, CommandError> {
    match index {
        None => Ok(SegmentMask::ALL),
        Some(n) => SegmentMask::single(n as usize)
            .map_err(|_| CommandError::Invalid(format!("Invalid segment: {n}"))),
    }
}

fn parse_register(text: &str) -> Option<u16> {
    u16::from_str_radix(text.trim(), 16).ok()
}

fn parse_hex(text: &str) -> Result<Vec<u8>, CommandError> {
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(text).map_err(|_| CommandError::Invalid("Invalid data".to_string()))
}

/// A 0-1 level rounded to whole percent.
fn round_level(level: f32) -> f64 {
    (f64::from(level) * 100.0).round() / 100.0
}

fn percent_level(percent: u8) -> f64 {
    f64::from(percent) / 100.0
}

/// JSON form of a light mode.
pub fn mode_json(mode: &Mode) -> Value {
    match mode {
        Mode::SolidColor { color } => json!({
            "mode": "color",
            "brightness": percent_level(color.brightness),
            "color": format_color(color.r, color.g, color.b),
        }),
        Mode::SegmentColors { segments } => json!({
            "mode": "segment",
            "segments": segments
                .iter()
                .map(|s| json!({
                    "color": format_color(s.r, s.g, s.b),
                    "brightness": percent_level(s.brightness),
                }))
                .collect::<Vec<_>>(),
        }),
        Mode::Scene { code, name } => json!({
            "mode": "scene",
            "code": code,
            "name": name,
        }),
    }
}
