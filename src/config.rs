//! Configuration: the typed key/value store the session exposes, plus
//! TOML threshold profiles on disk.
//!
//! Recognition thresholds are injected configuration, not hardcoded
//! constants; settings are not durable across restarts unless a profile
//! is written, and are reapplied at startup.

use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::PathBuf,
};

use crate::gestures::GestureConfig;

/// Well-known keys for the gesture-recognition thresholds.
pub mod keys {
    pub const CIRCLE_MIN_RADIUS: &str = "Gesture.Circle.MinRadius";
    pub const CIRCLE_MIN_ARC: &str = "Gesture.Circle.MinArc";
    pub const SWIPE_MIN_LENGTH: &str = "Gesture.Swipe.MinLength";
    pub const SWIPE_MIN_VELOCITY: &str = "Gesture.Swipe.MinVelocity";
    pub const KEY_TAP_MIN_DOWN_VELOCITY: &str = "Gesture.KeyTap.MinDownVelocity";
    pub const KEY_TAP_HISTORY_SECONDS: &str = "Gesture.KeyTap.HistorySeconds";
    pub const KEY_TAP_MIN_DISTANCE: &str = "Gesture.KeyTap.MinDistance";
    pub const SCREEN_TAP_MIN_FORWARD_VELOCITY: &str = "Gesture.ScreenTap.MinForwardVelocity";
    pub const SCREEN_TAP_HISTORY_SECONDS: &str = "Gesture.ScreenTap.HistorySeconds";
    pub const SCREEN_TAP_MIN_DISTANCE: &str = "Gesture.ScreenTap.MinDistance";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Boolean,
    Int32,
    Float,
    String,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Bool(bool),
    Int32(i32),
    Float(f32),
    Str(String),
}

impl Value {
    fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Boolean,
            Value::Int32(_) => ValueType::Int32,
            Value::Float(_) => ValueType::Float,
            Value::Str(_) => ValueType::String,
        }
    }
}

/// Typed key/value settings. Setters on an existing key keep its type;
/// a mismatched set reports failure instead of erroring. `save` only
/// succeeds once a service connection exists, and nothing here is durable
/// across restarts on its own.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    values: HashMap<String, Value>,
    dirty: bool,
    connected: bool,
}

impl ConfigStore {
    /// A store pre-seeded with the gesture threshold defaults.
    pub fn new() -> Self {
        let mut store = Self {
            values: HashMap::new(),
            dirty: false,
            connected: false,
        };
        store.seed(&GestureConfig::default());
        store
    }

    fn seed(&mut self, cfg: &GestureConfig) {
        let pairs = [
            (keys::CIRCLE_MIN_RADIUS, cfg.circle_min_radius),
            (keys::CIRCLE_MIN_ARC, cfg.circle_min_arc),
            (keys::SWIPE_MIN_LENGTH, cfg.swipe_min_length),
            (keys::SWIPE_MIN_VELOCITY, cfg.swipe_min_velocity),
            (keys::KEY_TAP_MIN_DOWN_VELOCITY, cfg.key_tap_min_down_velocity),
            (keys::KEY_TAP_HISTORY_SECONDS, cfg.key_tap_history_seconds),
            (keys::KEY_TAP_MIN_DISTANCE, cfg.key_tap_min_distance),
            (
                keys::SCREEN_TAP_MIN_FORWARD_VELOCITY,
                cfg.screen_tap_min_forward_velocity,
            ),
            (keys::SCREEN_TAP_HISTORY_SECONDS, cfg.screen_tap_history_seconds),
            (keys::SCREEN_TAP_MIN_DISTANCE, cfg.screen_tap_min_distance),
        ];
        for (k, v) in pairs {
            self.values.insert(k.to_string(), Value::Float(v));
        }
    }

    pub fn value_type(&self, key: &str) -> ValueType {
        self.values
            .get(key)
            .map(Value::value_type)
            .unwrap_or(ValueType::Unknown)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(Value::Bool(true)))
    }

    pub fn get_int32(&self, key: &str) -> i32 {
        match self.values.get(key) {
            Some(Value::Int32(v)) => *v,
            _ => 0,
        }
    }

    pub fn get_float(&self, key: &str) -> f32 {
        match self.values.get(key) {
            Some(Value::Float(v)) => *v,
            _ => 0.0,
        }
    }

    pub fn get_string(&self, key: &str) -> String {
        match self.values.get(key) {
            Some(Value::Str(v)) => v.clone(),
            _ => String::new(),
        }
    }

    pub fn set_bool(&mut self, key: &str, value: bool) -> bool {
        self.set(key, Value::Bool(value))
    }

    pub fn set_int32(&mut self, key: &str, value: i32) -> bool {
        self.set(key, Value::Int32(value))
    }

    pub fn set_float(&mut self, key: &str, value: f32) -> bool {
        self.set(key, Value::Float(value))
    }

    pub fn set_string(&mut self, key: &str, value: &str) -> bool {
        self.set(key, Value::Str(value.to_string()))
    }

    fn set(&mut self, key: &str, value: Value) -> bool {
        if let Some(existing) = self.values.get(key) {
            if existing.value_type() != value.value_type() {
                return false;
            }
        }
        self.values.insert(key.to_string(), value);
        self.dirty = true;
        true
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Commit pending changes to the service side. Meaningless (and
    /// `false`) without a live connection; the session keeps running on
    /// the last applied values either way.
    pub fn save(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        self.dirty = false;
        true
    }

    /// Snapshot of the gesture thresholds as the recognizers consume them.
    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig {
            circle_min_radius: self.get_float(keys::CIRCLE_MIN_RADIUS),
            circle_min_arc: self.get_float(keys::CIRCLE_MIN_ARC),
            swipe_min_length: self.get_float(keys::SWIPE_MIN_LENGTH),
            swipe_min_velocity: self.get_float(keys::SWIPE_MIN_VELOCITY),
            key_tap_min_down_velocity: self.get_float(keys::KEY_TAP_MIN_DOWN_VELOCITY),
            key_tap_min_distance: self.get_float(keys::KEY_TAP_MIN_DISTANCE),
            key_tap_history_seconds: self.get_float(keys::KEY_TAP_HISTORY_SECONDS),
            screen_tap_min_forward_velocity: self.get_float(keys::SCREEN_TAP_MIN_FORWARD_VELOCITY),
            screen_tap_min_distance: self.get_float(keys::SCREEN_TAP_MIN_DISTANCE),
            screen_tap_history_seconds: self.get_float(keys::SCREEN_TAP_HISTORY_SECONDS),
        }
    }

    pub fn apply_profile(&mut self, profile: &Profile) {
        self.seed(&profile.thresholds.to_gesture_config());
        self.dirty = true;
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

// --------- TOML profiles on disk (startup injection) ----------

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    pub circle_min_radius: f32,
    pub circle_min_arc: f32,
    pub swipe_min_length: f32,
    pub swipe_min_velocity: f32,
    pub key_tap_min_down_velocity: f32,
    pub key_tap_min_distance: f32,
    pub key_tap_history_seconds: f32,
    pub screen_tap_min_forward_velocity: f32,
    pub screen_tap_min_distance: f32,
    pub screen_tap_history_seconds: f32,
}

impl Thresholds {
    pub fn to_gesture_config(&self) -> GestureConfig {
        GestureConfig {
            circle_min_radius: self.circle_min_radius,
            circle_min_arc: self.circle_min_arc,
            swipe_min_length: self.swipe_min_length,
            swipe_min_velocity: self.swipe_min_velocity,
            key_tap_min_down_velocity: self.key_tap_min_down_velocity,
            key_tap_min_distance: self.key_tap_min_distance,
            key_tap_history_seconds: self.key_tap_history_seconds,
            screen_tap_min_forward_velocity: self.screen_tap_min_forward_velocity,
            screen_tap_min_distance: self.screen_tap_min_distance,
            screen_tap_history_seconds: self.screen_tap_history_seconds,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub meta: Meta,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone)]
pub struct ProfileState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot resolve home directory"))?;
    Ok(dirs.home_dir().join(".config").join("palmtrack"))
}

fn profiles_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("profiles"))
}

fn active_ptr_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("active"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl ProfileState {
    pub fn load_or_install_default() -> Result<Self> {
        let cfgdir = config_dir()?;
        let profdir = profiles_dir()?;
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = active_ptr_path()?;
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = Self::load_profile(&active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    pub fn reload(&mut self) -> Result<()> {
        self.profile = Self::load_profile(&self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.reload()?;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                if let Some(ext) = e.path().extension() {
                    if ext == "toml" {
                        if let Some(stem) = e.path().file_stem().and_then(|s| s.to_str()) {
                            v.push(stem.to_string());
                        }
                    }
                }
            }
        }
        v.sort();
        v
    }

    fn load_profile(name: &str) -> Result<Profile> {
        let path = profiles_dir()?.join(format!("{name}.toml"));
        let txt = fs::read_to_string(&path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        let profile: Profile =
            toml::from_str(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        serde_json::json!({
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "profiles": self.list_profiles(),
            "history_depth": crate::history::HISTORY_DEPTH,
            "thresholds": {
                "circle_min_radius": self.profile.thresholds.circle_min_radius,
                "circle_min_arc": self.profile.thresholds.circle_min_arc,
                "swipe_min_length": self.profile.thresholds.swipe_min_length,
                "swipe_min_velocity": self.profile.thresholds.swipe_min_velocity,
            },
        })
    }
}

fn validate_profile(p: &Profile) -> Result<()> {
    let t = &p.thresholds;
    let positive = [
        ("circle_min_radius", t.circle_min_radius),
        ("circle_min_arc", t.circle_min_arc),
        ("swipe_min_length", t.swipe_min_length),
        ("swipe_min_velocity", t.swipe_min_velocity),
        ("key_tap_min_down_velocity", t.key_tap_min_down_velocity),
        ("key_tap_min_distance", t.key_tap_min_distance),
        ("key_tap_history_seconds", t.key_tap_history_seconds),
        (
            "screen_tap_min_forward_velocity",
            t.screen_tap_min_forward_velocity,
        ),
        ("screen_tap_min_distance", t.screen_tap_min_distance),
        ("screen_tap_history_seconds", t.screen_tap_history_seconds),
    ];
    for (name, value) in positive {
        if !(value > 0.0) {
            return Err(anyhow!("thresholds.{name} must be positive"));
        }
    }
    if t.key_tap_history_seconds > 2.0 || t.screen_tap_history_seconds > 2.0 {
        return Err(anyhow!("tap history windows above 2s are not sensible"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_is_seeded_with_gesture_defaults() {
        let store = ConfigStore::new();
        assert_eq!(store.value_type(keys::CIRCLE_MIN_RADIUS), ValueType::Float);
        assert_eq!(store.get_float(keys::CIRCLE_MIN_RADIUS), 5.0);
        assert_eq!(store.get_float(keys::SWIPE_MIN_VELOCITY), 1000.0);
        assert_eq!(store.value_type("no.such.key"), ValueType::Unknown);
        assert_eq!(store.get_float("no.such.key"), 0.0);
    }

    #[test]
    fn setters_respect_existing_types() {
        let mut store = ConfigStore::new();
        assert!(store.set_float(keys::CIRCLE_MIN_RADIUS, 10.0));
        assert_eq!(store.get_float(keys::CIRCLE_MIN_RADIUS), 10.0);
        // wrong type on an existing key is refused, value untouched
        assert!(!store.set_bool(keys::CIRCLE_MIN_RADIUS, true));
        assert_eq!(store.get_float(keys::CIRCLE_MIN_RADIUS), 10.0);
        // fresh keys take any type
        assert!(store.set_string("robust_mode.label", "on"));
        assert_eq!(store.value_type("robust_mode.label"), ValueType::String);
    }

    #[test]
    fn save_requires_a_connection() {
        let mut store = ConfigStore::new();
        store.set_float(keys::SWIPE_MIN_LENGTH, 200.0);
        assert!(!store.save());
        store.set_connected(true);
        assert!(store.save());
    }

    #[test]
    fn gesture_config_reflects_edits() {
        let mut store = ConfigStore::new();
        store.set_float(keys::CIRCLE_MIN_ARC, 0.5);
        let cfg = store.gesture_config();
        assert_eq!(cfg.circle_min_arc, 0.5);
        assert_eq!(cfg.key_tap_min_distance, 3.0);
    }

    #[test]
    fn default_profile_text_parses_and_validates() {
        let profile: Profile = toml::from_str(default_profile_text()).unwrap();
        validate_profile(&profile).unwrap();
        let cfg = profile.thresholds.to_gesture_config();
        let defaults = GestureConfig::default();
        assert_eq!(cfg.circle_min_radius, defaults.circle_min_radius);
        assert!((cfg.circle_min_arc - defaults.circle_min_arc).abs() < 1e-3);
        assert_eq!(cfg.swipe_min_length, defaults.swipe_min_length);
        assert_eq!(cfg.swipe_min_velocity, defaults.swipe_min_velocity);
        assert_eq!(cfg.key_tap_min_distance, defaults.key_tap_min_distance);
        assert_eq!(cfg.screen_tap_min_distance, defaults.screen_tap_min_distance);
    }
}
