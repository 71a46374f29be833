//! Scheduler settings
//!
//! The settings snapshot consumed by the dialogue engine. A copy is stored
//! on every clarification session so that answers keep using the settings
//! that were active when the session was created.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CALENDAR_ID, DEFAULT_DURATION_MINUTES, DEFAULT_MODEL, DEFAULT_TIMEZONE,
};

/// How the initial draft is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Send the raw input to the interpretation gateway.
    Ai,
    /// Use the deterministic local extractor only.
    Direct,
}

/// Whether explicit human confirmation is required before commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationPolicy {
    /// Always ask before creating the event.
    Always,
    /// Ask only when the draft is uncertain or low-confidence.
    UncertainOnly,
}

/// A named custom instruction block for the interpretation gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionPreset {
    pub id: String,
    pub name: String,
    pub text: String,
}

/// Settings snapshot for a scheduling turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSettings {
    pub default_duration_minutes: i64,
    pub input_mode: InputMode,
    pub ai_enabled: bool,
    pub model: String,
    pub calendar_id: String,
    /// IANA timezone name used for calendar payloads.
    pub timezone: String,
    pub confirmation_policy: ConfirmationPolicy,
    /// Instruction text sent verbatim to the interpretation gateway.
    pub interpreter_instruction: String,
    /// User-defined time resolution rules, forwarded to the gateway prompt.
    pub time_resolution_rules: String,
    pub instruction_presets: Vec<InstructionPreset>,
    pub active_instruction_preset_id: String,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            input_mode: InputMode::Ai,
            ai_enabled: true,
            model: DEFAULT_MODEL.to_string(),
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            confirmation_policy: ConfirmationPolicy::UncertainOnly,
            interpreter_instruction: String::new(),
            time_resolution_rules: String::new(),
            instruction_presets: Vec::new(),
            active_instruction_preset_id: String::new(),
        }
    }
}

impl SchedulerSettings {
    /// Whether this turn may call the interpretation gateway at all.
    ///
    /// `Direct` mode skips every external round, even when AI is enabled;
    /// disabling AI has the same effect regardless of mode.
    pub fn uses_ai(&self) -> bool {
        self.ai_enabled && self.input_mode == InputMode::Ai
    }

    /// Resolve the instruction text for the current turn.
    ///
    /// The explicit instruction wins; otherwise the active preset's text is
    /// used, and an unknown preset id resolves to an empty instruction.
    pub fn active_instruction_text(&self) -> String {
        let explicit = self.interpreter_instruction.trim();
        if !explicit.is_empty() {
            return explicit.to_string();
        }

        self.instruction_presets
            .iter()
            .find(|preset| preset.id == self.active_instruction_preset_id)
            .map(|preset| preset.text.clone())
            .unwrap_or_default()
    }
}
