//! Scripted answers for driving the terminal front end without a TTY.
//!
//! When `GOFAST_WISH_TEST_INPUTS` is set, every prompt pops the next token
//! from a `|`-separated queue instead of reading the terminal.

use once_cell::sync::Lazy;
use std::{
    collections::VecDeque,
    env,
    sync::{Mutex, MutexGuard},
};

pub const INPUTS_ENV: &str = "GOFAST_WISH_TEST_INPUTS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedInput {
    Value(String),
    Keep,
    Back,
    Help,
    Cancel,
    Confirm,
}

struct InputQueue {
    enabled: bool,
    inputs: VecDeque<ScriptedInput>,
}

impl InputQueue {
    fn from_env() -> Self {
        match env::var(INPUTS_ENV) {
            Ok(raw) => Self {
                enabled: true,
                inputs: parse_sequence(&raw),
            },
            Err(_) => Self {
                enabled: false,
                inputs: VecDeque::new(),
            },
        }
    }
}

static INPUTS: Lazy<Mutex<InputQueue>> = Lazy::new(|| Mutex::new(InputQueue::from_env()));

fn queue() -> MutexGuard<'static, InputQueue> {
    INPUTS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn is_enabled() -> bool {
    queue().enabled
}

/// Next scripted answer, or `None` when scripting is off. An exhausted queue
/// answers `Cancel` so a short script ends the wizard instead of hanging.
pub fn next_input(label: &str) -> Option<ScriptedInput> {
    let mut guard = queue();
    if !guard.enabled {
        return None;
    }
    Some(guard.inputs.pop_front().unwrap_or_else(|| {
        tracing::warn!(prompt = label, "scripted inputs exhausted; cancelling");
        ScriptedInput::Cancel
    }))
}

pub fn install_inputs(inputs: Vec<ScriptedInput>) {
    let mut guard = queue();
    guard.enabled = true;
    guard.inputs = inputs.into();
}

pub fn reset_inputs() {
    let mut guard = queue();
    guard.enabled = false;
    guard.inputs.clear();
}

fn parse_token(token: &str) -> ScriptedInput {
    match token.to_ascii_uppercase().as_str() {
        "<BACK>" => ScriptedInput::Back,
        "<HELP>" => ScriptedInput::Help,
        "<KEEP>" => ScriptedInput::Keep,
        "<CANCEL>" => ScriptedInput::Cancel,
        "<CONFIRM>" => ScriptedInput::Confirm,
        "<BLANK>" | "<EMPTY>" => ScriptedInput::Value(String::new()),
        _ => ScriptedInput::Value(token.to_string()),
    }
}

pub fn parse_sequence(raw: &str) -> VecDeque<ScriptedInput> {
    raw.split('|')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(parse_token)
        .collect()
}
