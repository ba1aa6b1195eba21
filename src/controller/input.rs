//! Platform-agnostic keyboard handling.
//!
//! Keys are identified by their physical code string as the DOM reports it
//! in `KeyboardEvent.code` (`"KeyW"`, `"ArrowLeft"`, `"Space"`). Native key
//! codes are translated to the same strings.
use std::collections::HashMap;

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
    FocusLost,
    VisibilityChanged { visible: bool },
}

/// Latched key state: the last transition seen for each key wins.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashMap<String, bool>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(code) => self.set_key(code, true),
            InputEvent::KeyUp(code) => self.set_key(code, false),
            // a key released while unfocused would otherwise stay latched
            InputEvent::FocusLost => self.clear_keys(),
            InputEvent::VisibilityChanged { visible } => {
                if !visible {
                    self.clear_keys();
                }
            }
        }
    }

    pub fn set_key(&mut self, code: &str, down: bool) {
        match self.keys.get_mut(code) {
            Some(state) => *state = down,
            None => {
                self.keys.insert(code.to_string(), down);
            }
        }
    }

    /// Keys never seen read as released.
    pub fn is_key_pressed(&self, code: &str) -> bool {
        self.keys.get(code).copied().unwrap_or(false)
    }

    pub fn clear_keys(&mut self) {
        for state in self.keys.values_mut() {
            *state = false;
        }
    }
}

/// Key mapping configuration
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub start: String,
    pub fast_forward: String,
    pub turn_left: String,
    pub turn_right: String,
    pub tilt_up: String,
    pub tilt_down: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            start: "Space".to_string(),
            fast_forward: "KeyW".to_string(),
            turn_left: "ArrowLeft".to_string(),
            turn_right: "ArrowRight".to_string(),
            tilt_up: "ArrowUp".to_string(),
            tilt_down: "ArrowDown".to_string(),
        }
    }
}

/// Answers gameplay questions ("turning left?") from raw key state.
#[derive(Debug, Clone)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl Default for InputProcessor {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn wants_to_start(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.start)
    }

    pub fn is_fast_forward(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.fast_forward)
    }

    pub fn is_turning_left(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.turn_left)
    }

    pub fn is_turning_right(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.turn_right)
    }

    pub fn is_tilting_up(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.tilt_up)
    }

    pub fn is_tilting_down(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.tilt_down)
    }

    /// Keys whose browser default (scrolling) should be suppressed.
    pub fn is_game_key(&self, code: &str) -> bool {
        let b = &self.bindings;
        [&b.start, &b.fast_forward, &b.turn_left, &b.turn_right, &b.tilt_up, &b.tilt_down]
            .iter()
            .any(|k| k.as_str() == code)
    }
}

pub mod wasm {
    use super::*;
    use web_sys::KeyboardEvent;

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let code = e.code();
        if is_down {
            InputEvent::KeyDown(code)
        } else {
            InputEvent::KeyUp(code)
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use super::*;
    use winit::event::ElementState;
    use winit::keyboard::KeyCode;

    /// winit's key code names follow the DOM `code` values.
    pub fn key_code_name(code: KeyCode) -> String {
        format!("{code:?}")
    }

    pub fn key_to_input(code: KeyCode, state: ElementState) -> InputEvent {
        let name = key_code_name(code);
        match state {
            ElementState::Pressed => InputEvent::KeyDown(name),
            ElementState::Released => InputEvent::KeyUp(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_keys_are_not_pressed() {
        let input = InputState::new();
        for code in ["KeyW", "Space", "", "NotAKey"] {
            assert!(!input.is_key_pressed(code));
        }
    }

    #[test]
    fn last_transition_wins() {
        let mut input = InputState::new();
        input.process_event(&InputEvent::KeyDown("KeyW".into()));
        input.process_event(&InputEvent::KeyDown("KeyW".into()));
        assert!(input.is_key_pressed("KeyW"));
        input.process_event(&InputEvent::KeyUp("KeyW".into()));
        assert!(!input.is_key_pressed("KeyW"));
        input.process_event(&InputEvent::KeyUp("ArrowLeft".into()));
        assert!(!input.is_key_pressed("ArrowLeft"));
    }

    #[test]
    fn focus_loss_and_hiding_release_everything() {
        let mut input = InputState::new();
        input.set_key("ArrowLeft", true);
        input.process_event(&InputEvent::VisibilityChanged { visible: true });
        assert!(input.is_key_pressed("ArrowLeft"));
        input.process_event(&InputEvent::VisibilityChanged { visible: false });
        assert!(!input.is_key_pressed("ArrowLeft"));

        input.set_key("Space", true);
        input.process_event(&InputEvent::FocusLost);
        assert!(!input.is_key_pressed("Space"));
    }

    #[test]
    fn processor_reads_bindings() {
        let processor = InputProcessor::default();
        let mut input = InputState::new();
        assert!(!processor.wants_to_start(&input));
        input.set_key("Space", true);
        input.set_key("ArrowRight", true);
        assert!(processor.wants_to_start(&input));
        assert!(processor.is_turning_right(&input));
        assert!(!processor.is_turning_left(&input));
        assert!(processor.is_game_key("ArrowUp"));
        assert!(!processor.is_game_key("KeyQ"));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn native_codes_match_dom_codes() {
        use winit::keyboard::KeyCode;
        assert_eq!(native::key_code_name(KeyCode::KeyW), "KeyW");
        assert_eq!(native::key_code_name(KeyCode::ArrowLeft), "ArrowLeft");
        assert_eq!(native::key_code_name(KeyCode::Space), "Space");
    }
}
