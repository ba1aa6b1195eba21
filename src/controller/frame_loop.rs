use std::cell::RefCell;
use std::rc::Rc;

use crate::controller::game::Game;
use crate::controller::input::InputState;
use crate::view::frame::Frame;

/// Slack allowed when deciding whether a frame is due, in milliseconds.
/// Display refresh rarely lines up with the target interval exactly.
const PACING_EPSILON_MS: f64 = 5.0;

/// Throttles a display-rate callback down to the target frame rate.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval_ms: f64,
    last: Option<f64>,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        Self {
            interval_ms: 1000.0 / fps.max(1) as f64,
            last: None,
        }
    }

    /// True when a frame should run at `now_ms`; records it as the last one.
    pub fn ready(&mut self, now_ms: f64) -> bool {
        match self.last {
            Some(last) if now_ms - last < self.interval_ms - PACING_EPSILON_MS => false,
            _ => {
                self.last = Some(now_ms);
                true
            }
        }
    }

    /// When the next frame is due, or `None` before the first one.
    pub fn next_due_ms(&self) -> Option<f64> {
        self.last.map(|last| last + self.interval_ms)
    }
}

/// Ties the game to the shared key state and the pacer. Event listeners
/// write into `input_state`; the display callback calls [`Self::tick`].
pub struct FrameLoopContext {
    pub game: Game,
    pub input_state: Rc<RefCell<InputState>>,
    pub pacer: FramePacer,
}

impl FrameLoopContext {
    pub fn new(game: Game, input_state: Rc<RefCell<InputState>>) -> Self {
        let pacer = FramePacer::new(game.config().target_fps);
        Self { game, input_state, pacer }
    }

    /// Run one game frame if one is due.
    pub fn tick(&mut self, now_ms: f64) -> Option<Frame> {
        if !self.pacer.ready(now_ms) {
            return None;
        }
        let input = self.input_state.borrow();
        Some(self.game.update(&input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::controller::game::GameMode;
    use crate::controller::input::{InputEvent, KeyBindings};
    use crate::model::scene::test_assets;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn first_call_always_runs() {
        let mut pacer = FramePacer::new(30);
        assert!(pacer.next_due_ms().is_none());
        assert!(pacer.ready(12345.0));
        assert!((pacer.next_due_ms().unwrap() - (12345.0 + 1000.0 / 30.0)).abs() < 1e-9);
    }

    #[test]
    fn sixty_hertz_display_runs_every_other_refresh() {
        let mut pacer = FramePacer::new(30);
        let refresh = 1000.0 / 60.0;
        let ran: Vec<bool> = (0..8).map(|i| pacer.ready(i as f64 * refresh)).collect();
        assert_eq!(ran, vec![true, false, true, false, true, false, true, false]);
    }

    #[test]
    fn slightly_early_frames_still_run() {
        let mut pacer = FramePacer::new(30);
        pacer.ready(0.0);
        assert!(!pacer.ready(20.0));
        assert!(pacer.ready(30.0));
    }

    #[test]
    fn tick_reads_shared_input() {
        let game = Game::new(
            test_assets(),
            GameConfig::DEFAULT,
            KeyBindings::default(),
            800,
            600,
            &mut StdRng::seed_from_u64(5),
        );
        let input = Rc::new(RefCell::new(InputState::new()));
        let mut ctx = FrameLoopContext::new(game, Rc::clone(&input));

        assert!(ctx.tick(0.0).is_some());
        input.borrow_mut().process_event(&InputEvent::KeyDown("Space".into()));
        // not due yet, so the key is not seen
        assert!(ctx.tick(10.0).is_none());
        assert_eq!(ctx.game.mode(), GameMode::Title);

        assert!(ctx.tick(40.0).is_some());
        assert_eq!(ctx.game.mode(), GameMode::Playing);
        assert_eq!(ctx.game.frame_count(), 2);
    }
}
