// CONTROLLER: Input, game rules, and the frame loop
pub mod input;
pub mod camera_controller;
pub mod game;
pub mod frame_loop;

pub use input::{InputEvent, InputState, InputProcessor, KeyBindings};
pub use camera_controller::CameraController;
pub use game::{Game, GameMode};
pub use frame_loop::{FrameLoopContext, FramePacer};
