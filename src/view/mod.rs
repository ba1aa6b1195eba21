// VIEW: Frame recording and rendering
pub mod frame;
pub mod render;
pub mod gpu_init;

pub use frame::{rgb, Canvas, DrawCommand, Frame, Material, Overlay, TextItem};
pub use render::RenderState;
pub use gpu_init::{GpuContext, GpuError};
