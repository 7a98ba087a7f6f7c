pub mod guidance;
pub mod translation;
