//! Foundation utilities shared by the scene and layout code
//!
//! Math aliases and rects, frame timing, and logger setup.

pub mod logging;
pub mod math;
pub mod time;
