//! Scenario tests spanning the scene tree, events, transforms and layout
