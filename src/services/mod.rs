// Tab Positioner services
// Services provide cross-cutting functionality: checkpointed persistence and the settings engine.

pub mod checkpoint;
pub mod settings_engine;
