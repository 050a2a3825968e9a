// Tab Positioner state managers
// Managers hold the stateful core: the checkpointed tab tracker.

pub mod tab_tracker;
