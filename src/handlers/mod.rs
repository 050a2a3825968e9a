// Tab Positioner policy handlers
// Handlers turn host events plus tracked state into move/activate decisions.

pub mod popup_creation;
pub mod tab_activation;
pub mod tab_creation;
pub mod tab_mover;
