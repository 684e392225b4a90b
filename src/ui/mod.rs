/// Widgets and views
///
/// - The three stage cards and the full-size preview (stages.rs)
/// - The history side panel (history.rs)
/// - A generic modal overlay (modal.rs)

pub mod history;
pub mod modal;
pub mod stages;
