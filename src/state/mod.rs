/// State management module
///
/// This module handles all application state, including:
/// - Shared data structures (data.rs)
/// - Display handles and the slots that own them (handle.rs)
/// - The compression session state machine (session.rs)

pub mod data;
pub mod handle;
pub mod session;
