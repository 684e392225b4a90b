/// Blocking user notices
///
/// The native message box stands in for a browser `alert`: the user has
/// to dismiss it, then the window carries on where it was.

use rfd::{AsyncMessageDialog, MessageButtons, MessageLevel};

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Compress pressed with nothing selected
    MissingInput,
    /// The compressor rejected the image
    CompressionFailed,
    /// Upload or reset pressed while a compression runs
    Busy,
    /// The picked file could not be read
    ReadFailed(String),
    /// The download could not be written
    SaveFailed(String),
}

impl Notice {
    /// Notices for session errors the user can act on; internal ones map to `None`
    pub fn from_session_error(err: &SessionError) -> Option<Self> {
        match err {
            SessionError::MissingInput => Some(Notice::MissingInput),
            SessionError::Busy => Some(Notice::Busy),
            SessionError::IllegalTransition { .. } | SessionError::StaleCompletion { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notice::MissingInput => "Upload image first".to_string(),
            Notice::CompressionFailed => "Compression failed".to_string(),
            Notice::Busy => "Please wait for the current compression to finish".to_string(),
            Notice::ReadFailed(detail) => format!("Could not read the image: {}", detail),
            Notice::SaveFailed(detail) => format!("Could not save the image: {}", detail),
        }
    }

    fn level(&self) -> MessageLevel {
        match self {
            Notice::MissingInput | Notice::Busy => MessageLevel::Info,
            Notice::CompressionFailed | Notice::ReadFailed(_) | Notice::SaveFailed(_) => {
                MessageLevel::Error
            }
        }
    }

    /// Show the notice and wait for the user to dismiss it
    pub async fn show(self) {
        AsyncMessageDialog::new()
            .set_title("ImgCrush")
            .set_description(self.message())
            .set_level(self.level())
            .set_buttons(MessageButtons::Ok)
            .show()
            .await;
    }
}
