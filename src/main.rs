use iced::widget::{button, column, container, row, text};
use iced::{Alignment, Element, Length, Pixels, Task, Theme};
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod compress;
mod config;
mod error;
mod logging;
mod notice;
mod state;
mod ui;

use compress::{Compressor, JpegCompressor};
use config::AppConfig;
use error::CompressError;
use notice::Notice;
use state::data::{format_kb, format_percent};
use state::session::{Outcome, Session, Ticket};

/// Extensions offered by the file picker
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff", "ico",
];

/// A file chosen in the picker, already read into memory
#[derive(Debug, Clone)]
pub struct PickedFile {
    name: String,
    bytes: Vec<u8>,
}

/// Main application state
struct ImgCrush {
    /// Source, settings, result and history
    session: Session,
    /// Does the actual pixel work off the UI thread
    compressor: Arc<dyn Compressor>,
    theme: Theme,
    /// One-line status shown under the cards
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// User clicked "Choose Image"
    PickImage,
    /// Picker closed; `Ok(None)` when cancelled
    ImagePicked(Result<Option<PickedFile>, String>),
    QualityChanged(f32),
    /// User clicked "Compress"
    Compress,
    /// Background compression finished
    Compressed(Ticket, Result<Vec<u8>, CompressError>),
    Reset,
    ToggleHistory,
    OpenPreview,
    ClosePreview,
    /// Save the current result
    Download,
    /// Save a history entry (0 = newest)
    DownloadHistory(usize),
    /// Save dialog closed; `Ok(None)` when cancelled
    Saved(Result<Option<PathBuf>, String>),
    NoticeDismissed,
}

impl ImgCrush {
    /// Create a new instance of the application
    fn new(config: AppConfig) -> (Self, Task<Message>) {
        let session = Session::new(config.quality());
        info!("🎨 ImgCrush ready (quality {})", session.quality());

        (
            ImgCrush {
                session,
                compressor: Arc::new(JpegCompressor::new()),
                theme: config.theme.theme(),
                status: "Ready. Choose an image to start.".to_string(),
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PickImage => Task::perform(pick_image(), Message::ImagePicked),
            Message::ImagePicked(Ok(Some(file))) => {
                let name = file.name.clone();
                match self.session.select_image(file.name, file.bytes) {
                    Ok(()) => {
                        self.status = format!("Loaded {}", name);
                        Task::none()
                    }
                    Err(err) => self.session_error(err),
                }
            }
            Message::ImagePicked(Ok(None)) => {
                debug!("image picker cancelled");
                Task::none()
            }
            Message::ImagePicked(Err(err)) => self.notify(Notice::ReadFailed(err)),
            Message::QualityChanged(value) => {
                self.session.set_quality(value);
                Task::none()
            }
            Message::Compress => match self.session.compress() {
                Ok(job) => {
                    debug!("phase now {:?}", self.session.phase());
                    self.status = "Compressing...".to_string();
                    // Hand the work to the blocking pool, keep the ticket to match the answer
                    let compressor = Arc::clone(&self.compressor);
                    let (ticket, input, options) = (job.ticket, job.input, job.options);
                    Task::perform(
                        async move {
                            let output = compress::run(compressor, input, options).await;
                            (ticket, output)
                        },
                        |(ticket, output)| Message::Compressed(ticket, output),
                    )
                }
                // The button is disabled while busy; a stray press is inert
                Err(error::SessionError::Busy) => {
                    warn!("compress ignored, already compressing");
                    Task::none()
                }
                Err(err) => self.session_error(err),
            },
            Message::Compressed(ticket, output) => match self.session.finish(ticket, output) {
                Ok(Outcome::Succeeded {
                    compressed_size,
                    percent_saved,
                }) => {
                    debug!(
                        "trail {:?}, {} live image buffers",
                        self.session.trail(),
                        self.session.live_handles()
                    );
                    self.status = format!(
                        "✅ Done, {} ({} saved)",
                        format_kb(compressed_size),
                        format_percent(percent_saved)
                    );
                    Task::none()
                }
                Ok(Outcome::Failed(_)) => {
                    self.status = "Compression failed".to_string();
                    self.notify(Notice::CompressionFailed)
                }
                Err(err) => self.session_error(err),
            },
            Message::Reset => match self.session.reset() {
                Ok(()) => {
                    debug!("{} live image buffers after reset", self.session.live_handles());
                    self.status = "Ready. Choose an image to start.".to_string();
                    Task::none()
                }
                Err(err) => self.session_error(err),
            },
            Message::ToggleHistory => {
                self.session.toggle_history_panel();
                Task::none()
            }
            Message::OpenPreview => {
                self.session.open_preview();
                Task::none()
            }
            Message::ClosePreview => {
                self.session.close_preview();
                Task::none()
            }
            Message::Download => match self.session.download() {
                Some((name, bytes)) => Task::perform(save_image(name, bytes), Message::Saved),
                None => Task::none(),
            },
            Message::DownloadHistory(index) => match self.session.history_download(index) {
                Some((name, bytes)) => Task::perform(save_image(name, bytes), Message::Saved),
                None => {
                    warn!("no history entry at {}", index);
                    Task::none()
                }
            },
            Message::Saved(Ok(Some(path))) => {
                info!("💾 saved {}", path.display());
                self.status = format!("Saved to {}", path.display());
                Task::none()
            }
            Message::Saved(Ok(None)) => {
                debug!("save dialog cancelled");
                Task::none()
            }
            Message::Saved(Err(err)) => self.notify(Notice::SaveFailed(err)),
            Message::NoticeDismissed => Task::none(),
        }
    }

    /// Surface a session error as a notice, or just log it if it is internal
    fn session_error(&self, err: error::SessionError) -> Task<Message> {
        match Notice::from_session_error(&err) {
            Some(notice) => self.notify(notice),
            None => {
                warn!("ignored: {}", err);
                Task::none()
            }
        }
    }

    fn notify(&self, notice: Notice) -> Task<Message> {
        warn!("notice: {}", notice.message());
        Task::perform(notice.show(), |()| Message::NoticeDismissed)
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let history_label = format!("History ({})", self.session.history().len());
        let header = row![
            text("ImgCrush").size(28).width(Length::Fill),
            button(text(history_label))
                .on_press(Message::ToggleHistory)
                .style(if self.session.history_visible() {
                    button::primary
                } else {
                    button::secondary
                })
                .padding([6, 12]),
        ]
        .align_y(Alignment::Center);

        let cards = iced_aw::Wrap::with_elements(vec![
            ui::stages::upload_card(&self.session),
            ui::stages::settings_card(&self.session),
            ui::stages::result_card(&self.session),
        ])
        .spacing(Pixels(20.0))
        .line_spacing(Pixels(20.0));

        let stage_area = column![container(cards).width(Length::Fill), text(&self.status).size(13)]
            .spacing(16)
            .width(Length::Fill);

        let body: Element<Message> = if self.session.history_visible() {
            row![stage_area, ui::history::panel(&self.session)]
                .spacing(16)
                .height(Length::Fill)
                .into()
        } else {
            stage_area.into()
        };

        let content = container(column![header, body].spacing(20).padding(24))
            .width(Length::Fill)
            .height(Length::Fill);

        if self.session.preview_open() {
            ui::modal::modal(content, ui::stages::preview(&self.session), Message::ClosePreview)
        } else {
            content.into()
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        self.theme.clone()
    }
}

fn main() -> iced::Result {
    let (config, config_error) = AppConfig::load();
    logging::init(&config.log_filter);

    info!("=== ImgCrush starting ===");
    if let Some(err) = config_error {
        warn!("⚠️  {}, using defaults", err);
    }

    let window_size = config.window_size();

    iced::application("ImgCrush", ImgCrush::update, ImgCrush::view)
        .theme(ImgCrush::theme)
        .window_size(window_size)
        .centered()
        .run_with(move || ImgCrush::new(config))
}

/// Show the native picker and read the chosen file
async fn pick_image() -> Result<Option<PickedFile>, String> {
    let Some(handle) = rfd::AsyncFileDialog::new()
        .set_title("Select Image")
        .add_filter("Images", IMAGE_EXTENSIONS)
        .pick_file()
        .await
    else {
        return Ok(None);
    };

    let name = handle.file_name();
    let bytes = tokio::fs::read(handle.path())
        .await
        .map_err(|e| format!("{}: {}", name, e))?;

    Ok(Some(PickedFile { name, bytes }))
}

/// Ask where to save `bytes` and write them there
async fn save_image(name: String, bytes: Bytes) -> Result<Option<PathBuf>, String> {
    let Some(handle) = rfd::AsyncFileDialog::new()
        .set_title("Save Compressed Image")
        .set_file_name(&name)
        .add_filter("JPEG", &["jpg", "jpeg"])
        .save_file()
        .await
    else {
        return Ok(None);
    };

    let path = handle.path().to_path_buf();
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| format!("{}: {}", path.display(), e))?;

    Ok(Some(path))
}
