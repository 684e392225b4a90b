use iced::widget::{button, column, container, image, row, scrollable, text, Column};
use iced::{Alignment, ContentFit, Element, Length};

use crate::state::data::{format_kb, format_percent, HistoryEntry};
use crate::state::session::Session;
use crate::Message;

const PANEL_WIDTH: f32 = 300.0;
const ENTRY_THUMB: f32 = 48.0;

/// Side panel listing past compressions, newest first
pub fn panel(session: &Session) -> Element<'_, Message> {
    let history = session.history();

    let body: Element<'_, Message> = if history.is_empty() {
        text("No history yet").size(13).into()
    } else {
        let entries: Vec<Element<'_, Message>> = history
            .iter()
            .enumerate()
            .map(|(index, entry)| entry_row(index, entry))
            .collect();

        scrollable(Column::with_children(entries).spacing(10))
            .height(Length::Fill)
            .into()
    };

    container(
        column![
            text(format!("Compression History ({})", history.len())).size(18),
            body
        ]
        .spacing(12),
    )
    .padding(16)
    .width(Length::Fixed(PANEL_WIDTH))
    .height(Length::Fill)
    .style(container::rounded_box)
    .into()
}

fn entry_row(index: usize, entry: &HistoryEntry) -> Element<'_, Message> {
    row![
        image(entry.handle.image())
            .content_fit(ContentFit::Cover)
            .width(Length::Fixed(ENTRY_THUMB))
            .height(Length::Fixed(ENTRY_THUMB)),
        column![
            text(&entry.name).size(13),
            text(format!(
                "{} saved · {}",
                format_percent(entry.percent_saved),
                format_kb(entry.compressed_size)
            ))
            .size(11),
            text(entry.completed_at.format("%H:%M:%S").to_string()).size(11),
        ]
        .spacing(2)
        .width(Length::Fill),
        button("Save")
            .on_press(Message::DownloadHistory(index))
            .padding([4, 8]),
    ]
    .spacing(8)
    .align_y(Alignment::Center)
    .into()
}
