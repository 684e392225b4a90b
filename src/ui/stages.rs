/// The three stage cards: upload, settings, result
use iced::widget::{button, column, container, image, mouse_area, row, slider, text, Space};
use iced::{Alignment, ContentFit, Element, Length};

use crate::state::data::{format_kb, format_percent};
use crate::state::session::Session;
use crate::Message;

/// Width of every stage card
const CARD_WIDTH: f32 = 320.0;
/// Side of the square thumbnail area inside a card
const THUMB_SIZE: f32 = 260.0;

fn card<'a>(title: &'a str, body: Element<'a, Message>) -> Element<'a, Message> {
    container(column![text(title).size(18), body].spacing(12))
        .padding(20)
        .width(Length::Fixed(CARD_WIDTH))
        .style(container::rounded_box)
        .into()
}

fn thumbnail<'a>(handle: image::Handle) -> Element<'a, Message> {
    image(handle)
        .content_fit(ContentFit::Contain)
        .width(Length::Fixed(THUMB_SIZE))
        .height(Length::Fixed(THUMB_SIZE))
        .into()
}

fn placeholder<'a>(label: &'a str) -> Element<'a, Message> {
    container(text(label).size(14))
        .width(Length::Fixed(THUMB_SIZE))
        .height(Length::Fixed(THUMB_SIZE))
        .center_x(Length::Fixed(THUMB_SIZE))
        .center_y(Length::Fixed(THUMB_SIZE))
        .style(container::bordered_box)
        .into()
}

/// Source preview and the file picker button
pub fn upload_card(session: &Session) -> Element<'_, Message> {
    let preview: Element<'_, Message> = match session.source() {
        Some(source) => column![
            thumbnail(source.handle.image()),
            text(&source.name).size(12),
        ]
        .spacing(6)
        .into(),
        None => placeholder("Select Image"),
    };

    // Picking is disabled while a job runs
    let pick = button("Choose Image")
        .on_press_maybe((!session.is_compressing()).then_some(Message::PickImage))
        .padding([6, 12]);

    card(
        "Upload Image",
        column![preview, pick]
            .spacing(12)
            .align_x(Alignment::Center)
            .into(),
    )
}

/// Quality slider, sizes, and the compress/reset buttons
pub fn settings_card(session: &Session) -> Element<'_, Message> {
    let quality = session.quality();
    let busy = session.is_compressing();

    let slider_row = row![
        text("Quality").size(13).width(Length::Fixed(60.0)),
        slider(0.1..=1.0, quality.value(), Message::QualityChanged)
            .step(0.1_f32)
            .width(Length::Fill),
        text(quality.to_string()).size(13).width(Length::Fixed(30.0)),
    ]
    .spacing(8)
    .align_y(Alignment::Center);

    // Only celebrate an actual reduction
    let saved: Element<'_, Message> = match session.result().and_then(|r| r.percent_saved) {
        Some(p) if p > 0.0 => text(format!("🎉 {:.1}% size reduced", p)).size(14).into(),
        _ => Space::with_height(0).into(),
    };

    let compress = button(text(if busy { "Compressing..." } else { "Compress" }))
        .on_press_maybe((!busy).then_some(Message::Compress))
        .padding([8, 16]);

    let reset = button("Reset")
        .on_press_maybe((!busy).then_some(Message::Reset))
        .style(button::danger)
        .padding([8, 16]);

    card(
        "Compression Settings",
        column![
            slider_row,
            text(format!("Original: {}", format_kb(session.original_size()))).size(13),
            text(format!("Compressed: {}", format_kb(session.compressed_size()))).size(13),
            saved,
            row![compress, reset].spacing(8),
        ]
        .spacing(10)
        .into(),
    )
}

/// Compressed thumbnail (click for full size) and the download button
pub fn result_card(session: &Session) -> Element<'_, Message> {
    let body: Element<'_, Message> = match session.result() {
        Some(result) => column![
            // Click the thumbnail for the full-size preview
            mouse_area(thumbnail(result.handle.image())).on_press(Message::OpenPreview),
            text(&result.output_name).size(12),
            text(format!(
                "{} → {} ({} saved)",
                format_kb(result.original_size),
                format_kb(result.compressed_size),
                format_percent(result.percent_saved)
            ))
            .size(12),
            button("Download").on_press(Message::Download).padding([6, 12]),
        ]
        .spacing(8)
        .align_x(Alignment::Center)
        .into(),
        None => placeholder(if session.is_compressing() {
            "Compressing..."
        } else {
            "Nothing compressed yet"
        }),
    };

    card("Compressed Image", body)
}

/// Full-size view of the current result, shown inside the modal
pub fn preview(session: &Session) -> Element<'_, Message> {
    let picture: Element<'_, Message> = match session.result() {
        Some(result) => image(result.handle.image())
            .content_fit(ContentFit::Contain)
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
        None => text("Nothing to preview").into(),
    };

    container(
        column![
            picture,
            button("Close").on_press(Message::ClosePreview).padding([6, 12]),
        ]
        .spacing(12)
        .align_x(Alignment::Center),
    )
    .padding(20)
    .width(Length::Fill)
    .height(Length::Fill)
    .max_width(900.0)
    .max_height(680.0)
    .style(container::rounded_box)
    .into()
}
