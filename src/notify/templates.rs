//! Plain-text message templates for WhatsApp notifications.

use super::{NotificationKind, NotificationPayload};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};

/// Formats a date the way it appears in messages, e.g. `10 January 2024`.
#[must_use]
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d %B %Y").to_string()
}

/// Converts a stored phone number to a WhatsApp chat id.
///
/// Non-digits are stripped. A leading `0` is replaced by the `62` country code; numbers
/// already starting with `62` are kept. Anything else is rejected.
pub fn whatsapp_chat_id(number: &str) -> Result<String> {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();

    // The subscriber part after the trunk or country prefix must not be empty.
    let subscriber = digits
        .strip_prefix('0')
        .or_else(|| digits.strip_prefix("62"))
        .filter(|rest| !rest.is_empty());
    if let Some(rest) = subscriber {
        return Ok(format!("62{rest}@c.us"));
    }

    Err(Error::Notification {
        message: format!("Invalid phone number format: {number}"),
    })
}

fn due_text(payload: &NotificationPayload) -> String {
    payload
        .due_date
        .map_or_else(|| "-".to_string(), format_date)
}

/// Renders the message body for a notification.
#[must_use]
pub fn render_message(
    kind: NotificationKind,
    payload: &NotificationPayload,
    app_name: &str,
    support_contact: &str,
) -> String {
    let item = if payload.item_name.is_empty() {
        "item"
    } else {
        payload.item_name.as_str()
    };
    let date = format_date(payload.date_borrow);
    let due = due_text(payload);

    let body = match kind {
        NotificationKind::BorrowRequested => format!(
            "*Borrow Confirmation*\n\
             You have successfully requested *{item}* from our warehouse. \
             Please wait for admin confirmation.\n\
             Borrow date: {date}\nDue date: {due}"
        ),
        NotificationKind::BorrowRequestReceived => format!(
            "*Borrow Request*\n\
             You have an incoming borrow request from *{}* for *{item}*. \
             Please confirm the request.\n\
             Borrow date: {date}\nDue date: {due}",
            payload.borrower_name
        ),
        NotificationKind::BorrowApproved => format!(
            "Your borrowing request for the item *{item}* has been *approved* by the admin. \
             Please return it by the due date: {due}."
        ),
        NotificationKind::BorrowRejected => format!(
            "We regret to inform you that your borrowing request for the item *{item}* \
             has been *rejected* by the admin."
        ),
        NotificationKind::ItemReturned => match payload.late_days {
            Some(days) if days > 0 => format!(
                "We have received *{item}* back. The return was {days} day(s) past the \
                 due date of {due}."
            ),
            _ => format!("We have received *{item}* back on time. Thank you!"),
        },
    };

    format!(
        "Hello {},\n\n{body}\n\n{app_name} | {support_contact}",
        payload.recipient_name
    )
}
