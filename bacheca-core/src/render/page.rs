use crate::state::{ActivityLog, Banner, SessionState};
use crate::utils::format_clock;

use super::{escape_html, render_messages, RenderOptions};

/// Tutto ciò che serve per disegnare la pagina completa.
#[derive(Debug, Clone, Copy)]
pub struct PageModel<'a> {
    pub session: &'a SessionState,
    pub log: &'a ActivityLog,
    pub banner: Option<&'a Banner>,
    /// Un invio è in corso: il pulsante è disabilitato.
    pub sending: bool,
}

/// Indicatore di connessione del canale realtime.
pub fn render_status(connected: bool) -> String {
    let (class, text) = if connected {
        ("connected", "Connected")
    } else {
        ("disconnected", "Disconnected")
    };
    format!(
        "<span class=\"status-dot {}\"></span><span class=\"status-text\">{}</span>",
        class, text
    )
}

pub fn render_banner(banner: Option<&Banner>) -> String {
    match banner {
        Some(b) => format!(
            "<div class=\"error-banner\"><span class=\"error-message\">{}</span></div>",
            escape_html(&b.text)
        ),
        None => String::new(),
    }
}

pub fn render_log(log: &ActivityLog, opts: &RenderOptions) -> String {
    log.entries()
        .map(|entry| match entry.at {
            Some(at) => format!(
                "<p class=\"log-entry {}\">[{}] {}</p>\n",
                entry.level.css_class(),
                format_clock(at, opts.offset),
                escape_html(&entry.text)
            ),
            None => format!("<p class=\"log-entry\">{}</p>\n", escape_html(&entry.text)),
        })
        .collect()
}

/// Pagina HTML autonoma con stato, banner, messaggi e log attività.
pub fn render_page(page: &PageModel<'_>, opts: &RenderOptions) -> String {
    let refresh = match opts.refresh_secs {
        Some(secs) => format!("<meta http-equiv=\"refresh\" content=\"{}\">\n", secs),
        None => String::new(),
    };
    let submit = if page.sending { "Sending..." } else { "Send Message" };

    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html>\n<head>\n<meta charset=\"utf-8\">\n{refresh}<title>Message Board</title>\n</head>\n<body>\n",
            "<header class=\"status\">{status}</header>\n",
            "{banner}\n",
            "<div class=\"submit-state\">{submit}</div>\n",
            "<section id=\"messagesContainer\">\n{messages}</section>\n",
            "<section id=\"activityLog\">\n{log}</section>\n",
            "</body>\n</html>\n",
        ),
        refresh = refresh,
        status = render_status(page.session.connected()),
        banner = render_banner(page.banner),
        submit = submit,
        messages = render_messages(page.session, opts),
        log = render_log(page.log, opts),
    )
}
