use std::fmt::Write;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::lang::{get_string, get_string_with};
use crate::models::{InProgressRecord, InProgressRow, Reengagement};

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Zone the viewer reads dates in: their own when it names a known zone, else `fallback`.
pub fn viewer_timezone(timezone: Option<&str>, fallback: Tz) -> Tz {
    timezone
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(fallback)
}

pub fn short_datetime(time: DateTime<Utc>, tz: Tz) -> String {
    time.with_timezone(&tz)
        .format(&get_string("strftimedatetimeshort"))
        .to_string()
}

fn notice_box(message: &str) -> String {
    format!(
        "<div class=\"box generalbox\">{}</div>\n",
        escape_html(message)
    )
}

/// Renders the in-progress listing shown to users who can edit the activity.
///
/// `rows` must already be in listing order and every time is shown in the
/// viewer's zone. An email time column is only added for activities that
/// send scheduled reminders; its cell stays empty once more than
/// `remindercount` emails went out. Completed rows have an empty completion
/// cell.
pub fn render_status(reengagement: &Reengagement, rows: &[InProgressRow], viewer_tz: Tz) -> String {
    if rows.is_empty() {
        return notice_box(&get_string("noreengagementsinprogress"));
    }

    let show_email_time = reengagement.emailuser.shows_email_time();
    let mut output = String::new();

    let _ = writeln!(output, "<table class=\"reengagementlist\">");
    let _ = write!(output, "<tr><th>{}</th>", get_string("user"));
    if show_email_time {
        let _ = write!(output, "<th>{}</th>", get_string("emailtime"));
    }
    let _ = write!(output, "<th>{}</th>", get_string("completiontime"));
    let _ = writeln!(output, "</tr>");

    for row in rows {
        let record = &row.record;
        let _ = write!(output, "<tr><td>{}</td>", escape_html(&row.fullname()));

        if show_email_time {
            if record.emailsent > reengagement.remindercount {
                let _ = write!(output, "<td></td>");
            } else {
                let _ = write!(
                    output,
                    "<td>{}</td>",
                    short_datetime(record.emailtime, viewer_tz)
                );
            }
        }

        if record.completed {
            let _ = write!(output, "<td></td>");
        } else {
            let _ = write!(
                output,
                "<td>{}</td>",
                short_datetime(record.completiontime, viewer_tz)
            );
        }
        let _ = writeln!(output, "</tr>");
    }

    let _ = writeln!(output, "</table>");
    output
}

/// The current user's own progress through the activity.
pub fn render_checkstart(record: &InProgressRecord, viewer_tz: Tz) -> String {
    if record.completed {
        notice_box(&get_string("reengagementcompleted"))
    } else {
        let when = short_datetime(record.completiontime, viewer_tz);
        notice_box(&get_string_with("reengagementinprogress", &when))
    }
}

pub fn render_page(title: &str, heading: &str, body: &str) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html>");
    let _ = writeln!(output, "<head><title>{}</title></head>", escape_html(title));
    let _ = writeln!(output, "<body>");
    let _ = writeln!(output, "<h1>{}</h1>", escape_html(heading));
    let _ = write!(output, "{body}");
    let _ = writeln!(output, "</body>");
    let _ = writeln!(output, "</html>");
    output
}

pub fn render_error_page(key: &str, message: &str) -> String {
    let body = format!(
        "<div class=\"errorbox\" data-key=\"{}\"><p class=\"errormessage\">{}</p></div>\n",
        escape_html(key),
        escape_html(message)
    );
    render_page(&get_string("modulename"), &get_string("modulename"), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailUserMode;
    use chrono::TimeZone;
    use rstest::rstest;

    fn activity(emailuser: EmailUserMode, remindercount: i32) -> Reengagement {
        Reengagement {
            id: 1,
            course: 1,
            name: "Come back".to_string(),
            duration: 3600,
            emaildelay: 600,
            emailuser,
            remindercount,
        }
    }

    fn row(firstname: &str, completed: bool, emailsent: i32) -> InProgressRow {
        InProgressRow {
            record: InProgressRecord {
                id: 1,
                reengagement: 1,
                userid: 7,
                completiontime: Utc.with_ymd_and_hms(2026, 2, 3, 14, 5, 0).unwrap(),
                completed,
                emailsent,
                emailtime: Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap(),
            },
            firstname: firstname.to_string(),
            lastname: "Lee".to_string(),
        }
    }

    #[rstest]
    #[case::never(EmailUserMode::Never, false)]
    #[case::completion(EmailUserMode::Completion, false)]
    #[case::scheduled(EmailUserMode::Time, true)]
    fn email_column_follows_mode(#[case] mode: EmailUserMode, #[case] shown: bool) {
        let html = render_status(&activity(mode, 1), &[row("Avery", false, 0)], Tz::UTC);
        assert_eq!(html.contains("<th>Email time</th>"), shown);
        assert!(html.contains("<th>Completion time</th>"));
    }

    #[test]
    fn empty_listing_is_only_a_notice() {
        let html = render_status(&activity(EmailUserMode::Time, 1), &[], Tz::UTC);
        assert_eq!(
            html,
            "<div class=\"box generalbox\">No reengagements in progress</div>\n"
        );
        assert!(!html.contains("<table"));
    }

    #[test]
    fn sent_reminders_blank_the_email_cell() {
        let html = render_status(&activity(EmailUserMode::Time, 2), &[row("Avery", false, 3)], Tz::UTC);
        assert!(html.contains("<tr><td>Avery Lee</td><td></td><td>03/02/26, 14:05</td></tr>"));
    }

    #[test]
    fn pending_reminders_show_email_time() {
        let html = render_status(&activity(EmailUserMode::Time, 2), &[row("Avery", false, 2)], Tz::UTC);
        assert!(html.contains("<tr><td>Avery Lee</td><td>01/02/26, 09:30</td><td>03/02/26, 14:05</td></tr>"));
    }

    #[test]
    fn completed_rows_blank_the_completion_cell() {
        let html = render_status(&activity(EmailUserMode::Never, 1), &[row("Avery", true, 0)], Tz::UTC);
        assert!(html.contains("<tr><td>Avery Lee</td><td></td></tr>"));
    }

    #[test]
    fn rows_keep_input_order_and_escape_names() {
        let rows = vec![row("<b>Zed</b>", false, 0), row("Amy", false, 0)];
        let html = render_status(&activity(EmailUserMode::Never, 1), &rows, Tz::UTC);
        let zed = html.find("&lt;b&gt;Zed&lt;/b&gt; Lee").unwrap();
        let amy = html.find("Amy Lee").unwrap();
        assert!(zed < amy);
    }

    #[test]
    fn viewer_timezone_falls_back_to_site() {
        assert_eq!(
            viewer_timezone(Some("Pacific/Auckland"), Tz::UTC),
            Tz::Pacific__Auckland
        );
        assert_eq!(viewer_timezone(Some("99"), Tz::UTC), Tz::UTC);
        assert_eq!(viewer_timezone(None, Tz::Europe__London), Tz::Europe__London);

        let time = Utc.with_ymd_and_hms(2026, 2, 3, 14, 5, 0).unwrap();
        assert_eq!(short_datetime(time, Tz::Pacific__Auckland), "04/02/26, 03:05");
    }

    #[test]
    fn listing_uses_one_zone_for_every_row() {
        let mut early = row("Avery", false, 0);
        early.record.completiontime = Utc.with_ymd_and_hms(2026, 2, 3, 10, 0, 0).unwrap();
        let mut late = row("Blake", false, 0);
        late.record.completiontime = Utc.with_ymd_and_hms(2026, 2, 3, 11, 0, 0).unwrap();

        let html = render_status(&activity(EmailUserMode::Never, 1), &[early, late], Tz::UTC);
        assert!(html.contains("<tr><td>Avery Lee</td><td>03/02/26, 10:00</td></tr>"));
        assert!(html.contains("<tr><td>Blake Lee</td><td>03/02/26, 11:00</td></tr>"));

        let html = render_status(
            &activity(EmailUserMode::Never, 1),
            &[row("Avery", false, 0)],
            Tz::Pacific__Auckland,
        );
        assert!(html.contains("<td>04/02/26, 03:05</td>"));
    }

    #[test]
    fn checkstart_reports_progress() {
        let in_progress = row("Avery", false, 0).record;
        assert!(render_checkstart(&in_progress, Tz::UTC)
            .contains("This activity will be marked complete on 03/02/26, 14:05."));

        let done = row("Avery", true, 0).record;
        assert!(render_checkstart(&done, Tz::UTC).contains("You have completed this activity."));
    }

    #[test]
    fn page_chrome_escapes_title() {
        let page = render_page("A & B", "Course", "<p>body</p>\n");
        assert!(page.contains("<title>A &amp; B</title>"));
        assert!(page.contains("<h1>Course</h1>"));
        assert!(page.contains("<p>body</p>"));
    }
}
