//! `nakshatra kundli`: collect birth details and hand them to the backend

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::api::AstrologyBackend;
use crate::cli::ask::message_content;
use crate::cli::{format_reply, terminal_width, CliContext};
use crate::core::birth::{format_birth_details, BirthDetails, BirthForm, DEFAULT_TIMEZONE};
use crate::core::conversation::Conversation;
use crate::ui::chat_loop::run_chat;

#[derive(clap::Args, Debug, Clone, Default)]
pub struct KundliArgs {
    /// Birth year (e.g., 1990)
    #[arg(long)]
    pub year: Option<String>,
    /// Birth month, 1-12
    #[arg(long)]
    pub month: Option<String>,
    /// Day of the month
    #[arg(long)]
    pub date: Option<String>,
    /// Hour of birth, 0-23
    #[arg(long)]
    pub hours: Option<String>,
    /// Minute of birth
    #[arg(long)]
    pub minutes: Option<String>,
    /// Second of birth
    #[arg(long)]
    pub seconds: Option<String>,
    /// Latitude in decimal degrees, north positive
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: Option<String>,
    /// Longitude in decimal degrees, east positive
    #[arg(long, allow_hyphen_values = true)]
    pub longitude: Option<String>,
    /// IANA timezone of the birth place
    #[arg(long, value_name = "TZ")]
    pub timezone: Option<String>,
    /// Place name shown in the summary (not sent to the backend)
    #[arg(long)]
    pub place: Option<String>,
    /// Print the reading to stdout instead of opening the chat
    #[arg(long)]
    pub no_chat: bool,
}

impl KundliArgs {
    pub fn into_form(self) -> BirthForm {
        BirthForm {
            year: self.year.unwrap_or_default(),
            month: self.month.unwrap_or_default(),
            date: self.date.unwrap_or_default(),
            hours: self.hours.unwrap_or_default(),
            minutes: self.minutes.unwrap_or_default(),
            seconds: self.seconds.unwrap_or_default(),
            latitude: self.latitude.unwrap_or_default(),
            longitude: self.longitude.unwrap_or_default(),
            timezone: self.timezone.unwrap_or_default(),
            place: self.place.unwrap_or_default(),
        }
    }
}

fn field_label(name: &str) -> &'static str {
    match name {
        "year" => "Year of birth",
        "month" => "Month (1-12)",
        "date" => "Day of month",
        "hours" => "Hour (0-23)",
        "minutes" => "Minutes",
        "seconds" => "Seconds",
        "latitude" => "Latitude (e.g., 28.6139)",
        "longitude" => "Longitude (e.g., 77.2090)",
        _ => "Value",
    }
}

/// Ask for every blank field on `output`, reading answers from `input`.
/// Stops quietly at end of input so validation can report what is missing.
pub fn prompt_missing_fields<R: BufRead, W: Write>(
    form: &mut BirthForm,
    input: &mut R,
    output: &mut W,
) -> io::Result<()> {
    for name in form.missing_fields() {
        write!(output, "{}: ", field_label(name))?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            writeln!(output)?;
            return Ok(());
        }
        if let Some(slot) = form.field_mut(name) {
            *slot = answer.trim().to_string();
        }
    }

    if form.timezone.trim().is_empty() {
        write!(output, "Timezone [{DEFAULT_TIMEZONE}]: ")?;
        output.flush()?;
        let mut answer = String::new();
        if input.read_line(&mut answer)? > 0 {
            form.timezone = answer.trim().to_string();
        }
    }
    Ok(())
}

pub async fn run_kundli(args: KundliArgs, ctx: &CliContext) -> Result<(), Box<dyn Error>> {
    let no_chat = args.no_chat;
    let mut form = args.into_form();
    if !form.missing_fields().is_empty() {
        let stdin = io::stdin();
        prompt_missing_fields(&mut form, &mut stdin.lock(), &mut io::stdout())?;
    }

    let details = match form.into_details() {
        Ok(details) => details,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let mut conversation = Conversation::open(ctx.session()?)?;
    if !no_chat {
        return run_chat(ctx.chat_options(conversation, Some(details))).await;
    }

    println!("{}", format_birth_details(&details));
    println!();
    let backend = ctx.backend();
    let reply = fetch_reading(
        &mut conversation,
        backend.as_ref(),
        &details,
        ctx.config.request_timeout(),
    )
    .await
    .unwrap_or_default();
    for line in format_reply(&reply, ctx.config.markdown_enabled(), terminal_width()) {
        println!("{line}");
    }
    Ok(())
}

/// Submit `details` and return the reading bubble, or `None` when a request
/// for this conversation is already in flight.
pub(crate) async fn fetch_reading(
    conversation: &mut Conversation,
    backend: &dyn AstrologyBackend,
    details: &BirthDetails,
    timeout: Duration,
) -> Option<String> {
    let id = conversation
        .submit_birth_details(backend, details, timeout)
        .await?;
    conversation.mark_seen(&id);
    Some(message_content(conversation, &id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn prompts_only_for_blank_fields() {
        let mut form = KundliArgs {
            year: Some("1990".into()),
            month: Some("1".into()),
            date: Some("15".into()),
            hours: Some("6".into()),
            minutes: Some("30".into()),
            seconds: Some("0".into()),
            ..Default::default()
        }
        .into_form();

        let mut input = Cursor::new("28.6139\n77.2090\n\n");
        let mut output = Vec::new();
        prompt_missing_fields(&mut form, &mut input, &mut output).expect("prompt");

        let shown = String::from_utf8(output).expect("utf8");
        assert!(shown.contains("Latitude"));
        assert!(shown.contains("Longitude"));
        assert!(shown.contains("Timezone [Asia/Kolkata]"));
        assert!(!shown.contains("Year of birth"));

        let details = form.into_details().expect("complete form");
        assert_eq!(details.latitude, 28.6139);
        assert_eq!(details.longitude, 77.209);
        assert_eq!(details.timezone, DEFAULT_TIMEZONE);
    }

    #[test]
    fn end_of_input_leaves_fields_blank() {
        let mut form = BirthForm::default();
        let mut input = Cursor::new("2001\n");
        let mut output = Vec::new();
        prompt_missing_fields(&mut form, &mut input, &mut output).expect("prompt");

        assert_eq!(form.year, "2001");
        assert_eq!(form.month, "");
        assert!(form.into_details().is_err());
    }

    #[test]
    fn flags_map_onto_the_form() {
        let form = KundliArgs {
            longitude: Some("-0.1276".into()),
            timezone: Some("Europe/London".into()),
            place: Some("London".into()),
            ..Default::default()
        }
        .into_form();
        assert_eq!(form.longitude, "-0.1276");
        assert_eq!(form.timezone, "Europe/London");
        assert_eq!(form.place, "London");
        assert!(form.missing_fields().contains(&"latitude"));
    }

    #[tokio::test]
    async fn reading_replaces_the_previous_transcript() {
        use crate::api::BackendClient;
        use crate::core::message::{ChatMessage, MessageId};
        use crate::core::session::{SessionId, SessionStore};
        use crate::core::storage::MemoryStorage;
        use crate::utils::test_utils::{spawn_fake_backend, FakeBackend};
        use std::sync::Arc;

        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        let sid = SessionId::new("k-1");
        store
            .save_messages(&sid, &[ChatMessage::user(MessageId::new("1"), "old question")])
            .expect("seed");
        let mut conversation = Conversation::open(store.context(sid.clone())).expect("open");
        let backend = BackendClient::new(spawn_fake_backend(FakeBackend::default()).await);
        let details = KundliArgs {
            year: Some("1990".into()),
            month: Some("1".into()),
            date: Some("15".into()),
            hours: Some("6".into()),
            minutes: Some("30".into()),
            seconds: Some("0".into()),
            latitude: Some("28.6139".into()),
            longitude: Some("77.2090".into()),
            ..Default::default()
        }
        .into_form()
        .into_details()
        .expect("valid details");

        let reply = fetch_reading(&mut conversation, &backend, &details, Duration::from_secs(5))
            .await
            .expect("submitted");

        assert_eq!(reply, "Kundli for 1990-1-15");
        let stored = store.load_messages(&sid).expect("load");
        assert_eq!(stored.len(), 2);
        assert!(!stored.iter().any(|m| m.content == "old question"));
    }
}
