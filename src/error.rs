#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Provider,
    Input,
    Search,
    Crew,
    Internal,
}

impl ErrorCategory {
    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::Provider => "PROVIDER",
            ErrorCategory::Input => "INPUT",
            ErrorCategory::Search => "SEARCH",
            ErrorCategory::Crew => "CREW",
            ErrorCategory::Internal => "INTERNAL",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            ErrorCategory::Provider => {
                "Set provider credentials (GOOGLE_API_KEY or OPENAI_API_KEY) or pass --provider explicitly."
            }
            ErrorCategory::Input => "Run crewcast-cli --help and correct command arguments.",
            ErrorCategory::Search => {
                "Check network connectivity and retry with RUST_LOG=info for detailed search logs."
            }
            ErrorCategory::Crew => {
                "The model endpoint responded unexpectedly. Retry, or switch --model/--provider."
            }
            ErrorCategory::Internal => {
                "Retry with RUST_LOG=debug. If it persists, capture logs and open an issue."
            }
        }
    }
}

pub fn categorize_error(err: &anyhow::Error) -> ErrorCategory {
    let msg = format!("{err:#}").to_ascii_lowercase();

    if msg.contains("api_key")
        || msg.contains("api key")
        || msg.contains("no provider could be auto-detected")
        || msg.contains("provider")
    {
        return ErrorCategory::Provider;
    }

    if msg.contains("no topic provided")
        || msg.contains("invalid value")
        || msg.contains("unknown argument")
        || msg.contains("failed to read input")
        || msg.contains("profile")
        || msg.contains("input text")
    {
        return ErrorCategory::Input;
    }

    if msg.contains("search") || msg.contains("duckduckgo") {
        return ErrorCategory::Search;
    }

    if msg.contains("crew") || msg.contains("task") || msg.contains("model output") {
        return ErrorCategory::Crew;
    }

    ErrorCategory::Internal
}

pub fn format_cli_error(err: &anyhow::Error, show_sensitive_config: bool) -> String {
    let category = categorize_error(err);
    let rendered_error = render_error_message(err, show_sensitive_config);
    format!(
        "[{}] {}\nHint: {}",
        category.code(),
        rendered_error,
        category.hint()
    )
}

pub fn render_error_message(err: &anyhow::Error, show_sensitive_config: bool) -> String {
    if show_sensitive_config {
        format!("{err:#}")
    } else {
        redact_sensitive_text(&format!("{err:#}"))
    }
}

pub fn redact_sensitive_text(text: &str) -> String {
    redact_key_params(text)
}

/// The Gemini endpoint carries the API key as a `key=` URL query parameter.
/// Any `key=` token surviving into an error message is blanked out.
pub fn redact_key_params(text: &str) -> String {
    const KEY_PREFIX: &str = "key=";
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;

    while let Some(offset) = text[cursor..].find(KEY_PREFIX) {
        let start = cursor + offset;
        let value_start = start + KEY_PREFIX.len();
        out.push_str(&text[cursor..value_start]);

        let remainder = &text[value_start..];
        let end = remainder
            .find(|ch: char| {
                ch.is_whitespace()
                    || matches!(
                        ch,
                        '&' | '"' | '\'' | '(' | ')' | '[' | ']' | '{' | '}' | ',' | ';'
                    )
            })
            .unwrap_or(remainder.len());
        if end > 0 {
            out.push_str("[REDACTED]");
        }
        cursor = value_start + end;
    }

    out.push_str(&text[cursor..]);
    out
}
