#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Help,
    Privacy,
    Languages,
    Usage,
    Translate(String),
    AutoTranslate(String),
}

impl Command {
    /// Returns `None` for ordinary messages.
    pub fn parse(content: &str) -> Option<Self> {
        let rest = content.trim().strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        Some(match name.to_lowercase().as_str() {
            "ping" => Self::Ping,
            "help" | "start" => Self::Help,
            "privacy" => Self::Privacy,
            "languages" => Self::Languages,
            "usage" => Self::Usage,
            "translate" => Self::Translate(arg.to_owned()),
            "autotranslate" => Self::AutoTranslate(arg.to_owned()),
            _ => return None,
        })
    }
}
