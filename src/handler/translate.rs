use spdlog::prelude::*;
use tokio::time;

use crate::{
    config,
    handler::{Request, Response},
    lang::Language,
    translate::{Formality, TranslationRequest},
};

const FORMAT_HELP: &str = "format: /translate <language> [+formal|-formal] <text>";

pub async fn handle<'a>(req: &'a Request, arg: &'a str) -> Result<Response<'a>, Response<'a>> {
    let (language, formality, text) = parse_args(arg).map_err(Response::reply_to)?;

    let user_id = &req.event().author_id;
    debug!("user '{user_id}' requested a manual translation to '{language}'");

    let request = TranslationRequest {
        source_text: text.to_owned(),
        target_language: language,
        formality,
    };
    let result = time::timeout(config::TRANSLATE_TIMEOUT, req.state().translator.translate(request))
        .await
        .map_err(|_| Response::reply_to("The translation service timed out, try again later."))?
        .map_err(|err| {
            warn!("manual translation failed. user id '{user_id}', err: '{err}'");
            Response::reply_to(format!("Translation failed.\n\n{err}"))
        })?;

    Ok(Response::reply_to(result.translated_text))
}

fn parse_args(arg: &str) -> Result<(Language, Option<Formality>, &str), String> {
    let arg = arg.trim();
    let (code, rest) = arg.split_once(char::is_whitespace).unwrap_or((arg, ""));
    if code.is_empty() {
        return Err(FORMAT_HELP.to_owned());
    }

    let language = Language::from_code(code)
        .map_err(|err| format!("{err}. Send /languages for the list."))?;

    let rest = rest.trim();
    let (formality, text) = match rest.split_once(char::is_whitespace) {
        Some(("+formal", text)) => (Some(Formality::More), text.trim()),
        Some(("-formal", text)) => (Some(Formality::Less), text.trim()),
        _ => (None, rest),
    };

    if text.is_empty() {
        return Err(format!("Nothing to translate.\n\n{FORMAT_HELP}"));
    }

    Ok((language, formality, text))
}
