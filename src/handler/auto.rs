use spdlog::prelude::*;

use crate::{
    handler::{Request, Response},
    lang::Language,
    store::PreferenceError,
};

pub async fn handle<'a>(req: &'a Request, arg: &'a str) -> Result<Response<'a>, Response<'a>> {
    let arg = arg.trim();
    let language = if arg.is_empty() {
        None
    } else {
        Some(Language::from_code(arg).map_err(|err| {
            Response::reply_to(format!("{err}. Send /languages for the list."))
        })?)
    };

    let user_id = &req.event().author_id;
    let (pref, enabled) = req
        .state()
        .prefs
        .toggle(user_id, language)
        .await
        .map_err(|err| match err {
            PreferenceError::LanguageRequired => Response::reply_to(
                "Pick a target language to turn auto-translation on, e.g. /autotranslate DE",
            ),
            PreferenceError::Store(err) => {
                error!("preference toggle failed. user id '{user_id}', err: '{err}'");
                Response::reply_to("Internal storage error, try again later.")
            }
        })?;

    info!(
        "user '{user_id}' turned auto-translation {}",
        if enabled { "on" } else { "off" }
    );

    Ok(Response::reply_to(if enabled {
        format!(
            "Auto-translation to {} ({}) is on. Your new messages will be re-posted \
             translated, under your name. Send /autotranslate again to turn it off.",
            pref.language.name(),
            pref.language.code()
        )
    } else {
        "Auto-translation is off.".to_owned()
    }))
}
