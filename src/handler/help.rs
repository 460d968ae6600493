use std::fmt::Write;

use crate::{
    handler::{Request, Response},
    lang,
};

pub async fn handle<'a>(_req: &Request) -> Result<Response<'a>, Response<'a>> {
    Ok(Response::reply_to(
        "Translates messages on demand, or automatically in your name.\n\n\
         /translate <language> [+formal|-formal] <text> — translate some text\n\
         /autotranslate [language] — toggle auto-translation of your messages\n\
         /languages — supported target languages\n\
         /usage — translation quota used this period\n\
         /privacy — what this bot stores\n\n\
         With auto-translation on, each message you post is re-posted translated \
         under your name and avatar, and the original is deleted.",
    ))
}

pub async fn privacy<'a>(_req: &Request) -> Result<Response<'a>, Response<'a>> {
    Ok(Response::reply_to(
        "Stored: your user id with your chosen target language, and one relay \
         identity id per channel. Message contents are sent to the translation \
         service to produce the translation and are never stored or logged.",
    ))
}

pub async fn languages<'a>(_req: &Request) -> Result<Response<'a>, Response<'a>> {
    let mut list = String::from("Supported target languages:\n");
    for spec in lang::LANGUAGES {
        _ = writeln!(list, "{} — {}", spec.code, spec.name);
    }
    Ok(Response::new_msg(list))
}
