use tokio::time;

use crate::{
    config,
    handler::{Request, Response},
};

pub async fn handle<'a>(req: &'a Request) -> Result<Response<'a>, Response<'a>> {
    let usage = time::timeout(config::TRANSLATE_TIMEOUT, req.state().translator.usage())
        .await
        .map_err(|_| Response::reply_to("The translation service timed out, try again later."))?
        .map_err(|err| Response::reply_to(format!("Failed to query usage.\n\n{err}")))?;

    let percent = if usage.limit == 0 {
        100
    } else {
        usage.used * 100 / usage.limit
    };

    Ok(Response::reply_to(format!(
        "Translated {} of {} characters this period ({percent}%).",
        usage.used, usage.limit
    )))
}
