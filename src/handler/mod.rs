mod auto;
mod help;
mod ping;
mod translate;
mod usage;

use std::{borrow::Cow, sync::Arc};

use spdlog::prelude::*;

use crate::{
    cmd::Command,
    pipeline::{FailureKind, Outcome},
    platform::MessageEvent,
    InstanceState,
};

pub struct Request {
    state: Arc<InstanceState>,
    event: MessageEvent,
    kind: RequestKind,
}

enum RequestKind {
    NewMessage,
    Command(Command),
}

impl Request {
    pub fn new_message(state: Arc<InstanceState>, event: MessageEvent) -> Self {
        Self {
            state,
            event,
            kind: RequestKind::NewMessage,
        }
    }

    pub fn new_command(state: Arc<InstanceState>, event: MessageEvent, cmd: Command) -> Self {
        Self {
            state,
            event,
            kind: RequestKind::Command(cmd),
        }
    }

    pub fn state(&self) -> &InstanceState {
        &self.state
    }

    pub fn event(&self) -> &MessageEvent {
        &self.event
    }
}

pub enum ResponseKind<'a> {
    Nothing,
    ReplyTo(Cow<'a, str>),
    NewMsg(Cow<'a, str>),
}

pub struct Response<'a> {
    kind: ResponseKind<'a>,
}

impl<'a> Response<'a> {
    pub fn nothing() -> Self {
        Self {
            kind: ResponseKind::Nothing,
        }
    }

    pub fn reply_to(text: impl Into<Cow<'a, str>>) -> Self {
        Self {
            kind: ResponseKind::ReplyTo(text.into()),
        }
    }

    pub fn new_msg(text: impl Into<Cow<'a, str>>) -> Self {
        Self {
            kind: ResponseKind::NewMsg(text.into()),
        }
    }
}

pub async fn handle(req: Request) {
    let req = &req;
    let (channel_id, msg_id) = (&req.event.channel_id, &req.event.message_id);

    let res = handle_kind(req).await;
    let (succeeded, Ok(resp) | Err(resp)) = (res.is_ok(), res);

    let (text, reply_to) = match resp.kind {
        ResponseKind::Nothing => return,
        ResponseKind::ReplyTo(text) => (text, Some(msg_id.as_str())),
        ResponseKind::NewMsg(text) => (text, None),
    };
    let text = if succeeded {
        text.into_owned()
    } else {
        format!("⚠️ {text}")
    };

    if let Err(err) = req.state.platform.send_notice(channel_id, &text, reply_to).await {
        error!("failed to send response. channel id '{channel_id}', err: '{err}'");
    }
}

async fn handle_kind(req: &Request) -> Result<Response<'_>, Response<'_>> {
    match &req.kind {
        RequestKind::NewMessage => handle_new_message(req).await,
        RequestKind::Command(cmd) => handle_command(req, cmd).await,
    }
}

async fn handle_new_message(req: &Request) -> Result<Response<'_>, Response<'_>> {
    trace!(
        "new message. channel id '{}', msg id '{}'",
        req.event.channel_id,
        req.event.message_id
    );

    match req.state.pipeline.run(&req.event).await {
        Outcome::Failed(kind) => Err(Response::reply_to(failure_notice(kind))),
        Outcome::Filtered(_) | Outcome::Done { .. } => Ok(Response::nothing()),
    }
}

async fn handle_command<'a>(
    req: &'a Request,
    cmd: &'a Command,
) -> Result<Response<'a>, Response<'a>> {
    match cmd {
        Command::Ping => ping::handle(req).await,
        Command::Help => help::handle(req).await,
        Command::Privacy => help::privacy(req).await,
        Command::Languages => help::languages(req).await,
        Command::Usage => usage::handle(req).await,
        Command::Translate(arg) => translate::handle(req, arg).await,
        Command::AutoTranslate(arg) => auto::handle(req, arg).await,
    }
}

fn failure_notice(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::UnsupportedLanguage => {
            "Couldn't auto-translate: your stored language is no longer supported. \
             Pick a new one with /autotranslate."
        }
        FailureKind::QuotaExceeded => {
            "Couldn't auto-translate: the translation quota is exhausted for this period."
        }
        FailureKind::ServiceUnavailable => {
            "Couldn't auto-translate: the translation service is unavailable right now."
        }
        FailureKind::RelayUnavailable => {
            "Couldn't re-post the translation. Your original message is untouched."
        }
        FailureKind::Store => "Couldn't auto-translate: internal storage error.",
    }
}
