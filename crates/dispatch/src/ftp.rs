//! Actions of an FTP session: raw access to the camera's SD card.
//!
//! Apart from `listRecords`, `syncSd` and `cleanSd`, these actions expect the
//! caller to have connected first.

use crate::dispatcher::{ActionDispatcher, HandlerFuture, Registration};
use crate::error::{ErrorKind, Result};
use crate::params::{Fields, fields, optional};
use camsync_device::{DeviceSession, FtpClient};
use camsync_mirror::MirrorStore;
use camsync_sync::SyncEngine;
use exn::ResultExt;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

pub struct FtpContext {
    engine: SyncEngine,
}
impl FtpContext {
    pub fn new(session: Arc<DeviceSession>, store: Arc<MirrorStore>) -> Self {
        Self { engine: SyncEngine::new(session, store) }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    fn session(&self) -> &DeviceSession {
        self.engine.session()
    }

    /// The `dir` parameter, defaulting to the camera's record directory.
    fn remote_dir(&self, params: &Fields) -> Result<String> {
        Ok(optional(params, "dir")?.unwrap_or_else(|| self.session().ftp_dir().to_string()))
    }

    /// The `dir` parameter, defaulting to `{log_dir}/{device}`.
    fn local_dir(&self, params: &Fields) -> Result<PathBuf> {
        match optional(params, "dir")? {
            Some(dir) => Ok(dir),
            None => self.engine.store().device_dir().or_raise(|| ErrorKind::InvalidParameter("dir".into())),
        }
    }
}

/// A dispatcher serving every FTP session action.
pub fn ftp_dispatcher(session: Arc<DeviceSession>, store: Arc<MirrorStore>) -> ActionDispatcher<FtpContext> {
    ActionDispatcher::new(FtpContext::new(session, store), ftp_actions())
}

pub fn ftp_actions() -> Vec<Registration<FtpContext>> {
    let sd_result = json!({
        "dir": "",
        "records": [{ "filename": "", "local_size": 0, "remote_size": 0, "action": "" }],
        "result": { "downloaded": 0, "skipped": 0, "deleted": 0, "mismatched": 0, "untouched": 0, "failed": 0 },
    });
    vec![
        Registration { name: "startFtpd", schema: json!({}), handler: start_ftpd },
        Registration {
            name: "cwd",
            schema: json!({ "parameters": { "dir": { "value": "", "require": false } }, "result": { "dir": "" } }),
            handler: cwd,
        },
        Registration {
            name: "list",
            schema: json!({
                "parameters": { "dir": { "value": "", "require": false } },
                "result": { "dir": "", "payload": [{ "name": "", "type": "-", "size": 0 }] },
            }),
            handler: list,
        },
        Registration {
            name: "listRecords",
            schema: json!({ "result": { "payload": [{ "filename": "", "filesize": 0 }] } }),
            handler: list_records,
        },
        Registration {
            name: "delete",
            schema: json!({
                "parameters": {
                    "dir": { "value": "", "require": false },
                    "filename": { "value": "", "require": false },
                    "filelist": { "value": [""], "require": false },
                },
                "result": { "dir": "", "filelist": [""] },
            }),
            handler: delete,
        },
        Registration {
            name: "syncSd",
            schema: json!({ "parameters": { "dir": { "value": "", "require": false } }, "result": sd_result.clone() }),
            handler: sync_sd,
        },
        Registration {
            name: "cleanSd",
            schema: json!({ "parameters": { "dir": { "value": "", "require": false } }, "result": sd_result }),
            handler: clean_sd,
        },
        Registration { name: "connect", schema: json!({}), handler: connect },
        Registration { name: "disconnect", schema: json!({}), handler: disconnect },
    ]
}

fn start_ftpd(ctx: &FtpContext, _: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        ctx.session().start_ftp_server().await.or_raise(ErrorKind::action("startFtpd"))?;
        Ok(Fields::new())
    })
}

fn connect(ctx: &FtpContext, _: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        ctx.session().ftp().connect().await.or_raise(ErrorKind::action("connect"))?;
        Ok(Fields::new())
    })
}

fn disconnect(ctx: &FtpContext, _: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        ctx.session().ftp().disconnect().await.or_raise(ErrorKind::action("disconnect"))?;
        Ok(Fields::new())
    })
}

fn cwd(ctx: &FtpContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let dir = ctx.remote_dir(&params)?;
        ctx.session().ftp().cwd(&dir).await.or_raise(ErrorKind::action("cwd"))?;
        fields(json!({ "dir": dir }))
    })
}

fn list(ctx: &FtpContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let dir = ctx.remote_dir(&params)?;
        let entries = ctx.session().ftp().list(&dir).await.or_raise(ErrorKind::action("list"))?;
        fields(json!({ "dir": dir, "payload": entries }))
    })
}

fn list_records(ctx: &FtpContext, _: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let records = ctx.session().catalog().list_sd_records().await.or_raise(ErrorKind::action("listRecords"))?;
        fields(json!({ "payload": records }))
    })
}

fn delete(ctx: &FtpContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let dir = ctx.remote_dir(&params)?;
        let filelist: Vec<String> = match optional::<String>(&params, "filename")? {
            Some(filename) => vec![filename],
            None => match optional(&params, "filelist")? {
                Some(filelist) => filelist,
                None => exn::bail!(ErrorKind::MissingParameter("filename".into())),
            },
        };
        ctx.session().ftp().delete_files(&dir, &filelist).await.or_raise(ErrorKind::action("delete"))?;
        tracing::info!(dir = %dir, count = filelist.len(), "deleted from card");
        fields(json!({ "dir": dir, "filelist": filelist }))
    })
}

fn sync_sd(ctx: &FtpContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let dir = ctx.local_dir(&params)?;
        let outcome = ctx.engine.sync_sd(&dir).await.or_raise(ErrorKind::action("syncSd"))?;
        let mut response = fields(outcome)?;
        response.insert("dir".into(), json!(dir));
        Ok(response)
    })
}

fn clean_sd(ctx: &FtpContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let dir = ctx.local_dir(&params)?;
        let outcome = ctx.engine.clean_sd(&dir).await.or_raise(ErrorKind::action("cleanSd"))?;
        let mut response = fields(outcome)?;
        response.insert("dir".into(), json!(dir));
        Ok(response)
    })
}
