//! Actions of a record session: the camera's CGI API and the local mirror.

use crate::dispatcher::{ActionDispatcher, HandlerFuture, Registration};
use crate::error::{ErrorKind, Result};
use crate::params::{Fields, fields, optional, required};
use camsync_device::{DeviceSession, PageRequest};
use camsync_mirror::{MirrorStore, RecordDate};
use camsync_sync::{RecordRequest, SyncEngine};
use exn::ResultExt;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

pub struct RecordContext {
    engine: SyncEngine,
}
impl RecordContext {
    pub fn new(session: Arc<DeviceSession>, store: Arc<MirrorStore>) -> Self {
        Self { engine: SyncEngine::new(session, store) }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }
}

/// A dispatcher serving every record session action.
pub fn record_dispatcher(session: Arc<DeviceSession>, store: Arc<MirrorStore>) -> ActionDispatcher<RecordContext> {
    ActionDispatcher::new(RecordContext::new(session, store), record_actions())
}

pub fn record_actions() -> Vec<Registration<RecordContext>> {
    vec![
        Registration {
            name: "listRecords",
            schema: json!({
                "parameters": { "pars": { "value": { "PageIndex": 0 }, "require": false } },
                "result": {
                    "payload": {
                        "records": [{ "filename": "", "filesize": 0, "filetime": "" }],
                        "record_num0": 0, "PageIndex": 0, "PageSize": 100, "RecordCount": 0, "PageCount": 0,
                    },
                },
            }),
            handler: list_records,
        },
        Registration { name: "cancel", schema: json!({}), handler: cancel },
        Registration {
            name: "listCache",
            schema: json!({
                "parameters": {
                    "year": { "value": "", "require": false },
                    "month": { "value": "", "require": false },
                    "day": { "value": "", "require": false },
                },
                "result": { "dir": "", "records": [""], "dirs": [""] },
            }),
            handler: list_cache,
        },
        Registration {
            name: "downloadRecord",
            schema: json!({
                "parameters": {
                    "filename": { "value": "", "require": true },
                    "filepath": { "value": "", "require": false },
                },
                "result": { "filesize": 0, "filepath": "" },
            }),
            handler: download_record,
        },
        Registration {
            name: "deleteRecord",
            schema: json!({ "parameters": { "filename": { "value": "", "require": true } } }),
            handler: delete_record,
        },
        Registration {
            name: "syncRecord",
            schema: json!({
                "parameters": {
                    "filename": { "value": "", "require": true },
                    "filepath": { "value": "", "require": false },
                    "filesize": { "value": 0, "require": false },
                },
                "result": { "filesize": 0, "filepath": "", "status": "", "remote_deleted": false },
            }),
            handler: sync_record,
        },
        Registration {
            name: "downloadRecords",
            schema: json!({
                "parameters": { "records": { "value": [{ "filename": "" }], "require": true } },
                "result": { "records": [{ "filename": "", "filepath": "", "filesize": 0 }] },
            }),
            handler: download_records,
        },
        Registration {
            name: "deleteRecords",
            schema: json!({
                "parameters": { "records": { "value": [{ "filename": "" }], "require": true } },
                "result": { "records": [{ "filename": "", "deleted": false }] },
            }),
            handler: delete_records,
        },
        Registration {
            name: "syncRecords",
            schema: json!({
                "parameters": { "records": { "value": [{ "filename": "", "filesize": 0 }], "require": true } },
                "result": {
                    "records": [{ "filename": "", "filepath": "", "status": "", "remote_deleted": false }],
                    "result": { "downloded": 0, "failed": 0, "skipped": 0 },
                },
            }),
            handler: sync_records,
        },
    ]
}

fn list_records(ctx: &RecordContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let pars: PageRequest = optional(&params, "pars")?.unwrap_or_default();
        let catalog = ctx.engine.session().catalog();
        let page = catalog.list_page(pars.page_index).await.or_raise(ErrorKind::action("listRecords"))?;
        fields(json!({ "pars": pars, "payload": page }))
    })
}

fn cancel(ctx: &RecordContext, _: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        ctx.engine.session().cgi().unlock();
        tracing::info!("cgi lock released");
        Ok(Fields::new())
    })
}

/// A date component given either as text (`"05"`) or as a number (`5`).
#[derive(Deserialize)]
#[serde(untagged)]
enum DatePart {
    Number(u32),
    Text(String),
}
impl DatePart {
    fn padded(self, width: usize) -> String {
        match self {
            Self::Number(n) => format!("{n:0width$}"),
            Self::Text(text) => text,
        }
    }
}

fn list_cache(ctx: &RecordContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let today = RecordDate::today();
        let year = optional::<DatePart>(&params, "year")?.map_or(today.year, |p| p.padded(4));
        let month = optional::<DatePart>(&params, "month")?.map_or(today.month, |p| p.padded(2));
        let day = optional::<DatePart>(&params, "day")?.map_or(today.day, |p| p.padded(2));
        let date = RecordDate::new(year, month, day).or_raise(|| ErrorKind::InvalidParameter("date".into()))?;
        let listing = ctx.engine.store().list_cache(&date).await.or_raise(ErrorKind::action("listCache"))?;
        fields(listing)
    })
}

fn download_record(ctx: &RecordContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let filename: String = required(&params, "filename")?;
        let filepath: Option<PathBuf> = optional(&params, "filepath")?;
        let download = ctx
            .engine
            .download_record(&filename, filepath.as_deref())
            .await
            .or_raise(ErrorKind::action("downloadRecord"))?;
        fields(download)
    })
}

fn delete_record(ctx: &RecordContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let filename: String = required(&params, "filename")?;
        ctx.engine.delete_record(&filename).await.or_raise(ErrorKind::action("deleteRecord"))?;
        fields(json!({ "filename": filename }))
    })
}

fn sync_record(ctx: &RecordContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let mut request = RecordRequest::new(required::<String>(&params, "filename")?);
        request.filepath = optional(&params, "filepath")?;
        request.filesize = optional(&params, "filesize")?;
        let entry = ctx.engine.sync_record(&request).await.or_raise(ErrorKind::action("syncRecord"))?;
        fields(entry)
    })
}

fn records(params: &Fields) -> Result<Vec<RecordRequest>> {
    required(params, "records")
}

fn download_records(ctx: &RecordContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let records = records(&params)?;
        let downloads = ctx.engine.download_records(&records).await;
        fields(json!({ "records": downloads }))
    })
}

fn delete_records(ctx: &RecordContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let records = records(&params)?;
        let deletions = ctx.engine.delete_records(&records).await;
        fields(json!({ "records": deletions }))
    })
}

fn sync_records(ctx: &RecordContext, params: Fields) -> HandlerFuture<'_> {
    Box::pin(async move {
        let records = records(&params)?;
        fields(ctx.engine.sync_records(&records).await)
    })
}
