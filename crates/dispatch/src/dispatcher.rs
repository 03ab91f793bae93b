use crate::error::{ErrorKind, Result};
use crate::params::Fields;
use exn::{OptionExt, ResultExt};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

/// Name of the built-in action that describes all others.
pub const LIST_ACTIONS: &str = "listActions";

/// Future returned by an action handler.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<Fields>>;
/// An action handler: borrows the dispatcher's context and consumes the
/// request parameters.
pub type Handler<C> = for<'a> fn(&'a C, Fields) -> HandlerFuture<'a>;

/// One entry of a dispatcher's action table.
pub struct Registration<C> {
    pub name: &'static str,
    /// `{ parameters: { name: { value, require } }, result: {...} }`, or `{}`
    /// for actions that take and return nothing.
    pub schema: Value,
    pub handler: Handler<C>,
}

/// An inbound action message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub action: String,
    #[serde(flatten)]
    pub params: Fields,
}
impl Request {
    pub fn new(action: impl Into<String>) -> Self {
        Self { action: action.into(), params: Fields::new() }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// The reply to a successfully handled [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub action: String,
    #[serde(flatten)]
    pub fields: Fields,
}
impl Response {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Routes requests to registered handlers by action name.
pub struct ActionDispatcher<C> {
    context: C,
    registrations: Vec<Registration<C>>,
}

impl<C: Sync> ActionDispatcher<C> {
    pub fn new(context: C, registrations: Vec<Registration<C>>) -> Self {
        Self { context, registrations }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Registered action names, in registration order.
    pub fn actions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registrations.iter().map(|registration| registration.name)
    }

    /// Fields returned by `listActions`: every schema under `payload` and the
    /// action names under `options`.
    pub fn list_actions(&self) -> Fields {
        let payload: Fields = self.registrations.iter().map(|r| (r.name.to_string(), r.schema.clone())).collect();
        let options: Vec<&str> = self.actions().collect();
        Fields::from_iter([("payload".to_string(), Value::Object(payload)), ("options".to_string(), json!(options))])
    }

    /// Handles one request.
    ///
    /// # Errors
    ///
    /// [`UnsupportedAction`](ErrorKind::UnsupportedAction) for unknown action
    /// names, parameter errors before any I/O, and
    /// [`Action`](ErrorKind::Action) when the handler itself fails.
    #[instrument(skip_all, fields(action = %request.action))]
    pub async fn dispatch(&self, request: Request) -> Result<Response> {
        if request.action == LIST_ACTIONS {
            return Ok(Response { action: request.action, fields: self.list_actions() });
        }
        let registration = self
            .registrations
            .iter()
            .find(|r| r.name == request.action)
            .ok_or_raise(|| ErrorKind::UnsupportedAction(request.action.clone()))?;
        let fields = match (registration.handler)(&self.context, request.params).await {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!(error = %e, "action failed");
                return Err(e);
            },
        };
        tracing::debug!("action handled");
        Ok(Response { action: request.action, fields })
    }

    /// [`dispatch`](Self::dispatch) for raw JSON messages.
    pub async fn dispatch_value(&self, message: Value) -> Result<Value> {
        let request: Request =
            serde_json::from_value(message).or_raise(|| ErrorKind::InvalidParameter("action".into()))?;
        let response = self.dispatch(request).await?;
        serde_json::to_value(response).or_raise(|| ErrorKind::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::required;

    struct Counter(std::sync::atomic::AtomicU64);

    fn add(ctx: &Counter, params: Fields) -> HandlerFuture<'_> {
        Box::pin(async move {
            let by: u64 = required(&params, "by")?;
            let total = ctx.0.fetch_add(by, std::sync::atomic::Ordering::SeqCst) + by;
            crate::params::fields(json!({ "total": total }))
        })
    }

    fn reset(ctx: &Counter, _: Fields) -> HandlerFuture<'_> {
        Box::pin(async move {
            ctx.0.store(0, std::sync::atomic::Ordering::SeqCst);
            Ok(Fields::new())
        })
    }

    fn dispatcher() -> ActionDispatcher<Counter> {
        ActionDispatcher::new(Counter(std::sync::atomic::AtomicU64::new(0)), vec![
            Registration {
                name: "add",
                schema: json!({ "parameters": { "by": { "value": 1, "require": true } }, "result": { "total": 0 } }),
                handler: add,
            },
            Registration { name: "reset", schema: json!({}), handler: reset },
        ])
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_name() {
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch(Request::new("add").param("by", 2)).await.unwrap();
        assert_eq!(response.action, "add");
        assert_eq!(response.get("total"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let err = dispatcher().dispatch(Request::new("reboot")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedAction(name) if name == "reboot"));
    }

    #[tokio::test]
    async fn test_missing_parameter_has_no_side_effects() {
        let dispatcher = dispatcher();
        let err = dispatcher.dispatch(Request::new("add")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingParameter(name) if name == "by"));
        assert_eq!(dispatcher.context().0.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_actions() {
        let response = dispatcher().dispatch(Request::new(LIST_ACTIONS)).await.unwrap();
        assert_eq!(response.get("options"), Some(&json!(["add", "reset"])));
        assert_eq!(response.get("payload").unwrap()["reset"], json!({}));
        assert_eq!(response.get("payload").unwrap()["add"]["parameters"]["by"]["require"], json!(true));
    }

    #[tokio::test]
    async fn test_dispatch_value_flattens() {
        let reply = dispatcher().dispatch_value(json!({ "action": "add", "by": 5 })).await.unwrap();
        assert_eq!(reply, json!({ "action": "add", "total": 5 }));
        assert!(dispatcher().dispatch_value(json!({ "by": 5 })).await.is_err());
    }
}
