//! Chore synchronization against a planning server.
//!
//! [`ChoreService`] turns chore operations into REST calls on a
//! [`RestTransport`]. It keeps no cache: every call reflects what the server
//! holds at that moment, and the service can be shared across tasks.

pub mod http;
pub mod transport;

pub use http::HttpTransport;
pub use transport::{RestResponse, RestTransport};

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::chore::{Chore, ChoreStartTime, ChoreTask, ParameterValue};
use crate::error::{ChoreError, ChoreResult};
use crate::logging::OpTimer;
use crate::paths;

const COMPONENT: &str = "chores";

/// Acceptance of an execution request.
///
/// The server runs the chore asynchronously; this only confirms that the
/// request was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionAcknowledgement {
    /// Chore that was triggered.
    pub chore_name: String,
    /// HTTP status of the acceptance.
    pub status: u16,
}

/// Remote chore operations.
#[derive(Clone)]
pub struct ChoreService {
    transport: Arc<dyn RestTransport>,
}

impl std::fmt::Debug for ChoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChoreService").finish_non_exhaustive()
    }
}

impl ChoreService {
    /// Create a service on top of a transport.
    pub fn new(transport: Arc<dyn RestTransport>) -> Self {
        Self { transport }
    }

    /// Whether a chore named `name` exists.
    pub async fn exists(&self, name: &str) -> ChoreResult<bool> {
        timed("exists", self.exists_inner(name)).await
    }

    /// Fetch a chore with its tasks.
    pub async fn get(&self, name: &str) -> ChoreResult<Chore> {
        timed("get", self.get_inner(name)).await
    }

    /// Fetch every chore with its tasks, in server order.
    pub async fn get_all(&self) -> ChoreResult<Vec<Chore>> {
        timed("get_all", self.get_all_inner()).await
    }

    /// Names of every chore, in server order.
    pub async fn get_all_names(&self) -> ChoreResult<Vec<String>> {
        timed("get_all_names", async {
            self.fetch_collection(&paths::chore_names())
                .await?
                .into_iter()
                .map(|entry| {
                    entry
                        .get("Name")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .ok_or_else(|| ChoreError::Format("chore entry without Name".to_string()))
                })
                .collect()
        })
        .await
    }

    /// Create `chore` on the server.
    ///
    /// The chore is written inactive, its local start time is applied when
    /// it is DST sensitive, and only then is it activated. Fails with
    /// [`ChoreError::Conflict`] when the name is taken.
    pub async fn create(&self, chore: &Chore) -> ChoreResult<()> {
        timed("create", self.create_inner(chore)).await
    }

    /// Overwrite the server's copy of `chore` with the local one.
    ///
    /// Fails with [`ChoreError::NotFound`] when the chore no longer exists.
    /// The chore stays deactivated if a later step fails.
    pub async fn update(&self, chore: &Chore) -> ChoreResult<()> {
        timed("update", self.update_inner(chore)).await
    }

    /// Update `chore` if it exists, create it otherwise.
    ///
    /// Not atomic: a concurrent writer can slip in between the existence
    /// check and the write.
    pub async fn update_or_create(&self, chore: &Chore) -> ChoreResult<()> {
        timed("update_or_create", async {
            if self.exists_inner(chore.name()).await? {
                self.update_inner(chore).await
            } else {
                self.create_inner(chore).await
            }
        })
        .await
    }

    /// Delete a chore.
    pub async fn delete(&self, name: &str) -> ChoreResult<()> {
        timed("delete", self.delete_inner(name)).await
    }

    /// Switch a chore on.
    pub async fn activate(&self, name: &str) -> ChoreResult<()> {
        timed("activate", async {
            self.action(name, "Activate", None).await.map(|_| ())
        })
        .await
    }

    /// Switch a chore off.
    pub async fn deactivate(&self, name: &str) -> ChoreResult<()> {
        timed("deactivate", async {
            self.action(name, "Deactivate", None).await.map(|_| ())
        })
        .await
    }

    /// Ask the server to run a chore now.
    pub async fn execute_chore(&self, name: &str) -> ChoreResult<ExecutionAcknowledgement> {
        timed("execute_chore", async {
            let response = self.action(name, "Execute", None).await?;
            tracing::info!(chore = %name, status = response.status, "Chore execution accepted");
            Ok(ExecutionAcknowledgement {
                chore_name: name.to_string(),
                status: response.status,
            })
        })
        .await
    }

    /// Pin the start time in the server's local time zone, so the schedule
    /// follows daylight saving changes.
    pub async fn set_local_start_time(
        &self,
        name: &str,
        start_time: &ChoreStartTime,
    ) -> ChoreResult<()> {
        timed(
            "set_local_start_time",
            self.set_local_start_time_inner(name, start_time),
        )
        .await
    }

    /// Move a chore to a new name by recreating it and deleting the old one.
    ///
    /// Fails with [`ChoreError::Conflict`] before touching anything when
    /// `new_name` is taken. If the final delete fails both copies remain.
    pub async fn rename(&self, old_name: &str, new_name: &str) -> ChoreResult<()> {
        timed("rename", async {
            let chore = self.get_inner(old_name).await?;
            if self.exists_inner(new_name).await? {
                return Err(ChoreError::Conflict(new_name.to_string()));
            }
            self.create_inner(&chore.with_name(new_name)).await?;
            self.delete_inner(old_name).await
        })
        .await
    }

    /// Chores with at least one step running `process_name`.
    ///
    /// Names match the way the server compares them: case-insensitive with
    /// spaces ignored.
    pub async fn search_for_process_name(&self, process_name: &str) -> ChoreResult<Vec<Chore>> {
        timed("search_for_process_name", async {
            let chores = self.get_all_inner().await?;
            Ok(chores
                .into_iter()
                .filter(|chore| chore.references_process(process_name))
                .collect())
        })
        .await
    }

    /// Chores with at least one step binding a parameter to exactly `value`.
    pub async fn search_for_parameter_value(
        &self,
        value: impl Into<ParameterValue>,
    ) -> ChoreResult<Vec<Chore>> {
        let value = value.into();
        timed("search_for_parameter_value", async {
            let chores = self.get_all_inner().await?;
            Ok(chores
                .into_iter()
                .filter(|chore| chore.has_parameter_value(&value))
                .collect())
        })
        .await
    }

    async fn exists_inner(&self, name: &str) -> ChoreResult<bool> {
        let path = format!("{}?$select=Name", paths::chore(name));
        match self.send(Method::GET, &path, None, name).await {
            Ok(_) => Ok(true),
            Err(ChoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_inner(&self, name: &str) -> ChoreResult<Chore> {
        let response = self
            .send(Method::GET, &paths::chore_expanded(name), None, name)
            .await?;
        let body = response
            .body
            .ok_or_else(|| ChoreError::Format(format!("empty response for chore '{name}'")))?;
        Chore::from_value(body)
    }

    async fn get_all_inner(&self) -> ChoreResult<Vec<Chore>> {
        self.fetch_collection(&paths::chores_expanded())
            .await?
            .into_iter()
            .map(Chore::from_value)
            .collect()
    }

    /// GET a top-level collection. No chore is targeted, so every failure
    /// status is a transport error.
    async fn fetch_collection(&self, path: &str) -> ChoreResult<Vec<Value>> {
        let response = self.transport.request(Method::GET, path, None).await?;
        if !response.is_success() {
            return Err(ChoreError::transport(
                Some(response.status),
                response.error_message(),
            ));
        }
        collection(response)
    }

    async fn create_inner(&self, chore: &Chore) -> ChoreResult<()> {
        let mut body = chore.to_body();
        body["Active"] = Value::Bool(false);
        self.send(Method::POST, paths::CHORES, Some(&body), chore.name())
            .await?;
        tracing::info!(chore = %chore.name(), tasks = chore.tasks().len(), "Chore created");

        self.finish_write(chore).await
    }

    async fn update_inner(&self, chore: &Chore) -> ChoreResult<()> {
        let name = chore.name();
        self.action(name, "Deactivate", None).await?;

        self.send(
            Method::PATCH,
            &paths::chore(name),
            Some(&chore.to_body_without_tasks()),
            name,
        )
        .await?;

        self.reconcile_tasks(chore).await?;
        tracing::info!(chore = %name, tasks = chore.tasks().len(), "Chore updated");

        self.finish_write(chore).await
    }

    /// Apply local start time and activation after a write.
    async fn finish_write(&self, chore: &Chore) -> ChoreResult<()> {
        if chore.dst_sensitive() {
            self.set_local_start_time_inner(chore.name(), &chore.start_time())
                .await?;
        }
        if chore.is_active() {
            self.action(chore.name(), "Activate", None).await?;
        }
        Ok(())
    }

    /// Make the server's task list match `chore.tasks()` position by
    /// position.
    async fn reconcile_tasks(&self, chore: &Chore) -> ChoreResult<()> {
        let name = chore.name();
        let response = self
            .send(Method::GET, &paths::tasks_expanded(name), None, name)
            .await?;
        let remote = collection(response)?
            .into_iter()
            .enumerate()
            .map(|(position, task)| ChoreTask::from_value(task, position))
            .collect::<ChoreResult<Vec<_>>>()?;
        let local = chore.tasks();

        for (position, task) in local.iter().enumerate() {
            match remote.get(position) {
                Some(existing) if existing == task => {}
                Some(_) => {
                    self.send(
                        Method::PATCH,
                        &paths::task(name, position),
                        Some(&task.to_body()),
                        name,
                    )
                    .await?;
                }
                None => {
                    self.send(Method::POST, &paths::tasks(name), Some(&task.to_body()), name)
                        .await?;
                }
            }
        }

        for position in (local.len()..remote.len()).rev() {
            self.send(Method::DELETE, &paths::task(name, position), None, name)
                .await?;
        }

        tracing::debug!(
            chore = %name,
            local = local.len(),
            remote = remote.len(),
            "Tasks reconciled"
        );
        Ok(())
    }

    async fn delete_inner(&self, name: &str) -> ChoreResult<()> {
        self.send(Method::DELETE, &paths::chore(name), None, name)
            .await?;
        tracing::info!(chore = %name, "Chore deleted");
        Ok(())
    }

    async fn set_local_start_time_inner(
        &self,
        name: &str,
        start_time: &ChoreStartTime,
    ) -> ChoreResult<()> {
        let body = json!({
            "StartDate": start_time.date_string(),
            "StartTime": start_time.time_string(),
        });
        self.action(name, "SetServerLocalStartTime", Some(&body))
            .await
            .map(|_| ())
    }

    async fn action(
        &self,
        name: &str,
        action: &str,
        body: Option<&Value>,
    ) -> ChoreResult<RestResponse> {
        self.send(Method::POST, &paths::chore_action(name, action), body, name)
            .await
    }

    /// Send a request and map the status. `subject` names the chore in
    /// not-found and conflict errors.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        subject: &str,
    ) -> ChoreResult<RestResponse> {
        let response = self.transport.request(method, path, body).await?;
        check_status(response, subject)
    }
}

fn check_status(response: RestResponse, subject: &str) -> ChoreResult<RestResponse> {
    match response.status {
        _ if response.is_success() => Ok(response),
        404 => Err(ChoreError::NotFound(subject.to_string())),
        409 => Err(ChoreError::Conflict(subject.to_string())),
        status => Err(ChoreError::transport(
            Some(status),
            response.error_message(),
        )),
    }
}

/// Entries of an OData collection response.
fn collection(response: RestResponse) -> ChoreResult<Vec<Value>> {
    match response.body {
        Some(Value::Object(mut body)) => match body.remove("value") {
            Some(Value::Array(entries)) => Ok(entries),
            _ => Err(ChoreError::Format(
                "collection response without a value array".to_string(),
            )),
        },
        _ => Err(ChoreError::Format(
            "collection response is not a JSON object".to_string(),
        )),
    }
}

async fn timed<T>(
    operation: &'static str,
    future: impl Future<Output = ChoreResult<T>>,
) -> ChoreResult<T> {
    let timer = OpTimer::new(COMPONENT, operation);
    let result = future.await;
    timer.finish_with_result(result.as_ref());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays canned responses and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<RestResponse>>,
        requests: Mutex<Vec<(Method, String, Option<Value>)>>,
    }

    impl ScriptedTransport {
        fn with(responses: Vec<RestResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::default(),
            })
        }

        fn sent(&self) -> Vec<(Method, String, Option<Value>)> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl RestTransport for ScriptedTransport {
        async fn request(
            &self,
            method: Method,
            path: &str,
            body: Option<&Value>,
        ) -> ChoreResult<RestResponse> {
            self.requests
                .lock()
                .push((method, path.to_string(), body.cloned()));
            Ok(self
                .responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| RestResponse::empty(204)))
        }
    }

    fn chore_json(name: &str) -> Value {
        json!({
            "Name": name,
            "StartTime": "2024-05-06T07:08:09Z",
            "DSTSensitive": false,
            "Active": true,
            "ExecutionMode": "SingleCommit",
            "Frequency": "P01DT00H00M00S",
            "Tasks": [
                {"Step": 0, "Process": {"Name": "load.sales"}, "Parameters": [{"Name": "pRegion", "Value": "UK"}]}
            ]
        })
    }

    #[test]
    fn test_check_status_mapping() {
        assert!(check_status(RestResponse::empty(201), "c").is_ok());
        assert!(matches!(
            check_status(RestResponse::empty(404), "c"),
            Err(ChoreError::NotFound(name)) if name == "c"
        ));
        assert!(matches!(
            check_status(RestResponse::empty(409), "c"),
            Err(ChoreError::Conflict(_))
        ));
        let err = check_status(
            RestResponse::new(500, Some(json!({"error": {"message": "boom"}}))),
            "c",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ChoreError::Transport { status: Some(500), ref message } if message == "boom"
        ));
    }

    #[test]
    fn test_collection_requires_value_array() {
        let ok = RestResponse::new(200, Some(json!({"value": [1, 2]})));
        assert_eq!(collection(ok).unwrap().len(), 2);
        assert!(collection(RestResponse::new(200, Some(json!({"items": []})))).is_err());
        assert!(collection(RestResponse::empty(200)).is_err());
    }

    #[tokio::test]
    async fn test_get_decodes_chore() {
        let transport = ScriptedTransport::with(vec![RestResponse::new(
            200,
            Some(chore_json("Nightly Load")),
        )]);
        let service = ChoreService::new(transport.clone());

        let chore = service.get("Nightly Load").await.unwrap();
        assert_eq!(chore.name(), "Nightly Load");
        assert_eq!(chore.tasks().len(), 1);

        let sent = transport.sent();
        assert_eq!(sent[0].0, Method::GET);
        assert_eq!(sent[0].1, paths::chore_expanded("Nightly Load"));
    }

    #[tokio::test]
    async fn test_exists_maps_not_found_to_false() {
        let transport = ScriptedTransport::with(vec![
            RestResponse::empty(404),
            RestResponse::new(200, Some(json!({"Name": "x"}))),
            RestResponse::empty(500),
        ]);
        let service = ChoreService::new(transport);

        assert!(!service.exists("x").await.unwrap());
        assert!(service.exists("x").await.unwrap());
        assert!(service.exists("x").await.is_err());
    }

    #[tokio::test]
    async fn test_create_writes_inactive_then_activates() {
        let transport = ScriptedTransport::with(vec![RestResponse::empty(201)]);
        let service = ChoreService::new(transport.clone());
        let chore = Chore::from_value(chore_json("Nightly")).unwrap();

        service.create(&chore).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, Method::POST);
        assert_eq!(sent[0].1, "/Chores");
        assert_eq!(sent[0].2.as_ref().unwrap()["Active"], json!(false));
        assert_eq!(sent[1].1, "/Chores('Nightly')/tm1.Activate");
    }

    #[tokio::test]
    async fn test_create_dst_sensitive_sets_local_start_time() {
        let transport = Arc::new(ScriptedTransport::default());
        let service = ChoreService::new(transport.clone());
        let chore = Chore::from_value(chore_json("Nightly"))
            .unwrap()
            .with_dst_sensitivity(true)
            .with_active(false);

        service.create(&chore).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].1, "/Chores('Nightly')/tm1.SetServerLocalStartTime");
        assert_eq!(
            sent[1].2,
            Some(json!({"StartDate": "2024-05-06", "StartTime": "07:08:09"}))
        );
    }

    #[tokio::test]
    async fn test_update_reconciles_tasks() {
        let remote_tasks = json!({"value": [
            {"Step": 0, "Process": {"Name": "load.sales"}, "Parameters": [{"Name": "pRegion", "Value": "UK"}]},
            {"Step": 1, "Process": {"Name": "load.sales"}, "Parameters": [{"Name": "pRegion", "Value": "DE"}]},
            {"Step": 2, "Process": {"Name": "load.sales"}, "Parameters": [{"Name": "pRegion", "Value": "IT"}]},
            {"Step": 3, "Process": {"Name": "load.sales"}, "Parameters": [{"Name": "pRegion", "Value": "ES"}]}
        ]});
        let transport = ScriptedTransport::with(vec![
            RestResponse::empty(204),
            RestResponse::empty(204),
            RestResponse::new(200, Some(remote_tasks)),
        ]);
        let service = ChoreService::new(transport.clone());
        let chore = Chore::from_value(chore_json("Nightly"))
            .unwrap()
            .with_active(false)
            .with_tasks(vec![
                ChoreTask::new(0, "load.sales").with_parameter("pRegion", "UK"),
                ChoreTask::new(1, "load.sales").with_parameter("pRegion", "FR"),
            ]);

        service.update(&chore).await.unwrap();

        let calls: Vec<(Method, String)> = transport
            .sent()
            .into_iter()
            .map(|(method, path, _)| (method, path))
            .collect();
        assert_eq!(
            calls,
            vec![
                (Method::POST, "/Chores('Nightly')/tm1.Deactivate".to_string()),
                (Method::PATCH, "/Chores('Nightly')".to_string()),
                (Method::GET, paths::tasks_expanded("Nightly")),
                (Method::PATCH, "/Chores('Nightly')/Tasks(1)".to_string()),
                (Method::DELETE, "/Chores('Nightly')/Tasks(3)".to_string()),
                (Method::DELETE, "/Chores('Nightly')/Tasks(2)".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_missing_chore_is_not_found() {
        let transport = ScriptedTransport::with(vec![RestResponse::empty(404)]);
        let service = ChoreService::new(transport.clone());
        let chore = Chore::from_value(chore_json("Gone")).unwrap();

        let err = service.update(&chore).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_acknowledges() {
        let transport = ScriptedTransport::with(vec![RestResponse::empty(204)]);
        let service = ChoreService::new(transport);

        let ack = service.execute_chore("Nightly").await.unwrap();
        assert_eq!(
            ack,
            ExecutionAcknowledgement {
                chore_name: "Nightly".to_string(),
                status: 204
            }
        );
    }

    #[tokio::test]
    async fn test_collection_not_found_is_transport_error() {
        let transport = ScriptedTransport::with(vec![
            RestResponse::new(404, Some(json!({"error": {"message": "no such entity set"}}))),
            RestResponse::empty(404),
        ]);
        let service = ChoreService::new(transport);

        let err = service.get_all_names().await.unwrap_err();
        assert!(matches!(
            err,
            ChoreError::Transport { status: Some(404), ref message } if message == "no such entity set"
        ));
        assert!(matches!(
            service.get_all().await,
            Err(ChoreError::Transport { status: Some(404), .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        struct Offline;

        #[async_trait]
        impl RestTransport for Offline {
            async fn request(
                &self,
                _method: Method,
                _path: &str,
                _body: Option<&Value>,
            ) -> ChoreResult<RestResponse> {
                Err(ChoreError::transport(None, "connection refused"))
            }
        }

        let service = ChoreService::new(Arc::new(Offline));
        let err = service.get_all().await.unwrap_err();
        assert!(matches!(err, ChoreError::Transport { status: None, .. }));
    }
}
