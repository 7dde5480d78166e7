//! In-memory stand-in for the planning server's chore endpoints.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chore_sync::paths;
use chore_sync::{ChoreResult, ChoreService, RestResponse, RestTransport};
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::{Map, Value, json};

/// Serves chores from memory and records every request.
#[derive(Default)]
pub struct FakeServer {
    chores: Mutex<Vec<Value>>,
    requests: Mutex<Vec<(Method, String)>>,
    executions: Mutex<Vec<String>>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Build a service wired to this server.
    pub fn service(self: &Arc<Self>) -> ChoreService {
        ChoreService::new(self.clone())
    }

    /// Stored wire document of a chore.
    pub fn stored(&self, name: &str) -> Option<Value> {
        self.chores
            .lock()
            .iter()
            .find(|c| c["Name"] == name)
            .cloned()
    }

    /// Remove a chore without going through the service.
    pub fn remove(&self, name: &str) {
        self.chores.lock().retain(|c| c["Name"] != name);
    }

    pub fn chore_count(&self) -> usize {
        self.chores.lock().len()
    }

    pub fn requests(&self) -> Vec<(Method, String)> {
        self.requests.lock().clone()
    }

    pub fn executions(&self) -> Vec<String> {
        self.executions.lock().clone()
    }

    fn handle(&self, method: &Method, path: &str, body: Option<&Value>) -> RestResponse {
        let (resource, query) = path.split_once('?').unwrap_or((path, ""));

        if resource == paths::CHORES {
            return match *method {
                Method::GET => self.list(query.starts_with("$select=Name")),
                Method::POST => self.create(body),
                _ => not_allowed(),
            };
        }

        let Some(rest) = resource.strip_prefix("/Chores('") else {
            return not_found("resource");
        };
        let Some((encoded, tail)) = rest.split_once("')") else {
            return bad_request("malformed key");
        };
        let Some(name) = paths::unquote_key(encoded) else {
            return bad_request("malformed key");
        };

        let mut chores = self.chores.lock();
        let Some(index) = chores.iter().position(|c| c["Name"] == name.as_str()) else {
            return not_found(&name);
        };

        match (method.clone(), tail) {
            (Method::GET, "") => {
                let chore = &chores[index];
                if query.starts_with("$select=Name") {
                    RestResponse::new(200, Some(json!({"Name": chore["Name"]})))
                } else {
                    RestResponse::new(200, Some(chore.clone()))
                }
            }
            (Method::PATCH, "") => {
                let Some(Value::Object(fields)) = body else {
                    return bad_request("expected object");
                };
                let chore = &mut chores[index];
                for (key, value) in fields {
                    if key != "Tasks" {
                        chore[key.as_str()] = value.clone();
                    }
                }
                RestResponse::empty(204)
            }
            (Method::DELETE, "") => {
                chores.remove(index);
                RestResponse::empty(204)
            }
            (Method::GET, "/Tasks") => {
                RestResponse::new(200, Some(json!({"value": chores[index]["Tasks"]})))
            }
            (Method::POST, "/Tasks") => {
                let tasks = tasks_mut(&mut chores[index]);
                let Some(task) = body.map(|b| read_task(b, tasks.len())) else {
                    return bad_request("expected task");
                };
                tasks.push(task);
                RestResponse::empty(201)
            }
            (method, tail) if tail.starts_with("/Tasks(") => {
                let Some(step) = tail
                    .strip_prefix("/Tasks(")
                    .and_then(|s| s.strip_suffix(')'))
                    .and_then(|s| s.parse::<usize>().ok())
                else {
                    return bad_request("malformed step");
                };
                let tasks = tasks_mut(&mut chores[index]);
                if step >= tasks.len() {
                    return not_found(&format!("{name} step {step}"));
                }
                match method {
                    Method::PATCH => match body {
                        Some(b) => {
                            tasks[step] = read_task(b, step);
                            RestResponse::empty(204)
                        }
                        None => bad_request("expected task"),
                    },
                    Method::DELETE => {
                        tasks.remove(step);
                        for (position, task) in tasks.iter_mut().enumerate() {
                            task["Step"] = json!(position);
                        }
                        RestResponse::empty(204)
                    }
                    _ => not_allowed(),
                }
            }
            (Method::POST, "/tm1.Activate") => {
                chores[index]["Active"] = json!(true);
                RestResponse::empty(204)
            }
            (Method::POST, "/tm1.Deactivate") => {
                chores[index]["Active"] = json!(false);
                RestResponse::empty(204)
            }
            (Method::POST, "/tm1.Execute") => {
                self.executions.lock().push(name);
                RestResponse::empty(204)
            }
            (Method::POST, "/tm1.SetServerLocalStartTime") => {
                let Some(b) = body else {
                    return bad_request("expected start date and time");
                };
                let (Some(date), Some(time)) = (b["StartDate"].as_str(), b["StartTime"].as_str())
                else {
                    return bad_request("expected start date and time");
                };
                chores[index]["StartTime"] = json!(format!("{date}T{time}Z"));
                RestResponse::empty(204)
            }
            _ => not_allowed(),
        }
    }

    fn list(&self, names_only: bool) -> RestResponse {
        let chores = self.chores.lock();
        let value: Vec<Value> = if names_only {
            chores.iter().map(|c| json!({"Name": c["Name"]})).collect()
        } else {
            chores.clone()
        };
        RestResponse::new(200, Some(json!({ "value": value })))
    }

    fn create(&self, body: Option<&Value>) -> RestResponse {
        let Some(body) = body else {
            return bad_request("expected chore");
        };
        let Some(name) = body["Name"].as_str() else {
            return bad_request("chore without Name");
        };

        let mut chores = self.chores.lock();
        if chores.iter().any(|c| c["Name"] == name) {
            return RestResponse::new(
                409,
                Some(json!({"error": {"message": format!("Chore '{name}' already exists")}})),
            );
        }

        let mut tasks = Vec::new();
        for (position, task) in body["Tasks"].as_array().into_iter().flatten().enumerate() {
            if task["Step"] != json!(position) {
                return bad_request("task steps must be contiguous from 0");
            }
            tasks.push(read_task(task, position));
        }

        let mut stored = body.clone();
        stored["Tasks"] = Value::Array(tasks);
        chores.push(stored);
        RestResponse::empty(201)
    }
}

#[async_trait]
impl RestTransport for FakeServer {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ChoreResult<RestResponse> {
        self.requests.lock().push((method.clone(), path.to_string()));
        Ok(self.handle(&method, path, body))
    }
}

/// Convert a task from its write form to the form the server returns.
fn read_task(body: &Value, step: usize) -> Value {
    let process = body["Process@odata.bind"]
        .as_str()
        .and_then(|bind| bind.strip_prefix("Processes('"))
        .and_then(|s| s.strip_suffix("')"))
        .and_then(paths::unquote_key)
        .unwrap_or_default();
    let mut task = Map::new();
    task.insert("Step".to_string(), json!(step));
    task.insert("Process".to_string(), json!({ "Name": process }));
    task.insert("Parameters".to_string(), body["Parameters"].clone());
    Value::Object(task)
}

fn tasks_mut(chore: &mut Value) -> &mut Vec<Value> {
    if !chore["Tasks"].is_array() {
        chore["Tasks"] = json!([]);
    }
    match &mut chore["Tasks"] {
        Value::Array(tasks) => tasks,
        _ => unreachable!(),
    }
}

fn not_found(what: &str) -> RestResponse {
    RestResponse::new(404, Some(json!({"error": {"message": format!("{what} not found")}})))
}

fn bad_request(message: &str) -> RestResponse {
    RestResponse::new(400, Some(json!({"error": {"message": message}})))
}

fn not_allowed() -> RestResponse {
    RestResponse::new(405, Some(json!({"error": {"message": "method not allowed"}})))
}
