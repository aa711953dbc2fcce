//! Scripted executor for tests.
//!
//! Replies come from a per-command table; commands without a scripted reply
//! succeed with `null`. Every call is recorded before the executor yields, so
//! the recorded order is the order in which requests were issued. Calls that
//! succeed are recorded again once they finish.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{Command, CommandExecutor};
use crate::core::error::{InstallerError, InstallerResult};

#[derive(Default)]
pub struct ScriptedExecutor {
    replies: HashMap<Command, Value>,
    /// `(command, name)`: fail the command, only when `args.name == name` if set.
    failures: Vec<(Command, Option<String>)>,
    /// `(command, name, yields)`: extra scheduler yields before replying.
    delays: Vec<(Command, String, usize)>,
    calls: Mutex<Vec<(Command, Value)>>,
    finished: Mutex<Vec<(Command, Value)>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: Command, value: Value) -> Self {
        self.replies.insert(command, value);
        self
    }

    pub fn fail(mut self, command: Command) -> Self {
        self.failures.push((command, None));
        self
    }

    pub fn fail_for(mut self, command: Command, name: &str) -> Self {
        self.failures.push((command, Some(name.to_string())));
        self
    }

    pub fn delay_for(mut self, command: Command, name: &str, yields: usize) -> Self {
        self.delays.push((command, name.to_string(), yields));
        self
    }

    pub fn calls(&self) -> Vec<(Command, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, command: Command) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(c, _)| *c == command)
            .map(|(_, args)| args)
            .collect()
    }

    pub fn count(&self, command: Command) -> usize {
        self.calls_to(command).len()
    }

    /// Successful calls of `command` that ran to completion.
    pub fn finished(&self, command: Command) -> usize {
        self.finished
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == command)
            .count()
    }

    fn delay(&self, command: Command, args: &Value) -> usize {
        let name = args.get("name").and_then(Value::as_str);
        self.delays
            .iter()
            .filter(|(c, n, _)| *c == command && name == Some(n.as_str()))
            .map(|(_, _, yields)| *yields)
            .sum()
    }

    fn should_fail(&self, command: Command, args: &Value) -> bool {
        self.failures.iter().any(|(c, name)| {
            *c == command
                && match name {
                    None => true,
                    Some(name) => args.get("name").and_then(Value::as_str) == Some(name),
                }
        })
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn invoke(&self, command: Command, args: Value) -> InstallerResult<Value> {
        self.calls.lock().unwrap().push((command, args.clone()));
        tokio::task::yield_now().await;
        for _ in 0..self.delay(command, &args) {
            tokio::task::yield_now().await;
        }

        if self.should_fail(command, &args) {
            return Err(InstallerError::Command {
                command: command.name().to_string(),
                message: "scripted failure".into(),
            });
        }

        self.finished.lock().unwrap().push((command, args));
        Ok(self.replies.get(&command).cloned().unwrap_or(Value::Null))
    }
}
