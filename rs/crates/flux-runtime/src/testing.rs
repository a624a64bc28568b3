//! Components used by the runtime's own tests.

use async_trait::async_trait;
use flux_dom::DomNode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::component::{Component, FormValues, MountParams, Scope, View};
use crate::envelope::FluxNode;
use crate::error::ComponentError;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Counter {
    pub count: i64,
    pub mounts: u32,
    pub label: String,
    pub broken: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAction {
    Increment,
    Reject,
    Fault,
    Slow,
    Redirect,
    Refresh,
    Panic,
    Break,
}

impl FromStr for CounterAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "increment" => Self::Increment,
            "reject" => Self::Reject,
            "fault" => Self::Fault,
            "slow" => Self::Slow,
            "redirect" => Self::Redirect,
            "refresh" => Self::Refresh,
            "panic" => Self::Panic,
            "break" => Self::Break,
            _ => return Err(()),
        })
    }
}

#[async_trait]
impl Component for Counter {
    const KIND: &'static str = "test_counter";
    type Action = CounterAction;

    async fn mount(&mut self, scope: &mut Scope<'_>, params: &MountParams) -> Result<(), ComponentError> {
        self.mounts += 1;
        self.label = params.get("label").cloned().unwrap_or_default();
        match params.get("start").map(String::as_str) {
            Some("reject") => return Err(ComponentError::rejected("Label not found")),
            Some("fault") => return Err(anyhow::anyhow!("store offline").into()),
            Some(n) => self.count = n.parse().unwrap_or_default(),
            None => {}
        }
        if params.contains_key("greet") {
            scope.success("Mounted");
        }
        Ok(())
    }

    async fn handle(
        &mut self,
        scope: &mut Scope<'_>,
        action: CounterAction,
        form: &FormValues,
    ) -> Result<(), ComponentError> {
        match action {
            CounterAction::Increment => {
                let by = form.trimmed("by").parse().unwrap_or(1);
                let next = self.count + by;
                // yield between read and write to expose lost updates
                tokio::task::yield_now().await;
                self.count = next;
                scope.success(format!("Count is {}", self.count));
            }
            CounterAction::Reject => return Err(ComponentError::rejected("Count is locked")),
            CounterAction::Fault => return Err(anyhow::anyhow!("database unreachable").into()),
            CounterAction::Slow => {
                tokio::time::sleep(Duration::from_millis(500)).await;
                self.count += 1;
            }
            CounterAction::Redirect => scope.redirect("/done"),
            CounterAction::Refresh => scope.refresh(),
            CounterAction::Panic => panic!("counter exploded"),
            CounterAction::Break => self.broken = true,
        }
        Ok(())
    }

    fn render(&self, view: &View<'_>) -> Result<DomNode, ComponentError> {
        if self.broken {
            return Err(anyhow::anyhow!("template missing").into());
        }
        Ok(DomNode::div()
            .class("counter")
            .child(DomNode::text("span", &format!("count: {}", self.count)))
            .child_if(!self.label.is_empty(), DomNode::text("span", &self.label))
            .child_if(view.last_error().is_some(), DomNode::text("p", view.last_error().unwrap_or_default()).class("error"))
            .child_if(view.last_success().is_some(), DomNode::text("p", view.last_success().unwrap_or_default()).class("success"))
            .child(DomNode::button().flux_action("increment").with_text("+")))
    }
}

/// Stores the last `message` form value; exercises form passing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Echo {
    pub heard: Vec<String>,
}

pub enum EchoAction {
    Echo,
}

impl FromStr for EchoAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "echo" => Ok(Self::Echo),
            _ => Err(()),
        }
    }
}

#[async_trait]
impl Component for Echo {
    const KIND: &'static str = "test_echo";
    type Action = EchoAction;

    async fn mount(&mut self, _scope: &mut Scope<'_>, _params: &MountParams) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn handle(
        &mut self,
        _scope: &mut Scope<'_>,
        _action: EchoAction,
        form: &FormValues,
    ) -> Result<(), ComponentError> {
        self.heard.extend(form.get_all("message").iter().cloned());
        Ok(())
    }

    fn render(&self, _view: &View<'_>) -> Result<DomNode, ComponentError> {
        Ok(DomNode::new("ul").children(self.heard.iter().map(|m| DomNode::text("li", m)).collect::<Vec<_>>()))
    }
}
