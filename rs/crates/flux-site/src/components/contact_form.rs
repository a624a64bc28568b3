//! Website contact form with a signed CSRF token and an arithmetic captcha.
//!
//! The form carries everything a submission is checked against: the CSRF
//! token and the captcha signature are verified with the site [`Signer`],
//! so a submission still validates after its instance was evicted and
//! rebuilt from the mount carriers.

use async_trait::async_trait;
use chrono::Utc;
use flux_dom::DomNode;
use flux_runtime::{Component, ComponentError, FluxNode, FormValues, MountParams, Scope, View};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use super::ui;
use crate::security::Signer;
use crate::stores::{RecordStore, UserStore};

pub const KIND: &str = "website_contact_form";

/// Where the form sends the visitor after a submission or a stale token.
pub const CONTACT_URL: &str = "/contact";

/// How long a rendered form accepts submissions.
pub const CSRF_MAX_AGE: Duration = Duration::from_secs(2 * 60 * 60);

const SENT_REDIRECT_DELAY: Duration = Duration::from_secs(5);
const SYSTEM_ERROR: &str = "System error occurred. Please try again later.";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ContactForm {
    /// Signed-in user at mount time; empty for visitors.
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub text: String,
    pub csrf_token: String,
    pub captcha_question: String,
    /// Signature binding the expected answer to `csrf_token`
    pub captcha_expected: String,
    pub captcha_answer: String,
    pub can_update_email: bool,
    pub can_update_first: bool,
    pub can_update_last: bool,
}

pub enum ContactAction {
    Submit,
}

impl FromStr for ContactAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submit" => Ok(Self::Submit),
            _ => Err(()),
        }
    }
}

fn site_signer(scope: &Scope<'_>) -> Result<std::sync::Arc<Signer>, ComponentError> {
    scope.ctx().service::<Signer>().ok_or_else(|| {
        tracing::error!("contact form signer is not configured");
        ComponentError::rejected(SYSTEM_ERROR)
    })
}

fn captcha_claim(csrf_token: &str, answer: &str) -> String {
    format!("{}|{}", csrf_token, answer)
}

/// A submitted form, checked only against what it carries.
struct Submission {
    email: String,
    first_name: String,
    last_name: String,
    text: String,
    csrf_token: String,
    captcha_expected: String,
    captcha_answer: String,
}

impl Submission {
    fn from_values(form: &FormValues) -> Self {
        Self {
            email: form.trimmed("email"),
            first_name: form.trimmed("first_name"),
            last_name: form.trimmed("last_name"),
            text: form.trimmed("text"),
            csrf_token: form.trimmed("csrf_token"),
            captcha_expected: form.trimmed("captcha_expected"),
            captcha_answer: form.trimmed("captcha_answer"),
        }
    }

    fn csrf_error(&self, signer: &Signer, user_id: &str) -> Option<&'static str> {
        if self.csrf_token.is_empty() {
            return Some("CSRF token is required");
        }
        if !signer.verify_csrf(&self.csrf_token, user_id, Utc::now(), CSRF_MAX_AGE) {
            return Some("CSRF token is invalid");
        }
        None
    }

    fn check_captcha(&self, signer: &Signer) -> Result<(), ComponentError> {
        if self.captcha_answer.is_empty() || self.captcha_expected.is_empty() {
            return Err(ComponentError::rejected("Please answer the verification question"));
        }
        let claim = captcha_claim(&self.csrf_token, &self.captcha_answer);
        if !signer.verify("captcha", &claim, &self.captcha_expected) {
            return Err(ComponentError::rejected("Verification answer is incorrect"));
        }
        Ok(())
    }
}

impl ContactForm {
    fn check_required(&self) -> Result<(), ComponentError> {
        let required = [
            (&self.first_name, "First name is required"),
            (&self.last_name, "Last name is required"),
            (&self.email, "Email is required"),
            (&self.text, "Text is required"),
        ];
        match required.iter().find(|(value, _)| value.is_empty()) {
            Some((_, msg)) => Err(ComponentError::rejected(*msg)),
            None => Ok(()),
        }
    }

    /// Fresh CSRF token and captcha, both signed for the current user.
    fn issue(&mut self, signer: &Signer) {
        self.csrf_token = signer.issue_csrf(&self.user_id, Utc::now());
        let mut rng = rand::thread_rng();
        let a: u32 = rng.gen_range(1..=5);
        let b: u32 = rng.gen_range(1..=5);
        self.captcha_question = format!("{} + {} =", a, b);
        self.captcha_expected = signer.sign("captcha", &captcha_claim(&self.csrf_token, &(a + b).to_string()));
        self.captcha_answer.clear();
    }

    /// Fill in names the user record was missing.
    async fn update_user(&self, scope: &Scope<'_>) {
        if self.user_id.is_empty() || !(self.can_update_first || self.can_update_last) {
            return;
        }
        let Some(users) = scope.ctx().service::<dyn UserStore>() else {
            return;
        };
        let Ok(Some(mut user)) = users.user_find_by_id(&self.user_id).await else {
            return;
        };
        if self.can_update_first {
            user.first_name = self.first_name.clone();
        }
        if self.can_update_last {
            user.last_name = self.last_name.clone();
        }
        if let Err(err) = users.user_update(&user).await {
            tracing::error!(user_id = %self.user_id, error = %err, "updating contact user failed");
        }
    }

    async fn submit(&mut self, scope: &mut Scope<'_>, form: &FormValues) -> Result<(), ComponentError> {
        let signer = site_signer(scope)?;
        let submission = Submission::from_values(form);

        let requester = scope.ctx().user_id().unwrap_or_default();
        if requester != self.user_id {
            tracing::warn!(mounted = %self.user_id, requester, "contact form user changed, redirecting");
            scope.redirect(CONTACT_URL);
            return Err(ComponentError::rejected("CSRF token is invalid"));
        }
        if let Some(msg) = submission.csrf_error(&signer, &self.user_id) {
            scope.redirect(CONTACT_URL);
            return Err(ComponentError::rejected(msg));
        }

        if self.can_update_email {
            self.email = submission.email.clone();
        }
        if self.can_update_first {
            self.first_name = submission.first_name.clone();
        }
        if self.can_update_last {
            self.last_name = submission.last_name.clone();
        }
        self.text = submission.text.clone();
        // a rebuilt instance renders its own captcha; the old answer does not fit it
        if submission.csrf_token == self.csrf_token {
            self.captcha_answer = submission.captcha_answer.clone();
        }

        self.check_required()?;
        submission.check_captcha(&signer)?;

        let records = scope
            .ctx()
            .service::<dyn RecordStore>()
            .ok_or_else(|| ComponentError::rejected(SYSTEM_ERROR))?;
        let payload = serde_json::json!({
            "user_id": self.user_id,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "email": self.email,
            "text": self.text,
        });
        let record_id = match records.record_create("contact", payload).await {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(error = %err, "storing contact submission failed");
                return Err(ComponentError::rejected(SYSTEM_ERROR));
            }
        };
        tracing::info!(record_id = %record_id, "contact form submitted");

        self.update_user(scope).await;

        self.text.clear();
        self.issue(&signer);
        scope.success("Your message has been sent.");
        scope.redirect_after(CONTACT_URL, SENT_REDIRECT_DELAY);
        Ok(())
    }
}

fn contact_input(name: &str, value: &str, editable: bool) -> DomNode {
    ui::text_input(name, value)
        .attr_if(!editable, "readonly", "readonly")
        .attr_if(!editable, "style", "background-color:#ccc;")
}

fn required_label(label: &str) -> DomNode {
    DomNode::text("label", label)
        .class("form-label")
        .child(DomNode::text("sup", "required").style("margin-left:5px;color:lightcoral;"))
}

#[async_trait]
impl Component for ContactForm {
    const KIND: &'static str = KIND;
    type Action = ContactAction;

    async fn mount(&mut self, scope: &mut Scope<'_>, params: &MountParams) -> Result<(), ComponentError> {
        // the user comes from the request, never from the carriers
        self.user_id = scope.ctx().user_id().unwrap_or_default().to_string();
        let claimed = params.get("user_id").map(|s| s.trim()).unwrap_or_default();
        if !claimed.is_empty() && claimed != self.user_id {
            tracing::warn!(claimed, user_id = %self.user_id, "ignoring contact form user from mount params");
        }
        self.can_update_email = true;
        self.can_update_first = true;
        self.can_update_last = true;
        self.issue(site_signer(scope)?.as_ref());

        if self.user_id.is_empty() {
            return Ok(());
        }
        let Some(users) = scope.ctx().service::<dyn UserStore>() else {
            return Ok(());
        };
        match users.user_find_by_id(&self.user_id).await {
            Ok(Some(user)) => {
                self.can_update_email = user.email.is_empty();
                self.can_update_first = user.first_name.is_empty();
                self.can_update_last = user.last_name.is_empty();
                self.email = user.email;
                self.first_name = user.first_name;
                self.last_name = user.last_name;
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(user_id = %self.user_id, error = %err, "contact prefill failed"),
        }
        Ok(())
    }

    async fn handle(
        &mut self,
        scope: &mut Scope<'_>,
        action: ContactAction,
        form: &FormValues,
    ) -> Result<(), ComponentError> {
        match action {
            ContactAction::Submit => self.submit(scope, form).await,
        }
    }

    fn render(&self, view: &View<'_>) -> Result<DomNode, ComponentError> {
        let group = |label: &str, control: DomNode| {
            DomNode::div().class("mb-3").child(required_label(label)).child(control)
        };

        let submit = DomNode::button()
            .input_type("submit")
            .class("btn btn-primary mb-0")
            .flux_action("submit")
            .flux_indicator("this, .contact-submit-spinner")
            .child(DomNode::icon().class("bi bi-rocket me-2"))
            .child(DomNode::text("span", "Send"))
            .child(ui::spinner("contact-submit-spinner"));

        let captcha = DomNode::div()
            .class("input-group")
            .child(DomNode::text("span", &self.captcha_question).class("input-group-text"))
            .child(ui::text_input("captcha_answer", &self.captcha_answer));

        let form = DomNode::form()
            .id("FormContact")
            .flux_action("submit")
            .child(
                DomNode::div()
                    .class("row g-4")
                    .child(DomNode::div().class("col-6").child(group("First name", contact_input("first_name", &self.first_name, self.can_update_first))))
                    .child(DomNode::div().class("col-6").child(group("Last name", contact_input("last_name", &self.last_name, self.can_update_last))))
                    .child(DomNode::div().class("col-12").child(group("Email", contact_input("email", &self.email, self.can_update_email))))
                    .child(DomNode::div().class("col-12").child(group("Text", ui::textarea("text", &self.text).style("height:200px;"))))
                    .child(DomNode::div().class("col-12").child(group("Verify you are human by answering this question", captcha))),
            )
            .child(DomNode::div().class("row mt-3").child(DomNode::div().class("col-12 d-sm-flex justify-content-end").child(submit)))
            .child(DomNode::hidden_input("csrf_token", &self.csrf_token))
            .child(DomNode::hidden_input("captcha_expected", &self.captcha_expected));

        let mut body = DomNode::div().class("card-body");
        if let Some(banner) = ui::feedback(view) {
            body = body.child(banner);
        }
        Ok(DomNode::div()
            .id("CardContact")
            .class("card bg-transparent border rounded-3")
            .child(body.child(form)))
    }
}
