//! HTML rendering for workflow views.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::account::{
    workflow::{LOGIN_PATH, RESET_PASSWORD_PATH},
    Field, Page, View,
};

const REGISTER_PATH: &str = "/Account/Register";

const TEMPLATES: [(&str, &str); 7] = [
    ("layout.html", include_str!("templates/layout.html")),
    ("summary.html", include_str!("templates/summary.html")),
    ("login.html", include_str!("templates/login.html")),
    ("lockout.html", include_str!("templates/lockout.html")),
    ("register.html", include_str!("templates/register.html")),
    (
        "forgot_password.html",
        include_str!("templates/forgot_password.html"),
    ),
    (
        "reset_password.html",
        include_str!("templates/reset_password.html"),
    ),
];

#[derive(Serialize)]
struct FieldErrors<'a> {
    email: Vec<&'a str>,
    password: Vec<&'a str>,
    confirm_password: Vec<&'a str>,
}

#[derive(Serialize)]
struct PageContext<'a> {
    app_name: &'static str,
    app_version: &'static str,
    title: &'static str,
    action: String,
    email: &'a str,
    remember_me: bool,
    summary: Vec<&'a str>,
    field_errors: FieldErrors<'a>,
}

/// Compiled page templates. `.html` templates are HTML auto-escaped.
#[derive(Debug)]
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    /// # Errors
    /// Returns an error if a bundled template fails to parse.
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    /// Render a workflow view to a full HTML page.
    ///
    /// # Errors
    /// Returns an error if the template fails to render.
    pub fn render(&self, view: &View) -> Result<String, minijinja::Error> {
        let context = PageContext {
            app_name: env!("CARGO_PKG_NAME"),
            app_version: env!("CARGO_PKG_VERSION"),
            title: title(view.page),
            action: action(view),
            email: view.email.as_deref().unwrap_or_default(),
            remember_me: view.remember_me,
            summary: view.errors.summary(),
            field_errors: FieldErrors {
                email: view.errors.for_field(Field::Email),
                password: view.errors.for_field(Field::Password),
                confirm_password: view.errors.for_field(Field::ConfirmPassword),
            },
        };
        self.env.get_template(template(view.page))?.render(context)
    }
}

const fn template(page: Page) -> &'static str {
    match page {
        Page::Login => "login.html",
        Page::Lockout => "lockout.html",
        Page::Register => "register.html",
        Page::ForgotPassword => "forgot_password.html",
        Page::ResetPassword => "reset_password.html",
    }
}

const fn title(page: Page) -> &'static str {
    match page {
        Page::Login => "Log in",
        Page::Lockout => "Locked out",
        Page::Register => "Register",
        Page::ForgotPassword => "Forgot your password?",
        Page::ResetPassword => "Reset password",
    }
}

// Forms post back to themselves, carrying the return url along.
fn action(view: &View) -> String {
    let path = match view.page {
        Page::Login => LOGIN_PATH,
        Page::Register => REGISTER_PATH,
        Page::ResetPassword => RESET_PASSWORD_PATH,
        Page::Lockout | Page::ForgotPassword => return String::new(),
    };
    match view.return_url.as_deref() {
        Some(return_url) if !return_url.is_empty() => {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("ReturnUrl", return_url)
                .finish();
            format!("{path}?{query}")
        }
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::FormErrors;

    fn views() -> Views {
        match Views::new() {
            Ok(views) => views,
            Err(err) => panic!("templates must parse: {err}"),
        }
    }

    fn render(view: &View) -> String {
        match views().render(view) {
            Ok(html) => html,
            Err(err) => panic!("render failed: {err}"),
        }
    }

    #[test]
    fn every_page_renders() {
        for page in [
            Page::Login,
            Page::Lockout,
            Page::Register,
            Page::ForgotPassword,
            Page::ResetPassword,
        ] {
            let html = render(&View::new(page));
            assert!(html.contains(title(page)));
            assert!(html.contains("</html>"));
        }
    }

    #[test]
    fn login_shows_summary_and_field_errors() {
        let mut errors = FormErrors::new();
        errors.add_form_error("Invalid login attempt.");
        errors.add_field_error(Field::Password, "The Password field is required.");
        let html = render(
            &View::new(Page::Login)
                .with_email("user@example.com")
                .with_remember_me(true)
                .with_errors(errors),
        );
        assert!(html.contains("validation-summary-errors"));
        assert!(html.contains("Invalid login attempt."));
        assert!(html.contains("The Password field is required."));
        assert!(html.contains("user@example.com"));
        assert!(html.contains(" checked"));
    }

    #[test]
    fn no_summary_without_errors() {
        let html = render(&View::new(Page::Register));
        assert!(!html.contains("validation-summary-errors"));
    }

    #[test]
    fn values_are_escaped() {
        let html = render(&View::new(Page::Login).with_email("<script>alert(1)</script>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn action_keeps_return_url() {
        let view = View::new(Page::Login).with_return_url(Some("/Manage?tab=1".to_string()));
        assert_eq!(action(&view), "/Account/Login?ReturnUrl=%2FManage%3Ftab%3D1");
        assert_eq!(action(&View::new(Page::Register)), REGISTER_PATH);
        assert_eq!(
            action(&View::new(Page::Login).with_return_url(Some(String::new()))),
            LOGIN_PATH
        );
        assert_eq!(action(&View::new(Page::Lockout)), "");
    }
}
