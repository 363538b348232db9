use axum::response::Html;

use crate::account::workflow::LOGIN_PATH;

// Home page; redirects land here after login, registration and log-off.
pub async fn root() -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>{name}</title></head>\
         <body><h1>{name}</h1><p><a href=\"{LOGIN_PATH}\">Log in</a> | \
         <a href=\"/Account/Register\">Register</a></p>\
         <form method=\"post\" action=\"/Account/LogOff\"><button type=\"submit\">Log off</button></form>\
         </body></html>",
        name = env!("CARGO_PKG_NAME"),
    ))
}
