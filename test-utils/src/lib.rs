//! `test-utils` is used for testing in both `gety-lib` and `gety-bin`.
//! This crate does not depend on `gety-lib` or `gety-bin`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies
//! (`wiremock` and `http`).

/// Create a mock web server, which responds with a predefined status to
/// every request regardless of method or path
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::any()).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Start a mock server acting as forward proxy.
///
/// Plain HTTP requests sent through a proxy keep the original `Host` header,
/// so routes for virtual hosts are mounted with [`mount_host!`].
#[macro_export]
macro_rules! mock_proxy {
    () => {
        wiremock::MockServer::start().await
    };
}

/// Mount a route on a mock proxy which answers requests for `$host` with
/// `$status`. Further builder calls on the response template may follow,
/// e.g. `set_body_string("hello")`.
#[macro_export]
macro_rules! mount_host {
    ($server:expr, $host:expr, $status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::header("host", $host))
            .respond_with(template)
            .mount(&$server)
            .await;
    }};
}

/// Gets the "main" binary name (e.g. `gety`)
#[macro_export]
macro_rules! main_command {
    () => {
        Command::cargo_bin(env!("CARGO_PKG_NAME")).expect("Couldn't get cargo package name")
    };
}
