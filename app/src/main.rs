use std::process::ExitCode;

use kit::Application;

mod actions;
mod bootstrap;
mod config;
mod controllers;
mod models;
mod routes;

#[cfg(test)]
mod test_support;

#[tokio::main]
async fn main() -> ExitCode {
    Application::new()
        .routes(routes::register)
        .schema(models::sync)
        .ready(bootstrap::ready)
        .run()
        .await
}
