//! Binary entrypoint that launches the FireflyChat backend.

use std::process::ExitCode;

use firefly_chat::start_firefly;

/// Load configuration, open the chat store, and serve the local API.
fn main() -> ExitCode {
    start_firefly::run()
}
