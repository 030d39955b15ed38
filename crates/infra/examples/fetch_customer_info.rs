//! Example: fetching customer info with a fully wired client
//!
//! Reads configuration the same way the SDK does (`TOLLGATE_*` variables, a
//! `.env` file, or `tollgate.{json,toml}`), issues two concurrent requests for
//! the same user and prints how many network calls were made.
//!
//! ```bash
//! TOLLGATE_API_KEY=appl_xxx cargo run -p tollgate-infra --example fetch_customer_info -- user-1
//! ```

use std::time::Duration;

use anyhow::Context;
use tollgate_core::completion;
use tollgate_domain::{BackendError, CustomerInfo};
use tollgate_infra::{logging, TollgateClient};

fn main() -> anyhow::Result<()> {
    logging::init("info");

    let app_user_id = std::env::args().nth(1).unwrap_or_else(|| "demo-user".to_string());
    let client = TollgateClient::from_env().context("failed to build client")?;

    let (first_done, first) = completion::<CustomerInfo, BackendError>();
    let (second_done, second) = completion::<CustomerInfo, BackendError>();
    client.get_customer_info(&app_user_id, false, first_done);
    client.get_customer_info(&app_user_id, false, second_done);

    match first.recv_blocking() {
        Ok(info) => println!(
            "{}: {} active entitlement(s)",
            info.subscriber.original_app_user_id,
            info.subscriber.entitlements.len()
        ),
        Err(err) => println!("request failed: {err} ({:?})", err.kind),
    }
    let _ = second.recv_blocking();

    client.wait_idle(Duration::from_secs(5)).context("client did not go idle")?;
    let snapshot = client.metrics().snapshot();
    println!(
        "requests: {}, coalesced: {}, network calls: {}",
        snapshot.requests, snapshot.coalesced, snapshot.network_calls
    );

    client.shutdown();
    Ok(())
}
