//! Example rendering dumps for a simulated web request
//!
//! The session writes HTML fragments into a buffer instead of stdout, the
//! way a web handler would collect them into its response body.
//!
//! Run with `RUST_LOG=debug` to see the routing decisions.

use dbgr_core::types::RequestContext;
use dbgr_core::{dump, Config, Environment, Session};
use dbgr_utils::{info, init_logging};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>>
{
    let _guard = init_logging()?;

    let request = RequestContext::new()
        .with_client_addr("127.0.0.1")
        .with_header("Accept", "text/html")
        .with_query("page", 2)
        .with_session("user", "ada");

    let mut session = Session::with_writer(Config::defaults(), Environment::web(request), Vec::new());

    let cart = json!({"items": [{"sku": "A-1", "qty": 2}, {"sku": "B-7", "qty": 1}], "total": 31.5});
    let query = "SELECT sku, qty FROM cart_items WHERE cart_id = 7 ORDER BY sku";

    session.set_name("Cart").set_color("#2a7ae2");
    dump!(session, cart, query)?;

    info!(dumps = session.outputs().len(), "request handled");

    let body = String::from_utf8(session.into_writer())?;
    println!("{body}");
    Ok(())
}
